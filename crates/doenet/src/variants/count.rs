//! Outcome counts of a DAST subtree, computed before anything is
//! instantiated. `None` means the subtree cannot be enumerated.

use super::enumerate::{multiset_count, permutations, select_count, binomial};
use crate::composites::sequence::{self, SequenceKind};
use crate::dast::{DastElement, DastNode};
use crate::value::parse_bool;

pub fn count_element(element: &DastElement) -> Option<u64> {
    match element.name.to_ascii_lowercase().as_str() {
        "select" => count_select(element),
        "selectfromsequence" => count_select_from_sequence(element),
        "selectrandomnumbers" => count_select_random_numbers(element),
        "samplerandomnumbers" => None,
        "map" => count_map(element),
        _ => count_nodes(&element.children),
    }
}

pub fn count_nodes(nodes: &[DastNode]) -> Option<u64> {
    nodes.iter().try_fold(1u64, |acc, node| match node {
        DastNode::Element(element) => acc.checked_mul(count_element(element)?),
        DastNode::Text(_) | DastNode::Macro(_) => Some(acc),
    })
}

/// A literal attribute, `Some(None)` when absent, `None` when it holds macros.
fn literal(element: &DastElement, names: &[&str]) -> Option<Option<String>> {
    match names.iter().find_map(|name| element.attribute(name)) {
        Some(attribute) => attribute.literal_text().map(Some),
        None => Some(None),
    }
}

fn literal_count(element: &DastElement) -> Option<u64> {
    match literal(element, &["numToSelect", "numberToSelect"])? {
        Some(text) => text.trim().parse::<u64>().ok(),
        None => Some(1),
    }
}

fn literal_flag(element: &DastElement, name: &str) -> Option<bool> {
    match literal(element, &[name])? {
        Some(text) => parse_bool(&text),
        None => Some(false),
    }
}

fn count_select(element: &DastElement) -> Option<u64> {
    let k = literal_count(element)?;
    let with_replacement = literal_flag(element, "withReplacement")?;
    let options = element.element_children().filter(|child| child.is("option")).collect::<Vec<_>>();
    let counts = if options.is_empty() {
        let mut counts = Vec::new();
        for node in &element.children {
            match node {
                DastNode::Text(text) => counts.extend(text.value.split_whitespace().map(|_| 1)),
                DastNode::Macro(_) => return None,
                DastNode::Element(child) => counts.push(count_element(child)?),
            }
        }
        counts
    } else {
        if options.iter().any(|option| option.has_attribute("selectWeight")) {
            return None;
        }
        options
            .iter()
            .map(|option| count_nodes(&option.children))
            .collect::<Option<Vec<_>>>()?
    };
    select_count(&counts, k, with_replacement)
}

fn sequence_length(element: &DastElement, kind: SequenceKind) -> Option<u64> {
    let from = literal(element, &["from"])?;
    let to = literal(element, &["to"])?;
    let step = literal(element, &["step"])?;
    let length = match literal(element, &["length"])? {
        Some(text) => Some(text.trim().parse::<i64>().ok()?),
        None => None,
    };
    let exclude = literal(element, &["exclude"])?
        .map(|text| sequence::split_list(&text))
        .unwrap_or_default();
    let values = sequence::generate(kind, from.as_deref(), to.as_deref(), step.as_deref(), length, &exclude);
    Some(values.len() as u64)
}

fn count_select_from_sequence(element: &DastElement) -> Option<u64> {
    let kind = SequenceKind::from_attribute(literal(element, &["type"])?.as_deref());
    let n = sequence_length(element, kind)?;
    let k = literal_count(element)?;
    let with_replacement = literal_flag(element, "withReplacement")?;
    let sorted = literal_flag(element, "sortResults")?;
    match (with_replacement, sorted) {
        (false, false) => permutations(n, k).filter(|count| *count > 0),
        (false, true) => binomial(n, k).filter(|count| *count > 0),
        (true, false) => n.checked_pow(u32::try_from(k).ok()?),
        (true, true) => multiset_count(n, k),
    }
}

fn count_select_random_numbers(element: &DastElement) -> Option<u64> {
    let kind = literal(element, &["type"])?;
    if !kind.is_some_and(|kind| kind.eq_ignore_ascii_case("discreteUniform")) {
        return None;
    }
    let n = sequence_length(element, SequenceKind::Number)?;
    let k = literal(element, &["numToSelect", "numberToSelect", "numSamples"])?
        .map(|text| text.trim().parse::<u64>().ok())
        .unwrap_or(Some(1))?;
    n.checked_pow(u32::try_from(k).ok()?)
}

fn count_map(element: &DastElement) -> Option<u64> {
    let mut total = 1u64;
    for child in element.element_children() {
        let count = count_nodes(&child.children)?;
        if child.is("template") && count != 1 {
            return None;
        }
        total = total.checked_mul(count)?;
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dast::read_doenetml;

    fn count(source: &str) -> Option<u64> {
        count_element(&read_doenetml(source).0)
    }

    #[test]
    fn nested_selects_multiply_by_option() {
        let source = r#"
            <select numToSelect="2">
              <option><text>a</text></option>
              <option><select>x y</select></option>
              <option><selectFromSequence from="1" to="3"/></option>
            </select>"#;
        assert_eq!(count(source), Some(22));
    }

    #[test]
    fn sequences_count_permutations_and_combinations() {
        assert_eq!(count(r#"<selectFromSequence from="1" to="5" numToSelect="2"/>"#), Some(20));
        assert_eq!(count(r#"<selectFromSequence from="1" to="5" numToSelect="2" sortResults/>"#), Some(10));
        assert_eq!(
            count(r#"<selectFromSequence type="letters" from="a" to="c" numToSelect="2" withReplacement/>"#),
            Some(9)
        );
    }

    #[test]
    fn randomness_without_finite_outcomes_is_not_enumerable() {
        assert_eq!(count(r#"<sampleRandomNumbers/>"#), None);
        assert_eq!(count(r#"<selectRandomNumbers from="1" to="2"/>"#), None);
        assert_eq!(count(r#"<number name="n">2</number><select numToSelect="$n">a b c</select>"#), None);
        assert_eq!(count(r#"<selectRandomNumbers type="discreteUniform" from="1" to="3" numToSelect="2"/>"#), Some(9));
        assert_eq!(
            count(r#"<selectRandomNumbers type="discreteUniform" from="1" to="3" numberToSelect="2"/>"#),
            Some(9)
        );
    }

    #[test]
    fn random_content_inside_map_templates_is_not_enumerable() {
        let source = r#"<map><template><select>a b</select></template><sources><number>1</number></sources></map>"#;
        assert_eq!(count(source), None);
        let fixed = r#"<map><template><text>$x</text></template><sources alias="x"><number>1</number></sources></map>"#;
        assert_eq!(count(fixed), Some(1));
    }
}
