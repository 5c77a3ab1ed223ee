//! `<select>`: pick options once per variant and keep them.
//!
//! Options are `<option>` children, or when there are none, every word of
//! literal text, every element and every macro. The picks are made the first
//! time the replacements are computed and are never redrawn: a larger
//! `numToSelect` adds picks, a smaller one withholds the extra groups.

use super::{CompositeKind, Memory, num_groups, push_group, show_groups};
use crate::components::{
    AttributeSpec, ChildPolicy, ComponentType, DataQuery, EssentialInit, EssentialSpec, StateVarSpec,
};
use crate::core::instantiate::{group_scope, instantiate_group};
use crate::core::{ComponentIdx, Core};
use crate::dast::{DastElement, DastNode};
use crate::diagnostics::LEVEL_VALIDATION;
use crate::value::{Value, ValueKind, parse_number};
use crate::variants::VariantCursor;
use crate::variants::count::{count_element, count_nodes};
use crate::variants::enumerate::decode_select;
use rand::Rng;

pub static SELECT: ComponentType = ComponentType {
    name: "select",
    state_vars: &[
        StateVarSpec::replacements(),
        StateVarSpec::derived(
            "selectedIndices",
            ValueKind::IntegerList,
            &[DataQuery::Essential("selectedIndices")],
            |deps| deps.value(0),
        ),
        StateVarSpec::derived("numToSelect", ValueKind::Integer, &[DataQuery::Attribute("numToSelect")], |deps| {
            deps.value(0)
        }),
    ],
    essentials: &[EssentialSpec::new("selectedIndices", ValueKind::IntegerList, EssentialInit::Default)],
    attributes: &[
        AttributeSpec::new("numToSelect", ValueKind::Integer, || Value::Integer(1)).renamed_from("numberToSelect"),
        AttributeSpec::new("withReplacement", ValueKind::Boolean, || Value::Boolean(false)),
    ],
    static_attributes: &["type"],
    children: ChildPolicy::Deferred,
    composite: Some(CompositeKind::Select),
    ..ComponentType::BASE
};

#[derive(Clone, Debug, PartialEq)]
pub struct Pick {
    pub option: usize,
    /// Digit for the option's own random content, in unique mode.
    pub sub: Option<u64>,
}

#[derive(Debug, Default)]
pub struct SelectMemory {
    pub picks: Vec<Pick>,
    pub warned: bool,
}

struct SelectOption {
    nodes: Vec<DastNode>,
    weight: f64,
    count: u64,
}

fn options(select: &DastElement) -> Vec<SelectOption> {
    let explicit = select.element_children().filter(|child| child.is("option")).collect::<Vec<_>>();
    if !explicit.is_empty() {
        return explicit
            .into_iter()
            .map(|option| SelectOption {
                nodes: option.children.clone(),
                weight: option
                    .literal_attribute("selectWeight")
                    .and_then(|weight| parse_number(&weight))
                    .filter(|weight| *weight >= 0.0)
                    .unwrap_or(1.0),
                count: count_nodes(&option.children).unwrap_or(1),
            })
            .collect();
    }

    let word_type = select.literal_attribute("type").unwrap_or_else(|| "text".to_string());
    let mut options = Vec::new();
    for node in &select.children {
        match node {
            DastNode::Text(text) => {
                for word in text.value.split_whitespace() {
                    let mut element = DastElement::new(&word_type, vec![DastNode::text(word)]);
                    element.position = text.position;
                    options.push(SelectOption { nodes: vec![DastNode::Element(element)], weight: 1.0, count: 1 });
                }
            }
            DastNode::Element(element) => options.push(SelectOption {
                nodes: vec![node.clone()],
                weight: 1.0,
                count: count_element(element).unwrap_or(1),
            }),
            DastNode::Macro(_) => options.push(SelectOption { nodes: vec![node.clone()], weight: 1.0, count: 1 }),
        }
    }
    options
}

/// Weighted draw among the options still allowed.
fn draw(rng: &mut impl Rng, options: &[SelectOption], excluded: &[usize]) -> Option<usize> {
    let allowed = |i: &usize| !excluded.contains(i) && options[*i].weight > 0.0;
    let total: f64 = (0..options.len()).filter(allowed).map(|i| options[i].weight).sum();
    if total <= 0.0 {
        return None;
    }
    let mut target = rng.r#gen::<f64>() * total;
    let mut last = None;
    for i in (0..options.len()).filter(allowed) {
        last = Some(i);
        target -= options[i].weight;
        if target < 0.0 {
            return Some(i);
        }
    }
    last
}

pub(crate) fn update(core: &mut Core, idx: ComponentIdx, memory: Memory) -> Memory {
    let mut memory = match memory {
        Memory::Select(memory) => memory,
        _ => SelectMemory::default(),
    };
    let Some(element) = core.component(idx).dast.clone() else {
        return Memory::Select(memory);
    };
    let options = options(&element);
    let requested = core.read_attribute(idx, "numToSelect").as_integer().unwrap_or(1).max(0) as usize;
    let with_replacement = core.read_attribute(idx, "withReplacement").as_bool().unwrap_or(false);
    let n = options.len();

    let k = if !with_replacement && requested > n {
        if !memory.warned {
            core.diagnostics.warning(
                format!("Cannot select {requested} components from only {n} options without replacement"),
                LEVEL_VALIDATION,
                element.position,
            );
            memory.warned = true;
        }
        n
    } else {
        requested
    };

    if memory.picks.len() < k {
        let source = core.component(idx).variant;
        let decoded = match source.digit {
            Some(digit) if memory.picks.is_empty() => {
                let counts = options.iter().map(|option| option.count).collect::<Vec<_>>();
                decode_select(digit, &counts, k as u64, with_replacement)
            }
            _ => None,
        };
        match decoded {
            Some(decoded) => {
                memory.picks = decoded
                    .into_iter()
                    .map(|(option, sub)| Pick { option, sub: Some(sub) })
                    .collect();
            }
            None => {
                for p in memory.picks.len()..k {
                    let mut rng = source.seed.child(0).child(p as u64).rng();
                    let excluded = if with_replacement {
                        Vec::new()
                    } else {
                        memory.picks.iter().map(|pick| pick.option).collect()
                    };
                    match draw(&mut rng, &options, &excluded) {
                        Some(option) => memory.picks.push(Pick { option, sub: None }),
                        None => break,
                    }
                }
            }
        }
    }

    let shown = k.min(memory.picks.len());
    for g in num_groups(core, idx)..shown {
        let pick = memory.picks[g].clone();
        let mut cursor = match pick.sub {
            Some(sub) => VariantCursor::unique(sub),
            None => VariantCursor::seeded(),
        };
        let seed = core.component(idx).variant.seed.child(1).child(g as u64);
        let scope = group_scope(core, idx, g, Vec::new());
        let group = instantiate_group(core, idx, g, &options[pick.option].nodes, scope, &mut cursor, seed);
        push_group(core, idx, group);
    }
    show_groups(core, idx, shown);

    let indices = memory.picks[..shown]
        .iter()
        .map(|pick| Value::Integer(pick.option as i64 + 1))
        .collect();
    core.write_essential_if_changed(idx, "selectedIndices", Value::List(indices));
    Memory::Select(memory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dast::read_doenetml;
    use crate::variants::VariantSeed;

    fn select(source: &str) -> DastElement {
        read_doenetml(source).0.element_children().next().unwrap().clone()
    }

    #[test]
    fn text_words_elements_and_macros_are_options() {
        let options = options(&select("<select type=\"math\">x y <text>z</text> $w</select>"));
        assert_eq!(options.len(), 4);
        assert!(matches!(&options[0].nodes[0], DastNode::Element(element) if element.is("math")));
        assert!(matches!(options[3].nodes[0], DastNode::Macro(_)));
    }

    #[test]
    fn option_weights_and_counts() {
        let options = options(&select(
            "<select><option selectWeight=\"0\">a</option><option><select>b c</select></option></select>",
        ));
        assert_eq!(options[0].weight, 0.0);
        assert_eq!(options[1].count, 2);
        let mut rng = VariantSeed(7).rng();
        assert_eq!(draw(&mut rng, &options, &[]), Some(1));
        assert_eq!(draw(&mut rng, &options, &[1]), None);
    }
}
