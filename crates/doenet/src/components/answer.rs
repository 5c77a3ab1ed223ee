//! `<answer>` and `<award>`.
//!
//! An answer compares the current responses of its inputs with the content
//! of its awards. `submitAnswer` copies the credit the responses would earn
//! into `creditAchieved` and records them as submitted.

use super::inputs::INPUT_TYPES;
use super::{AttributeSpec, ChildFilter, ComponentType, DataQuery, Deps, EssentialInit, EssentialSpec, StateVarSpec};
use crate::dast::{DastElement, DastNode};
use crate::value::{Value, ValueKind};
use std::borrow::Cow;

const INPUTS: ChildFilter = ChildFilter::of(INPUT_TYPES);
const AWARDS: ChildFilter = ChildFilter::of(&["award"]);
const CHOICE_INPUTS: ChildFilter = ChildFilter::of(&["choiceInput"]);

/// Award content: a single value as is, several pieces as their text.
fn award_target(deps: &Deps) -> Value {
    let pieces = deps
        .values(0)
        .filter(|value| !matches!(value, Value::Text(text) if text.trim().is_empty()))
        .collect::<Vec<_>>();
    match pieces.as_slice() {
        [] => Value::Null,
        [single] => (*single).clone(),
        _ => Value::text(pieces.iter().map(|value| value.to_text()).collect::<String>()),
    }
}

pub static AWARD: ComponentType = ComponentType {
    name: "award",
    state_vars: &[
        StateVarSpec::derived("target", ValueKind::Any, &[DataQuery::ChildValues], award_target),
        StateVarSpec::derived("credit", ValueKind::Number, &[DataQuery::Attribute("credit")], |deps| {
            Value::Number(deps.number(0))
        }),
    ],
    attributes: &[AttributeSpec::new("credit", ValueKind::Number, || Value::Number(1.0))],
    ..ComponentType::BASE
};

/// Whether a response matches an award target, comparing in the response's
/// own kind.
pub fn response_matches(response: &Value, target: &Value) -> bool {
    match response {
        Value::Math(math) => match target.coerce(ValueKind::Math) {
            Some(Value::Math(target)) => !math.is_blank() && math.equivalent(&target),
            _ => false,
        },
        Value::Number(_) | Value::Integer(_) => {
            match (response.as_number(), target.as_number()) {
                (Some(a), Some(b)) => (a - b).abs() <= 1e-12 * a.abs().max(b.abs()).max(1.0),
                _ => false,
            }
        }
        Value::Boolean(flag) => target.as_bool() == Some(*flag),
        Value::Null => false,
        other => {
            let response = other.to_text();
            let target = target.to_text();
            !response.trim().is_empty() && response.trim().eq_ignore_ascii_case(target.trim())
        }
    }
}

fn current_responses(deps: &Deps) -> Value {
    Value::List(deps.values(0).cloned().collect())
}

fn credit_if_submitted(deps: &Deps) -> Value {
    let choice_credit = deps.values(3).filter_map(Value::as_number).reduce(f64::max);
    if let Some(credit) = choice_credit {
        return Value::Number(credit.clamp(0.0, 1.0));
    }
    let Some(response) = deps.list(0).first() else {
        return Value::Number(0.0);
    };
    let credit = deps
        .values(1)
        .zip(deps.values(2))
        .filter(|(target, _)| response_matches(response, target))
        .filter_map(|(_, credit)| credit.as_number())
        .fold(0.0, f64::max);
    Value::Number(credit.clamp(0.0, 1.0))
}

fn stored_number(deps: &Deps) -> Value {
    Value::Number(deps.first(0).and_then(Value::as_number).filter(|n| n.is_finite()).unwrap_or(0.0))
}

/// Still submitted while the responses have not changed since.
fn just_submitted(deps: &Deps) -> Value {
    Value::Boolean(deps.flag(0) && deps.value(1) == deps.value(2))
}

pub static ANSWER: ComponentType = ComponentType {
    name: "answer",
    state_vars: &[
        StateVarSpec::derived(
            "currentResponses",
            ValueKind::Any,
            &[DataQuery::Children { filter: INPUTS, state_var: "value" }],
            current_responses,
        ),
        StateVarSpec::derived(
            "creditIfSubmitted",
            ValueKind::Number,
            &[
                DataQuery::StateVar("currentResponses"),
                DataQuery::Children { filter: AWARDS, state_var: "target" },
                DataQuery::Children { filter: AWARDS, state_var: "credit" },
                DataQuery::Children { filter: CHOICE_INPUTS, state_var: "creditAchieved" },
            ],
            credit_if_submitted,
        ),
        StateVarSpec::derived(
            "creditAchieved",
            ValueKind::Number,
            &[DataQuery::Essential("creditAchieved")],
            stored_number,
        ),
        StateVarSpec::derived(
            "submittedResponses",
            ValueKind::Any,
            &[DataQuery::Essential("submittedResponses")],
            |deps| match deps.value(0) {
                Value::Null => Value::List(Vec::new()),
                value => value,
            },
        ),
        StateVarSpec::derived("numSubmissions", ValueKind::Integer, &[DataQuery::Essential("numSubmissions")], |deps| {
            Value::Integer(deps.integer(0).unwrap_or(0))
        }),
        StateVarSpec::derived(
            "justSubmitted",
            ValueKind::Boolean,
            &[
                DataQuery::Essential("justSubmitted"),
                DataQuery::StateVar("currentResponses"),
                DataQuery::StateVar("submittedResponses"),
            ],
            just_submitted,
        ),
    ],
    essentials: &[
        EssentialSpec::new("creditAchieved", ValueKind::Number, EssentialInit::Default),
        EssentialSpec::new("submittedResponses", ValueKind::Any, EssentialInit::Default),
        EssentialSpec::new("numSubmissions", ValueKind::Integer, EssentialInit::Default),
        EssentialSpec::new("justSubmitted", ValueKind::Boolean, EssentialInit::Default),
    ],
    actions: &["submitAnswer"],
    ..ComponentType::BASE
};

/// `<answer>x+1</answer>` is shorthand for an answer with a `<mathInput>`
/// and one `<award>` holding the content.
pub fn expand_sugar(answer: &DastElement) -> Cow<'_, DastElement> {
    let has_input = answer
        .element_children()
        .any(|child| INPUT_TYPES.iter().any(|input| child.is(input)));
    let loose = answer
        .children
        .iter()
        .filter(|node| !node.is_blank_text())
        .filter(|node| !matches!(node, DastNode::Element(element) if element.is("award")))
        .count();
    if has_input || loose == 0 {
        return Cow::Borrowed(answer);
    }

    let (awards, content): (Vec<DastNode>, Vec<DastNode>) = answer
        .children
        .iter()
        .cloned()
        .partition(|node| matches!(node, DastNode::Element(element) if element.is("award")));
    let mut award = DastElement::new("award", content);
    award.position = answer.position;
    let mut input = DastElement::new("mathInput", Vec::new());
    input.position = answer.position;

    let mut children = vec![DastNode::Element(input)];
    children.extend(awards);
    children.push(DastNode::Element(award));
    Cow::Owned(DastElement { children, ..answer.clone() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dast::read_doenetml;
    use crate::math::MathExpr;

    #[test]
    fn responses_compare_in_their_own_kind() {
        let math = |text: &str| Value::Math(MathExpr::parse(text).unwrap());
        assert!(response_matches(&math("1+x"), &Value::text("x+1")));
        assert!(!response_matches(&math("x+2"), &Value::text("x+1")));
        assert!(response_matches(&Value::Number(0.5), &Value::text("1/2")));
        assert!(response_matches(&Value::text(" Hello "), &Value::text("hello")));
        assert!(response_matches(&Value::Boolean(true), &Value::text("true")));
        assert!(!response_matches(&Value::text(""), &Value::text("")));
    }

    #[test]
    fn bare_answer_content_becomes_an_award() {
        let (root, _) = read_doenetml("<answer>x+1</answer>");
        let answer = root.element_children().next().unwrap();
        let expanded = expand_sugar(answer);
        let names = expanded.element_children().map(|child| child.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["mathInput", "award"]);

        let (root, _) = read_doenetml("<answer><textInput/><award>hi</award></answer>");
        let answer = root.element_children().next().unwrap();
        assert!(matches!(expand_sugar(answer), Cow::Borrowed(_)));
    }
}
