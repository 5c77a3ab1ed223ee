//! `<textInput>`, `<mathInput>` and `<booleanInput>`.
//!
//! Typing only changes `immediateValue`. Committing with `updateValue` writes
//! the immediate value through `value`, which is either stored on the input,
//! bound to another value with `bindValueTo`, or extended from a copied input.

use super::common::{first_given, first_given_inverse, text_of_first};
use super::{AttributeSpec, ComponentType, DataQuery, Deps, EssentialInit, EssentialSpec, StateVarSpec};
use crate::math::MathExpr;
use crate::value::{Value, ValueKind};

pub const ACTIONS: &[&str] = &["updateImmediateValue", "updateValue"];

const VALUE_QUERIES: &[DataQuery] = &[
    DataQuery::AttributeIfSet("bindValueTo"),
    DataQuery::Extend("value"),
    DataQuery::Essential("value"),
];

const IMMEDIATE_QUERIES: &[DataQuery] =
    &[DataQuery::Essential("immediateValue"), DataQuery::StateVar("value")];

/// The uncommitted value while there is one, otherwise the committed value.
fn immediate_value(deps: &Deps) -> Value {
    match deps.first(0) {
        Some(value) if !value.is_null() => value.clone(),
        _ => deps.value(1),
    }
}

const fn input_vars(kind: ValueKind) -> [StateVarSpec; 3] {
    [
        StateVarSpec::invertible("value", kind, VALUE_QUERIES, first_given, first_given_inverse),
        StateVarSpec::derived("immediateValue", kind, IMMEDIATE_QUERIES, immediate_value),
        StateVarSpec::derived("text", ValueKind::Text, &[DataQuery::StateVar("immediateValue")], text_of_first),
    ]
}

const fn input_essentials(kind: ValueKind) -> [EssentialSpec; 2] {
    [
        EssentialSpec::new("value", kind, EssentialInit::Attribute("prefill")),
        EssentialSpec::new("immediateValue", ValueKind::Any, EssentialInit::Default),
    ]
}

pub static TEXT_INPUT: ComponentType = ComponentType {
    name: "textInput",
    state_vars: &input_vars(ValueKind::Text),
    essentials: &input_essentials(ValueKind::Text),
    attributes: &[
        AttributeSpec::new("prefill", ValueKind::Text, || Value::text("")),
        AttributeSpec::new("bindValueTo", ValueKind::Text, || Value::Null),
    ],
    primary: Some("value"),
    actions: ACTIONS,
    ..ComponentType::BASE
};

pub static MATH_INPUT: ComponentType = ComponentType {
    name: "mathInput",
    state_vars: &input_vars(ValueKind::Math),
    essentials: &input_essentials(ValueKind::Math),
    attributes: &[
        AttributeSpec::new("prefill", ValueKind::Math, || Value::Math(MathExpr::blank())),
        AttributeSpec::new("bindValueTo", ValueKind::Math, || Value::Null),
    ],
    primary: Some("value"),
    actions: ACTIONS,
    ..ComponentType::BASE
};

pub static BOOLEAN_INPUT: ComponentType = ComponentType {
    name: "booleanInput",
    state_vars: &input_vars(ValueKind::Boolean),
    essentials: &input_essentials(ValueKind::Boolean),
    attributes: &[
        AttributeSpec::new("prefill", ValueKind::Boolean, || Value::Boolean(false)),
        AttributeSpec::new("bindValueTo", ValueKind::Boolean, || Value::Null),
    ],
    primary: Some("value"),
    actions: ACTIONS,
    ..ComponentType::BASE
};

/// Input types an `<answer>` reads its responses from.
pub const INPUT_TYPES: &[&str] = &["textInput", "mathInput", "booleanInput", "choiceInput"];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::DepItem;

    #[test]
    fn immediate_value_falls_back_to_committed_value() {
        let committed = DepItem { value: Value::text("a"), writable: true };
        let typed = DepItem { value: Value::text("ab"), writable: true };
        let pending = Deps { groups: vec![vec![typed], vec![committed.clone()]] };
        assert_eq!(immediate_value(&pending), Value::text("ab"));
        let cleared = Deps { groups: vec![vec![DepItem { value: Value::Null, writable: true }], vec![committed]] };
        assert_eq!(immediate_value(&cleared), Value::text("a"));
    }

    #[test]
    fn value_prefers_binding_over_stored_value() {
        let deps = Deps {
            groups: vec![
                vec![DepItem { value: Value::text("bound"), writable: true }],
                vec![],
                vec![DepItem { value: Value::text("stored"), writable: true }],
            ],
        };
        assert_eq!(first_given(&deps), Value::text("bound"));
        assert_eq!(first_given_inverse(&Value::text("x"), &deps).unwrap()[0].query, 0);
    }
}
