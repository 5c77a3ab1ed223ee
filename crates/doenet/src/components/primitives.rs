//! `<text>`, `<number>`, `<math>` and `<boolean>`.

use super::common::{PRIMITIVE_QUERIES, primitive_inverse, primitive_value, text_of_first};
use super::{ComponentType, DataQuery, EssentialInit, EssentialSpec, StateVarSpec};
use crate::value::ValueKind;

const TEXT_VAR: StateVarSpec =
    StateVarSpec::derived("text", ValueKind::Text, &[DataQuery::StateVar("value")], text_of_first);

pub static TEXT: ComponentType = ComponentType {
    name: "text",
    state_vars: &[
        StateVarSpec::invertible(
            "value",
            ValueKind::Text,
            PRIMITIVE_QUERIES,
            |deps| primitive_value(deps, ValueKind::Text),
            primitive_inverse,
        ),
        TEXT_VAR,
    ],
    essentials: &[EssentialSpec::new("value", ValueKind::Text, EssentialInit::ChildrenText)],
    primary: Some("value"),
    ..ComponentType::BASE
};

pub static NUMBER: ComponentType = ComponentType {
    name: "number",
    state_vars: &[
        StateVarSpec::invertible(
            "value",
            ValueKind::Number,
            PRIMITIVE_QUERIES,
            |deps| primitive_value(deps, ValueKind::Number),
            primitive_inverse,
        ),
        TEXT_VAR,
    ],
    essentials: &[EssentialSpec::new("value", ValueKind::Number, EssentialInit::ChildrenText)],
    primary: Some("value"),
    ..ComponentType::BASE
};

pub static MATH: ComponentType = ComponentType {
    name: "math",
    state_vars: &[
        StateVarSpec::invertible(
            "value",
            ValueKind::Math,
            PRIMITIVE_QUERIES,
            |deps| primitive_value(deps, ValueKind::Math),
            primitive_inverse,
        ),
        TEXT_VAR,
    ],
    essentials: &[EssentialSpec::new("value", ValueKind::Math, EssentialInit::ChildrenText)],
    primary: Some("value"),
    ..ComponentType::BASE
};

pub static BOOLEAN: ComponentType = ComponentType {
    name: "boolean",
    state_vars: &[
        StateVarSpec::invertible(
            "value",
            ValueKind::Boolean,
            PRIMITIVE_QUERIES,
            |deps| primitive_value(deps, ValueKind::Boolean),
            primitive_inverse,
        ),
        TEXT_VAR,
    ],
    essentials: &[EssentialSpec::new("value", ValueKind::Boolean, EssentialInit::ChildrenText)],
    primary: Some("value"),
    ..ComponentType::BASE
};
