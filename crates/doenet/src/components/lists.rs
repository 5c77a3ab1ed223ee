//! `<numberList>`, `<mathList>`, `<booleanList>` and `<textList>`.
//!
//! Literal text children are split into one item component each when the
//! list is instantiated, so every item is a real component whose value can
//! be copied and written back to.

use super::{AttributeSpec, ChildPolicy, ComponentType, DataQuery, Deps, InverseWrite, StateVarSpec};
use crate::value::{Value, ValueKind};

const VALUES_QUERIES: &[DataQuery] = &[
    DataQuery::Extend("values"),
    DataQuery::ChildValues,
    DataQuery::Attribute("maxNumber"),
];

const ATTRIBUTES: &[AttributeSpec] = &[AttributeSpec::new("maxNumber", ValueKind::Integer, || Value::Null)];

fn list_values(deps: &Deps, kind: ValueKind) -> Value {
    let Some(item_kind) = kind.item_kind() else {
        return kind.default_value();
    };
    let mut items: Vec<Value> = match deps.first(0) {
        Some(Value::List(items)) => items.clone(),
        Some(single) => vec![single.clone()],
        None => deps
            .values(1)
            .filter(|value| !matches!(value, Value::Text(text) if text.trim().is_empty()))
            .flat_map(|value| match value {
                Value::List(items) => items.clone(),
                other => vec![other.clone()],
            })
            .collect(),
    };
    if let Some(max) = deps.integer(2) {
        items.truncate(usize::try_from(max).unwrap_or(0));
    }
    Value::List(
        items
            .iter()
            .map(|item| item.coerce(item_kind).unwrap_or_else(|| item_kind.default_value()))
            .collect(),
    )
}

/// Writes go to the copied list, or item by item to the child components.
fn list_inverse(desired: &Value, deps: &Deps) -> Result<Vec<InverseWrite>, String> {
    if !deps.group(0).is_empty() {
        return Ok(vec![InverseWrite::new(0, 0, desired.clone())]);
    }
    let desired = desired.as_list().ok_or("a list needs a list of values")?;
    let children = deps
        .group(1)
        .iter()
        .enumerate()
        .filter(|(_, item)| !matches!(&item.value, Value::Text(text) if text.trim().is_empty()))
        .collect::<Vec<_>>();
    if children.iter().any(|(_, item)| !item.writable || item.value.as_list().is_some()) {
        return Err("list items are not all separate components".to_string());
    }
    if children.len() != desired.len() {
        return Err(format!("expected {} values, got {}", children.len(), desired.len()));
    }
    Ok(children
        .iter()
        .zip(desired)
        .map(|((position, _), value)| InverseWrite::new(1, *position, value.clone()))
        .collect())
}

fn num_values(deps: &Deps) -> Value {
    Value::Integer(deps.list(0).len() as i64)
}

fn list_text(deps: &Deps) -> Value {
    Value::text(deps.value(0).to_text())
}

const fn list_type(
    name: &'static str,
    item_type: &'static str,
    state_vars: &'static [StateVarSpec],
) -> ComponentType {
    ComponentType {
        name,
        state_vars,
        attributes: ATTRIBUTES,
        children: ChildPolicy::ListItems(item_type),
        primary: Some("values"),
        ..ComponentType::BASE
    }
}

const NUM_VALUES: StateVarSpec =
    StateVarSpec::derived("numValues", ValueKind::Integer, &[DataQuery::StateVar("values")], num_values);
const TEXT: StateVarSpec =
    StateVarSpec::derived("text", ValueKind::Text, &[DataQuery::StateVar("values")], list_text);

pub static NUMBER_LIST: ComponentType = list_type(
    "numberList",
    "number",
    &[
        StateVarSpec::invertible(
            "values",
            ValueKind::NumberList,
            VALUES_QUERIES,
            |deps| list_values(deps, ValueKind::NumberList),
            list_inverse,
        ),
        NUM_VALUES,
        TEXT,
    ],
);

pub static MATH_LIST: ComponentType = list_type(
    "mathList",
    "math",
    &[
        StateVarSpec::invertible(
            "values",
            ValueKind::MathList,
            VALUES_QUERIES,
            |deps| list_values(deps, ValueKind::MathList),
            list_inverse,
        ),
        NUM_VALUES,
        TEXT,
    ],
);

pub static BOOLEAN_LIST: ComponentType = list_type(
    "booleanList",
    "boolean",
    &[
        StateVarSpec::invertible(
            "values",
            ValueKind::BooleanList,
            VALUES_QUERIES,
            |deps| list_values(deps, ValueKind::BooleanList),
            list_inverse,
        ),
        NUM_VALUES,
        TEXT,
    ],
);

pub static TEXT_LIST: ComponentType = list_type(
    "textList",
    "text",
    &[
        StateVarSpec::invertible(
            "values",
            ValueKind::TextList,
            VALUES_QUERIES,
            |deps| list_values(deps, ValueKind::TextList),
            list_inverse,
        ),
        NUM_VALUES,
        TEXT,
    ],
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::DepItem;

    fn item(value: Value, writable: bool) -> DepItem {
        DepItem { value, writable }
    }

    #[test]
    fn child_values_are_flattened_and_truncated() {
        let deps = Deps {
            groups: vec![
                vec![],
                vec![
                    item(Value::Number(1.0), true),
                    item(Value::text(" "), false),
                    item(Value::List(vec![Value::Number(2.0), Value::Number(3.0)]), true),
                ],
                vec![item(Value::Integer(2), false)],
            ],
        };
        assert_eq!(
            list_values(&deps, ValueKind::NumberList),
            Value::List(vec![Value::Number(1.0), Value::Number(2.0)])
        );
    }

    #[test]
    fn inverse_writes_each_item_child() {
        let deps = Deps {
            groups: vec![
                vec![],
                vec![item(Value::Number(1.0), true), item(Value::Number(2.0), true)],
                vec![item(Value::Null, false)],
            ],
        };
        let desired = Value::List(vec![Value::Number(5.0), Value::Number(6.0)]);
        let writes = list_inverse(&desired, &deps).unwrap();
        assert_eq!(writes[1], InverseWrite::new(1, 1, Value::Number(6.0)));
        assert!(list_inverse(&Value::List(vec![Value::Number(5.0)]), &deps).is_err());
    }
}
