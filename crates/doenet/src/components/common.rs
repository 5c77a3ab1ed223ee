//! Pieces shared by many component types.

use super::{AttributeSpec, DataQuery, DepItem, Deps, InverseWrite, StateVarSpec};
use crate::math::MathExpr;
use crate::value::{Value, ValueKind, parse_bool, parse_number};

pub static COMMON_ATTRIBUTES: &[AttributeSpec] =
    &[AttributeSpec::new("hide", ValueKind::Boolean, || Value::Boolean(false))];

pub static COMMON_STATIC_ATTRIBUTES: &[&str] = &["name", "newNamespace", "assignNames"];

pub static COMMON_STATE_VARS: &[StateVarSpec] = &[StateVarSpec::derived(
    "hidden",
    ValueKind::Boolean,
    &[DataQuery::Attribute("hide"), DataQuery::Parent("hidden")],
    |deps| Value::Boolean(deps.flag(0) || deps.flag(1)),
)];

/// Parse literal attribute text as `kind`. `None` when the text does not
/// describe a value of that kind.
pub fn parse_literal(kind: ValueKind, text: &str) -> Option<Value> {
    match kind {
        ValueKind::Text | ValueKind::Any => Some(Value::text(text)),
        ValueKind::Boolean => {
            if text.trim().is_empty() {
                Some(Value::Boolean(true))
            } else {
                parse_bool(text).map(Value::Boolean)
            }
        }
        ValueKind::Number => parse_number(text).map(Value::Number),
        ValueKind::Integer => parse_number(text)
            .filter(|n| n.is_finite())
            .map(|n| Value::Integer(n.round() as i64)),
        ValueKind::Math => MathExpr::parse(text).ok().map(Value::Math),
        ValueKind::Components => None,
        list_kind => {
            let item_kind = list_kind.item_kind()?;
            split_items(text)
                .iter()
                .map(|item| parse_literal(item_kind, item))
                .collect::<Option<Vec<_>>>()
                .map(Value::List)
        }
    }
}

/// List items are comma separated when there is a comma, otherwise
/// whitespace separated.
pub fn split_items(text: &str) -> Vec<String> {
    let pieces: Vec<&str> = if text.contains(',') {
        text.split(',').collect()
    } else {
        text.split_whitespace().collect()
    };
    pieces
        .into_iter()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}

/// Text used when children are concatenated and reparsed. Math and numbers
/// are parenthesized so they keep their meaning inside a larger expression.
fn concatenation_piece(value: &Value, kind: ValueKind) -> String {
    match (kind, value) {
        (ValueKind::Text, value) => value.to_text(),
        (_, Value::Math(math)) if !math.is_blank() => format!("({math})"),
        (_, Value::Number(n)) if *n < 0.0 => format!("({})", value.to_text()),
        (_, value) => value.to_text(),
    }
}

/// `a = b` compares both sides, everything else must spell a boolean.
fn parse_boolean_text(text: &str) -> Option<bool> {
    if let Some(flag) = parse_bool(text) {
        return Some(flag);
    }
    let (left, right) = text.split_once('=')?;
    match (MathExpr::parse(left), MathExpr::parse(right)) {
        (Ok(left), Ok(right)) => Some(left.equivalent(&right)),
        _ => Some(left.trim() == right.trim()),
    }
}

fn combine_children(children: &[DepItem], kind: ValueKind) -> Value {
    let writable = children.iter().filter(|item| item.writable).collect::<Vec<_>>();
    let rest_blank = children
        .iter()
        .filter(|item| !item.writable)
        .all(|item| item.value.to_text().trim().is_empty());
    if let ([single], true) = (writable.as_slice(), rest_blank) {
        return single.value.coerce(kind).unwrap_or_else(|| kind.default_value());
    }
    let text = children
        .iter()
        .map(|item| concatenation_piece(&item.value, kind))
        .collect::<String>();
    let parsed = match kind {
        ValueKind::Text => Some(Value::text(text)),
        ValueKind::Boolean => parse_boolean_text(&text).map(Value::Boolean),
        _ => Value::text(&text).coerce(kind),
    };
    parsed.unwrap_or_else(|| kind.default_value())
}

/// Queries of a primitive `value`: the copied source, then the children,
/// then the stored value.
pub const PRIMITIVE_QUERIES: &[DataQuery] = &[
    DataQuery::Extend("value"),
    DataQuery::ChildValues,
    DataQuery::Essential("value"),
];

pub fn primitive_value(deps: &Deps, kind: ValueKind) -> Value {
    if let Some(value) = deps.first(0) {
        return value.coerce(kind).unwrap_or_else(|| kind.default_value());
    }
    let children = deps.group(1);
    if children.iter().any(|item| item.writable) {
        return combine_children(children, kind);
    }
    deps.value(2)
}

pub fn primitive_inverse(desired: &Value, deps: &Deps) -> Result<Vec<InverseWrite>, String> {
    if !deps.group(0).is_empty() {
        return Ok(vec![InverseWrite::new(0, 0, desired.clone())]);
    }
    let children = deps.group(1);
    if !children.iter().any(|item| item.writable) {
        return Ok(vec![InverseWrite::new(2, 0, desired.clone())]);
    }
    let writable = children
        .iter()
        .enumerate()
        .filter(|(_, item)| item.writable)
        .map(|(position, _)| position)
        .collect::<Vec<_>>();
    let rest_blank = children
        .iter()
        .filter(|item| !item.writable)
        .all(|item| item.value.to_text().trim().is_empty());
    match (writable.as_slice(), rest_blank) {
        ([position], true) => Ok(vec![InverseWrite::new(1, *position, desired.clone())]),
        _ => Err("the value is combined from several children".to_string()),
    }
}

/// First query with an item wins.
pub fn first_given(deps: &Deps) -> Value {
    deps.groups
        .iter()
        .find_map(|group| group.first().map(|item| item.value.clone()))
        .unwrap_or(Value::Null)
}

pub fn first_given_inverse(desired: &Value, deps: &Deps) -> Result<Vec<InverseWrite>, String> {
    deps.groups
        .iter()
        .position(|group| !group.is_empty())
        .map(|query| vec![InverseWrite::new(query, 0, desired.clone())])
        .ok_or_else(|| "nothing to write to".to_string())
}

pub fn text_of_first(deps: &Deps) -> Value {
    Value::text(deps.value(0).to_text())
}

pub fn pass_through_inverse(desired: &Value, _deps: &Deps) -> Result<Vec<InverseWrite>, String> {
    Ok(vec![InverseWrite::new(0, 0, desired.clone())])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(value: Value, writable: bool) -> DepItem {
        DepItem { value, writable }
    }

    fn deps(groups: Vec<Vec<DepItem>>) -> Deps {
        Deps { groups }
    }

    #[test]
    fn literal_attributes_parse_by_kind() {
        assert_eq!(parse_literal(ValueKind::Integer, " 3 "), Some(Value::Integer(3)));
        assert_eq!(parse_literal(ValueKind::Boolean, ""), Some(Value::Boolean(true)));
        assert_eq!(parse_literal(ValueKind::Number, "abc"), None);
        assert_eq!(
            parse_literal(ValueKind::NumberList, "-2 0"),
            Some(Value::List(vec![Value::Number(-2.0), Value::Number(0.0)]))
        );
        assert_eq!(split_items("a, b c ,d"), vec!["a", "b c", "d"]);
    }

    #[test]
    fn children_are_concatenated_and_reparsed() {
        let children = vec![
            item(Value::text("2"), false),
            item(Value::Math(MathExpr::parse("x+1").unwrap()), true),
        ];
        let value = primitive_value(&deps(vec![vec![], children, vec![]]), ValueKind::Math);
        assert_eq!(value.to_json(), serde_json::json!(["*", 2, ["+", "x", 1]]));
    }

    #[test]
    fn boolean_children_compare_sides() {
        let children = vec![item(Value::Number(2.0), true), item(Value::text(" = 2"), false)];
        let value = primitive_value(&deps(vec![vec![], children, vec![]]), ValueKind::Boolean);
        assert_eq!(value, Value::Boolean(true));
    }

    #[test]
    fn inverse_targets_single_component_child() {
        let children = vec![item(Value::text("  "), false), item(Value::text("a"), true)];
        let writes = primitive_inverse(&Value::text("b"), &deps(vec![vec![], children, vec![]])).unwrap();
        assert_eq!(writes, vec![InverseWrite::new(1, 1, Value::text("b"))]);

        let mixed = vec![item(Value::text("x "), false), item(Value::text("a"), true)];
        assert!(primitive_inverse(&Value::text("b"), &deps(vec![vec![], mixed, vec![]])).is_err());
    }
}
