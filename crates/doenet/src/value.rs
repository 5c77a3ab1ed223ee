use crate::core::ComponentIdx;
use crate::math::MathExpr;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Declared type of a state variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueKind {
    Number,
    Integer,
    Boolean,
    Text,
    Math,
    NumberList,
    IntegerList,
    BooleanList,
    TextList,
    MathList,
    Components,
    Any,
}

impl ValueKind {
    pub fn default_value(self) -> Value {
        match self {
            ValueKind::Number => Value::Number(f64::NAN),
            ValueKind::Integer => Value::Integer(0),
            ValueKind::Boolean => Value::Boolean(false),
            ValueKind::Text => Value::text(""),
            ValueKind::Math => Value::Math(MathExpr::blank()),
            ValueKind::NumberList
            | ValueKind::IntegerList
            | ValueKind::BooleanList
            | ValueKind::TextList
            | ValueKind::MathList => Value::List(Vec::new()),
            ValueKind::Components => Value::Components(Vec::new()),
            ValueKind::Any => Value::Null,
        }
    }

    pub fn item_kind(self) -> Option<ValueKind> {
        match self {
            ValueKind::NumberList => Some(ValueKind::Number),
            ValueKind::IntegerList => Some(ValueKind::Integer),
            ValueKind::BooleanList => Some(ValueKind::Boolean),
            ValueKind::TextList => Some(ValueKind::Text),
            ValueKind::MathList => Some(ValueKind::Math),
            _ => None,
        }
    }

    pub fn is_list(self) -> bool {
        self.item_kind().is_some()
    }

    /// Component type that displays a value of this kind.
    pub fn component_type(self) -> &'static str {
        match self {
            ValueKind::Number | ValueKind::Integer => "number",
            ValueKind::Boolean => "boolean",
            ValueKind::Math => "math",
            ValueKind::NumberList | ValueKind::IntegerList => "numberList",
            ValueKind::BooleanList => "booleanList",
            ValueKind::TextList => "textList",
            ValueKind::MathList => "mathList",
            ValueKind::Text | ValueKind::Components | ValueKind::Any => "text",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Number(f64),
    Integer(i64),
    Boolean(bool),
    Text(Arc<str>),
    Math(MathExpr),
    List(Vec<Value>),
    Components(Vec<ComponentIdx>),
}

impl Value {
    pub fn text(text: impl AsRef<str>) -> Self {
        Value::Text(text.as_ref().into())
    }

    /// Kind a value naturally has, used when a copy needs a component type
    /// for a value whose declared kind is `Any`.
    pub fn natural_kind(&self) -> ValueKind {
        match self {
            Value::Number(_) => ValueKind::Number,
            Value::Integer(_) => ValueKind::Integer,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Text(_) | Value::Null => ValueKind::Text,
            Value::Math(_) => ValueKind::Math,
            Value::Components(_) => ValueKind::Components,
            Value::List(items) => match items.first().map(Value::natural_kind) {
                Some(ValueKind::Number) | None => ValueKind::NumberList,
                Some(ValueKind::Integer) => ValueKind::IntegerList,
                Some(ValueKind::Boolean) => ValueKind::BooleanList,
                Some(ValueKind::Math) => ValueKind::MathList,
                Some(_) => ValueKind::TextList,
            },
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Integer(i) => Some(*i as f64),
            Value::Math(math) => math.evaluate_to_number(),
            Value::Text(text) => parse_number(text),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        self.as_number()
            .filter(|n| n.is_finite())
            .map(|n| n.round() as i64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            Value::Text(text) => parse_bool(text),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_components(&self) -> Option<&[ComponentIdx]> {
        match self {
            Value::Components(components) => Some(components),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text rendering used for text concatenation and `text` state variables.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Number(n) => format_number(*n),
            Value::Integer(i) => i.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Text(text) => text.to_string(),
            Value::Math(math) => math.to_string(),
            Value::List(items) => items.iter().map(Value::to_text).collect::<Vec<_>>().join(", "),
            Value::Components(_) => String::new(),
        }
    }

    /// Convert to `kind`, returning `None` when the value cannot represent it.
    pub fn coerce(&self, kind: ValueKind) -> Option<Value> {
        match (kind, self) {
            (ValueKind::Any, value) => Some(value.clone()),
            (ValueKind::Number, Value::Null) => Some(Value::Number(f64::NAN)),
            (ValueKind::Number, value) => value.as_number().map(Value::Number),
            (ValueKind::Integer, value) => value.as_integer().map(Value::Integer),
            (ValueKind::Boolean, value) => value.as_bool().map(Value::Boolean),
            (ValueKind::Text, Value::Components(_)) => None,
            (ValueKind::Text, value) => Some(Value::text(value.to_text())),
            (ValueKind::Math, Value::Math(math)) => Some(Value::Math(math.clone())),
            (ValueKind::Math, Value::Null) => Some(Value::Math(MathExpr::blank())),
            (ValueKind::Math, Value::Number(n)) => Some(Value::Math(MathExpr::number(*n))),
            (ValueKind::Math, Value::Integer(i)) => Some(Value::Math(MathExpr::number(*i as f64))),
            (ValueKind::Math, Value::Text(text)) => MathExpr::parse(text).ok().map(Value::Math),
            (ValueKind::Math, _) => None,
            (ValueKind::Components, Value::Components(_)) => Some(self.clone()),
            (ValueKind::Components, _) => None,
            (list_kind, Value::List(items)) => {
                let item_kind = list_kind.item_kind()?;
                items
                    .iter()
                    .map(|item| item.coerce(item_kind))
                    .collect::<Option<Vec<_>>>()
                    .map(Value::List)
            }
            (_, Value::Null) => Some(kind.default_value()),
            _ => None,
        }
    }

    /// JSON rendering following JavaScript conventions: one number type,
    /// non-finite numbers as `null`, math as its expression tree.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => json!(null),
            Value::Number(n) => number_to_json(*n),
            Value::Integer(i) => json!(i),
            Value::Boolean(b) => json!(b),
            Value::Text(text) => json!(text.as_ref()),
            Value::Math(math) => math.to_json(),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Components(components) => {
                serde_json::Value::Array(components.iter().map(|c| json!(c.0)).collect())
            }
        }
    }
}

pub fn number_to_json(n: f64) -> serde_json::Value {
    if !n.is_finite() {
        json!(null)
    } else if n.fract() == 0.0 && n.abs() < 9.0e15 {
        json!(n as i64)
    } else {
        json!(n)
    }
}

pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() }
    } else if n == 0.0 {
        "0".to_string()
    } else {
        n.to_string()
    }
}

pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .parse::<f64>()
        .ok()
        .or_else(|| MathExpr::parse(trimmed).ok()?.evaluate_to_number())
}

pub fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_render_like_javascript() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.25), "0.25");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(number_to_json(4.0), json!(4));
        assert_eq!(number_to_json(f64::NAN), json!(null));
    }

    #[test]
    fn coercion_rejects_unparseable_text() {
        assert_eq!(Value::text(" 2+3 ").coerce(ValueKind::Number), Some(Value::Number(5.0)));
        assert_eq!(Value::text("cat").coerce(ValueKind::Number), None);
        assert_eq!(Value::text("TRUE").coerce(ValueKind::Boolean), Some(Value::Boolean(true)));
        assert_eq!(Value::text("x+").coerce(ValueKind::Math), None);
    }

    #[test]
    fn lists_coerce_item_by_item() {
        let list = Value::List(vec![Value::Integer(1), Value::text("2")]);
        assert_eq!(
            list.coerce(ValueKind::NumberList),
            Some(Value::List(vec![Value::Number(1.0), Value::Number(2.0)]))
        );
        assert_eq!(Value::List(vec![]).to_text(), "");
    }
}
