//! `<choiceInput>` and its `<choice>` children.

use super::common::pass_through_inverse;
use super::{
    AttributeSpec, ChildFilter, ComponentType, DataQuery, Deps, EssentialInit, EssentialSpec, InverseWrite,
    StateVarSpec,
};
use crate::value::{Value, ValueKind};

const CHOICES: ChildFilter = ChildFilter::of(&["choice"]);

fn choice_value(deps: &Deps) -> Value {
    Value::text(deps.values(0).map(Value::to_text).collect::<String>())
}

fn choice_text(deps: &Deps) -> Value {
    Value::text(deps.value(0).to_text().trim())
}

pub static CHOICE: ComponentType = ComponentType {
    name: "choice",
    state_vars: &[
        StateVarSpec::derived("value", ValueKind::Text, &[DataQuery::ChildValues], choice_value),
        StateVarSpec::derived("text", ValueKind::Text, &[DataQuery::StateVar("value")], choice_text),
        StateVarSpec::derived("credit", ValueKind::Number, &[DataQuery::Attribute("credit")], |deps| {
            Value::Number(deps.number(0))
        }),
    ],
    attributes: &[AttributeSpec::new("credit", ValueKind::Number, || Value::Number(0.0))],
    ..ComponentType::BASE
};

fn choice_texts(deps: &Deps) -> Value {
    Value::List(deps.values(0).cloned().collect())
}

fn num_choices(deps: &Deps) -> Value {
    Value::Integer(deps.list(0).len() as i64)
}

/// Valid, deduplicated, sorted 1-based indices. A single-selection input
/// keeps only the first.
fn normalize_indices(indices: &[Value], num_choices: i64, multiple: bool) -> Option<Vec<i64>> {
    let mut normalized = indices
        .iter()
        .map(|index| index.as_integer().filter(|index| (1..=num_choices).contains(index)))
        .collect::<Option<Vec<_>>>()?;
    normalized.sort_unstable();
    normalized.dedup();
    if !multiple && normalized.len() > 1 {
        return None;
    }
    Some(normalized)
}

fn integer_list(indices: &[i64]) -> Value {
    Value::List(indices.iter().copied().map(Value::Integer).collect())
}

fn selected_indices(deps: &Deps) -> Value {
    let num_choices = deps.integer(1).unwrap_or(0);
    let multiple = deps.flag(2);
    let mut indices = deps
        .list(0)
        .iter()
        .filter_map(Value::as_integer)
        .filter(|index| (1..=num_choices).contains(index))
        .collect::<Vec<_>>();
    indices.sort_unstable();
    indices.dedup();
    if !multiple {
        indices.truncate(1);
    }
    integer_list(&indices)
}

fn selected_indices_inverse(desired: &Value, deps: &Deps) -> Result<Vec<InverseWrite>, String> {
    let requested = desired.as_list().ok_or("selected indices must be a list")?;
    let num_choices = deps.integer(1).unwrap_or(0);
    let indices = normalize_indices(requested, num_choices, deps.flag(2)).ok_or_else(|| {
        let shown = requested.iter().map(Value::to_text).collect::<Vec<_>>().join(", ");
        format!("cannot select [{shown}] from {num_choices} choices")
    })?;
    Ok(vec![InverseWrite::new(0, 0, integer_list(&indices))])
}

fn selected_values(deps: &Deps) -> Value {
    let texts = deps.list(1);
    Value::List(
        deps.list(0)
            .iter()
            .filter_map(Value::as_integer)
            .filter_map(|index| texts.get(usize::try_from(index - 1).ok()?).cloned())
            .collect(),
    )
}

fn selected_value(deps: &Deps) -> Value {
    let joined = deps
        .list(0)
        .iter()
        .map(|value| value.to_text().trim().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    Value::text(joined)
}

/// Comma separated choice texts, matched case-insensitively after trimming.
fn selected_value_inverse(desired: &Value, deps: &Deps) -> Result<Vec<InverseWrite>, String> {
    let texts = deps.list(1);
    let text = desired.to_text();
    let mut indices = Vec::new();
    for piece in text.split(',').map(str::trim).filter(|piece| !piece.is_empty()) {
        let position = texts
            .iter()
            .position(|choice| choice.to_text().trim().eq_ignore_ascii_case(piece))
            .ok_or_else(|| format!("`{piece}` is not one of the choices"))?;
        indices.push(position as i64 + 1);
    }
    indices.sort_unstable();
    indices.dedup();
    Ok(vec![InverseWrite::new(2, 0, integer_list(&indices))])
}

fn credit_achieved(deps: &Deps) -> Value {
    let credits = deps.values(1).map(|credit| credit.as_number().unwrap_or(0.0)).collect::<Vec<_>>();
    let best = deps
        .list(0)
        .iter()
        .filter_map(Value::as_integer)
        .filter_map(|index| credits.get(usize::try_from(index - 1).ok()?).copied())
        .fold(0.0, f64::max);
    Value::Number(best.clamp(0.0, 1.0))
}

pub static CHOICE_INPUT: ComponentType = ComponentType {
    name: "choiceInput",
    state_vars: &[
        StateVarSpec::derived(
            "choiceTexts",
            ValueKind::TextList,
            &[DataQuery::Children { filter: CHOICES, state_var: "value" }],
            choice_texts,
        ),
        StateVarSpec::derived("numChoices", ValueKind::Integer, &[DataQuery::StateVar("choiceTexts")], num_choices),
        StateVarSpec::invertible(
            "selectedIndices",
            ValueKind::IntegerList,
            &[
                DataQuery::Essential("selectedIndices"),
                DataQuery::StateVar("numChoices"),
                DataQuery::Attribute("selectMultiple"),
            ],
            selected_indices,
            selected_indices_inverse,
        ),
        StateVarSpec::derived(
            "selectedValues",
            ValueKind::TextList,
            &[DataQuery::StateVar("selectedIndices"), DataQuery::StateVar("choiceTexts")],
            selected_values,
        ),
        StateVarSpec::invertible(
            "selectedValue",
            ValueKind::Text,
            &[
                DataQuery::StateVar("selectedValues"),
                DataQuery::StateVar("choiceTexts"),
                DataQuery::StateVar("selectedIndices"),
            ],
            selected_value,
            selected_value_inverse,
        ),
        StateVarSpec::invertible(
            "value",
            ValueKind::Text,
            &[DataQuery::StateVar("selectedValue")],
            |deps| deps.value(0),
            pass_through_inverse,
        )
        .private(),
        StateVarSpec::derived(
            "creditAchieved",
            ValueKind::Number,
            &[
                DataQuery::StateVar("selectedIndices"),
                DataQuery::Children { filter: CHOICES, state_var: "credit" },
            ],
            credit_achieved,
        ),
    ],
    essentials: &[EssentialSpec::new("selectedIndices", ValueKind::IntegerList, EssentialInit::Default)],
    attributes: &[AttributeSpec::new("selectMultiple", ValueKind::Boolean, || Value::Boolean(false))],
    actions: &["updateSelectedIndices"],
    ..ComponentType::BASE
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::DepItem;

    fn given(values: Vec<Value>) -> Deps {
        Deps {
            groups: values
                .into_iter()
                .map(|value| vec![DepItem { value, writable: true }])
                .collect(),
        }
    }

    fn texts(items: &[&str]) -> Value {
        Value::List(items.iter().map(Value::text).collect())
    }

    #[test]
    fn selected_value_matches_pieces_loosely_and_sorts() {
        let deps = given(vec![Value::List(vec![]), texts(&["  dog ", "caT"]), Value::List(vec![])]);
        let writes = selected_value_inverse(&Value::text("cat   ,DOG"), &deps).unwrap();
        assert_eq!(writes, vec![InverseWrite::new(2, 0, integer_list(&[1, 2]))]);
        assert!(selected_value_inverse(&Value::text("cat, bird"), &deps).is_err());
    }

    #[test]
    fn selected_value_joins_trimmed_texts() {
        let deps = given(vec![texts(&["  dog ", "caT"])]);
        assert_eq!(selected_value(&deps), Value::text("dog, caT"));
    }

    #[test]
    fn out_of_range_indices_are_rejected() {
        let deps = given(vec![Value::List(vec![]), Value::Integer(3), Value::Boolean(false)]);
        assert!(selected_indices_inverse(&integer_list(&[4]), &deps).is_err());
        assert!(selected_indices_inverse(&integer_list(&[1, 2]), &deps).is_err());
        assert_eq!(
            selected_indices_inverse(&integer_list(&[2]), &deps).unwrap(),
            vec![InverseWrite::new(0, 0, integer_list(&[2]))]
        );
    }

    #[test]
    fn credit_is_best_selected_choice() {
        let deps = Deps {
            groups: vec![
                vec![DepItem { value: integer_list(&[1, 3]), writable: true }],
                [0.0, 1.0, 0.5]
                    .into_iter()
                    .map(|credit| DepItem { value: Value::Number(credit), writable: true })
                    .collect(),
            ],
        };
        assert_eq!(credit_achieved(&deps), Value::Number(0.5));
    }
}
