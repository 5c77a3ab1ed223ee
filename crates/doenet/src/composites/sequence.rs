//! `<sequence>` and `<selectFromSequence>`.

use super::{CompositeKind, Memory, discard_groups, num_groups, push_group, show_groups, sync_value_groups};
use crate::components::{self, AttributeSpec, ChildPolicy, ComponentType, DataQuery, Deps, StateVarSpec};
use crate::core::instantiate::{create_replacement, group_scope};
use crate::core::{ComponentIdx, Core, Extend};
use crate::diagnostics::LEVEL_VALIDATION;
use crate::math::MathExpr;
use crate::value::{Value, ValueKind, parse_number};
use crate::variants::enumerate::{decode_combination, decode_multiset, decode_permutation, decode_tuple};
use crate::variants::{index_to_letters, letters_to_index};
use rand::Rng;

/// Longest sequence, and most numbers drawn at once.
pub(crate) const MAX_LENGTH: usize = 100_000;
const DEFAULT_LENGTH: i64 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequenceKind {
    Number,
    Letters,
    Math,
}

impl SequenceKind {
    pub fn from_attribute(text: Option<&str>) -> Self {
        match text.map(str::trim) {
            Some(kind) if kind.eq_ignore_ascii_case("letters") => SequenceKind::Letters,
            Some(kind) if kind.eq_ignore_ascii_case("math") => SequenceKind::Math,
            _ => SequenceKind::Number,
        }
    }

    pub fn component_type(self) -> &'static str {
        match self {
            SequenceKind::Number => "number",
            SequenceKind::Letters => "text",
            SequenceKind::Math => "math",
        }
    }
}

/// Comma or whitespace separated list.
pub fn split_list(text: &str) -> Vec<String> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}

fn round(value: f64) -> f64 {
    (value * 1e10).round() / 1e10
}

fn given(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|text| !text.is_empty())
}

/// The numeric positions of a sequence: `from`, `from + step`, ... up to
/// `to` or for `length` items.
fn positions(from: f64, to: Option<f64>, step: Option<f64>, length: Option<i64>) -> Vec<f64> {
    let (step, length) = match (to, step, length) {
        (Some(to), None, Some(length)) if length > 1 => ((to - from) / (length - 1) as f64, length),
        (Some(_), None, Some(length)) => (1.0, length),
        (_, step, Some(length)) => (step.unwrap_or(1.0), length),
        (Some(to), step, None) => {
            let step = step.unwrap_or(1.0);
            if step == 0.0 {
                (step, 1)
            } else {
                let count = ((to - from) / step + 1e-10).floor();
                (step, if count < 0.0 { 0 } else { count as i64 + 1 })
            }
        }
        (None, step, None) => (step.unwrap_or(1.0), DEFAULT_LENGTH),
    };
    let length = usize::try_from(length.max(0)).unwrap_or(0).min(MAX_LENGTH);
    (0..length).map(|i| round(from + i as f64 * step)).collect()
}

pub fn generate(
    kind: SequenceKind,
    from: Option<&str>,
    to: Option<&str>,
    step: Option<&str>,
    length: Option<i64>,
    exclude: &[String],
) -> Vec<Value> {
    let step = given(step).and_then(parse_number);
    match kind {
        SequenceKind::Letters => {
            let upper = given(from).is_some_and(|from| from.chars().all(|c| c.is_ascii_uppercase()));
            let from = given(from).and_then(letters_to_index).unwrap_or(1) as f64;
            let to = given(to).and_then(letters_to_index).map(|to| to as f64);
            positions(from, to, step.map(f64::round), length)
                .into_iter()
                .filter(|index| *index >= 1.0)
                .map(|index| {
                    let letters = index_to_letters(index as u64);
                    if upper { letters.to_ascii_uppercase() } else { letters }
                })
                .filter(|letters| !exclude.iter().any(|excluded| excluded.eq_ignore_ascii_case(letters)))
                .map(Value::text)
                .collect()
        }
        SequenceKind::Number | SequenceKind::Math => {
            let from = given(from).and_then(parse_number).unwrap_or(1.0);
            let to = given(to).and_then(parse_number);
            let excluded = exclude.iter().filter_map(|text| parse_number(text)).collect::<Vec<_>>();
            positions(from, to, step, length)
                .into_iter()
                .filter(|value| !excluded.iter().any(|excluded| (excluded - value).abs() < 1e-10))
                .map(|value| match kind {
                    SequenceKind::Math => Value::Math(MathExpr::number(value)),
                    _ => Value::Number(value),
                })
                .collect()
        }
    }
}

const SEQUENCE_ATTRIBUTES: [AttributeSpec; 6] = [
    AttributeSpec::new("type", ValueKind::Text, || Value::text("number")),
    AttributeSpec::new("from", ValueKind::Text, || Value::text("")),
    AttributeSpec::new("to", ValueKind::Text, || Value::text("")),
    AttributeSpec::new("step", ValueKind::Text, || Value::text("")),
    AttributeSpec::new("length", ValueKind::Integer, || Value::Null),
    AttributeSpec::new("exclude", ValueKind::Text, || Value::text("")),
];

const SEQUENCE_QUERIES: &[DataQuery] = &[
    DataQuery::Attribute("type"),
    DataQuery::Attribute("from"),
    DataQuery::Attribute("to"),
    DataQuery::Attribute("step"),
    DataQuery::Attribute("length"),
    DataQuery::Attribute("exclude"),
];

fn sequence_values(deps: &Deps) -> Value {
    let [kind, from, to, step] = [0, 1, 2, 3].map(|query| deps.value(query).to_text());
    let exclude = split_list(&deps.value(5).to_text());
    Value::List(generate(
        SequenceKind::from_attribute(Some(kind.as_str())),
        Some(from.as_str()),
        Some(to.as_str()),
        Some(step.as_str()),
        deps.integer(4),
        &exclude,
    ))
}

fn sequence_kind(deps: &Deps) -> Value {
    let kind = deps.value(0).to_text();
    Value::text(SequenceKind::from_attribute(Some(kind.as_str())).component_type())
}

pub static SEQUENCE: ComponentType = ComponentType {
    name: "sequence",
    state_vars: &[
        StateVarSpec::replacements(),
        StateVarSpec::derived("values", ValueKind::Any, SEQUENCE_QUERIES, sequence_values),
        StateVarSpec::derived("itemType", ValueKind::Text, &[DataQuery::Attribute("type")], sequence_kind).private(),
    ],
    attributes: &SEQUENCE_ATTRIBUTES,
    children: ChildPolicy::Deferred,
    composite: Some(CompositeKind::Sequence),
    ..ComponentType::BASE
};

/// Replacement `i` extends item `i` of `values`, so edits to a sequence
/// item are not possible but copies of it follow the sequence.
pub(crate) fn update(core: &mut Core, idx: ComponentIdx, memory: Memory) -> Memory {
    let length = core.read_var(idx, "values").as_list().map_or(0, <[Value]>::len);
    let type_name = core.read_var(idx, "itemType").to_text();
    let Some(ty) = components::lookup(&type_name) else {
        return memory;
    };
    let Some(values_cell) = core.component(idx).var("values") else {
        return memory;
    };

    let same_type = core
        .composite(idx)
        .and_then(|state| state.groups.first())
        .and_then(|group| group.first())
        .is_none_or(|first| std::ptr::eq(core.component(*first).ty, ty));
    if !same_type {
        discard_groups(core, idx, 0);
    }
    for g in num_groups(core, idx)..length {
        let scope = group_scope(core, idx, g, Vec::new());
        let extend = Extend::StateVar { cell: values_cell, index: Some(g) };
        let member = create_replacement(core, idx, g, ty, Some(extend), scope);
        push_group(core, idx, vec![member]);
    }
    show_groups(core, idx, length);
    memory
}

pub static SELECT_FROM_SEQUENCE: ComponentType = ComponentType {
    name: "selectFromSequence",
    state_vars: &[
        StateVarSpec::replacements(),
        StateVarSpec::derived("values", ValueKind::Any, SEQUENCE_QUERIES, sequence_values).private(),
        StateVarSpec::derived(
            "selectedIndices",
            ValueKind::IntegerList,
            &[DataQuery::Essential("selectedIndices")],
            |deps| deps.value(0),
        ),
    ],
    essentials: &[components::EssentialSpec::new(
        "selectedIndices",
        ValueKind::IntegerList,
        components::EssentialInit::Default,
    )],
    attributes: &[
        SEQUENCE_ATTRIBUTES[0],
        SEQUENCE_ATTRIBUTES[1],
        SEQUENCE_ATTRIBUTES[2],
        SEQUENCE_ATTRIBUTES[3],
        SEQUENCE_ATTRIBUTES[4],
        SEQUENCE_ATTRIBUTES[5],
        AttributeSpec::new("numToSelect", ValueKind::Integer, || Value::Integer(1)).renamed_from("numberToSelect"),
        AttributeSpec::new("withReplacement", ValueKind::Boolean, || Value::Boolean(false)),
        AttributeSpec::new("sortResults", ValueKind::Boolean, || Value::Boolean(false)),
    ],
    children: ChildPolicy::Deferred,
    composite: Some(CompositeKind::SelectFromSequence),
    ..ComponentType::BASE
};

/// Chosen positions of a `selectFromSequence`, kept across updates.
#[derive(Debug, Default)]
pub struct PickMemory {
    pub picks: Vec<usize>,
    pub warned: bool,
}

fn decode(digit: u64, n: usize, k: usize, with_replacement: bool, sorted: bool) -> Vec<usize> {
    let (n, k) = (n as u64, k as u64);
    let picks = match (with_replacement, sorted) {
        (false, false) => decode_permutation(digit, n, k),
        (false, true) => decode_combination(digit, n, k),
        (true, false) => decode_tuple(digit, n, k),
        (true, true) => decode_multiset(digit, n, k),
    };
    picks.into_iter().map(|pick| pick as usize).collect()
}

pub(crate) fn update_select(core: &mut Core, idx: ComponentIdx, memory: Memory) -> Memory {
    let mut memory = match memory {
        Memory::Picks(memory) => memory,
        _ => PickMemory::default(),
    };
    let values = match core.read_var(idx, "values") {
        Value::List(values) => values,
        _ => Vec::new(),
    };
    let kind_text = core.read_attribute(idx, "type").to_text();
    let kind = SequenceKind::from_attribute(Some(kind_text.as_str()));
    let requested = core.read_attribute(idx, "numToSelect").as_integer().unwrap_or(1).max(0) as usize;
    let with_replacement = core.read_attribute(idx, "withReplacement").as_bool().unwrap_or(false);
    let sorted = core.read_attribute(idx, "sortResults").as_bool().unwrap_or(false);
    let n = values.len();

    let k = if !with_replacement && requested > n {
        if !memory.warned {
            let position = core.component(idx).position;
            core.diagnostics.warning(
                format!("Cannot select {requested} values without replacement from a sequence of length {n}"),
                LEVEL_VALIDATION,
                position,
            );
            memory.warned = true;
        }
        n
    } else {
        requested
    };
    if n == 0 {
        sync_value_groups(core, idx, kind.component_type(), &[]);
        return Memory::Picks(memory);
    }

    memory.picks.retain(|pick| *pick < n);
    if memory.picks.len() < k {
        let source = core.component(idx).variant;
        match source.digit {
            Some(digit) if memory.picks.is_empty() => memory.picks = decode(digit, n, k, with_replacement, sorted),
            _ => {
                for p in memory.picks.len()..k {
                    let mut rng = source.seed.child(0).child(p as u64).rng();
                    let pick = if with_replacement {
                        rng.gen_range(0..n)
                    } else {
                        let available = (0..n).filter(|i| !memory.picks.contains(i)).collect::<Vec<_>>();
                        available[rng.gen_range(0..available.len())]
                    };
                    memory.picks.push(pick);
                }
                if sorted {
                    memory.picks.sort_unstable();
                }
            }
        }
    }

    let shown = &memory.picks[..k.min(memory.picks.len())];
    let selected = shown.iter().map(|pick| values[*pick].clone()).collect::<Vec<_>>();
    let indices = Value::List(shown.iter().map(|pick| Value::Integer(*pick as i64 + 1)).collect());
    core.write_essential_if_changed(idx, "selectedIndices", indices);
    sync_value_groups(core, idx, kind.component_type(), &selected);
    Memory::Picks(memory)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(values: &[Value]) -> Vec<f64> {
        values.iter().filter_map(Value::as_number).collect()
    }

    #[test]
    fn number_sequences() {
        let none: &[String] = &[];
        assert_eq!(numbers(&generate(SequenceKind::Number, None, None, None, None, none)).len(), 10);
        assert_eq!(
            numbers(&generate(SequenceKind::Number, Some("-3"), Some("5"), None, None, &["-2".into(), "0".into()])),
            vec![-3.0, -1.0, 1.0, 2.0, 3.0, 4.0, 5.0]
        );
        assert_eq!(
            numbers(&generate(SequenceKind::Number, Some("0"), Some("1"), None, Some(5), none)),
            vec![0.0, 0.25, 0.5, 0.75, 1.0]
        );
        assert_eq!(
            numbers(&generate(SequenceKind::Number, Some("0.1"), Some("0.3"), Some("0.1"), None, none)),
            vec![0.1, 0.2, 0.3]
        );
        assert!(generate(SequenceKind::Number, Some("5"), Some("1"), None, None, none).is_empty());
    }

    #[test]
    fn letter_sequences_keep_case() {
        let letters = generate(SequenceKind::Letters, Some("X"), Some("AB"), None, None, &["z".into()]);
        let letters = letters.iter().map(Value::to_text).collect::<Vec<_>>();
        assert_eq!(letters, vec!["X", "Y", "AA", "AB"]);
    }

    #[test]
    fn decoded_picks_cover_the_space() {
        let mut seen = (0..20).map(|digit| decode(digit, 5, 2, false, false)).collect::<Vec<_>>();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 20);
        assert!(seen.iter().all(|pick| pick[0] != pick[1]));
    }
}
