//! Variant selection, seeding and the stability of random choices.

mod common;

use common::TestCore;
use doenet::{CoreConfig, Value};
use serde_json::{Value as Json, json};
use std::collections::HashSet;

const TWO_SELECTS: &str = r#"<select name="s1" assignNames="x">a b c</select><select name="s2" assignNames="y">d e</select>"#;

fn pair(core: &mut TestCore) -> (String, String) {
    (core.text("x", "value"), core.text("y", "value"))
}

#[test]
fn same_variant_same_document() {
    let doenetml = r#"<select assignNames="w">a b c d</select>
<sampleRandomNumbers numSamples="3"/>
<selectFromSequence from="1" to="100" numToSelect="4"/>"#;
    for variant in [1, 7, 42] {
        let first = TestCore::with_variant(doenetml, variant).snapshot_json();
        let second = TestCore::with_variant(doenetml, variant).snapshot_json();
        assert_eq!(first, second, "variant {variant}");
    }
    let one = TestCore::with_variant(doenetml, 1).snapshot_json();
    let two = TestCore::with_variant(doenetml, 2).snapshot_json();
    assert_ne!(one, two);
}

#[test]
fn unique_variants_visit_every_combination_then_wrap() {
    let mut first = TestCore::with_variant(TWO_SELECTS, 1);
    assert_eq!(first.document_value("numVariants"), json!(6));

    let mut seen = HashSet::new();
    for variant in 1..=6 {
        let mut core = TestCore::with_variant(TWO_SELECTS, variant);
        assert_eq!(core.document_value("variantIndex"), json!(variant));
        assert!(seen.insert(pair(&mut core)), "variant {variant} repeats an earlier one");
    }
    assert_eq!(seen.len(), 6);

    for variant in 1..=6 {
        let mut core = TestCore::with_variant(TWO_SELECTS, variant);
        let mut wrapped = TestCore::with_variant(TWO_SELECTS, variant + 6);
        assert_eq!(pair(&mut core), pair(&mut wrapped));
    }
}

#[test]
fn digits_go_to_random_points_least_significant_first() {
    for variant in 1..=6u64 {
        let mut core = TestCore::with_variant(TWO_SELECTS, variant);
        let digit = variant - 1;
        core.assert_value("s1", "selectedIndices", json!([digit % 3 + 1]));
        core.assert_value("s2", "selectedIndices", json!([digit / 3 + 1]));
    }
}

#[test]
fn variant_names_pick_the_variant() {
    let doenetml = r#"<variantControl numVariants="3" variantNames="apple banana cherry"/>
<select assignNames="x">a b c</select>"#;
    let config = CoreConfig { requested_variant_name: Some("Banana".into()), ..CoreConfig::default() };
    let mut core = TestCore::with_config(doenetml, config);
    assert_eq!(core.document_value("variantName"), json!("banana"));
    assert_eq!(core.document_value("variantIndex"), json!(2));
    core.assert_value("x", "value", json!("b"));

    let config = CoreConfig { requested_variant_name: Some("durian".into()), ..CoreConfig::default() };
    assert!(doenet::create_core(doenetml, config).is_err());
}

#[test]
fn problems_number_their_own_variants() {
    let doenetml = r#"<problem name="p1"><select assignNames="x">a b</select></problem>
<problem name="p2"><select assignNames="y">c d</select></problem>"#;
    let mut seen = HashSet::new();
    for variant in 1..=4 {
        let mut core = TestCore::with_variant(doenetml, variant);
        let first = core.value("p1", "variantIndex");
        let second = core.value("p2", "variantIndex");
        let x = core.text("x", "value");
        let y = core.text("y", "value");
        assert_eq!(x, if first == json!(1) { "a" } else { "b" });
        assert_eq!(y, if second == json!(1) { "c" } else { "d" });
        seen.insert((first.to_string(), second.to_string()));
    }
    assert_eq!(seen.len(), 4);
}

#[test]
fn discrete_uniform_samples_match_the_population() {
    let doenetml = r#"<sampleRandomNumbers name="s" type="discreteUniform" from="-3" to="5" exclude="-2 0" numToSelect="5" assignNames="a b c d e"/>"#;
    let population = [-3.0, -1.0, 1.0, 2.0, 3.0, 4.0, 5.0];
    let mut samples = Vec::new();
    for variant in 1..=80 {
        let mut core = TestCore::with_variant(doenetml, variant);
        for name in ["a", "b", "c", "d", "e"] {
            let value = core.number(name, "value");
            assert!(population.contains(&value), "{value} drawn in variant {variant}");
            samples.push(value);
        }
    }

    let mean = |values: &[f64]| values.iter().sum::<f64>() / values.len() as f64;
    let variance = |values: &[f64]| {
        let center = mean(values);
        values.iter().map(|value| (value - center).powi(2)).sum::<f64>() / values.len() as f64
    };
    assert!((mean(&samples) - mean(&population)).abs() < 0.6, "mean {}", mean(&samples));
    assert!((variance(&samples) - variance(&population)).abs() < 1.5, "variance {}", variance(&samples));
}

#[test]
fn growing_a_sample_keeps_earlier_draws() {
    let doenetml = r#"<number name="n">3</number>
<sampleRandomNumbers name="s" numSamples="$n" assignNames="x1 x2 x3 x4 x5 x6"/>"#;
    let mut core = TestCore::with_variant(doenetml, 5);
    let before = ["x1", "x2", "x3"].map(|name| core.value(name, "value"));
    assert!(!core.exists("x4"));

    assert!(core.core.set_state_value("n", "value", Value::Number(6.0)).unwrap());
    let after = ["x1", "x2", "x3"].map(|name| core.value(name, "value"));
    assert_eq!(before, after);
    for name in ["x4", "x5", "x6"] {
        let value = core.number(name, "value");
        assert!((0.0..1.0).contains(&value), "{name} = {value}");
    }
}

#[test]
fn resample_redraws_only_the_target() {
    let doenetml = r#"<sampleRandomNumbers name="s1" numSamples="2" assignNames="a1 a2"/>
<sampleRandomNumbers name="s2" numSamples="2" assignNames="b1 b2"/>"#;
    let mut core = TestCore::with_variant(doenetml, 3);
    let targeted = ["a1", "a2"].map(|name| core.value(name, "value"));
    let untouched = ["b1", "b2"].map(|name| core.value(name, "value"));

    core.action("s1", "resample", json!({}));
    assert_ne!(["a1", "a2"].map(|name| core.value(name, "value")), targeted);
    assert_eq!(["b1", "b2"].map(|name| core.value(name, "value")), untouched);
}

#[test]
fn selections_survive_unrelated_changes_and_growth() {
    let doenetml = r#"<number name="n">2</number>
<select name="s" numToSelect="$n">a b c d e f g h</select>
<textInput name="ti"/><text name="echo">$ti</text>"#;
    let mut core = TestCore::with_variant(doenetml, 11);
    let chosen = core.value("s", "selectedIndices");
    assert_eq!(chosen.as_array().map(Vec::len), Some(2));

    core.type_text("ti", "something else");
    core.assert_value("echo", "value", json!("something else"));
    assert_eq!(core.value("s", "selectedIndices"), chosen);

    assert!(core.core.set_state_value("n", "value", Value::Number(4.0)).unwrap());
    let grown = core.value("s", "selectedIndices");
    let grown = grown.as_array().cloned().unwrap_or_default();
    assert_eq!(grown.len(), 4);
    assert_eq!(Json::Array(grown[..2].to_vec()), chosen);
}

#[test]
fn deprecated_count_alias_enumerates_every_pair() {
    let doenetml = r#"<selectRandomNumbers name="s" type="discreteUniform" from="1" to="3" numberToSelect="2" assignNames="a b"/>"#;
    let mut first = TestCore::with_variant(doenetml, 1);
    assert_eq!(first.document_value("numVariants"), json!(9));

    let mut seen = HashSet::new();
    for variant in 1..=9 {
        let mut core = TestCore::with_variant(doenetml, variant);
        let drawn = (core.number("a", "value"), core.number("b", "value"));
        assert!([drawn.0, drawn.1].iter().all(|value| (1.0..=3.0).contains(value)), "{drawn:?}");
        assert!(seen.insert(format!("{drawn:?}")), "variant {variant} repeats {drawn:?}");
    }
    assert_eq!(seen.len(), 9);

    let mut wrapped = TestCore::with_variant(doenetml, 10);
    assert_eq!(wrapped.value("a", "value"), first.value("a", "value"));
    assert_eq!(wrapped.value("b", "value"), first.value("b", "value"));
}

fn replacement_count(core: &TestCore, name: &str) -> usize {
    let idx = core.core.find(name).expect("composite");
    core.core.component(idx).composite.as_ref().map_or(0, |state| state.replacements().len())
}

#[test]
fn huge_sample_counts_are_capped_with_a_warning() {
    let mut core = TestCore::new(r#"<sampleRandomNumbers name="s" numSamples="1e15"/>"#);
    let warnings = core.warnings_containing("Cannot draw 1000000000000000 random numbers");
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].level, 2);
    assert_eq!(replacement_count(&core, "s"), 100_000);

    core.snapshot_json();
    assert_eq!(core.warnings_containing("Cannot draw").len(), 1);
}

#[test]
fn excluding_every_candidate_draws_nothing() {
    let mut core = TestCore::new(
        r#"<selectRandomNumbers name="s" type="discreteUniform" from="1" to="3" exclude="1 2 3"/>
<textInput name="ti"/>"#,
    );
    let warnings = core.warnings_containing("every candidate is excluded");
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].level, 2);
    assert!(core.errors().is_empty());
    assert_eq!(core.snapshot_json()["/s"]["replacements"], json!([]));

    core.type_text("ti", "again");
    core.snapshot_json();
    assert_eq!(core.warnings_containing("every candidate is excluded").len(), 1);
}

#[test]
fn changing_a_sample_distribution_draws_independently() {
    let doenetml = r#"<number name="to">1</number>
<sampleRandomNumbers name="s" to="$to" numSamples="3" assignNames="a b c"/>"#;
    let mut core = TestCore::with_variant(doenetml, 4);
    let before = ["a", "b", "c"].map(|name| core.number(name, "value"));

    assert!(core.core.set_state_value("to", "value", Value::Number(100.0)).unwrap());
    let after = ["a", "b", "c"].map(|name| core.number(name, "value"));
    for value in after {
        assert!((0.0..100.0).contains(&value), "{value}");
    }
    let rescaled = before.iter().zip(&after).all(|(old, new)| (new - old * 100.0).abs() < 1e-9);
    assert!(!rescaled, "{before:?} became {after:?}");
}

#[test]
fn withheld_replacements_keep_their_names_and_values() {
    let doenetml = r#"<number name="n">3</number>
<sampleRandomNumbers name="s" numSamples="$n" assignNames="x1 x2 x3"/>"#;
    let mut core = TestCore::with_variant(doenetml, 2);
    let third = core.value("x3", "value");

    assert!(core.core.set_state_value("n", "value", Value::Number(1.0)).unwrap());
    let snapshot = core.snapshot_json();
    assert_eq!(snapshot["/s"]["replacementsToWithhold"], json!(2));
    assert!(core.exists("x3"));
    assert_eq!(core.value("x3", "value"), third);

    assert!(core.core.set_state_value("n", "value", Value::Number(3.0)).unwrap());
    assert_eq!(core.snapshot_json()["/s"]["replacementsToWithhold"], json!(0));
    assert_eq!(core.value("x3", "value"), third);
}
