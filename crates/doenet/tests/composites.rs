//! Select, map, collect and sequence replacements.

mod common;

use common::TestCore;
use serde_json::{Value as Json, json};

const SIX_OPTIONS: &str = r#"
<select name="select1" numToSelect="6" assignNames="(a)(b)(c)(d)(e)(f)">
  <option><text>plain</text></option>
  <option><select><text>nested</text></select></option>
  <option>$ref</option>
  <option><selectFromSequence from="7" to="7"/></option>
  <option><select type="text">dog</select></option>
  <option><selectRandomNumbers type="discreteUniform" from="4" to="4"/></option>
</select>
<text name="ref">referenced</text>
"#;

#[test]
fn every_selected_option_lands_on_its_assigned_name() {
    let expected = [
        ("text", json!("plain")),
        ("text", json!("nested")),
        ("text", json!("referenced")),
        ("number", json!(7)),
        ("text", json!("dog")),
        ("number", json!(4)),
    ];
    for variant in [1, 2, 3, 500] {
        let mut core = TestCore::with_variant(SIX_OPTIONS, variant);
        let indices = core.value("select1", "selectedIndices");
        let indices = indices.as_array().expect("selected indices").clone();
        assert_eq!(indices.len(), 6);

        let mut sorted = indices.iter().filter_map(Json::as_u64).collect::<Vec<_>>();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![1, 2, 3, 4, 5, 6], "variant {variant}");

        for (name, index) in ["a", "b", "c", "d", "e", "f"].into_iter().zip(&indices) {
            let option = index.as_u64().unwrap() as usize - 1;
            let (component_type, value) = &expected[option];
            assert_eq!(core.component_type(name), *component_type, "variant {variant}, {name}");
            core.assert_value(name, "value", value.clone());
        }
        assert!(core.errors().is_empty());
    }
}

#[test]
fn map_aliases_name_source_and_index() {
    let mut core = TestCore::new(
        r#"<map name="m" assignNames="(r1) (r2)">
  <template><text>$x-$i</text></template>
  <sources alias="x" indexAlias="i"><text>a</text><text>b</text></sources>
</map>"#,
    );
    core.assert_value("r1", "value", json!("a-1"));
    core.assert_value("r2", "value", json!("b-2"));
    let snapshot = core.snapshot_json();
    assert_eq!(snapshot["/m"]["replacements"], json!(["/r1", "/r2"]));
}

#[test]
fn collect_copies_matching_descendants() {
    let mut core = TestCore::new(
        r#"<p name="p1"><text>one</text><math>x</math><span><text>two</text></span></p>
<collect name="c" source="p1" componentTypes="text" assignNames="c1 c2"/>"#,
    );
    core.assert_value("c1", "value", json!("one"));
    core.assert_value("c2", "value", json!("two"));
    assert!(core.errors().is_empty());
}

#[test]
fn collect_from_missing_source_is_an_error() {
    let mut core = TestCore::new(r#"<collect name="c" source="nothere" componentTypes="text"/>"#);
    assert_eq!(core.errors().len(), 1);
    assert!(core.errors()[0].message.contains("Cannot collect"));
    let snapshot = core.snapshot_json();
    assert_eq!(snapshot["/c"]["replacements"], json!([]));
}

#[test]
fn sequence_items_can_be_indexed() {
    let mut core = TestCore::new(r#"<sequence name="seq" from="2" to="4"/><text name="t">$seq[2]</text>"#);
    core.assert_value("seq", "values", json!([2, 3, 4]));
    core.assert_value("t", "value", json!("3"));
}

#[test]
fn select_warns_when_asked_for_too_many() {
    let mut core = TestCore::new(r#"<select name="s" numToSelect="3">a b</select>"#);
    assert_eq!(core.warnings_containing("Cannot select 3 components").len(), 1);
    assert_eq!(core.value("s", "selectedIndices").as_array().map(Vec::len), Some(2));
}

#[test]
fn long_sequences_index_their_last_item() {
    let mut core = TestCore::new(r#"<sequence name="seq" from="1" to="20000"/><text name="t">$seq[20000]</text>"#);
    core.assert_value("t", "value", json!("20000"));
    assert_eq!(core.value("seq", "values").as_array().map(Vec::len), Some(20_000));
}

const NESTED_CHOICE: &str = r#"
<select name="sel" assignNames="(x)">
  <option><selectFromSequence name="inner" from="1" to="5"/></option>
  <option><text>fixed</text></option>
</select>
"#;

#[test]
fn nested_random_option_assigns_its_own_selection() {
    let mut core = TestCore::with_variant(NESTED_CHOICE, 1);
    assert_eq!(core.document_value("numVariants"), json!(6));

    let mut inner_values = Vec::new();
    let mut fixed = 0;
    for variant in 1..=6 {
        let mut core = TestCore::with_variant(NESTED_CHOICE, variant);
        match core.value("sel", "selectedIndices") {
            indices if indices == json!([1]) => {
                let inner = core.value("sel/1/inner", "selectedIndices");
                let chosen = inner.as_array().and_then(|indices| indices.first()).and_then(Json::as_u64).unwrap();
                assert_eq!(core.component_type("x"), "number", "variant {variant}");
                core.assert_value("x", "value", json!(chosen));
                inner_values.push(chosen);
            }
            indices => {
                assert_eq!(indices, json!([2]), "variant {variant}");
                core.assert_value("x", "value", json!("fixed"));
                fixed += 1;
            }
        }
    }
    inner_values.sort_unstable();
    assert_eq!(inner_values, vec![1, 2, 3, 4, 5]);
    assert_eq!(fixed, 1);
}
