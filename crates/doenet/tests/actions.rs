//! Actions from a renderer: typing, choosing and submitting.

mod common;

use common::TestCore;
use doenet::ActionRequest;
use serde_json::json;

const BOUND_CHOICES: &str = r#"<choiceInput name="ci" selectMultiple="true">
  <choice>  dog </choice>
  <choice>caT</choice>
  <choice>mouse</choice>
</choiceInput>
<textInput name="ti" bindValueTo="$ci.selectedValue"/>"#;

#[test]
fn typed_choices_match_loosely() {
    let mut core = TestCore::new(BOUND_CHOICES);
    core.assert_value("ti", "value", json!(""));

    core.type_text("ti", "cat   ,DOG");
    core.assert_value("ci", "selectedIndices", json!([1, 2]));
    core.assert_value("ci", "selectedValues", json!(["  dog ", "caT"]));
    core.assert_value("ci", "selectedValue", json!("dog, caT"));
    core.assert_value("ti", "value", json!("dog, caT"));
    assert!(core.warnings().is_empty());
}

#[test]
fn invalid_value_into_text_does_nothing() {
    let mut core = TestCore::new(BOUND_CHOICES);
    core.type_text("ti", "cat   ,DOG");

    core.type_text("ti", "dog, bird");
    assert_eq!(core.warnings().len(), 1);
    core.assert_value("ci", "selectedIndices", json!([1, 2]));
    core.assert_value("ti", "value", json!("dog, caT"));
    core.assert_value("ti", "immediateValue", json!("dog, caT"));
}

#[test]
fn out_of_range_indices_are_rejected() {
    let mut core = TestCore::new(r#"<choiceInput name="ci"><choice>a</choice><choice>b</choice></choiceInput>"#);
    core.core.update_selected_indices("ci", &[2]).unwrap();
    core.assert_value("ci", "selectedValue", json!("b"));

    core.core.update_selected_indices("ci", &[3]).unwrap();
    assert_eq!(core.warnings().len(), 1);
    core.assert_value("ci", "selectedIndices", json!([2]));
}

#[test]
fn submitting_records_credit_and_responses() {
    let mut core = TestCore::new(r#"<answer name="ans"><mathInput name="mi"/><award>x+1</award></answer>"#);
    core.assert_value("ans", "creditAchieved", json!(0));

    core.type_math("mi", "1+x");
    core.assert_value("ans", "creditIfSubmitted", json!(1));
    core.assert_value("ans", "creditAchieved", json!(0));

    core.core.submit_answer("ans").unwrap();
    core.assert_value("ans", "creditAchieved", json!(1));
    core.assert_value("ans", "numSubmissions", json!(1));
    core.assert_value("ans", "justSubmitted", json!(true));

    core.type_math("mi", "2");
    core.assert_value("ans", "justSubmitted", json!(false));
    core.assert_value("ans", "creditIfSubmitted", json!(0));
    core.assert_value("ans", "creditAchieved", json!(1));
}

#[test]
fn choice_credit_counts_for_the_answer() {
    let mut core = TestCore::new(
        r#"<answer name="ans"><choiceInput name="ci"><choice>no</choice><choice credit="1">yes</choice></choiceInput></answer>"#,
    );
    core.core.update_selected_indices("ci", &[2]).unwrap();
    core.action("ans", "submitAnswer", json!({}));
    core.assert_value("ans", "creditAchieved", json!(1));
}

#[test]
fn requests_deserialize_from_renderer_json() {
    let mut core = TestCore::new(r#"<textInput name="ti"/><text name="t">$ti</text>"#);
    let typed: ActionRequest = serde_json::from_value(json!({
        "componentName": "ti",
        "actionName": "updateImmediateValue",
        "args": { "text": "abc" },
    }))
    .unwrap();
    core.core.request_action(&typed).unwrap();
    core.assert_value("t", "value", json!(""));

    let commit: ActionRequest = serde_json::from_value(json!({ "componentName": "ti", "actionName": "updateValue" })).unwrap();
    core.core.request_action(&commit).unwrap();
    core.assert_value("t", "value", json!("abc"));
}

#[test]
fn malformed_action_arguments_are_errors() {
    let mut core = TestCore::new(r#"<choiceInput name="ci"><choice>a</choice></choiceInput>"#);
    let result = core.core.call_action("ci", "updateSelectedIndices", &json!({ "selectedIndices": "one" }));
    assert!(result.is_err());
    assert!(core.warnings().is_empty());
}
