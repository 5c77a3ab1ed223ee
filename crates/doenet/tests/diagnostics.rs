//! Errors and warnings collected while building a document.

mod common;

use common::TestCore;
use doenet::diagnostics::DoenetMlRange;
use serde_json::json;

#[test]
fn removed_attribute_is_an_informational_warning() {
    let core = TestCore::new("\n<section suppressAutoName><p>Hello</p></section>\n");
    let warnings = core.warnings_containing("suppressAutoName");
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].level, 1);
    let range = warnings[0].doenet_ml_range.expect("warning should carry a range");
    assert_eq!((range.line_begin, range.char_begin), (2, 1));
    assert_eq!(range.line_end, 2);
    assert!(core.errors().is_empty());
}

#[test]
fn deprecated_alias_still_applies() {
    let mut core = TestCore::new(r#"<select name="s" numberToSelect="2">a b c</select>"#);
    let warnings = core.warnings_containing("numberToSelect is deprecated");
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].level, 1);
    assert_eq!(core.value("s", "selectedIndices").as_array().map(Vec::len), Some(2));
}

#[test]
fn unknown_component_is_an_error_and_skipped() {
    let mut core = TestCore::new("<p name=\"p\">before</p>\n<foo/>\n<text name=\"t\">after</text>");
    assert_eq!(core.errors().len(), 1);
    let error = &core.errors()[0];
    assert!(error.message.contains("Invalid component type: <foo>"));
    assert_eq!(error.doenet_ml_range.map(|range| range.line_begin), Some(2));
    core.assert_value("t", "value", json!("after"));
}

#[test]
fn unknown_attribute_is_a_validation_warning() {
    let mut core = TestCore::new(r#"<text name="t" colour="red">hi</text>"#);
    let warnings = core.warnings_containing("Invalid attribute colour");
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].level, 2);
    core.assert_value("t", "value", json!("hi"));
}

#[test]
fn duplicate_names_keep_the_first() {
    let mut core = TestCore::new(r#"<text name="t">first</text><text name="t">second</text>"#);
    assert_eq!(core.warnings_containing("Duplicate component name: t").len(), 1);
    core.assert_value("t", "value", json!("first"));
}

#[test]
fn unresolved_reference_warns_once() {
    let mut core = TestCore::new(r#"<text name="t">$nothere</text><textInput name="ti"/>"#);
    assert_eq!(core.warnings_containing("Cannot resolve $nothere").len(), 1);
    core.assert_value("t", "value", json!(""));

    core.type_text("ti", "poke");
    core.snapshot_json();
    assert_eq!(core.warnings_containing("Cannot resolve $nothere").len(), 1);
}

#[test]
fn malformed_markup_is_reported() {
    let core = TestCore::new("<p>never closed");
    assert!(!core.errors().is_empty());
    assert!(core.errors()[0].message.starts_with("Invalid DoenetML"));
}

#[test]
fn diagnostics_serialize_for_renderers() {
    let core = TestCore::new("\n<section suppressAutoName/>");
    let json = serde_json::to_value(core.core.error_warnings()).unwrap();
    let warning = &json["warnings"][0];
    assert_eq!(warning["level"], 1);
    let range: DoenetMlRange = serde_json::from_value(warning["doenetMLrange"].clone()).unwrap();
    assert_eq!(range.line_begin, 2);
    assert_eq!(json["errors"], json!([]));
}
