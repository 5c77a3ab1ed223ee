//! Test harness for building cores from markup and poking at them.
//! Provides action shortcuts and JSON assertions.

#![allow(dead_code)]

use doenet::{Core, CoreConfig, Diagnostic, Value, create_core};
use serde_json::Value as Json;

pub struct TestCore {
    pub core: Core,
}

impl TestCore {
    pub fn new(doenetml: &str) -> Self {
        Self::with_config(doenetml, CoreConfig::default())
    }

    pub fn with_variant(doenetml: &str, variant_index: u64) -> Self {
        Self::with_config(doenetml, CoreConfig::with_variant(variant_index))
    }

    pub fn with_config(doenetml: &str, config: CoreConfig) -> Self {
        let core = create_core(doenetml, config).expect("core should build");
        Self { core }
    }

    /// State value as it appears in a snapshot: components by name.
    pub fn value(&mut self, name: &str, state_variable: &str) -> Json {
        let idx = self.core.find(name).unwrap_or_else(|| panic!("no component named {name}"));
        let snapshot = self.core.component_snapshot(idx);
        match snapshot.state_values.get(state_variable) {
            Some(value) => value.clone(),
            None => self
                .core
                .state_value(name, state_variable)
                .unwrap_or_else(|error| panic!("{error}"))
                .to_json(),
        }
    }

    pub fn document_value(&mut self, state_variable: &str) -> Json {
        let name = self.core.component(self.core.root()).name.clone();
        self.value(&name, state_variable)
    }

    pub fn raw(&mut self, name: &str, state_variable: &str) -> Value {
        self.core
            .state_value(name, state_variable)
            .unwrap_or_else(|error| panic!("{error}"))
    }

    pub fn text(&mut self, name: &str, state_variable: &str) -> String {
        self.raw(name, state_variable).to_text()
    }

    pub fn number(&mut self, name: &str, state_variable: &str) -> f64 {
        self.raw(name, state_variable)
            .as_number()
            .unwrap_or_else(|| panic!("{name}.{state_variable} is not a number"))
    }

    #[track_caller]
    pub fn assert_value(&mut self, name: &str, state_variable: &str, expected: Json) {
        let actual = self.value(name, state_variable);
        assert_eq!(actual, expected, "{name}.{state_variable}");
    }

    pub fn component_type(&self, name: &str) -> &'static str {
        let idx = self.core.find(name).unwrap_or_else(|| panic!("no component named {name}"));
        self.core.component(idx).ty.name
    }

    pub fn exists(&self, name: &str) -> bool {
        self.core.find(name).is_some()
    }

    pub fn action(&mut self, name: &str, action: &str, args: Json) {
        self.core
            .call_action(name, action, &args)
            .unwrap_or_else(|error| panic!("{error}"));
    }

    pub fn type_text(&mut self, name: &str, text: &str) {
        self.core
            .update_text_input_value(name, text)
            .unwrap_or_else(|error| panic!("{error}"));
    }

    pub fn type_math(&mut self, name: &str, latex: &str) {
        self.core
            .update_math_input_value(name, latex)
            .unwrap_or_else(|error| panic!("{error}"));
    }

    pub fn snapshot_json(&mut self) -> Json {
        self.core.snapshot_json()
    }

    pub fn warnings(&self) -> &[Diagnostic] {
        &self.core.error_warnings().warnings
    }

    pub fn errors(&self) -> &[Diagnostic] {
        &self.core.error_warnings().errors
    }

    pub fn warnings_containing(&self, needle: &str) -> Vec<&Diagnostic> {
        self.warnings().iter().filter(|warning| warning.message.contains(needle)).collect()
    }
}
