//! Actions: the only way a settled core changes.
//!
//! Each action computes one batch of writes, applies it and settles. A write
//! that cannot be carried out is dropped as a whole and leaves one warning.

use super::inverse::WritePlan;
use super::{ComponentIdx, Core};
use crate::diagnostics::LEVEL_VALIDATION;
use crate::error::{CoreError, Result};
use crate::graph::Freshness;
use crate::value::Value;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    pub component_name: String,
    pub action_name: String,
    #[serde(default)]
    pub args: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<serde_json::Value>,
}

fn json_to_value(json: &serde_json::Value) -> Option<Value> {
    match json {
        serde_json::Value::String(text) => Some(Value::text(text)),
        serde_json::Value::Bool(flag) => Some(Value::Boolean(*flag)),
        serde_json::Value::Number(n) => n.as_f64().map(Value::Number),
        serde_json::Value::Array(items) => items.iter().map(json_to_value).collect::<Option<Vec<_>>>().map(Value::List),
        serde_json::Value::Null | serde_json::Value::Object(_) => None,
    }
}

fn invalid_args(action: &str, reason: &str) -> CoreError {
    CoreError::InvalidActionArgs { action: action.to_string(), reason: reason.to_string() }
}

impl Core {
    /// Dispatch a request as sent by a renderer.
    pub fn request_action(&mut self, request: &ActionRequest) -> Result<()> {
        if let Some(event) = &request.event {
            log::debug!("action {} on {} from event {event}", request.action_name, request.component_name);
        }
        self.call_action(&request.component_name, &request.action_name, &request.args)
    }

    pub fn call_action(&mut self, component: &str, action: &str, args: &serde_json::Value) -> Result<()> {
        let idx = self.find_or_err(component)?;
        let ty = self.component(idx).ty;
        if !ty.has_action(action) {
            return Err(CoreError::UnknownAction {
                component: component.to_string(),
                component_type: ty.name.to_string(),
                action: action.to_string(),
            });
        }
        log::debug!("action {action} on {}", self.component(idx).name);
        match action.to_ascii_lowercase().as_str() {
            "updateimmediatevalue" => {
                let value = args
                    .get("value")
                    .or_else(|| args.get("text"))
                    .and_then(json_to_value)
                    .ok_or_else(|| invalid_args(action, "expected `value`"))?;
                self.update_immediate_value(idx, value);
            }
            "updatevalue" => self.commit_value(idx),
            "updateselectedindices" => {
                let indices = args
                    .get("selectedIndices")
                    .and_then(serde_json::Value::as_array)
                    .ok_or_else(|| invalid_args(action, "expected `selectedIndices`"))?
                    .iter()
                    .map(|index| index.as_i64().map(Value::Integer))
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| invalid_args(action, "indices must be integers"))?;
                self.write_var(idx, "selectedIndices", Value::List(indices));
            }
            "resample" => self.resample(idx),
            "submitanswer" => self.submit(idx),
            _ => {}
        }
        Ok(())
    }

    fn input(&self, name: &str, component_type: &str) -> Result<ComponentIdx> {
        let idx = self.find_or_err(name)?;
        let ty = self.component(idx).ty;
        if ty.name.eq_ignore_ascii_case(component_type) {
            Ok(idx)
        } else {
            Err(CoreError::UnknownAction {
                component: name.to_string(),
                component_type: ty.name.to_string(),
                action: "updateValue".to_string(),
            })
        }
    }

    /// Type `text` into a text input and commit it.
    pub fn update_text_input_value(&mut self, name: &str, text: &str) -> Result<()> {
        let idx = self.input(name, "textInput")?;
        self.update_immediate_value(idx, Value::text(text));
        self.commit_value(idx);
        Ok(())
    }

    /// Type `latex` into a math input and commit it.
    pub fn update_math_input_value(&mut self, name: &str, latex: &str) -> Result<()> {
        let idx = self.input(name, "mathInput")?;
        self.update_immediate_value(idx, Value::text(latex));
        self.commit_value(idx);
        Ok(())
    }

    pub fn update_boolean_input_value(&mut self, name: &str, flag: bool) -> Result<()> {
        let idx = self.input(name, "booleanInput")?;
        self.update_immediate_value(idx, Value::Boolean(flag));
        self.commit_value(idx);
        Ok(())
    }

    /// Commit whatever was typed into an input.
    pub fn update_value(&mut self, name: &str) -> Result<()> {
        self.call_action(name, "updateValue", &serde_json::Value::Null)
    }

    pub fn update_selected_indices(&mut self, name: &str, indices: &[i64]) -> Result<()> {
        let args = serde_json::json!({ "selectedIndices": indices });
        self.call_action(name, "updateSelectedIndices", &args)
    }

    pub fn submit_answer(&mut self, name: &str) -> Result<()> {
        self.call_action(name, "submitAnswer", &serde_json::Value::Null)
    }

    /// Request a value for any state variable. `Ok(false)` when the write
    /// was rejected, which is also recorded as a warning.
    pub fn set_state_value(&mut self, component: &str, state_variable: &str, value: Value) -> Result<bool> {
        let idx = self.find_or_err(component)?;
        if self.component(idx).var(state_variable).is_none() {
            return Err(CoreError::UnknownStateVariable {
                component: component.to_string(),
                state_variable: state_variable.to_string(),
            });
        }
        Ok(self.write_var(idx, state_variable, value))
    }

    fn reject(&mut self, idx: ComponentIdx, var: &str, reason: &str) {
        let component = self.component(idx);
        let message = format!("Cannot set {var} of {}: {reason}", component.name);
        let position = component.position;
        self.diagnostics.warning(message, LEVEL_VALIDATION, position);
    }

    fn write_var(&mut self, idx: ComponentIdx, var: &str, value: Value) -> bool {
        let Some(cell) = self.component(idx).var(var) else {
            return false;
        };
        let mut plan = WritePlan::default();
        match self.plan_write(cell, &value, &mut plan, 0) {
            Ok(()) => {
                self.apply_writes(plan);
                true
            }
            Err(reason) => {
                self.reject(idx, var, &reason);
                false
            }
        }
    }

    fn update_immediate_value(&mut self, idx: ComponentIdx, value: Value) {
        let mut plan = WritePlan::default();
        if let Some(cell) = self.component(idx).essential("immediateValue") {
            plan.essential(cell, value);
        }
        self.apply_writes(plan);
    }

    /// Write the immediate value through `value`. Rejected or not, the
    /// immediate value is cleared so the input shows the committed value.
    fn commit_value(&mut self, idx: ComponentIdx) {
        let (Some(immediate), Some(value_cell)) = (
            self.component(idx).essential("immediateValue"),
            self.component(idx).var("value"),
        ) else {
            return;
        };
        let typed = self.graph.cell(immediate).value.clone();
        if typed.is_null() {
            return;
        }
        let mut plan = WritePlan::default();
        if let Err(reason) = self.plan_write(value_cell, &typed, &mut plan, 0) {
            self.reject(idx, "value", &reason);
            plan = WritePlan::default();
        }
        plan.essential(immediate, Value::Null);
        self.apply_writes(plan);
    }

    fn resample(&mut self, idx: ComponentIdx) {
        let Some(cell) = self.component(idx).var("replacements") else {
            return;
        };
        if let Some(state) = self.composite_mut(idx) {
            crate::composites::random_numbers::resample(&mut state.memory);
        }
        self.graph.cell_mut(cell).freshness = Freshness::Stale;
        self.graph.invalidate_subscribers(cell);
        self.settle();
    }

    fn submit(&mut self, idx: ComponentIdx) {
        let credit = self.read_var(idx, "creditIfSubmitted");
        let responses = self.read_var(idx, "currentResponses");
        let submissions = self.read_var(idx, "numSubmissions").as_integer().unwrap_or(0);
        let component = self.component(idx);
        let writes = [
            ("creditAchieved", credit),
            ("submittedResponses", responses),
            ("justSubmitted", Value::Boolean(true)),
            ("numSubmissions", Value::Integer(submissions + 1)),
        ];
        let mut plan = WritePlan::default();
        for (name, value) in writes {
            if let Some(cell) = component.essential(name) {
                plan.essential(cell, value);
            }
        }
        self.apply_writes(plan);
    }
}
