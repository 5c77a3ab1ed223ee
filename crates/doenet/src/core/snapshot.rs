//! `returnAllStateVariables`: every shown component with its public state.

use super::{ComponentIdx, Core};
use crate::value::Value;
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSnapshot {
    pub component_type: String,
    pub state_values: IndexMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacements: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacements_to_withhold: Option<usize>,
}

/// Full component name to its snapshot, in creation order.
pub type StateSnapshot = IndexMap<String, ComponentSnapshot>;

impl Core {
    fn value_to_json(&self, value: &Value) -> serde_json::Value {
        match value {
            Value::Components(components) => serde_json::Value::Array(
                components
                    .iter()
                    .map(|idx| serde_json::Value::String(self.component(*idx).name.clone()))
                    .collect(),
            ),
            value => value.to_json(),
        }
    }

    pub fn component_snapshot(&mut self, idx: ComponentIdx) -> ComponentSnapshot {
        let vars = self
            .component(idx)
            .vars
            .iter()
            .filter(|(spec, _)| spec.public)
            .map(|(spec, cell)| (spec.name, *cell))
            .collect::<Vec<_>>();
        let mut state_values = IndexMap::with_capacity(vars.len());
        for (name, cell) in vars {
            let value = self.evaluate(cell);
            state_values.insert(name.to_string(), self.value_to_json(&value));
        }

        let component = self.component(idx);
        let (replacements, replacements_to_withhold) = match &component.composite {
            Some(state) => (
                Some(state.replacements().iter().map(|idx| self.component(*idx).name.clone()).collect()),
                Some(state.withheld_count()),
            ),
            None => (None, None),
        };
        ComponentSnapshot {
            component_type: component.ty.name.to_string(),
            state_values,
            replacements,
            replacements_to_withhold,
        }
    }

    /// Snapshot of every active component outside attributes.
    pub fn return_all_state_variables(&mut self) -> StateSnapshot {
        let shown = (0..self.components.len() as u32)
            .map(ComponentIdx)
            .filter(|idx| {
                let component = self.component(*idx);
                component.active && !component.in_attribute
            })
            .collect::<Vec<_>>();
        let mut snapshot = StateSnapshot::with_capacity(shown.len());
        for idx in shown {
            let component = self.component_snapshot(idx);
            snapshot.insert(self.component(idx).name.clone(), component);
        }
        snapshot
    }

    pub fn snapshot_json(&mut self) -> serde_json::Value {
        serde_json::to_value(self.return_all_state_variables()).unwrap_or(serde_json::Value::Null)
    }
}
