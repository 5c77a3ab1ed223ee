//! Writing to derived state variables.
//!
//! A requested value is pushed backwards through inverse definitions until
//! it reaches essential cells. The whole plan is worked out before anything
//! is written, so a write that fails part way changes nothing.

use super::Core;
use crate::components::{Definition, DepItem, Deps};
use crate::graph::{CellId, CellKind, DepSource};
use crate::value::{Value, ValueKind};

/// Inverse chains longer than this are treated as a loop.
const MAX_INVERSE_DEPTH: usize = 32;

/// Essential writes collected for one batch, plus the values requested of
/// intermediate cells so that item writes to one list accumulate.
#[derive(Debug, Default)]
pub(crate) struct WritePlan {
    pub writes: Vec<(CellId, Value)>,
    requested: Vec<(CellId, Value)>,
}

impl WritePlan {
    pub fn essential(&mut self, cell: CellId, value: Value) {
        self.writes.retain(|(existing, _)| *existing != cell);
        self.writes.push((cell, value));
    }

    fn requested(&self, cell: CellId) -> Option<&Value> {
        self.requested
            .iter()
            .rev()
            .find(|(existing, _)| *existing == cell)
            .map(|(_, value)| value)
    }
}

impl Core {
    /// Add the writes that make `cell` take `desired` to `plan`.
    pub(crate) fn plan_write(
        &mut self,
        cell: CellId,
        desired: &Value,
        plan: &mut WritePlan,
        depth: usize,
    ) -> Result<(), String> {
        if depth > MAX_INVERSE_DEPTH {
            return Err("the write does not reach a stored value".to_string());
        }
        let (owner, kind, value_kind) = {
            let cell = self.graph.cell(cell);
            (cell.owner, cell.kind, cell.value_kind)
        };
        let desired = match value_kind {
            ValueKind::Any => desired.clone(),
            kind => desired
                .coerce(kind)
                .ok_or_else(|| format!("{} is not a valid {kind:?}", desired.to_text()))?,
        };
        plan.requested.push((cell, desired.clone()));

        let var = match kind {
            CellKind::Essential(_) => {
                plan.essential(cell, desired);
                return Ok(());
            }
            CellKind::StateVar(var) => var,
        };
        let spec = self.component(owner).vars[var].0;
        let Definition::Derived { inverse: Some(inverse), .. } = &spec.definition else {
            return Err(format!("{} of {} cannot be changed", spec.name, self.component(owner).name));
        };

        self.evaluate(cell);
        let sources = self.graph.cell(cell).sources.clone();
        let deps = Deps {
            groups: sources
                .iter()
                .map(|group| {
                    group
                        .iter()
                        .map(|source| DepItem {
                            value: self.current_value(source),
                            writable: source.cell().is_some(),
                        })
                        .collect()
                })
                .collect(),
        };
        let writes = inverse(&desired, &deps)?;
        log::trace!(
            "{}.{} = {} becomes {} writes",
            self.component(owner).name,
            spec.name,
            desired.to_text(),
            writes.len()
        );

        for write in writes {
            let source = sources
                .get(write.query)
                .and_then(|group| group.get(write.item))
                .cloned()
                .ok_or("inverse definition wrote to a missing dependency")?;
            match source {
                DepSource::Cell(target) => self.plan_write(target, &write.value, plan, depth + 1)?,
                DepSource::Item(target, index) => {
                    let mut items = match plan.requested(target) {
                        Some(value) => value.clone(),
                        None => self.graph.cell(target).value.clone(),
                    };
                    match &mut items {
                        Value::List(items) if index < items.len() => items[index] = write.value,
                        _ => return Err("list item no longer exists".to_string()),
                    }
                    self.plan_write(target, &items, plan, depth + 1)?;
                }
                DepSource::Literal(_) => return Err("cannot change a literal value".to_string()),
            }
        }
        Ok(())
    }

    fn current_value(&self, source: &DepSource) -> Value {
        match source {
            DepSource::Cell(cell) => self.graph.cell(*cell).value.clone(),
            DepSource::Item(cell, index) => self
                .graph
                .cell(*cell)
                .value
                .as_list()
                .and_then(|items| items.get(*index).cloned())
                .unwrap_or(Value::Null),
            DepSource::Literal(value) => value.clone(),
        }
    }

    /// Apply every write of the plan, then settle once.
    pub(crate) fn apply_writes(&mut self, plan: WritePlan) {
        log::debug!("applying {} writes", plan.writes.len());
        for (cell, value) in plan.writes {
            self.graph.write(cell, value);
        }
        self.settle();
    }
}
