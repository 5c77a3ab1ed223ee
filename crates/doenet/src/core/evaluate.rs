//! Demand-driven evaluation.
//!
//! Reading a stale cell evaluates it on the spot. While a definition runs,
//! every cell it reads is recorded in the top frame; when it finishes, those
//! reads become the cell's inputs. Reaching a cell that is still resolving
//! means the definition depends on itself.

use super::{AttrValue, Child, ComponentIdx, Core, Extend, Frame};
use crate::components::{DataQuery, Definition, DepItem, Deps};
use crate::composites;
use crate::graph::{CellId, CellKind, DepSource, Freshness};
use crate::value::{Value, ValueKind};

impl Core {
    /// Evaluate `id` if needed and record it as an input of the evaluation
    /// in progress.
    pub(crate) fn read_cell(&mut self, id: CellId) -> Value {
        let value = self.evaluate(id);
        self.track(id);
        value
    }

    /// Like [`Core::read_cell`], but hands the value to `read` by reference
    /// so a long list is not cloned to look at one item.
    pub(crate) fn read_cell_with<R>(&mut self, id: CellId, read: impl FnOnce(&Value) -> R) -> R {
        let fallback = match self.graph.freshness(id) {
            Freshness::Fresh => None,
            Freshness::Stale => {
                self.evaluate(id);
                None
            }
            Freshness::Resolving => Some(self.evaluate(id)),
        };
        self.track(id);
        match fallback {
            Some(value) => read(&value),
            None => read(&self.graph.cell(id).value),
        }
    }

    fn track(&mut self, id: CellId) {
        if let Some(frame) = self.frames.last_mut() {
            frame.inputs.insert(id);
        }
    }

    pub(crate) fn evaluate(&mut self, id: CellId) -> Value {
        let cell = self.graph.cell(id);
        match cell.freshness {
            Freshness::Fresh => return cell.value.clone(),
            Freshness::Resolving => return self.report_cycle(id),
            Freshness::Stale => {}
        }
        let (owner, kind) = (cell.owner, cell.kind);
        let var = match kind {
            CellKind::Essential(_) => {
                let cell = self.graph.cell_mut(id);
                cell.freshness = Freshness::Fresh;
                return cell.value.clone();
            }
            CellKind::StateVar(var) => var,
        };

        let spec = self.component(owner).vars[var].0;
        log::trace!("evaluating {}.{}", self.component(owner).name, spec.name);
        self.graph.begin(id);
        self.frames.push(Frame::default());
        let (value, sources) = match &spec.definition {
            Definition::Derived { queries, forward, .. } => {
                let (deps, sources) = self.gather(owner, queries);
                let value = forward(&deps);
                let value = match spec.kind {
                    ValueKind::Any => value,
                    kind => value.coerce(kind).unwrap_or_else(|| kind.default_value()),
                };
                (value, sources)
            }
            Definition::Replacements => (composites::update(self, owner), Vec::new()),
        };
        let frame = self.frames.pop().unwrap_or_default();
        self.graph.finish(id, value.clone(), frame.inputs.into_iter().collect(), sources);
        value
    }

    fn report_cycle(&mut self, id: CellId) -> Value {
        let cell = self.graph.cell_mut(id);
        let fallback = match cell.kind {
            CellKind::StateVar(_) if cell.value_kind != ValueKind::Any => cell.value_kind.default_value(),
            _ => cell.value.clone(),
        };
        if !cell.cycle_reported {
            cell.cycle_reported = true;
            let (owner, kind) = (cell.owner, cell.kind);
            let component = self.component(owner);
            let var = match kind {
                CellKind::StateVar(var) => component.vars[var].0.name,
                CellKind::Essential(essential) => component.essentials[essential].0.name,
            };
            let message = format!("Circular dependency involving {}.{var}", component.name);
            let position = component.position;
            self.diagnostics.error(message, position);
        }
        fallback
    }

    /// Values for each query of a definition, and where each item came from.
    pub(crate) fn gather(&mut self, owner: ComponentIdx, queries: &[DataQuery]) -> (Deps, Vec<Vec<DepSource>>) {
        let mut deps = Deps::default();
        let mut all_sources = Vec::with_capacity(queries.len());
        for query in queries {
            let sources = self.resolve_query(owner, query);
            let items = sources
                .iter()
                .map(|source| DepItem {
                    value: self.source_value(source),
                    writable: source.cell().is_some(),
                })
                .collect();
            deps.groups.push(items);
            all_sources.push(sources);
        }
        (deps, all_sources)
    }

    fn source_value(&mut self, source: &DepSource) -> Value {
        match source {
            DepSource::Cell(cell) => self.read_cell(*cell),
            DepSource::Item(cell, index) => self.read_cell_with(*cell, |value| {
                value
                    .as_list()
                    .and_then(|items| items.get(*index).cloned())
                    .unwrap_or(Value::Null)
            }),
            DepSource::Literal(value) => value.clone(),
        }
    }

    fn attribute_source(&self, owner: ComponentIdx, name: &str) -> Option<DepSource> {
        match self.component(owner).attribute(name)? {
            AttrValue::Literal(value) => Some(DepSource::Literal(value.clone())),
            AttrValue::Component(attribute) => self.component(*attribute).primary_cell().map(DepSource::Cell),
        }
    }

    fn resolve_query(&mut self, owner: ComponentIdx, query: &DataQuery) -> Vec<DepSource> {
        let component = self.component(owner);
        match *query {
            DataQuery::Essential(name) => component.essential(name).map(DepSource::Cell).into_iter().collect(),
            DataQuery::StateVar(name) => component.var(name).map(DepSource::Cell).into_iter().collect(),
            DataQuery::Attribute(name) => {
                let source = self.attribute_source(owner, name).or_else(|| {
                    let spec = self.component(owner).ty.attribute_spec(name)?;
                    Some(DepSource::Literal((spec.default)()))
                });
                source.into_iter().collect()
            }
            DataQuery::AttributeIfSet(name) => self.attribute_source(owner, name).into_iter().collect(),
            DataQuery::Children { filter, state_var } => self
                .expanded_children(owner)
                .into_iter()
                .filter_map(|child| match child {
                    Child::Component(child) if filter.matches(self.component(child).ty) => {
                        self.component(child).var(state_var).map(DepSource::Cell)
                    }
                    _ => None,
                })
                .collect(),
            DataQuery::ChildValues => self
                .expanded_children(owner)
                .into_iter()
                .filter_map(|child| match child {
                    Child::Text(text) => Some(DepSource::Literal(Value::Text(text))),
                    Child::Component(child) => {
                        let child = self.component(child);
                        child.primary_cell().or_else(|| child.var("text")).map(DepSource::Cell)
                    }
                })
                .collect(),
            DataQuery::ChildComponents(filter) => {
                let matching = self
                    .expanded_children(owner)
                    .into_iter()
                    .filter_map(|child| match child {
                        Child::Component(child) if filter.matches(self.component(child).ty) => Some(child),
                        _ => None,
                    })
                    .collect();
                vec![DepSource::Literal(Value::Components(matching))]
            }
            DataQuery::Parent(name) => component
                .parent
                .and_then(|parent| self.component(parent).var(name))
                .map(DepSource::Cell)
                .into_iter()
                .collect(),
            DataQuery::Extend(name) => self.extend_source(owner, name).into_iter().collect(),
        }
    }

    /// The source state variable `name` mirrors, if the component is a
    /// replacement. Value and list-item extends only feed the primary
    /// variable.
    fn extend_source(&mut self, owner: ComponentIdx, name: &str) -> Option<DepSource> {
        let component = self.component(owner);
        let is_primary = component.ty.primary.is_some_and(|primary| primary == name);
        match component.extend.clone()? {
            Extend::Component(source) => {
                let source = self.component(source);
                source.var(name).or_else(|| source.primary_cell()).map(DepSource::Cell)
            }
            Extend::StateVar { cell, index: None } if is_primary => Some(DepSource::Cell(cell)),
            Extend::StateVar { cell, index: Some(index) } if is_primary => {
                let length = self.read_cell_with(cell, |value| value.as_list().map_or(0, <[Value]>::len));
                (index < length).then_some(DepSource::Item(cell, index))
            }
            Extend::Literal(value) if is_primary => Some(DepSource::Literal(value)),
            _ => None,
        }
    }

    /// Children with every composite replaced by its visible replacements.
    /// A composite whose replacements are being computed right now is
    /// skipped, so a composite may look at its own surroundings.
    pub(crate) fn expanded_children(&mut self, idx: ComponentIdx) -> Vec<Child> {
        let children = self.component(idx).children.clone();
        let mut expanded = Vec::with_capacity(children.len());
        for child in children {
            match child {
                Child::Component(child) if self.component(child).composite.is_some() => {
                    expanded.extend(self.expand_composite(child).into_iter().map(Child::Component));
                }
                Child::Component(child) if !self.component(child).active => {}
                child => expanded.push(child),
            }
        }
        expanded
    }

    /// Visible replacements of a composite, nested composites expanded.
    pub(crate) fn expanded_replacements(&mut self, idx: ComponentIdx) -> Vec<ComponentIdx> {
        self.expand_composite(idx)
    }

    fn expand_composite(&mut self, idx: ComponentIdx) -> Vec<ComponentIdx> {
        let component = self.component(idx);
        if !component.active {
            return Vec::new();
        }
        let Some(cell) = component.var("replacements") else {
            return vec![idx];
        };
        if self.graph.freshness(cell) == Freshness::Resolving {
            return Vec::new();
        }
        let replacements = match self.read_cell(cell) {
            Value::Components(replacements) => replacements,
            _ => Vec::new(),
        };
        let mut expanded = Vec::with_capacity(replacements.len());
        for replacement in replacements {
            if self.component(replacement).composite.is_some() {
                expanded.extend(self.expand_composite(replacement));
            } else if self.component(replacement).active {
                expanded.push(replacement);
            }
        }
        expanded
    }
}
