//! The document core: component arena, value graph and settling.
//!
//! `create_core` reads the markup, plans the variant, instantiates the tree
//! and settles it. Afterwards the core only changes through actions, each of
//! which applies one batch of writes and settles again before returning.

pub mod actions;
mod component;
mod evaluate;
pub(crate) mod instantiate;
mod inverse;
pub mod snapshot;

pub use actions::ActionRequest;
pub use component::{AttrValue, Child, Component, ComponentIdx, Extend};
pub use snapshot::{ComponentSnapshot, StateSnapshot};

use crate::components::Definition;
use crate::composites::CompositeState;
use crate::config::CoreConfig;
use crate::dast::read_doenetml;
use crate::diagnostics::ErrorWarnings;
use crate::error::{CoreError, Result};
use crate::graph::{CellId, Freshness, Graph};
use crate::resolver::{Scope, ScopeId};
use crate::value::Value;
use crate::variants::{self, VariantInfo};
use indexmap::IndexSet;
use smallvec::SmallVec;
use std::collections::HashMap;

/// Re-evaluation rounds after which a batch is considered unsettled.
const MAX_SETTLE_PASSES: usize = 8;

/// Cells read by one evaluation in progress, in first-read order.
#[derive(Debug, Default)]
pub(crate) struct Frame {
    pub inputs: IndexSet<CellId>,
}

#[derive(Debug)]
pub struct Core {
    pub(crate) components: Vec<Component>,
    pub(crate) graph: Graph,
    pub(crate) scopes: Vec<Scope>,
    /// Full name to component, active or not.
    pub(crate) names: HashMap<String, ComponentIdx>,
    pub(crate) diagnostics: ErrorWarnings,
    pub(crate) variant: VariantInfo,
    pub(crate) config: CoreConfig,
    pub(crate) root: ComponentIdx,
    /// Per component type, how many auto names were handed out.
    pub(crate) counters: HashMap<&'static str, usize>,
    pub(crate) frames: Vec<Frame>,
    source: String,
}

/// Build and settle the core for `doenetml`.
///
/// Problems in the document end up in [`Core::error_warnings`]; only a
/// requested variant name that does not exist is an error.
pub fn create_core(doenetml: &str, config: CoreConfig) -> Result<Core> {
    let (root, parse_errors) = read_doenetml(doenetml);
    let variant = variants::plan(&root, &config)?;
    let mut core = Core {
        components: Vec::new(),
        graph: Graph::new(),
        scopes: vec![Scope::new(None, "/".to_string())],
        names: HashMap::new(),
        diagnostics: ErrorWarnings::default(),
        variant,
        config,
        root: ComponentIdx(0),
        counters: HashMap::new(),
        frames: Vec::new(),
        source: doenetml.to_string(),
    };
    for diagnostic in parse_errors {
        core.diagnostics.push_error(diagnostic);
    }

    let mut cursor = core.variant.cursor();
    let placement = instantiate::Placement::root(core.variant.seed);
    match instantiate::instantiate_element(&mut core, &root, placement, &mut cursor) {
        Some(root) => core.root = root,
        None => return Ok(core),
    }
    let (index, name, count) = (core.variant.index, core.variant.name.clone(), core.variant.num_variants);
    core.write_essential_if_changed(core.root, "variantIndex", Value::Integer(index as i64));
    core.write_essential_if_changed(core.root, "variantName", Value::text(name));
    core.write_essential_if_changed(core.root, "numVariants", Value::Integer(count as i64));

    core.settle();
    log::debug!(
        "created core with {} components and {} cells",
        core.components.len(),
        core.graph.len()
    );
    Ok(core)
}

impl Core {
    pub fn component(&self, idx: ComponentIdx) -> &Component {
        &self.components[idx.0 as usize]
    }

    pub(crate) fn component_mut(&mut self, idx: ComponentIdx) -> &mut Component {
        &mut self.components[idx.0 as usize]
    }

    pub fn composite(&self, idx: ComponentIdx) -> Option<&CompositeState> {
        self.component(idx).composite.as_ref()
    }

    pub(crate) fn composite_mut(&mut self, idx: ComponentIdx) -> Option<&mut CompositeState> {
        self.component_mut(idx).composite.as_mut()
    }

    pub fn error_warnings(&self) -> &ErrorWarnings {
        &self.diagnostics
    }

    pub fn variant(&self) -> &VariantInfo {
        &self.variant
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> ComponentIdx {
        self.root
    }

    /// Look up a component by name. Names without a leading `/` are taken
    /// relative to the document. Withheld replacements are still found: they
    /// keep their names and values until their composite shows them again.
    pub fn find(&self, name: &str) -> Option<ComponentIdx> {
        let full = if name.starts_with('/') { name.to_string() } else { format!("/{name}") };
        self.names
            .get(&full)
            .copied()
            .filter(|idx| self.component(*idx).active)
    }

    pub(crate) fn find_or_err(&self, name: &str) -> Result<ComponentIdx> {
        self.find(name).ok_or_else(|| CoreError::UnknownComponent(name.to_string()))
    }

    /// Current value of a public or private state variable.
    pub fn state_value(&mut self, component: &str, state_variable: &str) -> Result<Value> {
        let idx = self.find_or_err(component)?;
        let cell = self.component(idx).var(state_variable).ok_or_else(|| CoreError::UnknownStateVariable {
            component: component.to_string(),
            state_variable: state_variable.to_string(),
        })?;
        Ok(self.read_cell(cell))
    }

    /// Tracked read of a state variable; `Null` when there is none.
    pub(crate) fn read_var(&mut self, idx: ComponentIdx, name: &str) -> Value {
        match self.component(idx).var(name) {
            Some(cell) => self.read_cell(cell),
            None => Value::Null,
        }
    }

    /// Tracked read of an attribute in its declared kind, or its default.
    pub(crate) fn read_attribute(&mut self, idx: ComponentIdx, name: &str) -> Value {
        let Some(spec) = self.component(idx).ty.attribute_spec(name) else {
            return Value::Null;
        };
        match self.component(idx).attribute(name).cloned() {
            Some(AttrValue::Literal(value)) => value,
            Some(AttrValue::Component(attribute)) => {
                let raw = match self.component(attribute).primary_cell() {
                    Some(cell) => self.read_cell(cell),
                    None => Value::Null,
                };
                raw.coerce(spec.kind).unwrap_or_else(|| (spec.default)())
            }
            None => (spec.default)(),
        }
    }

    /// Store `value` in an essential cell, invalidating readers only when it
    /// differs from what is stored.
    pub(crate) fn write_essential_if_changed(&mut self, idx: ComponentIdx, name: &str, value: Value) {
        let Some(cell) = self.component(idx).essential(name) else {
            return;
        };
        if self.graph.cell(cell).value != value {
            self.graph.write(cell, value);
        }
    }

    /// Take a component and everything below it out of the document.
    pub(crate) fn deactivate(&mut self, idx: ComponentIdx) {
        let mut worklist = vec![idx];
        while let Some(next) = worklist.pop() {
            let component = self.component_mut(next);
            if !component.active {
                continue;
            }
            component.active = false;
            let cells = component
                .vars
                .iter()
                .map(|(_, cell)| *cell)
                .chain(component.essentials.iter().map(|(_, cell)| *cell))
                .collect::<Vec<_>>();
            worklist.extend(component.children.iter().filter_map(|child| match child {
                Child::Component(child) => Some(*child),
                Child::Text(_) => None,
            }));
            worklist.extend(component.attributes.iter().filter_map(|(_, value)| match value {
                AttrValue::Component(attribute) => Some(*attribute),
                AttrValue::Literal(_) => None,
            }));
            if let Some(state) = &component.composite {
                worklist.extend(state.replacements());
            }
            for cell in cells {
                self.graph.invalidate_subscribers(cell);
                self.graph.detach(cell);
            }
        }
    }

    /// Bring every shown value up to date: public state variables and
    /// replacements of active components outside attributes.
    pub(crate) fn settle(&mut self) {
        for pass in 0..MAX_SETTLE_PASSES {
            let mut evaluated = 0;
            let mut i = 0;
            while i < self.components.len() {
                let component = &self.components[i];
                i += 1;
                if !component.active || component.in_attribute {
                    continue;
                }
                let cells = component
                    .vars
                    .iter()
                    .filter(|(spec, _)| spec.public || matches!(spec.definition, Definition::Replacements))
                    .map(|(_, cell)| *cell)
                    .collect::<SmallVec<[CellId; 8]>>();
                for cell in cells {
                    if self.graph.freshness(cell) == Freshness::Stale {
                        self.evaluate(cell);
                        evaluated += 1;
                    }
                }
            }
            log::trace!("settle pass {pass} evaluated {evaluated} cells");
            if evaluated == 0 {
                return;
            }
        }
        log::warn!("values did not settle after {MAX_SETTLE_PASSES} passes");
    }

    pub(crate) fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub(crate) fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0 as usize]
    }
}
