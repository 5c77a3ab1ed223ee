//! Composite components.
//!
//! A composite has no fixed children. Its `replacements` state variable is
//! computed by one of the behaviours below, which create, keep, withhold or
//! discard groups of replacement components. Each behaviour keeps its own
//! memory between updates so that it can decide whether earlier
//! replacements survive.

pub mod collect;
pub mod copy;
pub mod map;
pub mod random_numbers;
pub mod select;
pub mod sequence;

pub use copy::COPY;

use crate::components;
use crate::core::{ComponentIdx, Core};
use crate::resolver::ScopeId;
use crate::value::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompositeKind {
    Copy,
    Select,
    SelectFromSequence,
    Sequence,
    SelectRandomNumbers,
    SampleRandomNumbers,
    Map,
    Collect,
}

impl CompositeKind {
    /// Random points take a digit of the variant when instantiated.
    pub fn is_random(self) -> bool {
        matches!(
            self,
            CompositeKind::Select
                | CompositeKind::SelectFromSequence
                | CompositeKind::SelectRandomNumbers
                | CompositeKind::SampleRandomNumbers
        )
    }
}

#[derive(Debug, Default)]
pub enum Memory {
    #[default]
    None,
    Copy(copy::CopyMemory),
    Select(select::SelectMemory),
    Picks(sequence::PickMemory),
    Random(random_numbers::RandomMemory),
    Collect(collect::CollectMemory),
}

#[derive(Debug)]
pub struct CompositeState {
    /// Replacement components, one group per selected option, source or item.
    pub groups: Vec<Vec<ComponentIdx>>,
    /// Number of trailing groups that exist but are not shown.
    pub withheld: usize,
    /// `assignNames`, one list of names per group.
    pub assign: Vec<Vec<String>>,
    pub assign_scope: ScopeId,
    pub memory: Memory,
}

impl CompositeState {
    pub fn new(assign: Vec<Vec<String>>, assign_scope: ScopeId) -> Self {
        Self {
            groups: Vec::new(),
            withheld: 0,
            assign,
            assign_scope,
            memory: Memory::None,
        }
    }

    pub fn visible_groups(&self) -> &[Vec<ComponentIdx>] {
        &self.groups[..self.groups.len() - self.withheld.min(self.groups.len())]
    }

    pub fn visible(&self) -> Vec<ComponentIdx> {
        self.visible_groups().iter().flatten().copied().collect()
    }

    /// Every replacement, withheld ones included.
    pub fn replacements(&self) -> Vec<ComponentIdx> {
        self.groups.iter().flatten().copied().collect()
    }

    pub fn withheld_count(&self) -> usize {
        self.groups[self.groups.len() - self.withheld.min(self.groups.len())..]
            .iter()
            .map(Vec::len)
            .sum()
    }
}

/// Recompute the replacements of composite `idx`, returning the visible ones.
pub(crate) fn update(core: &mut Core, idx: ComponentIdx) -> Value {
    let Some(kind) = core.component(idx).ty.composite else {
        return Value::Components(Vec::new());
    };
    let memory = core
        .composite_mut(idx)
        .map(|state| std::mem::take(&mut state.memory))
        .unwrap_or_default();
    log::debug!("updating replacements of {} ({kind:?})", core.component(idx).name);

    let memory = match kind {
        CompositeKind::Copy => copy::update(core, idx, memory),
        CompositeKind::Select => select::update(core, idx, memory),
        CompositeKind::SelectFromSequence => sequence::update_select(core, idx, memory),
        CompositeKind::Sequence => sequence::update(core, idx, memory),
        CompositeKind::SelectRandomNumbers => random_numbers::update(core, idx, memory, false),
        CompositeKind::SampleRandomNumbers => random_numbers::update(core, idx, memory, true),
        CompositeKind::Map => map::update(core, idx, memory),
        CompositeKind::Collect => collect::update(core, idx, memory),
    };

    match core.composite_mut(idx) {
        Some(state) => {
            state.memory = memory;
            Value::Components(state.visible())
        }
        None => Value::Components(Vec::new()),
    }
}

/// Show the first `visible` groups and withhold the rest.
pub(crate) fn show_groups(core: &mut Core, idx: ComponentIdx, visible: usize) {
    if let Some(state) = core.composite_mut(idx) {
        state.withheld = state.groups.len().saturating_sub(visible);
    }
}

pub(crate) fn num_groups(core: &Core, idx: ComponentIdx) -> usize {
    core.composite(idx).map_or(0, |state| state.groups.len())
}

pub(crate) fn push_group(core: &mut Core, idx: ComponentIdx, group: Vec<ComponentIdx>) {
    if let Some(state) = core.composite_mut(idx) {
        state.groups.push(group);
    }
}

/// Deactivate and forget every group from `first` on.
pub(crate) fn discard_groups(core: &mut Core, idx: ComponentIdx, first: usize) {
    let discarded = match core.composite_mut(idx) {
        Some(state) if first < state.groups.len() => state.groups.split_off(first),
        _ => return,
    };
    for component in discarded.into_iter().flatten() {
        core.deactivate(component);
    }
}

/// One single-component group per value, each storing its value in the
/// `value` essential of a component of type `type_name`. Existing groups of
/// the right type are updated in place; extra groups are withheld.
pub(crate) fn sync_value_groups(core: &mut Core, idx: ComponentIdx, type_name: &str, values: &[Value]) {
    let Some(ty) = components::lookup(type_name) else {
        return;
    };
    let first_mismatch = core.composite(idx).and_then(|state| {
        state
            .groups
            .iter()
            .position(|group| group.first().is_none_or(|member| !std::ptr::eq(core.component(*member).ty, ty)))
    });
    if let Some(first) = first_mismatch {
        discard_groups(core, idx, first);
    }

    for (g, value) in values.iter().enumerate() {
        let existing = core
            .composite(idx)
            .and_then(|state| state.groups.get(g))
            .and_then(|group| group.first().copied());
        let member = match existing {
            Some(member) => member,
            None => {
                let scope = crate::core::instantiate::group_scope(core, idx, g, Vec::new());
                let member = crate::core::instantiate::create_replacement(core, idx, g, ty, None, scope);
                push_group(core, idx, vec![member]);
                member
            }
        };
        core.write_essential_if_changed(member, "value", value.clone());
    }
    show_groups(core, idx, values.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn withheld_groups_are_trailing() {
        let mut state = CompositeState::new(Vec::new(), ScopeId(0));
        state.groups = vec![vec![ComponentIdx(1)], vec![ComponentIdx(2), ComponentIdx(3)], vec![ComponentIdx(4)]];
        state.withheld = 2;
        assert_eq!(state.visible(), vec![ComponentIdx(1)]);
        assert_eq!(state.withheld_count(), 3);
        assert_eq!(state.replacements().len(), 4);
    }
}
