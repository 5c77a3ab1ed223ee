//! Copies: every macro in the markup, and `<copy source prop>`.
//!
//! The resolved referents are remembered. Replacements are rebuilt only when
//! the referents change, so a copy whose target keeps its identity keeps its
//! replacement components (and everything that depends on them).

use super::{CompositeKind, Memory, discard_groups, push_group, show_groups};
use crate::components::{self, ChildPolicy, ComponentType, StateVarSpec};
use crate::core::instantiate::{create_replacement, group_scope, reinstantiate};
use crate::core::{ComponentIdx, Core, Extend};
use crate::dast::{MacroPath, PropAccess, parse_reference};
use crate::diagnostics::LEVEL_VALIDATION;
use crate::resolver::{Referent, resolve_path};
use crate::variants::VariantCursor;

pub static COPY: ComponentType = ComponentType {
    name: "copy",
    state_vars: &[StateVarSpec::replacements()],
    static_attributes: &["source", "prop"],
    children: ChildPolicy::Deferred,
    composite: Some(CompositeKind::Copy),
    ..ComponentType::BASE
};

#[derive(Debug, Default)]
pub struct CopyMemory {
    /// Set for copies created from a macro.
    pub path: Option<MacroPath>,
    pub referents: Vec<Referent>,
    pub reported: bool,
}

impl CopyMemory {
    pub fn from_macro(path: MacroPath) -> Self {
        Self { path: Some(path), ..Self::default() }
    }
}

/// `source="x"` plus `prop="value"` read as `$x.value`.
fn attribute_path(core: &Core, idx: ComponentIdx) -> Option<MacroPath> {
    let component = core.component(idx);
    let mut path = parse_reference(component.static_attribute("source")?)?;
    if let Some(prop) = component.static_attribute("prop").map(str::trim).filter(|prop| !prop.is_empty()) {
        path.props.push(PropAccess { name: prop.to_string(), index: None });
    }
    Some(path)
}

/// Composites stand for their visible replacements.
pub(crate) fn flatten(core: &mut Core, referents: Vec<Referent>) -> Vec<Referent> {
    let mut flat = Vec::new();
    for referent in referents {
        match referent {
            Referent::Component(target) if core.component(target).composite.is_some() => {
                let replacements = core.expanded_replacements(target);
                flat.extend(replacements.into_iter().map(Referent::Component));
            }
            other => flat.push(other),
        }
    }
    flat
}

fn is_ancestor(core: &Core, ancestor: ComponentIdx, mut idx: ComponentIdx) -> bool {
    while let Some(parent) = core.component(idx).parent {
        if parent == ancestor {
            return true;
        }
        idx = parent;
    }
    false
}

/// Replacement group `g` of `composite` standing for `referent`.
pub(crate) fn build_group(
    core: &mut Core,
    composite: ComponentIdx,
    g: usize,
    referent: &Referent,
) -> Vec<ComponentIdx> {
    let scope = group_scope(core, composite, g, Vec::new());
    match referent {
        Referent::Component(target) => {
            let target = *target;
            let (ty, name, element, seed, cursor_start) = {
                let target = core.component(target);
                (target.ty, target.name.clone(), target.dast.clone(), target.variant.seed, target.cursor_start)
            };
            if ty.primary.is_some() {
                let member = create_replacement(core, composite, g, ty, Some(Extend::Component(target)), scope);
                return vec![member];
            }
            if target == composite || is_ancestor(core, target, composite) {
                let position = core.component(composite).position;
                core.diagnostics.warning(format!("Cannot copy {name} inside itself"), LEVEL_VALIDATION, position);
                return Vec::new();
            }
            let Some(element) = element else {
                return Vec::new();
            };
            let mut cursor = cursor_start.map_or(VariantCursor::seeded(), VariantCursor::unique);
            reinstantiate(core, composite, g, &element, scope, &mut cursor, seed).into_iter().collect()
        }
        Referent::StateVar { component, var, index } => {
            let (spec, cell) = core.component(*component).vars[*var];
            let kind = match index {
                Some(_) => spec.kind.item_kind().unwrap_or(spec.kind),
                None => spec.kind,
            };
            let Some(ty) = components::lookup(kind.component_type()) else {
                return Vec::new();
            };
            let extend = Extend::StateVar { cell, index: *index };
            vec![create_replacement(core, composite, g, ty, Some(extend), scope)]
        }
        Referent::Literal(value) => {
            let Some(ty) = components::lookup(value.natural_kind().component_type()) else {
                return Vec::new();
            };
            vec![create_replacement(core, composite, g, ty, Some(Extend::Literal(value.clone())), scope)]
        }
    }
}

pub(crate) fn update(core: &mut Core, idx: ComponentIdx, memory: Memory) -> Memory {
    let mut memory = match memory {
        Memory::Copy(memory) => memory,
        _ => CopyMemory::default(),
    };
    let Some(path) = memory.path.clone().or_else(|| attribute_path(core, idx)) else {
        if !memory.reported {
            let position = core.component(idx).position;
            core.diagnostics.warning("A copy needs a source", LEVEL_VALIDATION, position);
            memory.reported = true;
        }
        return Memory::Copy(memory);
    };

    let scope = core.component(idx).scope;
    let referents = match resolve_path(core, scope, &path) {
        Ok(referents) => flatten(core, referents),
        Err(reason) => {
            if !memory.reported {
                let position = core.component(idx).position;
                core.diagnostics.warning(format!("Cannot resolve {path}: {reason}"), LEVEL_VALIDATION, position);
                memory.reported = true;
            }
            Vec::new()
        }
    };

    let has_groups = core.composite(idx).is_some_and(|state| !state.groups.is_empty());
    if referents != memory.referents || (!has_groups && !referents.is_empty()) {
        log::debug!("{} now copies {} referents", core.component(idx).name, referents.len());
        discard_groups(core, idx, 0);
        for (g, referent) in referents.iter().enumerate() {
            let group = build_group(core, idx, g, referent);
            push_group(core, idx, group);
        }
        memory.referents = referents;
    }
    let count = memory.referents.len();
    show_groups(core, idx, count);
    Memory::Copy(memory)
}
