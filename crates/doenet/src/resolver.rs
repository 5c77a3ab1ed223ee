//! Name scopes and macro path resolution.
//!
//! Every component lives in a scope. A scope maps local names to components
//! and may hold map aliases. Composites with `assignNames` register
//! themselves as pending in the scope their names belong to; a lookup that
//! misses expands them until the name appears or nothing is left.

use crate::core::{ComponentIdx, Core};
use crate::dast::{MacroPath, PathPart};
use crate::graph::Freshness;
use crate::value::Value;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub const ROOT: Self = Self(0);
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Alias {
    /// The `index`-th source of a map.
    Source { map: ComponentIdx, index: usize },
    /// 0-based group index, seen as `index + 1`.
    Index(usize),
}

#[derive(Debug, Default)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    /// Prefix of the full names of components named in this scope.
    pub prefix: String,
    pub names: HashMap<String, ComponentIdx>,
    pub aliases: HashMap<String, Alias>,
    /// Composites whose `assignNames` land in this scope.
    pub pending: Vec<ComponentIdx>,
}

impl Scope {
    pub fn new(parent: Option<ScopeId>, prefix: String) -> Self {
        Self { parent, prefix, ..Self::default() }
    }
}

/// What a path resolves to.
#[derive(Clone, Debug, PartialEq)]
pub enum Referent {
    Component(ComponentIdx),
    /// `var` indexes the component's state variables, `index` a list item.
    StateVar { component: ComponentIdx, var: usize, index: Option<usize> },
    Literal(Value),
}

fn active_name(core: &Core, scope: ScopeId, name: &str) -> Option<ComponentIdx> {
    core.scope(scope)
        .names
        .get(name)
        .copied()
        .filter(|idx| core.component(*idx).active)
}

/// Look `name` up in `scope` only, expanding pending composites as needed.
pub(crate) fn lookup_in_scope(core: &mut Core, scope: ScopeId, name: &str) -> Option<Referent> {
    if let Some(idx) = active_name(core, scope, name) {
        return Some(Referent::Component(idx));
    }
    if let Some(alias) = core.scope(scope).aliases.get(name).cloned() {
        return match alias {
            Alias::Source { map, index } => core
                .read_var(map, "sourceComponents")
                .as_components()
                .and_then(|sources| sources.get(index).copied())
                .map(Referent::Component),
            Alias::Index(index) => Some(Referent::Literal(Value::Integer(index as i64 + 1))),
        };
    }

    let mut next = 0;
    while let Some(composite) = core.scope(scope).pending.get(next).copied() {
        next += 1;
        let Some(cell) = core.component(composite).var("replacements") else {
            continue;
        };
        if !core.component(composite).active || core.graph.freshness(cell) == Freshness::Resolving {
            continue;
        }
        core.read_cell(cell);
        if let Some(idx) = active_name(core, scope, name) {
            return Some(Referent::Component(idx));
        }
    }
    None
}

/// Look `name` up in `scope` and then in each enclosing scope.
pub(crate) fn lookup_name(core: &mut Core, scope: ScopeId, name: &str) -> Option<Referent> {
    let mut current = Some(scope);
    while let Some(scope) = current {
        if let Some(referent) = lookup_in_scope(core, scope, name) {
            return Some(referent);
        }
        current = core.scope(scope).parent;
    }
    None
}

fn list_var(core: &Core, idx: ComponentIdx) -> Option<usize> {
    let component = core.component(idx);
    let primary = component.ty.primary?;
    let var = component.vars.iter().position(|(spec, _)| spec.name == primary)?;
    component.vars[var].0.kind.is_list().then_some(var)
}

fn apply_index(core: &mut Core, referent: Referent, index: usize) -> Result<Referent, String> {
    let position = index.checked_sub(1).ok_or("indices start at 1")?;
    match referent {
        Referent::Component(idx) if core.component(idx).composite.is_some() => core
            .expanded_replacements(idx)
            .get(position)
            .copied()
            .map(Referent::Component)
            .ok_or_else(|| format!("there is no replacement {index}")),
        Referent::Component(idx) => match list_var(core, idx) {
            Some(var) => Ok(Referent::StateVar { component: idx, var, index: Some(position) }),
            None => Err(format!("{} is not a list", core.component(idx).name)),
        },
        Referent::StateVar { component, var, index: None } => {
            Ok(Referent::StateVar { component, var, index: Some(position) })
        }
        _ => Err("cannot index this value".to_string()),
    }
}

fn apply_prop(core: &mut Core, referent: Referent, name: &str, index: Option<usize>) -> Result<Vec<Referent>, String> {
    let targets = match referent {
        Referent::Component(idx) if core.component(idx).composite.is_some() => core.expanded_replacements(idx),
        Referent::Component(idx) => vec![idx],
        _ => return Err(format!("cannot read property {name} of a value")),
    };
    let mut resolved = Vec::new();
    for target in targets {
        let component = core.component(target);
        let var = component
            .vars
            .iter()
            .position(|(spec, _)| spec.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| format!("<{}> has no property {name}", component.ty.name))?;
        let index = match index {
            Some(index) if component.vars[var].0.kind.is_list() => {
                Some(index.checked_sub(1).ok_or("indices start at 1")?)
            }
            Some(_) => return Err(format!("property {name} is not a list")),
            None => None,
        };
        resolved.push(Referent::StateVar { component: target, var, index });
    }
    Ok(resolved)
}

/// Resolve a macro path from `scope`.
pub(crate) fn resolve_path(core: &mut Core, scope: ScopeId, path: &MacroPath) -> Result<Vec<Referent>, String> {
    let mut current_scope = if path.absolute { ScopeId::ROOT } else { scope };
    let mut referent: Option<Referent> = None;
    for part in &path.parts {
        match (part, &referent) {
            (PathPart::Parent, None) => {
                current_scope = core.scope(current_scope)
                    .parent
                    .ok_or("there is no enclosing namespace")?;
            }
            (PathPart::Parent, Some(_)) => return Err("`..` can only start a path".to_string()),
            (PathPart::Name(name), None) => {
                let found = if path.absolute {
                    lookup_in_scope(core, current_scope, name)
                } else {
                    lookup_name(core, current_scope, name)
                };
                referent = Some(found.ok_or_else(|| format!("no component named {name}"))?);
            }
            (PathPart::Name(name), Some(Referent::Component(parent))) => {
                let namespace = core
                    .component(*parent)
                    .namespace
                    .ok_or_else(|| format!("{} has no namespace", core.component(*parent).name))?;
                let found = lookup_in_scope(core, namespace, name);
                referent = Some(found.ok_or_else(|| format!("no component named {name}"))?);
            }
            (PathPart::Name(name), Some(_)) => return Err(format!("cannot look up {name} inside a value")),
        }
    }
    let mut referent = referent.ok_or("empty path")?;

    if let Some(index) = path.index {
        referent = apply_index(core, referent, index)?;
    }
    let mut referents = vec![referent];
    for prop in &path.props {
        let mut next = Vec::new();
        for referent in referents {
            next.extend(apply_prop(core, referent, &prop.name, prop.index)?);
        }
        referents = next;
    }
    Ok(referents)
}
