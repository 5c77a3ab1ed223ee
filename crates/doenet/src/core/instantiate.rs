//! Building components from DAST.
//!
//! Instantiation walks the markup in document order. Each element becomes a
//! component with its cells allocated up front, its attributes parsed, its
//! essential values initialised and, unless its type defers them, its
//! children built. Random composites take their variant digit here, so the
//! digits are handed out in pre-order.

use super::{AttrValue, Child, Component, ComponentIdx, Core, Extend};
use crate::components::answer::expand_sugar;
use crate::components::common::{parse_literal, split_items};
use crate::components::{self, ChildPolicy, ComponentType, EssentialInit};
use crate::composites::copy::CopyMemory;
use crate::composites::{COPY, CompositeState, Memory};
use crate::dast::{DastAttribute, DastElement, DastNode, MacroPath, Position, parse_assign_names};
use crate::diagnostics::{LEVEL_INFO, LEVEL_VALIDATION};
use crate::graph::CellKind;
use crate::resolver::{Alias, Scope, ScopeId};
use crate::value::{Value, parse_bool};
use crate::variants::count::count_element;
use crate::variants::{VariantCursor, VariantSeed, VariantSource};
use std::sync::Arc;

/// Attribute components draw seeds from a range children never reach.
const ATTRIBUTE_SEED_BASE: u64 = 1 << 32;

/// Where a new component goes.
#[derive(Clone, Debug)]
pub(crate) struct Placement {
    pub parent: Option<ComponentIdx>,
    pub scope: ScopeId,
    pub seed: VariantSeed,
    pub in_attribute: bool,
    /// A name from a composite's `assignNames`, and the scope it lives in.
    pub assigned: Option<(String, ScopeId)>,
}

impl Placement {
    pub fn root(seed: VariantSeed) -> Self {
        Self { parent: None, scope: ScopeId::ROOT, seed, in_attribute: false, assigned: None }
    }

    fn child_of(idx: ComponentIdx, scope: ScopeId, seed: VariantSeed, in_attribute: bool) -> Self {
        Self { parent: Some(idx), scope, seed, in_attribute, assigned: None }
    }
}

fn new_component(
    core: &mut Core,
    ty: &'static ComponentType,
    placement: &Placement,
    position: Option<Position>,
    variant: VariantSource,
    cursor_start: Option<u64>,
) -> ComponentIdx {
    let idx = ComponentIdx(core.components.len() as u32);
    let vars = ty
        .all_state_vars()
        .enumerate()
        .map(|(i, spec)| (spec, core.graph.alloc(idx, CellKind::StateVar(i), spec.kind, None)))
        .collect();
    let own_essentials: &'static [_] = ty.essentials;
    let essentials = own_essentials
        .iter()
        .enumerate()
        .map(|(i, spec)| {
            let cell = core.graph.alloc(idx, CellKind::Essential(i), spec.kind, Some(spec.kind.default_value()));
            (spec, cell)
        })
        .collect();
    core.components.push(Component {
        name: String::new(),
        ty,
        parent: placement.parent,
        children: Vec::new(),
        vars,
        essentials,
        attributes: Vec::new(),
        static_attributes: Vec::new(),
        extend: None,
        dast: None,
        variant,
        cursor_start,
        position,
        scope: placement.scope,
        namespace: None,
        composite: ty.composite.map(|_| CompositeState::new(Vec::new(), placement.scope)),
        active: true,
        in_attribute: placement.in_attribute,
    });
    idx
}

/// Register `local` in `scope`. A name already taken by an active
/// component is refused.
fn register_name(core: &mut Core, idx: ComponentIdx, scope: ScopeId, local: &str) -> bool {
    let taken = core
        .scope(scope)
        .names
        .get(local)
        .is_some_and(|existing| *existing != idx && core.component(*existing).active);
    if taken {
        let position = core.component(idx).position;
        core.diagnostics.warning(
            format!("Duplicate component name: {local}"),
            LEVEL_VALIDATION,
            position,
        );
        return false;
    }
    let full = format!("{}{local}", core.scope(scope).prefix);
    core.scope_mut(scope).names.insert(local.to_string(), idx);
    core.names.insert(full.clone(), idx);
    core.component_mut(idx).name = full;
    true
}

fn auto_name(core: &mut Core, idx: ComponentIdx, scope: ScopeId) {
    let ty = core.component(idx).ty.name;
    let counter = {
        let counter = core.counters.entry(ty).or_default();
        *counter += 1;
        *counter
    };
    let full = format!("{}_{ty}{counter}", core.scope(scope).prefix);
    core.names.insert(full.clone(), idx);
    core.component_mut(idx).name = full;
}

/// Make `idx` the composite that produces `assign` in `scope`.
fn set_assign_names(core: &mut Core, idx: ComponentIdx, assign: Vec<Vec<String>>, scope: ScopeId) {
    if assign.is_empty() {
        return;
    }
    if let Some(state) = core.composite_mut(idx) {
        state.assign = assign;
        state.assign_scope = scope;
        core.scope_mut(scope).pending.push(idx);
    }
}

fn name_component(core: &mut Core, idx: ComponentIdx, placement: &Placement, explicit: Option<&str>) {
    let is_composite = core.component(idx).composite.is_some();
    if let Some((assigned, scope)) = &placement.assigned {
        if is_composite {
            set_assign_names(core, idx, vec![vec![assigned.clone()]], *scope);
        } else if register_name(core, idx, *scope, assigned) {
            return;
        }
    }
    match explicit.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) if register_name(core, idx, placement.scope, name) => {}
        _ => auto_name(core, idx, placement.scope),
    }
}

fn instantiate_attribute(
    core: &mut Core,
    owner: ComponentIdx,
    attribute: &DastAttribute,
    ty: &'static ComponentType,
    placement: Placement,
) -> ComponentIdx {
    let variant = VariantSource { seed: placement.seed, digit: None };
    let idx = new_component(core, ty, &placement, attribute.position, variant, None);
    auto_name(core, idx, placement.scope);
    init_essentials(core, idx, &attribute.children);
    let mut cursor = VariantCursor::seeded();
    let child_placement = Placement::child_of(idx, placement.scope, placement.seed, true);
    build_children(core, idx, &attribute.children, child_placement, &mut cursor);
    log::trace!("attribute {} of {} is {}", attribute.name, core.component(owner).name, core.component(idx).name);
    idx
}

fn process_attributes(core: &mut Core, idx: ComponentIdx, element: &DastElement) {
    let ty = core.component(idx).ty;
    let (scope, seed) = {
        let component = core.component(idx);
        (component.scope, component.variant.seed)
    };
    for (i, attribute) in element.attributes.iter().enumerate() {
        let name = attribute.name.as_str();
        if ty.is_static_attribute(name) {
            let text = attribute.literal_text().unwrap_or_default();
            core.component_mut(idx).static_attributes.push((name.to_string(), text));
            continue;
        }
        if let Some(removed) = ty.removed_attributes.iter().find(|removed| removed.eq_ignore_ascii_case(name)) {
            core.diagnostics.warning(
                format!("Attribute {removed} of <{}> is deprecated and is ignored.", ty.name),
                LEVEL_INFO,
                element.position,
            );
            continue;
        }
        let spec = match ty.attribute_spec(name) {
            Some(spec) => spec,
            None => match ty.deprecated_attribute(name) {
                Some(spec) => {
                    let old = spec.deprecated_alias.unwrap_or(name);
                    core.diagnostics.warning(
                        format!("Attribute {old} is deprecated. Use {} instead.", spec.name),
                        LEVEL_INFO,
                        attribute.position.or(element.position),
                    );
                    spec
                }
                None => {
                    core.diagnostics.warning(
                        format!("Invalid attribute {name} for <{}>", ty.name),
                        LEVEL_VALIDATION,
                        attribute.position.or(element.position),
                    );
                    continue;
                }
            },
        };

        let value = match attribute.literal_text() {
            Some(text) => match parse_literal(spec.kind, &text) {
                Some(value) => AttrValue::Literal(value),
                None => {
                    core.diagnostics.warning(
                        format!("Invalid value {:?} for attribute {} of <{}>", text.trim(), spec.name, ty.name),
                        LEVEL_VALIDATION,
                        attribute.position.or(element.position),
                    );
                    continue;
                }
            },
            None => {
                let Some(attribute_ty) = components::lookup(spec.kind.component_type()) else {
                    continue;
                };
                let placement = Placement::child_of(idx, scope, seed.child(ATTRIBUTE_SEED_BASE + i as u64), true);
                AttrValue::Component(instantiate_attribute(core, idx, attribute, attribute_ty, placement))
            }
        };
        core.component_mut(idx).attributes.push((spec, value));
    }
}

/// Literal text of `nodes`, when they are nothing but text.
fn only_text(nodes: &[DastNode]) -> Option<String> {
    let mut text = String::new();
    for node in nodes {
        match node {
            DastNode::Text(piece) => text.push_str(&piece.value),
            _ => return None,
        }
    }
    Some(text)
}

fn init_essentials(core: &mut Core, idx: ComponentIdx, children: &[DastNode]) {
    let component = core.component(idx);
    let mut initial = Vec::new();
    for (spec, cell) in &component.essentials {
        let value = match spec.init {
            EssentialInit::Default => None,
            EssentialInit::Attribute(name) => match component.attribute(name) {
                Some(AttrValue::Literal(value)) => value.coerce(spec.kind),
                _ => None,
            },
            EssentialInit::ChildrenText => only_text(children)
                .filter(|text| !text.trim().is_empty())
                .and_then(|text| parse_literal(spec.kind, &text)),
        };
        if let Some(value) = value {
            initial.push((*cell, value));
        }
    }
    for (cell, value) in initial {
        core.graph.cell_mut(cell).value = value;
    }
}

/// Build the children of `idx` according to its type's child policy.
fn build_children(
    core: &mut Core,
    idx: ComponentIdx,
    nodes: &[DastNode],
    placement: Placement,
    cursor: &mut VariantCursor,
) {
    let policy = core.component(idx).ty.children;
    let mut children = Vec::new();
    let mut ordinal = 0;
    let next_placement = |ordinal: &mut u64| {
        let seed = placement.seed.child(*ordinal);
        *ordinal += 1;
        Placement { seed, ..placement.clone() }
    };
    for node in nodes {
        match (policy, node) {
            (ChildPolicy::Deferred, _) => return,
            (_, DastNode::Element(element)) => {
                let child = instantiate_element(core, element, next_placement(&mut ordinal), cursor);
                children.extend(child.map(Child::Component));
            }
            (_, DastNode::Macro(macro_node)) => {
                let slot = next_placement(&mut ordinal);
                let child = instantiate_macro(core, &macro_node.path, macro_node.position, slot);
                children.push(Child::Component(child));
            }
            (ChildPolicy::ListItems(item_type), DastNode::Text(text)) => {
                for item in split_items(&text.value) {
                    let mut element = DastElement::new(item_type, vec![DastNode::text(&item)]);
                    element.position = text.position;
                    let child = instantiate_element(core, &element, next_placement(&mut ordinal), cursor);
                    children.extend(child.map(Child::Component));
                }
            }
            (ChildPolicy::Any, DastNode::Text(text)) => children.push(Child::Text(text.value.as_str().into())),
        }
    }
    core.component_mut(idx).children = children;
}

/// Instantiate `element` and its subtree. `None` for unknown types.
pub(crate) fn instantiate_element(
    core: &mut Core,
    element: &DastElement,
    placement: Placement,
    cursor: &mut VariantCursor,
) -> Option<ComponentIdx> {
    let element = if element.is("answer") { expand_sugar(element) } else { std::borrow::Cow::Borrowed(element) };
    let Some(ty) = components::lookup(&element.name) else {
        core.diagnostics.error(format!("Invalid component type: <{}>", element.name), element.position);
        return None;
    };

    let cursor_start = cursor.remaining();
    let is_problem = element.is("problem");
    let digit = match ty.composite {
        Some(kind) if kind.is_random() => cursor.take(count_element(&element).unwrap_or(1)),
        _ if is_problem => cursor.take(count_element(&element).unwrap_or(1)),
        _ => None,
    };
    let variant = VariantSource { seed: placement.seed, digit };
    let idx = new_component(core, ty, &placement, element.position, variant, cursor_start);
    if ty.primary.is_none() || ty.children == ChildPolicy::Deferred {
        core.component_mut(idx).dast = Some(Arc::new(element.clone().into_owned()));
    }

    process_attributes(core, idx, &element);
    init_essentials(core, idx, &element.children);
    let explicit = core.component(idx).static_attribute("name").map(str::to_string);
    name_component(core, idx, &placement, explicit.as_deref());

    let new_namespace = core
        .component(idx)
        .static_attribute("newNamespace")
        .is_some_and(|flag| flag.trim().is_empty() || parse_bool(flag).unwrap_or(false));
    let inner_scope = if new_namespace {
        let prefix = format!("{}/", core.component(idx).name);
        core.scopes.push(Scope::new(Some(placement.scope), prefix));
        let namespace = ScopeId(core.scopes.len() as u32 - 1);
        core.component_mut(idx).namespace = Some(namespace);
        namespace
    } else {
        placement.scope
    };

    if let Some(text) = core.component(idx).static_attribute("assignNames").map(str::to_string) {
        match parse_assign_names(&text) {
            Some(assign) if ty.composite.is_some() => set_assign_names(core, idx, assign, inner_scope),
            Some(_) => {}
            None => core.diagnostics.warning(
                format!("Invalid assignNames: {text}"),
                LEVEL_VALIDATION,
                element.position,
            ),
        }
    }

    if is_problem {
        let local = digit.map_or(1, |digit| digit as i64 + 1);
        core.write_essential_if_changed(idx, "variantIndex", Value::Integer(local));
    }

    let child_placement = Placement::child_of(idx, inner_scope, placement.seed, placement.in_attribute);
    match digit {
        Some(digit) if is_problem => {
            let mut local = VariantCursor::unique(digit);
            build_children(core, idx, &element.children, child_placement, &mut local);
        }
        _ => build_children(core, idx, &element.children, child_placement, cursor),
    }
    Some(idx)
}

/// A macro in the markup becomes a copy of what it references.
pub(crate) fn instantiate_macro(
    core: &mut Core,
    path: &MacroPath,
    position: Option<Position>,
    placement: Placement,
) -> ComponentIdx {
    let variant = VariantSource { seed: placement.seed, digit: None };
    let idx = new_component(core, &COPY, &placement, position, variant, None);
    name_component(core, idx, &placement, None);
    if let Some(state) = core.composite_mut(idx) {
        state.memory = Memory::Copy(CopyMemory::from_macro(path.clone()));
    }
    idx
}

/// A fresh scope for replacement group `g` of `composite`.
pub(crate) fn group_scope(
    core: &mut Core,
    composite: ComponentIdx,
    g: usize,
    aliases: Vec<(String, Alias)>,
) -> ScopeId {
    let component = core.component(composite);
    let parent = component.namespace.unwrap_or(component.scope);
    let mut scope = Scope::new(Some(parent), format!("{}/{}/", component.name, g + 1));
    scope.aliases.extend(aliases);
    core.scopes.push(scope);
    ScopeId(core.scopes.len() as u32 - 1)
}

/// Where the `m`-th component of group `g` goes.
fn group_placement(
    core: &Core,
    composite: ComponentIdx,
    g: usize,
    m: usize,
    scope: ScopeId,
    seed: VariantSeed,
) -> Placement {
    let component = core.component(composite);
    let assigned = component.composite.as_ref().and_then(|state| {
        let name = state.assign.get(g)?.get(m)?;
        Some((name.clone(), state.assign_scope))
    });
    Placement {
        parent: component.parent,
        scope,
        seed,
        in_attribute: component.in_attribute,
        assigned,
    }
}

/// Instantiate markup as replacement group `g` of `composite`. Blank text is
/// dropped and other text becomes `<text>`.
pub(crate) fn instantiate_group(
    core: &mut Core,
    composite: ComponentIdx,
    g: usize,
    nodes: &[DastNode],
    scope: ScopeId,
    cursor: &mut VariantCursor,
    seed: VariantSeed,
) -> Vec<ComponentIdx> {
    let mut produced = Vec::new();
    let mut ordinal = 0;
    for node in nodes {
        if node.is_blank_text() {
            continue;
        }
        let placement = group_placement(core, composite, g, produced.len(), scope, seed.child(ordinal));
        ordinal += 1;
        let made = match node {
            DastNode::Element(element) => instantiate_element(core, element, placement, cursor),
            DastNode::Macro(macro_node) => {
                Some(instantiate_macro(core, &macro_node.path, macro_node.position, placement))
            }
            DastNode::Text(text) => {
                let mut element = DastElement::new("text", vec![node.clone()]);
                element.position = text.position;
                instantiate_element(core, &element, placement, cursor)
            }
        };
        produced.extend(made);
    }
    produced
}

/// Rebuild `element` as the only member of group `g`, with the seed it was
/// first built with so its random content comes out the same.
pub(crate) fn reinstantiate(
    core: &mut Core,
    composite: ComponentIdx,
    g: usize,
    element: &DastElement,
    scope: ScopeId,
    cursor: &mut VariantCursor,
    seed: VariantSeed,
) -> Option<ComponentIdx> {
    let placement = group_placement(core, composite, g, 0, scope, seed);
    instantiate_element(core, element, placement, cursor)
}

/// A single replacement of type `ty` in group `g`, optionally mirroring a source.
pub(crate) fn create_replacement(
    core: &mut Core,
    composite: ComponentIdx,
    g: usize,
    ty: &'static ComponentType,
    extend: Option<Extend>,
    scope: ScopeId,
) -> ComponentIdx {
    let seed = core.component(composite).variant.seed.child(1).child(g as u64);
    let position = core.component(composite).position;
    let placement = group_placement(core, composite, g, 0, scope, seed);
    let variant = VariantSource { seed, digit: None };
    let idx = new_component(core, ty, &placement, position, variant, None);
    core.component_mut(idx).extend = extend;
    name_component(core, idx, &placement, None);
    idx
}
