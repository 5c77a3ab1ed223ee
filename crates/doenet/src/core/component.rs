use crate::components::{AttributeSpec, ComponentType, EssentialSpec, StateVarSpec};
use crate::composites::CompositeState;
use crate::dast::{DastElement, Position};
use crate::graph::CellId;
use crate::resolver::ScopeId;
use crate::value::Value;
use crate::variants::VariantSource;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Index into the component arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct ComponentIdx(pub u32);

#[derive(Clone, Debug, PartialEq)]
pub enum Child {
    Component(ComponentIdx),
    Text(Arc<str>),
}

/// What a replacement mirrors. Its `Extend(..)` queries read from here.
#[derive(Clone, Debug, PartialEq)]
pub enum Extend {
    Component(ComponentIdx),
    /// A state variable, or one item of a list-valued one.
    StateVar { cell: CellId, index: Option<usize> },
    Literal(Value),
}

#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    Literal(Value),
    /// Attribute markup with references, instantiated as a component of the
    /// attribute's kind.
    Component(ComponentIdx),
}

#[derive(Debug)]
pub struct Component {
    /// Full name, `/`-separated.
    pub name: String,
    pub ty: &'static ComponentType,
    pub parent: Option<ComponentIdx>,
    pub children: Vec<Child>,
    pub vars: Vec<(&'static StateVarSpec, CellId)>,
    pub essentials: Vec<(&'static EssentialSpec, CellId)>,
    pub attributes: Vec<(&'static AttributeSpec, AttrValue)>,
    pub static_attributes: Vec<(String, String)>,
    pub extend: Option<Extend>,
    /// Markup this component was built from, kept for deferred children and
    /// for copies that rebuild the subtree.
    pub dast: Option<Arc<DastElement>>,
    pub variant: VariantSource,
    /// Variant digits left when this component was reached, in unique mode.
    pub cursor_start: Option<u64>,
    pub position: Option<Position>,
    /// Scope the component was named in and resolves references from.
    pub scope: ScopeId,
    /// Set by `newNamespace`: the scope of its descendants.
    pub namespace: Option<ScopeId>,
    pub composite: Option<CompositeState>,
    pub active: bool,
    /// Part of an attribute value rather than of the document tree.
    pub in_attribute: bool,
}

impl Component {
    pub fn var(&self, name: &str) -> Option<CellId> {
        self.vars
            .iter()
            .find(|(spec, _)| spec.name.eq_ignore_ascii_case(name))
            .map(|(_, cell)| *cell)
    }

    pub fn essential(&self, name: &str) -> Option<CellId> {
        self.essentials
            .iter()
            .find(|(spec, _)| spec.name == name)
            .map(|(_, cell)| *cell)
    }

    pub fn attribute(&self, name: &str) -> Option<&AttrValue> {
        self.attributes
            .iter()
            .find(|(spec, _)| spec.matches(name))
            .map(|(_, value)| value)
    }

    pub fn static_attribute(&self, name: &str) -> Option<&str> {
        self.static_attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn primary_cell(&self) -> Option<CellId> {
        self.var(self.ty.primary?)
    }

    /// Last segment of the full name.
    pub fn local_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}
