//! Component types as declarative tables.
//!
//! A component type is plain data: which attributes it accepts, which
//! essential values it stores, and for every state variable the queries it
//! reads plus a forward function (and optionally an inverse). The engine
//! interprets these tables; nothing here touches the graph directly.

pub mod answer;
pub mod choice_input;
pub mod common;
pub mod containers;
pub mod inputs;
pub mod lists;
pub mod primitives;

use crate::composites::CompositeKind;
use crate::value::{Value, ValueKind};
use std::collections::HashMap;
use std::sync::LazyLock;

pub type ForwardFn = fn(&Deps) -> Value;
pub type InverseFn = fn(&Value, &Deps) -> Result<Vec<InverseWrite>, String>;

/// Restricts which children a query sees. An empty list matches every type.
#[derive(Clone, Copy, Debug)]
pub struct ChildFilter {
    pub types: &'static [&'static str],
}

impl ChildFilter {
    pub const ANY: ChildFilter = ChildFilter { types: &[] };

    pub const fn of(types: &'static [&'static str]) -> Self {
        Self { types }
    }

    pub fn matches(&self, ty: &ComponentType) -> bool {
        self.types.is_empty() || self.types.iter().any(|name| name.eq_ignore_ascii_case(ty.name))
    }
}

#[derive(Clone, Copy, Debug)]
pub enum DataQuery {
    Essential(&'static str),
    /// Another state variable of the same component.
    StateVar(&'static str),
    /// Attribute value, or the attribute's default when it was not given.
    Attribute(&'static str),
    /// Attribute value; no item at all when it was not given.
    AttributeIfSet(&'static str),
    /// One state variable of every matching child, composites expanded.
    Children { filter: ChildFilter, state_var: &'static str },
    /// Literal text children and the primary value of component children,
    /// in document order.
    ChildValues,
    /// The matching children themselves, as one `Components` item.
    ChildComponents(ChildFilter),
    Parent(&'static str),
    /// The corresponding value of the component this one was copied from.
    Extend(&'static str),
}

#[derive(Debug)]
pub enum Definition {
    Derived {
        queries: &'static [DataQuery],
        forward: ForwardFn,
        inverse: Option<InverseFn>,
    },
    /// Computed by the component's composite behaviour.
    Replacements,
}

#[derive(Debug)]
pub struct StateVarSpec {
    pub name: &'static str,
    pub kind: ValueKind,
    /// Public variables are reported in snapshots and settled after actions.
    pub public: bool,
    pub definition: Definition,
}

impl StateVarSpec {
    pub const fn derived(
        name: &'static str,
        kind: ValueKind,
        queries: &'static [DataQuery],
        forward: ForwardFn,
    ) -> Self {
        Self {
            name,
            kind,
            public: true,
            definition: Definition::Derived { queries, forward, inverse: None },
        }
    }

    pub const fn invertible(
        name: &'static str,
        kind: ValueKind,
        queries: &'static [DataQuery],
        forward: ForwardFn,
        inverse: InverseFn,
    ) -> Self {
        Self {
            name,
            kind,
            public: true,
            definition: Definition::Derived { queries, forward, inverse: Some(inverse) },
        }
    }

    pub const fn replacements() -> Self {
        Self {
            name: "replacements",
            kind: ValueKind::Components,
            public: false,
            definition: Definition::Replacements,
        }
    }

    pub const fn private(self) -> Self {
        Self { public: false, ..self }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum EssentialInit {
    Default,
    /// The literal value of an attribute, when given.
    Attribute(&'static str),
    /// Concatenated literal text children, when there are no component children.
    ChildrenText,
}

#[derive(Debug)]
pub struct EssentialSpec {
    pub name: &'static str,
    pub kind: ValueKind,
    pub init: EssentialInit,
}

impl EssentialSpec {
    pub const fn new(name: &'static str, kind: ValueKind, init: EssentialInit) -> Self {
        Self { name, kind, init }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct AttributeSpec {
    pub name: &'static str,
    pub kind: ValueKind,
    pub default: fn() -> Value,
    /// Older name still accepted with a deprecation notice.
    pub deprecated_alias: Option<&'static str>,
}

impl AttributeSpec {
    pub const fn new(name: &'static str, kind: ValueKind, default: fn() -> Value) -> Self {
        Self { name, kind, default, deprecated_alias: None }
    }

    pub const fn renamed_from(self, alias: &'static str) -> Self {
        Self { deprecated_alias: Some(alias), ..self }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChildPolicy {
    Any,
    /// Children are kept as DAST and instantiated later by the component.
    Deferred,
    /// Literal text is split into one component of the given type per item.
    ListItems(&'static str),
}

#[derive(Debug)]
pub struct ComponentType {
    pub name: &'static str,
    pub state_vars: &'static [StateVarSpec],
    pub essentials: &'static [EssentialSpec],
    pub attributes: &'static [AttributeSpec],
    /// Attributes kept as raw strings.
    pub static_attributes: &'static [&'static str],
    /// Attributes that no longer do anything; using one is a deprecation notice.
    pub removed_attributes: &'static [&'static str],
    pub children: ChildPolicy,
    pub composite: Option<CompositeKind>,
    /// State variable copied by references and read by parents.
    pub primary: Option<&'static str>,
    pub actions: &'static [&'static str],
}

impl ComponentType {
    pub const BASE: ComponentType = ComponentType {
        name: "",
        state_vars: &[],
        essentials: &[],
        attributes: &[],
        static_attributes: &[],
        removed_attributes: &[],
        children: ChildPolicy::Any,
        composite: None,
        primary: None,
        actions: &[],
    };

    /// Every state variable, shared ones first.
    pub fn all_state_vars(&self) -> impl Iterator<Item = &'static StateVarSpec> + use<> {
        let own: &'static [StateVarSpec] = self.state_vars;
        common::COMMON_STATE_VARS.iter().chain(own.iter())
    }

    pub fn attribute_spec(&self, name: &str) -> Option<&'static AttributeSpec> {
        let own: &'static [AttributeSpec] = self.attributes;
        common::COMMON_ATTRIBUTES.iter().chain(own.iter()).find(|spec| spec.matches(name))
    }

    pub fn deprecated_attribute(&self, alias: &str) -> Option<&'static AttributeSpec> {
        let own: &'static [AttributeSpec] = self.attributes;
        own.iter()
            .find(|spec| spec.deprecated_alias.is_some_and(|old| old.eq_ignore_ascii_case(alias)))
    }

    pub fn is_static_attribute(&self, name: &str) -> bool {
        common::COMMON_STATIC_ATTRIBUTES
            .iter()
            .chain(self.static_attributes.iter())
            .any(|static_name| static_name.eq_ignore_ascii_case(name))
    }

    pub fn has_action(&self, action: &str) -> bool {
        self.actions.iter().any(|name| name.eq_ignore_ascii_case(action))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DepItem {
    pub value: Value,
    /// False for literals, which inverse definitions cannot write to.
    pub writable: bool,
}

/// Values handed to a definition: one group of items per query.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Deps {
    pub groups: Vec<Vec<DepItem>>,
}

impl Deps {
    pub fn group(&self, query: usize) -> &[DepItem] {
        self.groups.get(query).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first(&self, query: usize) -> Option<&Value> {
        self.group(query).first().map(|item| &item.value)
    }

    pub fn value(&self, query: usize) -> Value {
        self.first(query).cloned().unwrap_or(Value::Null)
    }

    pub fn values(&self, query: usize) -> impl Iterator<Item = &Value> {
        self.group(query).iter().map(|item| &item.value)
    }

    pub fn number(&self, query: usize) -> f64 {
        self.first(query).and_then(Value::as_number).unwrap_or(f64::NAN)
    }

    pub fn integer(&self, query: usize) -> Option<i64> {
        self.first(query).and_then(Value::as_integer)
    }

    pub fn flag(&self, query: usize) -> bool {
        self.first(query).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn list(&self, query: usize) -> &[Value] {
        self.first(query).and_then(Value::as_list).unwrap_or(&[])
    }
}

/// One write requested by an inverse definition: `value` goes to the
/// source of item `item` of query `query`.
#[derive(Clone, Debug, PartialEq)]
pub struct InverseWrite {
    pub query: usize,
    pub item: usize,
    pub value: Value,
}

impl InverseWrite {
    pub fn new(query: usize, item: usize, value: Value) -> Self {
        Self { query, item, value }
    }
}

static REGISTRY: LazyLock<HashMap<String, &'static ComponentType>> = LazyLock::new(|| {
    let types: [&'static ComponentType; 36] = [
        &containers::DOCUMENT,
        &containers::SECTION,
        &containers::PROBLEM,
        &containers::P,
        &containers::DIV,
        &containers::GROUP,
        &containers::OPTION,
        &containers::TEMPLATE,
        &containers::SOURCES,
        &containers::VARIANT_CONTROL,
        &primitives::TEXT,
        &primitives::NUMBER,
        &primitives::MATH,
        &primitives::BOOLEAN,
        &lists::TEXT_LIST,
        &lists::NUMBER_LIST,
        &lists::MATH_LIST,
        &lists::BOOLEAN_LIST,
        &inputs::TEXT_INPUT,
        &inputs::MATH_INPUT,
        &inputs::BOOLEAN_INPUT,
        &choice_input::CHOICE_INPUT,
        &choice_input::CHOICE,
        &answer::ANSWER,
        &answer::AWARD,
        &crate::composites::COPY,
        &crate::composites::select::SELECT,
        &crate::composites::sequence::SEQUENCE,
        &crate::composites::sequence::SELECT_FROM_SEQUENCE,
        &crate::composites::random_numbers::SELECT_RANDOM_NUMBERS,
        &crate::composites::random_numbers::SAMPLE_RANDOM_NUMBERS,
        &crate::composites::map::MAP,
        &crate::composites::collect::COLLECT,
        &containers::TITLE,
        &containers::SPAN,
        &containers::ASIDE,
    ];
    types
        .into_iter()
        .map(|ty| (ty.name.to_ascii_lowercase(), ty))
        .collect()
});

pub fn lookup(name: &str) -> Option<&'static ComponentType> {
    REGISTRY.get(&name.to_ascii_lowercase()).copied()
}

pub fn component_types() -> impl Iterator<Item = &'static ComponentType> {
    REGISTRY.values().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(lookup("SELECTFROMSEQUENCE").map(|ty| ty.name), Some("selectFromSequence"));
        assert!(lookup("graph").is_none());
    }

    #[test]
    fn every_state_variable_name_is_unique_per_type() {
        for ty in component_types() {
            let names = ty.all_state_vars().map(|spec| spec.name).collect::<Vec<_>>();
            let mut deduped = names.clone();
            deduped.sort_unstable();
            deduped.dedup();
            assert_eq!(names.len(), deduped.len(), "duplicate state variable in <{}>", ty.name);
        }
    }

    #[test]
    fn essential_backed_queries_name_declared_essentials() {
        for ty in component_types() {
            for spec in ty.all_state_vars() {
                if let Definition::Derived { queries, .. } = &spec.definition {
                    for query in *queries {
                        if let DataQuery::Essential(name) = query {
                            assert!(
                                ty.essentials.iter().any(|essential| essential.name == *name),
                                "<{}>.{} reads undeclared essential {name}",
                                ty.name,
                                spec.name
                            );
                        }
                    }
                }
            }
        }
    }
}
