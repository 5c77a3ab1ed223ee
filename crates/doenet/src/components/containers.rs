//! Components that only hold other components.

use super::{ChildFilter, ChildPolicy, ComponentType, DataQuery, Deps, EssentialInit, EssentialSpec, StateVarSpec};
use crate::value::{Value, ValueKind};

/// Text of the children, literal text included, with blank pieces collapsed.
fn children_text(deps: &Deps) -> Value {
    let text = deps.values(0).map(Value::to_text).collect::<String>();
    Value::text(text.split_whitespace().collect::<Vec<_>>().join(" "))
}

const TEXT: StateVarSpec = StateVarSpec::derived("text", ValueKind::Text, &[DataQuery::ChildValues], children_text);

fn stored(deps: &Deps) -> Value {
    deps.value(0)
}

pub static DOCUMENT: ComponentType = ComponentType {
    name: "document",
    state_vars: &[
        StateVarSpec::derived("variantIndex", ValueKind::Integer, &[DataQuery::Essential("variantIndex")], stored),
        StateVarSpec::derived("variantName", ValueKind::Text, &[DataQuery::Essential("variantName")], stored),
        StateVarSpec::derived("numVariants", ValueKind::Integer, &[DataQuery::Essential("numVariants")], stored),
        StateVarSpec::derived(
            "title",
            ValueKind::Text,
            &[DataQuery::Children { filter: ChildFilter::of(&["title"]), state_var: "text" }],
            stored,
        ),
    ],
    essentials: &[
        EssentialSpec::new("variantIndex", ValueKind::Integer, EssentialInit::Default),
        EssentialSpec::new("variantName", ValueKind::Text, EssentialInit::Default),
        EssentialSpec::new("numVariants", ValueKind::Integer, EssentialInit::Default),
    ],
    ..ComponentType::BASE
};

pub static SECTION: ComponentType = ComponentType {
    name: "section",
    state_vars: &[StateVarSpec::derived(
        "title",
        ValueKind::Text,
        &[DataQuery::Children { filter: ChildFilter::of(&["title"]), state_var: "text" }],
        stored,
    )],
    removed_attributes: &["suppressAutoName", "suppressAutoNumber"],
    ..ComponentType::BASE
};

/// A problem numbers its own variants, independent of the document's.
pub static PROBLEM: ComponentType = ComponentType {
    name: "problem",
    state_vars: &[StateVarSpec::derived(
        "variantIndex",
        ValueKind::Integer,
        &[DataQuery::Essential("variantIndex")],
        stored,
    )],
    essentials: &[EssentialSpec::new("variantIndex", ValueKind::Integer, EssentialInit::Default)],
    removed_attributes: &["suppressAutoName", "suppressAutoNumber"],
    ..ComponentType::BASE
};

pub static P: ComponentType = ComponentType { name: "p", state_vars: &[TEXT], ..ComponentType::BASE };

pub static DIV: ComponentType = ComponentType { name: "div", state_vars: &[TEXT], ..ComponentType::BASE };

pub static SPAN: ComponentType = ComponentType { name: "span", state_vars: &[TEXT], ..ComponentType::BASE };

pub static ASIDE: ComponentType = ComponentType { name: "aside", state_vars: &[TEXT], ..ComponentType::BASE };

pub static TITLE: ComponentType = ComponentType { name: "title", state_vars: &[TEXT], ..ComponentType::BASE };

pub static GROUP: ComponentType = ComponentType { name: "group", ..ComponentType::BASE };

/// Only meaningful inside `<select>`, which reads options from the markup.
pub static OPTION: ComponentType = ComponentType {
    name: "option",
    static_attributes: &["selectWeight"],
    ..ComponentType::BASE
};

pub static TEMPLATE: ComponentType = ComponentType {
    name: "template",
    children: ChildPolicy::Deferred,
    ..ComponentType::BASE
};

pub static SOURCES: ComponentType = ComponentType {
    name: "sources",
    state_vars: &[StateVarSpec::derived(
        "childComponents",
        ValueKind::Components,
        &[DataQuery::ChildComponents(ChildFilter::ANY)],
        stored,
    )],
    static_attributes: &["alias", "indexAlias"],
    ..ComponentType::BASE
};

pub static VARIANT_CONTROL: ComponentType = ComponentType {
    name: "variantControl",
    static_attributes: &[
        "numVariants",
        "variantNames",
        "uniqueVariants",
        "variantsToInclude",
        "variantsToExclude",
        "seeds",
    ],
    ..ComponentType::BASE
};
