//! `<map>`: one copy of the template per source.
//!
//! ```text
//! <map>
//!   <template><math>2$x</math></template>
//!   <sources alias="x" indexAlias="i"><math>a</math><math>b</math></sources>
//! </map>
//! ```
//!
//! Inside group `j`, `$x` is the `j`-th source and `$i` is `j + 1`. The alias
//! is looked up through `sourceComponents` every time, so a template copy
//! follows its source when the sources change.

use super::{CompositeKind, Memory, num_groups, push_group, show_groups};
use crate::components::{ChildFilter, ComponentType, DataQuery, StateVarSpec};
use crate::core::instantiate::{group_scope, instantiate_group};
use crate::core::{Child, ComponentIdx, Core};
use crate::resolver::Alias;
use crate::value::ValueKind;
use crate::variants::VariantCursor;

pub static MAP: ComponentType = ComponentType {
    name: "map",
    state_vars: &[
        StateVarSpec::replacements(),
        StateVarSpec::derived(
            "sourceComponents",
            ValueKind::Components,
            &[DataQuery::Children { filter: ChildFilter::of(&["sources"]), state_var: "childComponents" }],
            |deps| deps.value(0),
        ),
    ],
    composite: Some(CompositeKind::Map),
    ..ComponentType::BASE
};

fn child_of_type(core: &Core, idx: ComponentIdx, type_name: &str) -> Option<ComponentIdx> {
    core.component(idx).children.iter().find_map(|child| match child {
        Child::Component(child) if core.component(*child).ty.name == type_name => Some(*child),
        _ => None,
    })
}

pub(crate) fn update(core: &mut Core, idx: ComponentIdx, memory: Memory) -> Memory {
    let sources = core.read_var(idx, "sourceComponents");
    let num_sources = sources.as_components().map_or(0, <[ComponentIdx]>::len);

    let template = child_of_type(core, idx, "template")
        .and_then(|template| core.component(template).dast.clone())
        .map(|element| element.children.clone())
        .unwrap_or_default();
    let (alias, index_alias) = match child_of_type(core, idx, "sources") {
        Some(sources) => {
            let sources = core.component(sources);
            (
                sources.static_attribute("alias").map(str::to_string),
                sources.static_attribute("indexAlias").map(str::to_string),
            )
        }
        None => (None, None),
    };

    let unique = core.variant.unique;
    for g in num_groups(core, idx)..num_sources {
        let mut aliases = Vec::new();
        if let Some(alias) = &alias {
            aliases.push((alias.clone(), Alias::Source { map: idx, index: g }));
        }
        if let Some(index_alias) = &index_alias {
            aliases.push((index_alias.clone(), Alias::Index(g)));
        }
        let scope = group_scope(core, idx, g, aliases);
        let mut cursor = if unique { VariantCursor::unique(0) } else { VariantCursor::seeded() };
        let seed = core.component(idx).variant.seed.child(1).child(g as u64);
        let group = instantiate_group(core, idx, g, &template, scope, &mut cursor, seed);
        push_group(core, idx, group);
    }
    show_groups(core, idx, num_sources);
    memory
}
