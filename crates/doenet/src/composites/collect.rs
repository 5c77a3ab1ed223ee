//! `<collect source componentTypes prop maxNumber>`: copies of the matching
//! descendants of a source.

use super::copy::build_group;
use super::{CompositeKind, Memory, discard_groups, num_groups, push_group, show_groups};
use crate::components::{AttributeSpec, ChildPolicy, ComponentType, StateVarSpec};
use crate::core::{Child, ComponentIdx, Core};
use crate::dast::parse_reference;
use crate::resolver::{Referent, resolve_path};
use crate::value::{Value, ValueKind};

pub static COLLECT: ComponentType = ComponentType {
    name: "collect",
    state_vars: &[StateVarSpec::replacements()],
    attributes: &[
        AttributeSpec::new("componentTypes", ValueKind::Text, || Value::text("")),
        AttributeSpec::new("maxNumber", ValueKind::Integer, || Value::Null),
    ],
    static_attributes: &["source", "prop"],
    children: ChildPolicy::Deferred,
    composite: Some(CompositeKind::Collect),
    ..ComponentType::BASE
};

#[derive(Debug, Default)]
pub struct CollectMemory {
    pub referents: Vec<Referent>,
    pub reported: bool,
}

/// Matching descendants in document order, composites expanded.
fn descendants(core: &mut Core, root: ComponentIdx, types: &[String], found: &mut Vec<ComponentIdx>) {
    for child in core.expanded_children(root) {
        let Child::Component(child) = child else {
            continue;
        };
        let name = core.component(child).ty.name;
        if types.is_empty() || types.iter().any(|ty| ty.eq_ignore_ascii_case(name)) {
            found.push(child);
        }
        descendants(core, child, types, found);
    }
}

fn source(core: &mut Core, idx: ComponentIdx) -> Result<ComponentIdx, String> {
    let text = core
        .component(idx)
        .static_attribute("source")
        .map(str::to_string)
        .ok_or("no source given")?;
    let path = parse_reference(&text).ok_or_else(|| format!("`{text}` is not a reference"))?;
    let scope = core.component(idx).scope;
    match resolve_path(core, scope, &path)?.as_slice() {
        [Referent::Component(source)] => Ok(*source),
        _ => Err(format!("`{text}` is not a single component")),
    }
}

pub(crate) fn update(core: &mut Core, idx: ComponentIdx, memory: Memory) -> Memory {
    let mut memory = match memory {
        Memory::Collect(memory) => memory,
        _ => CollectMemory::default(),
    };
    let source = match source(core, idx) {
        Ok(source) => source,
        Err(reason) => {
            if !memory.reported {
                let position = core.component(idx).position;
                core.diagnostics.error(format!("Cannot collect: {reason}"), position);
                memory.reported = true;
            }
            discard_groups(core, idx, 0);
            memory.referents.clear();
            return Memory::Collect(memory);
        }
    };

    let types = core
        .read_attribute(idx, "componentTypes")
        .to_text()
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|ty| !ty.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();
    let mut found = Vec::new();
    descendants(core, source, &types, &mut found);
    found.retain(|component| *component != idx);
    if let Some(max) = core.read_attribute(idx, "maxNumber").as_integer() {
        found.truncate(usize::try_from(max).unwrap_or(0));
    }

    let prop = core.component(idx).static_attribute("prop").map(str::to_string);
    let referents = found
        .into_iter()
        .filter_map(|component| match &prop {
            Some(prop) => {
                let var = core
                    .component(component)
                    .vars
                    .iter()
                    .position(|(spec, _)| spec.name.eq_ignore_ascii_case(prop.trim()))?;
                Some(Referent::StateVar { component, var, index: None })
            }
            None => Some(Referent::Component(component)),
        })
        .collect::<Vec<_>>();

    // Groups for the unchanged prefix survive.
    let kept = memory
        .referents
        .iter()
        .zip(&referents)
        .take_while(|(old, new)| old == new)
        .count()
        .min(num_groups(core, idx));
    discard_groups(core, idx, kept);
    for (g, referent) in referents.iter().enumerate().skip(kept) {
        let group = build_group(core, idx, g, referent);
        push_group(core, idx, group);
    }
    show_groups(core, idx, referents.len());
    memory.referents = referents;
    Memory::Collect(memory)
}
