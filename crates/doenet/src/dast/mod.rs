//! DoenetML abstract syntax tree.
//!
//! Node shapes follow the unist conventions (`type`, `position` with 1-based
//! line/column points), which is what the engine consumes.

mod macros;
mod reader;

pub use macros::{MacroPath, PathPart, PropAccess, parse_assign_names, parse_reference};
pub use reader::{LineIndex, read_doenetml};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

/// `end` is exclusive: it points just past the last character.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub start: Point,
    pub end: Point,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DastNode {
    Element(DastElement),
    Text(DastText),
    Macro(DastMacro),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DastElement {
    pub name: String,
    pub attributes: Vec<DastAttribute>,
    pub children: Vec<DastNode>,
    pub position: Option<Position>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DastAttribute {
    pub name: String,
    pub children: Vec<DastNode>,
    pub position: Option<Position>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DastText {
    pub value: String,
    pub position: Option<Position>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DastMacro {
    pub path: MacroPath,
    pub position: Option<Position>,
}

impl DastElement {
    pub fn new(name: &str, children: Vec<DastNode>) -> Self {
        Self {
            name: name.to_string(),
            attributes: Vec::new(),
            children,
            position: None,
        }
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    pub fn attribute(&self, name: &str) -> Option<&DastAttribute> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name.eq_ignore_ascii_case(name))
    }

    /// Literal attribute text; `None` when absent or when it contains macros.
    pub fn literal_attribute(&self, name: &str) -> Option<String> {
        self.attribute(name)?.literal_text()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    pub fn element_children(&self) -> impl Iterator<Item = &DastElement> {
        self.children.iter().filter_map(|child| match child {
            DastNode::Element(element) => Some(element),
            _ => None,
        })
    }
}

impl DastAttribute {
    pub fn literal_text(&self) -> Option<String> {
        let mut text = String::new();
        for child in &self.children {
            match child {
                DastNode::Text(piece) => text.push_str(&piece.value),
                _ => return None,
            }
        }
        Some(text)
    }

    pub fn is_static(&self) -> bool {
        self.literal_text().is_some()
    }
}

impl DastNode {
    pub fn text(value: &str) -> Self {
        DastNode::Text(DastText { value: value.to_string(), position: None })
    }

    pub fn position(&self) -> Option<Position> {
        match self {
            DastNode::Element(element) => element.position,
            DastNode::Text(text) => text.position,
            DastNode::Macro(macro_node) => macro_node.position,
        }
    }

    pub fn is_blank_text(&self) -> bool {
        matches!(self, DastNode::Text(text) if text.value.trim().is_empty())
    }
}
