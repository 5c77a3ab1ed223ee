use super::{DastMacro, DastNode, DastText, LineIndex};
use chumsky::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

type Extra<'src> = extra::Err<Rich<'src, char>>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathPart {
    Parent,
    Name(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropAccess {
    pub name: String,
    /// 1-based, as written.
    pub index: Option<usize>,
}

/// A reference such as `$x`, `$x.y[2]`, `$(../a/b.prop)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroPath {
    pub absolute: bool,
    pub parts: Vec<PathPart>,
    /// 1-based, as written.
    pub index: Option<usize>,
    pub props: Vec<PropAccess>,
}

impl fmt::Display for MacroPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "$")?;
        let simple = !self.absolute && matches!(self.parts.as_slice(), [PathPart::Name(_)]);
        let parts = self
            .parts
            .iter()
            .map(|part| match part {
                PathPart::Parent => "..",
                PathPart::Name(name) => name.as_str(),
            })
            .collect::<Vec<_>>()
            .join("/");
        if simple {
            write!(f, "{parts}")?;
        } else {
            write!(f, "({}{parts})", if self.absolute { "/" } else { "" })?;
        }
        if let Some(index) = self.index {
            write!(f, "[{index}]")?;
        }
        for prop in &self.props {
            write!(f, ".{}", prop.name)?;
            if let Some(index) = prop.index {
                write!(f, "[{index}]")?;
            }
        }
        Ok(())
    }
}

fn identifier<'src>() -> impl Parser<'src, &'src str, &'src str, Extra<'src>> + Clone {
    any()
        .filter(|character: &char| character.is_ascii_alphabetic() || *character == '_')
        .then(
            any()
                .filter(|character: &char| character.is_ascii_alphanumeric() || *character == '_')
                .repeated(),
        )
        .to_slice()
}

/// Inside parentheses names may also contain hyphens.
fn path_identifier<'src>() -> impl Parser<'src, &'src str, &'src str, Extra<'src>> + Clone {
    any()
        .filter(|character: &char| character.is_ascii_alphabetic() || *character == '_')
        .then(
            any()
                .filter(|character: &char| {
                    character.is_ascii_alphanumeric() || *character == '_' || *character == '-'
                })
                .repeated(),
        )
        .to_slice()
}

fn index<'src>() -> impl Parser<'src, &'src str, usize, Extra<'src>> + Clone {
    text::int(10)
        .from_str::<usize>()
        .unwrapped()
        .delimited_by(just('['), just(']'))
}

fn props<'src>() -> impl Parser<'src, &'src str, Vec<PropAccess>, Extra<'src>> + Clone {
    just('.')
        .ignore_then(identifier())
        .then(index().or_not())
        .map(|(name, index)| PropAccess { name: name.to_string(), index })
        .repeated()
        .collect()
}

fn path_parts<'src>() -> impl Parser<'src, &'src str, (bool, Vec<PathPart>), Extra<'src>> + Clone {
    let part = just("..")
        .to(PathPart::Parent)
        .or(path_identifier().map(|name: &str| PathPart::Name(name.to_string())));
    just('/')
        .or_not()
        .then(part.separated_by(just('/')).at_least(1).collect::<Vec<_>>())
        .map(|(slash, parts)| (slash.is_some(), parts))
}

fn parenthesized<'src>() -> impl Parser<'src, &'src str, MacroPath, Extra<'src>> + Clone {
    path_parts()
        .then(props())
        .delimited_by(just('('), just(')'))
        .then(index().or_not())
        .then(props())
        .map(|((((absolute, parts), inner_props), index), outer_props)| MacroPath {
            absolute,
            parts,
            index,
            props: inner_props.into_iter().chain(outer_props).collect(),
        })
}

fn simple<'src>() -> impl Parser<'src, &'src str, MacroPath, Extra<'src>> + Clone {
    identifier()
        .then(index().or_not())
        .then(props())
        .map(|((name, index), props)| MacroPath {
            absolute: false,
            parts: vec![PathPart::Name(name.to_string())],
            index,
            props,
        })
}

pub fn macro_path<'src>() -> impl Parser<'src, &'src str, MacroPath, Extra<'src>> + Clone {
    just('$').ignore_then(choice((parenthesized(), simple())))
}

/// Parses a reference written in an attribute such as `source="a/b"` or `source="$x.y"`.
pub fn parse_reference(text: &str) -> Option<MacroPath> {
    let bare = path_parts()
        .then(index().or_not())
        .then(props())
        .map(|(((absolute, parts), index), props)| MacroPath { absolute, parts, index, props });
    just('$')
        .or_not()
        .ignore_then(choice((parenthesized(), bare)))
        .padded()
        .then_ignore(end())
        .parse(text)
        .into_output()
}

/// Parses `assignNames`: `a b c` or `(a b) (c d)`.
pub fn parse_assign_names(text: &str) -> Option<Vec<Vec<String>>> {
    assign_names().parse(text).into_output()
}

fn assign_names<'src>() -> impl Parser<'src, &'src str, Vec<Vec<String>>, Extra<'src>> {
    let name = any()
        .filter(|character: &char| !character.is_whitespace() && *character != '(' && *character != ')')
        .repeated()
        .at_least(1)
        .to_slice()
        .map(|name: &str| name.to_string());
    let group = name
        .clone()
        .padded()
        .repeated()
        .collect::<Vec<_>>()
        .delimited_by(just('('), just(')'));
    let entry = group.or(name.map(|name| vec![name]));
    entry.padded().repeated().collect::<Vec<_>>().then_ignore(end())
}

#[derive(Clone)]
enum Piece {
    Macro(MacroPath),
    Character,
}

/// Splits raw text into text and macro nodes. `base` is the byte offset of
/// `raw` in the source so positions point back into the document.
pub(super) fn split_text(raw: &str, base: usize, index: &LineIndex) -> Vec<DastNode> {
    let pieces = choice((macro_path().map(Piece::Macro), any().to(Piece::Character)))
        .map_with(|piece, extra| {
            let span: SimpleSpan = extra.span();
            (piece, span)
        })
        .repeated()
        .collect::<Vec<_>>()
        .parse(raw)
        .into_output()
        .unwrap_or_default();

    let mut nodes = Vec::new();
    let mut text_start: Option<usize> = None;
    let flush = |nodes: &mut Vec<DastNode>, start: usize, end: usize| {
        nodes.push(DastNode::Text(DastText {
            value: decode_entities(&raw[start..end]),
            position: Some(index.position(base + start, base + end)),
        }));
    };
    for (piece, span) in pieces {
        match piece {
            Piece::Character => {
                text_start.get_or_insert(span.start);
            }
            Piece::Macro(path) => {
                if let Some(start) = text_start.take() {
                    flush(&mut nodes, start, span.start);
                }
                nodes.push(DastNode::Macro(DastMacro {
                    path,
                    position: Some(index.position(base + span.start, base + span.end)),
                }));
            }
        }
    }
    if let Some(start) = text_start {
        flush(&mut nodes, start, raw.len());
    }
    nodes
}

pub(super) fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> MacroPath {
        macro_path().then_ignore(end()).parse(text).into_output().unwrap()
    }

    #[test]
    fn simple_macro_with_props_and_index() {
        let path = parse("$x.values[2]");
        assert_eq!(path.parts, vec![PathPart::Name("x".into())]);
        assert_eq!(path.index, None);
        assert_eq!(path.props, vec![PropAccess { name: "values".into(), index: Some(2) }]);
        assert_eq!(path.to_string(), "$x.values[2]");
    }

    #[test]
    fn parenthesized_macro_with_parent_hop() {
        let path = parse("$(../a/b.prop)");
        assert!(!path.absolute);
        assert_eq!(
            path.parts,
            vec![PathPart::Parent, PathPart::Name("a".into()), PathPart::Name("b".into())]
        );
        assert_eq!(path.props.len(), 1);
        assert!(parse("$(/a)").absolute);
    }

    #[test]
    fn splits_text_around_macros() {
        let source = "Hi $name. Cost: $5 and $(a/b)!";
        let index = LineIndex::new(source);
        let nodes = split_text(source, 0, &index);
        let kinds = nodes
            .iter()
            .map(|node| match node {
                DastNode::Text(text) => format!("t:{}", text.value),
                DastNode::Macro(m) => format!("m:{}", m.path),
                DastNode::Element(_) => "e".to_string(),
            })
            .collect::<Vec<_>>();
        assert_eq!(kinds, vec!["t:Hi ", "m:$name", "t:. Cost: $5 and ", "m:$(a/b)", "t:!"]);
    }

    #[test]
    fn assign_names_groups() {
        assert_eq!(
            parse_assign_names("(a b) c"),
            Some(vec![vec!["a".to_string(), "b".to_string()], vec!["c".to_string()]])
        );
        assert_eq!(parse_assign_names("(a)(b)").map(|names| names.len()), Some(2));
    }

    #[test]
    fn references_in_attributes() {
        let path = parse_reference("sec/p1").unwrap();
        assert_eq!(path.parts.len(), 2);
        assert_eq!(parse_reference("$x.y").unwrap().props[0].name, "y");
        assert!(parse_reference("x y").is_none());
    }
}
