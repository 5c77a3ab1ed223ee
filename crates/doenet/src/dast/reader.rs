use super::macros::split_text;
use super::{DastAttribute, DastElement, DastNode, DastText, Point, Position};
use crate::diagnostics::Diagnostic;
use chumsky::prelude::*;

type Extra<'src> = extra::Err<Rich<'src, char>>;

/// Byte offset to line/column conversion.
#[derive(Debug, Clone)]
pub struct LineIndex {
    source: String,
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(offset, _)| offset + 1))
            .collect();
        Self { source: source.to_string(), line_starts }
    }

    pub fn point(&self, offset: usize) -> Point {
        let offset = offset.min(self.source.len());
        let line = self.line_starts.partition_point(|start| *start <= offset).max(1);
        let line_start = self.line_starts[line - 1];
        let column = self
            .source
            .get(line_start..offset)
            .map(|prefix| prefix.chars().count())
            .unwrap_or(offset - line_start)
            + 1;
        Point { line, column, offset }
    }

    pub fn position(&self, start: usize, end: usize) -> Position {
        Position { start: self.point(start), end: self.point(end) }
    }
}

fn name<'src>() -> impl Parser<'src, &'src str, &'src str, Extra<'src>> + Clone {
    any()
        .filter(|character: &char| character.is_ascii_alphabetic() || *character == '_')
        .then(
            any()
                .filter(|character: &char| {
                    character.is_ascii_alphanumeric() || matches!(character, '_' | '-' | ':' | '.')
                })
                .repeated(),
        )
        .to_slice()
}

fn nodes<'src>(index: &'src LineIndex) -> impl Parser<'src, &'src str, Vec<DastNode>, Extra<'src>> {
    let quoted = choice((
        none_of('"').repeated().to_slice().delimited_by(just('"'), just('"')),
        none_of('\'').repeated().to_slice().delimited_by(just('\''), just('\'')),
    ))
    .map_with(|value: &str, extra| {
        let span: SimpleSpan = extra.span();
        (value, span.start + 1)
    });

    let attribute = name()
        .then(just('=').padded().ignore_then(quoted).or_not())
        .map_with(move |(attribute_name, value), extra| {
            let span: SimpleSpan = extra.span();
            let children = match value {
                Some((value, start)) => split_text(value, start, index),
                // A bare attribute means "true".
                None => vec![DastNode::Text(DastText { value: "true".to_string(), position: None })],
            };
            DastAttribute {
                name: attribute_name.to_string(),
                children,
                position: Some(index.position(span.start, span.end)),
            }
        });
    let attributes = attribute.padded().repeated().collect::<Vec<_>>();

    let comment = just("<!--")
        .then(any().and_is(just("-->").not()).repeated())
        .then(just("-->"))
        .to(Vec::new());

    let instruction = just("<?")
        .then(any().and_is(just("?>").not()).repeated())
        .then(just("?>"))
        .to(Vec::new());

    let text = none_of('<')
        .repeated()
        .at_least(1)
        .to_slice()
        .map_with(move |raw: &str, extra| {
            let span: SimpleSpan = extra.span();
            split_text(raw, span.start, index)
        });

    let content = recursive(|content| {
        let open = just('<')
            .ignore_then(name())
            .then(attributes)
            .then_ignore(text::whitespace());

        let self_closing = open
            .clone()
            .then_ignore(just("/>"))
            .map(|(tag, attributes)| (tag, attributes, Vec::new(), None));

        let with_body = open
            .then_ignore(just('>'))
            .then(content.repeated().collect::<Vec<Vec<DastNode>>>())
            .then(
                just("</")
                    .ignore_then(name())
                    .then_ignore(text::whitespace())
                    .then_ignore(just('>')),
            )
            .map(|(((tag, attributes), children), close)| {
                (tag, attributes, children.concat(), Some(close))
            });

        let element = choice((self_closing, with_body))
            .try_map(|(tag, attributes, children, close): (&str, _, _, Option<&str>), span| {
                match close {
                    Some(close) if close != tag => Err(Rich::custom(
                        span,
                        format!("Mismatched closing tag </{close}> for <{tag}>"),
                    )),
                    _ => Ok((tag, attributes, children)),
                }
            })
            .map_with(move |(tag, attributes, children), extra| {
                let span: SimpleSpan = extra.span();
                vec![DastNode::Element(DastElement {
                    name: tag.to_string(),
                    attributes,
                    children,
                    position: Some(index.position(span.start, span.end)),
                })]
            });

        choice((comment, instruction, element, text))
    });

    content
        .repeated()
        .collect::<Vec<Vec<DastNode>>>()
        .map(|nodes| nodes.concat())
        .then_ignore(end())
}

/// Reads DoenetML source into a `document` element. Content that is not
/// already a single `<document>` is wrapped in an implicit one.
pub fn read_doenetml(source: &str) -> (DastElement, Vec<Diagnostic>) {
    let index = LineIndex::new(source);
    let (output, errors) = nodes(&index).parse(source).into_output_errors();

    let diagnostics = errors
        .iter()
        .map(|error| {
            let span = error.span();
            Diagnostic::error(
                format!("Invalid DoenetML: {error}"),
                Some(index.position(span.start, span.end)),
            )
        })
        .collect::<Vec<_>>();

    let nodes = output.unwrap_or_default();
    let significant = nodes.iter().filter(|node| !node.is_blank_text()).collect::<Vec<_>>();
    let root = match significant.as_slice() {
        [DastNode::Element(element)] if element.is("document") => element.clone(),
        _ => DastElement {
            name: "document".to_string(),
            attributes: Vec::new(),
            children: nodes,
            position: Some(index.position(0, source.len())),
        },
    };
    (root, diagnostics)
}
