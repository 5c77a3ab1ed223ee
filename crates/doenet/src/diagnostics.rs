//! Centrally collected errors and warnings.
//!
//! Nothing recoverable in a document is raised as a Rust error. Problems are
//! appended here with the source range they came from and the build carries on.

use crate::dast::Position;
use ariadne::{Config, Label, Report, ReportKind, Source};
use serde::{Deserialize, Serialize};
use std::ops::Range;

pub const LEVEL_INFO: u8 = 1;
pub const LEVEL_VALIDATION: u8 = 2;

/// Source range of a diagnostic. Lines and characters are 1-based and
/// `char_end` is inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoenetMlRange {
    pub line_begin: usize,
    pub char_begin: usize,
    pub line_end: usize,
    pub char_end: usize,
}

impl From<Position> for DoenetMlRange {
    fn from(position: Position) -> Self {
        Self {
            line_begin: position.start.line,
            char_begin: position.start.column,
            line_end: position.end.line,
            char_end: position.end.column.saturating_sub(1).max(1),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    pub level: u8,
    #[serde(rename = "doenetMLrange", default, skip_serializing_if = "Option::is_none")]
    pub doenet_ml_range: Option<DoenetMlRange>,
    #[serde(skip)]
    pub span: Option<Range<usize>>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, level: u8, position: Option<Position>) -> Self {
        Self {
            message: message.into(),
            level,
            doenet_ml_range: position.map(DoenetMlRange::from),
            span: position.map(|position| position.start.offset..position.end.offset),
        }
    }

    pub fn error(message: impl Into<String>, position: Option<Position>) -> Self {
        Self::new(message, LEVEL_VALIDATION, position)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorWarnings {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl ErrorWarnings {
    pub fn error(&mut self, message: impl Into<String>, position: Option<Position>) {
        self.push_error(Diagnostic::error(message, position));
    }

    pub fn push_error(&mut self, diagnostic: Diagnostic) {
        log::warn!("error: {}", diagnostic.message);
        self.errors.push(diagnostic);
    }

    pub fn warning(&mut self, message: impl Into<String>, level: u8, position: Option<Position>) {
        let diagnostic = Diagnostic::new(message, level, position);
        log::warn!("warning (level {level}): {}", diagnostic.message);
        self.warnings.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    /// Renders every diagnostic against `source`, errors first.
    pub fn render(&self, filename: &str, source: &str) -> Vec<String> {
        let errors = self
            .errors
            .iter()
            .map(|diagnostic| render_report(diagnostic, ReportKind::Error, filename, source));
        let warnings = self
            .warnings
            .iter()
            .map(|diagnostic| render_report(diagnostic, ReportKind::Warning, filename, source));
        errors.chain(warnings).collect()
    }
}

pub fn render_report(
    diagnostic: &Diagnostic,
    kind: ReportKind<'_>,
    filename: &str,
    source: &str,
) -> String {
    let span = diagnostic
        .span
        .clone()
        .map(|span| span.start.min(source.len())..span.end.min(source.len()))
        .unwrap_or(0..0);
    let mut report_bytes = Vec::new();
    let written = Report::build(kind, (filename, span.clone()))
        .with_config(Config::default().with_color(false))
        .with_message(&diagnostic.message)
        .with_label(Label::new((filename, span)).with_message(format!("level {}", diagnostic.level)))
        .finish()
        .write((filename, Source::from(source)), &mut report_bytes);
    match written {
        Ok(()) => String::from_utf8_lossy(&report_bytes).into_owned(),
        Err(_) => diagnostic.message.clone(),
    }
}
