//! Non-fatal per-file diagnostics.
//!
//! Fatal problems (a file that cannot be parsed, a bad configuration) are
//! [`crate::RecastError`]s. Everything else that a run wants to tell the user
//! about one file is a [`Diagnostic`]: it is collected on the file's result,
//! logged through `tracing`, and never stops the run.

use std::fmt;

use miette::{LabeledSpan, NamedSource, SourceCode};
use serde::Serialize;

use crate::syntax::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// A pattern could not be decided statically; the node was left alone.
    MatchAmbiguity,
    /// A recipe precondition could not be evaluated; the recipe was skipped.
    PreconditionUnresolved,
    /// Two edits disagreed; the later one in declaration order was kept.
    TransformConflict,
    /// The fixed-point loop hit its cap or revisited an earlier state.
    NonConvergence,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::MatchAmbiguity => "match-ambiguity",
            DiagnosticKind::PreconditionUnresolved => "precondition-unresolved",
            DiagnosticKind::TransformConflict => "transform-conflict",
            DiagnosticKind::NonConvergence => "non-convergence",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub recipe: Option<String>,
    pub span: Option<Span>,
    pub message: String,
}

impl Diagnostic {
    fn new(kind: DiagnosticKind, recipe: Option<&str>, span: Option<Span>, message: String) -> Self {
        Diagnostic {
            kind,
            severity: Severity::Warning,
            recipe: recipe.map(str::to_string),
            span,
            message,
        }
    }

    pub fn ambiguity(recipe: &str, span: Span, reason: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::MatchAmbiguity, Some(recipe), Some(span), reason.into())
            .with_severity(Severity::Info)
    }

    pub fn precondition(recipe: &str, reason: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::PreconditionUnresolved, Some(recipe), None, reason.into())
    }

    pub fn conflict(recipe: Option<&str>, span: Option<Span>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::TransformConflict, recipe, span, message.into())
    }

    pub fn non_convergence(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::NonConvergence, None, None, message.into())
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// True when both report the same finding, wherever it sits. Spans move
    /// between passes as earlier edits shift the text.
    pub fn same_finding(&self, other: &Diagnostic) -> bool {
        self.kind == other.kind && self.recipe == other.recipe && self.message == other.message
    }

    /// Emits the diagnostic as a `tracing` event.
    pub fn log(&self, path: &std::path::Path) {
        let recipe = self.recipe.as_deref().unwrap_or("-");
        match self.severity {
            Severity::Warning => tracing::warn!(
                path = %path.display(),
                kind = %self.kind,
                recipe,
                "{}",
                self.message
            ),
            Severity::Info => tracing::info!(
                path = %path.display(),
                kind = %self.kind,
                recipe,
                "{}",
                self.message
            ),
        }
    }

    /// Pairs the diagnostic with the file it belongs to, for rendering
    /// through `miette`.
    pub fn report(&self, path: &str, source: &str) -> DiagnosticReport {
        DiagnosticReport {
            diagnostic: self.clone(),
            source: NamedSource::new(path, source.to_string()),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(recipe) = &self.recipe {
            write!(f, " [{}]", recipe)?;
        }
        if let Some(span) = self.span {
            write!(f, " at {}", span)?;
        }
        write!(f, ": {}", self.message)
    }
}

// ============================================================================
// RENDERING
// ============================================================================

/// A [`Diagnostic`] with the source text it points into.
#[derive(Debug)]
pub struct DiagnosticReport {
    diagnostic: Diagnostic,
    source: NamedSource<String>,
}

impl fmt::Display for DiagnosticReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.diagnostic.message)
    }
}

impl std::error::Error for DiagnosticReport {}

impl miette::Diagnostic for DiagnosticReport {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(format!("recast::{}", self.diagnostic.kind)))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(match self.diagnostic.severity {
            Severity::Info => miette::Severity::Advice,
            Severity::Warning => miette::Severity::Warning,
        })
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diagnostic
            .recipe
            .as_ref()
            .map(|r| Box::new(format!("reported by recipe {}", r)) as Box<dyn fmt::Display>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.diagnostic.span.map(|_| &self.source as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let span = self.diagnostic.span?;
        let label = LabeledSpan::new(
            Some(self.diagnostic.kind.to_string()),
            span.start,
            span.len().max(1),
        );
        Some(Box::new(std::iter::once(label)))
    }
}

/// 1-based line and column of a byte offset.
pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let column = before.rfind('\n').map_or(offset, |nl| offset - nl - 1) + 1;
    (line, column)
}
