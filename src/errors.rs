//! Recast error handling.
//!
//! Every fatal failure the engine can produce is a [`RecastError`]. Fatal here
//! means "fatal for the unit of work that raised it": a parse error excludes a
//! single file from a run, it never aborts the other files. Non-fatal findings
//! (ambiguous matches, conflicts, non-convergence) are not errors at all and
//! live in [`crate::diagnostics`].
//!
//! # Error Construction Macros
//!
//! - **Use `err_msg!` for message-only errors.**
//!   - `err_msg!(Config, "unknown recipe '{}'", name)`
//!
//! - **Use `err_src!` when a source file and span are at hand.**
//!   - `err_src!(Parse, "expected ';'", &source, span)`
//!   - `err_src!(Parse, "expected ';'", &source, span, "add a semicolon")`
//!
//! Do not build [`ErrorContext`] by hand unless neither macro fits.

use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceCode};
use thiserror::Error;

use crate::syntax::Span;

pub type SourceArc = Arc<NamedSource<String>>;

/// Type-safe error classification matching the [`RecastError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// Source text could not be turned into a source tree
    Parse,
    /// Reading or writing a file failed
    Io,
    /// Invalid configuration or declarative recipe file
    Config,
    /// Unknown recipe, bad recipe options, duplicate registration
    Recipe,
    /// Engine invariant violated
    Internal,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Parse => "parse",
            ErrorType::Io => "io",
            ErrorType::Config => "config",
            ErrorType::Recipe => "recipe",
            ErrorType::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Minimal error context for diagnostics.
#[derive(Debug, Default)]
pub struct ErrorContext {
    /// The source file this error points into (if any).
    pub source: Option<SourceArc>,
    /// The byte span inside `source` (if any).
    pub span: Option<Span>,
    /// An optional help message.
    pub help: Option<String>,
}

impl ErrorContext {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_source_and_span(source: SourceArc, span: Span) -> Self {
        Self {
            source: Some(source),
            span: Some(span),
            help: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

/// Unified error type for every fatal failure mode of the engine.
#[derive(Debug, Error)]
pub enum RecastError {
    #[error("Parse error: {message}")]
    Parse { message: String, ctx: ErrorContext },
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Configuration error: {message}")]
    Config { message: String, ctx: ErrorContext },
    #[error("Recipe error: {message}")]
    Recipe { message: String, ctx: ErrorContext },
    #[error("Internal error: {message}")]
    Internal { message: String, ctx: ErrorContext },
}

impl RecastError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        RecastError::Io {
            path: path.into(),
            source,
        }
    }

    fn ctx(&self) -> Option<&ErrorContext> {
        match self {
            RecastError::Parse { ctx, .. }
            | RecastError::Config { ctx, .. }
            | RecastError::Recipe { ctx, .. }
            | RecastError::Internal { ctx, .. } => Some(ctx),
            RecastError::Io { .. } => None,
        }
    }

    /// Returns the type-safe classification for this error.
    pub fn error_type(&self) -> ErrorType {
        match self {
            RecastError::Parse { .. } => ErrorType::Parse,
            RecastError::Io { .. } => ErrorType::Io,
            RecastError::Config { .. } => ErrorType::Config,
            RecastError::Recipe { .. } => ErrorType::Recipe,
            RecastError::Internal { .. } => ErrorType::Internal,
        }
    }

    /// The primary span of the error, if it points into a source file.
    pub fn span(&self) -> Option<Span> {
        self.ctx().and_then(|ctx| ctx.span)
    }

    /// The bare message without the variant prefix.
    pub fn message(&self) -> String {
        match self {
            RecastError::Parse { message, .. }
            | RecastError::Config { message, .. }
            | RecastError::Recipe { message, .. }
            | RecastError::Internal { message, .. } => message.clone(),
            RecastError::Io { source, .. } => source.to_string(),
        }
    }
}

impl Diagnostic for RecastError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        Some(Box::new(format!("recast::{}", self.error_type())))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.ctx()?
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn std::fmt::Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.ctx()?
            .source
            .as_ref()
            .map(|s| s.as_ref() as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let ctx = self.ctx()?;
        ctx.source.as_ref()?;
        let span = ctx.span?;
        let len = span.len().max(1);
        let label = LabeledSpan::new(Some(self.message()), span.start, len);
        Some(Box::new(std::iter::once(label)))
    }
}

/// Converts a file name and text into an `Arc<NamedSource<String>>`.
pub fn to_error_source(name: impl AsRef<str>, source: impl AsRef<str>) -> SourceArc {
    Arc::new(NamedSource::new(name.as_ref(), source.as_ref().to_string()))
}

/// Constructs a `RecastError` variant with a formatted message and no context.
#[macro_export]
macro_rules! err_msg {
    ($variant:ident, $($arg:tt)+) => {
        $crate::RecastError::$variant {
            message: format!($($arg)+),
            ctx: $crate::errors::ErrorContext::none(),
        }
    };
}

/// Constructs a `RecastError` variant pointing at a span of a pre-built source.
#[macro_export]
macro_rules! err_src {
    // Message, source, span, help
    ($variant:ident, $msg:expr, $source:expr, $span:expr, $help:expr) => {
        $crate::RecastError::$variant {
            message: $msg.to_string(),
            ctx: $crate::errors::ErrorContext::with_source_and_span(
                std::sync::Arc::clone($source),
                $span,
            )
            .with_help($help),
        }
    };
    // Message, source, span
    ($variant:ident, $msg:expr, $source:expr, $span:expr) => {
        $crate::RecastError::$variant {
            message: $msg.to_string(),
            ctx: $crate::errors::ErrorContext::with_source_and_span(
                std::sync::Arc::clone($source),
                $span,
            ),
        }
    };
}
