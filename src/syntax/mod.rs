//! Lossless syntax trees for Java and `.properties` sources.
//!
//! Parsing produces a [`SourceTree`] whose printed form is identical to the
//! input. Everything downstream (matching, visiting, diffing) works on these
//! trees; no step ever reformats text it did not explicitly change.

pub mod ast;
mod kind;
mod lexer;
mod markers;
mod node;
pub mod java;
pub mod properties;
mod source;
pub mod trivia;

pub use kind::SyntaxKind;
pub use markers::{Marker, Markers};
pub use node::{Descendants, NodeId, Span, SyntaxNode};
pub use source::{SourceKind, SourceTree};
pub use trivia::LineEnding;
