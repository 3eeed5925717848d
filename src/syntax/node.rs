//! The uniform lossless syntax node.
//!
//! A tree is made of two node shapes: tokens, which own their text and the
//! whitespace/comments in front of it, and composites, which own an ordered
//! child list. Concatenating every token's leading trivia and text in order
//! reproduces the source byte for byte, so printing an unmodified tree is the
//! identity.
//!
//! Nodes are immutable values with cheap clones; children live behind an
//! `Arc` and copy-on-write is done with [`Arc::make_mut`]. Each node carries a
//! process-unique [`NodeId`] that survives edits to its descendants, which is
//! what markers and the visit-once guard key on.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::SyntaxKind;

// ============================================================================
// IDENTITY AND SPANS
// ============================================================================

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a node across edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    pub fn fresh() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Byte range of a node in the text it was parsed from.
///
/// Synthesized nodes get an empty span at the position they were inserted,
/// or `Span::default()` when they have never been part of a parsed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn at(offset: usize) -> Self {
        Self::new(offset, offset)
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn overlaps(&self, other: Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Smallest span covering both.
    pub fn cover(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

// ============================================================================
// SYNTAX NODE
// ============================================================================

#[derive(Debug, Clone)]
enum NodeData {
    Token { leading: Arc<str>, text: Arc<str> },
    Composite { children: Arc<Vec<SyntaxNode>> },
}

/// A token or composite node of the lossless tree.
///
/// Equality (`==`) is formatting-exact: two nodes are equal when they have
/// the same kind, the same shape and print to the same text. Ids, spans and
/// attributed types are ignored. Use [`SyntaxNode::same_node`] for identity
/// and [`SyntaxNode::structurally_eq`] to also ignore trivia.
#[derive(Debug, Clone)]
pub struct SyntaxNode {
    id: NodeId,
    kind: SyntaxKind,
    span: Span,
    ty: Option<Arc<str>>,
    data: NodeData,
}

impl SyntaxNode {
    // ------------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------------

    pub fn token(kind: SyntaxKind, text: impl Into<Arc<str>>) -> Self {
        Self::token_with_trivia(kind, "", text)
    }

    pub fn token_with_trivia(
        kind: SyntaxKind,
        leading: impl Into<Arc<str>>,
        text: impl Into<Arc<str>>,
    ) -> Self {
        SyntaxNode {
            id: NodeId::fresh(),
            kind,
            span: Span::default(),
            ty: None,
            data: NodeData::Token {
                leading: leading.into(),
                text: text.into(),
            },
        }
    }

    pub fn composite(kind: SyntaxKind, children: impl IntoIterator<Item = SyntaxNode>) -> Self {
        SyntaxNode {
            id: NodeId::fresh(),
            kind,
            span: Span::default(),
            ty: None,
            data: NodeData::Composite {
                children: Arc::new(children.into_iter().collect()),
            },
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn with_ty(mut self, ty: impl Into<Arc<str>>) -> Self {
        self.ty = Some(ty.into());
        self
    }

    pub fn without_ty(mut self) -> Self {
        self.ty = None;
        self
    }

    /// Same node (same id) with a new child list.
    pub fn with_children(mut self, children: Vec<SyntaxNode>) -> Self {
        if let NodeData::Composite { children: current } = &mut self.data {
            *current = Arc::new(children);
        }
        self
    }

    /// Same token (same id) with new text; trivia is kept.
    pub fn with_text(mut self, new_text: impl Into<Arc<str>>) -> Self {
        if let NodeData::Token { text, .. } = &mut self.data {
            *text = new_text.into();
        }
        self
    }

    /// Replaces the leading trivia of the first token of this subtree.
    /// Composites with no tokens are left alone.
    pub fn with_leading_trivia(mut self, trivia: impl Into<Arc<str>>) -> Self {
        self.set_leading_trivia(trivia.into());
        self
    }

    fn set_leading_trivia(&mut self, trivia: Arc<str>) -> bool {
        match &mut self.data {
            NodeData::Token { leading, .. } => {
                *leading = trivia;
                true
            }
            NodeData::Composite { children } => {
                let children = Arc::make_mut(children);
                for child in children.iter_mut() {
                    if child.first_token().is_some() {
                        return child.set_leading_trivia(trivia);
                    }
                }
                false
            }
        }
    }

    /// Recomputes every span from the printed text, as if the tree had just
    /// been parsed from `self.print()`. Ids, types and markers survive.
    pub fn respan(self) -> Self {
        self.respan_from(0).0
    }

    fn respan_from(mut self, offset: usize) -> (Self, usize) {
        match &mut self.data {
            NodeData::Token { leading, text } => {
                let start = offset + leading.len();
                let end = start + text.len();
                self.span = Span::new(start, end);
                (self, end)
            }
            NodeData::Composite { children } => {
                let mut cursor = offset;
                let mut respanned = Vec::with_capacity(children.len());
                for child in children.iter().cloned() {
                    let (child, end) = child.respan_from(cursor);
                    cursor = end;
                    respanned.push(child);
                }
                self.span = match (respanned.first(), respanned.last()) {
                    (Some(first), Some(last)) => Span::new(first.span.start, last.span.end),
                    _ => Span::at(offset),
                };
                *children = Arc::new(respanned);
                (self, cursor)
            }
        }
    }

    /// Deep copy with fresh ids everywhere. Used when the same template output
    /// is inserted in more than one place.
    pub fn with_fresh_ids(self) -> Self {
        let SyntaxNode {
            kind,
            span,
            ty,
            data,
            ..
        } = self;
        let data = match data {
            NodeData::Token { .. } => data,
            NodeData::Composite { children } => NodeData::Composite {
                children: Arc::new(
                    children
                        .iter()
                        .cloned()
                        .map(SyntaxNode::with_fresh_ids)
                        .collect(),
                ),
            },
        };
        SyntaxNode {
            id: NodeId::fresh(),
            kind,
            span,
            ty,
            data,
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> SyntaxKind {
        self.kind
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// Fully qualified type attributed to this node, if any.
    pub fn ty(&self) -> Option<&str> {
        self.ty.as_deref()
    }

    pub fn is_token(&self) -> bool {
        matches!(self.data, NodeData::Token { .. })
    }

    pub fn token_text(&self) -> Option<&str> {
        match &self.data {
            NodeData::Token { text, .. } => Some(text),
            NodeData::Composite { .. } => None,
        }
    }

    /// Leading trivia of this token. Composites report the trivia of their
    /// first token.
    pub fn leading_trivia(&self) -> &str {
        match &self.data {
            NodeData::Token { leading, .. } => leading,
            NodeData::Composite { .. } => self.first_token().map_or("", |t| t.leading_trivia()),
        }
    }

    pub fn children(&self) -> &[SyntaxNode] {
        match &self.data {
            NodeData::Token { .. } => &[],
            NodeData::Composite { children } => children.as_slice(),
        }
    }

    /// Mutable child list of a composite; `None` for tokens.
    pub fn children_mut(&mut self) -> Option<&mut Vec<SyntaxNode>> {
        match &mut self.data {
            NodeData::Token { .. } => None,
            NodeData::Composite { children } => Some(Arc::make_mut(children)),
        }
    }

    pub fn child(&self, kind: SyntaxKind) -> Option<&SyntaxNode> {
        self.children().iter().find(|c| c.kind == kind)
    }

    pub fn child_index(&self, kind: SyntaxKind) -> Option<usize> {
        self.children().iter().position(|c| c.kind == kind)
    }

    pub fn children_of(&self, kind: SyntaxKind) -> impl Iterator<Item = &SyntaxNode> + '_ {
        self.children().iter().filter(move |c| c.kind == kind)
    }

    /// True when a direct child token has exactly this text.
    pub fn has_token(&self, text: &str) -> bool {
        self.children()
            .iter()
            .any(|c| c.token_text() == Some(text))
    }

    pub fn first_token(&self) -> Option<&SyntaxNode> {
        match &self.data {
            NodeData::Token { .. } => Some(self),
            NodeData::Composite { children } => children.iter().find_map(|c| c.first_token()),
        }
    }

    pub fn last_token(&self) -> Option<&SyntaxNode> {
        match &self.data {
            NodeData::Token { .. } => Some(self),
            NodeData::Composite { children } => children.iter().rev().find_map(|c| c.last_token()),
        }
    }

    /// Pre-order traversal including `self`.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    pub fn tokens(&self) -> impl Iterator<Item = &SyntaxNode> + '_ {
        self.descendants().filter(|n| n.is_token())
    }

    pub fn find_by_id(&self, id: NodeId) -> Option<&SyntaxNode> {
        self.descendants().find(|n| n.id == id)
    }

    pub fn contains_id(&self, id: NodeId) -> bool {
        self.find_by_id(id).is_some()
    }

    // ------------------------------------------------------------------------
    // Printing
    // ------------------------------------------------------------------------

    /// Exact source text of this subtree, including the leading trivia of
    /// its first token.
    pub fn print(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }

    pub fn write_to(&self, out: &mut String) {
        match &self.data {
            NodeData::Token { leading, text } => {
                out.push_str(leading);
                out.push_str(text);
            }
            NodeData::Composite { children } => {
                for child in children.iter() {
                    child.write_to(out);
                }
            }
        }
    }

    /// Source text without the leading trivia of the first token.
    pub fn text(&self) -> String {
        let printed = self.print();
        let leading = self.leading_trivia().len();
        printed[leading..].to_string()
    }

    /// Token texts concatenated with all trivia dropped. Used for names:
    /// `java . util . List` reads as `java.util.List`.
    pub fn significant_text(&self) -> String {
        self.tokens().filter_map(|t| t.token_text()).collect()
    }

    // ------------------------------------------------------------------------
    // Comparison
    // ------------------------------------------------------------------------

    pub fn same_node(&self, other: &SyntaxNode) -> bool {
        self.id == other.id
    }

    /// Equality that ignores trivia, ids, spans and types.
    pub fn structurally_eq(&self, other: &SyntaxNode) -> bool {
        if self.kind != other.kind {
            return false;
        }
        match (&self.data, &other.data) {
            (NodeData::Token { text: a, .. }, NodeData::Token { text: b, .. }) => a == b,
            (NodeData::Composite { children: a }, NodeData::Composite { children: b }) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.structurally_eq(y))
            }
            _ => false,
        }
    }
}

impl PartialEq for SyntaxNode {
    fn eq(&self, other: &Self) -> bool {
        if self.kind != other.kind {
            return false;
        }
        match (&self.data, &other.data) {
            (
                NodeData::Token {
                    leading: la,
                    text: ta,
                },
                NodeData::Token {
                    leading: lb,
                    text: tb,
                },
            ) => la == lb && ta == tb,
            (NodeData::Composite { children: a }, NodeData::Composite { children: b }) => {
                Arc::ptr_eq(a, b) || a.as_slice() == b.as_slice()
            }
            _ => false,
        }
    }
}

impl Eq for SyntaxNode {}

impl fmt::Display for SyntaxNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.print())
    }
}

/// Pre-order iterator over a subtree.
pub struct Descendants<'a> {
    stack: Vec<&'a SyntaxNode>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a SyntaxNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(leading: &str, text: &str) -> SyntaxNode {
        SyntaxNode::token_with_trivia(SyntaxKind::Ident, leading, text)
    }

    fn sample() -> SyntaxNode {
        SyntaxNode::composite(
            SyntaxKind::Expr,
            vec![
                SyntaxNode::composite(SyntaxKind::Modifiers, Vec::new()),
                ident("  ", "a"),
                SyntaxNode::token_with_trivia(SyntaxKind::Punct, " ", "+"),
                ident(" /* b */ ", "b"),
            ],
        )
    }

    #[test]
    fn print_concatenates_trivia_and_text() {
        assert_eq!(sample().print(), "  a + /* b */ b");
        assert_eq!(sample().text(), "a + /* b */ b");
        assert_eq!(sample().significant_text(), "a+b");
    }

    #[test]
    fn leading_trivia_skips_empty_composites() {
        let node = sample().with_leading_trivia("\n");
        assert_eq!(node.print(), "\na + /* b */ b");
        assert_eq!(node.leading_trivia(), "\n");
    }

    #[test]
    fn equality_is_formatting_exact() {
        let a = sample();
        let b = sample();
        assert_ne!(a.id(), b.id());
        assert_eq!(a, b);
        let reformatted = b.with_leading_trivia("");
        assert_ne!(a, reformatted);
        assert!(a.structurally_eq(&reformatted));
    }

    #[test]
    fn with_children_keeps_identity() {
        let node = sample();
        let id = node.id();
        let edited = node.with_children(vec![ident("", "c")]);
        assert_eq!(edited.id(), id);
        assert_eq!(edited.print(), "c");
    }

    #[test]
    fn descendants_are_pre_order() {
        let kinds: Vec<_> = sample().descendants().map(|n| n.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                SyntaxKind::Expr,
                SyntaxKind::Modifiers,
                SyntaxKind::Ident,
                SyntaxKind::Punct,
                SyntaxKind::Ident
            ]
        );
    }

    #[test]
    fn fresh_ids_copy_is_equal_but_distinct() {
        let node = sample();
        let copy = node.clone().with_fresh_ids();
        assert_eq!(node, copy);
        assert!(!node.same_node(&copy));
        assert!(!node.contains_id(copy.children()[1].id()));
    }

    #[test]
    fn respan_follows_printed_text() {
        let node = sample().respan();
        let text = node.print();
        let b = &node.children()[3];
        assert_eq!(&text[b.span().start..b.span().end], "b");
        assert_eq!(node.span(), Span::new(0, text.len()));
        assert_eq!(node.children()[0].span(), Span::at(0));
    }
}
