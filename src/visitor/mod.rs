//! Tree-walking transforms.
//!
//! A [`TreeVisitor`] sees every node of a tree twice, on the way down
//! ([`TreeVisitor::pre_visit`]) and on the way up ([`TreeVisitor::post_visit`]),
//! and may keep, replace or remove it. The walker rebuilds only the spine
//! above changed nodes; untouched subtrees are shared with the input.
//!
//! A visitor never reaches outside the node it was handed. Edits elsewhere in
//! the file (imports, follow-up passes) are requested through the
//! [`VisitContext`] and applied once after the walk by [`side_effects`].

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::diagnostics::Diagnostic;
use crate::matcher::{Bindings, MatchScope};
use crate::syntax::{LineEnding, Marker, Markers, NodeId, SourceKind, Span, SyntaxKind, SyntaxNode};
use crate::types::TypeTable;

pub mod edit;
pub mod side_effects;
pub mod template;

pub use side_effects::{apply_side_effects, SideEffect, SideEffects};
pub use template::{Indentation, Template};

// ============================================================================
// VISITOR CONTRACT
// ============================================================================

/// What a hook decided about the node it was shown.
#[derive(Debug, Clone)]
pub enum Visit {
    Keep,
    Replace(SyntaxNode),
    Remove,
}

pub trait TreeVisitor {
    fn pre_visit(&mut self, _node: &SyntaxNode, _ctx: &mut VisitContext<'_>) -> Visit {
        Visit::Keep
    }

    fn post_visit(&mut self, _node: &SyntaxNode, _ctx: &mut VisitContext<'_>) -> Visit {
        Visit::Keep
    }
}

/// Builds a fresh visitor for one execution. Recipes hold factories, never
/// visitor instances, so no state leaks between files or runs.
pub type VisitorFactory = Arc<dyn Fn() -> Box<dyn TreeVisitor> + Send + Sync>;

/// A visitor made of a single post-order closure.
pub struct PostOrder<F>(F);

impl<F> TreeVisitor for PostOrder<F>
where
    F: FnMut(&SyntaxNode, &mut VisitContext<'_>) -> Visit,
{
    fn post_visit(&mut self, node: &SyntaxNode, ctx: &mut VisitContext<'_>) -> Visit {
        (self.0)(node, ctx)
    }
}

pub fn post_order<F>(f: F) -> PostOrder<F>
where
    F: FnMut(&SyntaxNode, &mut VisitContext<'_>) -> Visit,
{
    PostOrder(f)
}

/// Wraps a cloneable post-order closure into a [`VisitorFactory`].
pub fn factory<F>(f: F) -> VisitorFactory
where
    F: Fn(&SyntaxNode, &mut VisitContext<'_>) -> Visit + Clone + Send + Sync + 'static,
{
    Arc::new(move || Box::new(post_order(f.clone())) as Box<dyn TreeVisitor>)
}

// ============================================================================
// MUTATIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    Replaced,
    Removed,
    Inserted,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MutationKind::Replaced => "replaced",
            MutationKind::Removed => "removed",
            MutationKind::Inserted => "inserted",
        };
        f.write_str(s)
    }
}

/// One attributed edit. `span` is the byte range of the affected node in the
/// text the recipe started from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mutation {
    pub recipe: String,
    pub span: Span,
    pub kind: MutationKind,
    pub node_kind: SyntaxKind,
}

// ============================================================================
// CONTEXT
// ============================================================================

/// Per-file facts a visitor may need to lay out new code.
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub path: PathBuf,
    pub kind: SourceKind,
    pub line_ending: LineEnding,
    pub indent: Indentation,
}

impl FileInfo {
    pub fn of(path: impl Into<PathBuf>, kind: SourceKind, root: &SyntaxNode, line_ending: LineEnding) -> Self {
        FileInfo {
            path: path.into(),
            kind,
            line_ending,
            indent: Indentation::detect(root),
        }
    }
}

/// State of one visitor execution over one file.
pub struct VisitContext<'a> {
    recipe: Arc<str>,
    file: &'a FileInfo,
    table: &'a TypeTable,
    scope: MatchScope<'a>,
    markers: &'a mut Markers,
    ancestors: Vec<SyntaxNode>,
    visited: HashSet<NodeId>,
    mutations: Vec<Mutation>,
    effects: SideEffects,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> VisitContext<'a> {
    pub fn new(
        recipe: Arc<str>,
        file: &'a FileInfo,
        root: &SyntaxNode,
        table: &'a TypeTable,
        markers: &'a mut Markers,
    ) -> Self {
        VisitContext {
            recipe,
            file,
            table,
            scope: MatchScope::new(root, file.kind, table),
            markers,
            ancestors: Vec::new(),
            visited: HashSet::new(),
            mutations: Vec::new(),
            effects: SideEffects::default(),
            diagnostics: Vec::new(),
        }
    }

    pub fn recipe(&self) -> &str {
        &self.recipe
    }

    pub fn file(&self) -> &FileInfo {
        self.file
    }

    pub fn table(&self) -> &'a TypeTable {
        self.table
    }

    pub fn scope(&self) -> &MatchScope<'a> {
        &self.scope
    }

    pub fn markers(&self) -> &Markers {
        self.markers
    }

    // ------------------------------------------------------------------------
    // Cursor
    // ------------------------------------------------------------------------

    /// Ancestors of the node being visited, outermost first.
    pub fn ancestors(&self) -> &[SyntaxNode] {
        &self.ancestors
    }

    pub fn parent(&self) -> Option<&SyntaxNode> {
        self.ancestors.last()
    }

    /// Nearest ancestor of the given kind.
    pub fn enclosing(&self, kind: SyntaxKind) -> Option<&SyntaxNode> {
        self.ancestors.iter().rev().find(|n| n.kind() == kind)
    }

    /// Bindings the matcher phase of `rule` left on `node`.
    pub fn matched(&self, rule: usize, node: &SyntaxNode) -> Option<&Bindings> {
        self.markers.matched(&self.recipe, rule, node.id())
    }

    // ------------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------------

    pub fn add_import(&mut self, fqn: impl Into<String>) {
        self.effects.push(SideEffect::AddImport {
            fqn: fqn.into(),
            only_if_referenced: false,
        });
    }

    /// Adds the import only if the finished file refers to the type.
    pub fn add_import_if_referenced(&mut self, fqn: impl Into<String>) {
        self.effects.push(SideEffect::AddImport {
            fqn: fqn.into(),
            only_if_referenced: true,
        });
    }

    /// Removes the import once the file no longer refers to the type.
    pub fn maybe_remove_import(&mut self, fqn: impl Into<String>) {
        self.effects.push(SideEffect::RemoveImport { fqn: fqn.into() });
    }

    /// Runs another visitor once after this walk, keyed for deduplication.
    pub fn after_visit(&mut self, key: impl Into<String>, factory: VisitorFactory) {
        self.effects.push(SideEffect::AfterVisit {
            key: key.into(),
            factory,
        });
    }

    /// Requests the imports a template was written against.
    pub fn add_template_imports(&mut self, template: &Template) {
        for fqn in template.imports() {
            self.add_import(fqn.clone());
        }
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn search_result(&mut self, node: &SyntaxNode, description: Option<String>) {
        let recipe = self.recipe.clone();
        self.markers
            .add(node.id(), Marker::SearchResult { recipe, description });
    }

    pub fn mark_generated(&mut self, node: &SyntaxNode) {
        let recipe = self.recipe.clone();
        self.markers.add(node.id(), Marker::Generated { recipe });
    }

    /// Records on `unit` that the generated import of `fqn` was replaced.
    pub fn mark_displaced(&mut self, unit: &SyntaxNode, fqn: &str) {
        let recipe = self.recipe.clone();
        self.markers.add(
            unit.id(),
            Marker::Displaced {
                recipe,
                fqn: fqn.into(),
            },
        );
    }

    pub(crate) fn record(&mut self, span: Span, kind: MutationKind, node_kind: SyntaxKind) {
        self.mutations.push(Mutation {
            recipe: self.recipe.to_string(),
            span,
            kind,
            node_kind,
        });
    }

    pub(crate) fn take_effects(&mut self) -> SideEffects {
        std::mem::take(&mut self.effects)
    }

    /// Starts a nested walk with a fresh visit-once guard.
    pub(crate) fn reset_cursor(&mut self) {
        self.ancestors.clear();
        self.visited.clear();
    }

    pub(crate) fn rescope(&mut self, root: &SyntaxNode) {
        self.scope = MatchScope::new(root, self.file.kind, self.table);
    }

    pub fn into_parts(self) -> (Vec<Mutation>, Vec<Diagnostic>) {
        (self.mutations, self.diagnostics)
    }
}

// ============================================================================
// WALKING
// ============================================================================

/// Walks `root` depth-first with `visitor`. The root itself cannot be
/// removed; a `Remove` on it is ignored.
pub fn walk(root: SyntaxNode, visitor: &mut dyn TreeVisitor, ctx: &mut VisitContext<'_>) -> SyntaxNode {
    match walk_node(root.clone(), visitor, ctx) {
        Some(node) => node,
        None => {
            tracing::warn!(recipe = %ctx.recipe(), "ignoring removal of the root node");
            root
        }
    }
}

fn walk_node(node: SyntaxNode, visitor: &mut dyn TreeVisitor, ctx: &mut VisitContext<'_>) -> Option<SyntaxNode> {
    if !ctx.visited.insert(node.id()) {
        return Some(node);
    }

    let mut current = match visitor.pre_visit(&node, ctx) {
        Visit::Keep => node,
        Visit::Replace(new) => {
            ctx.visited.insert(new.id());
            replaced(ctx, &node, new)
        }
        Visit::Remove => {
            ctx.record(node.span(), MutationKind::Removed, node.kind());
            return None;
        }
    };

    if !current.is_token() {
        ctx.ancestors.push(current.clone());
        let mut changed = false;
        let mut children = Vec::with_capacity(current.children().len());
        for child in current.children().iter().cloned() {
            match walk_node(child.clone(), visitor, ctx) {
                Some(new) => {
                    changed |= !unchanged(&child, &new);
                    children.push(new);
                }
                None => changed = true,
            }
        }
        ctx.ancestors.pop();
        if changed {
            current = current.with_children(children);
        }
    }

    match visitor.post_visit(&current, ctx) {
        Visit::Keep => Some(current),
        Visit::Replace(new) => {
            ctx.visited.insert(new.id());
            Some(replaced(ctx, &current, new))
        }
        Visit::Remove => {
            ctx.record(current.span(), MutationKind::Removed, current.kind());
            None
        }
    }
}

fn replaced(ctx: &mut VisitContext<'_>, old: &SyntaxNode, new: SyntaxNode) -> SyntaxNode {
    if old.print() != new.print() {
        ctx.record(old.span(), MutationKind::Replaced, old.kind());
        let recipe = ctx.recipe.clone();
        ctx.markers.add(new.id(), Marker::Applied { recipe });
    }
    new
}

fn unchanged(before: &SyntaxNode, after: &SyntaxNode) -> bool {
    before.same_node(after) && before.ty() == after.ty() && before == after
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::SourceTree;

    struct Renamer;

    impl TreeVisitor for Renamer {
        fn post_visit(&mut self, node: &SyntaxNode, _ctx: &mut VisitContext<'_>) -> Visit {
            match node.token_text() {
                Some("foo") if node.kind() == SyntaxKind::Ident => {
                    Visit::Replace(node.clone().with_text("bar"))
                }
                _ => Visit::Keep,
            }
        }
    }

    fn run(text: &str, visitor: &mut dyn TreeVisitor) -> (String, Vec<Mutation>) {
        let tree = SourceTree::parse(text, "A.java").expect("parses");
        let file = FileInfo::of("A.java", tree.kind(), tree.root(), tree.line_ending());
        let table = TypeTable::new();
        let mut markers = Markers::new();
        let mut ctx = VisitContext::new("test".into(), &file, tree.root(), &table, &mut markers);
        let root = walk(tree.root().clone(), visitor, &mut ctx);
        let (mutations, _) = ctx.into_parts();
        (root.print(), mutations)
    }

    #[test]
    fn replacement_keeps_formatting_elsewhere() {
        let text = "class A {\n    void foo() {}   // keep\n    int x;\n}\n";
        let (out, mutations) = run(text, &mut Renamer);
        assert_eq!(out, "class A {\n    void bar() {}   // keep\n    int x;\n}\n");
        assert_eq!(mutations.len(), 1);
        assert_eq!(mutations[0].kind, MutationKind::Replaced);
        assert_eq!(&text[mutations[0].span.start..mutations[0].span.end], "foo");
    }

    #[test]
    fn keep_everywhere_is_the_identity() {
        struct Nothing;
        impl TreeVisitor for Nothing {}
        let text = "/* c */ class A { int x = 1 ; }";
        let (out, mutations) = run(text, &mut Nothing);
        assert_eq!(out, text);
        assert!(mutations.is_empty());
    }

    #[test]
    fn removal_drops_the_node() {
        let mut remove_fields = post_order(|node: &SyntaxNode, _: &mut VisitContext<'_>| {
            if node.kind() == SyntaxKind::FieldDecl {
                Visit::Remove
            } else {
                Visit::Keep
            }
        });
        let (out, mutations) = run("class A { int x; void f() {} }", &mut remove_fields);
        assert_eq!(out, "class A { void f() {} }");
        assert_eq!(mutations[0].kind, MutationKind::Removed);
    }

    #[test]
    fn replacements_are_not_revisited() {
        struct Wrapper(usize);
        impl TreeVisitor for Wrapper {
            fn pre_visit(&mut self, node: &SyntaxNode, _ctx: &mut VisitContext<'_>) -> Visit {
                if node.kind() != SyntaxKind::Block {
                    return Visit::Keep;
                }
                self.0 += 1;
                // The replacement contains the original block again.
                let fresh = SyntaxNode::composite(SyntaxKind::Block, node.children().to_vec());
                Visit::Replace(fresh)
            }
        }
        let mut visitor = Wrapper(0);
        let text = "class A { void f() { } }";
        let (out, _) = run(text, &mut visitor);
        assert_eq!(out, text);
        assert_eq!(visitor.0, 1);
    }

    #[test]
    fn ancestors_are_visible() {
        let mut seen = Vec::new();
        let mut visitor = post_order(|node: &SyntaxNode, ctx: &mut VisitContext<'_>| {
            if node.kind() == SyntaxKind::FieldDecl {
                seen.push(ctx.enclosing(SyntaxKind::ClassDecl).is_some());
            }
            Visit::Keep
        });
        run("class A { int x; }", &mut visitor);
        drop(visitor);
        assert_eq!(seen, vec![true]);
    }
}
