//! Deferred, file-level edits requested by visitors.
//!
//! Visitors only touch the node they are shown. Anything else (adding or
//! dropping an import, running a clean-up pass over the whole file) is queued
//! on the [`VisitContext`] and applied here once the main walk is done, so
//! two visitors asking for the same import produce one import.

use std::collections::HashSet;
use std::fmt;

use super::edit::{insert_child, remove_child, replace_child};
use super::template::import_decl;
use super::{walk, MutationKind, VisitContext, VisitorFactory};
use crate::diagnostics::Diagnostic;
use crate::matcher::{MatchOutcome, MatchScope, Pattern};
use crate::syntax::ast::{package_of, simple_name, ImportDecl};
use crate::syntax::trivia::{has_blank_line, starts_line};
use crate::syntax::{SourceKind, Span, SyntaxKind, SyntaxNode};
use crate::types::{declared_types, NameScope};

/// Follow-up passes may request further passes; this bounds the chain.
const MAX_AFTER_VISIT_ROUNDS: usize = 16;

#[derive(Clone)]
pub enum SideEffect {
    AddImport { fqn: String, only_if_referenced: bool },
    RemoveImport { fqn: String },
    AfterVisit { key: String, factory: VisitorFactory },
}

impl SideEffect {
    /// Requests with equal keys are the same request.
    pub fn key(&self) -> String {
        match self {
            SideEffect::AddImport { fqn, .. } => format!("add-import:{}", fqn),
            SideEffect::RemoveImport { fqn } => format!("remove-import:{}", fqn),
            SideEffect::AfterVisit { key, .. } => format!("after-visit:{}", key),
        }
    }
}

impl fmt::Debug for SideEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SideEffect::AddImport {
                fqn,
                only_if_referenced,
            } => f
                .debug_struct("AddImport")
                .field("fqn", fqn)
                .field("only_if_referenced", only_if_referenced)
                .finish(),
            SideEffect::RemoveImport { fqn } => f.debug_struct("RemoveImport").field("fqn", fqn).finish(),
            SideEffect::AfterVisit { key, .. } => f.debug_struct("AfterVisit").field("key", key).finish(),
        }
    }
}

/// Queued requests in the order they were made, without duplicates.
#[derive(Debug, Clone, Default)]
pub struct SideEffects {
    effects: Vec<SideEffect>,
}

impl SideEffects {
    pub fn push(&mut self, effect: SideEffect) {
        let key = effect.key();
        match self.effects.iter_mut().find(|e| e.key() == key) {
            // An unconditional import request wins over a conditional one.
            Some(SideEffect::AddImport {
                only_if_referenced, ..
            }) => {
                if let SideEffect::AddImport {
                    only_if_referenced: false,
                    ..
                } = effect
                {
                    *only_if_referenced = false;
                }
            }
            Some(_) => {}
            None => self.effects.push(effect),
        }
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SideEffect> {
        self.effects.iter()
    }
}

impl IntoIterator for SideEffects {
    type Item = SideEffect;
    type IntoIter = std::vec::IntoIter<SideEffect>;

    fn into_iter(self) -> Self::IntoIter {
        self.effects.into_iter()
    }
}

// ============================================================================
// APPLICATION
// ============================================================================

/// Applies everything queued on `ctx` to `root`: follow-up passes first (each
/// key at most once), then import removals, then import additions.
pub fn apply_side_effects(root: SyntaxNode, ctx: &mut VisitContext<'_>) -> SyntaxNode {
    let mut root = root;
    let mut imports = Vec::new();
    let mut ran: HashSet<String> = HashSet::new();
    let mut rounds = 0;

    loop {
        let effects = ctx.take_effects();
        let mut passes = Vec::new();
        for effect in effects {
            match effect {
                SideEffect::AfterVisit { key, factory } => {
                    if ran.insert(key.clone()) {
                        passes.push((key, factory));
                    }
                }
                other => imports.push(other),
            }
        }
        if passes.is_empty() {
            break;
        }
        rounds += 1;
        if rounds > MAX_AFTER_VISIT_ROUNDS {
            let recipe = ctx.recipe().to_string();
            ctx.report(Diagnostic::non_convergence(format!(
                "recipe {} kept scheduling follow-up passes; stopped after {} rounds",
                recipe, MAX_AFTER_VISIT_ROUNDS
            )));
            break;
        }
        for (key, factory) in passes {
            tracing::trace!(recipe = %ctx.recipe(), key = %key, "running follow-up pass");
            ctx.reset_cursor();
            ctx.rescope(&root);
            let mut visitor = factory();
            root = walk(root, visitor.as_mut(), ctx);
        }
    }

    if imports.is_empty() {
        return root;
    }
    if ctx.file().kind != SourceKind::Java || root.kind() != SyntaxKind::CompilationUnit {
        tracing::debug!(recipe = %ctx.recipe(), "ignoring import requests for a non-Java file");
        return root;
    }
    let (adds, removes) = resolve_import_requests(imports, ctx);
    for fqn in removes {
        root = remove_import(root, &fqn, ctx);
    }
    for (fqn, only_if_referenced) in adds {
        root = add_import(root, &fqn, only_if_referenced, ctx);
    }
    root
}

/// Settles contradicting requests of one batch; the later request wins.
fn resolve_import_requests(requests: Vec<SideEffect>, ctx: &mut VisitContext<'_>) -> (Vec<(String, bool)>, Vec<String>) {
    let mut adds: Vec<(String, bool)> = Vec::new();
    let mut removes: Vec<String> = Vec::new();
    for request in requests {
        match request {
            SideEffect::AddImport {
                fqn,
                only_if_referenced,
            } => {
                if let Some(pos) = removes.iter().position(|r| *r == fqn) {
                    removes.remove(pos);
                    conflict(ctx, format!("import {} was both removed and added; keeping it", fqn));
                }
                if let Some(pos) = adds
                    .iter()
                    .position(|(other, _)| *other != fqn && simple_name(other) == simple_name(&fqn))
                {
                    let (other, _) = adds.remove(pos);
                    conflict(
                        ctx,
                        format!(
                            "imports {} and {} share the simple name {}; keeping {}",
                            other,
                            fqn,
                            simple_name(&fqn),
                            fqn
                        ),
                    );
                }
                adds.push((fqn, only_if_referenced));
            }
            SideEffect::RemoveImport { fqn } => {
                if let Some(pos) = adds.iter().position(|(other, _)| *other == fqn) {
                    adds.remove(pos);
                    conflict(ctx, format!("import {} was both added and removed; removing it", fqn));
                }
                removes.push(fqn);
            }
            SideEffect::AfterVisit { .. } => {}
        }
    }
    (adds, removes)
}

fn conflict(ctx: &mut VisitContext<'_>, message: String) {
    let recipe = ctx.recipe().to_string();
    ctx.report(Diagnostic::conflict(Some(&recipe), None, message));
}

fn is_referenced(root: &SyntaxNode, fqn: &str, ctx: &VisitContext<'_>) -> bool {
    let scope = MatchScope::new(root, SourceKind::Java, ctx.table());
    // An undecidable reference keeps the import.
    !matches!(
        Pattern::type_referenced(fqn).evaluate(root, &scope, None),
        MatchOutcome::NoMatch
    )
}

// ----------------------------------------------------------------------------
// Removing
// ----------------------------------------------------------------------------

fn remove_import(root: SyntaxNode, fqn: &str, ctx: &mut VisitContext<'_>) -> SyntaxNode {
    let Some(index) = root
        .children()
        .iter()
        .position(|child| ImportDecl::cast(child).is_some_and(|import| import.name() == fqn))
    else {
        return root;
    };
    if is_referenced(&root, fqn, ctx) {
        tracing::trace!(recipe = %ctx.recipe(), import = fqn, "import still in use");
        return root;
    }
    let span = root.children()[index].span();
    ctx.record(span, MutationKind::Removed, SyntaxKind::ImportDecl);
    remove_child(&root, index)
}

// ----------------------------------------------------------------------------
// Adding
// ----------------------------------------------------------------------------

fn add_import(root: SyntaxNode, fqn: &str, only_if_referenced: bool, ctx: &mut VisitContext<'_>) -> SyntaxNode {
    let names = NameScope::of(&root);
    let package = package_of(fqn);
    let simple = simple_name(fqn);
    if package.is_empty()
        || package == "java.lang"
        || Some(package) == names.package()
        || names.imports_exactly(fqn)
        || names.wildcards().iter().any(|w| w == package)
    {
        return root;
    }

    let recipe = ctx.recipe().to_string();
    if let Some(winner) = ctx.markers().displaced_by(root.id(), fqn) {
        let message = format!("not importing {}: it was replaced by a later request from {}", fqn, winner);
        ctx.report(Diagnostic::conflict(Some(&recipe), None, message));
        return root;
    }
    if declared_types(&root).iter().any(|(name, _)| name == simple) {
        ctx.report(Diagnostic::conflict(
            Some(&recipe),
            None,
            format!("not importing {}: the file declares a type named {}", fqn, simple),
        ));
        return root;
    }

    let mut root = root;
    let clash = root.children().iter().position(|child| {
        ImportDecl::cast(child)
            .is_some_and(|import| !import.is_static() && !import.is_wildcard() && import.simple_name() == simple)
    });
    if let Some(index) = clash {
        let existing = &root.children()[index];
        let existing_name = ImportDecl::cast(existing).map(|i| i.name()).unwrap_or_default();
        if !ctx.markers().is_generated(existing.id()) {
            ctx.report(Diagnostic::conflict(
                Some(&recipe),
                Some(existing.span()),
                format!("not importing {}: {} is already imported", fqn, existing_name),
            ));
            return root;
        }
        ctx.report(Diagnostic::conflict(
            Some(&recipe),
            Some(existing.span()),
            format!("replacing generated import {} with {}", existing_name, fqn),
        ));
        ctx.mark_displaced(&root, &existing_name);
        root = remove_child(&root, index);
    }

    let (candidate, anchor) = insert_import(&root, fqn, ctx.file().line_ending.as_str());
    if only_if_referenced && !is_referenced(&candidate, fqn, ctx) {
        return root;
    }
    if let Some(import) = candidate
        .children()
        .iter()
        .find(|c| c.kind() == SyntaxKind::ImportDecl && c.ty() == Some(fqn) && !root.contains_id(c.id()))
    {
        let import = import.clone();
        ctx.mark_generated(&import);
    }
    ctx.record(anchor, MutationKind::Inserted, SyntaxKind::ImportDecl);
    candidate
}

/// Inserts `import fqn;` in sorted position. Returns the new root and the
/// insertion point in the old text.
fn insert_import(root: &SyntaxNode, fqn: &str, newline: &str) -> (SyntaxNode, Span) {
    let import = import_decl(fqn);
    let key = (false, fqn.to_string());
    let children = root.children();
    let imports: Vec<usize> = children
        .iter()
        .enumerate()
        .filter(|(_, c)| c.kind() == SyntaxKind::ImportDecl)
        .map(|(i, _)| i)
        .collect();

    let before = imports.iter().copied().find(|&i| {
        ImportDecl::cast(&children[i]).is_some_and(|existing| (existing.is_static(), existing.name()) > key)
    });
    if let Some(index) = before {
        // Take the place (and spacing) of the import that sorts after it.
        let next = &children[index];
        let anchor = Span::at(next.span().start);
        let import = import.with_leading_trivia(next.leading_trivia());
        let moved = next.clone().with_leading_trivia(newline);
        let root = replace_child(root, index, moved);
        return (insert_child(&root, index, import), anchor);
    }
    if let Some(&last) = imports.last() {
        let anchor = Span::at(children[last].span().end);
        return (insert_child(root, last + 1, import.with_leading_trivia(newline)), anchor);
    }

    let blank = format!("{}{}", newline, newline);
    if let Some(package) = root.child_index(SyntaxKind::PackageDecl) {
        let anchor = Span::at(children[package].span().end);
        let mut root = insert_child(root, package + 1, import.with_leading_trivia(blank.as_str()));
        if let Some(next) = root.children().get(package + 2) {
            let trivia = next.leading_trivia().to_string();
            if !has_blank_line(&trivia) {
                let spaced = if starts_line(&trivia) {
                    format!("{}{}", newline, trivia)
                } else {
                    format!("{}{}", blank, trivia.trim_start())
                };
                let next = next.clone().with_leading_trivia(spaced);
                root = replace_child(&root, package + 2, next);
            }
        }
        return (root, anchor);
    }

    // No package and no imports: the import opens the file. A leading
    // javadoc stays with the declaration it documents.
    let first = &children[0];
    let anchor = Span::at(first.span().start);
    let trivia = first.leading_trivia();
    let (import_trivia, first_trivia) = if trivia.contains("/**") {
        (String::new(), format!("{}{}", blank, trivia.trim_start()))
    } else {
        (trivia.to_string(), blank)
    };
    let first = first.clone().with_leading_trivia(first_trivia);
    let root = replace_child(root, 0, first);
    (insert_child(&root, 0, import.with_leading_trivia(import_trivia)), anchor)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::syntax::{Markers, SourceTree};
    use crate::types::TypeTable;
    use crate::visitor::{factory, FileInfo, Visit};

    fn apply(text: &str, queue: impl FnOnce(&mut VisitContext<'_>)) -> (String, Vec<Diagnostic>) {
        let tree = SourceTree::parse(text, "A.java").expect("parses");
        let file = FileInfo::of("A.java", tree.kind(), tree.root(), tree.line_ending());
        let table = TypeTable::new();
        let mut markers = Markers::new();
        let mut ctx = VisitContext::new("test".into(), &file, tree.root(), &table, &mut markers);
        queue(&mut ctx);
        let root = apply_side_effects(tree.root().clone(), &mut ctx);
        let (_, diagnostics) = ctx.into_parts();
        (root.print(), diagnostics)
    }

    #[test]
    fn duplicate_requests_collapse() {
        let mut effects = SideEffects::default();
        effects.push(SideEffect::AddImport {
            fqn: "a.B".into(),
            only_if_referenced: true,
        });
        effects.push(SideEffect::AddImport {
            fqn: "a.B".into(),
            only_if_referenced: false,
        });
        effects.push(SideEffect::RemoveImport { fqn: "a.B".into() });
        assert_eq!(effects.len(), 2);
        assert!(matches!(
            effects.iter().next(),
            Some(SideEffect::AddImport {
                only_if_referenced: false,
                ..
            })
        ));
    }

    #[test]
    fn imports_are_inserted_in_order() {
        let text = "package p;\n\nimport a.A;\nimport c.C;\n\nclass X {}\n";
        let (out, _) = apply(text, |ctx| ctx.add_import("b.B"));
        assert_eq!(out, "package p;\n\nimport a.A;\nimport b.B;\nimport c.C;\n\nclass X {}\n");

        let (out, _) = apply("package p;\n\nimport b.B;\n\nclass X {}\n", |ctx| ctx.add_import("a.A"));
        assert_eq!(out, "package p;\n\nimport a.A;\nimport b.B;\n\nclass X {}\n");

        let (out, _) = apply(text, |ctx| ctx.add_import("d.D"));
        assert_eq!(out, "package p;\n\nimport a.A;\nimport c.C;\nimport d.D;\n\nclass X {}\n");
    }

    #[test]
    fn first_import_after_package_or_at_top() {
        let (out, _) = apply("package p;\nclass X {}\n", |ctx| ctx.add_import("a.A"));
        assert_eq!(out, "package p;\n\nimport a.A;\n\nclass X {}\n");

        let (out, _) = apply("class X {}\n", |ctx| ctx.add_import("a.A"));
        assert_eq!(out, "import a.A;\n\nclass X {}\n");

        let (out, _) = apply("/** Doc. */\nclass X {}\n", |ctx| ctx.add_import("a.A"));
        assert_eq!(out, "import a.A;\n\n/** Doc. */\nclass X {}\n");
    }

    #[test]
    fn needless_imports_are_skipped() {
        let text = "package p;\n\nimport a.A;\nimport b.*;\n\nclass X {}\n";
        for fqn in ["a.A", "b.B", "java.lang.String", "p.Sibling"] {
            let (out, _) = apply(text, |ctx| ctx.add_import(fqn));
            assert_eq!(out, text, "{}", fqn);
        }
    }

    #[test]
    fn clashing_simple_names_are_reported() {
        let text = "import javax.inject.Inject;\n\nclass X { @Inject Foo foo; }\n";
        let (out, diagnostics) = apply(text, |ctx| ctx.add_import("jakarta.inject.Inject"));
        assert_eq!(out, text);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, crate::diagnostics::DiagnosticKind::TransformConflict);
    }

    #[test]
    fn the_later_of_two_same_named_imports_wins() {
        let (out, diagnostics) = apply("class X {}\n", |ctx| {
            ctx.add_import("a.Foo");
            ctx.add_import("b.Foo");
        });
        assert_eq!(out, "import b.Foo;\n\nclass X {}\n");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, crate::diagnostics::DiagnosticKind::TransformConflict);
        assert!(diagnostics[0].message.contains("keeping b.Foo"));
    }

    #[test]
    fn an_add_after_a_remove_keeps_the_import() {
        let text = "import a.Foo;\n\nclass X {}\n";
        let (out, diagnostics) = apply(text, |ctx| {
            ctx.maybe_remove_import("a.Foo");
            ctx.add_import("a.Foo");
        });
        assert_eq!(out, text);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("both removed and added; keeping it"));
    }

    #[test]
    fn a_remove_after_an_add_drops_the_import() {
        let (out, diagnostics) = apply("class X {}\n", |ctx| {
            ctx.add_import("a.Foo");
            ctx.maybe_remove_import("a.Foo");
        });
        assert_eq!(out, "class X {}\n");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("both added and removed; removing it"));
    }

    #[test]
    fn unused_imports_are_removed_and_used_ones_kept() {
        let text = "import a.Used;\nimport a.Unused;\n\nclass X { Used u; }\n";
        let (out, _) = apply(text, |ctx| {
            ctx.maybe_remove_import("a.Used");
            ctx.maybe_remove_import("a.Unused");
        });
        assert_eq!(out, "import a.Used;\n\nclass X { Used u; }\n");
    }

    #[test]
    fn conditional_imports_need_a_reference() {
        let text = "class X { Foo f; }\n";
        let (out, _) = apply(text, |ctx| {
            ctx.add_import_if_referenced("a.Foo");
            ctx.add_import_if_referenced("a.Bar");
        });
        assert_eq!(out, "import a.Foo;\n\nclass X { Foo f; }\n");
    }

    #[test]
    fn follow_up_passes_run_once_per_key() {
        let counter = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let seen = counter.clone();
        let pass = factory(move |node: &SyntaxNode, _ctx: &mut VisitContext<'_>| {
            if node.kind() == SyntaxKind::CompilationUnit {
                seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }
            Visit::Keep
        });
        let (out, _) = apply("class X {}", |ctx| {
            ctx.after_visit("count", pass.clone());
            ctx.after_visit("count", pass.clone());
        });
        assert_eq!(out, "class X {}");
        assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
