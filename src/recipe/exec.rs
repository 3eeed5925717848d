//! Running one recipe over one source tree.

use std::sync::Arc;

use super::Recipe;
use crate::diagnostics::Diagnostic;
use crate::matcher::{find_matches, MatchOutcome, MatchScope};
use crate::syntax::{Marker, SourceTree};
use crate::types::TypeTable;
use crate::visitor::{apply_side_effects, walk, FileInfo, Mutation, TreeVisitor, VisitContext};

/// What one recipe (and, for a composite, its members) did to a file.
#[derive(Debug, Clone, Default)]
pub struct RecipeRun {
    pub mutations: Vec<Mutation>,
    pub diagnostics: Vec<Diagnostic>,
    /// Recipes that changed the text, in the order they first did.
    pub touched: Vec<String>,
}

impl RecipeRun {
    pub fn changed(&self) -> bool {
        !self.touched.is_empty()
    }
}

/// Runs `recipe` on `tree`, leaving the result in `tree`. Every step that
/// changes the text leaves the tree respanned, so the mutation spans of a
/// step refer to the text the step started from.
pub fn run_recipe(recipe: &dyn Recipe, tree: &mut SourceTree, file: &FileInfo, table: &TypeTable) -> RecipeRun {
    let mut run = RecipeRun::default();
    execute(recipe, tree, file, table, &mut run);
    run
}

fn execute(recipe: &dyn Recipe, tree: &mut SourceTree, file: &FileInfo, table: &TypeTable, run: &mut RecipeRun) {
    if !recipe.applicable(tree.kind()) {
        return;
    }
    let span = tracing::debug_span!("recipe", name = recipe.name());
    let _enter = span.enter();
    if !preconditions_hold(recipe, tree, table, run) {
        return;
    }

    for member in recipe.recipe_list() {
        execute(member.as_ref(), tree, file, table, run);
    }

    let name: Arc<str> = recipe.name().into();
    for (index, rule) in recipe.rules().iter().enumerate() {
        let report = {
            let scope = MatchScope::new(tree.root(), tree.kind(), table);
            find_matches(tree.root(), rule.pattern(), &scope)
        };
        for ambiguity in report.ambiguities {
            tracing::debug!(node = %ambiguity.id, reason = %ambiguity.reason, "ambiguous match");
            run.diagnostics
                .push(Diagnostic::ambiguity(recipe.name(), ambiguity.span, ambiguity.reason));
        }
        if report.matches.is_empty() {
            continue;
        }
        tracing::debug!(rule = index, matches = report.matches.len(), "rule matched");
        for found in report.matches {
            tree.markers_mut().add(
                found.id,
                Marker::Matched {
                    recipe: name.clone(),
                    rule: index,
                    bindings: found.bindings,
                },
            );
        }
        step(&name, tree, file, table, rule.visitor(index), run);
        tree.markers_mut().clear_matches(&name);
    }

    for factory in recipe.visitors() {
        step(&name, tree, file, table, factory(), run);
    }
}

fn preconditions_hold(recipe: &dyn Recipe, tree: &SourceTree, table: &TypeTable, run: &mut RecipeRun) -> bool {
    if recipe.preconditions().is_empty() {
        return true;
    }
    let scope = MatchScope::new(tree.root(), tree.kind(), table);
    for precondition in recipe.preconditions() {
        match precondition.evaluate(tree.root(), &scope, None) {
            MatchOutcome::Matched(_) => {}
            MatchOutcome::NoMatch => {
                tracing::trace!("precondition does not hold");
                return false;
            }
            MatchOutcome::Ambiguous(reason) => {
                run.diagnostics.push(Diagnostic::precondition(recipe.name(), reason));
                return false;
            }
        }
    }
    true
}

/// One walk plus its side effects.
fn step(
    name: &Arc<str>,
    tree: &mut SourceTree,
    file: &FileInfo,
    table: &TypeTable,
    mut visitor: Box<dyn TreeVisitor>,
    run: &mut RecipeRun,
) {
    let before = tree.root().clone();
    let (after, mutations, diagnostics) = {
        let mut ctx = VisitContext::new(name.clone(), file, &before, table, tree.markers_mut());
        let root = walk(before.clone(), visitor.as_mut(), &mut ctx);
        let root = apply_side_effects(root, &mut ctx);
        let (mutations, diagnostics) = ctx.into_parts();
        (root, mutations, diagnostics)
    };
    run.diagnostics.extend(diagnostics);

    if after.print() == before.print() {
        tree.set_root(after);
        return;
    }
    tracing::debug!(mutations = mutations.len(), "recipe changed the file");
    run.mutations.extend(mutations);
    if !run.touched.iter().any(|t| t.as_str() == name.as_ref()) {
        run.touched.push(name.to_string());
    }
    tree.set_root(after.respan());
}
