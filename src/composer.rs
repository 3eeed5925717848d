//! The recipe composer: runs an ordered catalog over a set of files.
//!
//! A run has two phases. First every input is parsed in parallel and the
//! declared types of all Java files are added to the [`TypeTable`], so a
//! file can resolve names declared in its siblings. Then each file is driven
//! to a fixed point on its own worker: every pass attributes the tree and
//! runs the whole catalog in declaration order, and the loop stops after the
//! first pass that changes nothing.
//!
//! Files never share mutable state. The catalog and the type table are
//! read-only during the second phase, and each worker owns its tree and
//! markers. Results come back in input order regardless of scheduling.
//!
//! ```rust
//! use recast::composer::{Composer, SourceInput};
//! use recast::recipe::Catalog;
//! use recast::recipes::{builtin_registry, spring};
//!
//! let catalog = Catalog::from_names(builtin_registry(), &[spring::SPRING_BOOT_TO_QUARKUS]).unwrap();
//! let result = Composer::new(catalog).run(vec![SourceInput::new("A.java", "class A {}\n")]);
//! assert!(result.files[0].outcome.is_unchanged());
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;

use crate::diagnostics::Diagnostic;
use crate::recipe::{run_recipe, Catalog};
use crate::syntax::{Marker, SourceTree, Span};
use crate::types::{attribute, TypeTable};
use crate::visitor::{FileInfo, Mutation};
use crate::RecastError;

pub const DEFAULT_MAX_ITERATIONS: usize = 5;

// ============================================================================
// INPUTS AND OPTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposerOptions {
    /// Cap on full catalog passes per file.
    pub max_iterations: usize,
    /// Worker threads; the global rayon pool when `None`.
    pub threads: Option<usize>,
}

impl Default for ComposerOptions {
    fn default() -> Self {
        ComposerOptions {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            threads: None,
        }
    }
}

/// One file handed to the composer.
#[derive(Debug, Clone)]
pub struct SourceInput {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

impl SourceInput {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        SourceInput {
            path: path.into(),
            bytes: text.into().into_bytes(),
        }
    }

    pub fn from_bytes(path: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        SourceInput {
            path: path.into(),
            bytes,
        }
    }

    /// Reads a file from disk.
    pub fn read(path: impl Into<PathBuf>) -> Result<Self, RecastError> {
        let path = path.into();
        let bytes = std::fs::read(&path).map_err(|e| RecastError::io(path.display().to_string(), e))?;
        Ok(SourceInput { path, bytes })
    }
}

/// Shared flag for aborting a run. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ============================================================================
// RESULTS
// ============================================================================

/// The new state of a changed file.
#[derive(Debug, Clone)]
pub struct ChangedFile {
    pub before: String,
    pub after: String,
}

#[derive(Debug)]
pub enum FileOutcome {
    /// The printed output equals the input byte for byte.
    Unchanged,
    Changed(ChangedFile),
    /// The file could not be parsed; no recipe ran on it.
    ParseError(RecastError),
    /// The run was cancelled before this file finished; nothing is emitted.
    Cancelled,
}

impl FileOutcome {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, FileOutcome::Unchanged)
    }

    pub fn changed(&self) -> Option<&ChangedFile> {
        match self {
            FileOutcome::Changed(file) => Some(file),
            _ => None,
        }
    }
}

/// A search result left by a search-only recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub recipe: String,
    pub span: Span,
    pub description: Option<String>,
}

#[derive(Debug)]
pub struct FileResult {
    pub path: PathBuf,
    pub outcome: FileOutcome,
    /// Recipes that changed this file, in the order they first did.
    pub recipes: Vec<String>,
    /// Every attributed edit, pass by pass. Spans refer to the text the
    /// editing recipe started from.
    pub mutations: Vec<Mutation>,
    pub diagnostics: Vec<Diagnostic>,
    pub search_hits: Vec<SearchHit>,
    /// Catalog passes that ran.
    pub passes: usize,
}

impl FileResult {
    fn new(path: PathBuf, outcome: FileOutcome) -> Self {
        FileResult {
            path,
            outcome,
            recipes: Vec::new(),
            mutations: Vec::new(),
            diagnostics: Vec::new(),
            search_hits: Vec::new(),
            passes: 0,
        }
    }
}

#[derive(Debug, Default)]
pub struct PipelineResult {
    pub files: Vec<FileResult>,
}

impl PipelineResult {
    pub fn changed(&self) -> impl Iterator<Item = (&FileResult, &ChangedFile)> {
        self.files
            .iter()
            .filter_map(|f| f.outcome.changed().map(|changed| (f, changed)))
    }

    pub fn parse_errors(&self) -> impl Iterator<Item = (&Path, &RecastError)> {
        self.files.iter().filter_map(|f| match &f.outcome {
            FileOutcome::ParseError(e) => Some((f.path.as_path(), e)),
            _ => None,
        })
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = (&Path, &Diagnostic)> {
        self.files
            .iter()
            .flat_map(|f| f.diagnostics.iter().map(move |d| (f.path.as_path(), d)))
    }

    pub fn was_cancelled(&self) -> bool {
        self.files.iter().any(|f| matches!(f.outcome, FileOutcome::Cancelled))
    }
}

// ============================================================================
// COMPOSER
// ============================================================================

enum Parsed {
    Tree(SourceTree, String),
    Failed(PathBuf, RecastError),
    Cancelled(PathBuf),
}

pub struct Composer {
    catalog: Catalog,
    options: ComposerOptions,
    classpath: TypeTable,
}

impl Composer {
    pub fn new(catalog: Catalog) -> Self {
        Composer {
            catalog,
            options: ComposerOptions::default(),
            classpath: TypeTable::new(),
        }
    }

    pub fn with_options(mut self, options: ComposerOptions) -> Self {
        self.options = options;
        self
    }

    /// Types known from outside the inputs, e.g. the project's dependencies.
    pub fn with_classpath(mut self, classpath: TypeTable) -> Self {
        self.classpath = classpath;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn options(&self) -> &ComposerOptions {
        &self.options
    }

    pub fn run(&self, inputs: Vec<SourceInput>) -> PipelineResult {
        self.run_with_cancellation(inputs, &CancellationToken::new())
    }

    pub fn run_with_cancellation(&self, inputs: Vec<SourceInput>, token: &CancellationToken) -> PipelineResult {
        let Some(threads) = self.options.threads else {
            return self.execute(inputs, token);
        };
        match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => pool.install(|| self.execute(inputs, token)),
            Err(e) => {
                tracing::warn!(threads, error = %e, "could not build worker pool, using the global one");
                self.execute(inputs, token)
            }
        }
    }

    fn execute(&self, inputs: Vec<SourceInput>, token: &CancellationToken) -> PipelineResult {
        tracing::info!(files = inputs.len(), recipes = self.catalog.len(), "starting run");

        let parsed: Vec<Parsed> = inputs
            .into_par_iter()
            .map(|input| {
                if token.is_cancelled() {
                    return Parsed::Cancelled(input.path);
                }
                match SourceTree::from_bytes(&input.bytes, input.path.clone()) {
                    Ok(tree) => {
                        let original = tree.print();
                        Parsed::Tree(tree, original)
                    }
                    Err(e) => {
                        tracing::warn!(path = %input.path.display(), error = %e, "skipping file that does not parse");
                        Parsed::Failed(input.path, e)
                    }
                }
            })
            .collect();

        let mut table = self.classpath.clone();
        for entry in &parsed {
            if let Parsed::Tree(tree, _) = entry {
                table.add_declared(tree.root());
            }
        }

        let files = parsed
            .into_par_iter()
            .map(|entry| match entry {
                Parsed::Tree(tree, original) => self.process(tree, original, &table, token),
                Parsed::Failed(path, e) => FileResult::new(path, FileOutcome::ParseError(e)),
                Parsed::Cancelled(path) => FileResult::new(path, FileOutcome::Cancelled),
            })
            .collect();
        PipelineResult { files }
    }

    /// Drives one file to a fixed point.
    fn process(&self, mut tree: SourceTree, original: String, table: &TypeTable, token: &CancellationToken) -> FileResult {
        let path = tree.path().to_path_buf();
        let span = tracing::info_span!("file", path = %path.display());
        let _guard = span.enter();

        let mut result = FileResult::new(path.clone(), FileOutcome::Unchanged);
        let mut seen = HashSet::new();
        seen.insert(tree.fingerprint());
        let mut settled = false;

        for pass in 1..=self.options.max_iterations {
            if token.is_cancelled() {
                tracing::debug!(pass, "cancelled, discarding partial state");
                return FileResult::new(path, FileOutcome::Cancelled);
            }
            result.passes = pass;
            let root = attribute(tree.root().clone(), table);
            tree.set_root(root);
            let file = FileInfo::of(path.clone(), tree.kind(), tree.root(), tree.line_ending());

            let mut changed = false;
            for recipe in self.catalog.recipes() {
                let run = run_recipe(recipe.as_ref(), &mut tree, &file, table);
                let recipe_changed = run.changed();
                for diagnostic in run.diagnostics {
                    if !result.diagnostics.iter().any(|d| d.same_finding(&diagnostic)) {
                        result.diagnostics.push(diagnostic);
                    }
                }
                if !recipe_changed {
                    continue;
                }
                changed = true;
                result.mutations.extend(run.mutations);
                for name in run.touched {
                    if !result.recipes.contains(&name) {
                        result.recipes.push(name);
                    }
                }
            }
            tree.collect_garbage_markers();

            if !changed {
                settled = true;
                break;
            }
            if !seen.insert(tree.fingerprint()) {
                result.diagnostics.push(Diagnostic::non_convergence(format!(
                    "pass {} reproduced an earlier state; the recipes oscillate",
                    pass
                )));
                settled = true;
                break;
            }
            tracing::debug!(pass, "pass changed the file");
        }
        if !settled {
            result.diagnostics.push(Diagnostic::non_convergence(format!(
                "still changing after {} passes",
                self.options.max_iterations
            )));
        }

        for diagnostic in &result.diagnostics {
            diagnostic.log(&path);
        }
        result.search_hits = search_hits(&tree);

        let after = tree.print();
        result.outcome = if after == original {
            FileOutcome::Unchanged
        } else {
            FileOutcome::Changed(ChangedFile { before: original, after })
        };
        result
    }
}

fn search_hits(tree: &SourceTree) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = tree
        .markers()
        .search_results()
        .into_iter()
        .filter_map(|(id, marker)| {
            let node = tree.root().find_by_id(id)?;
            match marker {
                Marker::SearchResult { recipe, description } => Some(SearchHit {
                    recipe: recipe.to_string(),
                    span: node.span(),
                    description: description.clone(),
                }),
                _ => None,
            }
        })
        .collect();
    hits.sort_by_key(|hit| (hit.span.start, hit.span.end));
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;
    use crate::matcher::Pattern;
    use crate::recipe::{Recipe, RecipeBuilder};
    use crate::syntax::{SourceKind, SyntaxKind, SyntaxNode};
    use crate::visitor::{factory, Visit, VisitContext};

    /// Appends `x` to the value of `k`; never settles.
    fn grow() -> Arc<dyn Recipe> {
        RecipeBuilder::new("test.Grow")
            .description("grows a value")
            .applies_to(SourceKind::Properties)
            .rule(Pattern::config_key("k", None).expect("pattern"), |node, bindings, _| {
                let value = format!("{}x", bindings.text("value").unwrap_or_default());
                Visit::Replace(crate::recipes::properties::set_value(node, &value))
            })
            .build()
            .into_arc()
    }

    /// Flips the value of `k` between `a` and `b`.
    fn flip() -> Arc<dyn Recipe> {
        RecipeBuilder::new("test.Flip")
            .description("flips a value")
            .applies_to(SourceKind::Properties)
            .rule(Pattern::config_key("k", None).expect("pattern"), |node, bindings, _| {
                let next = if bindings.text("value") == Some("a") { "b" } else { "a" };
                Visit::Replace(crate::recipes::properties::set_value(node, next))
            })
            .build()
            .into_arc()
    }

    /// Requests `import <fqn>;` on every pass.
    fn importer(name: &'static str, fqn: &'static str) -> Arc<dyn Recipe> {
        RecipeBuilder::new(name)
            .description("adds an import")
            .applies_to(SourceKind::Java)
            .visitor(factory(move |node: &SyntaxNode, ctx: &mut VisitContext<'_>| {
                if node.kind() == SyntaxKind::CompilationUnit {
                    ctx.add_import(fqn);
                }
                Visit::Keep
            }))
            .build()
            .into_arc()
    }

    #[test]
    fn competing_generated_imports_settle_on_the_later_recipe() {
        let composer = Composer::new(Catalog::new(vec![
            importer("test.First", "a.Foo"),
            importer("test.Second", "b.Foo"),
        ]));
        let result = composer.run(vec![SourceInput::new("X.java", "class X {}\n")]);
        let file = &result.files[0];
        let after = file.outcome.changed().map(|c| c.after.clone()).unwrap_or_default();
        assert!(after.contains("import b.Foo;"), "{}", after);
        assert!(!after.contains("a.Foo"), "{}", after);
        assert_eq!(file.passes, 2);
        assert!(file.diagnostics.iter().all(|d| d.kind != DiagnosticKind::NonConvergence));
        assert!(file.diagnostics.iter().any(|d| d.kind == DiagnosticKind::TransformConflict
            && d.message.contains("replacing generated import a.Foo with b.Foo")));
        assert!(file.diagnostics.iter().any(|d| d.kind == DiagnosticKind::TransformConflict
            && d.recipe.as_deref() == Some("test.First")
            && d.message.contains("not importing a.Foo")));
    }

    #[test]
    fn the_same_finding_is_reported_once_across_passes() {
        // `test.Shift` lengthens the first line after `test.Report` has seen
        // `z`, so pass 2 reports it again one byte further on.
        let shift = RecipeBuilder::new("test.Shift")
            .description("lengthens k once")
            .applies_to(SourceKind::Properties)
            .rule(Pattern::config_key("k", None).expect("pattern"), |node, bindings, _| {
                match bindings.text("value") {
                    Some("v") => Visit::Replace(crate::recipes::properties::set_value(node, "vv")),
                    _ => Visit::Keep,
                }
            })
            .build()
            .into_arc();
        let report = RecipeBuilder::new("test.Report")
            .description("reports every entry")
            .applies_to(SourceKind::Properties)
            .rule(Pattern::config_key("z", None).expect("pattern"), |node, _, ctx| {
                ctx.report(Diagnostic::ambiguity("test.Report", node.span(), "cannot tell"));
                Visit::Keep
            })
            .build()
            .into_arc();
        let composer = Composer::new(Catalog::new(vec![report, shift]));
        let result = composer.run(vec![SourceInput::new("a.properties", "k=v\nz=1\n")]);
        let file = &result.files[0];
        assert_eq!(file.passes, 2);
        let reported = file.diagnostics.iter().filter(|d| d.message == "cannot tell").count();
        assert_eq!(reported, 1);
    }

    #[test]
    fn runaway_recipes_stop_at_the_cap() {
        let composer = Composer::new(Catalog::new(vec![grow()])).with_options(ComposerOptions {
            max_iterations: 3,
            threads: None,
        });
        let result = composer.run(vec![SourceInput::new("a.properties", "k=v\n")]);
        let file = &result.files[0];
        assert_eq!(file.passes, 3);
        assert_eq!(file.outcome.changed().map(|c| c.after.as_str()), Some("k=vxxx\n"));
        assert!(file.diagnostics.iter().any(|d| d.kind == DiagnosticKind::NonConvergence));
    }

    #[test]
    fn oscillation_is_detected_by_fingerprint() {
        let composer = Composer::new(Catalog::new(vec![flip()]));
        let result = composer.run(vec![SourceInput::new("a.properties", "k=a\n")]);
        let file = &result.files[0];
        assert_eq!(file.passes, 2);
        assert!(file
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::NonConvergence && d.message.contains("oscillate")));
    }

    #[test]
    fn results_keep_input_order_and_isolate_parse_errors() {
        let composer = Composer::new(Catalog::new(vec![grow()])).with_options(ComposerOptions {
            max_iterations: 1,
            threads: Some(2),
        });
        let result = composer.run(vec![
            SourceInput::new("b.properties", "k=1\n"),
            SourceInput::from_bytes("bad.properties", vec![0xff, 0xfe]),
            SourceInput::new("a.properties", "other=1\n"),
        ]);
        let paths: Vec<_> = result.files.iter().map(|f| f.path.display().to_string()).collect();
        assert_eq!(paths, vec!["b.properties", "bad.properties", "a.properties"]);
        assert!(result.files[0].outcome.changed().is_some());
        assert!(matches!(result.files[1].outcome, FileOutcome::ParseError(_)));
        assert!(result.files[2].outcome.is_unchanged());
        assert_eq!(result.parse_errors().count(), 1);
    }

    #[test]
    fn a_cancelled_run_emits_nothing() {
        let token = CancellationToken::new();
        token.cancel();
        let composer = Composer::new(Catalog::new(vec![grow()]));
        let result = composer.run_with_cancellation(vec![SourceInput::new("a.properties", "k=v\n")], &token);
        assert!(result.was_cancelled());
        assert_eq!(result.changed().count(), 0);
    }

    #[test]
    fn declared_types_of_siblings_are_visible() {
        let catalog = Catalog::new(vec![RecipeBuilder::new("test.FindMarker")
            .description("finds a sibling annotation")
            .applies_to(SourceKind::Java)
            .rule(Pattern::annotation("p.Marker"), |node, _, ctx| {
                ctx.search_result(node, None);
                Visit::Keep
            })
            .build()
            .into_arc()]);
        let result = Composer::new(catalog).run(vec![
            SourceInput::new("p/Marker.java", "package p;\n\npublic @interface Marker {}\n"),
            SourceInput::new("p/User.java", "package p;\n\n@Marker\nclass User {}\n"),
        ]);
        let user = &result.files[1];
        assert!(user.outcome.is_unchanged());
        assert_eq!(user.search_hits.len(), 1);
        assert_eq!(user.search_hits[0].recipe, "test.FindMarker");
    }
}
