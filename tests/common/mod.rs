//! Shared helpers for the integration tests: build a catalog, run the
//! composer over in-memory sources, and compare before/after pairs.

#![allow(dead_code)]

use recast::composer::{Composer, ComposerOptions, FileResult, PipelineResult, SourceInput};
use recast::config::EngineConfig;
use recast::recipe::Catalog;
use recast::recipes::builtin_registry;

/// A catalog of built-in recipes that take no options.
pub fn catalog(names: &[&str]) -> Catalog {
    Catalog::from_names(builtin_registry(), names).expect("known recipes")
}

/// A catalog from a `recast.yml` snippet, for recipes with options.
pub fn catalog_from_yaml(yaml: &str) -> Catalog {
    let config = EngineConfig::parse(yaml, "recast.yml").expect("valid configuration");
    let registry = config.registry(builtin_registry()).expect("registry");
    config.catalog(&registry, &[]).expect("catalog")
}

/// Runs `catalog` over in-memory files.
pub fn rewrite_run(catalog: Catalog, files: &[(&str, &str)]) -> PipelineResult {
    rewrite_run_with(catalog, ComposerOptions::default(), files)
}

pub fn rewrite_run_with(catalog: Catalog, options: ComposerOptions, files: &[(&str, &str)]) -> PipelineResult {
    let inputs = files.iter().map(|(path, text)| SourceInput::new(*path, *text)).collect();
    Composer::new(catalog).with_options(options).run(inputs)
}

/// The text of a file after the run: the new text if it changed.
pub fn after_text<'a>(file: &'a FileResult, before: &'a str) -> &'a str {
    match file.outcome.changed() {
        Some(changed) => &changed.after,
        None => before,
    }
}

/// Asserts that one run turns `before` into `after` and that a second run
/// over `after` changes nothing.
pub fn assert_rewrite(catalog: Catalog, path: &str, before: &str, after: &str) {
    let first = rewrite_run(catalog.clone(), &[(path, before)]);
    let file = &first.files[0];
    assert_eq!(after_text(file, before), after);

    let second = rewrite_run(catalog, &[(path, after)]);
    assert!(
        second.files[0].outcome.is_unchanged(),
        "second run changed {}:\n{:?}",
        path,
        second.files[0].outcome
    );
}
