//! Built-in recipes.
//!
//! Generic building blocks live in [`java`], [`search`] and [`properties`];
//! they take options and are registered as factories. The Spring to Quarkus
//! migration in [`spring`] is assembled from ready-made recipes and the
//! composite `recast.spring.SpringBootToQuarkus`.
//!
//! The process-wide registry is built once on first use and is read-only
//! afterwards:
//!
//! ```rust
//! let registry = recast::recipes::builtin_registry();
//! assert!(registry.contains("recast.spring.SpringBootToQuarkus"));
//! assert!(registry.contains("recast.java.ChangeAnnotationType"));
//! ```

use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;

use crate::recipe::{Recipe, RecipeFactory, RecipeRegistry};
use crate::{err_msg, RecastError};

pub mod java;
pub mod properties;
pub mod search;
pub mod spring;

static BUILTIN: Lazy<RecipeRegistry> = Lazy::new(|| {
    let mut registry = RecipeRegistry::new();
    register_builtins(&mut registry);
    registry
});

/// The registry holding every built-in recipe.
pub fn builtin_registry() -> &'static RecipeRegistry {
    &BUILTIN
}

/// Adds every built-in recipe to `registry`.
pub fn register_builtins(registry: &mut RecipeRegistry) {
    java::register(registry);
    search::register(registry);
    properties::register(registry);
    spring::register(registry);
}

/// Deserializes the options of `recipe` into its options struct.
pub(crate) fn options<T: DeserializeOwned>(recipe: &str, value: Option<&serde_yaml::Value>) -> Result<T, RecastError> {
    let value = value.cloned().unwrap_or(serde_yaml::Value::Null);
    serde_yaml::from_value(value).map_err(|e| err_msg!(Config, "invalid options for {}: {}", recipe, e))
}

/// A factory that parses options of type `T` and hands them to `build`.
pub(crate) fn factory<T, F>(name: &'static str, build: F) -> RecipeFactory
where
    T: DeserializeOwned,
    F: Fn(T) -> Result<Arc<dyn Recipe>, RecastError> + Send + Sync + 'static,
{
    Arc::new(move |value| build(options(name, value)?))
}

/// Runs `recipe` once over `text` the way the composer runs one pass:
/// attribute, then execute. Returns the new text and the run record.
#[cfg(test)]
pub(crate) fn rewrite(recipe: &dyn Recipe, path: &str, text: &str) -> (String, crate::recipe::RecipeRun) {
    use crate::syntax::SourceTree;
    use crate::types::{attribute, TypeTable};
    use crate::visitor::FileInfo;

    let mut tree = SourceTree::parse(text, path).expect("test source parses");
    let mut table = TypeTable::new();
    table.add_declared(tree.root());
    let root = attribute(tree.root().clone(), &table);
    tree.set_root(root);
    let file = FileInfo::of(path, tree.kind(), tree.root(), tree.line_ending());
    let run = crate::recipe::run_recipe(recipe, &mut tree, &file, &table);
    (tree.print(), run)
}

/// [`rewrite`], then asserts a second run changes nothing.
#[cfg(test)]
pub(crate) fn rewrite_idempotent(recipe: &dyn Recipe, path: &str, text: &str) -> String {
    let (once, _) = rewrite(recipe, path, text);
    let (twice, run) = rewrite(recipe, path, &once);
    assert_eq!(twice, once, "second run changed the output");
    assert!(!run.changed());
    once
}
