//! Recipe registry and catalogs.
//!
//! The registry maps recipe names to recipes. Plain recipes are stored as
//! shared instances; parameterized recipes are stored as factories that
//! build an instance from options (taken from `recast.yml`).
//!
//! # Summary Table
//! | Method              | Overwrites | Error on Duplicate | Notes                         |
//! |---------------------|------------|--------------------|-------------------------------|
//! | register            | Yes        | No                 | Ready-made recipe             |
//! | register_or_error   | No         | Yes                | Ready-made recipe             |
//! | register_factory    | Yes        | No                 | Built from options on demand  |
//! | lookup / contains   | N/A        | N/A                | Case-sensitive                |
//! | instantiate         | N/A        | N/A                | Recipe or factory, by name    |
//!
//! A [`Catalog`] is the ordered, read-only list of recipes for one run. It is
//! built once and handed to the composer explicitly; nothing reads the
//! registry behind the composer's back.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::Recipe;
use crate::{err_msg, RecastError};

/// Builds a recipe from its options. `None` means no options were given.
pub type RecipeFactory =
    Arc<dyn Fn(Option<&serde_yaml::Value>) -> Result<Arc<dyn Recipe>, RecastError> + Send + Sync>;

#[derive(Clone)]
enum Entry {
    Recipe(Arc<dyn Recipe>),
    Factory { description: String, factory: RecipeFactory },
}

/// One line of `recast list-recipes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeInfo {
    pub name: String,
    pub description: String,
    /// True when the recipe needs options.
    pub parameterized: bool,
}

/// Recipes by name.
///
/// # Example
/// ```rust
/// use recast::recipe::{RecipeBuilder, RecipeRegistry};
/// let mut registry = RecipeRegistry::new();
/// registry.register(RecipeBuilder::new("demo.Noop").build().into_arc());
/// assert!(registry.contains("demo.Noop"));
/// assert!(registry
///     .register_or_error(RecipeBuilder::new("demo.Noop").build().into_arc())
///     .is_err());
/// ```
#[derive(Clone, Default)]
pub struct RecipeRegistry {
    entries: BTreeMap<String, Entry>,
}

impl RecipeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a ready-made recipe under its own name, replacing and
    /// returning any previous recipe of that name.
    pub fn register(&mut self, recipe: Arc<dyn Recipe>) -> Option<Arc<dyn Recipe>> {
        let previous = self
            .entries
            .insert(recipe.name().to_string(), Entry::Recipe(recipe));
        match previous {
            Some(Entry::Recipe(old)) => Some(old),
            _ => None,
        }
    }

    /// Registers a recipe, failing if the name is taken.
    pub fn register_or_error(&mut self, recipe: Arc<dyn Recipe>) -> Result<(), RecastError> {
        if self.entries.contains_key(recipe.name()) {
            return Err(err_msg!(Recipe, "recipe '{}' is already registered", recipe.name()));
        }
        self.entries
            .insert(recipe.name().to_string(), Entry::Recipe(recipe));
        Ok(())
    }

    /// Registers a parameterized recipe.
    pub fn register_factory(&mut self, name: &str, description: &str, factory: RecipeFactory) {
        self.entries.insert(
            name.to_string(),
            Entry::Factory {
                description: description.to_string(),
                factory,
            },
        );
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The ready-made recipe `name`. Factories are not instantiated here.
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Recipe>> {
        match self.entries.get(name)? {
            Entry::Recipe(recipe) => Some(recipe.clone()),
            Entry::Factory { .. } => None,
        }
    }

    /// The recipe `name`, built from `options` if it is parameterized.
    pub fn instantiate(&self, name: &str, options: Option<&serde_yaml::Value>) -> Result<Arc<dyn Recipe>, RecastError> {
        match self.entries.get(name) {
            Some(Entry::Recipe(recipe)) => {
                if options.is_some_and(|o| !o.is_null()) {
                    return Err(err_msg!(Recipe, "recipe '{}' takes no options", name));
                }
                Ok(recipe.clone())
            }
            Some(Entry::Factory { factory, .. }) => factory(options),
            None => Err(self.unknown(name)),
        }
    }

    fn unknown(&self, name: &str) -> RecastError {
        let suffix = name.rsplit('.').next().unwrap_or(name);
        let suggestions: Vec<&str> = self
            .entries
            .keys()
            .filter(|k| k.ends_with(suffix) || k.contains(name))
            .map(String::as_str)
            .take(3)
            .collect();
        if suggestions.is_empty() {
            err_msg!(Recipe, "unknown recipe '{}'", name)
        } else {
            err_msg!(
                Recipe,
                "unknown recipe '{}' (did you mean {}?)",
                name,
                suggestions.join(", ")
            )
        }
    }

    /// Every registered recipe, sorted by name.
    pub fn list(&self) -> Vec<RecipeInfo> {
        self.entries
            .iter()
            .map(|(name, entry)| match entry {
                Entry::Recipe(recipe) => RecipeInfo {
                    name: name.clone(),
                    description: recipe.description().to_string(),
                    parameterized: false,
                },
                Entry::Factory { description, .. } => RecipeInfo {
                    name: name.clone(),
                    description: description.clone(),
                    parameterized: true,
                },
            })
            .collect()
    }
}

impl fmt::Debug for RecipeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecipeRegistry")
            .field("recipes", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ============================================================================
// CATALOG
// ============================================================================

/// The ordered recipes of one run.
#[derive(Clone, Default)]
pub struct Catalog {
    recipes: Arc<[Arc<dyn Recipe>]>,
}

impl Catalog {
    pub fn new(recipes: Vec<Arc<dyn Recipe>>) -> Self {
        Catalog {
            recipes: recipes.into(),
        }
    }

    /// Looks up each name in `registry`, keeping the given order.
    pub fn from_names<S: AsRef<str>>(registry: &RecipeRegistry, names: &[S]) -> Result<Self, RecastError> {
        let recipes = names
            .iter()
            .map(|name| registry.instantiate(name.as_ref(), None))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Catalog::new(recipes))
    }

    pub fn recipes(&self) -> &[Arc<dyn Recipe>] {
        &self.recipes
    }

    pub fn names(&self) -> Vec<&str> {
        self.recipes.iter().map(|r| r.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
