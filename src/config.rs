//! `recast.yml`: engine options and declarative recipes.
//!
//! ```yaml
//! max_iterations: 5
//! threads: 4
//! exclude: [generated]
//! classpath:
//!   - org.springframework.stereotype.Service
//! recipes:
//!   - com.acme.Migrate
//! declarative_recipes:
//!   - name: com.acme.Migrate
//!     description: Our migration.
//!     recipe_list:
//!       - recast.spring.SpringBootToQuarkus
//!       - recast.properties.ChangePropertyKey:
//!           old_key: acme.port
//!           new_key: quarkus.http.port
//! ```
//!
//! A declarative recipe is a composite of other recipes, built-in or
//! declared earlier or later in the same file. Entries of `recipe_list` and
//! `recipes` are either a name or a single-key map from a name to the
//! options of a parameterized recipe.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::composer::ComposerOptions;
use crate::errors::to_error_source;
use crate::recipe::{Catalog, Recipe, RecipeBuilder, RecipeRegistry};
use crate::syntax::Span;
use crate::types::TypeTable;
use crate::{err_msg, err_src, RecastError};

pub const CONFIG_FILE_NAME: &str = "recast.yml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub max_iterations: Option<usize>,
    pub threads: Option<usize>,
    /// Directory names skipped during discovery, on top of the defaults.
    pub exclude: Vec<String>,
    /// Fully qualified names of types the sources may refer to.
    pub classpath: Vec<String>,
    /// Recipes to run, in order.
    pub recipes: Vec<RecipeRef>,
    pub declarative_recipes: Vec<DeclarativeRecipe>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeclarativeRecipe {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub recipe_list: Vec<RecipeRef>,
}

/// A recipe by name, optionally with options.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RecipeRef {
    Name(String),
    WithOptions(BTreeMap<String, serde_yaml::Value>),
}

impl RecipeRef {
    pub fn name(&self) -> Result<&str, RecastError> {
        Ok(self.split()?.0)
    }

    fn split(&self) -> Result<(&str, Option<&serde_yaml::Value>), RecastError> {
        match self {
            RecipeRef::Name(name) => Ok((name, None)),
            RecipeRef::WithOptions(map) => {
                let mut entries = map.iter();
                match (entries.next(), entries.next()) {
                    (Some((name, options)), None) => Ok((name, Some(options))),
                    _ => Err(err_msg!(
                        Config,
                        "a recipe entry with options must have exactly one key, found {}",
                        map.len()
                    )),
                }
            }
        }
    }
}

impl From<&str> for RecipeRef {
    fn from(name: &str) -> Self {
        RecipeRef::Name(name.to_string())
    }
}

// ============================================================================
// LOADING
// ============================================================================

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self, RecastError> {
        let text = std::fs::read_to_string(path).map_err(|e| RecastError::io(path.display().to_string(), e))?;
        Self::parse(&text, &path.display().to_string())
    }

    /// `recast.yml` in `dir`, or the defaults when there is none.
    pub fn discover(dir: &Path) -> Result<Self, RecastError> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.is_file() {
            tracing::debug!(path = %path.display(), "loading configuration");
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parses configuration text. `name` labels errors.
    pub fn parse(text: &str, name: &str) -> Result<Self, RecastError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: EngineConfig = serde_yaml::from_str(text).map_err(|e| {
            let message = format!("invalid configuration: {}", e);
            match e.location() {
                Some(location) => {
                    let source = to_error_source(name, text);
                    err_src!(Config, message, &source, Span::at(location.index()))
                }
                None => err_msg!(Config, "{}", message),
            }
        })?;
        if config.max_iterations == Some(0) {
            return Err(err_msg!(Config, "{}: max_iterations must be at least 1", name));
        }
        Ok(config)
    }

    pub fn composer_options(&self) -> ComposerOptions {
        let defaults = ComposerOptions::default();
        ComposerOptions {
            max_iterations: self.max_iterations.unwrap_or(defaults.max_iterations),
            threads: self.threads.or(defaults.threads),
        }
    }

    pub fn type_table(&self) -> TypeTable {
        self.classpath.iter().map(String::as_str).collect()
    }

    /// `base` plus every declarative recipe of this file.
    pub fn registry(&self, base: &RecipeRegistry) -> Result<RecipeRegistry, RecastError> {
        let declared: HashMap<&str, &DeclarativeRecipe> = self
            .declarative_recipes
            .iter()
            .map(|recipe| (recipe.name.as_str(), recipe))
            .collect();
        if declared.len() != self.declarative_recipes.len() {
            return Err(err_msg!(Config, "a declarative recipe name is used twice"));
        }
        let mut builder = DeclarativeBuilder {
            base,
            declared,
            built: HashMap::new(),
            stack: Vec::new(),
        };
        let mut registry = base.clone();
        for recipe in &self.declarative_recipes {
            let built = builder.build(&recipe.name)?;
            if registry.register(built).is_some() {
                tracing::warn!(name = %recipe.name, "declarative recipe replaces a built-in recipe");
            }
        }
        Ok(registry)
    }

    /// The catalog for a run: `names` when given, otherwise the recipes
    /// listed in this file.
    pub fn catalog(&self, registry: &RecipeRegistry, names: &[String]) -> Result<Catalog, RecastError> {
        let refs: Vec<RecipeRef> = if names.is_empty() {
            self.recipes.clone()
        } else {
            names.iter().map(|n| RecipeRef::from(n.as_str())).collect()
        };
        let recipes = refs
            .iter()
            .map(|r| {
                let (name, options) = r.split()?;
                registry.instantiate(name, options)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Catalog::new(recipes))
    }
}

/// Builds declarative recipes depth first, rejecting cycles.
struct DeclarativeBuilder<'a> {
    base: &'a RecipeRegistry,
    declared: HashMap<&'a str, &'a DeclarativeRecipe>,
    built: HashMap<String, Arc<dyn Recipe>>,
    stack: Vec<String>,
}

impl DeclarativeBuilder<'_> {
    fn build(&mut self, name: &str) -> Result<Arc<dyn Recipe>, RecastError> {
        if let Some(recipe) = self.built.get(name) {
            return Ok(recipe.clone());
        }
        if self.stack.iter().any(|n| n == name) {
            return Err(err_msg!(
                Config,
                "declarative recipe cycle: {} -> {}",
                self.stack.join(" -> "),
                name
            ));
        }
        let Some(&declaration) = self.declared.get(name) else {
            return Err(err_msg!(Internal, "no declarative recipe named '{}'", name));
        };

        self.stack.push(name.to_string());
        let mut builder = RecipeBuilder::new(name).description(declaration.description.clone());
        for entry in &declaration.recipe_list {
            let (member, options) = entry.split()?;
            let recipe = if self.declared.contains_key(member) {
                if options.is_some() {
                    return Err(err_msg!(Config, "declarative recipe '{}' takes no options", member));
                }
                self.build(member)?
            } else {
                self.base.instantiate(member, options).map_err(|e| {
                    err_msg!(Config, "in declarative recipe '{}': {}", name, e.message())
                })?
            };
            builder = builder.recipe(recipe);
        }
        self.stack.pop();

        let recipe = builder.build().into_arc();
        self.built.insert(name.to_string(), recipe.clone());
        Ok(recipe)
    }
}
