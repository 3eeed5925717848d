//! Recipes: named, self-contained migration units.
//!
//! A recipe says which files it applies to, which file-level preconditions
//! must hold, and what to do: match rules (a [`Pattern`] paired with a
//! transform), free-standing visitors, and for composites an ordered list of
//! member recipes. Recipes hold no per-run state; every execution builds
//! fresh visitors from factories.
//!
//! Most recipes are [`RecipeDescriptor`]s put together with a
//! [`RecipeBuilder`]:
//!
//! ```rust
//! use recast::matcher::Pattern;
//! use recast::recipe::{Recipe, RecipeBuilder};
//! use recast::syntax::SourceKind;
//! use recast::visitor::Visit;
//!
//! let recipe = RecipeBuilder::new("demo.DropDeprecated")
//!     .description("Removes @Deprecated annotations.")
//!     .applies_to(SourceKind::Java)
//!     .rule(Pattern::annotation("java.lang.Deprecated"), |_, _, _| Visit::Remove)
//!     .build();
//! assert_eq!(recipe.name(), "demo.DropDeprecated");
//! assert!(recipe.applicable(SourceKind::Java));
//! ```

use std::fmt;
use std::sync::Arc;

use crate::matcher::{Bindings, Pattern};
use crate::syntax::{SourceKind, SyntaxNode};
use crate::visitor::{TreeVisitor, Visit, VisitContext, VisitorFactory};

mod exec;
pub mod registry;

pub use exec::{run_recipe, RecipeRun};
pub use registry::{Catalog, RecipeFactory, RecipeInfo, RecipeRegistry};

// ============================================================================
// RECIPE CONTRACT
// ============================================================================

/// The capability every recipe shares.
pub trait Recipe: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Whether the recipe has anything to do for files of `kind`.
    fn applicable(&self, kind: SourceKind) -> bool;

    /// File-level patterns, evaluated at the root, that must all match
    /// before anything runs.
    fn preconditions(&self) -> &[Pattern] {
        &[]
    }

    /// Match rules, run in order after the member recipes.
    fn rules(&self) -> &[MatchRule] {
        &[]
    }

    /// Free-standing visitors, run in order after the rules.
    fn visitors(&self) -> Vec<VisitorFactory> {
        Vec::new()
    }

    /// Member recipes of a composite, run first and in order.
    fn recipe_list(&self) -> &[Arc<dyn Recipe>] {
        &[]
    }
}

impl fmt::Debug for dyn Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recipe").field("name", &self.name()).finish()
    }
}

// ============================================================================
// MATCH RULES
// ============================================================================

/// Rewrites one matched node, given the bindings its pattern captured.
pub type Transform = Arc<dyn Fn(&SyntaxNode, &Bindings, &mut VisitContext<'_>) -> Visit + Send + Sync>;

/// A pattern and what to do with each node it matches.
///
/// Matching runs over the whole file first and leaves a `Matched` marker on
/// every hit; the transform then runs as a post-order visitor that only
/// looks at marked nodes. A node whose pattern could not be decided gets no
/// marker, only a diagnostic.
#[derive(Clone)]
pub struct MatchRule {
    pattern: Pattern,
    transform: Transform,
}

impl MatchRule {
    pub fn new<F>(pattern: Pattern, transform: F) -> Self
    where
        F: Fn(&SyntaxNode, &Bindings, &mut VisitContext<'_>) -> Visit + Send + Sync + 'static,
    {
        MatchRule {
            pattern,
            transform: Arc::new(transform),
        }
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// The transform phase of rule number `index` as a visitor.
    pub fn visitor(&self, index: usize) -> Box<dyn TreeVisitor> {
        Box::new(RuleVisitor {
            index,
            transform: self.transform.clone(),
        })
    }
}

impl fmt::Debug for MatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchRule").field("pattern", &self.pattern).finish()
    }
}

struct RuleVisitor {
    index: usize,
    transform: Transform,
}

impl TreeVisitor for RuleVisitor {
    fn post_visit(&mut self, node: &SyntaxNode, ctx: &mut VisitContext<'_>) -> Visit {
        let Some(bindings) = ctx.matched(self.index, node).cloned() else {
            return Visit::Keep;
        };
        (self.transform)(node, &bindings, ctx)
    }
}

// ============================================================================
// DESCRIPTORS
// ============================================================================

/// An immutable recipe assembled from parts.
pub struct RecipeDescriptor {
    name: String,
    description: String,
    file_kinds: Vec<SourceKind>,
    preconditions: Vec<Pattern>,
    rules: Vec<MatchRule>,
    visitors: Vec<VisitorFactory>,
    recipes: Vec<Arc<dyn Recipe>>,
}

impl RecipeDescriptor {
    pub fn into_arc(self) -> Arc<dyn Recipe> {
        Arc::new(self)
    }
}

impl Recipe for RecipeDescriptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn applicable(&self, kind: SourceKind) -> bool {
        self.file_kinds.contains(&kind) || self.recipes.iter().any(|r| r.applicable(kind))
    }

    fn preconditions(&self) -> &[Pattern] {
        &self.preconditions
    }

    fn rules(&self) -> &[MatchRule] {
        &self.rules
    }

    fn visitors(&self) -> Vec<VisitorFactory> {
        self.visitors.clone()
    }

    fn recipe_list(&self) -> &[Arc<dyn Recipe>] {
        &self.recipes
    }
}

impl fmt::Debug for RecipeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecipeDescriptor")
            .field("name", &self.name)
            .field("file_kinds", &self.file_kinds)
            .field("rules", &self.rules.len())
            .field("visitors", &self.visitors.len())
            .field("recipes", &self.recipes.iter().map(|r| r.name()).collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for [`RecipeDescriptor`].
pub struct RecipeBuilder {
    descriptor: RecipeDescriptor,
}

impl RecipeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        RecipeBuilder {
            descriptor: RecipeDescriptor {
                name: name.into(),
                description: String::new(),
                file_kinds: Vec::new(),
                preconditions: Vec::new(),
                rules: Vec::new(),
                visitors: Vec::new(),
                recipes: Vec::new(),
            },
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.descriptor.description = description.into();
        self
    }

    pub fn applies_to(mut self, kind: SourceKind) -> Self {
        if !self.descriptor.file_kinds.contains(&kind) {
            self.descriptor.file_kinds.push(kind);
        }
        self
    }

    pub fn precondition(mut self, pattern: Pattern) -> Self {
        self.descriptor.preconditions.push(pattern);
        self
    }

    pub fn rule<F>(mut self, pattern: Pattern, transform: F) -> Self
    where
        F: Fn(&SyntaxNode, &Bindings, &mut VisitContext<'_>) -> Visit + Send + Sync + 'static,
    {
        self.descriptor.rules.push(MatchRule::new(pattern, transform));
        self
    }

    pub fn visitor(mut self, factory: VisitorFactory) -> Self {
        self.descriptor.visitors.push(factory);
        self
    }

    /// Adds a member recipe; the result is a composite.
    pub fn recipe(mut self, recipe: Arc<dyn Recipe>) -> Self {
        self.descriptor.recipes.push(recipe);
        self
    }

    pub fn build(self) -> RecipeDescriptor {
        self.descriptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visitor::factory;

    #[test]
    fn composites_are_applicable_through_members() {
        let java = RecipeBuilder::new("a").applies_to(SourceKind::Java).build().into_arc();
        let composite = RecipeBuilder::new("all").recipe(java).build();
        assert!(composite.applicable(SourceKind::Java));
        assert!(!composite.applicable(SourceKind::Properties));
        assert_eq!(composite.recipe_list().len(), 1);
    }

    #[test]
    fn builder_keeps_declaration_order() {
        let recipe = RecipeBuilder::new("r")
            .applies_to(SourceKind::Java)
            .applies_to(SourceKind::Java)
            .rule(Pattern::annotation("a.A"), |_, _, _| Visit::Keep)
            .rule(Pattern::annotation("a.B"), |_, _, _| Visit::Keep)
            .visitor(factory(|_: &SyntaxNode, _: &mut VisitContext<'_>| Visit::Keep))
            .build();
        assert_eq!(recipe.rules().len(), 2);
        assert_eq!(recipe.visitors().len(), 1);
        assert!(format!("{:?}", recipe).contains("file_kinds: [Java]"));
    }
}
