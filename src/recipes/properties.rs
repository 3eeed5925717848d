//! Recipes for `.properties` configuration files.

use std::sync::Arc;

use serde::Deserialize;

use super::factory;
use crate::matcher::Pattern;
use crate::recipe::{RecipeBuilder, RecipeDescriptor, RecipeRegistry};
use crate::syntax::ast::PropertyEntry;
use crate::syntax::properties::{escape_key, escape_value};
use crate::syntax::{SourceKind, SyntaxKind, SyntaxNode};
use crate::visitor::{edit, factory as visitor_factory, Visit, VisitContext};
use crate::RecastError;

pub const CHANGE_PROPERTY_KEY: &str = "recast.properties.ChangePropertyKey";
pub const CHANGE_PROPERTY_VALUE: &str = "recast.properties.ChangePropertyValue";
pub const DELETE_PROPERTY: &str = "recast.properties.DeleteProperty";

pub fn register(registry: &mut RecipeRegistry) {
    registry.register_factory(
        CHANGE_PROPERTY_KEY,
        "Renames a configuration key, keeping its value and layout.",
        factory(CHANGE_PROPERTY_KEY, |o| change_property_key(o).map(RecipeDescriptor::into_arc)),
    );
    registry.register_factory(
        CHANGE_PROPERTY_VALUE,
        "Sets the value of a configuration key, optionally only where the old value matches.",
        factory(CHANGE_PROPERTY_VALUE, |o| change_property_value(o).map(RecipeDescriptor::into_arc)),
    );
    registry.register_factory(
        DELETE_PROPERTY,
        "Deletes every entry of a configuration key.",
        factory(DELETE_PROPERTY, |o| delete_property(o).map(RecipeDescriptor::into_arc)),
    );
}

/// Replaces the token of `kind` inside a property entry.
fn replace_token(entry: &SyntaxNode, kind: SyntaxKind, text: &str) -> SyntaxNode {
    edit::map_child(entry, kind, |token| token.clone().with_text(text))
}

// ============================================================================
// CHANGE KEY
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChangePropertyKey {
    pub old_key: String,
    pub new_key: String,
}

pub fn change_property_key(options: ChangePropertyKey) -> Result<RecipeDescriptor, RecastError> {
    let raw: Arc<str> = escape_key(&options.new_key).into();
    Ok(RecipeBuilder::new(CHANGE_PROPERTY_KEY)
        .description(format!("Renames {} to {}.", options.old_key, options.new_key))
        .applies_to(SourceKind::Properties)
        .rule(Pattern::config_key(&options.old_key, None)?, move |node, _, _| {
            Visit::Replace(replace_token(node, SyntaxKind::PropKey, &raw))
        })
        .build())
}

// ============================================================================
// CHANGE VALUE
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChangePropertyValue {
    pub key: String,
    /// Regex the current value must match; any value if absent.
    #[serde(default)]
    pub old_value: Option<String>,
    pub new_value: String,
}

pub fn change_property_value(options: ChangePropertyValue) -> Result<RecipeDescriptor, RecastError> {
    let pattern = Pattern::config_key(&options.key, options.old_value.as_deref())?;
    let new_value = options.new_value;
    Ok(RecipeBuilder::new(CHANGE_PROPERTY_VALUE)
        .description(format!("Sets {} to {}.", options.key, new_value))
        .applies_to(SourceKind::Properties)
        .rule(pattern, move |node, bindings, _| {
            if bindings.text("value") == Some(new_value.as_str()) {
                return Visit::Keep;
            }
            Visit::Replace(set_value(node, &new_value))
        })
        .build())
}

/// Sets the value of an entry. An entry written without a separator gets
/// `=` so the new value does not merge into the key.
pub(crate) fn set_value(entry: &SyntaxNode, value: &str) -> SyntaxNode {
    let edited = replace_token(entry, SyntaxKind::PropValue, &escape_value(value));
    let bare = PropertyEntry::cast(entry).is_some_and(|e| {
        e.key_token().is_some() && entry.child(SyntaxKind::PropSeparator).and_then(|s| s.token_text()) == Some("")
    });
    if bare && !value.is_empty() {
        replace_token(&edited, SyntaxKind::PropSeparator, "=")
    } else {
        edited
    }
}

// ============================================================================
// DELETE
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteProperty {
    /// Key, `*` wildcards allowed.
    pub key: String,
}

/// Deletes matching entries. Comment lines above an entry stay; a deleted
/// first entry hands its leading text to the next line.
pub fn delete_property(options: DeleteProperty) -> Result<RecipeDescriptor, RecastError> {
    let pattern = Pattern::config_key(&options.key, None)?;
    Ok(RecipeBuilder::new(DELETE_PROPERTY)
        .description(format!("Deletes {}.", options.key))
        .applies_to(SourceKind::Properties)
        .visitor(visitor_factory(move |node: &SyntaxNode, ctx: &mut VisitContext<'_>| {
            if node.kind() != SyntaxKind::PropertiesFile {
                return Visit::Keep;
            }
            let mut file = node.clone();
            let mut index = 0;
            while index < file.children().len() {
                let child = &file.children()[index];
                let hit = child.kind() == SyntaxKind::PropertyEntry
                    && pattern.evaluate(child, ctx.scope(), None).is_match();
                if !hit {
                    index += 1;
                    continue;
                }
                tracing::trace!(key = %PropertyEntry::cast(child).map(|e| e.key()).unwrap_or_default(), "deleting property");
                let trivia = child.leading_trivia().to_string();
                file = remove_entry(&file, index, &trivia);
            }
            Visit::Replace(file)
        }))
        .build())
}

/// Removes entry `index`. The comments and blank lines in front of it are
/// kept, minus one line break: the one that ended the previous entry, or for
/// the first entry the one that starts the next.
fn remove_entry(file: &SyntaxNode, index: usize, trivia: &str) -> SyntaxNode {
    let mut children = file.children().to_vec();
    children.remove(index);
    if let Some(next) = children.get_mut(index) {
        let merged = if index == 0 {
            format!("{}{}", trivia, strip_line_break(next.leading_trivia()))
        } else {
            format!("{}{}", strip_line_break(trivia), next.leading_trivia())
        };
        *next = next.clone().with_leading_trivia(merged);
    }
    file.clone().with_children(children)
}

fn strip_line_break(text: &str) -> &str {
    text.strip_prefix("\r\n").or_else(|| text.strip_prefix('\n')).unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipes::rewrite_idempotent;

    #[test]
    fn keys_are_renamed_in_place() {
        let recipe = change_property_key(ChangePropertyKey {
            old_key: "server.port".into(),
            new_key: "quarkus.http.port".into(),
        })
        .expect("recipe");
        let text = "# web\nserver.port = 8080\nother=1\n";
        let out = rewrite_idempotent(&recipe, "application.properties", text);
        assert_eq!(out, "# web\nquarkus.http.port = 8080\nother=1\n");
    }

    #[test]
    fn values_change_only_where_the_old_value_matches() {
        let recipe = change_property_value(ChangePropertyValue {
            key: "ddl".into(),
            old_value: Some("^create-drop$".into()),
            new_value: "drop-and-create".into(),
        })
        .expect("recipe");
        let out = rewrite_idempotent(&recipe, "a.properties", "ddl=create-drop\n");
        assert_eq!(out, "ddl=drop-and-create\n");
        let out = rewrite_idempotent(&recipe, "a.properties", "ddl=update\n");
        assert_eq!(out, "ddl=update\n");

        let bare = change_property_value(ChangePropertyValue {
            key: "flag".into(),
            old_value: None,
            new_value: "on".into(),
        })
        .expect("recipe");
        assert_eq!(rewrite_idempotent(&bare, "a.properties", "flag\n"), "flag=on\n");
    }

    #[test]
    fn deleting_keeps_comments_and_neighbours() {
        let recipe = delete_property(DeleteProperty { key: "spring.*".into() }).expect("recipe");
        let text = "spring.main.banner=off\n# keep me\nname=x\nspring.jpa.show-sql=true\nlast=1\n";
        let out = rewrite_idempotent(&recipe, "a.properties", text);
        assert_eq!(out, "# keep me\nname=x\nlast=1\n");
    }
}
