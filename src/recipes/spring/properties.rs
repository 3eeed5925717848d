//! Spring Boot configuration keys to their Quarkus names.

use crate::diagnostics::Diagnostic;
use crate::matcher::Pattern;
use crate::recipe::{RecipeBuilder, RecipeDescriptor};
use crate::recipes::properties::set_value;
use crate::syntax::ast::PropertyEntry;
use crate::syntax::properties::escape_key;
use crate::syntax::{SourceKind, SyntaxKind};
use crate::visitor::{edit, Visit, VisitContext};

pub const MIGRATE_APPLICATION_PROPERTIES: &str = "recast.spring.MigrateApplicationProperties";

const RENAMED: &[(&str, &str)] = &[
    ("server.port", "quarkus.http.port"),
    ("server.servlet.context-path", "quarkus.http.root-path"),
    ("spring.application.name", "quarkus.application.name"),
    ("spring.datasource.url", "quarkus.datasource.jdbc.url"),
    ("spring.datasource.username", "quarkus.datasource.username"),
    ("spring.datasource.password", "quarkus.datasource.password"),
    ("spring.datasource.driver-class-name", "quarkus.datasource.jdbc.driver"),
    ("spring.jpa.show-sql", "quarkus.hibernate-orm.log.sql"),
    ("spring.jpa.hibernate.ddl-auto", "quarkus.hibernate-orm.database.generation"),
    ("logging.level.root", "quarkus.log.level"),
];

const DDL_AUTO: &str = "spring.jpa.hibernate.ddl-auto";

/// The Quarkus name of a Spring Boot key, if there is one.
pub fn quarkus_key(key: &str) -> Option<String> {
    if let Some((_, target)) = RENAMED.iter().find(|(spring, _)| *spring == key) {
        return Some(target.to_string());
    }
    let category = key.strip_prefix("logging.level.")?;
    (!category.is_empty()).then(|| format!("quarkus.log.category.\"{}\".level", category))
}

/// Hibernate's `ddl-auto` values as Quarkus generation strategies.
fn generation_strategy(value: &str) -> Option<&'static str> {
    match value.trim() {
        "create" | "create-drop" => Some("drop-and-create"),
        _ => None,
    }
}

/// `application.properties` and its profile variants.
fn is_application_properties(ctx: &VisitContext<'_>) -> bool {
    ctx.file()
        .path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with("application") && name.ends_with(".properties"))
}

/// Renames known keys in `application*.properties`. Values move with their
/// keys; `ddl-auto` values are translated. A key whose Quarkus name is
/// already set in the same file is reported and kept.
pub fn migrate_application_properties() -> RecipeDescriptor {
    RecipeBuilder::new(MIGRATE_APPLICATION_PROPERTIES)
        .description("Renames Spring Boot configuration keys to their Quarkus equivalents.")
        .applies_to(SourceKind::Properties)
        .rule(Pattern::Kind(SyntaxKind::PropertyEntry), |node, _, ctx| {
            if !is_application_properties(ctx) {
                return Visit::Keep;
            }
            let Some(entry) = PropertyEntry::cast(node) else {
                return Visit::Keep;
            };
            let key = entry.key();
            let Some(target) = quarkus_key(&key) else {
                return Visit::Keep;
            };
            let taken = ctx.parent().is_some_and(|file| {
                file.children_of(SyntaxKind::PropertyEntry)
                    .filter_map(PropertyEntry::cast)
                    .any(|other| other.key() == target)
            });
            if taken {
                let recipe = ctx.recipe().to_string();
                ctx.report(Diagnostic::conflict(
                    Some(&recipe),
                    Some(node.span()),
                    format!("not renaming {}: {} is already set", key, target),
                ));
                return Visit::Keep;
            }

            tracing::trace!(from = %key, to = %target, "renaming property");
            let raw = escape_key(&target);
            let mut edited = edit::map_child(node, SyntaxKind::PropKey, |token| token.clone().with_text(raw.as_str()));
            if key == DDL_AUTO {
                if let Some(strategy) = generation_strategy(&entry.value()) {
                    edited = set_value(&edited, strategy);
                }
            }
            Visit::Replace(edited)
        })
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;
    use crate::recipes::{rewrite, rewrite_idempotent};

    #[test]
    fn known_keys_are_renamed() {
        let recipe = migrate_application_properties();
        let text = "# web\nserver.port=8081\nspring.application.name = shop\nspring.jpa.hibernate.ddl-auto=create-drop\nlogging.level.org.hibernate=DEBUG\ncustom.flag=true\n";
        let out = rewrite_idempotent(&recipe, "src/main/resources/application.properties", text);
        assert_eq!(
            out,
            "# web\nquarkus.http.port=8081\nquarkus.application.name = shop\nquarkus.hibernate-orm.database.generation=drop-and-create\nquarkus.log.category.\"org.hibernate\".level=DEBUG\ncustom.flag=true\n"
        );
    }

    #[test]
    fn existing_targets_are_conflicts() {
        let recipe = migrate_application_properties();
        let text = "server.port=8081\nquarkus.http.port=9000\n";
        let (out, run) = rewrite(&recipe, "application-dev.properties", text);
        assert_eq!(out, text);
        assert!(run.diagnostics.iter().any(|d| d.kind == DiagnosticKind::TransformConflict));
    }

    #[test]
    fn other_property_files_are_ignored() {
        let recipe = migrate_application_properties();
        let text = "server.port=8081\n";
        assert_eq!(rewrite_idempotent(&recipe, "messages.properties", text), text);
    }

    #[test]
    fn key_mapping() {
        assert_eq!(quarkus_key("server.port").as_deref(), Some("quarkus.http.port"));
        assert_eq!(quarkus_key("logging.level.root").as_deref(), Some("quarkus.log.level"));
        assert_eq!(
            quarkus_key("logging.level.com.acme").as_deref(),
            Some("quarkus.log.category.\"com.acme\".level")
        );
        assert_eq!(quarkus_key("logging.level."), None);
        assert_eq!(quarkus_key("spring.main.banner-mode"), None);
    }
}
