//! Injected configuration values and configuration classes.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{CONFIGURATION_PROPERTIES, CONFIG_MAPPING, CONFIG_PROPERTY, VALUE};
use crate::diagnostics::Diagnostic;
use crate::matcher::Pattern;
use crate::recipe::{RecipeBuilder, RecipeDescriptor};
use crate::recipes::java::retarget_annotation;
use crate::syntax::ast::{quote_java, Annotation};
use crate::syntax::{SourceKind, SyntaxNode};
use crate::types::Resolution;
use crate::visitor::{edit, Template, Visit, VisitContext};

pub const VALUE_TO_CONFIG_PROPERTY: &str = "recast.spring.ValueToConfigProperty";
pub const CONFIGURATION_PROPERTIES_TO_CONFIG_MAPPING: &str = "recast.spring.ConfigurationPropertiesToConfigMapping";

const CONSTRUCTOR_BINDINGS: &[&str] = &[
    "org.springframework.boot.context.properties.ConstructorBinding",
    "org.springframework.boot.context.properties.bind.ConstructorBinding",
];

/// `${key}` or `${key:default}`.
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$\{([^:}]+)(?::([^}]*))?\}$").expect("placeholder pattern"));

/// Swaps `old` for the annotation built from `template`, keeping the layout
/// in front of `old`.
fn replace_with(old: &SyntaxNode, template: Template, ctx: &mut VisitContext<'_>) -> Visit {
    match template.annotation() {
        Ok(annotation) => {
            ctx.add_template_imports(&template);
            Visit::Replace(annotation.with_leading_trivia(old.leading_trivia()))
        }
        Err(e) => {
            tracing::warn!(recipe = %ctx.recipe(), error = %e.message(), "annotation template failed");
            Visit::Keep
        }
    }
}

// ============================================================================
// @Value
// ============================================================================

/// `@Value("${key:default}")` becomes
/// `@ConfigProperty(name = "key", defaultValue = "default")`. Expressions
/// (`#{...}`), literals without a placeholder and computed values are
/// reported and left alone.
pub fn value_to_config_property() -> RecipeDescriptor {
    RecipeBuilder::new(VALUE_TO_CONFIG_PROPERTY)
        .description("Replaces Spring @Value placeholders with MicroProfile @ConfigProperty.")
        .applies_to(SourceKind::Java)
        .precondition(Pattern::uses_type(VALUE))
        .rule(Pattern::annotation(VALUE), |node, _, ctx| {
            let recipe = ctx.recipe().to_string();
            let Some(arg) = Annotation::cast(node).and_then(|a| a.arg("value")) else {
                return Visit::Keep;
            };
            let Some(value) = arg.string_value() else {
                ctx.report(Diagnostic::ambiguity(&recipe, node.span(), "@Value argument is not a string literal"));
                return Visit::Keep;
            };
            let Some(captures) = PLACEHOLDER.captures(&value) else {
                ctx.report(Diagnostic::ambiguity(
                    &recipe,
                    node.span(),
                    format!("@Value(\"{}\") is not a plain property placeholder", value),
                ));
                return Visit::Keep;
            };
            let key = captures.get(1).map_or("", |m| m.as_str()).trim();
            let code = match captures.get(2) {
                Some(default) => format!(
                    "@ConfigProperty(name = {}, defaultValue = {})",
                    quote_java(key),
                    quote_java(default.as_str())
                ),
                None => format!("@ConfigProperty(name = {})", quote_java(key)),
            };
            ctx.maybe_remove_import(VALUE);
            replace_with(node, Template::new(code).with_imports([CONFIG_PROPERTY]), ctx)
        })
        .build()
}

// ============================================================================
// @ConfigurationProperties
// ============================================================================

/// `@ConfigurationProperties` becomes `@ConfigMapping`; the prefix is kept
/// whether it was given as `prefix`, `value` or the shorthand. Constructor
/// binding markers have no counterpart and are dropped.
pub fn configuration_properties_to_config_mapping() -> RecipeDescriptor {
    let bindings = Pattern::Any(CONSTRUCTOR_BINDINGS.iter().map(|fqn| Pattern::annotated(*fqn)).collect());
    RecipeBuilder::new(CONFIGURATION_PROPERTIES_TO_CONFIG_MAPPING)
        .description("Replaces @ConfigurationProperties with SmallRye @ConfigMapping.")
        .applies_to(SourceKind::Java)
        .precondition(Pattern::uses_type(CONFIGURATION_PROPERTIES))
        .rule(Pattern::annotation(CONFIGURATION_PROPERTIES), |node, _, ctx| {
            ctx.maybe_remove_import(CONFIGURATION_PROPERTIES);
            let Some(annotation) = Annotation::cast(node) else {
                return Visit::Keep;
            };
            let args = annotation.args();
            let prefix = annotation.arg("prefix").or_else(|| annotation.arg("value"));
            match prefix {
                Some(arg) if arg.name == Some("prefix") && args.len() == 1 => {
                    Visit::Replace(retarget_annotation(node, CONFIG_MAPPING, true, ctx))
                }
                Some(arg) => {
                    let code = format!("@ConfigMapping(prefix = {})", arg.value.text());
                    replace_with(node, Template::new(code).with_imports([CONFIG_MAPPING]), ctx)
                }
                None => Visit::Replace(retarget_annotation(node, CONFIG_MAPPING, false, ctx)),
            }
        })
        .rule(bindings, |node, _, ctx| {
            let scope = ctx.scope();
            let mut removed = Vec::new();
            let edited = edit::remove_annotations_where(node, |annotation| {
                match scope.type_of(annotation) {
                    Resolution::Resolved(fqn) if CONSTRUCTOR_BINDINGS.contains(&fqn.as_str()) => {
                        removed.push(fqn);
                        true
                    }
                    _ => false,
                }
            });
            for fqn in removed {
                ctx.maybe_remove_import(fqn);
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
    fn placeholders_become_config_properties() {
        let recipe = value_to_config_property();
        let text = "import org.springframework.beans.factory.annotation.Value;\n\nclass Greeter {\n    @Value(\"${greeting.message}\")\n    String message;\n\n    @Value(\"${greeting.suffix:!}\")\n    String suffix;\n}\n";
        let out = rewrite_idempotent(&recipe, "Greeter.java", text);
        assert_eq!(
            out,
            "import org.eclipse.microprofile.config.inject.ConfigProperty;\n\nclass Greeter {\n    @ConfigProperty(name = \"greeting.message\")\n    String message;\n\n    @ConfigProperty(name = \"greeting.suffix\", defaultValue = \"!\")\n    String suffix;\n}\n"
        );
    }

    #[test]
    fn expressions_are_reported() {
        let recipe = value_to_config_property();
        let text = "import org.springframework.beans.factory.annotation.Value;\n\nclass A {\n    @Value(\"#{systemProperties['user.home']}\")\n    String home;\n}\n";
        let (out, run) = rewrite(&recipe, "A.java", text);
        assert_eq!(out, text);
        assert_eq!(run.diagnostics.len(), 1);
        assert_eq!(run.diagnostics[0].kind, DiagnosticKind::MatchAmbiguity);
    }

    #[test]
    fn prefix_is_kept_in_every_spelling() {
        let recipe = configuration_properties_to_config_mapping();
        for written in ["prefix = \"app\"", "\"app\"", "value = \"app\""] {
            let text = format!(
                "import org.springframework.boot.context.properties.ConfigurationProperties;\n\n@ConfigurationProperties({})\npublic class AppProperties {{\n    private String name;\n}}\n",
                written
            );
            let out = rewrite_idempotent(&recipe, "AppProperties.java", &text);
            assert_eq!(
                out,
                "import io.smallrye.config.ConfigMapping;\n\n@ConfigMapping(prefix = \"app\")\npublic class AppProperties {\n    private String name;\n}\n"
            );
        }
    }

    #[test]
    fn constructor_binding_is_dropped() {
        let recipe = configuration_properties_to_config_mapping();
        let text = "import org.springframework.boot.context.properties.ConfigurationProperties;\nimport org.springframework.boot.context.properties.ConstructorBinding;\n\n@ConstructorBinding\n@ConfigurationProperties(prefix = \"server\")\npublic class ServerConfig {\n}\n";
        let out = rewrite_idempotent(&recipe, "ServerConfig.java", text);
        assert_eq!(
            out,
            "import io.smallrye.config.ConfigMapping;\n\n@ConfigMapping(prefix = \"server\")\npublic class ServerConfig {\n}\n"
        );
    }
}
