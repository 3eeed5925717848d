//! `@Bean` factory methods become CDI producers.

use super::{
    add_annotation, annotations_of, replace_annotation, APPLICATION_SCOPED, BEAN, CDI_SCOPES, CONFIGURABLE_BEAN_FACTORY,
    DEPENDENT, NAMED, PRODUCES, SCOPE,
};
use crate::diagnostics::Diagnostic;
use crate::matcher::Pattern;
use crate::recipe::{RecipeBuilder, RecipeDescriptor};
use crate::recipes::java::retarget_annotation;
use crate::syntax::ast::{quote_java, simple_name, unwrap_expr, Annotation};
use crate::syntax::{NodeId, SourceKind, SyntaxKind, SyntaxNode};
use crate::visitor::edit::{self, AnnotationPosition};
use crate::visitor::Visit;

pub const BEAN_TO_PRODUCES: &str = "recast.spring.BeanToProduces";

/// The CDI scope matching a Spring `@Scope`: prototype beans are
/// `@Dependent`, everything else is application scoped.
fn cdi_scope(scope: Option<&SyntaxNode>) -> &'static str {
    let value = scope
        .and_then(Annotation::cast)
        .and_then(|a| a.arg("value").or_else(|| a.arg("scopeName")))
        .map(|arg| arg.string_value().unwrap_or_else(|| unwrap_expr(arg.value).significant_text()));
    match value {
        Some(value) if value.to_ascii_lowercase().contains("prototype") => DEPENDENT,
        _ => APPLICATION_SCOPED,
    }
}

/// `@Bean` methods become `@Produces` methods with an explicit scope taken
/// from `@Scope`. A bean name is kept as `@Named`. Lifecycle callbacks
/// (`initMethod`, `destroyMethod`) have no annotation counterpart and are
/// reported.
pub fn bean_to_produces() -> RecipeDescriptor {
    RecipeBuilder::new(BEAN_TO_PRODUCES)
        .description("Replaces @Bean factory methods with CDI @Produces methods.")
        .applies_to(SourceKind::Java)
        .precondition(Pattern::uses_type(BEAN))
        .rule(
            Pattern::Kind(SyntaxKind::MethodDecl).and(Pattern::annotated(BEAN)),
            |node, _, ctx| {
                let annotations = annotations_of(node, ctx.scope());
                let of_type = |fqn: &str| {
                    annotations
                        .iter()
                        .filter(|(_, t)| t.as_deref() == Some(fqn))
                        .map(|(a, _)| a)
                        .collect::<Vec<_>>()
                };
                let Some(bean) = of_type(BEAN).first().map(|a| (*a).clone()) else {
                    return Visit::Keep;
                };
                let view = Annotation::cast(&bean);
                if let Some(callback) = view.and_then(|a| a.arg("initMethod").or_else(|| a.arg("destroyMethod"))) {
                    let recipe = ctx.recipe().to_string();
                    ctx.report(Diagnostic::ambiguity(
                        &recipe,
                        bean.span(),
                        format!("@Bean {} has no CDI equivalent; use @PostConstruct or @PreDestroy", callback.element_name()),
                    ));
                    return Visit::Keep;
                }
                let name = view
                    .and_then(|a| a.arg("name").or_else(|| a.arg("value")))
                    .and_then(|arg| arg.string_value())
                    .filter(|name| !name.is_empty());
                let spring_scopes = of_type(SCOPE);
                let scope = cdi_scope(spring_scopes.first().copied());
                let scoped = annotations
                    .iter()
                    .any(|(_, t)| t.as_deref().is_some_and(|t| CDI_SCOPES.contains(&t)));
                let named = !of_type(NAMED).is_empty();
                let dropped: Vec<NodeId> = spring_scopes.iter().map(|a| a.id()).collect();

                let produces = retarget_annotation(&bean, PRODUCES, false, ctx);
                let mut decl = replace_annotation(node, bean.id(), produces);
                decl = edit::remove_annotations_where(&decl, |a| dropped.contains(&a.id()));
                if let (Some(name), false) = (name, named) {
                    decl = add_annotation(&decl, &format!("@Named({})", quote_java(&name)), NAMED, AnnotationPosition::Last, ctx);
                }
                if !scoped {
                    decl = add_annotation(&decl, &format!("@{}", simple_name(scope)), scope, AnnotationPosition::Last, ctx);
                }
                ctx.maybe_remove_import(BEAN);
                ctx.maybe_remove_import(SCOPE);
                ctx.maybe_remove_import(CONFIGURABLE_BEAN_FACTORY);
                Visit::Replace(decl)
            },
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;
    use crate::recipes::{rewrite, rewrite_idempotent};

    #[test]
    fn beans_are_produced_with_an_explicit_scope() {
        let recipe = bean_to_produces();
        let text = "import org.springframework.context.annotation.Bean;\nimport org.springframework.context.annotation.Scope;\nimport org.springframework.web.client.RestTemplate;\n\nclass AppConfig {\n    @Bean\n    RestTemplate restTemplate() {\n        return new RestTemplate();\n    }\n\n    @Bean\n    @Scope(\"prototype\")\n    RestTemplate restTemplate2() {\n        return new RestTemplate();\n    }\n}\n";
        let out = rewrite_idempotent(&recipe, "AppConfig.java", text);
        assert_eq!(
            out,
            "import jakarta.enterprise.context.ApplicationScoped;\nimport jakarta.enterprise.context.Dependent;\nimport jakarta.enterprise.inject.Produces;\nimport org.springframework.web.client.RestTemplate;\n\nclass AppConfig {\n    @Produces\n    @ApplicationScoped\n    RestTemplate restTemplate() {\n        return new RestTemplate();\n    }\n\n    @Produces\n    @Dependent\n    RestTemplate restTemplate2() {\n        return new RestTemplate();\n    }\n}\n"
        );
    }

    #[test]
    fn named_beans_and_scope_constants() {
        let recipe = bean_to_produces();
        let text = "import org.springframework.beans.factory.config.ConfigurableBeanFactory;\nimport org.springframework.context.annotation.Bean;\nimport org.springframework.context.annotation.Scope;\n\nclass AppConfig {\n    @Bean(name = \"pool\")\n    @Scope(ConfigurableBeanFactory.SCOPE_PROTOTYPE)\n    Pool pool() {\n        return new Pool();\n    }\n}\n";
        let out = rewrite_idempotent(&recipe, "AppConfig.java", text);
        assert_eq!(
            out,
            "import jakarta.enterprise.context.Dependent;\nimport jakarta.enterprise.inject.Produces;\nimport jakarta.inject.Named;\n\nclass AppConfig {\n    @Produces\n    @Named(\"pool\")\n    @Dependent\n    Pool pool() {\n        return new Pool();\n    }\n}\n"
        );
    }

    #[test]
    fn lifecycle_callbacks_are_reported() {
        let recipe = bean_to_produces();
        let text = "import org.springframework.context.annotation.Bean;\n\nclass AppConfig {\n    @Bean(destroyMethod = \"close\")\n    Pool pool() {\n        return new Pool();\n    }\n}\n";
        let (out, run) = rewrite(&recipe, "AppConfig.java", text);
        assert_eq!(out, text);
        assert!(run.diagnostics.iter().any(|d| d.kind == DiagnosticKind::MatchAmbiguity));
    }
}
