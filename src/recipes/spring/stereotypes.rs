//! Spring stereotypes become CDI beans.

use super::{add_annotation, annotations_of, replace_annotation, APPLICATION_SCOPED, CDI_SCOPES, NAMED, STEREOTYPES};
use crate::matcher::Pattern;
use crate::recipe::{RecipeBuilder, RecipeDescriptor};
use crate::recipes::java::retarget_annotation;
use crate::syntax::ast::{quote_java, Annotation};
use crate::syntax::{NodeId, SourceKind, SyntaxKind};
use crate::visitor::edit::{self, AnnotationPosition};
use crate::visitor::Visit;

pub const STEREOTYPE_TO_APPLICATION_SCOPED: &str = "recast.spring.StereotypeToApplicationScoped";

/// `@Service`, `@Component`, `@Repository` and `@Configuration` on a class
/// become `@ApplicationScoped`. A bean name given as the annotation value is
/// kept as `@Named`. A class that already has a CDI scope only loses the
/// Spring annotations.
pub fn stereotype_to_application_scoped() -> RecipeDescriptor {
    let annotated = Pattern::Any(STEREOTYPES.iter().map(|fqn| Pattern::annotated(*fqn)).collect());
    let uses = Pattern::Any(STEREOTYPES.iter().map(|fqn| Pattern::uses_type(*fqn)).collect());
    RecipeBuilder::new(STEREOTYPE_TO_APPLICATION_SCOPED)
        .description("Replaces Spring stereotype annotations with @ApplicationScoped.")
        .applies_to(SourceKind::Java)
        .precondition(uses)
        .rule(Pattern::Kind(SyntaxKind::ClassDecl).and(annotated), |node, _, ctx| {
            let annotations = annotations_of(node, ctx.scope());
            let found: Vec<_> = annotations
                .iter()
                .filter_map(|(annotation, fqn)| {
                    let fqn = fqn.as_deref().filter(|f| STEREOTYPES.contains(f))?;
                    Some((annotation.clone(), fqn.to_string()))
                })
                .collect();
            let Some((first, _)) = found.first() else {
                return Visit::Keep;
            };
            let has_scope = annotations
                .iter()
                .any(|(_, fqn)| fqn.as_deref().is_some_and(|f| CDI_SCOPES.contains(&f)));
            let has_name = annotations.iter().any(|(_, fqn)| fqn.as_deref() == Some(NAMED));
            let bean_name = found
                .iter()
                .find_map(|(annotation, _)| Annotation::cast(annotation)?.arg("value")?.string_value())
                .filter(|name| !name.is_empty());

            let mut decl = node.clone();
            let keep: Option<NodeId> = (!has_scope).then(|| first.id());
            if let Some(id) = keep {
                let scoped = retarget_annotation(first, APPLICATION_SCOPED, false, ctx);
                decl = replace_annotation(&decl, id, scoped);
            }
            let dropped: Vec<NodeId> = found
                .iter()
                .map(|(annotation, _)| annotation.id())
                .filter(|id| Some(*id) != keep)
                .collect();
            decl = edit::remove_annotations_where(&decl, |annotation| dropped.contains(&annotation.id()));
            if let (Some(name), false) = (bean_name, has_name) {
                decl = add_annotation(&decl, &format!("@Named({})", quote_java(&name)), NAMED, AnnotationPosition::Last, ctx);
            }
            for (_, fqn) in found {
                ctx.maybe_remove_import(fqn);
            }
            Visit::Replace(decl)
        })
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipes::rewrite_idempotent;

    #[test]
    fn stereotypes_become_application_scoped() {
        let recipe = stereotype_to_application_scoped();
        let text = "package a;\n\nimport org.springframework.stereotype.Repository;\n\n@Repository\npublic class Orders {\n}\n";
        let out = rewrite_idempotent(&recipe, "Orders.java", text);
        assert_eq!(
            out,
            "package a;\n\nimport jakarta.enterprise.context.ApplicationScoped;\n\n@ApplicationScoped\npublic class Orders {\n}\n"
        );
    }

    #[test]
    fn bean_names_are_kept_as_named() {
        let recipe = stereotype_to_application_scoped();
        let text = "package a;\n\nimport org.springframework.stereotype.Service;\n\n@Service(\"orders\")\npublic class Orders {\n}\n";
        let out = rewrite_idempotent(&recipe, "Orders.java", text);
        assert_eq!(
            out,
            "package a;\n\nimport jakarta.enterprise.context.ApplicationScoped;\nimport jakarta.inject.Named;\n\n@ApplicationScoped\n@Named(\"orders\")\npublic class Orders {\n}\n"
        );
    }

    #[test]
    fn an_existing_scope_wins() {
        let recipe = stereotype_to_application_scoped();
        let text = "import jakarta.inject.Singleton;\nimport org.springframework.stereotype.Component;\n\n@Singleton\n@Component\nclass Clock {\n}\n";
        let out = rewrite_idempotent(&recipe, "Clock.java", text);
        assert_eq!(out, "import jakarta.inject.Singleton;\n\n@Singleton\nclass Clock {\n}\n");
    }

    #[test]
    fn methods_and_fields_are_not_touched() {
        let recipe = stereotype_to_application_scoped();
        let text = "class A {\n    void f() {}\n}\n";
        assert_eq!(rewrite_idempotent(&recipe, "A.java", text), text);
    }
}
