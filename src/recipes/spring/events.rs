//! Application event listeners become CDI observers.

use super::{annotations_of, EVENT_LISTENER, OBSERVES};
use crate::diagnostics::Diagnostic;
use crate::matcher::Pattern;
use crate::recipe::{RecipeBuilder, RecipeDescriptor};
use crate::syntax::ast::{Annotation, MethodDecl};
use crate::syntax::{SourceKind, SyntaxKind};
use crate::visitor::edit::{self, AnnotationPosition};
use crate::visitor::{Template, Visit};

pub const EVENT_LISTENER_TO_OBSERVES: &str = "recast.spring.EventListenerToObserves";

/// `@EventListener void on(E event)` becomes `void on(@Observes E event)`.
/// Listeners with a condition or an explicit event class list, and listeners
/// without a parameter, are reported instead.
pub fn event_listener_to_observes() -> RecipeDescriptor {
    RecipeBuilder::new(EVENT_LISTENER_TO_OBSERVES)
        .description("Replaces @EventListener methods with @Observes parameters.")
        .applies_to(SourceKind::Java)
        .precondition(Pattern::uses_type(EVENT_LISTENER))
        .rule(
            Pattern::Kind(SyntaxKind::MethodDecl).and(Pattern::annotated(EVENT_LISTENER)),
            |node, _, ctx| {
                let recipe = ctx.recipe().to_string();
                let Some((listener, _)) = annotations_of(node, ctx.scope())
                    .into_iter()
                    .find(|(_, fqn)| fqn.as_deref() == Some(EVENT_LISTENER))
                else {
                    return Visit::Keep;
                };
                let has_args = Annotation::cast(&listener).is_some_and(|a| !a.args().is_empty());
                let has_params = MethodDecl::cast(node).is_some_and(|m| !m.params().is_empty());
                if has_args || !has_params {
                    let reason = if has_args {
                        "@EventListener with attributes needs a manual @Observes rewrite"
                    } else {
                        "@EventListener method has no event parameter"
                    };
                    ctx.report(Diagnostic::ambiguity(&recipe, listener.span(), reason));
                    return Visit::Keep;
                }

                let template = Template::new("@Observes").with_imports([OBSERVES]);
                let observes = match template.annotation() {
                    Ok(observes) => observes,
                    Err(e) => {
                        tracing::warn!(recipe = %recipe, error = %e.message(), "annotation template failed");
                        return Visit::Keep;
                    }
                };
                let stripped = edit::remove_annotations_where(node, |a| a.id() == listener.id());
                let edited = edit::map_child(&stripped, SyntaxKind::ParamList, |list| {
                    match list.child_index(SyntaxKind::Param) {
                        Some(index) => {
                            let param = edit::insert_annotation(&list.children()[index], observes, AnnotationPosition::First);
                            edit::replace_child(list, index, param)
                        }
                        None => list.clone(),
                    }
                });
                ctx.add_template_imports(&template);
                ctx.maybe_remove_import(EVENT_LISTENER);
                Visit::Replace(edited)
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
    fn the_event_parameter_observes() {
        let recipe = event_listener_to_observes();
        let text = "import org.springframework.context.event.EventListener;\n\nclass Audit {\n    @EventListener\n    public void on(OrderPlaced event) {\n    }\n}\n";
        let out = rewrite_idempotent(&recipe, "Audit.java", text);
        assert_eq!(
            out,
            "import jakarta.enterprise.event.Observes;\n\nclass Audit {\n    public void on(@Observes OrderPlaced event) {\n    }\n}\n"
        );
    }

    #[test]
    fn conditional_listeners_are_reported() {
        let recipe = event_listener_to_observes();
        let text = "import org.springframework.context.event.EventListener;\n\nclass Audit {\n    @EventListener(condition = \"#event.large\")\n    void on(OrderPlaced event) {}\n\n    @EventListener\n    void ready() {}\n}\n";
        let (out, run) = rewrite(&recipe, "Audit.java", text);
        assert_eq!(out, text);
        let ambiguities = run
            .diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::MatchAmbiguity)
            .count();
        assert_eq!(ambiguities, 2);
    }
}
