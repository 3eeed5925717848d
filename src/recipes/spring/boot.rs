//! The Spring Boot application class and its bootstrap call.

use once_cell::sync::Lazy;

use super::{QUARKUS, SPRING_APPLICATION, SPRING_BOOT_APPLICATION};
use crate::diagnostics::Diagnostic;
use crate::matcher::{MatchScope, Pattern};
use crate::recipe::{RecipeBuilder, RecipeDescriptor};
use crate::syntax::ast::{unwrap_expr, MethodCall, MethodDecl};
use crate::syntax::{SourceKind, SyntaxKind, SyntaxNode};
use crate::types::Resolution;
use crate::visitor::{edit, Template, Visit};

pub const REMOVE_SPRING_BOOT_APPLICATION: &str = "recast.spring.RemoveSpringBootApplication";
pub const SPRING_APPLICATION_RUN_TO_QUARKUS_RUN: &str = "recast.spring.SpringApplicationRunToQuarkusRun";
pub const REMOVE_EMPTY_MAIN_METHOD: &str = "recast.spring.RemoveEmptyMainMethod";

static SPRING_APPLICATION_RUN: Lazy<Pattern> = Lazy::new(|| {
    Pattern::method_call(&format!("{} run(..)", SPRING_APPLICATION)).expect("SpringApplication.run pattern")
});

/// `public static void main(String[] args)` or the varargs form.
fn is_main(method: &MethodDecl<'_>) -> bool {
    let params = method.params();
    let [param] = params.as_slice() else {
        return false;
    };
    let string_array = param
        .type_ref()
        .is_some_and(|t| t.simple_name() == "String" && (t.array_dims() == 1 || param.is_varargs()));
    method.name() == "main"
        && method.has_modifier("public")
        && method.has_modifier("static")
        && method.return_type().is_some_and(|t| t.name() == "void")
        && string_array
}

/// The body of `main` is nothing but `SpringApplication.run(..);`.
fn only_runs_spring(method: &MethodDecl<'_>, scope: &MatchScope<'_>, enclosing: Option<&str>) -> bool {
    let statements = method.statements();
    let [statement] = statements.as_slice() else {
        return false;
    };
    match statement.children() {
        [call, semi] if semi.token_text() == Some(";") => {
            SPRING_APPLICATION_RUN.evaluate(call, scope, enclosing).is_match()
        }
        _ => false,
    }
}

fn enclosing_type(node: Option<&SyntaxNode>) -> Option<String> {
    node.and_then(SyntaxNode::ty).map(str::to_string)
}

// ============================================================================
// @SpringBootApplication
// ============================================================================

/// Removes `@SpringBootApplication` and a `main` method whose only job is
/// `SpringApplication.run(..)`; Quarkus bootstraps the application itself.
pub fn remove_spring_boot_application() -> RecipeDescriptor {
    RecipeBuilder::new(REMOVE_SPRING_BOOT_APPLICATION)
        .description("Removes @SpringBootApplication and the main method that only starts Spring.")
        .applies_to(SourceKind::Java)
        .precondition(Pattern::uses_type(SPRING_BOOT_APPLICATION).or(Pattern::uses_type(SPRING_APPLICATION)))
        .rule(
            Pattern::Kind(SyntaxKind::ClassDecl).and(Pattern::annotated(SPRING_BOOT_APPLICATION)),
            |node, _, ctx| {
                let scope = ctx.scope();
                let edited = edit::remove_annotations_where(node, |annotation| {
                    matches!(scope.type_of(annotation), Resolution::Resolved(fqn) if fqn == SPRING_BOOT_APPLICATION)
                });
                ctx.maybe_remove_import(SPRING_BOOT_APPLICATION);
                Visit::Replace(edited)
            },
        )
        .rule(Pattern::Kind(SyntaxKind::MethodDecl), |node, _, ctx| {
            let Some(method) = MethodDecl::cast(node) else {
                return Visit::Keep;
            };
            let enclosing = enclosing_type(ctx.enclosing(SyntaxKind::ClassDecl));
            if !is_main(&method) || !only_runs_spring(&method, ctx.scope(), enclosing.as_deref()) {
                return Visit::Keep;
            }
            tracing::debug!(recipe = %ctx.recipe(), "removing Spring main method");
            ctx.maybe_remove_import(SPRING_APPLICATION);
            Visit::Remove
        })
        .build()
}

// ============================================================================
// SpringApplication.run
// ============================================================================

/// `SpringApplication.run(App.class, args);` becomes `Quarkus.run(args);`.
/// The call must be a statement of its own: `Quarkus.run` returns nothing,
/// so a call whose context is used is reported instead.
pub fn spring_application_run_to_quarkus_run() -> RecipeDescriptor {
    RecipeBuilder::new(SPRING_APPLICATION_RUN_TO_QUARKUS_RUN)
        .description("Replaces SpringApplication.run(..) with Quarkus.run(..).")
        .applies_to(SourceKind::Java)
        .precondition(Pattern::uses_type(SPRING_APPLICATION))
        .rule(SPRING_APPLICATION_RUN.clone(), |node, _, ctx| {
            let recipe = ctx.recipe().to_string();
            if ctx.parent().map(SyntaxNode::kind) != Some(SyntaxKind::Statement) {
                ctx.report(Diagnostic::ambiguity(
                    &recipe,
                    node.span(),
                    "the result of SpringApplication.run is used; Quarkus.run returns nothing",
                ));
                return Visit::Keep;
            }
            let Some(call) = MethodCall::cast(node) else {
                return Visit::Keep;
            };
            let rest: Vec<String> = call.args().into_iter().skip(1).map(SyntaxNode::text).collect();
            let template = Template::new(format!("Quarkus.run({})", rest.join(", "))).with_imports([QUARKUS]);
            let expr = match template.expression() {
                Ok(expr) => expr,
                Err(e) => {
                    tracing::warn!(recipe = %recipe, error = %e.message(), "expression template failed");
                    return Visit::Keep;
                }
            };
            ctx.add_template_imports(&template);
            ctx.maybe_remove_import(SPRING_APPLICATION);
            Visit::Replace(unwrap_expr(&expr).clone().with_leading_trivia(node.leading_trivia()))
        })
        .build()
}

// ============================================================================
// EMPTY MAIN
// ============================================================================

/// Removes `public static void main(String[] args) {}`.
pub fn remove_empty_main_method() -> RecipeDescriptor {
    RecipeBuilder::new(REMOVE_EMPTY_MAIN_METHOD)
        .description("Removes main methods with an empty body.")
        .applies_to(SourceKind::Java)
        .rule(Pattern::Kind(SyntaxKind::MethodDecl), |node, _, _| match MethodDecl::cast(node) {
            Some(method) if is_main(&method) && method.body().is_some() && method.statements().is_empty() => {
                Visit::Remove
            }
            _ => Visit::Keep,
        })
        .build()
}
