//! `@Autowired` to CDI injection.

use super::{annotations_of, AUTOWIRED, INJECT};
use crate::diagnostics::Diagnostic;
use crate::matcher::{Binding, MatchScope, Pattern};
use crate::recipe::{RecipeBuilder, RecipeDescriptor};
use crate::recipes::java::retarget_annotation;
use crate::syntax::ast::{unwrap_expr, Annotation, ClassDecl, VarDecl};
use crate::syntax::{NodeId, SourceKind, SyntaxKind, SyntaxNode};
use crate::visitor::{edit, Template, Visit};

pub const FIELD_INJECTION_TO_CONSTRUCTOR_INJECTION: &str = "recast.spring.FieldInjectionToConstructorInjection";
pub const AUTOWIRED_TO_INJECT: &str = "recast.spring.AutowiredToInject";

/// `@Autowired(required = false)`.
fn is_optional(annotation: &SyntaxNode) -> bool {
    Annotation::cast(annotation)
        .and_then(|a| a.arg("required"))
        .is_some_and(|arg| unwrap_expr(arg.value).significant_text() == "false")
}

/// The `@Autowired` annotation of a field that can move into a constructor:
/// an instance field with one declarator, no initializer, no annotations
/// besides `@Autowired` and no assignment anywhere else in the class.
fn injectable(field: &SyntaxNode, body: &SyntaxNode, scope: &MatchScope<'_>) -> Option<NodeId> {
    let var = VarDecl::cast(field).filter(|_| field.kind() == SyntaxKind::FieldDecl)?;
    if var.has_modifier("static") || var.has_modifier("final") {
        return None;
    }
    let mut declarators = var.declarators();
    let declarator = declarators.next()?;
    if declarators.next().is_some() || declarator.has_token("=") {
        return None;
    }
    let annotations = annotations_of(field, scope);
    // Qualifiers and the like would be lost on the constructor parameter.
    if annotations.len() != 1 {
        return None;
    }
    let name = var.names().into_iter().next()?;
    if assigned_elsewhere(body, field, &name) {
        return None;
    }
    annotations
        .into_iter()
        .find(|(_, fqn)| fqn.as_deref() == Some(AUTOWIRED))
        .filter(|(annotation, _)| !is_optional(annotation))
        .map(|(annotation, _)| annotation.id())
}

const ASSIGNMENT_OPS: &[&str] = &["=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "++", "--"];

/// True when some member other than `field` writes `name` (`name = ..`,
/// `this.name += ..`, `++name`). A final field cannot be written there.
fn assigned_elsewhere(body: &SyntaxNode, field: &SyntaxNode, name: &str) -> bool {
    body.children().iter().filter(|member| member.id() != field.id()).any(|member| {
        let tokens: Vec<&str> = member.tokens().filter_map(SyntaxNode::token_text).collect();
        tokens.iter().enumerate().any(|(i, token)| {
            if *token != name {
                return false;
            }
            let previous = i.checked_sub(1).map(|p| tokens[p]);
            // `other.name` belongs to another object.
            if previous == Some(".") && (i < 2 || tokens[i - 2] != "this") {
                return false;
            }
            let next = tokens.get(i + 1).copied();
            next.is_some_and(|t| ASSIGNMENT_OPS.contains(&t)) || previous.is_some_and(|t| t == "++" || t == "--")
        })
    })
}

// ============================================================================
// FIELD INJECTION
// ============================================================================

/// Moves `@Autowired` fields of a class without constructors into a
/// generated `@Inject` constructor. The fields become `final` and the
/// constructor goes after the last field.
pub fn field_injection_to_constructor_injection() -> RecipeDescriptor {
    let pattern = Pattern::member(Pattern::Kind(SyntaxKind::FieldDecl).and(Pattern::annotated(AUTOWIRED)));
    RecipeBuilder::new(FIELD_INJECTION_TO_CONSTRUCTOR_INJECTION)
        .description("Turns @Autowired fields into final fields set by an @Inject constructor.")
        .applies_to(SourceKind::Java)
        .precondition(Pattern::uses_type(AUTOWIRED))
        .rule(pattern, |node, bindings, ctx| {
            let Some(class) = ClassDecl::cast(node) else {
                return Visit::Keep;
            };
            if class.keyword() != "class" || !class.constructors().is_empty() {
                return Visit::Keep;
            }
            let Some(body) = class.body() else {
                return Visit::Keep;
            };
            let matched: Vec<NodeId> = bindings
                .list("members")
                .unwrap_or_default()
                .iter()
                .filter_map(|b| match b {
                    Binding::Node(member) => Some(member.id()),
                    _ => None,
                })
                .collect();

            let mut children = body.children().to_vec();
            let mut params = Vec::new();
            for child in children.iter_mut() {
                if !matched.contains(&child.id()) {
                    continue;
                }
                let Some(autowired) = injectable(child, body, ctx.scope()) else {
                    continue;
                };
                let Some(var) = VarDecl::cast(child) else {
                    continue;
                };
                let (Some(ty), Some(name)) = (var.type_ref(), var.names().into_iter().next()) else {
                    continue;
                };
                params.push((ty.syntax().text(), name));
                let stripped = edit::remove_annotations_where(child, |a| a.id() == autowired);
                *child = edit::add_modifier(&stripped, "final");
            }
            if params.is_empty() {
                return Visit::Keep;
            }

            let visibility = if class.has_modifier("public") { "public " } else { "" };
            let signature = params
                .iter()
                .map(|(ty, name)| format!("{} {}", ty, name))
                .collect::<Vec<_>>()
                .join(", ");
            let assignments: String = params
                .iter()
                .map(|(_, name)| format!("    this.{0} = {0};\n", name))
                .collect();
            let code = format!("@Inject\n{}{}({}) {{\n{}}}", visibility, class.name(), signature, assignments);
            let template = Template::new(code).with_imports([INJECT]);
            let constructor = match template.member() {
                Ok(constructor) => constructor,
                Err(e) => {
                    tracing::warn!(recipe = %ctx.recipe(), error = %e.message(), "constructor template failed");
                    return Visit::Keep;
                }
            };

            let last_field = children
                .iter()
                .rposition(|c| c.kind() == SyntaxKind::FieldDecl)
                .unwrap_or(0);
            let body_index = node.child_index(SyntaxKind::ClassBody);
            let body = body.clone().with_children(children);
            let newline = ctx.file().line_ending.as_str();
            let body = edit::insert_member_after(&body, last_field, constructor, &ctx.file().indent, newline);
            ctx.add_template_imports(&template);
            ctx.maybe_remove_import(AUTOWIRED);
            match body_index {
                Some(index) => Visit::Replace(edit::replace_child(node, index, body)),
                None => Visit::Keep,
            }
        })
        .build()
}

// ============================================================================
// AUTOWIRED
// ============================================================================

/// Every remaining `@Autowired` (constructors, setters, fields that could not
/// move) becomes `@Inject`. `required = false` has no direct counterpart
/// and is left for a person to decide.
pub fn autowired_to_inject() -> RecipeDescriptor {
    RecipeBuilder::new(AUTOWIRED_TO_INJECT)
        .description("Replaces @Autowired with @Inject.")
        .applies_to(SourceKind::Java)
        .precondition(Pattern::uses_type(AUTOWIRED))
        .rule(Pattern::annotation(AUTOWIRED), |node, _, ctx| {
            if is_optional(node) {
                let recipe = ctx.recipe().to_string();
                ctx.report(Diagnostic::ambiguity(
                    &recipe,
                    node.span(),
                    "@Autowired(required = false) has no @Inject equivalent; use Instance<T> instead",
                ));
                return Visit::Keep;
            }
            ctx.maybe_remove_import(AUTOWIRED);
            Visit::Replace(retarget_annotation(node, INJECT, false, ctx))
        })
        .build()
}
