//! Generic Java recipes, configured through options.

use std::sync::Arc;

use serde::Deserialize;

use super::factory;
use crate::matcher::{Pattern, TypePattern};
use crate::recipe::{RecipeBuilder, RecipeDescriptor, RecipeRegistry};
use crate::syntax::ast::{simple_name, Annotation, MethodCall};
use crate::syntax::{SourceKind, SyntaxKind, SyntaxNode};
use crate::types::Resolution;
use crate::visitor::{edit, Visit, VisitContext};
use crate::RecastError;

pub const CHANGE_ANNOTATION_TYPE: &str = "recast.java.ChangeAnnotationType";
pub const REMOVE_ANNOTATION: &str = "recast.java.RemoveAnnotation";
pub const REMOVE_IMPORT: &str = "recast.java.RemoveImport";
pub const CHANGE_METHOD_NAME: &str = "recast.java.ChangeMethodName";

pub fn register(registry: &mut RecipeRegistry) {
    registry.register_factory(
        CHANGE_ANNOTATION_TYPE,
        "Changes an annotation to another type, keeping its arguments.",
        factory(CHANGE_ANNOTATION_TYPE, |o| Ok(change_annotation_type(o).into_arc())),
    );
    registry.register_factory(
        REMOVE_ANNOTATION,
        "Removes annotations of a type (or type pattern) from declarations.",
        factory(REMOVE_ANNOTATION, |o| Ok(remove_annotation(o).into_arc())),
    );
    registry.register_factory(
        REMOVE_IMPORT,
        "Removes an import unless the type is still referenced.",
        factory(REMOVE_IMPORT, |o| Ok(remove_import(o).into_arc())),
    );
    registry.register_factory(
        CHANGE_METHOD_NAME,
        "Renames invocations of methods matching a signature pattern.",
        factory(CHANGE_METHOD_NAME, |o| change_method_name(o).map(RecipeDescriptor::into_arc)),
    );
}

/// Points `annotation` at `fqn`. The new name is written the way the old
/// one was: qualified stays qualified, a simple name gets an import.
pub fn retarget_annotation(
    annotation: &SyntaxNode,
    fqn: &str,
    keep_args: bool,
    ctx: &mut VisitContext<'_>,
) -> SyntaxNode {
    let qualified = Annotation::cast(annotation).is_some_and(|a| a.is_qualified());
    let written = if qualified {
        fqn
    } else {
        ctx.add_import(fqn);
        simple_name(fqn)
    };
    let renamed = edit::rename_annotation(annotation, written, fqn);
    match renamed.child_index(SyntaxKind::AnnotationArgs) {
        Some(index) if !keep_args => edit::remove_child(&renamed, index),
        _ => renamed,
    }
}

// ============================================================================
// CHANGE ANNOTATION TYPE
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChangeAnnotationType {
    pub old_type: String,
    pub new_type: String,
}

pub fn change_annotation_type(options: ChangeAnnotationType) -> RecipeDescriptor {
    let ChangeAnnotationType { old_type, new_type } = options;
    RecipeBuilder::new(CHANGE_ANNOTATION_TYPE)
        .description(format!("Changes @{} to @{}.", old_type, new_type))
        .applies_to(SourceKind::Java)
        .precondition(Pattern::uses_type(old_type.as_str()))
        .rule(Pattern::annotation(old_type.as_str()), move |node, _, ctx| {
            ctx.maybe_remove_import(old_type.clone());
            Visit::Replace(retarget_annotation(node, &new_type, true, ctx))
        })
        .build()
}

// ============================================================================
// REMOVE ANNOTATION
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoveAnnotation {
    /// An FQN, `pkg.*` or `pkg..*`.
    pub annotation_type: String,
}

pub fn remove_annotation(options: RemoveAnnotation) -> RecipeDescriptor {
    let pattern = TypePattern::new(&options.annotation_type);
    RecipeBuilder::new(REMOVE_ANNOTATION)
        .description(format!("Removes @{}.", options.annotation_type))
        .applies_to(SourceKind::Java)
        .precondition(Pattern::uses_type(pattern.clone()))
        .rule(Pattern::annotated(pattern.clone()), move |node, _, ctx| {
            let mut removed = Vec::new();
            let scope = ctx.scope();
            let edited = edit::remove_annotations_where(node, |annotation| match scope.type_of(annotation) {
                Resolution::Resolved(fqn) if pattern.matches(&fqn) => {
                    removed.push(fqn);
                    true
                }
                _ => false,
            });
            for fqn in removed {
                ctx.maybe_remove_import(fqn);
            }
            Visit::Replace(edited)
        })
        .build()
}

// ============================================================================
// REMOVE IMPORT
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoveImport {
    /// Fully qualified name of a single-type import.
    pub type_name: String,
}

/// Removes `import type_name;`. The recipe does not run at all while the
/// file still refers to the type.
pub fn remove_import(options: RemoveImport) -> RecipeDescriptor {
    let fqn = options.type_name;
    RecipeBuilder::new(REMOVE_IMPORT)
        .description(format!("Removes the import of {}.", fqn))
        .applies_to(SourceKind::Java)
        .precondition(Pattern::contains(Pattern::import(fqn.as_str())))
        .precondition(!Pattern::type_referenced(fqn.as_str()))
        .rule(Pattern::import(fqn.as_str()), move |_, bindings, ctx| {
            if bindings.text("import") == Some(fqn.as_str()) {
                ctx.maybe_remove_import(fqn.clone());
            }
            Visit::Keep
        })
        .build()
}

// ============================================================================
// CHANGE METHOD NAME
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChangeMethodName {
    /// Signature pattern, e.g. `com.acme.Repo find*(..)`.
    pub method_pattern: String,
    pub new_name: String,
}

/// Renames matching invocations. Declarations are left alone; rename them
/// in the declaring project.
pub fn change_method_name(options: ChangeMethodName) -> Result<RecipeDescriptor, RecastError> {
    let pattern = Pattern::method_call(&options.method_pattern)?;
    let new_name: Arc<str> = options.new_name.into();
    Ok(RecipeBuilder::new(CHANGE_METHOD_NAME)
        .description(format!("Renames calls of {} to {}.", options.method_pattern, new_name))
        .applies_to(SourceKind::Java)
        .rule(pattern, move |node, bindings, _| {
            if bindings.text("name") == Some(new_name.as_ref()) {
                return Visit::Keep;
            }
            let Some(token) = MethodCall::cast(node).and_then(|call| call.name_token()) else {
                return Visit::Keep;
            };
            let Some(index) = node.children().iter().position(|c| c.same_node(token)) else {
                return Visit::Keep;
            };
            let renamed = token.clone().with_text(new_name.clone());
            Visit::Replace(edit::replace_child(node, index, renamed))
        })
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;
    use crate::recipes::{rewrite, rewrite_idempotent};

    #[test]
    fn change_annotation_type_swaps_imports_and_keeps_arguments() {
        let recipe = change_annotation_type(ChangeAnnotationType {
            old_type: "javax.inject.Named".into(),
            new_type: "jakarta.inject.Named".into(),
        });
        let text = "package p;\n\nimport javax.inject.Named;\n\n@Named(\"shop\")\nclass Shop {}\n";
        let out = rewrite_idempotent(&recipe, "Shop.java", text);
        assert_eq!(out, "package p;\n\nimport jakarta.inject.Named;\n\n@Named(\"shop\")\nclass Shop {}\n");
    }

    #[test]
    fn qualified_annotations_stay_qualified() {
        let recipe = change_annotation_type(ChangeAnnotationType {
            old_type: "a.Old".into(),
            new_type: "b.New".into(),
        });
        let text = "@a.Old\nclass A {}\n";
        let out = rewrite_idempotent(&recipe, "A.java", text);
        assert_eq!(out, "@b.New\nclass A {}\n");
    }

    #[test]
    fn remove_annotation_by_package_pattern() {
        let recipe = remove_annotation(RemoveAnnotation {
            annotation_type: "lombok.*".into(),
        });
        let text = "import lombok.Data;\nimport lombok.Getter;\n\n@Data\npublic class A {\n    @Getter\n    private int x;\n}\n";
        let out = rewrite_idempotent(&recipe, "A.java", text);
        assert_eq!(out, "public class A {\n    private int x;\n}\n");
    }

    #[test]
    fn remove_import_is_skipped_while_the_type_is_used() {
        let recipe = remove_import(RemoveImport {
            type_name: "java.util.List".into(),
        });
        let used = "import java.util.List;\n\nclass A {\n    List<String> names;\n}\n";
        let (out, run) = rewrite(&recipe, "A.java", used);
        assert_eq!(out, used);
        assert!(!run.changed());

        let unused = "import java.util.List;\nimport java.util.Map;\n\nclass A {\n    Map<String, String> names;\n}\n";
        let out = rewrite_idempotent(&recipe, "A.java", unused);
        assert_eq!(out, "import java.util.Map;\n\nclass A {\n    Map<String, String> names;\n}\n");
    }

    #[test]
    fn change_method_name_renames_matching_calls_only() {
        let recipe = change_method_name(ChangeMethodName {
            method_pattern: "com.acme.Repo findAll(..)".into(),
            new_name: "listAll".into(),
        })
        .expect("valid pattern");
        let text = "import com.acme.Repo;\n\nclass A {\n    Repo repo;\n    Other other;\n    void f() {\n        repo.findAll();\n        other.findAll();\n    }\n}\n";
        let (out, run) = rewrite(&recipe, "A.java", text);
        assert!(out.contains("repo.listAll();"));
        assert!(out.contains("other.findAll();"));
        assert!(run
            .diagnostics
            .iter()
            .all(|d| d.kind == DiagnosticKind::MatchAmbiguity || d.kind == DiagnosticKind::TransformConflict));
    }

    #[test]
    fn options_deserialize_from_yaml() {
        let value: serde_yaml::Value =
            serde_yaml::from_str("old_type: a.B\nnew_type: c.D\n").expect("yaml");
        let options: ChangeAnnotationType = crate::recipes::options(CHANGE_ANNOTATION_TYPE, Some(&value)).expect("options");
        assert_eq!(options.new_type, "c.D");
        let bad: serde_yaml::Value = serde_yaml::from_str("old: a.B\n").expect("yaml");
        assert!(crate::recipes::options::<ChangeAnnotationType>(CHANGE_ANNOTATION_TYPE, Some(&bad)).is_err());
    }
}
