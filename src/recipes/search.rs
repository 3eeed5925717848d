//! Search-only recipes: they mark what they find and never edit.

use serde::Deserialize;

use super::factory;
use crate::matcher::Pattern;
use crate::recipe::{RecipeBuilder, RecipeDescriptor, RecipeRegistry};
use crate::syntax::ast::Annotation;
use crate::syntax::SourceKind;
use crate::visitor::Visit;

pub const FIND_ANNOTATIONS: &str = "recast.search.FindAnnotations";

pub fn register(registry: &mut RecipeRegistry) {
    registry.register_factory(
        FIND_ANNOTATIONS,
        "Marks every annotation of a type (or type pattern) as a search result.",
        factory(FIND_ANNOTATIONS, |o| Ok(find_annotations(o).into_arc())),
    );
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FindAnnotations {
    pub annotation_type: String,
}

pub fn find_annotations(options: FindAnnotations) -> RecipeDescriptor {
    RecipeBuilder::new(FIND_ANNOTATIONS)
        .description(format!("Finds @{}.", options.annotation_type))
        .applies_to(SourceKind::Java)
        .precondition(Pattern::uses_type(options.annotation_type.as_str()))
        .rule(Pattern::annotation(options.annotation_type.as_str()), |node, bindings, ctx| {
            let written = Annotation::cast(node).map(|a| a.name()).unwrap_or_default();
            let description = match bindings.text("type") {
                Some(fqn) if fqn != written => format!("@{} ({})", written, fqn),
                _ => format!("@{}", written),
            };
            ctx.search_result(node, Some(description));
            Visit::Keep
        })
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::run_recipe;
    use crate::syntax::{Marker, SourceTree};
    use crate::types::{attribute, TypeTable};
    use crate::visitor::FileInfo;

    #[test]
    fn search_marks_without_editing() {
        let recipe = find_annotations(FindAnnotations {
            annotation_type: "org.springframework.beans.factory.annotation.*".into(),
        });
        let text = "import org.springframework.beans.factory.annotation.Autowired;\n\nclass A {\n    @Autowired\n    Foo foo;\n    @Deprecated\n    Bar bar;\n}\n";
        let mut tree = SourceTree::parse(text, "A.java").expect("parses");
        let table = TypeTable::new();
        let root = attribute(tree.root().clone(), &table);
        tree.set_root(root);
        let file = FileInfo::of("A.java", tree.kind(), tree.root(), tree.line_ending());
        let run = run_recipe(&recipe, &mut tree, &file, &table);

        assert_eq!(tree.print(), text);
        assert!(!run.changed());
        let found = tree.markers().search_results();
        assert_eq!(found.len(), 1);
        match found[0].1 {
            Marker::SearchResult { description, .. } => assert_eq!(
                description.as_deref(),
                Some("@Autowired (org.springframework.beans.factory.annotation.Autowired)")
            ),
            other => panic!("unexpected marker {:?}", other),
        }
    }
}
