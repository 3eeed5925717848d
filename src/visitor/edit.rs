//! Small structural edits that keep the surrounding layout intact.
//!
//! Every function takes a node by reference and returns the edited copy; the
//! input is never changed. Trivia moves with the element it visually belongs
//! to, so removing the first annotation of a declaration does not leave the
//! declaration glued to the line above.

use super::template::Indentation;
use crate::syntax::ast::simple_name;
use crate::syntax::trivia::{indentation, starts_line};
use crate::syntax::{SyntaxKind, SyntaxNode};

/// Modifier keywords in the order the Java style guides use.
const MODIFIER_ORDER: &[&str] = &[
    "public",
    "protected",
    "private",
    "abstract",
    "default",
    "static",
    "final",
    "sealed",
    "non-sealed",
    "transient",
    "volatile",
    "synchronized",
    "native",
    "strictfp",
];

/// `a.b.C` as a `QualifiedName` node without trivia.
pub fn qualified_name_node(name: &str) -> SyntaxNode {
    let mut children = Vec::new();
    for (i, part) in name.split('.').enumerate() {
        if i > 0 {
            children.push(SyntaxNode::token(SyntaxKind::Punct, "."));
        }
        let kind = if part == "*" {
            SyntaxKind::Punct
        } else {
            SyntaxKind::Ident
        };
        children.push(SyntaxNode::token(kind, part));
    }
    SyntaxNode::composite(SyntaxKind::QualifiedName, children)
}

// ============================================================================
// CHILD LISTS
// ============================================================================

/// Removes child `index`. When the removed child starts a run of siblings of
/// its kind (or is the very first child), the next sibling inherits its
/// leading trivia.
pub fn remove_child(parent: &SyntaxNode, index: usize) -> SyntaxNode {
    let mut children = parent.children().to_vec();
    if index >= children.len() {
        return parent.clone();
    }
    let removed = children.remove(index);
    let starts_run = index == 0
        || (children.get(index).is_some_and(|n| n.kind() == removed.kind())
            && children[index - 1].kind() != removed.kind());
    if starts_run && removed.first_token().is_some() {
        if let Some(next) = children.get_mut(index) {
            *next = next.clone().with_leading_trivia(removed.leading_trivia());
        }
    }
    parent.clone().with_children(children)
}

/// Inserts `node` at `index`; the node keeps whatever trivia it carries.
pub fn insert_child(parent: &SyntaxNode, index: usize, node: SyntaxNode) -> SyntaxNode {
    let mut children = parent.children().to_vec();
    let index = index.min(children.len());
    children.insert(index, node);
    parent.clone().with_children(children)
}

pub fn replace_child(parent: &SyntaxNode, index: usize, node: SyntaxNode) -> SyntaxNode {
    let mut children = parent.children().to_vec();
    if let Some(slot) = children.get_mut(index) {
        *slot = node;
    }
    parent.clone().with_children(children)
}

/// Replaces the first child of `kind` by applying `f` to it.
pub fn map_child(parent: &SyntaxNode, kind: SyntaxKind, f: impl FnOnce(&SyntaxNode) -> SyntaxNode) -> SyntaxNode {
    match parent.child_index(kind) {
        Some(index) => {
            let new = f(&parent.children()[index]);
            replace_child(parent, index, new)
        }
        None => parent.clone(),
    }
}

// ============================================================================
// ANNOTATIONS
// ============================================================================

/// Points an annotation at another type, keeping its arguments and layout.
/// `written` is the name as it should appear in source (simple or qualified).
pub fn rename_annotation(annotation: &SyntaxNode, written: &str, fqn: &str) -> SyntaxNode {
    let renamed = map_child(annotation, SyntaxKind::QualifiedName, |name| {
        qualified_name_node(written).with_leading_trivia(name.leading_trivia())
    });
    renamed.with_ty(fqn)
}

/// Where a new annotation goes among the existing ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationPosition {
    First,
    Last,
}

/// Adds `annotation` to the modifiers of `decl`.
///
/// If the declaration starts on its own line, the annotation gets a line of
/// its own at the same indentation; otherwise it is placed inline.
pub fn insert_annotation(decl: &SyntaxNode, annotation: SyntaxNode, position: AnnotationPosition) -> SyntaxNode {
    let Some(modifiers_index) = decl.child_index(SyntaxKind::Modifiers) else {
        return decl.clone();
    };
    let modifiers = &decl.children()[modifiers_index];
    let annotation_count = modifiers.children_of(SyntaxKind::Annotation).count();
    let slot = match position {
        AnnotationPosition::First => 0,
        AnnotationPosition::Last => modifiers
            .children()
            .iter()
            .rposition(|c| c.kind() == SyntaxKind::Annotation)
            .map_or(0, |i| i + 1),
    };

    if slot == 0 || annotation_count == 0 {
        // New first element: it takes over the declaration's leading trivia
        // and the old first token moves to the next line (or stays inline).
        let leading = decl.leading_trivia().to_string();
        let separator = match indentation(&leading) {
            Some(indent) => format!("{}{}", line_break(&leading), indent),
            None => " ".to_string(),
        };
        let rest = decl.clone().with_leading_trivia(separator);
        let modifiers = insert_child(&rest.children()[modifiers_index], 0, annotation.with_leading_trivia(leading));
        return replace_child(&rest, modifiers_index, modifiers);
    }

    // After the last annotation: copy the separator used before the token
    // that follows the annotations.
    let follower = following_token(decl, modifiers_index, slot);
    let separator = follower.map_or_else(|| " ".to_string(), |t| t.leading_trivia().to_string());
    let separator = if starts_line(&separator) {
        separator
    } else {
        " ".to_string()
    };
    let modifiers = insert_child(modifiers, slot, annotation.with_leading_trivia(separator));
    replace_child(decl, modifiers_index, modifiers)
}

/// Removes every annotation of `decl` for which `remove` holds. When the
/// first annotation goes, the declaration's new first token takes its
/// leading trivia.
pub fn remove_annotations_where(decl: &SyntaxNode, mut remove: impl FnMut(&SyntaxNode) -> bool) -> SyntaxNode {
    let Some(modifiers_index) = decl.child_index(SyntaxKind::Modifiers) else {
        return decl.clone();
    };
    let modifiers = &decl.children()[modifiers_index];
    let leading = decl.leading_trivia().to_string();
    let first_id = decl.first_token().map(SyntaxNode::id);

    let mut removed_first = false;
    let kept: Vec<SyntaxNode> = modifiers
        .children()
        .iter()
        .filter(|child| {
            let drop = child.kind() == SyntaxKind::Annotation && remove(child);
            if drop && child.first_token().map(SyntaxNode::id) == first_id {
                removed_first = true;
            }
            !drop
        })
        .cloned()
        .collect();
    if kept.len() == modifiers.children().len() {
        return decl.clone();
    }
    let edited = replace_child(decl, modifiers_index, modifiers.clone().with_children(kept));
    if removed_first {
        edited.with_leading_trivia(leading)
    } else {
        edited
    }
}

// ============================================================================
// MODIFIERS
// ============================================================================

/// Adds a modifier keyword in canonical order. No-op if present.
pub fn add_modifier(decl: &SyntaxNode, keyword: &str) -> SyntaxNode {
    let Some(modifiers_index) = decl.child_index(SyntaxKind::Modifiers) else {
        return decl.clone();
    };
    let modifiers = &decl.children()[modifiers_index];
    if modifiers.has_token(keyword) {
        return decl.clone();
    }
    let rank = |word: &str| MODIFIER_ORDER.iter().position(|m| *m == word).unwrap_or(MODIFIER_ORDER.len());
    let slot = modifiers
        .children()
        .iter()
        .position(|c| c.token_text().is_some_and(|t| rank(t) > rank(keyword)))
        .unwrap_or(modifiers.children().len());

    // The new keyword takes the trivia of the token it is inserted before;
    // that token is then separated by a single space.
    let follower_trivia = following_token(decl, modifiers_index, slot)
        .map(|t| t.leading_trivia().to_string())
        .unwrap_or_else(|| " ".to_string());
    let keyword_node = SyntaxNode::token_with_trivia(SyntaxKind::Keyword, follower_trivia, keyword);

    let mut children = decl.children().to_vec();
    let mut modifier_children = modifiers.children().to_vec();
    if slot < modifier_children.len() {
        modifier_children[slot] = modifier_children[slot].clone().with_leading_trivia(" ");
    } else if let Some(next) = children[modifiers_index + 1..].iter_mut().find(|c| c.first_token().is_some()) {
        *next = next.clone().with_leading_trivia(" ");
    }
    modifier_children.insert(slot, keyword_node);
    children[modifiers_index] = modifiers.clone().with_children(modifier_children);
    decl.clone().with_children(children)
}

pub fn remove_modifier(decl: &SyntaxNode, keyword: &str) -> SyntaxNode {
    let Some(modifiers_index) = decl.child_index(SyntaxKind::Modifiers) else {
        return decl.clone();
    };
    let modifiers = &decl.children()[modifiers_index];
    let Some(index) = modifiers.children().iter().position(|c| c.token_text() == Some(keyword)) else {
        return decl.clone();
    };
    let leading = modifiers.children()[index].leading_trivia().to_string();
    let mut children = decl.children().to_vec();
    let mut modifier_children = modifiers.children().to_vec();
    modifier_children.remove(index);
    // The token after the removed keyword moves into its place.
    if index < modifier_children.len() {
        modifier_children[index] = modifier_children[index].clone().with_leading_trivia(leading);
    } else if let Some(next) = children[modifiers_index + 1..].iter_mut().find(|c| c.first_token().is_some()) {
        *next = next.clone().with_leading_trivia(leading);
    }
    children[modifiers_index] = modifiers.clone().with_children(modifier_children);
    decl.clone().with_children(children)
}

/// The first token at or after position `slot` of the modifiers list,
/// continuing into the rest of the declaration.
fn following_token(decl: &SyntaxNode, modifiers_index: usize, slot: usize) -> Option<&SyntaxNode> {
    let modifiers = &decl.children()[modifiers_index];
    modifiers.children()[slot.min(modifiers.children().len())..]
        .iter()
        .chain(decl.children()[modifiers_index + 1..].iter())
        .find_map(SyntaxNode::first_token)
}

fn line_break(trivia: &str) -> &'static str {
    if trivia.contains("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}

// ============================================================================
// MEMBERS
// ============================================================================

/// Inserts `member` into a class body after child `after` (an index into the
/// body's children), on its own line at the body's member indentation, with
/// a blank line in front. `newline` is the file's line ending.
pub fn insert_member_after(
    body: &SyntaxNode,
    after: usize,
    member: SyntaxNode,
    indent: &Indentation,
    newline: &str,
) -> SyntaxNode {
    let member_indent = body
        .children()
        .iter()
        .filter(|c| !c.is_token())
        .find_map(|c| indentation(c.leading_trivia()).map(str::to_string))
        .unwrap_or_else(|| {
            let close = body.children().last().map(|c| c.leading_trivia()).unwrap_or_default();
            format!("{}{}", indentation(close).unwrap_or_default(), indent.unit())
        });
    let member = indent.reindent_node(member, &member_indent, newline);
    let member = member.with_leading_trivia(format!("{}{}{}", newline, newline, member_indent));
    let mut body = insert_child(body, after + 1, member);

    // A closing brace glued to the opening one (`{}`) moves to its own line.
    let last = body.children().len() - 1;
    if !starts_line(body.children()[last].leading_trivia()) {
        let close_indent = member_indent
            .strip_suffix(indent.unit())
            .unwrap_or_default()
            .to_string();
        let close = body.children()[last]
            .clone()
            .with_leading_trivia(format!("{}{}", newline, close_indent));
        body = replace_child(&body, last, close);
    }
    body
}

/// The simple name to write for `fqn`.
pub fn written_name(fqn: &str) -> &str {
    simple_name(fqn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::SourceTree;

    fn first(text: &str, kind: SyntaxKind) -> SyntaxNode {
        let tree = SourceTree::parse(text, "A.java").expect("parses");
        tree.root()
            .descendants()
            .find(|n| n.kind() == kind)
            .cloned()
            .expect("node of kind")
    }

    #[test]
    fn removing_the_first_annotation_keeps_line_layout() {
        let field = first("class A {\n\n    @Autowired\n    private Foo foo;\n}", SyntaxKind::FieldDecl);
        let edited = remove_annotations_where(&field, |_| true);
        assert_eq!(edited.print(), "\n\n    private Foo foo;");
    }

    #[test]
    fn removing_a_later_annotation_drops_its_line() {
        let class = first("@A\n@B\nclass C {}", SyntaxKind::ClassDecl);
        let edited = remove_annotations_where(&class, |a| a.significant_text() == "@B");
        assert_eq!(edited.print(), "@A\nclass C {}");
    }

    #[test]
    fn insert_annotation_on_own_line_or_inline() {
        let field = first("class A {\n    private Foo foo;\n}", SyntaxKind::FieldDecl);
        let annotation = first("@Inject class X {}", SyntaxKind::Annotation);
        let edited = insert_annotation(&field, annotation.clone(), AnnotationPosition::First);
        assert_eq!(edited.print(), "\n    @Inject\n    private Foo foo;");

        let param = first("class A { void f(String e) {} }", SyntaxKind::Param);
        let edited = insert_annotation(&param, annotation, AnnotationPosition::First);
        assert_eq!(edited.print(), "@Inject String e");
    }

    #[test]
    fn insert_annotation_after_existing_ones() {
        let method = first("class A {\n    @Produces\n    Foo foo() { return null; }\n}", SyntaxKind::MethodDecl);
        let annotation = first("@Named class X {}", SyntaxKind::Annotation);
        let edited = insert_annotation(&method, annotation, AnnotationPosition::Last);
        assert_eq!(edited.print(), "\n    @Produces\n    @Named\n    Foo foo() { return null; }");
    }

    #[test]
    fn modifiers_are_added_in_canonical_order() {
        let field = first("class A { private Foo foo; }", SyntaxKind::FieldDecl);
        assert_eq!(add_modifier(&field, "final").print(), " private final Foo foo;");

        let bare = first("class A {\n    @Autowired\n    Foo foo;\n}", SyntaxKind::FieldDecl);
        assert_eq!(add_modifier(&bare, "final").print(), "\n    @Autowired\n    final Foo foo;");

        let field = first("class A { static int x; }", SyntaxKind::FieldDecl);
        assert_eq!(add_modifier(&field, "public").print(), " public static int x;");
        assert_eq!(remove_modifier(&field, "static").print(), " int x;");
    }

    #[test]
    fn removing_the_first_import_moves_its_spacing() {
        let tree = SourceTree::parse("package p;\n\nimport a.A;\nimport b.B;\n\nclass C {}", "C.java").expect("parses");
        let edited = remove_child(tree.root(), 1);
        assert_eq!(edited.print(), "package p;\n\nimport b.B;\n\nclass C {}");
        let edited = remove_child(tree.root(), 2);
        assert_eq!(edited.print(), "package p;\n\nimport a.A;\n\nclass C {}");
    }

    #[test]
    fn renaming_keeps_arguments() {
        let annotation = first("@Qualifier(\"x\") class A {}", SyntaxKind::Annotation);
        let renamed = rename_annotation(&annotation, "Named", "jakarta.inject.Named");
        assert_eq!(renamed.print(), "@Named(\"x\")");
        assert_eq!(renamed.ty(), Some("jakarta.inject.Named"));
    }
}
