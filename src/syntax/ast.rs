//! Typed read-only views over the uniform tree.
//!
//! A view is a borrowed node of a known kind with accessors for the parts
//! recipes care about. Views never own or copy the tree; edits go through
//! [`crate::visitor::edit`].

use super::properties::unescape;
use super::{SyntaxKind, SyntaxNode};

macro_rules! view {
    ($(#[$meta:meta])* $name:ident => $($kind:ident)|+) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name<'a>(&'a SyntaxNode);

        impl<'a> $name<'a> {
            pub fn cast(node: &'a SyntaxNode) -> Option<Self> {
                matches!(node.kind(), $(SyntaxKind::$kind)|+).then_some(Self(node))
            }

            pub fn syntax(&self) -> &'a SyntaxNode {
                self.0
            }
        }
    };
}

view!(CompilationUnit => CompilationUnit);
view!(ImportDecl => ImportDecl);
view!(
    /// Class, interface, enum, record or annotation type declaration.
    ClassDecl => ClassDecl
);
view!(Modifiers => Modifiers);
view!(Annotation => Annotation);
view!(MethodDecl => MethodDecl);
view!(
    /// Field or local variable declaration.
    VarDecl => FieldDecl | LocalVarDecl
);
view!(Param => Param);
view!(TypeRef => TypeRef);
view!(MethodCall => MethodCall);
view!(PropertyEntry => PropertyEntry);

// ============================================================================
// COMPILATION UNIT
// ============================================================================

impl<'a> CompilationUnit<'a> {
    pub fn package_name(&self) -> Option<String> {
        self.0
            .child(SyntaxKind::PackageDecl)?
            .child(SyntaxKind::QualifiedName)
            .map(SyntaxNode::significant_text)
    }

    pub fn imports(&self) -> impl Iterator<Item = ImportDecl<'a>> + 'a {
        self.0.children().iter().filter_map(ImportDecl::cast)
    }

    /// Top-level type declarations.
    pub fn types(&self) -> impl Iterator<Item = ClassDecl<'a>> + 'a {
        self.0.children().iter().filter_map(ClassDecl::cast)
    }
}

impl<'a> ImportDecl<'a> {
    /// The imported name as written, e.g. `java.util.List` or `java.util.*`.
    pub fn name(&self) -> String {
        self.0
            .child(SyntaxKind::QualifiedName)
            .map(SyntaxNode::significant_text)
            .unwrap_or_default()
    }

    pub fn is_static(&self) -> bool {
        self.0.has_token("static")
    }

    pub fn is_wildcard(&self) -> bool {
        self.name().ends_with(".*")
    }

    /// Package of a wildcard import, or the qualifier of a single-type import.
    pub fn qualifier(&self) -> String {
        let name = self.name();
        let name = name.strip_suffix(".*").unwrap_or(&name);
        match name.rfind('.') {
            Some(idx) if !self.is_wildcard() => name[..idx].to_string(),
            _ => name.to_string(),
        }
    }

    pub fn simple_name(&self) -> String {
        simple_name(&self.name()).to_string()
    }
}

// ============================================================================
// DECLARATIONS
// ============================================================================

impl<'a> ClassDecl<'a> {
    pub fn name(&self) -> String {
        self.0
            .children()
            .iter()
            .find(|c| c.kind() == SyntaxKind::Ident)
            .and_then(|c| c.token_text())
            .unwrap_or_default()
            .to_string()
    }

    /// `class`, `interface`, `enum`, `record` or `@interface`.
    pub fn keyword(&self) -> &'a str {
        for child in self.0.children() {
            match child.token_text() {
                Some("class") => return "class",
                Some("interface") if self.0.has_token("@") => return "@interface",
                Some("interface") => return "interface",
                Some("enum") => return "enum",
                Some("record") => return "record",
                _ => {}
            }
        }
        "class"
    }

    pub fn modifiers(&self) -> Option<Modifiers<'a>> {
        self.0.child(SyntaxKind::Modifiers).and_then(Modifiers::cast)
    }

    pub fn has_modifier(&self, keyword: &str) -> bool {
        self.modifiers().is_some_and(|m| m.has(keyword))
    }

    /// Types in the `extends` and `implements` clauses.
    pub fn supertypes(&self) -> Vec<TypeRef<'a>> {
        self.0
            .children()
            .iter()
            .filter(|c| {
                matches!(
                    c.kind(),
                    SyntaxKind::ExtendsClause | SyntaxKind::ImplementsClause
                )
            })
            .flat_map(|clause| clause.children().iter().filter_map(TypeRef::cast))
            .collect()
    }

    pub fn body(&self) -> Option<&'a SyntaxNode> {
        self.0.child(SyntaxKind::ClassBody)
    }

    /// Members of the body, without braces and enum constants.
    pub fn members(&self) -> Vec<&'a SyntaxNode> {
        self.body()
            .map(|body| {
                body.children()
                    .iter()
                    .filter(|c| !c.is_token() && c.kind() != SyntaxKind::EnumConstants)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn fields(&self) -> Vec<VarDecl<'a>> {
        self.members().into_iter().filter_map(VarDecl::cast).collect()
    }

    pub fn methods(&self) -> Vec<MethodDecl<'a>> {
        self.members()
            .into_iter()
            .filter_map(MethodDecl::cast)
            .collect()
    }

    pub fn constructors(&self) -> Vec<MethodDecl<'a>> {
        self.methods()
            .into_iter()
            .filter(MethodDecl::is_constructor)
            .collect()
    }
}

impl<'a> Modifiers<'a> {
    pub fn annotations(&self) -> impl Iterator<Item = Annotation<'a>> + 'a {
        self.0.children().iter().filter_map(Annotation::cast)
    }

    pub fn keywords(&self) -> Vec<&'a str> {
        self.0
            .children()
            .iter()
            .filter_map(|c| c.token_text())
            .collect()
    }

    pub fn has(&self, keyword: &str) -> bool {
        self.0.has_token(keyword)
    }
}

/// One argument of an annotation. `name` is `None` for the single-element
/// shorthand `@A("x")`, which is the element named `value`.
#[derive(Debug, Clone, Copy)]
pub struct AnnotationArg<'a> {
    pub name: Option<&'a str>,
    pub value: &'a SyntaxNode,
}

impl AnnotationArg<'_> {
    pub fn element_name(&self) -> &str {
        self.name.unwrap_or("value")
    }

    /// The string value if the argument is a single string literal.
    pub fn string_value(&self) -> Option<String> {
        string_literal_value(self.value)
    }
}

impl<'a> Annotation<'a> {
    /// The annotation type as written: `Service` or `org.x.Service`.
    pub fn name(&self) -> String {
        self.0
            .child(SyntaxKind::QualifiedName)
            .map(SyntaxNode::significant_text)
            .unwrap_or_default()
    }

    pub fn simple_name(&self) -> String {
        simple_name(&self.name()).to_string()
    }

    pub fn is_qualified(&self) -> bool {
        self.name().contains('.')
    }

    pub fn args(&self) -> Vec<AnnotationArg<'a>> {
        let Some(list) = self.0.child(SyntaxKind::AnnotationArgs) else {
            return Vec::new();
        };
        list.children()
            .iter()
            .filter_map(|child| match child.kind() {
                SyntaxKind::AnnotationPair => {
                    let children = child.children();
                    Some(AnnotationArg {
                        name: children.first().and_then(|n| n.token_text()),
                        value: children.get(2)?,
                    })
                }
                SyntaxKind::Expr => Some(AnnotationArg {
                    name: None,
                    value: child,
                }),
                _ => None,
            })
            .collect()
    }

    pub fn arg(&self, element: &str) -> Option<AnnotationArg<'a>> {
        self.args().into_iter().find(|a| a.element_name() == element)
    }
}

impl<'a> MethodDecl<'a> {
    /// The identifier directly in front of the parameter list (or body, for
    /// compact record constructors).
    pub fn name(&self) -> String {
        self.name_token()
            .and_then(|t| t.token_text())
            .unwrap_or_default()
            .to_string()
    }

    pub fn name_token(&self) -> Option<&'a SyntaxNode> {
        let children = self.0.children();
        let end = children
            .iter()
            .position(|c| matches!(c.kind(), SyntaxKind::ParamList | SyntaxKind::Block))?;
        children[..end]
            .iter()
            .rev()
            .find(|c| c.kind() == SyntaxKind::Ident)
    }

    pub fn return_type(&self) -> Option<TypeRef<'a>> {
        self.0.child(SyntaxKind::TypeRef).and_then(TypeRef::cast)
    }

    pub fn is_constructor(&self) -> bool {
        self.return_type().is_none()
    }

    pub fn modifiers(&self) -> Option<Modifiers<'a>> {
        self.0.child(SyntaxKind::Modifiers).and_then(Modifiers::cast)
    }

    pub fn has_modifier(&self, keyword: &str) -> bool {
        self.modifiers().is_some_and(|m| m.has(keyword))
    }

    pub fn params(&self) -> Vec<Param<'a>> {
        self.0
            .child(SyntaxKind::ParamList)
            .map(|list| list.children().iter().filter_map(Param::cast).collect())
            .unwrap_or_default()
    }

    pub fn body(&self) -> Option<&'a SyntaxNode> {
        self.0.child(SyntaxKind::Block)
    }

    /// Statements of the body, without braces.
    pub fn statements(&self) -> Vec<&'a SyntaxNode> {
        self.body()
            .map(|b| b.children().iter().filter(|c| !c.is_token()).collect())
            .unwrap_or_default()
    }
}

impl<'a> VarDecl<'a> {
    pub fn modifiers(&self) -> Option<Modifiers<'a>> {
        self.0.child(SyntaxKind::Modifiers).and_then(Modifiers::cast)
    }

    pub fn has_modifier(&self, keyword: &str) -> bool {
        self.modifiers().is_some_and(|m| m.has(keyword))
    }

    pub fn type_ref(&self) -> Option<TypeRef<'a>> {
        self.0.child(SyntaxKind::TypeRef).and_then(TypeRef::cast)
    }

    pub fn names(&self) -> Vec<String> {
        self.0
            .children_of(SyntaxKind::VarDeclarator)
            .filter_map(|d| d.children().first()?.token_text().map(str::to_string))
            .collect()
    }

    pub fn declarators(&self) -> impl Iterator<Item = &'a SyntaxNode> + 'a {
        self.0.children_of(SyntaxKind::VarDeclarator)
    }
}

impl<'a> Param<'a> {
    pub fn modifiers(&self) -> Option<Modifiers<'a>> {
        self.0.child(SyntaxKind::Modifiers).and_then(Modifiers::cast)
    }

    pub fn type_ref(&self) -> Option<TypeRef<'a>> {
        self.0.child(SyntaxKind::TypeRef).and_then(TypeRef::cast)
    }

    pub fn name(&self) -> String {
        self.0
            .children()
            .iter()
            .rev()
            .find(|c| matches!(c.kind(), SyntaxKind::Ident | SyntaxKind::Keyword))
            .and_then(|c| c.token_text())
            .unwrap_or_default()
            .to_string()
    }

    pub fn is_varargs(&self) -> bool {
        self.0.has_token("...")
    }
}

impl<'a> TypeRef<'a> {
    /// The type name without type arguments or dimensions.
    pub fn name(&self) -> String {
        match self.0.child(SyntaxKind::QualifiedName) {
            Some(name) => name.significant_text(),
            None => self
                .0
                .children()
                .iter()
                .find(|c| c.kind() == SyntaxKind::Keyword)
                .and_then(|c| c.token_text())
                .unwrap_or_default()
                .to_string(),
        }
    }

    pub fn simple_name(&self) -> String {
        simple_name(&self.name()).to_string()
    }

    pub fn is_primitive(&self) -> bool {
        self.0.child(SyntaxKind::QualifiedName).is_none()
    }

    pub fn array_dims(&self) -> usize {
        self.0
            .children()
            .iter()
            .filter(|c| c.token_text() == Some("["))
            .count()
    }
}

impl<'a> MethodCall<'a> {
    pub fn name_token(&self) -> Option<&'a SyntaxNode> {
        let children = self.0.children();
        let args = children
            .iter()
            .position(|c| c.kind() == SyntaxKind::ArgList)?;
        children[..args].last().filter(|c| c.is_token())
    }

    pub fn name(&self) -> String {
        self.name_token()
            .and_then(|t| t.token_text())
            .unwrap_or_default()
            .to_string()
    }

    /// The receiver expression of `a.b(..)`; `None` for unqualified calls.
    pub fn select(&self) -> Option<&'a SyntaxNode> {
        let children = self.0.children();
        if children.len() > 2 && children.get(1).and_then(|c| c.token_text()) == Some(".") {
            children.first()
        } else {
            None
        }
    }

    pub fn arg_list(&self) -> Option<&'a SyntaxNode> {
        self.0.child(SyntaxKind::ArgList)
    }

    pub fn args(&self) -> Vec<&'a SyntaxNode> {
        self.arg_list()
            .map(|list| list.children_of(SyntaxKind::Expr).collect())
            .unwrap_or_default()
    }
}

impl<'a> PropertyEntry<'a> {
    pub fn key_token(&self) -> Option<&'a SyntaxNode> {
        self.0.child(SyntaxKind::PropKey)
    }

    pub fn value_token(&self) -> Option<&'a SyntaxNode> {
        self.0.child(SyntaxKind::PropValue)
    }

    pub fn raw_key(&self) -> &'a str {
        self.key_token()
            .and_then(|t| t.token_text())
            .unwrap_or_default()
    }

    pub fn raw_value(&self) -> &'a str {
        self.value_token()
            .and_then(|t| t.token_text())
            .unwrap_or_default()
    }

    pub fn key(&self) -> String {
        unescape(self.raw_key())
    }

    pub fn value(&self) -> String {
        unescape(self.raw_value())
    }
}

// ============================================================================
// HELPERS
// ============================================================================

pub fn simple_name(qualified: &str) -> &str {
    qualified.rsplit('.').next().unwrap_or(qualified)
}

pub fn package_of(qualified: &str) -> &str {
    qualified.rfind('.').map_or("", |idx| &qualified[..idx])
}

/// Strips `Expr` wrappers that hold exactly one element.
pub fn unwrap_expr(node: &SyntaxNode) -> &SyntaxNode {
    let mut current = node;
    while current.kind() == SyntaxKind::Expr && current.children().len() == 1 {
        current = &current.children()[0];
    }
    current
}

/// Value of a node that is (or wraps) a single string literal.
pub fn string_literal_value(node: &SyntaxNode) -> Option<String> {
    let node = unwrap_expr(node);
    if node.kind() != SyntaxKind::StringLit {
        return None;
    }
    let text = node.token_text()?;
    let inner = text.strip_prefix('"')?.strip_suffix('"')?;
    Some(unescape_java(inner))
}

fn unescape_java(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('s') => out.push(' '),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Renders `value` as a Java string literal.
pub fn quote_java(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}
