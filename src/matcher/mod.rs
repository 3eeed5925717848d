//! Declarative predicates over syntax trees.
//!
//! A [`Pattern`] is evaluated against one node and yields a [`MatchOutcome`]:
//! a match with captured [`Bindings`], no match, or an ambiguity when the
//! answer depends on type information the engine does not have. Ambiguity is
//! never an error; callers report it and treat the node as unmatched.

use std::collections::BTreeMap;
use std::ops::ControlFlow;

use regex::Regex;

use crate::syntax::ast::{Annotation, ClassDecl, ImportDecl, MethodCall, MethodDecl, PropertyEntry};
use crate::syntax::{NodeId, Span, SyntaxKind, SyntaxNode};
use crate::types::Resolution;
use crate::{err_msg, RecastError};

mod method;
mod scope;
mod type_pattern;

pub use method::MethodMatcher;
pub use scope::{ExprType, MatchScope};
pub use type_pattern::TypePattern;

// ============================================================================
// BINDINGS
// ============================================================================

/// A value captured by a pattern for the transform that follows it.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Node(SyntaxNode),
    Text(String),
    List(Vec<Binding>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    values: BTreeMap<String, Binding>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Binding) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Binding> {
        self.values.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.values.get(key)? {
            Binding::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn node(&self, key: &str) -> Option<&SyntaxNode> {
        match self.values.get(key)? {
            Binding::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn list(&self, key: &str) -> Option<&[Binding]> {
        match self.values.get(key)? {
            Binding::List(items) => Some(items),
            _ => None,
        }
    }

    /// Adds every entry of `other`; existing keys are kept.
    pub fn merge(&mut self, other: Bindings) {
        for (key, value) in other.values {
            self.values.entry(key).or_insert(value);
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Matched(Bindings),
    NoMatch,
    /// The pattern cannot be decided statically; the reason is reported.
    Ambiguous(String),
}

impl MatchOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, MatchOutcome::Matched(_))
    }

    pub fn bindings(&self) -> Option<&Bindings> {
        match self {
            MatchOutcome::Matched(b) => Some(b),
            _ => None,
        }
    }

    fn matched() -> Self {
        MatchOutcome::Matched(Bindings::new())
    }
}

// ============================================================================
// PATTERNS
// ============================================================================

/// An annotation type plus constraints on literal arguments.
#[derive(Debug, Clone)]
pub struct AnnotationPattern {
    pub ty: TypePattern,
    args: Vec<(String, Regex)>,
}

impl AnnotationPattern {
    pub fn new(ty: impl Into<TypePattern>) -> Self {
        AnnotationPattern {
            ty: ty.into(),
            args: Vec::new(),
        }
    }

    /// Requires element `name` to be a string literal matching `value`.
    pub fn with_arg(mut self, name: &str, value: &str) -> Result<Self, RecastError> {
        let regex = Regex::new(value)
            .map_err(|e| err_msg!(Recipe, "invalid argument pattern '{}': {}", value, e))?;
        self.args.push((name.to_string(), regex));
        Ok(self)
    }
}

#[derive(Debug, Clone)]
pub enum Pattern {
    Kind(SyntaxKind),
    /// The node is an annotation of a matching type.
    Annotation(AnnotationPattern),
    /// The node is a declaration carrying a matching annotation.
    Annotated(AnnotationPattern),
    MethodCall(MethodMatcher),
    /// A method or constructor declaration whose name matches.
    MethodNamed(Regex),
    /// A class declaration with at least one direct member matching.
    Member(Box<Pattern>),
    /// A class declaration extending or implementing a matching type.
    Extends(TypePattern),
    /// A non-static import of a matching type or package.
    Import(TypePattern),
    /// The subtree refers to a matching type anywhere, imports included.
    UsesType(TypePattern),
    /// The subtree refers to a matching type outside import declarations.
    TypeReferenced(TypePattern),
    /// A properties entry whose key matches and, if given, whose value does.
    ConfigKey {
        key: Regex,
        value: Option<Regex>,
    },
    All(Vec<Pattern>),
    Any(Vec<Pattern>),
    Not(Box<Pattern>),
    /// Some node strictly below this one matches.
    Contains(Box<Pattern>),
}

impl Pattern {
    pub fn annotation(ty: impl Into<TypePattern>) -> Self {
        Pattern::Annotation(AnnotationPattern::new(ty))
    }

    pub fn annotated(ty: impl Into<TypePattern>) -> Self {
        Pattern::Annotated(AnnotationPattern::new(ty))
    }

    pub fn method_call(signature: &str) -> Result<Self, RecastError> {
        MethodMatcher::parse(signature).map(Pattern::MethodCall)
    }

    pub fn method_named(glob: &str) -> Result<Self, RecastError> {
        glob_regex(glob).map(Pattern::MethodNamed)
    }

    pub fn member(inner: Pattern) -> Self {
        Pattern::Member(Box::new(inner))
    }

    pub fn extends(ty: impl Into<TypePattern>) -> Self {
        Pattern::Extends(ty.into())
    }

    pub fn import(ty: impl Into<TypePattern>) -> Self {
        Pattern::Import(ty.into())
    }

    pub fn uses_type(ty: impl Into<TypePattern>) -> Self {
        Pattern::UsesType(ty.into())
    }

    pub fn type_referenced(ty: impl Into<TypePattern>) -> Self {
        Pattern::TypeReferenced(ty.into())
    }

    /// Entry with key `key` (`*` wildcards allowed) and a value matching the
    /// regex `value`.
    pub fn config_key(key: &str, value: Option<&str>) -> Result<Self, RecastError> {
        let value = value
            .map(|v| {
                Regex::new(v).map_err(|e| err_msg!(Recipe, "invalid value pattern '{}': {}", v, e))
            })
            .transpose()?;
        Ok(Pattern::ConfigKey {
            key: glob_regex(key)?,
            value,
        })
    }

    pub fn contains(inner: Pattern) -> Self {
        Pattern::Contains(Box::new(inner))
    }

    pub fn and(self, other: Pattern) -> Self {
        match self {
            Pattern::All(mut items) => {
                items.push(other);
                Pattern::All(items)
            }
            first => Pattern::All(vec![first, other]),
        }
    }

    pub fn or(self, other: Pattern) -> Self {
        match self {
            Pattern::Any(mut items) => {
                items.push(other);
                Pattern::Any(items)
            }
            first => Pattern::Any(vec![first, other]),
        }
    }

    /// Evaluates the pattern at `node`. `enclosing` is the fully qualified
    /// name of the innermost class around `node`, if any.
    pub fn evaluate(
        &self,
        node: &SyntaxNode,
        scope: &MatchScope<'_>,
        enclosing: Option<&str>,
    ) -> MatchOutcome {
        match self {
            Pattern::Kind(kind) => {
                if node.kind() == *kind {
                    MatchOutcome::matched()
                } else {
                    MatchOutcome::NoMatch
                }
            }
            Pattern::Annotation(pattern) => match_annotation(node, pattern, scope),
            Pattern::Annotated(pattern) => {
                let Some(modifiers) = node.child(SyntaxKind::Modifiers) else {
                    return MatchOutcome::NoMatch;
                };
                let mut ambiguity = None;
                for annotation in modifiers.children_of(SyntaxKind::Annotation) {
                    match match_annotation(annotation, pattern, scope) {
                        MatchOutcome::Matched(b) => return MatchOutcome::Matched(b),
                        MatchOutcome::Ambiguous(reason) => ambiguity = ambiguity.or(Some(reason)),
                        MatchOutcome::NoMatch => {}
                    }
                }
                ambiguity.map_or(MatchOutcome::NoMatch, MatchOutcome::Ambiguous)
            }
            Pattern::MethodCall(matcher) => matcher.match_call(node, scope, enclosing),
            Pattern::MethodNamed(name) => match MethodDecl::cast(node) {
                Some(method) if name.is_match(&method.name()) => {
                    let mut bindings = Bindings::new();
                    bindings.insert("name", Binding::Text(method.name()));
                    MatchOutcome::Matched(bindings)
                }
                _ => MatchOutcome::NoMatch,
            },
            Pattern::Member(inner) => match_member(node, inner, scope),
            Pattern::Extends(ty) => {
                let Some(class) = ClassDecl::cast(node) else {
                    return MatchOutcome::NoMatch;
                };
                let mut ambiguity = None;
                for supertype in class.supertypes() {
                    let resolution = scope.type_of(supertype.syntax());
                    match type_outcome(&resolution, ty, &supertype.name()) {
                        MatchOutcome::Matched(mut b) => {
                            b.insert("supertype", Binding::Node(supertype.syntax().clone()));
                            return MatchOutcome::Matched(b);
                        }
                        MatchOutcome::Ambiguous(reason) => ambiguity = ambiguity.or(Some(reason)),
                        MatchOutcome::NoMatch => {}
                    }
                }
                ambiguity.map_or(MatchOutcome::NoMatch, MatchOutcome::Ambiguous)
            }
            Pattern::Import(ty) => match ImportDecl::cast(node) {
                Some(import) if !import.is_static() && import_matches(&import, ty) => {
                    let mut bindings = Bindings::new();
                    bindings.insert("import", Binding::Text(import.name()));
                    MatchOutcome::Matched(bindings)
                }
                _ => MatchOutcome::NoMatch,
            },
            Pattern::UsesType(ty) => uses_type(node, ty, scope, true),
            Pattern::TypeReferenced(ty) => uses_type(node, ty, scope, false),
            Pattern::ConfigKey { key, value } => {
                let Some(entry) = PropertyEntry::cast(node) else {
                    return MatchOutcome::NoMatch;
                };
                let entry_key = entry.key();
                if !key.is_match(&entry_key) {
                    return MatchOutcome::NoMatch;
                }
                let entry_value = entry.value();
                let mut bindings = Bindings::new();
                if let Some(value) = value {
                    let Some(captures) = value.captures(&entry_value) else {
                        return MatchOutcome::NoMatch;
                    };
                    for name in value.capture_names().flatten() {
                        if let Some(group) = captures.name(name) {
                            bindings.insert(name, Binding::Text(group.as_str().to_string()));
                        }
                    }
                }
                bindings.insert("key", Binding::Text(entry_key));
                bindings.insert("value", Binding::Text(entry_value));
                MatchOutcome::Matched(bindings)
            }
            Pattern::All(items) => {
                let mut bindings = Bindings::new();
                let mut ambiguity = None;
                for item in items {
                    match item.evaluate(node, scope, enclosing) {
                        MatchOutcome::Matched(b) => bindings.merge(b),
                        MatchOutcome::NoMatch => return MatchOutcome::NoMatch,
                        MatchOutcome::Ambiguous(reason) => ambiguity = ambiguity.or(Some(reason)),
                    }
                }
                match ambiguity {
                    Some(reason) => MatchOutcome::Ambiguous(reason),
                    None => MatchOutcome::Matched(bindings),
                }
            }
            Pattern::Any(items) => {
                let mut ambiguity = None;
                for item in items {
                    match item.evaluate(node, scope, enclosing) {
                        MatchOutcome::Matched(b) => return MatchOutcome::Matched(b),
                        MatchOutcome::NoMatch => {}
                        MatchOutcome::Ambiguous(reason) => ambiguity = ambiguity.or(Some(reason)),
                    }
                }
                ambiguity.map_or(MatchOutcome::NoMatch, MatchOutcome::Ambiguous)
            }
            Pattern::Not(inner) => match inner.evaluate(node, scope, enclosing) {
                MatchOutcome::Matched(_) => MatchOutcome::NoMatch,
                MatchOutcome::NoMatch => MatchOutcome::matched(),
                ambiguous => ambiguous,
            },
            Pattern::Contains(inner) => {
                let mut found = None;
                let mut ambiguity = None;
                for child in node.children() {
                    let flow = walk(child, enclosing, scope.names().package(), &mut |n, enc| {
                        match inner.evaluate(n, scope, enc) {
                            MatchOutcome::Matched(mut b) => {
                                b.insert("found", Binding::Node(n.clone()));
                                found = Some(b);
                                ControlFlow::Break(())
                            }
                            MatchOutcome::Ambiguous(reason) => {
                                ambiguity = ambiguity.take().or(Some(reason));
                                ControlFlow::Continue(())
                            }
                            MatchOutcome::NoMatch => ControlFlow::Continue(()),
                        }
                    });
                    if flow.is_break() {
                        break;
                    }
                }
                match (found, ambiguity) {
                    (Some(b), _) => MatchOutcome::Matched(b),
                    (None, Some(reason)) => MatchOutcome::Ambiguous(reason),
                    (None, None) => MatchOutcome::NoMatch,
                }
            }
        }
    }
}

impl std::ops::Not for Pattern {
    type Output = Pattern;

    fn not(self) -> Pattern {
        Pattern::Not(Box::new(self))
    }
}

fn glob_regex(glob: &str) -> Result<Regex, RecastError> {
    let source = format!(
        "^{}$",
        glob.split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*")
    );
    Regex::new(&source).map_err(|e| err_msg!(Recipe, "invalid name pattern '{}': {}", glob, e))
}

// ============================================================================
// PRIMITIVES
// ============================================================================

/// Turns a type resolution into an outcome against `pattern`.
fn type_outcome(resolution: &Resolution, pattern: &TypePattern, written: &str) -> MatchOutcome {
    match resolution {
        Resolution::Resolved(fqn) if pattern.matches(fqn) => {
            let mut bindings = Bindings::new();
            bindings.insert("type", Binding::Text(fqn.clone()));
            MatchOutcome::Matched(bindings)
        }
        Resolution::Resolved(_) | Resolution::Unknown => MatchOutcome::NoMatch,
        Resolution::Ambiguous(candidates) => {
            let matching = candidates.iter().filter(|c| pattern.matches(c)).count();
            if matching == 0 {
                MatchOutcome::NoMatch
            } else {
                MatchOutcome::Ambiguous(format!(
                    "'{}' could be any of {}",
                    written,
                    candidates.join(", ")
                ))
            }
        }
    }
}

fn match_annotation(node: &SyntaxNode, pattern: &AnnotationPattern, scope: &MatchScope<'_>) -> MatchOutcome {
    let Some(annotation) = Annotation::cast(node) else {
        return MatchOutcome::NoMatch;
    };
    if !pattern.ty.could_match_simple(&annotation.simple_name()) {
        return MatchOutcome::NoMatch;
    }
    let mut bindings = match type_outcome(&scope.type_of(node), &pattern.ty, &annotation.name()) {
        MatchOutcome::Matched(b) => b,
        other => return other,
    };

    for arg in annotation.args() {
        bindings.insert(format!("arg.{}", arg.element_name()), Binding::Node(arg.value.clone()));
    }
    for (element, regex) in &pattern.args {
        let Some(arg) = annotation.arg(element) else {
            return MatchOutcome::NoMatch;
        };
        let Some(value) = arg.string_value() else {
            return MatchOutcome::Ambiguous(format!(
                "argument '{}' of @{} is not a string literal",
                element,
                annotation.name()
            ));
        };
        if !regex.is_match(&value) {
            return MatchOutcome::NoMatch;
        }
    }
    bindings.insert("annotation", Binding::Node(node.clone()));
    MatchOutcome::Matched(bindings)
}

fn match_member(node: &SyntaxNode, inner: &Pattern, scope: &MatchScope<'_>) -> MatchOutcome {
    let Some(class) = ClassDecl::cast(node) else {
        return MatchOutcome::NoMatch;
    };
    let fqn = node.ty().map(str::to_string).unwrap_or_else(|| class.name());
    let mut matched = Vec::new();
    let mut first = None;
    let mut ambiguity = None;
    for member in class.members() {
        match inner.evaluate(member, scope, Some(&fqn)) {
            MatchOutcome::Matched(b) => {
                matched.push(Binding::Node(member.clone()));
                first.get_or_insert(b);
            }
            MatchOutcome::Ambiguous(reason) => ambiguity = ambiguity.or(Some(reason)),
            MatchOutcome::NoMatch => {}
        }
    }
    match first {
        Some(mut bindings) => {
            bindings.insert("members", Binding::List(matched));
            MatchOutcome::Matched(bindings)
        }
        None => ambiguity.map_or(MatchOutcome::NoMatch, MatchOutcome::Ambiguous),
    }
}

fn import_matches(import: &ImportDecl<'_>, ty: &TypePattern) -> bool {
    if import.is_wildcard() {
        ty.could_match_package(&import.qualifier())
    } else {
        ty.matches(&import.name())
    }
}

/// Looks for references to a matching type below `node`. With
/// `include_imports`, import declarations count as references.
fn uses_type(node: &SyntaxNode, ty: &TypePattern, scope: &MatchScope<'_>, include_imports: bool) -> MatchOutcome {
    let mut ambiguity = None;
    let found = find_reference(node, None, ty, scope, include_imports, &mut ambiguity);
    match (found, ambiguity) {
        (Some(fqn), _) => {
            let mut bindings = Bindings::new();
            bindings.insert("type", Binding::Text(fqn));
            MatchOutcome::Matched(bindings)
        }
        (None, Some(reason)) => MatchOutcome::Ambiguous(reason),
        (None, None) => MatchOutcome::NoMatch,
    }
}

fn find_reference(
    node: &SyntaxNode,
    parent: Option<SyntaxKind>,
    ty: &TypePattern,
    scope: &MatchScope<'_>,
    include_imports: bool,
    ambiguity: &mut Option<String>,
) -> Option<String> {
    match node.kind() {
        SyntaxKind::PackageDecl => return None,
        SyntaxKind::ImportDecl => {
            let import = ImportDecl::cast(node)?;
            if !include_imports {
                return None;
            }
            if import.is_static() {
                let owner = import.qualifier();
                return ty.matches(&owner).then_some(owner);
            }
            return import_matches(&import, ty).then(|| import.name());
        }
        SyntaxKind::Annotation | SyntaxKind::TypeRef | SyntaxKind::NewClass => {
            let written = node
                .child(SyntaxKind::QualifiedName)
                .map(SyntaxNode::significant_text)
                .unwrap_or_default();
            if !written.is_empty() {
                match type_outcome(&scope.type_of(node), ty, &written) {
                    MatchOutcome::Matched(b) => return b.text("type").map(str::to_string),
                    MatchOutcome::Ambiguous(reason) => {
                        ambiguity.get_or_insert(reason);
                    }
                    MatchOutcome::NoMatch => {}
                }
            }
        }
        SyntaxKind::Ident if refers_to_type(node, parent) => {
            let text = node.token_text().unwrap_or_default();
            if scope.is_variable(text) {
                return None;
            }
            match type_outcome(&scope.resolve_type(text), ty, text) {
                MatchOutcome::Matched(b) => return b.text("type").map(str::to_string),
                MatchOutcome::Ambiguous(reason) => {
                    ambiguity.get_or_insert(reason);
                }
                MatchOutcome::NoMatch => {}
            }
        }
        _ => {}
    }
    let kind = node.kind();
    let skip = match kind {
        SyntaxKind::MethodCall => MethodCall::cast(node).and_then(|c| c.name_token()).map(SyntaxNode::id),
        _ => None,
    };
    node.children()
        .iter()
        .filter(|c| Some(c.id()) != skip)
        .find_map(|c| find_reference(c, Some(kind), ty, scope, include_imports, ambiguity))
}

/// Capitalised identifiers in expression position or inside flat type
/// arguments name types (`Foo.bar()`, `Foo.class`, `List<Foo>`).
fn refers_to_type(node: &SyntaxNode, parent: Option<SyntaxKind>) -> bool {
    let starts_upper = node
        .token_text()
        .is_some_and(|t| t.starts_with(char::is_uppercase));
    starts_upper
        && matches!(
            parent,
            Some(
                SyntaxKind::Expr
                    | SyntaxKind::FieldAccess
                    | SyntaxKind::MethodCall
                    | SyntaxKind::MethodRef
                    | SyntaxKind::ArrayAccess
                    | SyntaxKind::Statement
                    | SyntaxKind::Parens
                    | SyntaxKind::TypeArgs
            )
        )
}

// ============================================================================
// FINDING MATCHES
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct NodeMatch {
    pub id: NodeId,
    pub span: Span,
    pub kind: SyntaxKind,
    pub bindings: Bindings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ambiguity {
    pub id: NodeId,
    pub span: Span,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchReport {
    pub matches: Vec<NodeMatch>,
    pub ambiguities: Vec<Ambiguity>,
}

impl MatchReport {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Evaluates `pattern` at every node of `root` in pre-order.
pub fn find_matches(root: &SyntaxNode, pattern: &Pattern, scope: &MatchScope<'_>) -> MatchReport {
    let mut report = MatchReport::default();
    let _ = walk(root, None, scope.names().package(), &mut |node, enclosing| {
        match pattern.evaluate(node, scope, enclosing) {
            MatchOutcome::Matched(bindings) => report.matches.push(NodeMatch {
                id: node.id(),
                span: node.span(),
                kind: node.kind(),
                bindings,
            }),
            MatchOutcome::Ambiguous(reason) => report.ambiguities.push(Ambiguity {
                id: node.id(),
                span: node.span(),
                reason,
            }),
            MatchOutcome::NoMatch => {}
        }
        ControlFlow::Continue(())
    });
    report
}

/// Pre-order walk that tracks the fully qualified name of the innermost
/// enclosing class.
fn walk<'n>(
    node: &'n SyntaxNode,
    enclosing: Option<&str>,
    package: Option<&str>,
    f: &mut dyn FnMut(&'n SyntaxNode, Option<&str>) -> ControlFlow<()>,
) -> ControlFlow<()> {
    if node.is_token() {
        return f(node, enclosing);
    }
    let own = ClassDecl::cast(node).map(|class| match node.ty() {
        Some(ty) => ty.to_string(),
        None => match enclosing.or(package) {
            Some(outer) if !outer.is_empty() => format!("{}.{}", outer, class.name()),
            _ => class.name(),
        },
    });
    let enclosing = own.as_deref().or(enclosing);
    f(node, enclosing)?;
    for child in node.children() {
        walk(child, enclosing, package, f)?;
    }
    ControlFlow::Continue(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{SourceKind, SourceTree};
    use crate::types::{attribute, TypeTable};

    const COMPONENT: &str = r#"package com.acme;

import org.springframework.beans.factory.annotation.Autowired;
import org.springframework.stereotype.Component;

@Component
public class Greeter extends Base {
    @Autowired
    private Clock clock;

    public String greet() {
        return "hi";
    }
}
"#;

    fn parse(text: &str, path: &str) -> (SourceTree, TypeTable) {
        let tree = SourceTree::parse(text, path).expect("parses");
        let mut table = TypeTable::new();
        table.add_declared(tree.root());
        let root = attribute(tree.root().clone(), &table);
        (tree.with_root(root), table)
    }

    fn report(tree: &SourceTree, table: &TypeTable, pattern: &Pattern) -> MatchReport {
        let scope = MatchScope::new(tree.root(), tree.kind(), table);
        find_matches(tree.root(), pattern, &scope)
    }

    #[test]
    fn annotated_class_with_autowired_field() {
        let (tree, table) = parse(COMPONENT, "Greeter.java");
        let pattern = Pattern::annotated("org.springframework.stereotype.Component")
            .and(Pattern::member(Pattern::annotated(
                "org.springframework.beans.factory.annotation.Autowired",
            )));
        let found = report(&tree, &table, &pattern);
        assert_eq!(found.matches.len(), 1);
        assert_eq!(found.matches[0].kind, SyntaxKind::ClassDecl);
        let members = found.matches[0].bindings.list("members").expect("members");
        assert_eq!(members.len(), 1);
        assert!(found.ambiguities.is_empty());
    }

    #[test]
    fn negation_and_imports() {
        let (tree, table) = parse(COMPONENT, "Greeter.java");
        let imports = report(&tree, &table, &Pattern::import("org.springframework..*"));
        assert_eq!(imports.matches.len(), 2);

        let no_ctor = Pattern::Kind(SyntaxKind::ClassDecl)
            .and(!Pattern::member(Pattern::Kind(SyntaxKind::MethodDecl).and(Pattern::method_named("Greeter").expect("glob"))));
        assert_eq!(report(&tree, &table, &no_ctor).matches.len(), 1);
    }

    #[test]
    fn wildcard_imports_make_annotations_ambiguous() {
        let text = "import org.springframework.stereotype.*;\nimport com.other.*;\n@Service class A {}";
        let (tree, table) = parse(text, "A.java");
        let found = report(&tree, &table, &Pattern::annotation("org.springframework.stereotype.Service"));
        assert!(found.matches.is_empty());
        assert_eq!(found.ambiguities.len(), 1);
        assert!(found.ambiguities[0].reason.contains("could be any of"));
    }

    #[test]
    fn annotation_argument_constraints() {
        let text = "import a.Value;\nclass A { @Value(\"${x}\") String x; @Value(KEY) String y; }";
        let (tree, table) = parse(text, "A.java");
        let pattern = Pattern::Annotation(AnnotationPattern::new("a.Value").with_arg("value", r"^\$\{").expect("regex"));
        let found = report(&tree, &table, &pattern);
        assert_eq!(found.matches.len(), 1);
        assert!(found.matches[0].bindings.node("arg.value").is_some());
        assert_eq!(found.ambiguities.len(), 1);
    }

    #[test]
    fn type_references_outside_imports() {
        let used = "import a.Helper;\nclass A { void f() { Helper.run(); } }";
        let (tree, table) = parse(used, "A.java");
        let scope = MatchScope::new(tree.root(), tree.kind(), &table);
        let pattern = Pattern::type_referenced("a.Helper");
        assert!(pattern.evaluate(tree.root(), &scope, None).is_match());

        let unused = "import a.Helper;\nclass A { void f() { helper.run(); } }";
        let (tree, table) = parse(unused, "A.java");
        let scope = MatchScope::new(tree.root(), tree.kind(), &table);
        assert!(!pattern.evaluate(tree.root(), &scope, None).is_match());
        assert!(Pattern::uses_type("a.Helper").evaluate(tree.root(), &scope, None).is_match());
    }

    #[test]
    fn config_keys_capture_named_groups() {
        let (tree, table) = parse("server.port=8080\nspring.application.name=demo\n", "application.properties");
        assert_eq!(tree.kind(), SourceKind::Properties);
        let pattern = Pattern::config_key("server.*", Some(r"^(?P<port>\d+)$")).expect("valid");
        let found = report(&tree, &table, &pattern);
        assert_eq!(found.matches.len(), 1);
        assert_eq!(found.matches[0].bindings.text("port"), Some("8080"));
        assert_eq!(found.matches[0].bindings.text("key"), Some("server.port"));
    }

    #[test]
    fn unqualified_calls_use_the_enclosing_class() {
        let text = "package p;\nclass A { void f() { helper(); } void helper() {} }";
        let (tree, table) = parse(text, "A.java");
        let pattern = Pattern::method_call("p.A helper()").expect("signature");
        assert_eq!(report(&tree, &table, &pattern).matches.len(), 1);
    }
}
