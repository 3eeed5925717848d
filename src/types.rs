//! Type attribution: resolving names in a Java file to fully qualified types.
//!
//! Resolution follows the Java scoping rules that matter for migrations:
//! types declared in the file, then single-type imports, then the file's own
//! package, then on-demand (`.*`) imports and `java.lang`. A [`TypeTable`]
//! lists the types known to exist (the project's own declarations plus any
//! configured classpath entries); without it, wildcard imports can only be
//! resolved by inference and may come out ambiguous.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::syntax::ast::{simple_name, ClassDecl, CompilationUnit};
use crate::syntax::{SyntaxKind, SyntaxNode};

/// `java.lang` types visible without an import.
const JAVA_LANG: &[&str] = &[
    "Object",
    "String",
    "Class",
    "Integer",
    "Long",
    "Short",
    "Byte",
    "Double",
    "Float",
    "Character",
    "Boolean",
    "Number",
    "Void",
    "Math",
    "System",
    "Thread",
    "Runnable",
    "Iterable",
    "Comparable",
    "CharSequence",
    "StringBuilder",
    "Exception",
    "RuntimeException",
    "Error",
    "Throwable",
    "IllegalArgumentException",
    "IllegalStateException",
    "NullPointerException",
    "UnsupportedOperationException",
    "Override",
    "Deprecated",
    "FunctionalInterface",
    "SuppressWarnings",
    "SafeVarargs",
    "Record",
    "Enum",
    "AutoCloseable",
];

const PRIMITIVE_TYPES: &[&str] = &[
    "boolean", "byte", "char", "short", "int", "long", "float", "double", "void",
];

// ============================================================================
// TYPE TABLE
// ============================================================================

/// Fully qualified names of types known to exist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeTable {
    types: BTreeSet<String>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, fqn: impl Into<String>) {
        self.types.insert(fqn.into());
    }

    pub fn contains(&self, fqn: &str) -> bool {
        self.types.contains(fqn)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Adds every type declared in a compilation unit, nested ones included.
    pub fn add_declared(&mut self, root: &SyntaxNode) {
        for (_, fqn) in declared_types(root) {
            self.types.insert(fqn);
        }
    }

    /// Known types whose package is exactly `package`.
    pub fn in_package<'a>(&'a self, package: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.types.iter().map(String::as_str).filter(move |fqn| {
            fqn.len() > package.len()
                && fqn.starts_with(package)
                && fqn[package.len()..].starts_with('.')
                && !fqn[package.len() + 1..].contains('.')
        })
    }
}

impl<S: Into<String>> FromIterator<S> for TypeTable {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        TypeTable {
            types: iter.into_iter().map(Into::into).collect(),
        }
    }
}

// ============================================================================
// NAME SCOPE
// ============================================================================

/// Result of resolving a type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(String),
    /// More than one type could be meant.
    Ambiguous(Vec<String>),
    Unknown,
}

impl Resolution {
    pub fn resolved(&self) -> Option<&str> {
        match self {
            Resolution::Resolved(fqn) => Some(fqn),
            _ => None,
        }
    }
}

/// The names visible at file level in one compilation unit.
#[derive(Debug, Clone, Default)]
pub struct NameScope {
    package: Option<String>,
    /// Simple name to FQN for single-type imports.
    explicit: BTreeMap<String, String>,
    /// Member name to declaring type for single static imports.
    static_members: BTreeMap<String, String>,
    /// Packages (or types) imported on demand.
    wildcards: Vec<String>,
    /// Simple name to FQN for types declared in this file.
    declared: BTreeMap<String, String>,
}

impl NameScope {
    pub fn of(root: &SyntaxNode) -> Self {
        let mut scope = NameScope::default();
        let Some(unit) = CompilationUnit::cast(root) else {
            return scope;
        };
        scope.package = unit.package_name();
        for import in unit.imports() {
            let name = import.name();
            if import.is_wildcard() {
                if !import.is_static() {
                    scope.wildcards.push(import.qualifier());
                }
            } else if import.is_static() {
                scope
                    .static_members
                    .insert(simple_name(&name).to_string(), import.qualifier());
            } else {
                scope.explicit.insert(simple_name(&name).to_string(), name);
            }
        }
        for (simple, fqn) in declared_types(root) {
            scope.declared.entry(simple).or_insert(fqn);
        }
        scope
    }

    pub fn package(&self) -> Option<&str> {
        self.package.as_deref()
    }

    pub fn wildcards(&self) -> &[String] {
        &self.wildcards
    }

    /// The type a single static import of `member` comes from.
    pub fn static_import_owner(&self, member: &str) -> Option<&str> {
        self.static_members.get(member).map(String::as_str)
    }

    /// True when a single-type import of exactly `fqn` is present.
    pub fn imports_exactly(&self, fqn: &str) -> bool {
        self.explicit.get(simple_name(fqn)).is_some_and(|f| f == fqn)
    }

    /// Resolves a simple or qualified type name as written in this file.
    pub fn resolve(&self, name: &str, table: &TypeTable) -> Resolution {
        let name = name.trim();
        if name.is_empty() {
            return Resolution::Unknown;
        }
        if PRIMITIVE_TYPES.contains(&name) {
            return Resolution::Resolved(name.to_string());
        }
        match name.split_once('.') {
            Some((head, rest)) => {
                // `Outer.Inner` through an imported or declared outer type,
                // otherwise a fully qualified name.
                match self.resolve_simple(head, table) {
                    Resolution::Resolved(outer) => Resolution::Resolved(format!("{}.{}", outer, rest)),
                    _ if head.starts_with(char::is_lowercase) => {
                        Resolution::Resolved(name.to_string())
                    }
                    other => other,
                }
            }
            None => self.resolve_simple(name, table),
        }
    }

    fn resolve_simple(&self, simple: &str, table: &TypeTable) -> Resolution {
        if let Some(fqn) = self.declared.get(simple) {
            return Resolution::Resolved(fqn.clone());
        }
        if let Some(fqn) = self.explicit.get(simple) {
            return Resolution::Resolved(fqn.clone());
        }
        if let Some(package) = &self.package {
            let candidate = format!("{}.{}", package, simple);
            if table.contains(&candidate) {
                return Resolution::Resolved(candidate);
            }
        }

        let mut candidates: Vec<String> = self
            .wildcards
            .iter()
            .map(|pkg| format!("{}.{}", pkg, simple))
            .filter(|fqn| table.contains(fqn))
            .collect();
        if JAVA_LANG.contains(&simple) {
            candidates.push(format!("java.lang.{}", simple));
        }
        match candidates.len() {
            1 => return Resolution::Resolved(candidates.remove(0)),
            n if n > 1 => return Resolution::Ambiguous(candidates),
            _ => {}
        }

        // Nothing known. A capitalised name can still come from a wildcard
        // import whose package is not in the table.
        if !simple.starts_with(char::is_uppercase) {
            return Resolution::Unknown;
        }
        match self.wildcards.as_slice() {
            [] => Resolution::Unknown,
            [only] => Resolution::Resolved(format!("{}.{}", only, simple)),
            many => Resolution::Ambiguous(
                many.iter().map(|pkg| format!("{}.{}", pkg, simple)).collect(),
            ),
        }
    }
}

/// `(simple name, fqn)` for every class-like declaration in the unit.
pub fn declared_types(root: &SyntaxNode) -> Vec<(String, String)> {
    let package = CompilationUnit::cast(root).and_then(|u| u.package_name());
    let mut out = Vec::new();
    for child in root.children() {
        collect_declared(child, package.as_deref(), &mut out);
    }
    out
}

fn collect_declared(node: &SyntaxNode, prefix: Option<&str>, out: &mut Vec<(String, String)>) {
    let Some(class) = ClassDecl::cast(node) else {
        return;
    };
    let name = class.name();
    let fqn = match prefix {
        Some(p) if !p.is_empty() => format!("{}.{}", p, name),
        _ => name.clone(),
    };
    for member in class.members() {
        collect_declared(member, Some(&fqn), out);
    }
    out.push((name, fqn));
}

// ============================================================================
// ATTRIBUTION
// ============================================================================

/// Stamps resolved FQNs onto class declarations, annotations, type
/// references and single-type imports.
pub fn attribute(root: SyntaxNode, table: &TypeTable) -> SyntaxNode {
    if root.kind() != SyntaxKind::CompilationUnit {
        return root;
    }
    let scope = NameScope::of(&root);
    let package = scope.package().map(str::to_string);
    stamp(root, &scope, table, package.as_deref())
}

fn stamp(node: SyntaxNode, scope: &NameScope, table: &TypeTable, outer: Option<&str>) -> SyntaxNode {
    if node.is_token() {
        return node;
    }

    let declared_fqn = ClassDecl::cast(&node).map(|class| match outer {
        Some(p) if !p.is_empty() => format!("{}.{}", p, class.name()),
        _ => class.name(),
    });
    let nested_outer = declared_fqn.as_deref().or(outer);

    let children: Vec<SyntaxNode> = node
        .children()
        .iter()
        .cloned()
        .map(|child| stamp(child, scope, table, nested_outer))
        .collect();
    let kind = node.kind();
    let node = node.with_children(children);

    if let Some(fqn) = declared_fqn {
        return node.with_ty(fqn);
    }
    let written = match kind {
        SyntaxKind::Annotation | SyntaxKind::TypeRef => node
            .child(SyntaxKind::QualifiedName)
            .map(SyntaxNode::significant_text),
        SyntaxKind::ImportDecl if !node.has_token("static") => {
            let name = node
                .child(SyntaxKind::QualifiedName)
                .map(SyntaxNode::significant_text)
                .unwrap_or_default();
            if name.ends_with(".*") || name.is_empty() {
                None
            } else {
                return node.with_ty(name);
            }
        }
        _ => None,
    };
    match written.map(|name| scope.resolve(&name, table)) {
        Some(Resolution::Resolved(fqn)) => node.with_ty(fqn),
        _ => node,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::ast::Annotation;
    use crate::syntax::SourceTree;

    fn root(text: &str) -> SyntaxNode {
        SourceTree::parse(text, "A.java").expect("parses").root().clone()
    }

    #[test]
    fn explicit_imports_beat_wildcards() {
        let root = root("package p;\nimport a.Service;\nimport b.*;\nclass A {}");
        let scope = NameScope::of(&root);
        let table: TypeTable = ["b.Service"].into_iter().collect();
        assert_eq!(
            scope.resolve("Service", &table),
            Resolution::Resolved("a.Service".into())
        );
    }

    #[test]
    fn competing_wildcards_are_ambiguous() {
        let root = root("import a.*;\nimport b.*;\nclass A {}");
        let scope = NameScope::of(&root);
        let table = TypeTable::new();
        assert!(matches!(
            scope.resolve("Service", &table),
            Resolution::Ambiguous(c) if c.len() == 2
        ));
        let table: TypeTable = ["b.Service"].into_iter().collect();
        assert_eq!(
            scope.resolve("Service", &table),
            Resolution::Resolved("b.Service".into())
        );
    }

    #[test]
    fn same_package_and_java_lang() {
        let root = root("package p;\nclass A {}");
        let scope = NameScope::of(&root);
        let table: TypeTable = ["p.Helper"].into_iter().collect();
        assert_eq!(scope.resolve("Helper", &table), Resolution::Resolved("p.Helper".into()));
        assert_eq!(
            scope.resolve("String", &table),
            Resolution::Resolved("java.lang.String".into())
        );
        assert_eq!(scope.resolve("Missing", &table), Resolution::Unknown);
        assert_eq!(
            scope.resolve("java.util.List", &table),
            Resolution::Resolved("java.util.List".into())
        );
    }

    #[test]
    fn attribution_stamps_annotations_and_classes() {
        let root = root(
            "package com.x;\nimport org.springframework.stereotype.Service;\n@Service\npublic class A { class B {} }",
        );
        let mut table = TypeTable::new();
        table.add_declared(&root);
        assert!(table.contains("com.x.A"));
        assert!(table.contains("com.x.A.B"));
        let root = attribute(root, &table);
        let annotation = root
            .descendants()
            .find(|n| Annotation::cast(n).is_some())
            .expect("annotation");
        assert_eq!(annotation.ty(), Some("org.springframework.stereotype.Service"));
        let classes: Vec<_> = root
            .descendants()
            .filter(|n| n.kind() == SyntaxKind::ClassDecl)
            .filter_map(|n| n.ty())
            .collect();
        assert_eq!(classes, vec!["com.x.A", "com.x.A.B"]);
    }

    #[test]
    fn in_package_lists_direct_members_only() {
        let table: TypeTable = ["a.b.C", "a.b.D", "a.b.c.E", "a.bc.F"].into_iter().collect();
        let found: Vec<_> = table.in_package("a.b").collect();
        assert_eq!(found, vec!["a.b.C", "a.b.D"]);
    }
}
