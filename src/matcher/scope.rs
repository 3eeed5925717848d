//! What the matcher knows about a file: visible type names and the declared
//! types of its variables.

use std::collections::BTreeMap;

use crate::syntax::ast::{unwrap_expr, Param, TypeRef, VarDecl};
use crate::syntax::{SourceKind, SyntaxKind, SyntaxNode};
use crate::types::{NameScope, Resolution, TypeTable};

/// Static type of an expression as far as the matcher can tell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprType {
    Known(String),
    /// The `null` literal, assignable to any reference type.
    Null,
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum VarType {
    Known(String),
    /// Declared with `var`, or with a type name that does not resolve.
    Inferred,
    /// Declared more than once with different types.
    Conflicting,
}

pub struct MatchScope<'a> {
    names: NameScope,
    table: &'a TypeTable,
    variables: BTreeMap<String, VarType>,
}

impl<'a> MatchScope<'a> {
    pub fn new(root: &SyntaxNode, kind: SourceKind, table: &'a TypeTable) -> Self {
        let names = match kind {
            SourceKind::Java => NameScope::of(root),
            SourceKind::Properties => NameScope::default(),
        };
        let mut scope = MatchScope {
            names,
            table,
            variables: BTreeMap::new(),
        };
        if kind == SourceKind::Java {
            scope.collect_variables(root);
        }
        scope
    }

    pub fn names(&self) -> &NameScope {
        &self.names
    }

    pub fn table(&self) -> &'a TypeTable {
        self.table
    }

    pub fn is_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn resolve_type(&self, name: &str) -> Resolution {
        self.names.resolve(name, self.table)
    }

    /// Attributed type of a declaration or reference node, resolving the
    /// written name when attribution left it blank.
    pub fn type_of(&self, node: &SyntaxNode) -> Resolution {
        if let Some(ty) = node.ty() {
            return Resolution::Resolved(ty.to_string());
        }
        match node.child(SyntaxKind::QualifiedName) {
            Some(name) => self.resolve_type(&name.significant_text()),
            None => match TypeRef::cast(node) {
                Some(ty) if ty.is_primitive() => Resolution::Resolved(ty.name()),
                _ => Resolution::Unknown,
            },
        }
    }

    fn collect_variables(&mut self, root: &SyntaxNode) {
        let mut declared: Vec<(String, Option<&SyntaxNode>)> = Vec::new();
        for node in root.descendants() {
            if let Some(decl) = VarDecl::cast(node) {
                let ty = decl.type_ref().map(|t| t.syntax());
                for name in decl.names() {
                    declared.push((name, ty));
                }
            } else if let Some(param) = Param::cast(node) {
                declared.push((param.name(), param.type_ref().map(|t| t.syntax())));
            }
        }
        for (name, ty) in declared {
            let resolved = match ty {
                Some(ty) if TypeRef::cast(ty).is_some_and(|t| t.name() == "var") => VarType::Inferred,
                Some(ty) => match self.type_of(ty) {
                    Resolution::Resolved(fqn) => {
                        let dims = TypeRef::cast(ty).map_or(0, |t| t.array_dims());
                        VarType::Known(format!("{}{}", fqn, "[]".repeat(dims)))
                    }
                    _ => VarType::Inferred,
                },
                None => VarType::Inferred,
            };
            let entry = self.variables.entry(name).or_insert_with(|| resolved.clone());
            if *entry != resolved {
                *entry = VarType::Conflicting;
            }
        }
    }

    /// Static type of a value expression.
    pub fn expression_type(&self, expr: &SyntaxNode) -> ExprType {
        let node = unwrap_expr(expr);
        let text = node.token_text().unwrap_or_default();
        match node.kind() {
            SyntaxKind::StringLit | SyntaxKind::TextBlock => ExprType::Known("java.lang.String".into()),
            SyntaxKind::CharLit => ExprType::Known("char".into()),
            SyntaxKind::NumberLit => ExprType::Known(number_type(text).into()),
            SyntaxKind::Keyword => match text {
                "true" | "false" => ExprType::Known("boolean".into()),
                "null" => ExprType::Null,
                "this" => ExprType::Unknown("'this' has no declared type here".into()),
                _ => ExprType::Unknown(format!("'{}' is not a value", text)),
            },
            SyntaxKind::Ident => match self.variables.get(text) {
                Some(VarType::Known(ty)) => ExprType::Known(ty.clone()),
                Some(VarType::Inferred) => {
                    ExprType::Unknown(format!("type of '{}' is not declared explicitly", text))
                }
                Some(VarType::Conflicting) => {
                    ExprType::Unknown(format!("'{}' is declared with conflicting types", text))
                }
                None => ExprType::Unknown(format!("'{}' is not a known variable", text)),
            },
            SyntaxKind::NewClass => match node.child(SyntaxKind::TypeRef).map(|t| self.type_of(t)) {
                Some(Resolution::Resolved(fqn)) => ExprType::Known(fqn),
                _ => ExprType::Unknown("type of object creation does not resolve".into()),
            },
            SyntaxKind::FieldAccess
                if node.last_token().and_then(|t| t.token_text()) == Some("class") =>
            {
                ExprType::Known("java.lang.Class".into())
            }
            _ => ExprType::Unknown(format!("cannot determine the type of '{}'", node.text().trim())),
        }
    }

    /// Type of the receiver of a method call. A bare identifier that is not
    /// a variable is read as a type name (a static call).
    pub fn receiver_type(&self, select: &SyntaxNode) -> ExprType {
        let node = unwrap_expr(select);
        match node.kind() {
            SyntaxKind::Ident => {
                let text = node.token_text().unwrap_or_default();
                if self.variables.contains_key(text) {
                    return self.expression_type(node);
                }
                match self.resolve_type(text) {
                    Resolution::Resolved(fqn) => ExprType::Known(fqn),
                    Resolution::Ambiguous(c) => {
                        ExprType::Unknown(format!("'{}' could be any of {}", text, c.join(", ")))
                    }
                    Resolution::Unknown => ExprType::Unknown(format!("cannot resolve '{}'", text)),
                }
            }
            SyntaxKind::FieldAccess => {
                let name = node.significant_text();
                let looks_qualified = name
                    .split('.')
                    .all(|part| !part.is_empty() && part.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$'));
                if looks_qualified && name.starts_with(char::is_lowercase) {
                    if let Resolution::Resolved(fqn) = self.resolve_type(&name) {
                        return ExprType::Known(fqn);
                    }
                }
                self.expression_type(node)
            }
            _ => self.expression_type(node),
        }
    }
}

fn number_type(text: &str) -> &'static str {
    let lower = text.to_ascii_lowercase();
    if lower.starts_with("0x") {
        return if lower.ends_with('l') { "long" } else { "int" };
    }
    if lower.ends_with('l') {
        "long"
    } else if lower.ends_with('f') {
        "float"
    } else if lower.ends_with('d') || lower.contains('.') || lower.contains('e') {
        "double"
    } else {
        "int"
    }
}
