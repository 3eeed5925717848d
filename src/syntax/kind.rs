//! Node kinds of the lossless syntax tree.

use serde::{Deserialize, Serialize};

/// Every token and composite node kind the parsers produce.
///
/// Tokens carry text and leading trivia; composites carry an ordered child
/// list. Java and properties files share one tree representation so that
/// visitors, markers and the composer never care which language a file is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SyntaxKind {
    // ------------------------------------------------------------------------
    // Java tokens
    // ------------------------------------------------------------------------
    Ident,
    Keyword,
    StringLit,
    CharLit,
    TextBlock,
    NumberLit,
    Punct,
    Eof,

    // ------------------------------------------------------------------------
    // Properties tokens
    // ------------------------------------------------------------------------
    PropKey,
    PropSeparator,
    PropValue,

    // ------------------------------------------------------------------------
    // Java composites
    // ------------------------------------------------------------------------
    CompilationUnit,
    PackageDecl,
    ImportDecl,
    QualifiedName,
    ClassDecl,
    Modifiers,
    Annotation,
    AnnotationArgs,
    AnnotationPair,
    ClassBody,
    EnumConstants,
    TypeParams,
    TypeRef,
    TypeArgs,
    ExtendsClause,
    ImplementsClause,
    PermitsClause,
    RecordHeader,
    FieldDecl,
    VarDeclarator,
    MethodDecl,
    ParamList,
    Param,
    ThrowsClause,
    DefaultValue,
    Block,
    Initializer,
    Statement,
    LocalVarDecl,
    Expr,
    MethodCall,
    ArgList,
    FieldAccess,
    ArrayAccess,
    MethodRef,
    NewClass,
    Parens,
    ArrayInit,

    // ------------------------------------------------------------------------
    // Properties composites
    // ------------------------------------------------------------------------
    PropertiesFile,
    PropertyEntry,
}

impl SyntaxKind {
    /// Returns true for kinds that are leaves carrying text.
    pub fn is_token(self) -> bool {
        matches!(
            self,
            SyntaxKind::Ident
                | SyntaxKind::Keyword
                | SyntaxKind::StringLit
                | SyntaxKind::CharLit
                | SyntaxKind::TextBlock
                | SyntaxKind::NumberLit
                | SyntaxKind::Punct
                | SyntaxKind::Eof
                | SyntaxKind::PropKey
                | SyntaxKind::PropSeparator
                | SyntaxKind::PropValue
        )
    }

    /// Returns true for kinds that can carry a `Modifiers` child.
    pub fn is_declaration(self) -> bool {
        matches!(
            self,
            SyntaxKind::ClassDecl
                | SyntaxKind::MethodDecl
                | SyntaxKind::FieldDecl
                | SyntaxKind::LocalVarDecl
                | SyntaxKind::Param
                | SyntaxKind::PackageDecl
        )
    }

    pub fn is_literal(self) -> bool {
        matches!(
            self,
            SyntaxKind::StringLit | SyntaxKind::CharLit | SyntaxKind::TextBlock | SyntaxKind::NumberLit
        )
    }
}

impl std::fmt::Display for SyntaxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}
