//! Recursive-descent parser from Java tokens to the lossless tree.
//!
//! Declarations (package, imports, types, members, parameters, local
//! variables) get precise structure because that is what migration recipes
//! edit. Statements and expressions are kept shallow: calls, member accesses,
//! object creation and bracketed groups are structured, operators stay flat
//! tokens inside an `Expr`. Every token of the input ends up in the tree
//! exactly once, whatever the shape.

use super::lexer::{self, Token, PRIMITIVES};
use super::{Span, SyntaxKind, SyntaxNode};
use crate::errors::SourceArc;
use crate::{err_src, RecastError};

type ParseResult = Result<SyntaxNode, RecastError>;

const MODIFIER_KEYWORDS: &[&str] = &[
    "public",
    "protected",
    "private",
    "static",
    "final",
    "abstract",
    "native",
    "synchronized",
    "transient",
    "volatile",
    "strictfp",
    "default",
];

const CLOSERS: &[&str] = &[")", "]", "}"];

/// Parses a Java compilation unit.
pub fn parse_java(text: &str, source: &SourceArc) -> ParseResult {
    let tokens = lexer::tokenize(text, source)?;
    let mut parser = JavaParser {
        tokens,
        pos: 0,
        source,
    };
    let unit = parser.compilation_unit()?;
    Ok(unit.with_span(Span::new(0, text.len())))
}

struct JavaParser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    source: &'a SourceArc,
}

impl JavaParser<'_> {
    // ========================================================================
    // CURSOR
    // ========================================================================

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, n: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + n).min(last)]
    }

    fn nth_is(&self, n: usize, text: &str) -> bool {
        let token = self.peek_at(n);
        token.kind != SyntaxKind::Eof && !token.kind.is_literal() && token.text == text
    }

    fn at(&self, text: &str) -> bool {
        self.nth_is(0, text)
    }

    fn at_any(&self, texts: &[&str]) -> bool {
        texts.iter().any(|t| self.at(t))
    }

    fn at_kind(&self, kind: SyntaxKind) -> bool {
        self.peek().kind == kind
    }

    fn at_eof(&self) -> bool {
        self.at_kind(SyntaxKind::Eof)
    }

    fn at_contextual(&self, n: usize, word: &str) -> bool {
        let token = self.peek_at(n);
        token.kind == SyntaxKind::Ident && token.text == word
    }

    fn prev_text(&self) -> &str {
        match self.pos {
            0 => "",
            p => &self.tokens[p - 1].text,
        }
    }

    fn bump(&mut self) -> SyntaxNode {
        let token = self.peek().clone();
        if token.kind != SyntaxKind::Eof {
            self.pos += 1;
        }
        SyntaxNode::token_with_trivia(token.kind, token.leading, token.text).with_span(token.span)
    }

    fn expect(&mut self, text: &str) -> ParseResult {
        if self.at(text) {
            Ok(self.bump())
        } else {
            Err(self.error_here(format!("expected '{}'", text)))
        }
    }

    fn expect_ident(&mut self) -> ParseResult {
        if self.at_kind(SyntaxKind::Ident) {
            Ok(self.bump())
        } else {
            Err(self.error_here("expected an identifier"))
        }
    }

    fn error_here(&self, message: impl Into<String>) -> RecastError {
        let token = self.peek();
        let found = match token.kind {
            SyntaxKind::Eof => "end of file".to_string(),
            _ => format!("'{}'", token.text),
        };
        err_src!(
            Parse,
            format!("{}, found {}", message.into(), found),
            self.source,
            token.span
        )
    }

    fn finish(&self, kind: SyntaxKind, children: Vec<SyntaxNode>) -> SyntaxNode {
        let span = match (children.first(), children.last()) {
            (Some(first), Some(last)) => Span::new(first.span().start, last.span().end),
            _ => Span::at(self.peek().span.start),
        };
        SyntaxNode::composite(kind, children).with_span(span)
    }

    // ========================================================================
    // COMPILATION UNIT
    // ========================================================================

    fn compilation_unit(&mut self) -> ParseResult {
        let mut children = Vec::new();
        while !self.at_eof() {
            if self.at("import") {
                children.push(self.import_decl()?);
                continue;
            }
            if self.at(";") {
                children.push(self.bump());
                continue;
            }
            let modifiers = self.modifiers()?;
            if self.at("package") {
                children.push(self.package_decl(modifiers)?);
            } else {
                children.push(self.type_decl(modifiers)?);
            }
        }
        children.push(self.bump());
        Ok(self.finish(SyntaxKind::CompilationUnit, children))
    }

    fn package_decl(&mut self, modifiers: SyntaxNode) -> ParseResult {
        let children = vec![
            modifiers,
            self.expect("package")?,
            self.qualified_name(false)?,
            self.expect(";")?,
        ];
        Ok(self.finish(SyntaxKind::PackageDecl, children))
    }

    fn import_decl(&mut self) -> ParseResult {
        let mut children = vec![self.expect("import")?];
        if self.at("static") {
            children.push(self.bump());
        }
        children.push(self.qualified_name(true)?);
        children.push(self.expect(";")?);
        Ok(self.finish(SyntaxKind::ImportDecl, children))
    }

    fn qualified_name(&mut self, allow_wildcard: bool) -> ParseResult {
        let mut children = vec![self.expect_ident()?];
        while self.at(".") {
            if self.peek_at(1).kind == SyntaxKind::Ident {
                children.push(self.bump());
                children.push(self.bump());
            } else if allow_wildcard && self.nth_is(1, "*") {
                children.push(self.bump());
                children.push(self.bump());
                break;
            } else {
                break;
            }
        }
        Ok(self.finish(SyntaxKind::QualifiedName, children))
    }

    // ========================================================================
    // MODIFIERS AND ANNOTATIONS
    // ========================================================================

    fn modifiers(&mut self) -> ParseResult {
        let mut children = Vec::new();
        loop {
            if self.at("@") && !self.nth_is(1, "interface") {
                children.push(self.annotation()?);
                continue;
            }
            let token = self.peek();
            let is_keyword_modifier = token.kind == SyntaxKind::Keyword
                && MODIFIER_KEYWORDS.contains(&token.text.as_str())
                && !(token.text == "default" && (self.nth_is(1, ":") || self.nth_is(1, "->")));
            if is_keyword_modifier {
                children.push(self.bump());
                continue;
            }
            if self.at_contextual(0, "sealed") && self.starts_declaration_word(1) {
                children.push(self.bump());
                continue;
            }
            if self.at_contextual(0, "non") && self.nth_is(1, "-") && self.at_contextual(2, "sealed")
            {
                for _ in 0..3 {
                    children.push(self.bump());
                }
                continue;
            }
            break;
        }
        Ok(self.finish(SyntaxKind::Modifiers, children))
    }

    /// `final` and annotations, the only modifiers allowed on locals and
    /// parameters.
    fn local_modifiers(&mut self) -> ParseResult {
        let mut children = Vec::new();
        loop {
            if self.at("@") {
                children.push(self.annotation()?);
            } else if self.at("final") {
                children.push(self.bump());
            } else {
                break;
            }
        }
        Ok(self.finish(SyntaxKind::Modifiers, children))
    }

    fn starts_declaration_word(&self, n: usize) -> bool {
        let token = self.peek_at(n);
        matches!(
            token.text.as_str(),
            "class"
                | "interface"
                | "abstract"
                | "static"
                | "final"
                | "public"
                | "protected"
                | "private"
                | "strictfp"
                | "@"
        )
    }

    fn annotation(&mut self) -> ParseResult {
        let mut children = vec![self.expect("@")?, self.qualified_name(false)?];
        if self.at("(") {
            children.push(self.annotation_args()?);
        }
        Ok(self.finish(SyntaxKind::Annotation, children))
    }

    fn annotation_args(&mut self) -> ParseResult {
        let mut children = vec![self.expect("(")?];
        while !self.at(")") {
            if self.at_eof() {
                return Err(self.error_here("expected ')'"));
            }
            if self.at(",") {
                children.push(self.bump());
                continue;
            }
            let before = self.pos;
            if self.at_kind(SyntaxKind::Ident) && self.nth_is(1, "=") {
                let name = self.bump();
                let eq = self.bump();
                let value = self.expression(&[",", ")"])?;
                children.push(self.finish(SyntaxKind::AnnotationPair, vec![name, eq, value]));
            } else {
                children.push(self.expression(&[",", ")"])?);
            }
            if self.pos == before {
                return Err(self.error_here("unexpected token in annotation arguments"));
            }
        }
        children.push(self.bump());
        Ok(self.finish(SyntaxKind::AnnotationArgs, children))
    }

    // ========================================================================
    // TYPE DECLARATIONS
    // ========================================================================

    fn at_type_decl(&self) -> bool {
        self.at_any(&["class", "interface", "enum"])
            || (self.at("@") && self.nth_is(1, "interface"))
            || (self.at_contextual(0, "record") && self.peek_at(1).kind == SyntaxKind::Ident)
    }

    fn type_decl(&mut self, modifiers: SyntaxNode) -> ParseResult {
        let mut children = vec![modifiers];
        let keyword = if self.at("@") && self.nth_is(1, "interface") {
            children.push(self.bump());
            children.push(self.bump());
            "@interface".to_string()
        } else if self.at_type_decl() {
            let word = self.peek().text.clone();
            children.push(self.bump());
            word
        } else {
            return Err(self.error_here("expected a class, interface, enum or record declaration"));
        };

        children.push(self.expect_ident()?);
        if self.at("<") {
            children.push(self.type_args(SyntaxKind::TypeParams)?);
        }
        if keyword == "record" {
            children.push(self.param_list(SyntaxKind::RecordHeader)?);
        }
        if self.at("extends") {
            children.push(self.type_list(SyntaxKind::ExtendsClause)?);
        }
        if self.at("implements") {
            children.push(self.type_list(SyntaxKind::ImplementsClause)?);
        }
        if self.at_contextual(0, "permits") {
            children.push(self.type_list(SyntaxKind::PermitsClause)?);
        }
        children.push(self.class_body(keyword == "enum")?);
        Ok(self.finish(SyntaxKind::ClassDecl, children))
    }

    fn type_list(&mut self, kind: SyntaxKind) -> ParseResult {
        let mut children = vec![self.bump(), self.type_ref()?];
        while self.at(",") {
            children.push(self.bump());
            children.push(self.type_ref()?);
        }
        Ok(self.finish(kind, children))
    }

    fn class_body(&mut self, is_enum: bool) -> ParseResult {
        let mut children = vec![self.expect("{")?];
        if is_enum {
            children.push(self.enum_constants()?);
        }
        while !self.at("}") {
            if self.at_eof() {
                return Err(self.error_here("expected '}' to close the class body"));
            }
            children.push(self.member()?);
        }
        children.push(self.bump());
        Ok(self.finish(SyntaxKind::ClassBody, children))
    }

    fn enum_constants(&mut self) -> ParseResult {
        let mut children = Vec::new();
        let mut depth = 0usize;
        loop {
            if self.at_eof() {
                return Err(self.error_here("expected '}' to close the enum body"));
            }
            if depth == 0 && self.at("}") {
                break;
            }
            if depth == 0 && self.at(";") {
                children.push(self.bump());
                break;
            }
            if self.at_any(&["(", "{", "["]) {
                depth += 1;
            } else if self.at_any(CLOSERS) {
                depth = depth.saturating_sub(1);
            }
            children.push(self.bump());
        }
        Ok(self.finish(SyntaxKind::EnumConstants, children))
    }

    fn member(&mut self) -> ParseResult {
        if self.at(";") {
            return Ok(self.bump());
        }
        if self.at("{") {
            let block = self.block()?;
            return Ok(self.finish(SyntaxKind::Initializer, vec![block]));
        }
        if self.at("static") && self.nth_is(1, "{") {
            let keyword = self.bump();
            let block = self.block()?;
            return Ok(self.finish(SyntaxKind::Initializer, vec![keyword, block]));
        }

        let modifiers = self.modifiers()?;
        if self.at_type_decl() {
            return self.type_decl(modifiers);
        }
        let mut children = vec![modifiers];
        if self.at("<") {
            children.push(self.type_args(SyntaxKind::TypeParams)?);
        }
        // Constructor, or compact canonical constructor of a record
        if self.at_kind(SyntaxKind::Ident) && (self.nth_is(1, "(") || self.nth_is(1, "{")) {
            children.push(self.bump());
            if self.at("{") {
                children.push(self.block()?);
                return Ok(self.finish(SyntaxKind::MethodDecl, children));
            }
            return self.method_rest(children);
        }

        children.push(self.type_ref()?);
        let name = self.expect_ident()?;
        if self.at("(") {
            children.push(name);
            return self.method_rest(children);
        }

        children.push(self.var_declarator(name)?);
        while self.at(",") {
            children.push(self.bump());
            let name = self.expect_ident()?;
            children.push(self.var_declarator(name)?);
        }
        children.push(self.expect(";")?);
        Ok(self.finish(SyntaxKind::FieldDecl, children))
    }

    fn method_rest(&mut self, mut children: Vec<SyntaxNode>) -> ParseResult {
        children.push(self.param_list(SyntaxKind::ParamList)?);
        while self.at("[") && self.nth_is(1, "]") {
            children.push(self.bump());
            children.push(self.bump());
        }
        if self.at("throws") {
            children.push(self.type_list(SyntaxKind::ThrowsClause)?);
        }
        if self.at("default") {
            let keyword = self.bump();
            let value = self.expression(&[";"])?;
            children.push(self.finish(SyntaxKind::DefaultValue, vec![keyword, value]));
        }
        if self.at("{") {
            children.push(self.block()?);
        } else {
            children.push(self.expect(";")?);
        }
        Ok(self.finish(SyntaxKind::MethodDecl, children))
    }

    fn param_list(&mut self, kind: SyntaxKind) -> ParseResult {
        let mut children = vec![self.expect("(")?];
        while !self.at(")") {
            if self.at_eof() {
                return Err(self.error_here("expected ')' to close the parameter list"));
            }
            if self.at(",") {
                children.push(self.bump());
                continue;
            }
            children.push(self.param()?);
        }
        children.push(self.bump());
        Ok(self.finish(kind, children))
    }

    fn param(&mut self) -> ParseResult {
        let mut children = vec![self.local_modifiers()?, self.type_ref()?];
        // `String @NonNull ... args`
        while self.at("@") {
            children.push(self.annotation()?);
        }
        if self.at("...") {
            children.push(self.bump());
        }
        if self.at("this") {
            children.push(self.bump());
        } else {
            children.push(self.expect_ident()?);
        }
        while self.at("[") && self.nth_is(1, "]") {
            children.push(self.bump());
            children.push(self.bump());
        }
        Ok(self.finish(SyntaxKind::Param, children))
    }

    fn var_declarator(&mut self, name: SyntaxNode) -> ParseResult {
        let mut children = vec![name];
        while self.at("[") && self.nth_is(1, "]") {
            children.push(self.bump());
            children.push(self.bump());
        }
        if self.at("=") {
            children.push(self.bump());
            let init = if self.at("{") {
                self.array_init()?
            } else {
                self.expression(&[",", ";"])?
            };
            children.push(init);
        }
        Ok(self.finish(SyntaxKind::VarDeclarator, children))
    }

    // ========================================================================
    // TYPES
    // ========================================================================

    fn at_primitive(&self) -> bool {
        let token = self.peek();
        token.kind == SyntaxKind::Keyword && PRIMITIVES.contains(&token.text.as_str())
    }

    fn type_ref(&mut self) -> ParseResult {
        let mut children = Vec::new();
        while self.at("@") {
            children.push(self.annotation()?);
        }
        if self.at_primitive() {
            children.push(self.bump());
        } else if self.at_kind(SyntaxKind::Ident) {
            children.push(self.qualified_name(false)?);
            if self.at("<") {
                children.push(self.type_args(SyntaxKind::TypeArgs)?);
                while self.at(".") && self.peek_at(1).kind == SyntaxKind::Ident {
                    children.push(self.bump());
                    children.push(self.bump());
                    if self.at("<") {
                        children.push(self.type_args(SyntaxKind::TypeArgs)?);
                    }
                }
            }
        } else {
            return Err(self.error_here("expected a type"));
        }
        while self.at("[") && self.nth_is(1, "]") {
            children.push(self.bump());
            children.push(self.bump());
        }
        Ok(self.finish(SyntaxKind::TypeRef, children))
    }

    /// Angle-bracketed type arguments or parameters, kept as flat tokens.
    fn type_args(&mut self, kind: SyntaxKind) -> ParseResult {
        let mut children = vec![self.expect("<")?];
        let mut depth = 1usize;
        while depth > 0 {
            let token = self.peek();
            let allowed = match token.kind {
                SyntaxKind::Ident => true,
                SyntaxKind::Keyword => {
                    matches!(token.text.as_str(), "extends" | "super")
                        || PRIMITIVES.contains(&token.text.as_str())
                }
                SyntaxKind::Punct => matches!(
                    token.text.as_str(),
                    "<" | ">" | "," | "." | "?" | "&" | "[" | "]" | "@"
                ),
                _ => false,
            };
            if !allowed {
                return Err(self.error_here("malformed type arguments"));
            }
            if token.text == "<" {
                depth += 1;
            } else if token.text == ">" {
                depth -= 1;
            }
            children.push(self.bump());
        }
        Ok(self.finish(kind, children))
    }

    // ========================================================================
    // STATEMENTS
    // ========================================================================

    fn block(&mut self) -> ParseResult {
        let mut children = vec![self.expect("{")?];
        while !self.at("}") {
            if self.at_eof() {
                return Err(self.error_here("expected '}' to close the block"));
            }
            children.push(self.statement()?);
        }
        children.push(self.bump());
        Ok(self.finish(SyntaxKind::Block, children))
    }

    fn statement(&mut self) -> ParseResult {
        if self.at("{") {
            return self.block();
        }
        if self.at(";") {
            let semi = self.bump();
            return Ok(self.finish(SyntaxKind::Statement, vec![semi]));
        }
        if self.at_local_type_decl() {
            let modifiers = self.modifiers()?;
            return self.type_decl(modifiers);
        }
        if let Some(decl) = self.try_local_var_decl()? {
            return Ok(decl);
        }
        self.generic_statement()
    }

    fn at_local_type_decl(&self) -> bool {
        let mut n = 0;
        while matches!(
            self.peek_at(n).text.as_str(),
            "final" | "abstract" | "static" | "strictfp"
        ) {
            n += 1;
        }
        let token = self.peek_at(n);
        matches!(token.text.as_str(), "class" | "interface" | "enum")
            || (self.at_contextual(n, "record") && self.peek_at(n + 1).kind == SyntaxKind::Ident)
    }

    fn try_local_var_decl(&mut self) -> Result<Option<SyntaxNode>, RecastError> {
        let start = self.pos;
        match self.local_var_decl() {
            Ok(Some(decl)) => Ok(Some(decl)),
            Ok(None) | Err(_) => {
                self.pos = start;
                Ok(None)
            }
        }
    }

    fn local_var_decl(&mut self) -> Result<Option<SyntaxNode>, RecastError> {
        let modifiers = self.local_modifiers()?;
        let starts_type =
            self.at_kind(SyntaxKind::Ident) || (self.at_primitive() && !self.at("void"));
        if !starts_type {
            return Ok(None);
        }
        let ty = self.type_ref()?;
        if !self.at_kind(SyntaxKind::Ident) {
            return Ok(None);
        }
        if !["=", ";", ",", "["].iter().any(|t| self.nth_is(1, t)) {
            return Ok(None);
        }
        let name = self.bump();
        let mut children = vec![modifiers, ty, self.var_declarator(name)?];
        while self.at(",") {
            children.push(self.bump());
            let name = self.expect_ident()?;
            children.push(self.var_declarator(name)?);
        }
        children.push(self.expect(";")?);
        Ok(Some(self.finish(SyntaxKind::LocalVarDecl, children)))
    }

    /// Any other statement: a run of expression elements up to `;`, or up to
    /// a block that ends a control-flow construct.
    fn generic_statement(&mut self) -> ParseResult {
        let mut children = Vec::new();
        let starts_with_switch = self.at("switch");
        let is_case_arm = self.at("case") || self.at("default");
        loop {
            if self.at_eof() {
                return Err(self.error_here("expected ';'"));
            }
            if self.at(";") {
                children.push(self.bump());
                break;
            }
            if self.at("}") {
                if children.is_empty() {
                    return Err(self.error_here("unexpected '}'"));
                }
                break;
            }
            if self.at(")") || self.at("]") {
                return Err(self.error_here("unbalanced brackets"));
            }
            if self.at("{") {
                let after_arrow = self.prev_text() == "->";
                let after_do = self.prev_text() == "do";
                children.push(self.block()?);
                let continues = self.at_any(&["else", "catch", "finally"])
                    || (after_do && self.at("while"))
                    || (after_arrow && !is_case_arm);
                if continues {
                    continue;
                }
                break;
            }
            children.push(self.expr_element()?);
            if starts_with_switch && children.len() == 1 && !self.at(";") {
                break;
            }
        }
        Ok(self.finish(SyntaxKind::Statement, children))
    }

    // ========================================================================
    // EXPRESSIONS
    // ========================================================================

    fn expression(&mut self, stops: &[&str]) -> ParseResult {
        let mut children = Vec::new();
        loop {
            if self.at_eof() {
                return Err(self.error_here("unexpected end of file in expression"));
            }
            if self.at_any(stops) || self.at_any(CLOSERS) {
                break;
            }
            children.push(self.expr_element()?);
        }
        Ok(self.finish(SyntaxKind::Expr, children))
    }

    fn expr_element(&mut self) -> ParseResult {
        let (kind, text) = {
            let token = self.peek();
            (token.kind, token.text.clone())
        };
        match kind {
            SyntaxKind::Ident => {
                let base = self.bump();
                self.postfix(base, true)
            }
            SyntaxKind::Keyword => match text.as_str() {
                "this" | "super" => {
                    let base = self.bump();
                    self.postfix(base, true)
                }
                "new" => {
                    let creation = self.new_class()?;
                    self.postfix(creation, false)
                }
                "switch" => self.switch_expr(),
                "true" | "false" | "null" => {
                    let literal = self.bump();
                    self.postfix(literal, false)
                }
                word if PRIMITIVES.contains(&word) => {
                    let primitive = self.bump();
                    self.postfix(primitive, false)
                }
                _ => Ok(self.bump()),
            },
            SyntaxKind::StringLit
            | SyntaxKind::CharLit
            | SyntaxKind::TextBlock
            | SyntaxKind::NumberLit => {
                let literal = self.bump();
                self.postfix(literal, false)
            }
            SyntaxKind::Punct => match text.as_str() {
                "(" => {
                    let group = self.delimited(SyntaxKind::Parens)?;
                    self.postfix(group, false)
                }
                "{" if self.prev_text() == "->" => self.block(),
                "{" => self.array_init(),
                "@" => self.annotation(),
                _ => Ok(self.bump()),
            },
            _ => Ok(self.bump()),
        }
    }

    fn postfix(&mut self, base: SyntaxNode, callable: bool) -> ParseResult {
        let mut node = base;
        let mut callable = callable;
        loop {
            if callable && self.at("(") {
                let args = self.delimited(SyntaxKind::ArgList)?;
                node = self.finish(SyntaxKind::MethodCall, vec![node, args]);
                callable = false;
                continue;
            }
            callable = false;

            if self.at(".") {
                let dot = self.bump();
                let mut parts = vec![node, dot];
                if self.at("<") {
                    parts.push(self.type_args(SyntaxKind::TypeArgs)?);
                }
                if self.at("new") {
                    parts.push(self.new_class()?);
                    node = self.finish(SyntaxKind::FieldAccess, parts);
                    continue;
                }
                let is_member = self.at_kind(SyntaxKind::Ident)
                    || self.at_any(&["class", "this", "super"]);
                if !is_member {
                    return Err(self.error_here("expected a member name after '.'"));
                }
                parts.push(self.bump());
                if self.at("(") {
                    parts.push(self.delimited(SyntaxKind::ArgList)?);
                    node = self.finish(SyntaxKind::MethodCall, parts);
                } else {
                    node = self.finish(SyntaxKind::FieldAccess, parts);
                }
                continue;
            }

            if self.at("[") {
                let mut parts = vec![node, self.bump()];
                if !self.at("]") {
                    parts.push(self.expression(&["]"])?);
                }
                parts.push(self.expect("]")?);
                node = self.finish(SyntaxKind::ArrayAccess, parts);
                continue;
            }

            if self.at("::") {
                let mut parts = vec![node, self.bump()];
                if self.at("<") {
                    parts.push(self.type_args(SyntaxKind::TypeArgs)?);
                }
                if self.at("new") || self.at_kind(SyntaxKind::Ident) {
                    parts.push(self.bump());
                } else {
                    return Err(self.error_here("expected a method name after '::'"));
                }
                node = self.finish(SyntaxKind::MethodRef, parts);
                continue;
            }
            break;
        }
        Ok(node)
    }

    fn new_class(&mut self) -> ParseResult {
        let mut children = vec![self.expect("new")?];
        if self.at("<") {
            children.push(self.type_args(SyntaxKind::TypeArgs)?);
        }
        children.push(self.type_ref()?);
        if self.at("[") {
            while self.at("[") {
                children.push(self.bump());
                if !self.at("]") {
                    children.push(self.expression(&["]"])?);
                }
                children.push(self.expect("]")?);
            }
            if self.at("{") {
                children.push(self.array_init()?);
            }
        } else if self.at("{") {
            children.push(self.array_init()?);
        } else {
            children.push(self.delimited(SyntaxKind::ArgList)?);
            if self.at("{") {
                children.push(self.class_body(false)?);
            }
        }
        Ok(self.finish(SyntaxKind::NewClass, children))
    }

    fn switch_expr(&mut self) -> ParseResult {
        let mut children = vec![self.expect("switch")?];
        children.push(self.delimited(SyntaxKind::Parens)?);
        if self.at("{") {
            children.push(self.block()?);
        }
        Ok(self.finish(SyntaxKind::Expr, children))
    }

    /// Parenthesized, comma-separated expressions.
    fn delimited(&mut self, kind: SyntaxKind) -> ParseResult {
        let mut children = vec![self.expect("(")?];
        while !self.at(")") {
            if self.at_eof() {
                return Err(self.error_here("expected ')'"));
            }
            if self.at(",") {
                children.push(self.bump());
                continue;
            }
            let before = self.pos;
            children.push(self.expression(&[",", ")"])?);
            if self.pos == before {
                return Err(self.error_here("unbalanced brackets"));
            }
        }
        children.push(self.bump());
        Ok(self.finish(kind, children))
    }

    fn array_init(&mut self) -> ParseResult {
        let mut children = vec![self.expect("{")?];
        while !self.at("}") {
            if self.at_eof() {
                return Err(self.error_here("expected '}'"));
            }
            if self.at(",") || self.at(";") {
                children.push(self.bump());
                continue;
            }
            let before = self.pos;
            children.push(self.expression(&[",", "}", ";"])?);
            if self.pos == before {
                return Err(self.error_here("unbalanced brackets"));
            }
        }
        children.push(self.bump());
        Ok(self.finish(SyntaxKind::ArrayInit, children))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::to_error_source;

    fn parse(text: &str) -> SyntaxNode {
        parse_java(text, &to_error_source("T.java", text)).expect("parses")
    }

    fn kinds(root: &SyntaxNode) -> Vec<SyntaxKind> {
        root.descendants().map(|n| n.kind()).collect()
    }

    const SERVICE: &str = r#"// Licensed to someone
package com.example.app;

import java.util.List;
import org.springframework.stereotype.Service;
import static java.util.Objects.requireNonNull;

/**
 * Greets people.
 */
@Service
public class Greeter<T extends Comparable<T>> extends Base implements Runnable, AutoCloseable {

    private static final String PREFIX = "Hello, ";   // trailing
    private final List<String> names = new java.util.ArrayList<>();
    int[] counts = {1, 2, 3}, more;

    public Greeter(@Value("${greeting}") String greeting) {
        super();
        requireNonNull(greeting);
    }

    @Override
    public void run() {
        for (String name : names) {
            if (name.isEmpty()) { continue; } else if (name.length() > 3) System.out.println(PREFIX + name);
        }
        Runnable r = () -> { System.out.println("x"); };
        names.forEach(n -> System.out.println(n));
        int y = switch (names.size()) { case 0 -> 1; default -> { yield 2; } };
        try (var in = open()) { in.read(); } catch (IOException | RuntimeException e) { throw e; } finally { close(); }
        Object o = new Object() { @Override public String toString() { return "o"; } };
        String[] arr = new String[] { "a", "b" };
        label: do { y--; } while (y > 0);
    }

    enum Mode { ON, OFF("x") { void f() {} }; Mode() {} Mode(String s) {} }

    record Pair(String left, String right) {
        Pair { requireNonNull(left); }
    }

    @interface Marker { String value() default ""; }
}
"#;

    #[test]
    fn round_trip_is_byte_exact() {
        let root = parse(SERVICE);
        assert_eq!(root.print(), SERVICE);
        assert_eq!(root.span(), Span::new(0, SERVICE.len()));
    }

    #[test]
    fn declarations_are_structured() {
        let root = parse(SERVICE);
        let found = kinds(&root);
        for kind in [
            SyntaxKind::PackageDecl,
            SyntaxKind::ImportDecl,
            SyntaxKind::ClassDecl,
            SyntaxKind::Annotation,
            SyntaxKind::TypeParams,
            SyntaxKind::ExtendsClause,
            SyntaxKind::ImplementsClause,
            SyntaxKind::FieldDecl,
            SyntaxKind::MethodDecl,
            SyntaxKind::Param,
            SyntaxKind::LocalVarDecl,
            SyntaxKind::MethodCall,
            SyntaxKind::NewClass,
            SyntaxKind::EnumConstants,
            SyntaxKind::RecordHeader,
            SyntaxKind::DefaultValue,
        ] {
            assert!(found.contains(&kind), "missing {:?}", kind);
        }
        let imports = root.children_of(SyntaxKind::ImportDecl).count();
        assert_eq!(imports, 3);
    }

    #[test]
    fn annotated_varargs_parse() {
        let text = "class A { void f(final String @NonNull ... args) {} }";
        let root = parse(text);
        assert_eq!(root.print(), text);
        let param = root
            .descendants()
            .find(|n| n.kind() == SyntaxKind::Param)
            .expect("param");
        assert!(param.has_token("..."));
        assert_eq!(param.children_of(SyntaxKind::Annotation).count(), 1);
    }

    #[test]
    fn trailing_trivia_lives_on_eof() {
        let root = parse("class A {}\n\n// end\n");
        let eof = root.last_token().expect("eof");
        assert_eq!(eof.kind(), SyntaxKind::Eof);
        assert_eq!(eof.leading_trivia(), "\n\n// end\n");
    }

    #[test]
    fn empty_file_is_a_bare_eof() {
        let root = parse("  \n");
        assert_eq!(root.children().len(), 1);
        assert_eq!(root.print(), "  \n");
    }

    #[test]
    fn unbalanced_braces_are_reported_with_a_span() {
        let text = "class A {\n  void f() {\n}\n";
        let err = parse_java(text, &to_error_source("A.java", text)).unwrap_err();
        assert_eq!(err.error_type(), crate::errors::ErrorType::Parse);
        assert!(err.message().contains("end of file"));
        assert_eq!(err.span(), Some(Span::at(text.len())));
    }

    #[test]
    fn comparison_is_not_mistaken_for_generics() {
        let root = parse("class A { void f() { if (a < b && c > d) { x = a < b; } } }");
        let locals = root
            .descendants()
            .filter(|n| n.kind() == SyntaxKind::LocalVarDecl)
            .count();
        assert_eq!(locals, 0);
    }
}
