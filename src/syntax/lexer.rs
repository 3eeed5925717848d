//! Java tokenizer built on the pest grammar in `java.pest`.
//!
//! Produces a flat token list in which every token owns the trivia in front
//! of it. A synthetic end-of-file token carries whatever trivia trails the
//! last real token, so the concatenation of all tokens is the input text.

use pest::{error::Error, Parser};
use pest_derive::Parser;

use super::{Span, SyntaxKind};
use crate::errors::SourceArc;
use crate::{err_msg, err_src, RecastError};

#[derive(Parser)]
#[grammar = "syntax/java.pest"]
struct JavaLexer;

/// Reserved words plus the literal keywords `true`, `false` and `null`.
/// Contextual words (`var`, `record`, `sealed`, `yield`, `permits`) lex as
/// identifiers.
pub(crate) const KEYWORDS: &[&str] = &[
    "abstract",
    "assert",
    "boolean",
    "break",
    "byte",
    "case",
    "catch",
    "char",
    "class",
    "const",
    "continue",
    "default",
    "do",
    "double",
    "else",
    "enum",
    "extends",
    "final",
    "finally",
    "float",
    "for",
    "goto",
    "if",
    "implements",
    "import",
    "instanceof",
    "int",
    "interface",
    "long",
    "native",
    "new",
    "package",
    "private",
    "protected",
    "public",
    "return",
    "short",
    "static",
    "strictfp",
    "super",
    "switch",
    "synchronized",
    "this",
    "throw",
    "throws",
    "transient",
    "try",
    "void",
    "volatile",
    "while",
    "true",
    "false",
    "null",
];

pub(crate) const PRIMITIVES: &[&str] = &[
    "boolean", "byte", "char", "short", "int", "long", "float", "double", "void",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub kind: SyntaxKind,
    pub leading: String,
    pub text: String,
    pub span: Span,
}

pub(crate) fn tokenize(text: &str, source: &SourceArc) -> Result<Vec<Token>, RecastError> {
    let mut pairs =
        JavaLexer::parse(Rule::java_tokens, text).map_err(|e| convert_lex_error(e, source))?;
    let file = pairs
        .next()
        .ok_or_else(|| err_msg!(Internal, "lexer produced no token stream"))?;

    let mut tokens = Vec::new();
    let mut pending = String::new();
    for pair in file.into_inner() {
        let pest_span = pair.as_span();
        let span = Span::new(pest_span.start(), pest_span.end());
        let lexeme = pair.as_str();
        let kind = match pair.as_rule() {
            Rule::trivia => {
                pending.push_str(lexeme);
                continue;
            }
            Rule::unterminated_comment => {
                return Err(err_src!(Parse, "unterminated block comment", source, span))
            }
            Rule::unterminated_string => {
                return Err(err_src!(
                    Parse,
                    "unterminated string or character literal",
                    source,
                    span
                ))
            }
            Rule::unknown => {
                return Err(err_src!(
                    Parse,
                    format!("unexpected character '{}'", lexeme),
                    source,
                    span
                ))
            }
            Rule::text_block => SyntaxKind::TextBlock,
            Rule::string_lit => SyntaxKind::StringLit,
            Rule::char_lit => SyntaxKind::CharLit,
            Rule::number_lit => SyntaxKind::NumberLit,
            Rule::ident if KEYWORDS.contains(&lexeme) => SyntaxKind::Keyword,
            Rule::ident => SyntaxKind::Ident,
            Rule::punct => SyntaxKind::Punct,
            _ => continue,
        };
        tokens.push(Token {
            kind,
            leading: std::mem::take(&mut pending),
            text: lexeme.to_string(),
            span,
        });
    }

    tokens.push(Token {
        kind: SyntaxKind::Eof,
        leading: pending,
        text: String::new(),
        span: Span::at(text.len()),
    });
    Ok(tokens)
}

fn convert_lex_error(error: Error<Rule>, source: &SourceArc) -> RecastError {
    let span = match error.location {
        pest::error::InputLocation::Pos(pos) => Span::at(pos),
        pest::error::InputLocation::Span((start, end)) => Span::new(start, end),
    };
    err_src!(Parse, "malformed Java source", source, span)
}
