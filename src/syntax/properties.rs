//! Line-oriented parser for `.properties` configuration files.
//!
//! Each logical line (physical lines joined by a trailing backslash) becomes
//! a `PropertyEntry` with three tokens: the raw key, the separator run
//! (whitespace plus an optional `=` or `:`), and the raw value. Comment lines,
//! blank lines, indentation and line breaks are trivia on the next token.

use super::{Span, SyntaxKind, SyntaxNode};
use crate::errors::SourceArc;
use crate::RecastError;

pub fn parse_properties(text: &str, _source: &SourceArc) -> Result<SyntaxNode, RecastError> {
    let mut entries = Vec::new();
    let mut pending = String::new();
    let len = text.len();
    let mut pos = 0;

    while pos < len {
        let line_end = text[pos..].find('\n').map_or(len, |i| pos + i);
        let line = &text[pos..line_end];
        let content = line.trim_start_matches([' ', '\t', '\x0C']);
        let body = content.trim_end_matches('\r');
        if body.is_empty() || body.starts_with('#') || body.starts_with('!') {
            let next = (line_end + 1).min(len);
            pending.push_str(&text[pos..next]);
            pos = next;
            continue;
        }

        let indent = line.len() - content.len();
        pending.push_str(&line[..indent]);
        let key_start = pos + indent;

        // Extend across continuation lines.
        let mut logical_end = line_end;
        while logical_end < len && ends_with_continuation(&text[key_start..logical_end]) {
            logical_end = text[logical_end + 1..]
                .find('\n')
                .map_or(len, |i| logical_end + 1 + i);
        }
        if text[..logical_end].ends_with('\r') {
            logical_end -= 1;
        }

        let logical = &text[key_start..logical_end];
        let key_len = key_length(logical);
        let sep_len = separator_length(&logical[key_len..]);
        let key = &logical[..key_len];
        let separator = &logical[key_len..key_len + sep_len];
        let value = &logical[key_len + sep_len..];

        let key_node = SyntaxNode::token_with_trivia(
            SyntaxKind::PropKey,
            std::mem::take(&mut pending),
            key,
        )
        .with_span(Span::new(key_start, key_start + key_len));
        let sep_start = key_start + key_len;
        let sep_node = SyntaxNode::token(SyntaxKind::PropSeparator, separator)
            .with_span(Span::new(sep_start, sep_start + sep_len));
        let value_start = sep_start + sep_len;
        let value_node = SyntaxNode::token(SyntaxKind::PropValue, value)
            .with_span(Span::new(value_start, logical_end));
        entries.push(
            SyntaxNode::composite(SyntaxKind::PropertyEntry, vec![key_node, sep_node, value_node])
                .with_span(Span::new(key_start, logical_end)),
        );
        pos = logical_end;
    }

    entries.push(SyntaxNode::token_with_trivia(SyntaxKind::Eof, pending, "").with_span(Span::at(len)));
    Ok(SyntaxNode::composite(SyntaxKind::PropertiesFile, entries).with_span(Span::new(0, len)))
}

fn ends_with_continuation(line: &str) -> bool {
    let line = line.trim_end_matches('\r');
    let slashes = line.chars().rev().take_while(|c| *c == '\\').count();
    slashes % 2 == 1
}

fn key_length(logical: &str) -> usize {
    let mut escaped = false;
    for (i, c) in logical.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' | ' ' | '\t' | '\x0C' => return i,
            _ => {}
        }
    }
    logical.len()
}

fn separator_length(rest: &str) -> usize {
    let is_blank = |c: char| c == ' ' || c == '\t' || c == '\x0C';
    let mut len = rest.len() - rest.trim_start_matches(is_blank).len();
    if rest[len..].starts_with(['=', ':']) {
        len += 1;
        let after = &rest[len..];
        len += after.len() - after.trim_start_matches(is_blank).len();
    }
    len
}

/// Decodes the escapes of a raw key or value: `\uXXXX`, `\t`, `\n`, `\r`,
/// `\f`, line continuations, and `\x` for any other `x`.
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0C'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some('\r') | Some('\n') => {
                if let Some('\n') = chars.peek() {
                    chars.next();
                }
                while let Some(' ' | '\t' | '\x0C') = chars.peek() {
                    chars.next();
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

/// Escapes a key so it reads back as `key`.
pub fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for c in key.chars() {
        match c {
            '=' | ':' | ' ' | '#' | '!' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}

/// Escapes a value so it reads back as `value`. Separators need no escape
/// inside a value; leading whitespace does.
pub fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut leading = true;
    for c in value.chars() {
        match c {
            ' ' if leading => out.push_str("\\ "),
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
        leading &= c == ' ';
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::to_error_source;

    fn parse(text: &str) -> SyntaxNode {
        parse_properties(text, &to_error_source("application.properties", text)).expect("parses")
    }

    fn keys(root: &SyntaxNode) -> Vec<String> {
        root.children_of(SyntaxKind::PropertyEntry)
            .map(|e| e.children()[0].token_text().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn entries_comments_and_blank_lines_round_trip() {
        let text = "# server\nserver.port=8080\n\n  spring.datasource.url : jdbc:h2:mem\r\nempty\n! bang\nlast value\\\n    continued";
        let root = parse(text);
        assert_eq!(root.print(), text);
        assert_eq!(
            keys(&root),
            vec!["server.port", "spring.datasource.url", "empty", "last"]
        );
        let last = root.children_of(SyntaxKind::PropertyEntry).last().expect("entry");
        assert_eq!(last.children()[2].token_text(), Some("value\\\n    continued"));
        assert_eq!(unescape("value\\\n    continued"), "valuecontinued");
    }

    #[test]
    fn separators_keep_their_whitespace() {
        let root = parse("a = b\nc:d\ne f\n");
        let seps: Vec<_> = root
            .children_of(SyntaxKind::PropertyEntry)
            .map(|e| e.children()[1].token_text().unwrap_or_default().to_string())
            .collect();
        assert_eq!(seps, vec![" = ", ":", " "]);
    }

    #[test]
    fn escaped_separators_belong_to_the_key() {
        let root = parse("my\\:key=1\n");
        assert_eq!(keys(&root), vec!["my\\:key"]);
        assert_eq!(unescape("my\\:key"), "my:key");
        assert_eq!(escape_key("my:key"), "my\\:key");
    }

    #[test]
    fn values_escape_leading_blanks_only() {
        assert_eq!(escape_value("  a b"), "\\ \\ a b");
        assert_eq!(escape_value("C:\\tmp"), "C:\\\\tmp");
        assert_eq!(unescape(&escape_value(" x=y")), " x=y");
    }
}
