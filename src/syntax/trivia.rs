//! Helpers for reading and rewriting leading trivia.

use serde::{Deserialize, Serialize};

/// Line terminator convention of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    /// Majority vote over the terminators present; LF when there are none.
    pub fn detect(text: &str) -> Self {
        let total = text.matches('\n').count();
        let crlf = text.matches("\r\n").count();
        if crlf > 0 && crlf * 2 >= total {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }

    /// Rewrites bare `\n` terminators in `text` to this convention.
    pub fn apply(&self, text: &str) -> String {
        match self {
            LineEnding::Lf => text.replace("\r\n", "\n"),
            LineEnding::CrLf => text.replace("\r\n", "\n").replace('\n', "\r\n"),
        }
    }
}

/// The whitespace after the last line break of `trivia`, or `None` when the
/// trivia does not start a new line.
pub fn indentation(trivia: &str) -> Option<&str> {
    let idx = trivia.rfind('\n')?;
    let tail = &trivia[idx + 1..];
    let width = tail
        .char_indices()
        .find(|(_, c)| *c != ' ' && *c != '\t')
        .map_or(tail.len(), |(i, _)| i);
    Some(&tail[..width])
}

pub fn starts_line(trivia: &str) -> bool {
    trivia.contains('\n')
}

pub fn newline_count(trivia: &str) -> usize {
    trivia.matches('\n').count()
}

/// True when the trivia contains an empty line (two or more line breaks).
pub fn has_blank_line(trivia: &str) -> bool {
    newline_count(trivia) >= 2
}

/// Replaces the indentation after the last line break with `indent`.
/// Trivia that does not start a line is returned unchanged.
pub fn reindent(trivia: &str, indent: &str) -> String {
    match trivia.rfind('\n') {
        Some(idx) => format!("{}{}", &trivia[..=idx], indent),
        None => trivia.to_string(),
    }
}
