//! Source trees: a parsed file plus everything needed to print it back.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::java::parse_java;
use super::properties::parse_properties;
use super::{LineEnding, Markers, SyntaxNode};
use crate::errors::to_error_source;
use crate::{err_msg, RecastError};

const BOM: &str = "\u{feff}";

/// The languages the engine can parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Java,
    Properties,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "java" => Some(SourceKind::Java),
            "properties" => Some(SourceKind::Properties),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Java => "java",
            SourceKind::Properties => "properties",
        }
    }
}

/// A parsed file.
///
/// Printing a freshly parsed tree reproduces the input bytes exactly,
/// including a byte order mark and the original line terminators.
#[derive(Debug, Clone)]
pub struct SourceTree {
    path: PathBuf,
    kind: SourceKind,
    root: SyntaxNode,
    markers: Markers,
    bom: bool,
    line_ending: LineEnding,
}

impl SourceTree {
    /// Parses `text`, choosing the language from the file extension.
    pub fn parse(text: &str, path: impl Into<PathBuf>) -> Result<Self, RecastError> {
        let path = path.into();
        let kind = SourceKind::from_path(&path).ok_or_else(|| {
            err_msg!(
                Parse,
                "unsupported file type: {}",
                path.display()
            )
        })?;
        Self::parse_as(kind, text, path)
    }

    /// Parses raw bytes; input that is not valid UTF-8 is a parse error.
    pub fn from_bytes(bytes: &[u8], path: impl Into<PathBuf>) -> Result<Self, RecastError> {
        let path = path.into();
        let text = std::str::from_utf8(bytes).map_err(|e| {
            err_msg!(
                Parse,
                "{} is not valid UTF-8 (invalid byte at offset {})",
                path.display(),
                e.valid_up_to()
            )
        })?;
        Self::parse(text, path)
    }

    pub fn parse_as(
        kind: SourceKind,
        text: &str,
        path: impl Into<PathBuf>,
    ) -> Result<Self, RecastError> {
        let path = path.into();
        let (bom, body) = match text.strip_prefix(BOM) {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let source = to_error_source(path.display().to_string(), body);
        let root = match kind {
            SourceKind::Java => parse_java(body, &source)?,
            SourceKind::Properties => parse_properties(body, &source)?,
        };
        if root.print() != body {
            return Err(err_msg!(
                Internal,
                "printing the parsed tree of {} does not reproduce the input",
                path.display()
            ));
        }
        tracing::trace!(path = %path.display(), kind = kind.as_str(), "parsed source");
        Ok(SourceTree {
            path,
            kind,
            root,
            markers: Markers::new(),
            bom,
            line_ending: LineEnding::detect(body),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn root(&self) -> &SyntaxNode {
        &self.root
    }

    pub fn set_root(&mut self, root: SyntaxNode) {
        self.root = root;
    }

    pub fn with_root(mut self, root: SyntaxNode) -> Self {
        self.root = root;
        self
    }

    pub fn markers(&self) -> &Markers {
        &self.markers
    }

    pub fn markers_mut(&mut self) -> &mut Markers {
        &mut self.markers
    }

    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    pub fn has_bom(&self) -> bool {
        self.bom
    }

    /// The full file text.
    pub fn print(&self) -> String {
        let body = self.root.print();
        if self.bom {
            format!("{}{}", BOM, body)
        } else {
            body
        }
    }

    /// SHA-256 of the printed text, hex encoded.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.print().as_bytes());
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Drops markers whose node is no longer part of the tree.
    pub fn collect_garbage_markers(&mut self) {
        let live: std::collections::HashSet<_> = self.root.descendants().map(|n| n.id()).collect();
        self.markers.retain(|id, _| live.contains(&id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorType;

    #[test]
    fn bom_and_crlf_survive_a_round_trip() {
        let text = "\u{feff}package a;\r\n\r\nclass A {}\r\n";
        let tree = SourceTree::parse(text, "src/A.java").expect("parses");
        assert!(tree.has_bom());
        assert_eq!(tree.line_ending(), LineEnding::CrLf);
        assert_eq!(tree.print(), text);
    }

    #[test]
    fn invalid_utf8_is_a_parse_error() {
        let err = SourceTree::from_bytes(&[b'c', 0xff, 0xfe], "A.java").unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Parse);
        assert!(err.message().contains("UTF-8"));
    }

    #[test]
    fn kind_follows_the_extension() {
        assert!(SourceTree::parse("a=b", "application.properties").is_ok());
        let err = SourceTree::parse("{}", "config.json").unwrap_err();
        assert!(err.message().contains("unsupported"));
    }

    #[test]
    fn fingerprint_tracks_text() {
        let a = SourceTree::parse("class A {}", "A.java").expect("parses");
        let b = SourceTree::parse("class A {}", "B.java").expect("parses");
        let c = SourceTree::parse("class A { }", "A.java").expect("parses");
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }
}
