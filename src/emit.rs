//! Turns a pipeline result into something a user or a tool can consume.
//!
//! A [`ChangeSet`] is the serializable view of a run: per changed file the
//! before and after text, the recipes that touched it and every attributed
//! mutation, plus the diagnostics and parse errors of all files. Emitters
//! render a change set; [`write_in_place`] applies it to disk.

use std::path::PathBuf;

use difference::{Changeset, Difference};
use serde::Serialize;
use termcolor::{Color, ColorSpec, WriteColor};

use crate::composer::{FileOutcome, PipelineResult, SearchHit};
use crate::diagnostics::Diagnostic;
use crate::visitor::Mutation;
use crate::RecastError;

/// Unchanged lines shown around each hunk.
const CONTEXT_LINES: usize = 3;

// ============================================================================
// CHANGE SET
// ============================================================================

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChangeSet {
    pub files: Vec<FileChange>,
    pub diagnostics: Vec<FileDiagnostic>,
    pub search_hits: Vec<FileSearchHit>,
    pub errors: Vec<FileError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileChange {
    pub path: PathBuf,
    pub before: String,
    pub after: String,
    pub recipes: Vec<String>,
    pub mutations: Vec<Mutation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileDiagnostic {
    pub path: PathBuf,
    #[serde(flatten)]
    pub diagnostic: Diagnostic,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileSearchHit {
    pub path: PathBuf,
    #[serde(flatten)]
    pub hit: SearchHit,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileError {
    pub path: PathBuf,
    pub kind: &'static str,
    pub message: String,
}

impl ChangeSet {
    pub fn from_result(result: &PipelineResult) -> Self {
        let mut set = ChangeSet::default();
        for file in &result.files {
            match &file.outcome {
                FileOutcome::Changed(changed) => set.files.push(FileChange {
                    path: file.path.clone(),
                    before: changed.before.clone(),
                    after: changed.after.clone(),
                    recipes: file.recipes.clone(),
                    mutations: file.mutations.clone(),
                }),
                FileOutcome::ParseError(e) => set.errors.push(FileError {
                    path: file.path.clone(),
                    kind: e.error_type().as_str(),
                    message: e.message(),
                }),
                FileOutcome::Cancelled => set.errors.push(FileError {
                    path: file.path.clone(),
                    kind: "cancelled",
                    message: "run cancelled before the file finished".to_string(),
                }),
                FileOutcome::Unchanged => {}
            }
            set.diagnostics.extend(file.diagnostics.iter().map(|d| FileDiagnostic {
                path: file.path.clone(),
                diagnostic: d.clone(),
            }));
            set.search_hits.extend(file.search_hits.iter().map(|hit| FileSearchHit {
                path: file.path.clone(),
                hit: hit.clone(),
            }));
        }
        set
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

// ============================================================================
// EMITTERS
// ============================================================================

pub trait ChangeSetEmitter {
    fn emit(&self, changes: &ChangeSet, out: &mut dyn WriteColor) -> Result<(), RecastError>;
}

fn write_err(e: std::io::Error) -> RecastError {
    RecastError::io("<output>", e)
}

/// Unified line diffs, colored when `out` supports color.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnifiedDiffEmitter;

impl ChangeSetEmitter for UnifiedDiffEmitter {
    fn emit(&self, changes: &ChangeSet, out: &mut dyn WriteColor) -> Result<(), RecastError> {
        for file in &changes.files {
            let path = file.path.display().to_string().replace('\\', "/");
            out.set_color(ColorSpec::new().set_bold(true)).map_err(write_err)?;
            writeln!(out, "--- a/{}", path).map_err(write_err)?;
            writeln!(out, "+++ b/{}", path).map_err(write_err)?;
            out.reset().map_err(write_err)?;
            if !file.recipes.is_empty() {
                out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow))).map_err(write_err)?;
                writeln!(out, "# recipes: {}", file.recipes.join(", ")).map_err(write_err)?;
                out.reset().map_err(write_err)?;
            }
            for hunk in hunks(&line_ops(&file.before, &file.after)) {
                write_hunk(out, &hunk).map_err(write_err)?;
            }
        }
        Ok(())
    }
}

/// The whole change set as pretty-printed JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEmitter;

impl ChangeSetEmitter for JsonEmitter {
    fn emit(&self, changes: &ChangeSet, out: &mut dyn WriteColor) -> Result<(), RecastError> {
        serde_json::to_writer_pretty(&mut *out, changes)
            .map_err(|e| crate::err_msg!(Internal, "could not serialize change set: {}", e))?;
        writeln!(out).map_err(write_err)
    }
}

/// Writes every changed file back to its path. Returns how many were written.
pub fn write_in_place(changes: &ChangeSet) -> Result<usize, RecastError> {
    for file in &changes.files {
        std::fs::write(&file.path, &file.after)
            .map_err(|e| RecastError::io(file.path.display().to_string(), e))?;
        tracing::info!(path = %file.path.display(), recipes = ?file.recipes, "wrote file");
    }
    Ok(changes.files.len())
}

// ============================================================================
// LINE DIFF
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Op {
    Same(String),
    Add(String),
    Rem(String),
}

/// Line-level edit script between two texts.
fn line_ops(before: &str, after: &str) -> Vec<Op> {
    let changeset = Changeset::new(before, after, "\n");
    let mut ops = Vec::new();
    for diff in changeset.diffs {
        let (text, wrap): (String, fn(String) -> Op) = match diff {
            Difference::Same(x) => (x, Op::Same),
            Difference::Add(x) => (x, Op::Add),
            Difference::Rem(x) => (x, Op::Rem),
        };
        ops.extend(text.split('\n').map(|line| wrap(line.to_string())));
    }
    // A trailing line break shows up as a final empty line on both sides.
    if ops.last() == Some(&Op::Same(String::new())) {
        ops.pop();
    }
    ops
}

struct Hunk {
    old_start: usize,
    old_len: usize,
    new_start: usize,
    new_len: usize,
    ops: Vec<Op>,
}

fn hunks(ops: &[Op]) -> Vec<Hunk> {
    let changed: Vec<usize> = ops
        .iter()
        .enumerate()
        .filter(|(_, op)| !matches!(op, Op::Same(_)))
        .map(|(i, _)| i)
        .collect();
    let mut ranges: Vec<(usize, usize)> = Vec::new();
    for index in changed {
        let start = index.saturating_sub(CONTEXT_LINES);
        let end = (index + CONTEXT_LINES + 1).min(ops.len());
        match ranges.last_mut() {
            Some(last) if start <= last.1 => last.1 = end,
            _ => ranges.push((start, end)),
        }
    }

    let mut result = Vec::new();
    let (mut old_line, mut new_line, mut cursor) = (1, 1, 0);
    for (start, end) in ranges {
        for op in &ops[cursor..start] {
            advance(op, &mut old_line, &mut new_line);
        }
        let mut hunk = Hunk {
            old_start: old_line,
            old_len: 0,
            new_start: new_line,
            new_len: 0,
            ops: ops[start..end].to_vec(),
        };
        for op in &ops[start..end] {
            match op {
                Op::Same(_) => {
                    hunk.old_len += 1;
                    hunk.new_len += 1;
                }
                Op::Rem(_) => hunk.old_len += 1,
                Op::Add(_) => hunk.new_len += 1,
            }
            advance(op, &mut old_line, &mut new_line);
        }
        cursor = end;
        result.push(hunk);
    }
    result
}

fn advance(op: &Op, old_line: &mut usize, new_line: &mut usize) {
    match op {
        Op::Same(_) => {
            *old_line += 1;
            *new_line += 1;
        }
        Op::Rem(_) => *old_line += 1,
        Op::Add(_) => *new_line += 1,
    }
}

fn write_hunk(out: &mut dyn WriteColor, hunk: &Hunk) -> std::io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
    writeln!(
        out,
        "@@ -{},{} +{},{} @@",
        hunk.old_start, hunk.old_len, hunk.new_start, hunk.new_len
    )?;
    out.reset()?;
    for op in &hunk.ops {
        match op {
            Op::Same(line) => writeln!(out, " {}", line)?,
            Op::Add(line) => {
                out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
                writeln!(out, "+{}", line)?;
                out.reset()?;
            }
            Op::Rem(line) => {
                out.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
                writeln!(out, "-{}", line)?;
                out.reset()?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use termcolor::NoColor;

    fn change(before: &str, after: &str) -> ChangeSet {
        ChangeSet {
            files: vec![FileChange {
                path: PathBuf::from("src/A.java"),
                before: before.to_string(),
                after: after.to_string(),
                recipes: vec!["recast.spring.AutowiredToInject".to_string()],
                mutations: Vec::new(),
            }],
            ..ChangeSet::default()
        }
    }

    fn render(emitter: &dyn ChangeSetEmitter, changes: &ChangeSet) -> String {
        let mut out = NoColor::new(Vec::new());
        emitter.emit(changes, &mut out).expect("emits");
        String::from_utf8(out.into_inner()).expect("utf-8")
    }

    #[test]
    fn unified_diff_shows_context_around_changes() {
        let before = "a\nb\nc\nd\ne\nf\ng\nh\n";
        let after = "a\nb\nc\nd\nE\nf\ng\nh\n";
        let text = render(&UnifiedDiffEmitter, &change(before, after));
        let expected = "--- a/src/A.java\n+++ b/src/A.java\n# recipes: recast.spring.AutowiredToInject\n@@ -2,7 +2,7 @@\n b\n c\n d\n-e\n+E\n f\n g\n h\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn distant_changes_get_separate_hunks() {
        let before: String = (1..=20).map(|i| format!("{}\n", i)).collect();
        let after: String = (1..=20)
            .map(|i| match i {
                2 => "two\n".to_string(),
                19 => "nineteen\n".to_string(),
                _ => format!("{}\n", i),
            })
            .collect();
        let text = render(&UnifiedDiffEmitter, &change(&before, &after));
        assert_eq!(text.matches("@@ -").count(), 2);
        assert!(text.contains("-19\n+nineteen\n"));
    }

    #[test]
    fn json_lists_files_and_recipes() {
        let text = render(&JsonEmitter, &change("a\n", "b\n"));
        let value: serde_json::Value = serde_json::from_str(&text).expect("json");
        assert_eq!(value["files"][0]["after"], "b\n");
        assert_eq!(value["files"][0]["recipes"][0], "recast.spring.AutowiredToInject");
        assert!(value["errors"].as_array().is_some_and(|e| e.is_empty()));
    }

    #[test]
    fn write_in_place_replaces_file_contents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("A.java");
        std::fs::write(&path, "old\n").expect("write");
        let mut changes = change("old\n", "new\n");
        changes.files[0].path = path.clone();
        assert_eq!(write_in_place(&changes).expect("writes"), 1);
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "new\n");
    }
}
