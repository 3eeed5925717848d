//! Handles all user-facing output for the CLI.
//!
//! Change sets go to stdout through an emitter; summaries, diagnostics and
//! errors go to stderr so `recast run --json > changes.json` stays parseable.

use std::io::Write;

use miette::GraphicalReportHandler;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use super::args::ColorMode;
use crate::composer::{FileOutcome, PipelineResult};
use crate::diagnostics::{Diagnostic, Severity};
use crate::recipe::RecipeInfo;
use crate::syntax::SyntaxNode;

// ============================================================================
// STREAMS
// ============================================================================

/// Resolves `--color` against whether the stream is a terminal.
pub fn color_choice(mode: ColorMode, stream: atty::Stream) -> ColorChoice {
    let terminal = atty::is(stream);
    match mode {
        ColorMode::Always => ColorChoice::Always,
        ColorMode::Never => ColorChoice::Never,
        ColorMode::Auto if terminal => ColorChoice::Auto,
        ColorMode::Auto => ColorChoice::Never,
    }
}

pub fn stdout(mode: ColorMode) -> StandardStream {
    StandardStream::stdout(color_choice(mode, atty::Stream::Stdout))
}

pub fn stderr(mode: ColorMode) -> StandardStream {
    StandardStream::stderr(color_choice(mode, atty::Stream::Stderr))
}

// ============================================================================
// CORE OUTPUT FUNCTIONS
// ============================================================================

/// Per-file diagnostics, one line each.
pub fn print_diagnostics(out: &mut dyn WriteColor, result: &PipelineResult) -> std::io::Result<()> {
    for (path, diagnostic) in result.diagnostics() {
        print_diagnostic(out, &path.display().to_string(), diagnostic)?;
    }
    Ok(())
}

fn print_diagnostic(out: &mut dyn WriteColor, path: &str, diagnostic: &Diagnostic) -> std::io::Result<()> {
    let (label, color) = match diagnostic.severity {
        Severity::Warning => ("warning", Color::Yellow),
        Severity::Info => ("note", Color::Cyan),
    };
    out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    write!(out, "{}", label)?;
    out.reset()?;
    writeln!(out, ": {}: {}", path, diagnostic)
}

/// Parse failures with their source excerpt, rendered by `miette`.
pub fn print_parse_errors(result: &PipelineResult) {
    for file in &result.files {
        if let FileOutcome::ParseError(e) = &file.outcome {
            let mut rendered = String::new();
            match GraphicalReportHandler::new().render_report(&mut rendered, e) {
                Ok(()) => eprint!("{}", rendered),
                Err(_) => eprintln!("{}: {}", file.path.display(), e),
            }
        }
    }
}

/// The closing one-line summary.
pub fn print_summary(out: &mut dyn WriteColor, result: &PipelineResult, applied: Option<usize>) -> std::io::Result<()> {
    let mut changed = 0;
    let mut unchanged = 0;
    let mut failed = 0;
    let mut cancelled = 0;
    for file in &result.files {
        match file.outcome {
            FileOutcome::Changed(_) => changed += 1,
            FileOutcome::Unchanged => unchanged += 1,
            FileOutcome::ParseError(_) => failed += 1,
            FileOutcome::Cancelled => cancelled += 1,
        }
    }
    out.set_color(ColorSpec::new().set_bold(true))?;
    write!(out, "{} changed", changed)?;
    out.reset()?;
    write!(out, ", {} unchanged", unchanged)?;
    if failed > 0 {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
        write!(out, ", {} failed to parse", failed)?;
        out.reset()?;
    }
    if cancelled > 0 {
        write!(out, ", {} cancelled", cancelled)?;
    }
    match applied {
        Some(count) => writeln!(out, "; wrote {} file(s)", count),
        None => writeln!(out),
    }
}

/// Prints the recipe list as an aligned table.
pub fn print_recipes(out: &mut dyn WriteColor, recipes: &[RecipeInfo]) -> std::io::Result<()> {
    let width = recipes.iter().map(|r| r.name.len()).max().unwrap_or(0);
    for info in recipes {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
        write!(out, "{:width$}", info.name, width = width)?;
        out.reset()?;
        let options = if info.parameterized { " (takes options)" } else { "" };
        writeln!(out, "  {}{}", info.description, options)?;
    }
    Ok(())
}

/// Dumps a syntax tree: one node per line, tokens with their trivia.
pub fn print_tree(out: &mut dyn Write, node: &SyntaxNode) -> std::io::Result<()> {
    write_node(out, node, 0)
}

fn write_node(out: &mut dyn Write, node: &SyntaxNode, depth: usize) -> std::io::Result<()> {
    let indent = "  ".repeat(depth);
    let span = node.span();
    match node.token_text() {
        Some(text) => {
            write!(out, "{}{:?}@{}..{} {:?}", indent, node.kind(), span.start, span.end, text)?;
            if !node.leading_trivia().is_empty() {
                write!(out, " trivia={:?}", node.leading_trivia())?;
            }
            writeln!(out)
        }
        None => {
            write!(out, "{}{:?}@{}..{}", indent, node.kind(), span.start, span.end)?;
            if let Some(ty) = node.ty() {
                write!(out, " : {}", ty)?;
            }
            writeln!(out)?;
            for child in node.children() {
                write_node(out, child, depth + 1)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::SourceTree;

    #[test]
    fn tree_dump_shows_tokens_and_trivia() {
        let tree = SourceTree::parse("# c\na=1\n", "a.properties").expect("parses");
        let mut out = Vec::new();
        print_tree(&mut out, tree.root()).expect("writes");
        let text = String::from_utf8(out).expect("utf-8");
        assert!(text.starts_with("PropertiesFile@0..8\n"));
        assert!(text.contains("  PropertyEntry@4..7\n"));
        assert!(text.contains("    PropKey@4..5 \"a\" trivia=\"# c\\n\""));
    }

    #[test]
    fn recipes_are_aligned() {
        let recipes = vec![
            RecipeInfo {
                name: "a.Short".into(),
                description: "one".into(),
                parameterized: false,
            },
            RecipeInfo {
                name: "a.MuchLonger".into(),
                description: "two".into(),
                parameterized: true,
            },
        ];
        let mut out = termcolor::NoColor::new(Vec::new());
        print_recipes(&mut out, &recipes).expect("writes");
        let text = String::from_utf8(out.into_inner()).expect("utf-8");
        assert_eq!(text, "a.Short       one\na.MuchLonger  two (takes options)\n");
    }
}
