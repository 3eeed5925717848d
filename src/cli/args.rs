//! Command-line arguments and subcommands for the recast CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::builder::RangedU64ValueParser;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "recast",
    version,
    about = "Rewrites Java sources and configuration with composable, format-preserving recipes."
)]
pub struct RecastArgs {
    #[command(subcommand)]
    pub command: Command,

    /// More log output (-v info, -vv debug, -vvv trace). RUST_LOG wins when set.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// When to color output.
    #[arg(long, value_enum, default_value_t = ColorMode::Auto, global = true)]
    pub color: ColorMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run recipes over a project and print the changes as a diff.
    Run {
        #[command(flatten)]
        run: RunArgs,

        /// Write the changes back to the files instead of only printing them.
        #[arg(long)]
        apply: bool,
    },
    /// Same as `run` without `--apply`.
    Diff {
        #[command(flatten)]
        run: RunArgs,
    },
    /// List every available recipe with its description.
    ListRecipes {
        /// Configuration whose declarative recipes are listed too.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Show the syntax tree of a file: node kinds, spans, tokens and trivia.
    Tree {
        /// The Java or .properties file to parse.
        #[arg(required = true)]
        file: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Files or directories to process.
    #[arg(default_value = ".")]
    pub paths: Vec<PathBuf>,

    /// Recipe to run; repeat for several, applied in the given order.
    #[arg(short, long = "recipe", value_name = "NAME")]
    pub recipes: Vec<String>,

    /// Configuration file (default: recast.yml in the first directory given).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the change set as JSON.
    #[arg(long)]
    pub json: bool,

    /// Cap on full recipe passes per file.
    #[arg(long, value_name = "N", value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
    pub max_iterations: Option<usize>,

    /// Worker threads.
    #[arg(long, value_name = "N")]
    pub threads: Option<usize>,
}
