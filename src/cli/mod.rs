//! The recast Command-Line Interface.
//!
//! This module is the main entry point for all CLI commands and orchestrates
//! the core library functions: configuration, discovery, the composer and
//! the emitters.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use termcolor::WriteColor;
use tracing_subscriber::EnvFilter;

use crate::cli::args::{ColorMode, Command, RecastArgs, RunArgs};
use crate::composer::{Composer, SourceInput};
use crate::config::EngineConfig;
use crate::discovery::SourceDiscoverer;
use crate::emit::{write_in_place, ChangeSet, ChangeSetEmitter, JsonEmitter, UnifiedDiffEmitter};
use crate::recipes::{builtin_registry, spring};
use crate::syntax::SourceTree;
use crate::RecastError;

pub mod args;
pub mod output;

/// The main entry point for the CLI.
pub fn run() {
    let args = RecastArgs::parse();
    init_tracing(args.verbose);

    let result = match args.command {
        Command::Run { run, apply } => handle_run(&run, apply, args.color),
        Command::Diff { run } => handle_run(&run, false, args.color),
        Command::ListRecipes { config, json } => handle_list_recipes(config.as_deref(), json, args.color),
        Command::Tree { file } => handle_tree(&file),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("{:?}", miette::Report::new(e));
            process::exit(1);
        }
    }
}

/// Installs the log subscriber. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("recast={}", level)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn io_err(e: std::io::Error) -> RecastError {
    RecastError::io("<terminal>", e)
}

// ============================================================================
// RUN
// ============================================================================

/// Handles `run` and `diff`. Exits with 1 when any file failed to parse.
fn handle_run(args: &RunArgs, apply: bool, color: ColorMode) -> Result<i32, RecastError> {
    let config = load_config(args)?;
    let mut options = config.composer_options();
    if let Some(max) = args.max_iterations {
        options.max_iterations = max;
    }
    if args.threads.is_some() {
        options.threads = args.threads;
    }

    let registry = config.registry(builtin_registry())?;
    let names = if args.recipes.is_empty() && config.recipes.is_empty() {
        vec![spring::SPRING_BOOT_TO_QUARKUS.to_string()]
    } else {
        args.recipes.clone()
    };
    let catalog = config.catalog(&registry, &names)?;
    tracing::info!(recipes = ?catalog.names(), "catalog");

    let files = SourceDiscoverer::new()
        .exclude(config.exclude.iter().cloned())
        .discover(args.paths.as_slice())?;
    let mut inputs = Vec::with_capacity(files.len());
    let mut unreadable = 0;
    for path in files {
        match SourceInput::read(path) {
            Ok(input) => inputs.push(input),
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable file");
                unreadable += 1;
            }
        }
    }

    let result = Composer::new(catalog)
        .with_options(options)
        .with_classpath(config.type_table())
        .run(inputs);
    let changes = ChangeSet::from_result(&result);

    let mut stdout = output::stdout(if args.json { ColorMode::Never } else { color });
    let emitter: &dyn ChangeSetEmitter = if args.json { &JsonEmitter } else { &UnifiedDiffEmitter };
    emitter.emit(&changes, &mut stdout)?;
    stdout.flush().map_err(io_err)?;

    let mut stderr = output::stderr(color);
    output::print_parse_errors(&result);
    if !args.json {
        output::print_diagnostics(&mut stderr, &result).map_err(io_err)?;
    }
    let applied = if apply { Some(write_in_place(&changes)?) } else { None };
    output::print_summary(&mut stderr, &result, applied).map_err(io_err)?;

    let failed = result.parse_errors().count() + unreadable;
    Ok(if failed > 0 { 1 } else { 0 })
}

fn load_config(args: &RunArgs) -> Result<EngineConfig, RecastError> {
    if let Some(path) = &args.config {
        return EngineConfig::load(path);
    }
    let dir = match args.paths.first() {
        Some(path) if path.is_dir() => path.clone(),
        Some(path) => path.parent().map(Path::to_path_buf).unwrap_or_default(),
        None => PathBuf::from("."),
    };
    EngineConfig::discover(&dir)
}

// ============================================================================
// LIST RECIPES
// ============================================================================

fn handle_list_recipes(config: Option<&Path>, json: bool, color: ColorMode) -> Result<i32, RecastError> {
    let registry = match config {
        Some(path) => EngineConfig::load(path)?.registry(builtin_registry())?,
        None => builtin_registry().clone(),
    };
    let recipes = registry.list();
    let mut stdout = output::stdout(color);
    if json {
        serde_json::to_writer_pretty(&mut stdout, &recipes)
            .map_err(|e| crate::err_msg!(Internal, "could not serialize recipe list: {}", e))?;
        writeln!(stdout).map_err(io_err)?;
    } else {
        output::print_recipes(&mut stdout, &recipes).map_err(io_err)?;
    }
    stdout.reset().map_err(io_err)?;
    Ok(0)
}

// ============================================================================
// TREE
// ============================================================================

fn handle_tree(file: &Path) -> Result<i32, RecastError> {
    let bytes = std::fs::read(file).map_err(|e| RecastError::io(file.display().to_string(), e))?;
    let tree = SourceTree::from_bytes(&bytes, file)?;
    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    output::print_tree(&mut lock, tree.root()).map_err(io_err)?;
    Ok(0)
}
