//! The sqlsnip command-line interface.
//!
//! This module is the main entry point for all CLI commands and orchestrates
//! the core library functions.

use std::path::Path;
use std::{fs, process};

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use crate::cli::args::{Command, OutputFormat, SqlsnipArgs};
use crate::config::EngineConfig;
use crate::diagnostics::{print_error, SnippetError, SourceContext};
use crate::engine::Engine;
use crate::snippet::Snippet;

pub mod args;
pub mod output;

/// The main entry point for the CLI.
pub fn run() {
    let args = SqlsnipArgs::parse();
    init_tracing(args.verbose);

    let result = build_engine(&args).and_then(|engine| match &args.command {
        Command::Parse { file, format } => handle_parse(&engine, file, *format),
        Command::Ast { file } => handle_ast(&engine, file),
        Command::Check { path } => handle_check(&engine, path),
    });

    if let Err(e) = result {
        print_error(e);
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Configuration file first, then flag overrides.
fn build_engine(args: &SqlsnipArgs) -> Result<Engine, SnippetError> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };
    if let Some(policy) = args.conflict_policy {
        config = config.with_conflict_policy(policy);
    }
    debug!(?config, "engine configuration");
    Engine::new(config)
}

fn read_source(path: &Path) -> Result<SourceContext, SnippetError> {
    let content = fs::read_to_string(path).map_err(|source| SnippetError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(SourceContext::from_file(path.display().to_string(), content))
}

fn process_file(engine: &Engine, path: &Path) -> Result<Snippet, SnippetError> {
    let source = read_source(path)?;
    let snippet = engine.process_source(&source)?;
    output::print_warnings(snippet.source(), snippet.warnings());
    Ok(snippet)
}

/// Handles the `parse` subcommand.
fn handle_parse(engine: &Engine, path: &Path, format: OutputFormat) -> Result<(), SnippetError> {
    let snippet = process_file(engine, path)?;
    println!("{}", output::render_snippet(&snippet, format)?);
    Ok(())
}

/// Handles the `ast` subcommand.
fn handle_ast(engine: &Engine, path: &Path) -> Result<(), SnippetError> {
    let snippet = process_file(engine, path)?;
    println!("{}", snippet.ast().pretty());
    Ok(())
}

/// Handles the `check` subcommand. Every template is checked; the first
/// failure does not stop the run. An unreadable root fails at once, while
/// an unreadable entry below it counts as one failed template.
fn handle_check(engine: &Engine, root: &Path) -> Result<(), SnippetError> {
    let mut checked = 0;
    let mut failed = 0;
    let mut warned = 0;

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => return Err(walk_error(root, err)),
            Err(err) => {
                checked += 1;
                failed += 1;
                print_error(walk_error(root, err));
                continue;
            }
        };
        if !is_template(entry.path()) || !entry.file_type().is_file() {
            continue;
        }

        checked += 1;
        match process_file(engine, entry.path()) {
            Ok(snippet) => {
                if !snippet.warnings().is_empty() {
                    warned += 1;
                }
                info!(path = %entry.path().display(), "checked");
            }
            Err(e) => {
                failed += 1;
                print_error(e);
            }
        }
    }

    output::print_summary(checked, failed, warned);
    if failed > 0 {
        return Err(SnippetError::CheckFailed { failed, checked });
    }
    Ok(())
}

fn is_template(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some("sql")
}

fn walk_error(root: &Path, err: walkdir::Error) -> SnippetError {
    let path = err.path().unwrap_or(root).display().to_string();
    SnippetError::Io {
        path,
        source: err.into(),
    }
}
