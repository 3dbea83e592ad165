//! Defines the command-line arguments and subcommands for the sqlsnip CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::ConflictPolicy;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "sqlsnip",
    version,
    about = "Parses SQL templates with typed substitution variables."
)]
pub struct SqlsnipArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Engine configuration file (YAML, or JSON with a `.json` extension).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Overrides the configured handling of conflicting placeholder types.
    #[arg(long, global = true, value_enum)]
    pub conflict_policy: Option<ConflictPolicy>,

    /// Raises log verbosity; repeat for more detail.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the full snippet: AST, symbol table, tables, substitutions and interface.
    Parse {
        /// The path to the SQL template to parse.
        #[arg(required = true)]
        file: PathBuf,
        /// Serialisation format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Print the canonical AST rendered back to SQL.
    Ast {
        /// The path to the SQL template to parse.
        #[arg(required = true)]
        file: PathBuf,
    },
    /// Check every `.sql` template under a directory.
    Check {
        /// The directory to search.
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
}
