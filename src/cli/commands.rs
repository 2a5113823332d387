//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - analyze: print LRO metadata for every long-running operation
//! - states: classify the values of a status type
//! - check: print document diagnostics

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::OutputFormat;

/// Lrometa - infer long-running operation metadata from API descriptions
#[derive(Parser, Debug)]
#[command(name = "lrometa")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Report LRO metadata for the operations in one or more documents
    Analyze {
        /// Document paths or glob patterns
        #[arg(required = true)]
        paths: Vec<String>,

        /// Only report this operation (plain or interface-qualified name)
        #[arg(short, long)]
        operation: Option<String>,

        /// Output format, overriding the configured one
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Classify the terminal states of a named enum, union or scalar
    States {
        /// Document path
        path: PathBuf,

        /// Type name
        type_name: String,
    },

    /// Print every diagnostic; fails if any has error severity
    Check {
        /// Document paths or glob patterns
        #[arg(required = true)]
        paths: Vec<String>,
    },
}
