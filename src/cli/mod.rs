//! CLI module for lrometa - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands for analyzing documents,
//! inspecting status types and checking diagnostics.

pub mod commands;

pub use commands::Cli;
