//! CLI command definitions for task-roles
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod apply;
pub mod list;
pub mod status;

use apply::ApplyArgs;
use clap::{Parser, Subcommand};
use list::ListArgs;
use status::StatusArgs;

/// Role assignments on markdown checklists, and an index of the tasks that carry them
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Vault root directory (overrides config)
    #[arg(long, global = true)]
    pub vault: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load or build the task index and write its snapshot
    Index {
        /// Ignore the snapshot and rescan every document
        #[arg(long)]
        rebuild: bool,
    },

    /// Keep the index current while documents change, until Ctrl-C
    Watch,

    /// List indexed tasks
    List(ListArgs),

    /// Print the role assignments written on a line as JSON
    Parse {
        /// The line to read
        line: String,
    },

    /// Rewrite a line with new role assignments
    Apply(ApplyArgs),

    /// Set a task's checkbox status in its document
    Status(StatusArgs),
}
