//! CLI command definitions using clap.
//!
//! - run: start the agent (default)
//! - fetch: one task request, printed
//! - probe: check templates and readiness once

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// DevHelm agent - feeds DevHelm tasks to the Junie assistant
#[derive(Parser, Debug)]
#[command(name = "devhelm-agent")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log everything (trace level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// `run` when no subcommand was given
    pub fn subcommand_or_run(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Run)
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the poll/act loop until interrupted
    Run,

    /// Request one task from the API and print the result
    Fetch,

    /// Check template images and whether the UI is ready right now
    Probe,
}
