//! CLI module for devhelm-agent - command-line interface and subcommands.

pub mod commands;

pub use commands::{Cli, Commands};
