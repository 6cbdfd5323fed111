//! CLI layer for gpolink.
//!
//! Provides the command-line interface using clap: argument parsing,
//! command dispatch and output formatting.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::{execute, run};
pub use output::OutputFormat;
pub use parser::{Cli, normalize_args};
