//! Binary entry point for gpolink.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use clap::Parser;
use gpolink::cli::output::{OutputFormat, format_error, write_output};
use gpolink::cli::{Cli, execute, normalize_args};
use gpolink::logging::init_logging;
use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse_from(normalize_args(std::env::args_os()));
    let format = OutputFormat::parse(&cli.format);
    init_logging(cli.verbose);

    match execute(&cli).and_then(|output| write_output(io::stdout().lock(), &output)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let error_output = format_error(&e, format);
            match format {
                OutputFormat::Json => {
                    // JSON errors go to stdout for programmatic parsing
                    print!("{error_output}");
                }
                OutputFormat::Text => {
                    eprintln!("Error: {error_output}");
                }
            }
            ExitCode::from(e.exit_code())
        }
    }
}
