//! CLI command implementations.
//!
//! Builds the [`Config`], opens the session and dispatches to exactly one
//! of list, link or unlink.

use crate::cli::output::{OutputFormat, format_links, format_outcome};
use crate::cli::parser::Cli;
use crate::config::{Action, Config};
use crate::directory::Directory;
use crate::error::Result;
use crate::session::DirectorySession;
use tracing::warn;

/// Executes the CLI command.
///
/// # Arguments
///
/// * `cli` - Parsed CLI arguments.
///
/// # Returns
///
/// Result with output string on success.
///
/// # Errors
///
/// Returns an error if the input is invalid, authentication fails, or the
/// requested operation fails.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let config = Config::try_from(cli)?;
    let session = DirectorySession::connect(&config.endpoint, &config.credentials)?;
    run(session, &config, format)
}

/// Runs the configured action on a bound session, then unbinds.
///
/// The session is released whether or not the action succeeds.
///
/// # Errors
///
/// Returns the action's error, if any.
pub fn run<D: Directory>(
    session: DirectorySession<D>,
    config: &Config,
    format: OutputFormat,
) -> Result<String> {
    let mut session = session.with_search_base(config.search_base.clone());
    let result = dispatch(&mut session, config, format);
    if let Err(e) = session.close() {
        warn!(error = %e, "Failed to unbind cleanly");
    }
    result
}

fn dispatch<D: Directory>(
    session: &mut DirectorySession<D>,
    config: &Config,
    format: OutputFormat,
) -> Result<String> {
    let gpo = &config.gpo;
    let (target, outcome) = match &config.action {
        Action::List => {
            let links = session.list_links(gpo)?;
            return Ok(format_links(gpo, &links, format));
        }
        Action::Link(target) => (target, session.link_gpo(gpo, target)?),
        Action::Unlink(target) => (target, session.unlink_gpo(gpo, target)?),
    };

    let links = if config.show_links {
        Some(session.list_links(gpo)?)
    } else {
        None
    };
    Ok(format_outcome(gpo, target, outcome, links.as_deref(), format))
}
