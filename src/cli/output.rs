//! Output formatting for CLI commands.
//!
//! Supports text and JSON output formats.

use crate::core::{DistinguishedName, GpoLink};
use crate::error::{Error, Operation, Result};
use crate::session::LinkOutcome;
use serde::Serialize;
use std::fmt::Write;
use std::io;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output.
    Json,
}

impl OutputFormat {
    /// Parses format from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Formats the result of a list-links request.
///
/// Text output is one target DN per line and nothing else, so it can be
/// piped.
#[must_use]
pub fn format_links(gpo: &DistinguishedName, links: &[GpoLink], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut output = String::new();
            for link in links {
                let _ = writeln!(output, "{}", link.target);
            }
            output
        }
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct LinksOutput<'a> {
                operation: Operation,
                gpo: &'a DistinguishedName,
                count: usize,
                links: &'a [GpoLink],
            }
            format_json(&LinksOutput {
                operation: Operation::ListLinks,
                gpo,
                count: links.len(),
                links,
            })
        }
    }
}

/// Formats the result of a link or unlink request, optionally followed by
/// the GPO's links as they stand afterwards.
#[must_use]
pub fn format_outcome(
    gpo: &DistinguishedName,
    target: &DistinguishedName,
    outcome: LinkOutcome,
    links: Option<&[GpoLink]>,
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Text => {
            let mut output = String::new();
            let _ = match outcome {
                LinkOutcome::Linked => writeln!(output, "Linked GPO {gpo} to {target}"),
                LinkOutcome::AlreadyLinked => writeln!(
                    output,
                    "GPO {gpo} is already linked to {target}; nothing changed"
                ),
                LinkOutcome::Unlinked => writeln!(output, "Unlinked GPO {gpo} from {target}"),
                LinkOutcome::NotLinked => writeln!(
                    output,
                    "GPO {gpo} is not linked to {target}; nothing changed"
                ),
            };
            if let Some(links) = links {
                output.push('\n');
                if links.is_empty() {
                    output.push_str("GPO has no linked objects\n");
                } else {
                    output.push_str("Linked objects:\n");
                    for link in links {
                        let _ = writeln!(output, "  {}{}", link.target, link_state(link));
                    }
                }
            }
            output
        }
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct OutcomeOutput<'a> {
                operation: Operation,
                gpo: &'a DistinguishedName,
                target: &'a DistinguishedName,
                outcome: LinkOutcome,
                changed: bool,
                #[serde(skip_serializing_if = "Option::is_none")]
                links: Option<&'a [GpoLink]>,
            }
            let operation = match outcome {
                LinkOutcome::Linked | LinkOutcome::AlreadyLinked => Operation::Link,
                LinkOutcome::Unlinked | LinkOutcome::NotLinked => Operation::Unlink,
            };
            format_json(&OutcomeOutput {
                operation,
                gpo,
                target,
                outcome,
                changed: outcome.changed(),
                links,
            })
        }
    }
}

/// Formats an error for display.
#[must_use]
pub fn format_error(error: &Error, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => error.to_string(),
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct ErrorOutput<'a> {
                code: &'a str,
                message: String,
            }
            format_json(&ErrorOutput {
                code: error.code(),
                message: error.to_string(),
            })
        }
    }
}

/// Writes command output to `writer`. A closed pipe (output piped to
/// `head`, say) is not an error.
pub fn write_output<W: io::Write>(mut writer: W, output: &str) -> Result<()> {
    if output.is_empty() {
        return Ok(());
    }
    match writer
        .write_all(output.as_bytes())
        .and_then(|()| writer.flush())
    {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        result => Ok(result?),
    }
}

fn link_state(link: &GpoLink) -> &'static str {
    match (link.enabled, link.enforced) {
        (true, false) => "",
        (true, true) => " (enforced)",
        (false, false) => " (disabled)",
        (false, true) => " (disabled, enforced)",
    }
}

/// Formats a value as pretty-printed JSON.
fn format_json<T: Serialize>(value: &T) -> String {
    let mut json = serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string());
    json.push('\n');
    json
}
