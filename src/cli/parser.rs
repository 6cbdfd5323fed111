//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros. The two-letter
//! single-dash flags `-dc` and `-ul` are rewritten to their long forms by
//! [`normalize_args`] before clap sees them.

use clap::Parser;
use std::ffi::OsString;

const EXAMPLES: &str = "\
Examples:
  List objects linked to a GPO:
    gpolink -dc 10.1.10.1 -d powercorp.local -u john -p 'John123' -g 'CN={GUID},CN=Policies,CN=System,DC=powercorp,DC=local'
  Link a GPO to an OU:
    gpolink -dc 10.1.10.1 -d powercorp.local -u john -p 'John123' -g '<gpo_dn>' -l 'OU=Servers,DC=powercorp,DC=local'
  Unlink a GPO from an OU:
    gpolink -dc 10.1.10.1 -d powercorp.local -u john -p 'John123' -g '<gpo_dn>' -ul 'OU=Servers,DC=powercorp,DC=local'";

/// gpolink: manage Group Policy Object links over LDAP.
///
/// Without --link or --unlink, prints the DN of every container the GPO is
/// linked to, one per line.
#[derive(Parser, Debug)]
#[command(name = "gpolink")]
#[command(version, about, long_about = None, after_help = EXAMPLES)]
pub struct Cli {
    /// Domain controller address (host, IP, or ldap[s]:// URL).
    #[arg(
        long = "dc",
        visible_alias = "domaincontroller",
        env = "GPOLINK_DC",
        value_name = "HOST"
    )]
    pub domain_controller: String,

    /// Username to bind as.
    #[arg(short = 'u', long, env = "GPOLINK_USERNAME")]
    pub username: String,

    /// Password, or an LM:NT hash pair.
    #[arg(short = 'p', long, env = "GPOLINK_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Directory domain name.
    #[arg(short = 'd', long, env = "GPOLINK_DOMAIN")]
    pub domain: String,

    /// Distinguished name of the GPO.
    #[arg(short = 'g', long = "gpodn", value_name = "GPO_DN")]
    pub gpo_dn: String,

    /// Container to link the GPO to.
    #[arg(
        short = 'l',
        long = "link",
        value_name = "TARGET_DN",
        conflicts_with = "unlink"
    )]
    pub link: Option<String>,

    /// Container to unlink the GPO from.
    #[arg(long = "ul", visible_alias = "unlink", value_name = "TARGET_DN")]
    pub unlink: Option<String>,

    /// LDAP port (default 389, or 636 with --ldaps).
    #[arg(long)]
    pub port: Option<u16>,

    /// Connect over LDAP with TLS.
    #[arg(long)]
    pub ldaps: bool,

    /// Skip server certificate verification (ldaps only).
    #[arg(long, requires = "ldaps")]
    pub no_tls_verify: bool,

    /// Connect timeout in seconds.
    #[arg(long, default_value = "10", value_name = "SECS")]
    pub timeout: u64,

    /// Subtree to search when listing links (default: the GPO's domain).
    #[arg(long, value_name = "BASE_DN")]
    pub search_base: Option<String>,

    /// After linking or unlinking, list the GPO's links.
    #[arg(short = 's', long)]
    pub show_links: bool,

    /// Enable verbose logging on stderr.
    #[arg(short, long)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text")]
    pub format: String,
}

/// Rewrites `-dc` and `-ul` (and their `=value` forms) to `--dc` / `--ul`.
///
/// Arguments after a bare `--` are left alone.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut passthrough = false;
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            if passthrough {
                return arg;
            }
            let Some(text) = arg.to_str() else {
                return arg;
            };
            if text == "--" {
                passthrough = true;
                return arg;
            }
            for flag in ["dc", "ul"] {
                let short = format!("-{flag}");
                if text == short || text.starts_with(&format!("{short}=")) {
                    return OsString::from(format!("-{text}"));
                }
            }
            arg
        })
        .collect()
}
