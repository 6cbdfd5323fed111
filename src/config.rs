//! Run configuration.
//!
//! The parsed command line is turned into one immutable [`Config`] before
//! anything touches the network; the session and commands only ever see
//! this value.

use crate::cli::parser::Cli;
use crate::core::{Credentials, DistinguishedName};
use crate::directory::{LDAP_PORT, LDAPS_PORT, LdapEndpoint};
use crate::error::{Error, Result};
use std::time::Duration;

/// The single action an invocation performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Print the containers linked to the GPO.
    List,
    /// Link the GPO to this container.
    Link(DistinguishedName),
    /// Unlink the GPO from this container.
    Unlink(DistinguishedName),
}

/// Validated configuration for one invocation.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind credentials.
    pub credentials: Credentials,
    /// Domain controller connection settings.
    pub endpoint: LdapEndpoint,
    /// GPO being listed, linked or unlinked.
    pub gpo: DistinguishedName,
    /// What to do with it.
    pub action: Action,
    /// Explicit root for link enumeration.
    pub search_base: Option<DistinguishedName>,
    /// List the GPO's links after a link or unlink.
    pub show_links: bool,
}

impl TryFrom<&Cli> for Config {
    type Error = Error;

    fn try_from(cli: &Cli) -> Result<Self> {
        let server = cli.domain_controller.trim();
        if server.is_empty() {
            return Err(Error::Config {
                message: "domain controller address is empty".to_string(),
            });
        }
        if cli.username.trim().is_empty() {
            return Err(Error::Config {
                message: "username is empty".to_string(),
            });
        }
        if cli.domain.trim().is_empty() {
            return Err(Error::Config {
                message: "domain is empty".to_string(),
            });
        }
        if cli.timeout == 0 {
            return Err(Error::Config {
                message: "timeout must be at least one second".to_string(),
            });
        }

        let gpo = DistinguishedName::parse(&cli.gpo_dn)?;
        let action = match (&cli.link, &cli.unlink) {
            (Some(_), Some(_)) => {
                return Err(Error::Config {
                    message: "--link and --unlink are mutually exclusive".to_string(),
                });
            }
            (Some(target), None) => Action::Link(DistinguishedName::parse(target)?),
            (None, Some(target)) => Action::Unlink(DistinguishedName::parse(target)?),
            (None, None) => Action::List,
        };
        let search_base = cli
            .search_base
            .as_deref()
            .map(DistinguishedName::parse)
            .transpose()?;

        let endpoint = LdapEndpoint {
            host: server.to_string(),
            port: cli
                .port
                .unwrap_or(if cli.ldaps { LDAPS_PORT } else { LDAP_PORT }),
            ldaps: cli.ldaps,
            timeout: Duration::from_secs(cli.timeout),
            verify_tls: !cli.no_tls_verify,
        };

        Ok(Self {
            credentials: Credentials::new(server, &cli.domain, &cli.username, &cli.password),
            endpoint,
            gpo,
            action,
            search_base,
            show_links: cli.show_links,
        })
    }
}
