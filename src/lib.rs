//! # gpolink
//!
//! List, add and remove Group Policy Object links on Active Directory
//! containers over LDAP.
//!
//! A GPO is linked to an OU, domain or site by a `[LDAP://<gpo-dn>;<flags>]`
//! segment in that container's `gPLink` attribute. gpolink binds to a
//! domain controller and reads or rewrites those segments, leaving every
//! other link untouched.
//!
//! ## Features
//!
//! - **List**: every container whose `gPLink` references a GPO
//! - **Link / Unlink**: idempotent edits of a single container's `gPLink`
//! - **Pluggable directory**: LDAP via `ldap3`, or an in-memory tree

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod core;
pub mod directory;
pub mod error;
pub mod logging;
pub mod session;

// Re-export commonly used types at crate root
pub use error::{DirectoryError, Error, Operation, Result};

// Re-export core domain types
pub use crate::core::{AuthMode, Credentials, DistinguishedName, GpLink, GpoLink, Secret};

// Re-export directory types
pub use directory::{Directory, LdapDirectory, LdapEndpoint, MemoryDirectory};

// Re-export session and CLI types
pub use cli::{Cli, OutputFormat};
pub use config::{Action, Config};
pub use session::{DirectorySession, LinkOutcome};
