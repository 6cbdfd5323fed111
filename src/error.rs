//! Error types for gpolink operations.
//!
//! Two layers, both built with `thiserror`: [`DirectoryError`] describes what
//! a single directory primitive (bind, read, search, modify) reported, and
//! [`Error`] is what the user sees, tagged with the [`Operation`] that failed.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result type alias for gpolink operations.
pub type Result<T> = std::result::Result<T, Error>;

/// User-level action a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Opening and binding the directory connection.
    Connect,
    /// Enumerating the containers a GPO is linked to.
    ListLinks,
    /// Adding a GPO link to a container.
    Link,
    /// Removing a GPO link from a container.
    Unlink,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connect => "connect",
            Self::ListLinks => "list links",
            Self::Link => "link GPO",
            Self::Unlink => "unlink GPO",
        })
    }
}

/// Errors surfaced to the user.
#[derive(Error, Debug)]
pub enum Error {
    /// Server unreachable, credentials rejected, or bind refused.
    #[error("authentication to {server} failed: {reason}")]
    Authentication {
        /// Domain controller address.
        server: String,
        /// Why the connection or bind failed.
        reason: String,
    },

    /// A referenced DN does not exist.
    #[error("{operation} failed: object not found: {dn}")]
    Lookup {
        /// Action in progress.
        operation: Operation,
        /// DN that did not resolve.
        dn: String,
    },

    /// The bound identity may not read or write the object.
    #[error("{operation} failed: insufficient rights on {dn}: {reason}")]
    Permission {
        /// Action in progress.
        operation: Operation,
        /// DN the access check failed on.
        dn: String,
        /// Server diagnostic.
        reason: String,
    },

    /// Input that is not a usable DN or gPLink value.
    #[error("malformed input: {reason}")]
    MalformedInput {
        /// What was wrong.
        reason: String,
    },

    /// Any other directory failure.
    #[error("{operation} failed: {source}")]
    Directory {
        /// Action in progress.
        operation: Operation,
        /// Underlying directory error.
        #[source]
        source: DirectoryError,
    },

    /// Invalid option combination or value.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// I/O errors (writing output).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reported by a [`Directory`](crate::directory::Directory) backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// Bind rejected the supplied credentials.
    #[error("invalid credentials: {message}")]
    InvalidCredentials {
        /// Server diagnostic.
        message: String,
    },

    /// Object does not exist (LDAP `noSuchObject`).
    #[error("no such object: {dn}")]
    NoSuchObject {
        /// DN that was not found.
        dn: String,
    },

    /// Access denied (LDAP `insufficientAccessRights`).
    #[error("insufficient access rights on {dn}: {message}")]
    InsufficientAccess {
        /// DN the operation targeted.
        dn: String,
        /// Server diagnostic.
        message: String,
    },

    /// Server rejected a DN or attribute value as syntactically invalid.
    #[error("invalid syntax for {dn}: {message}")]
    InvalidSyntax {
        /// DN the operation targeted.
        dn: String,
        /// Server diagnostic.
        message: String,
    },

    /// Any other non-success LDAP result code.
    #[error("LDAP result code {rc}: {message}")]
    Protocol {
        /// LDAP result code.
        rc: u32,
        /// Server diagnostic.
        message: String,
    },

    /// Connection, TLS, timeout or decoding failure.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Errors found while parsing a gPLink attribute value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GpLinkError {
    /// Non-whitespace text between bracketed segments.
    #[error("unexpected text at offset {offset}")]
    UnexpectedText {
        /// Byte offset of the offending character.
        offset: usize,
    },

    /// A `[` without its closing `]`.
    #[error("unterminated segment starting at offset {offset}")]
    Unterminated {
        /// Byte offset of the opening bracket.
        offset: usize,
    },
}

impl Error {
    /// Attaches the failing operation to a backend error.
    #[must_use]
    pub fn directory(operation: Operation, err: DirectoryError) -> Self {
        match err {
            DirectoryError::NoSuchObject { dn } => Self::Lookup { operation, dn },
            DirectoryError::InsufficientAccess { dn, message } => Self::Permission {
                operation,
                dn,
                reason: message,
            },
            DirectoryError::InvalidSyntax { dn, message } => Self::MalformedInput {
                reason: format!("{operation}: server rejected {dn}: {message}"),
            },
            source => Self::Directory { operation, source },
        }
    }

    /// Stable machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Authentication { .. } => "AUTH_FAILED",
            Self::Lookup { .. } => "NOT_FOUND",
            Self::Permission { .. } => "PERMISSION_DENIED",
            Self::MalformedInput { .. } => "MALFORMED_INPUT",
            Self::Directory { .. } => "LDAP_ERROR",
            Self::Config { .. } => "CONFIG_ERROR",
            Self::Io(_) => "IO_ERROR",
        }
    }

    /// Process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::MalformedInput { .. } | Self::Config { .. } => 2,
            Self::Authentication { .. } => 3,
            Self::Lookup { .. } => 4,
            Self::Permission { .. } => 5,
            Self::Directory { .. } | Self::Io(_) => 1,
        }
    }
}
