//! Bind credentials.
//!
//! The kind of secret (plaintext password or NT hash) is decided once, when
//! the command line is parsed, and carried as a [`Secret`] variant from then
//! on.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

/// How the bind proves the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Plaintext password.
    Password,
    /// `LM:NT` password-hash pair.
    Hash,
}

/// A bind secret.
#[derive(Clone, PartialEq, Eq)]
pub enum Secret {
    /// Plaintext password.
    Plaintext(String),
    /// LM and NT hashes as lowercase hex. The LM half may be empty.
    NtHash {
        /// LM hash (32 hex digits, or empty).
        lm: String,
        /// NT hash (32 hex digits).
        nt: String,
    },
}

#[allow(clippy::expect_used)]
fn hash_pattern() -> &'static Regex {
    static HASH: OnceLock<Regex> = OnceLock::new();
    HASH.get_or_init(|| {
        Regex::new(r"^(?P<lm>[0-9A-Fa-f]{32})?:(?P<nt>[0-9A-Fa-f]{32})$").expect("valid regex")
    })
}

impl Secret {
    /// Classifies a `-p` value.
    ///
    /// `LM:NT` (two 32-digit hex strings, LM optional) is a hash pair;
    /// anything else is a plaintext password.
    ///
    /// # Examples
    ///
    /// ```
    /// use gpolink::core::{AuthMode, Secret};
    ///
    /// assert_eq!(Secret::parse("John123").mode(), AuthMode::Password);
    /// let hash = "aad3b435b51404eeaad3b435b51404ee:31d6cfe0d16ae931b73c59d7e0c089c0";
    /// assert_eq!(Secret::parse(hash).mode(), AuthMode::Hash);
    /// ```
    #[must_use]
    pub fn parse(input: &str) -> Self {
        hash_pattern().captures(input).map_or_else(
            || Self::Plaintext(input.to_string()),
            |caps| Self::NtHash {
                lm: caps
                    .name("lm")
                    .map_or_else(String::new, |m| m.as_str().to_ascii_lowercase()),
                nt: caps["nt"].to_ascii_lowercase(),
            },
        )
    }

    /// Which authentication mode this secret selects.
    #[must_use]
    pub const fn mode(&self) -> AuthMode {
        match self {
            Self::Plaintext(_) => AuthMode::Password,
            Self::NtHash { .. } => AuthMode::Hash,
        }
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plaintext(_) => f.write_str("Plaintext(<redacted>)"),
            Self::NtHash { .. } => f.write_str("NtHash(<redacted>)"),
        }
    }
}

/// Everything needed to authenticate one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Domain controller address as given by the user.
    pub server: String,
    /// Directory domain name (`corp.local` or NetBIOS `CORP`).
    pub domain: String,
    /// Account name.
    pub username: String,
    /// Password or hash.
    pub secret: Secret,
}

impl Credentials {
    /// Creates credentials, classifying `secret` via [`Secret::parse`].
    #[must_use]
    pub fn new(server: &str, domain: &str, username: &str, secret: &str) -> Self {
        Self {
            server: server.trim().to_string(),
            domain: domain.trim().to_string(),
            username: username.trim().to_string(),
            secret: Secret::parse(secret),
        }
    }

    /// Authentication mode selected by the secret.
    #[must_use]
    pub const fn mode(&self) -> AuthMode {
        self.secret.mode()
    }

    /// Identity presented on bind.
    ///
    /// `DOMAIN\user`, unless the username is already qualified as a UPN,
    /// a down-level name, or a DN.
    #[must_use]
    pub fn bind_identity(&self) -> String {
        let user = &self.username;
        if user.contains('@') || user.contains('\\') || user.contains('=') || self.domain.is_empty()
        {
            user.clone()
        } else {
            format!("{}\\{user}", self.domain)
        }
    }
}
