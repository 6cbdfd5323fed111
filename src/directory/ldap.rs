//! LDAP backend built on the synchronous `ldap3::LdapConn`.
//!
//! Account names bind with NTLM (GSS-SPNEGO), using either the password or
//! a precomputed NT hash. Identities given as a DN use a simple bind.

use crate::core::{Credentials, GPLINK_ATTRIBUTE, Secret};
use crate::directory::traits::{Directory, DirectoryEntry, DirectoryResult};
use crate::error::DirectoryError;
use ldap3::{LdapConn, LdapConnSettings, LdapError, Mod, Scope, SearchEntry, ldap_escape};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Plain LDAP port.
pub const LDAP_PORT: u16 = 389;
/// LDAP over TLS port.
pub const LDAPS_PORT: u16 = 636;
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const NT_HASH_HEX_LEN: usize = 32;
// Bytes of UTF-16 padding that mark an NTLM password as a hash.
const HASH_PASSWORD_PADDING: usize = 512;

// LDAP result codes (RFC 4511, appendix A).
const RC_INVALID_ATTRIBUTE_SYNTAX: u32 = 21;
const RC_NO_SUCH_OBJECT: u32 = 32;
const RC_INVALID_DN_SYNTAX: u32 = 34;
const RC_INAPPROPRIATE_AUTHENTICATION: u32 = 48;
const RC_INVALID_CREDENTIALS: u32 = 49;
const RC_INSUFFICIENT_ACCESS_RIGHTS: u32 = 50;
const RC_UNWILLING_TO_PERFORM: u32 = 53;

/// Where and how to reach the domain controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LdapEndpoint {
    /// Host name or address; a full `ldap://` / `ldaps://` URL is used as is.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Use LDAP over TLS.
    pub ldaps: bool,
    /// Connect timeout.
    pub timeout: Duration,
    /// Verify the server certificate (ldaps only).
    pub verify_tls: bool,
}

impl LdapEndpoint {
    /// Plain LDAP on the default port.
    #[must_use]
    pub fn new(host: &str) -> Self {
        Self {
            host: host.trim().to_string(),
            port: LDAP_PORT,
            ldaps: false,
            timeout: DEFAULT_CONNECT_TIMEOUT,
            verify_tls: true,
        }
    }

    /// Connection URL.
    #[must_use]
    pub fn url(&self) -> String {
        if self.host.contains("://") {
            return self.host.clone();
        }
        let scheme = if self.ldaps { "ldaps" } else { "ldap" };
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        format!("{scheme}://{host}:{}", self.port)
    }
}

/// A connection to a domain controller.
pub struct LdapDirectory {
    conn: LdapConn,
    url: String,
    open: bool,
}

impl LdapDirectory {
    /// Opens the TCP (and TLS) connection. No bind is performed yet.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Transport`] if the server cannot be reached
    /// within the endpoint's timeout.
    pub fn connect(endpoint: &LdapEndpoint) -> DirectoryResult<Self> {
        let url = endpoint.url();
        info!(url = %url, timeout_secs = endpoint.timeout.as_secs(), "Connecting to domain controller");

        let mut settings = LdapConnSettings::new().set_conn_timeout(endpoint.timeout);
        if !endpoint.verify_tls {
            warn!("TLS certificate verification disabled");
            settings = settings.set_no_tls_verify(true);
        }

        let conn = LdapConn::with_settings(settings, &url)
            .map_err(|e| DirectoryError::Transport(format!("cannot connect to {url}: {e}")))?;
        debug!(url = %url, "TCP connection established");

        Ok(Self {
            conn,
            url,
            open: true,
        })
    }

    /// Base-scope read of `attrs` on `dn`.
    fn read_entry(&mut self, dn: &str, attrs: Vec<&str>) -> DirectoryResult<Option<SearchEntry>> {
        let (entries, _) = self
            .conn
            .search(dn, Scope::Base, "(objectClass=*)", attrs)
            .and_then(ldap3::SearchResult::success)
            .map_err(|e| classify(dn, e))?;
        Ok(entries
            .into_iter()
            .find(|e| !e.is_ref())
            .map(SearchEntry::construct))
    }
}

impl Directory for LdapDirectory {
    fn bind(&mut self, credentials: &Credentials) -> DirectoryResult<()> {
        let request = BindRequest::for_credentials(credentials)?;
        debug!(identity = %request.identity(), method = request.method(), url = %self.url, "Binding");

        let result = match &request {
            BindRequest::Ntlm { username, password } => {
                self.conn.sasl_ntlm_bind(username, password)
            }
            BindRequest::Simple { dn, password } => self.conn.simple_bind(dn, password),
        };
        result
            .and_then(ldap3::LdapResult::success)
            .map_err(|e| classify_bind(request.identity(), e))?;
        info!(identity = %request.identity(), "Bind successful");
        Ok(())
    }

    fn exists(&mut self, dn: &str) -> DirectoryResult<bool> {
        match self.read_entry(dn, vec!["1.1"]) {
            Ok(entry) => Ok(entry.is_some()),
            Err(DirectoryError::NoSuchObject { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn read_gplink(&mut self, dn: &str) -> DirectoryResult<Option<String>> {
        let entry = self
            .read_entry(dn, vec![GPLINK_ATTRIBUTE])?
            .ok_or_else(|| DirectoryError::NoSuchObject { dn: dn.to_string() })?;
        Ok(first_gplink(&entry))
    }

    fn search_gplink(&mut self, base: &str, needle: &str) -> DirectoryResult<Vec<DirectoryEntry>> {
        let filter = format!("({GPLINK_ATTRIBUTE}=*{}*)", ldap_escape(needle));
        debug!(base = %base, filter = %filter, "Searching for gPLink holders");

        let (entries, _) = self
            .conn
            .search(base, Scope::Subtree, &filter, vec![GPLINK_ATTRIBUTE])
            .and_then(ldap3::SearchResult::success)
            .map_err(|e| classify(base, e))?;

        Ok(entries
            .into_iter()
            .filter(|e| !e.is_ref())
            .map(SearchEntry::construct)
            .map(|entry| DirectoryEntry {
                gp_link: first_gplink(&entry),
                dn: entry.dn,
            })
            .collect())
    }

    fn replace_gplink(&mut self, dn: &str, value: Option<&str>) -> DirectoryResult<()> {
        let values: HashSet<&str> = value.into_iter().collect();
        debug!(dn = %dn, cleared = value.is_none(), "Replacing gPLink");
        self.conn
            .modify(dn, vec![Mod::Replace(GPLINK_ATTRIBUTE, values)])
            .and_then(ldap3::LdapResult::success)
            .map_err(|e| classify(dn, e))?;
        Ok(())
    }

    fn unbind(&mut self) -> DirectoryResult<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        debug!(url = %self.url, "Unbinding");
        self.conn
            .unbind()
            .map_err(|e| DirectoryError::Transport(e.to_string()))
    }
}

impl Drop for LdapDirectory {
    fn drop(&mut self) {
        if self.open
            && let Err(e) = self.unbind()
        {
            warn!(error = %e, "Unbind on drop failed");
        }
    }
}

/// Attribute names are case-insensitive; AD echoes its own casing.
fn first_gplink(entry: &SearchEntry) -> Option<String> {
    entry
        .attrs
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(GPLINK_ATTRIBUTE))
        .and_then(|(_, values)| values.first().cloned())
}

/// How a set of credentials is presented to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
enum BindRequest {
    /// GSS-SPNEGO bind carrying an NTLMSSP exchange.
    Ntlm { username: String, password: String },
    /// Simple bind, for identities given as a DN.
    Simple { dn: String, password: String },
}

impl BindRequest {
    /// Chooses the bind for `credentials`.
    ///
    /// Account names bind over NTLM with either secret kind. A DN identity
    /// can only bind simply, which needs the plaintext password.
    fn for_credentials(credentials: &Credentials) -> DirectoryResult<Self> {
        let identity = credentials.bind_identity();
        let is_dn = identity.contains('=');
        match &credentials.secret {
            // An empty password turns a bind into an anonymous one.
            Secret::Plaintext(password) if password.is_empty() => {
                Err(DirectoryError::InvalidCredentials {
                    message: "empty password".to_string(),
                })
            }
            Secret::Plaintext(password) if is_dn => Ok(Self::Simple {
                dn: identity,
                password: password.clone(),
            }),
            Secret::Plaintext(password) => Ok(Self::Ntlm {
                username: ntlm_username(identity)?,
                password: password.clone(),
            }),
            Secret::NtHash { .. } if is_dn => Err(DirectoryError::InvalidCredentials {
                message: format!(
                    "hash authentication needs an account name, not the DN {identity}"
                ),
            }),
            Secret::NtHash { nt, .. } => Ok(Self::Ntlm {
                username: ntlm_username(identity)?,
                password: ntlm_hash_password(nt)?,
            }),
        }
    }

    fn identity(&self) -> &str {
        match self {
            Self::Ntlm { username, .. } => username,
            Self::Simple { dn, .. } => dn,
        }
    }

    const fn method(&self) -> &'static str {
        match self {
            Self::Ntlm { .. } => "ntlm",
            Self::Simple { .. } => "simple",
        }
    }
}

/// NTLM takes `DOMAIN\user` or `user@domain`; anything mixing the two is
/// refused before it reaches the SSPI layer.
fn ntlm_username(identity: String) -> DirectoryResult<String> {
    let mixed = identity.split_once('\\').is_some_and(|(domain, user)| {
        domain.contains(['\\', '@']) || user.contains(['\\', '@'])
    });
    if mixed || identity.is_empty() {
        return Err(DirectoryError::InvalidCredentials {
            message: format!("{identity:?} is not a usable NTLM account name"),
        });
    }
    Ok(identity)
}

/// Encodes an NT hash so the NTLM client uses it in place of a password.
///
/// The SSPI layer treats a password longer than 512 bytes (UTF-16) as a
/// precomputed hash: each UTF-16 unit before the trailing 512 bytes holds
/// one hash byte as two uppercase hex digits, high nibble in the low byte.
fn ntlm_hash_password(nt: &str) -> DirectoryResult<String> {
    let invalid = || DirectoryError::InvalidCredentials {
        message: "NT hash is not 32 hex digits".to_string(),
    };
    let digits = nt.to_ascii_uppercase().into_bytes();
    if digits.len() != NT_HASH_HEX_LEN || !digits.iter().all(u8::is_ascii_hexdigit) {
        return Err(invalid());
    }

    let mut password = String::with_capacity(NT_HASH_HEX_LEN + HASH_PASSWORD_PADDING);
    for pair in digits.chunks_exact(2) {
        let unit = u16::from_le_bytes([pair[0], pair[1]]);
        password.push(char::from_u32(u32::from(unit)).ok_or_else(invalid)?);
    }
    password.extend(std::iter::repeat_n('\0', HASH_PASSWORD_PADDING / 2));
    Ok(password)
}

/// Maps a failed bind: rejected credentials become
/// [`DirectoryError::InvalidCredentials`], the rest goes through [`classify`].
fn classify_bind(identity: &str, err: LdapError) -> DirectoryError {
    match classify(identity, err) {
        DirectoryError::Protocol { rc, message }
            if matches!(
                rc,
                RC_INVALID_CREDENTIALS | RC_INAPPROPRIATE_AUTHENTICATION | RC_UNWILLING_TO_PERFORM
            ) =>
        {
            DirectoryError::InvalidCredentials {
                message: format!("result code {rc}: {message}"),
            }
        }
        other => other,
    }
}

/// Maps an `ldap3` error onto the directory error taxonomy.
fn classify(dn: &str, err: LdapError) -> DirectoryError {
    match err {
        LdapError::LdapResult { result } => {
            let message = if result.text.is_empty() {
                result.to_string()
            } else {
                result.text.clone()
            };
            match result.rc {
                RC_NO_SUCH_OBJECT => DirectoryError::NoSuchObject { dn: dn.to_string() },
                RC_INSUFFICIENT_ACCESS_RIGHTS => DirectoryError::InsufficientAccess {
                    dn: dn.to_string(),
                    message,
                },
                RC_INVALID_DN_SYNTAX | RC_INVALID_ATTRIBUTE_SYNTAX => {
                    DirectoryError::InvalidSyntax {
                        dn: dn.to_string(),
                        message,
                    }
                }
                rc => DirectoryError::Protocol { rc, message },
            }
        }
        other => DirectoryError::Transport(other.to_string()),
    }
}
