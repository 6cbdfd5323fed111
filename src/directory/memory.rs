//! In-memory directory tree.
//!
//! Mirrors the LDAP backend's observable behavior closely enough to drive
//! the session logic without a domain controller: case-insensitive DNs,
//! insertion-ordered search results, `noSuchObject` for unknown DNs and
//! `insufficientAccessRights` for write-protected objects.

use crate::core::{Credentials, DistinguishedName, Secret};
use crate::directory::traits::{Directory, DirectoryEntry, DirectoryResult};
use crate::error::DirectoryError;

const RC_OPERATIONS_ERROR: u32 = 1;

#[derive(Debug, Clone)]
struct Object {
    dn: DistinguishedName,
    gp_link: Option<String>,
    writable: bool,
}

#[derive(Debug, Clone)]
struct Account {
    identity: String,
    secret: Secret,
}

/// A directory held in memory.
///
/// # Examples
///
/// ```
/// use gpolink::core::Credentials;
/// use gpolink::directory::{Directory, MemoryDirectory};
///
/// let mut dir = MemoryDirectory::new()
///     .with_account("corp.local", "admin", "Passw0rd")
///     .with_object("OU=Servers,DC=corp,DC=local", None);
/// dir.bind(&Credentials::new("dc", "corp.local", "admin", "Passw0rd")).unwrap();
/// assert!(dir.exists("ou=servers,dc=corp,dc=local").unwrap());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    objects: Vec<Object>,
    accounts: Vec<Account>,
    bound: bool,
    writes: usize,
}

impl MemoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an account that may bind.
    #[must_use]
    pub fn with_account(mut self, domain: &str, username: &str, secret: &str) -> Self {
        let creds = Credentials::new("", domain, username, secret);
        self.accounts.push(Account {
            identity: creds.bind_identity(),
            secret: creds.secret,
        });
        self
    }

    /// Adds an object with an optional `gPLink` value.
    ///
    /// Invalid DNs are ignored.
    #[must_use]
    pub fn with_object(mut self, dn: &str, gp_link: Option<&str>) -> Self {
        if let Ok(dn) = DistinguishedName::parse(dn) {
            self.objects.push(Object {
                dn,
                gp_link: gp_link.map(str::to_string),
                writable: true,
            });
        }
        self
    }

    /// Makes `dn` read-only for the bound identity.
    #[must_use]
    pub fn deny_write(mut self, dn: &str) -> Self {
        if let Some(object) = self.objects.iter_mut().find(|o| o.dn.matches(dn)) {
            object.writable = false;
        }
        self
    }

    /// Current `gPLink` of `dn`, bypassing access checks.
    #[must_use]
    pub fn gplink_of(&self, dn: &str) -> Option<&str> {
        self.find(dn).and_then(|o| o.gp_link.as_deref())
    }

    /// Number of successful modify operations so far.
    #[must_use]
    pub const fn writes(&self) -> usize {
        self.writes
    }

    /// Whether a bind has succeeded and no unbind followed.
    #[must_use]
    pub const fn is_bound(&self) -> bool {
        self.bound
    }

    fn find(&self, dn: &str) -> Option<&Object> {
        self.objects.iter().find(|o| o.dn.matches(dn))
    }

    fn require_bound(&self) -> DirectoryResult<()> {
        if self.bound {
            Ok(())
        } else {
            Err(DirectoryError::Protocol {
                rc: RC_OPERATIONS_ERROR,
                message: "a successful bind must be completed on the connection".to_string(),
            })
        }
    }
}

impl Directory for MemoryDirectory {
    fn bind(&mut self, credentials: &Credentials) -> DirectoryResult<()> {
        let identity = credentials.bind_identity();
        let accepted = self.accounts.iter().any(|a| {
            a.identity.eq_ignore_ascii_case(&identity)
                && accepts(&a.secret, &identity, &credentials.secret)
        });
        if !accepted {
            return Err(DirectoryError::InvalidCredentials {
                message: format!("bind rejected for {identity}"),
            });
        }
        self.bound = true;
        Ok(())
    }

    fn exists(&mut self, dn: &str) -> DirectoryResult<bool> {
        self.require_bound()?;
        Ok(self.find(dn).is_some())
    }

    fn read_gplink(&mut self, dn: &str) -> DirectoryResult<Option<String>> {
        self.require_bound()?;
        self.find(dn)
            .map(|o| o.gp_link.clone())
            .ok_or_else(|| DirectoryError::NoSuchObject { dn: dn.to_string() })
    }

    fn search_gplink(&mut self, base: &str, needle: &str) -> DirectoryResult<Vec<DirectoryEntry>> {
        self.require_bound()?;
        if self.find(base).is_none() && !self.objects.iter().any(|o| o.dn.is_within(base)) {
            return Err(DirectoryError::NoSuchObject {
                dn: base.to_string(),
            });
        }
        let needle = needle.to_ascii_lowercase();
        Ok(self
            .objects
            .iter()
            .filter(|o| o.dn.is_within(base))
            .filter(|o| {
                o.gp_link
                    .as_deref()
                    .is_some_and(|v| v.to_ascii_lowercase().contains(&needle))
            })
            .map(|o| DirectoryEntry {
                dn: o.dn.to_string(),
                gp_link: o.gp_link.clone(),
            })
            .collect())
    }

    fn replace_gplink(&mut self, dn: &str, value: Option<&str>) -> DirectoryResult<()> {
        self.require_bound()?;
        let object = self
            .objects
            .iter_mut()
            .find(|o| o.dn.matches(dn))
            .ok_or_else(|| DirectoryError::NoSuchObject { dn: dn.to_string() })?;
        if !object.writable {
            return Err(DirectoryError::InsufficientAccess {
                dn: dn.to_string(),
                message: "write access to gPLink denied".to_string(),
            });
        }
        object.gp_link = value.map(str::to_string);
        self.writes += 1;
        Ok(())
    }

    fn unbind(&mut self) -> DirectoryResult<()> {
        self.bound = false;
        Ok(())
    }
}

/// NTLM proves only the NT half of a hash pair, and a DN identity can only
/// bind with a password.
fn accepts(stored: &Secret, identity: &str, offered: &Secret) -> bool {
    match (stored, offered) {
        (Secret::Plaintext(stored), Secret::Plaintext(offered)) => stored == offered,
        (Secret::NtHash { nt: stored, .. }, Secret::NtHash { nt: offered, .. }) => {
            stored == offered && !identity.contains('=')
        }
        _ => false,
    }
}
