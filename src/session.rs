//! Authenticated directory session and the three GPO link operations.
//!
//! A [`DirectorySession`] only exists once a bind has succeeded, so every
//! operation runs against an authenticated connection. Failures are never
//! retried.

use crate::core::{Credentials, DistinguishedName, GPLINK_ATTRIBUTE, GpLink, GpoLink};
use crate::directory::{Directory, LdapDirectory, LdapEndpoint};
use crate::error::{DirectoryError, Error, Operation, Result};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

/// Result of a link or unlink request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkOutcome {
    /// A new link segment was written.
    Linked,
    /// The container already linked the GPO; nothing was written.
    AlreadyLinked,
    /// The link segment was removed.
    Unlinked,
    /// The container did not link the GPO; nothing was written.
    NotLinked,
}

impl LinkOutcome {
    /// Whether the directory was modified.
    #[must_use]
    pub const fn changed(self) -> bool {
        matches!(self, Self::Linked | Self::Unlinked)
    }
}

impl fmt::Display for LinkOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Linked => "linked",
            Self::AlreadyLinked => "already linked",
            Self::Unlinked => "unlinked",
            Self::NotLinked => "not linked",
        })
    }
}

/// A bound directory connection.
pub struct DirectorySession<D: Directory> {
    directory: D,
    domain_base: Option<DistinguishedName>,
    search_base: Option<DistinguishedName>,
}

impl DirectorySession<LdapDirectory> {
    /// Connects to `endpoint` and binds with `credentials`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Authentication`] if the server is unreachable or the
    /// bind is rejected.
    pub fn connect(endpoint: &LdapEndpoint, credentials: &Credentials) -> Result<Self> {
        let directory = LdapDirectory::connect(endpoint).map_err(|e| Error::Authentication {
            server: credentials.server.clone(),
            reason: e.to_string(),
        })?;
        Self::bind(directory, credentials)
    }
}

impl<D: Directory> DirectorySession<D> {
    /// Binds an already-connected `directory`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Authentication`] for any bind failure.
    pub fn bind(mut directory: D, credentials: &Credentials) -> Result<Self> {
        debug!(
            server = %credentials.server,
            identity = %credentials.bind_identity(),
            mode = ?credentials.mode(),
            "Authenticating"
        );
        directory
            .bind(credentials)
            .map_err(|e| Error::Authentication {
                server: credentials.server.clone(),
                reason: match e {
                    DirectoryError::InvalidCredentials { message } => {
                        format!("invalid credentials ({message})")
                    }
                    other => other.to_string(),
                },
            })?;
        info!(server = %credentials.server, domain = %credentials.domain, "Authenticated");

        Ok(Self {
            directory,
            domain_base: DistinguishedName::from_dns_domain(&credentials.domain),
            search_base: None,
        })
    }

    /// Fixes the subtree that [`list_links`](Self::list_links) searches.
    #[must_use]
    pub fn with_search_base(mut self, base: Option<DistinguishedName>) -> Self {
        self.search_base = base;
        self
    }

    /// Search root for `gpo`: the explicit base, else the GPO's own naming
    /// context, else the one derived from the domain name.
    fn search_base_for(&self, gpo: &DistinguishedName) -> Result<DistinguishedName> {
        self.search_base
            .clone()
            .or_else(|| gpo.naming_context())
            .or_else(|| self.domain_base.clone())
            .ok_or_else(|| Error::Config {
                message: format!("cannot derive a search base for {gpo}; pass --search-base"),
            })
    }

    /// Lists every container whose `gPLink` references `gpo`, in directory
    /// result order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Lookup`] if `gpo` does not exist.
    pub fn list_links(&mut self, gpo: &DistinguishedName) -> Result<Vec<GpoLink>> {
        let op = Operation::ListLinks;
        self.require_exists(op, gpo)?;

        // Search on the leading RDN value only; spacing and case elsewhere in
        // stored links vary, so `find` makes the real comparison.
        let base = self.search_base_for(gpo)?;
        let entries = self
            .directory
            .search_gplink(base.as_str(), gpo.leading_value())
            .map_err(|e| Error::directory(op, e))?;
        debug!(base = %base, candidates = entries.len(), "Search complete");

        let links: Vec<GpoLink> = entries
            .into_iter()
            .filter_map(|entry| {
                let value = GpLink::scan(entry.gp_link.as_deref()?);
                let segment = value.find(gpo)?;
                Some(GpoLink::new(entry.dn, segment))
            })
            .collect();

        info!(gpo = %gpo, count = links.len(), "Listed GPO links");
        Ok(links)
    }

    /// Links `gpo` to `target` by appending `[LDAP://<gpo>;0]` to the
    /// target's `gPLink`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Lookup`] if either DN does not exist,
    /// [`Error::Permission`] if the attribute cannot be written and
    /// [`Error::MalformedInput`] if the current value cannot be parsed.
    pub fn link_gpo(
        &mut self,
        gpo: &DistinguishedName,
        target: &DistinguishedName,
    ) -> Result<LinkOutcome> {
        let op = Operation::Link;
        self.require_exists(op, gpo)?;

        let mut value = self.read_gplink(op, target)?;
        if !value.link(gpo) {
            info!(gpo = %gpo, target = %target, "GPO already linked; no change");
            return Ok(LinkOutcome::AlreadyLinked);
        }

        self.write_gplink(op, target, &value)?;
        info!(gpo = %gpo, target = %target, "Linked GPO");
        Ok(LinkOutcome::Linked)
    }

    /// Removes every `gPLink` segment on `target` that references `gpo`,
    /// whatever its flags.
    ///
    /// # Errors
    ///
    /// Same conditions as [`link_gpo`](Self::link_gpo), except that `gpo`
    /// itself need not exist, so dangling links can be cleaned up.
    pub fn unlink_gpo(
        &mut self,
        gpo: &DistinguishedName,
        target: &DistinguishedName,
    ) -> Result<LinkOutcome> {
        let op = Operation::Unlink;
        let mut value = self.read_gplink(op, target)?;
        if !value.unlink(gpo) {
            info!(gpo = %gpo, target = %target, "GPO not linked; no change");
            return Ok(LinkOutcome::NotLinked);
        }

        self.write_gplink(op, target, &value)?;
        info!(gpo = %gpo, target = %target, "Unlinked GPO");
        Ok(LinkOutcome::Unlinked)
    }

    /// Unbinds and releases the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the unbind could not be sent.
    pub fn close(mut self) -> Result<()> {
        self.directory
            .unbind()
            .map_err(|e| Error::directory(Operation::Connect, e))
    }

    fn require_exists(&mut self, op: Operation, dn: &DistinguishedName) -> Result<()> {
        let exists = self
            .directory
            .exists(dn.as_str())
            .map_err(|e| Error::directory(op, e))?;
        if exists {
            Ok(())
        } else {
            warn!(dn = %dn, "Object not found");
            Err(Error::Lookup {
                operation: op,
                dn: dn.to_string(),
            })
        }
    }

    fn read_gplink(&mut self, op: Operation, target: &DistinguishedName) -> Result<GpLink> {
        let raw = self
            .directory
            .read_gplink(target.as_str())
            .map_err(|e| Error::directory(op, e))?;
        debug!(target = %target, current = ?raw, "Read {GPLINK_ATTRIBUTE}");
        GpLink::parse(raw.as_deref().unwrap_or_default()).map_err(|e| Error::MalformedInput {
            reason: format!("{op}: refusing to rewrite {GPLINK_ATTRIBUTE} on {target}: {e}"),
        })
    }

    fn write_gplink(
        &mut self,
        op: Operation,
        target: &DistinguishedName,
        value: &GpLink,
    ) -> Result<()> {
        let rendered = value.to_string();
        let new_value = (!value.is_empty()).then_some(rendered.as_str());
        self.directory
            .replace_gplink(target.as_str(), new_value)
            .map_err(|e| Error::directory(op, e))
    }
}
