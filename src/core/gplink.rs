//! The `gPLink` attribute.
//!
//! A container's `gPLink` is a run of bracketed segments,
//! `[LDAP://<GPO-DN>;<flags>]`, one per linked GPO. Segments this crate does
//! not touch are kept byte for byte and in order.

use crate::core::DistinguishedName;
use crate::error::GpLinkError;
use serde::Serialize;
use std::fmt;

/// Directory attribute holding a container's GPO links.
pub const GPLINK_ATTRIBUTE: &str = "gPLink";

const LDAP_PREFIX: &str = "LDAP://";

/// Link option bit: link disabled.
pub const FLAG_DISABLED: u32 = 0x1;
/// Link option bit: link enforced (no override).
pub const FLAG_ENFORCED: u32 = 0x2;

/// One `[LDAP://<dn>;<flags>]` entry, stored as the text between brackets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpLinkSegment {
    raw: String,
}

impl GpLinkSegment {
    /// Builds a fresh segment for `gpo` with the given link flags.
    #[must_use]
    pub fn new(gpo: &DistinguishedName, flags: u32) -> Self {
        Self {
            raw: format!("{LDAP_PREFIX}{gpo};{flags}"),
        }
    }

    /// The GPO DN portion, without the `LDAP://` prefix and flags.
    #[must_use]
    pub fn gpo_dn(&self) -> &str {
        let body = match self.raw.get(..LDAP_PREFIX.len()) {
            Some(prefix) if prefix.eq_ignore_ascii_case(LDAP_PREFIX) => {
                &self.raw[LDAP_PREFIX.len()..]
            }
            _ => self.raw.as_str(),
        };
        body.rsplit_once(';').map_or(body, |(dn, _)| dn)
    }

    /// Link option flags, if present and numeric.
    #[must_use]
    pub fn flags(&self) -> Option<u32> {
        self.raw
            .rsplit_once(';')
            .and_then(|(_, flags)| flags.trim().parse().ok())
    }

    /// Whether this segment links `gpo`. Flags are ignored.
    #[must_use]
    pub fn references(&self, gpo: &DistinguishedName) -> bool {
        gpo.matches(self.gpo_dn())
    }
}

impl fmt::Display for GpLinkSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.raw)
    }
}

/// Parsed `gPLink` value.
///
/// # Examples
///
/// ```
/// use gpolink::core::{DistinguishedName, GpLink};
///
/// let gpo = DistinguishedName::parse("CN={G},CN=Policies,CN=System,DC=corp,DC=local").unwrap();
/// let mut value = GpLink::parse("[LDAP://CN=Other,DC=corp,DC=local;0]").unwrap();
/// assert!(value.link(&gpo));
/// assert!(!value.link(&gpo));
/// assert_eq!(
///     value.to_string(),
///     "[LDAP://CN=Other,DC=corp,DC=local;0][LDAP://CN={G},CN=Policies,CN=System,DC=corp,DC=local;0]"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GpLink {
    segments: Vec<GpLinkSegment>,
}

impl GpLink {
    /// Parses an attribute value. Whitespace between segments is dropped;
    /// any other stray text is an error.
    pub fn parse(value: &str) -> Result<Self, GpLinkError> {
        let mut segments = Vec::new();
        let mut pos = 0;
        while pos < value.len() {
            let rest = &value[pos..];
            let skipped = rest.len() - rest.trim_start().len();
            pos += skipped;
            if pos == value.len() {
                break;
            }
            if !value[pos..].starts_with('[') {
                return Err(GpLinkError::UnexpectedText { offset: pos });
            }
            let Some(end) = value[pos + 1..].find(']') else {
                return Err(GpLinkError::Unterminated { offset: pos });
            };
            segments.push(GpLinkSegment {
                raw: value[pos + 1..pos + 1 + end].to_string(),
            });
            pos += end + 2;
        }
        Ok(Self { segments })
    }

    /// Lenient scan that picks out every complete bracketed segment and
    /// ignores anything else. Used for reading only, never for rewriting.
    #[must_use]
    pub fn scan(value: &str) -> Self {
        let mut segments = Vec::new();
        let mut rest = value;
        while let Some(open) = rest.find('[') {
            let after = &rest[open + 1..];
            let Some(close) = after.find(']') else { break };
            segments.push(GpLinkSegment {
                raw: after[..close].to_string(),
            });
            rest = &after[close + 1..];
        }
        Self { segments }
    }

    /// Segments in attribute order.
    #[must_use]
    pub fn segments(&self) -> &[GpLinkSegment] {
        &self.segments
    }

    /// Whether no GPO is linked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// First segment linking `gpo`.
    #[must_use]
    pub fn find(&self, gpo: &DistinguishedName) -> Option<&GpLinkSegment> {
        self.segments.iter().find(|s| s.references(gpo))
    }

    /// Appends an enabled link to `gpo` unless one is already present.
    ///
    /// Returns `true` if the value changed.
    pub fn link(&mut self, gpo: &DistinguishedName) -> bool {
        if self.find(gpo).is_some() {
            return false;
        }
        self.segments.push(GpLinkSegment::new(gpo, 0));
        true
    }

    /// Removes every segment linking `gpo`, whatever its flags.
    ///
    /// Returns `true` if the value changed.
    pub fn unlink(&mut self, gpo: &DistinguishedName) -> bool {
        let before = self.segments.len();
        self.segments.retain(|s| !s.references(gpo));
        self.segments.len() != before
    }
}

impl fmt::Display for GpLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

/// A container that links a GPO, with the link's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GpoLink {
    /// DN of the linking container.
    pub target: String,
    /// Raw link flags (`None` if unreadable).
    pub flags: Option<u32>,
    /// Link is active.
    pub enabled: bool,
    /// Link is enforced.
    pub enforced: bool,
}

impl GpoLink {
    /// Describes `segment` as seen on `target`.
    #[must_use]
    pub fn new(target: String, segment: &GpLinkSegment) -> Self {
        let flags = segment.flags();
        let bits = flags.unwrap_or(0);
        Self {
            target,
            flags,
            enabled: bits & FLAG_DISABLED == 0,
            enforced: bits & FLAG_ENFORCED != 0,
        }
    }
}
