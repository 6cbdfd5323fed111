//! Distinguished name handling.
//!
//! DNs are opaque to gpolink: they are syntax-checked once at the edge and
//! then only compared and passed through to the directory.

use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;

/// A syntactically valid distinguished name.
///
/// # Examples
///
/// ```
/// use gpolink::core::DistinguishedName;
///
/// let dn = DistinguishedName::parse("OU=Servers,DC=corp,DC=local").unwrap();
/// assert_eq!(dn.naming_context().unwrap().as_str(), "DC=corp,DC=local");
/// assert!(DistinguishedName::parse("not a dn").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DistinguishedName(String);

impl DistinguishedName {
    /// Validates `input` and wraps it.
    ///
    /// Each comma-separated RDN must be `type=value` with an attribute type
    /// that is either a descriptor (`OU`, `msDS-Foo`) or a numeric OID, and
    /// a non-empty value. Backslash escapes are honored. Whitespace around
    /// the RDN separators is dropped; case is kept.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(malformed(input, "empty distinguished name"));
        }

        let rdns = split_unescaped(trimmed, ',').map_err(|reason| malformed(input, reason))?;
        for rdn in &rdns {
            for ava in split_unescaped(rdn, '+').map_err(|reason| malformed(input, reason))? {
                check_ava(ava).map_err(|reason| malformed(input, reason))?;
            }
        }

        Ok(Self(join_rdns(&rdns)))
    }

    /// Builds `DC=corp,DC=local` from a DNS domain name such as `corp.local`.
    ///
    /// Returns `None` when the name has no usable labels.
    #[must_use]
    pub fn from_dns_domain(domain: &str) -> Option<Self> {
        let labels: Vec<&str> = domain
            .trim()
            .trim_end_matches('.')
            .split('.')
            .map(str::trim)
            .collect();
        if labels.iter().any(|l| l.is_empty()) {
            return None;
        }
        let dn = labels
            .iter()
            .map(|l| format!("DC={l}"))
            .collect::<Vec<_>>()
            .join(",");
        Self::parse(&dn).ok()
    }

    /// The trailing run of `DC=` components, i.e. the domain naming context.
    #[must_use]
    pub fn naming_context(&self) -> Option<Self> {
        let rdns = split_unescaped(&self.0, ',').ok()?;
        let start = rdns
            .iter()
            .rposition(|rdn| !is_dc(rdn))
            .map_or(0, |i| i + 1);
        if start == rdns.len() {
            return None;
        }
        Some(Self(join_rdns(&rdns[start..])))
    }

    /// Value of the leading RDN, e.g. the `{GUID}` of a GPO container.
    #[must_use]
    pub fn leading_value(&self) -> &str {
        let rdn = split_unescaped(&self.0, ',')
            .ok()
            .and_then(|rdns| rdns.first().copied())
            .unwrap_or(self.0.as_str());
        rdn.split_once('=').map_or(rdn, |(_, value)| value.trim())
    }

    /// Case-insensitive comparison against a raw DN string.
    ///
    /// Whitespace around RDN separators is ignored.
    #[must_use]
    pub fn matches(&self, other: &str) -> bool {
        normalize(&self.0) == normalize(other)
    }

    /// Whether this DN is `base` or lies beneath it.
    #[must_use]
    pub fn is_within(&self, base: &str) -> bool {
        let dn = normalize(&self.0);
        let base = normalize(base);
        dn == base || dn.ends_with(&format!(",{base}"))
    }

    /// The DN text, with RDN separators tightened.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn malformed(input: &str, reason: &str) -> Error {
    Error::MalformedInput {
        reason: format!("{input:?} is not a distinguished name: {reason}"),
    }
}

/// Splits on `sep` where it is not preceded by a backslash escape.
fn split_unescaped(input: &str, sep: char) -> std::result::Result<Vec<&str>, &'static str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut chars = input.char_indices();
    while let Some((i, c)) = chars.next() {
        if c == '\\' {
            if chars.next().is_none() {
                return Err("trailing escape character");
            }
        } else if c == sep {
            parts.push(&input[start..i]);
            start = i + c.len_utf8();
        }
    }
    parts.push(&input[start..]);
    Ok(parts)
}

fn check_ava(ava: &str) -> std::result::Result<(), &'static str> {
    let Some((attr, value)) = ava.split_once('=') else {
        return Err("component without '='");
    };
    let attr = attr.trim();
    if attr.is_empty() {
        return Err("empty attribute type");
    }
    let descriptor = attr.starts_with(|c: char| c.is_ascii_alphabetic())
        && attr.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    let oid = attr.split('.').all(|arc| !arc.is_empty() && arc.bytes().all(|b| b.is_ascii_digit()));
    if !descriptor && !oid {
        return Err("invalid attribute type");
    }
    if value.trim().is_empty() {
        return Err("empty attribute value");
    }
    Ok(())
}

fn join_rdns(rdns: &[&str]) -> String {
    rdns.iter().map(|rdn| rdn.trim()).collect::<Vec<_>>().join(",")
}

fn is_dc(rdn: &str) -> bool {
    rdn.split_once('=')
        .is_some_and(|(attr, _)| attr.trim().eq_ignore_ascii_case("dc"))
}

fn normalize(dn: &str) -> String {
    split_unescaped(dn.trim(), ',').map_or_else(
        |_| dn.trim().to_ascii_lowercase(),
        |rdns| {
            rdns.iter()
                .map(|rdn| rdn.trim().to_ascii_lowercase())
                .collect::<Vec<_>>()
                .join(",")
        },
    )
}
