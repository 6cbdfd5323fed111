//! Directory trait definition.
//!
//! Defines the handful of directory primitives gpolink needs, enabling
//! pluggable backends: LDAP for real domain controllers and an in-memory
//! tree for tests.

use crate::core::Credentials;
use crate::error::DirectoryError;

/// Result type for directory primitives.
pub type DirectoryResult<T> = std::result::Result<T, DirectoryError>;

/// An object returned by a `gPLink` search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Object DN as returned by the directory.
    pub dn: String,
    /// The object's `gPLink` value, if set.
    pub gp_link: Option<String>,
}

/// Trait for directory backends.
///
/// Calls block until the server answers. Implementations are used from a
/// single thread and own their connection.
pub trait Directory {
    /// Authenticates the connection.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::InvalidCredentials`] when the server
    /// rejects the identity or secret.
    fn bind(&mut self, credentials: &Credentials) -> DirectoryResult<()>;

    /// Checks whether `dn` names an existing object.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup itself fails.
    fn exists(&mut self, dn: &str) -> DirectoryResult<bool>;

    /// Reads the `gPLink` value of `dn`. `None` when the attribute is unset.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::NoSuchObject`] if `dn` does not exist.
    fn read_gplink(&mut self, dn: &str) -> DirectoryResult<Option<String>>;

    /// Subtree search under `base` for objects whose `gPLink` contains the
    /// text `needle` (case-insensitive). Results are candidates in directory
    /// order; callers confirm the match by parsing the value.
    ///
    /// # Errors
    ///
    /// Returns an error if the search fails.
    fn search_gplink(&mut self, base: &str, needle: &str) -> DirectoryResult<Vec<DirectoryEntry>>;

    /// Replaces the `gPLink` value of `dn`; `None` clears the attribute.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::InsufficientAccess`] when the identity may
    /// not write the attribute, [`DirectoryError::NoSuchObject`] if `dn`
    /// does not exist.
    fn replace_gplink(&mut self, dn: &str, value: Option<&str>) -> DirectoryResult<()>;

    /// Releases the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the unbind request could not be sent.
    fn unbind(&mut self) -> DirectoryResult<()>;
}

impl<D: Directory + ?Sized> Directory for &mut D {
    fn bind(&mut self, credentials: &Credentials) -> DirectoryResult<()> {
        (**self).bind(credentials)
    }

    fn exists(&mut self, dn: &str) -> DirectoryResult<bool> {
        (**self).exists(dn)
    }

    fn read_gplink(&mut self, dn: &str) -> DirectoryResult<Option<String>> {
        (**self).read_gplink(dn)
    }

    fn search_gplink(&mut self, base: &str, needle: &str) -> DirectoryResult<Vec<DirectoryEntry>> {
        (**self).search_gplink(base, needle)
    }

    fn replace_gplink(&mut self, dn: &str, value: Option<&str>) -> DirectoryResult<()> {
        (**self).replace_gplink(dn, value)
    }

    fn unbind(&mut self) -> DirectoryResult<()> {
        (**self).unbind()
    }
}
