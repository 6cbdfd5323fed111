//! Directory access layer for gpolink.
//!
//! The [`Directory`] trait names the primitives the session needs (bind,
//! existence check, `gPLink` read, search and replace, unbind).
//! [`LdapDirectory`] talks to a domain controller through `ldap3`;
//! [`MemoryDirectory`] keeps a tree in memory.

pub mod ldap;
pub mod memory;
pub mod traits;

pub use ldap::{LDAP_PORT, LDAPS_PORT, LdapDirectory, LdapEndpoint};
pub use memory::MemoryDirectory;
pub use traits::{Directory, DirectoryEntry, DirectoryResult};
