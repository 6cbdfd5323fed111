//! Core domain models for gpolink.
//!
//! Credentials, distinguished names and the `gPLink` attribute. These are
//! pure domain models with no I/O dependencies.

pub mod credentials;
pub mod dn;
pub mod gplink;

pub use credentials::{AuthMode, Credentials, Secret};
pub use dn::DistinguishedName;
pub use gplink::{GPLINK_ATTRIBUTE, GpLink, GpLinkSegment, GpoLink};
