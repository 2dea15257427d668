//! The dependency manifest.
//!
//! An ordered list of [`PackageSpec`]s describing every native package the
//! application needs at build and run time. Order is kept so argument lists and
//! logs are reproducible; the backends resolve transitive dependencies and
//! deduplicate on their own.

mod types;

pub use types::*;
