//! Shared utilities.
//!
//! Path helpers used across the crate, plus test doubles for the runner and
//! the filesystem.

pub mod paths;

#[cfg(test)]
pub mod testutil;
