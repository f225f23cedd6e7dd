//! Customization and build pipeline for a Cherry Studio checkout.
//!
//! The crate keeps a strict separation, so every edit can be tested without
//! touching a real checkout:
//!
//! - **[`core`]**: Pure text transforms behind the [`core::types::Patch`] trait.
//!   No I/O.
//! - **[`io`]**: Config loading, backups, patch application, subprocesses and
//!   the run log.
//!
//! [`plan`] maps a configuration to patches and build steps; [`customize`]
//! sequences them and rolls back on failure.

pub mod core;
pub mod customize;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod plan;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
