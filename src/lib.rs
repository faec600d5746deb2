//! # apkg-bridge
//!
//! Converts Anki `.apkg` packages to and from a vendor-neutral
//! spaced-repetition model without losing vendor-only data.
//!
//! The crate is organised as a pipeline:
//!
//! - [`io::container`] opens the ZIP container, decodes the `meta` header and
//!   diagnoses corrupt files
//! - [`storage::sqlite`] reads and writes the embedded collection database
//! - [`io::validation`] filters rows that violate shape or referential rules
//! - [`services::convert`] maps entities in both directions, using
//!   [`services::IdReconciler`] and [`services::cloze`]
//! - [`services::IssueCollector`] turns accumulated issues into an
//!   [`Outcome`] according to the caller's [`Policy`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use apkg_bridge::{MemoryPackage, Outcome, Policy, VendorPackage};
//!
//! let opened = VendorPackage::open("deck.apkg", Some(Policy::BestEffort))?;
//! if let Some(package) = opened.into_data() {
//!     let universal = package.to_universal::<MemoryPackage>(None)?;
//!     println!("{} issues", universal.issues().len());
//! }
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod io;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;
pub mod universal;

// Re-exports for convenience
pub use config::BridgeConfig;
pub use models::{
    EntityKind, Issue, IssueContext, Outcome, Policy, Severity, Snapshot, UniversalId,
};
pub use services::{IdReconciler, IssueCollector, VendorPackage};
pub use universal::{MemoryPackage, UniversalPackage};

/// Error type for unexpected faults.
///
/// Expected data problems (corrupt containers, dangling references, invalid
/// rows) never surface here; they are reported as [`Issue`]s inside an
/// [`Outcome`].
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | A caller passes an argument that can never be valid (e.g. an empty media file name) |
/// | `OperationFailed` | I/O, archive, or database faults outside the diagnosed failure modes |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - The export destination cannot be created or written
    /// - `SQLite` fails while serializing a snapshot
    /// - A scratch directory cannot be created
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Builds an [`Error::OperationFailed`] from any displayable cause.
    pub fn operation(operation: &str, cause: impl std::fmt::Display) -> Self {
        Self::OperationFailed {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for apkg-bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in seconds.
///
/// Falls back to 0 if the system clock is before the Unix epoch.
#[must_use]
pub fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp().max(0)
}

/// Returns the current Unix timestamp in milliseconds.
#[must_use]
pub fn current_timestamp_millis() -> i64 {
    chrono::Utc::now().timestamp_millis().max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("test error".to_string());
        assert_eq!(err.to_string(), "invalid input: test error");

        let err = Error::operation("write_container", "disk full");
        assert_eq!(
            err.to_string(),
            "operation 'write_container' failed: disk full"
        );
    }

    #[test]
    fn test_timestamps_are_positive() {
        assert!(current_timestamp() > 0);
        assert!(current_timestamp_millis() / 1000 >= current_timestamp() - 1);
    }
}
