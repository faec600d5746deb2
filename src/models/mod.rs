//! Data models for apkg-bridge.
//!
//! - [`vendor`]: typed rows and JSON blobs of the vendor collection database
//! - [`snapshot`]: raw and validated in-memory snapshots of one database
//! - [`universal`]: vendor-neutral entities produced and consumed by conversion
//! - [`issue`]: severity-tiered issues and the three-valued [`Outcome`]

mod issue;
pub mod snapshot;
pub mod universal;
pub mod vendor;

pub use issue::{EntityKind, Issue, IssueContext, Outcome, Policy, Severity};
pub use snapshot::{RawSnapshot, Snapshot, SnapshotCounts};
pub use universal::{ApplicationData, Rating, UniversalId};
pub use vendor::{FIELD_SEPARATOR, NoteTypeKind, SCHEMA_VERSION};
