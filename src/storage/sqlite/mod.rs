//! Collection database access.
//!
//! - [`connection`]: header diagnosis, validated read-only open, export pragmas
//! - [`schema`]: DDL and column lists of schema version 11
//! - [`rows`]: reading a [`RawSnapshot`](crate::models::RawSnapshot) and writing a
//!   [`Snapshot`](crate::models::Snapshot)
//! - [`metrics`]: operation counters and latencies

mod connection;
mod metrics;
mod rows;
pub mod schema;

pub use connection::{
    REQUIRED_TABLES, SQLITE_HEADER_LEN, SQLITE_MAGIC, check_header, configure_for_export,
    missing_tables, open_validated,
};
pub use metrics::record_database_operation;
pub use rows::{field_checksum, read_raw_snapshot, strip_html, write_snapshot};

use crate::models::{EntityKind, Issue};
use thiserror::Error as ThisError;

/// Reasons a collection database cannot be read.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum DatabaseError {
    /// The file has zero bytes.
    #[error("collection database is empty")]
    Empty,
    /// The file is shorter than a `SQLite` header.
    #[error("collection database is too small to be SQLite ({0} bytes)")]
    TooSmall(u64),
    /// The first 16 bytes are not the `SQLite` magic.
    #[error("collection database does not have a SQLite header")]
    BadHeader,
    /// The header is valid but required tables are absent.
    #[error("collection database has a valid header but is missing tables: {}", .0.join(", "))]
    MissingTables(Vec<String>),
    /// `col.ver` is absent or not the supported version.
    #[error("unsupported collection schema version: {}", .0.map_or_else(|| "none".to_string(), |v| v.to_string()))]
    UnsupportedSchema(Option<i64>),
    /// The collection row is missing or its JSON columns are malformed.
    #[error("malformed collection row: {0}")]
    MalformedCollection(String),
    /// `SQLite` refused to open or query the file.
    #[error("collection database is unreadable: {0}")]
    Unreadable(String),
}

impl DatabaseError {
    /// Converts the error into the critical issue reported to callers.
    #[must_use]
    pub fn into_issue(self) -> Issue {
        Issue::critical(self.to_string()).with_entity(EntityKind::Database)
    }
}
