//! Storage layer.
//!
//! The collection database embedded in every package is `SQLite`; the
//! [`sqlite`] module reads it into a [`crate::models::RawSnapshot`] and
//! serializes a [`crate::Snapshot`] back out.

pub mod sqlite;

pub use sqlite::DatabaseError;
