//! Container I/O subsystem.
//!
//! Reads and writes the `.apkg` ZIP container and the pieces stored in it.
//!
//! # Architecture
//!
//! - [`container`] diagnoses, extracts, and writes the archive
//! - [`header`] encodes the protobuf `meta` entry
//! - [`media`] parses the `media` index and manages payload files
//! - [`validation`] turns raw database rows into a clean [`crate::Snapshot`]
//!
//! # Container layout
//!
//! | Entry | Content | Compression |
//! |-------|---------|-------------|
//! | `meta` | protobuf, `version` = 2 | stored |
//! | `media` | JSON `{"0": "name.jpg"}` | stored |
//! | `collection.anki21` | `SQLite` collection, schema 11 | deflated |
//! | `0`, `1`, ... | media payloads | stored |

pub mod container;
pub mod header;
pub mod media;
pub mod validation;

pub use container::{ContainerError, OpenedContainer};
pub use header::PackageMetadata;
pub use media::{MediaIndex, MediaIndexError};
