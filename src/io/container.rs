//! The ZIP container: opening, diagnosing, and writing packages.
//!
//! A package holds three required entries (`meta`, `media`, and the
//! collection database) plus one entry per media payload, named by its
//! numeric media ID.

use super::header::PackageMetadata;
use super::media::{MediaIndex, MediaIndexError};
use super::validation;
use crate::config::BridgeConfig;
use crate::models::{EntityKind, Issue, Snapshot};
use crate::storage::sqlite::{self, DatabaseError};
use crate::{Error, Result};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Instant;
use thiserror::Error as ThisError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Name of the protobuf header entry.
pub const META_ENTRY: &str = "meta";

/// Name of the media index entry.
pub const MEDIA_ENTRY: &str = "media";

/// Local file header signature.
const ZIP_LOCAL_HEADER: &[u8; 4] = b"PK\x03\x04";

/// End-of-central-directory signature (an archive with no entries).
const ZIP_EMPTY_ARCHIVE: &[u8; 4] = b"PK\x05\x06";

/// Reasons a container cannot be opened.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ContainerError {
    /// The file extension is not on the allow-list.
    #[error("unsupported file extension '{0}'; expected a package file")]
    UnsupportedExtension(String),
    /// The file has zero bytes.
    #[error("package file is empty")]
    Empty,
    /// The file does not start with a ZIP signature.
    #[error("package is not a valid ZIP archive")]
    NotZip,
    /// The file starts like a ZIP but its central directory is unreadable.
    #[error("package is a truncated ZIP archive ({0}); re-download or re-export it")]
    TruncatedZip(String),
    /// Required entries are absent.
    #[error("package is missing required entries: {}", .0.join(", "))]
    MissingEntries(Vec<String>),
    /// The `meta` entry is not a valid protobuf message.
    #[error("package header could not be decoded: {0}")]
    BadHeader(String),
    /// The `meta` entry names a version this crate cannot read.
    #[error("unsupported package version {0}; only the legacy v2 format is supported")]
    UnsupportedVersion(i32),
    /// The collection database is unusable.
    #[error(transparent)]
    Database(#[from] DatabaseError),
    /// The `media` entry is malformed.
    #[error(transparent)]
    MediaIndex(#[from] MediaIndexError),
    /// Entries could not be extracted to the scratch directory.
    #[error("package could not be extracted: {0}")]
    Extraction(String),
}

fn entry_description(entry: &str) -> &'static str {
    match entry {
        META_ENTRY => "the protobuf version header",
        MEDIA_ENTRY => "the media index",
        _ => "the collection database",
    }
}

impl ContainerError {
    /// Converts the error into critical issues; missing entries yield one
    /// issue each.
    #[must_use]
    pub fn into_issues(self) -> Vec<Issue> {
        match self {
            Self::MissingEntries(entries) => entries
                .into_iter()
                .map(|entry| {
                    Issue::critical(format!(
                        "package is missing the '{entry}' entry ({})",
                        entry_description(&entry)
                    ))
                    .with_entity(EntityKind::Container)
                })
                .collect(),
            Self::Database(e) => vec![e.into_issue()],
            Self::MediaIndex(e) => {
                vec![Issue::critical(e.to_string()).with_entity(EntityKind::Media)]
            },
            other => vec![Issue::critical(other.to_string()).with_entity(EntityKind::Container)],
        }
    }
}

/// A successfully opened container.
#[derive(Debug)]
pub struct OpenedContainer {
    /// Validated collection content.
    pub snapshot: Snapshot,
    /// Parsed media index.
    pub media: MediaIndex,
    /// Rejected entities (`error`) and missing media payloads (`warning`).
    pub issues: Vec<Issue>,
}

fn check_extension(path: &Path, config: &BridgeConfig) -> std::result::Result<(), ContainerError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_lowercase();
    if config.allows_extension(&extension) {
        Ok(())
    } else {
        Err(ContainerError::UnsupportedExtension(extension))
    }
}

/// Classifies the first bytes of a file that claims to be a ZIP archive.
fn check_signature(path: &Path) -> std::result::Result<(), ContainerError> {
    let mut file = File::open(path).map_err(|e| ContainerError::Extraction(e.to_string()))?;
    let len = file
        .metadata()
        .map_err(|e| ContainerError::Extraction(e.to_string()))?
        .len();
    if len == 0 {
        return Err(ContainerError::Empty);
    }
    let mut signature = [0_u8; 4];
    if file.read_exact(&mut signature).is_err() {
        return Err(ContainerError::NotZip);
    }
    if &signature == ZIP_LOCAL_HEADER || &signature == ZIP_EMPTY_ARCHIVE {
        Ok(())
    } else {
        Err(ContainerError::NotZip)
    }
}

/// Opens and extracts the archive into `scratch`.
fn extract(
    path: &Path,
    scratch: &Path,
    database_entry: &str,
) -> std::result::Result<(), ContainerError> {
    let file = File::open(path).map_err(|e| ContainerError::Extraction(e.to_string()))?;
    let mut archive =
        ZipArchive::new(file).map_err(|e| ContainerError::TruncatedZip(e.to_string()))?;

    let missing: Vec<String> = [META_ENTRY, MEDIA_ENTRY, database_entry]
        .into_iter()
        .filter(|entry| archive.index_for_name(entry).is_none())
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(ContainerError::MissingEntries(missing));
    }

    archive
        .extract(scratch)
        .map_err(|e| ContainerError::Extraction(e.to_string()))?;
    tracing::debug!(entries = archive.len(), scratch = %scratch.display(), "container extracted");
    Ok(())
}

fn read_header(scratch: &Path) -> std::result::Result<PackageMetadata, ContainerError> {
    let bytes = std::fs::read(scratch.join(META_ENTRY))
        .map_err(|e| ContainerError::Extraction(e.to_string()))?;
    let header =
        PackageMetadata::from_bytes(&bytes).map_err(|e| ContainerError::BadHeader(e.to_string()))?;
    if header.is_supported() {
        Ok(header)
    } else {
        Err(ContainerError::UnsupportedVersion(header.version))
    }
}

/// Opens a package, extracting it into `scratch`.
///
/// Container, header, database, and media-index problems are returned as a
/// [`ContainerError`]. Entity-level problems and missing media payloads do
/// not fail the open; they are returned in [`OpenedContainer::issues`].
///
/// # Errors
///
/// Returns the first container-level failure encountered.
pub fn open(
    path: &Path,
    scratch: &Path,
    config: &BridgeConfig,
) -> std::result::Result<OpenedContainer, ContainerError> {
    check_extension(path, config)?;
    check_signature(path)?;
    extract(path, scratch, &config.database_entry)?;
    read_header(scratch)?;

    let start = Instant::now();
    let raw = sqlite::open_validated(&scratch.join(&config.database_entry))
        .and_then(|conn| sqlite::read_raw_snapshot(&conn));
    sqlite::record_database_operation("read", start, raw.is_ok());
    let raw = raw?;

    let media_bytes = std::fs::read(scratch.join(MEDIA_ENTRY))
        .map_err(|e| ContainerError::Extraction(e.to_string()))?;
    let media = MediaIndex::parse(&media_bytes)?;

    let (snapshot, mut issues) = validation::filter(raw);
    for (entry, name) in media.missing_payloads(scratch) {
        issues.push(
            Issue::warning(format!(
                "media file '{name}' is declared as entry '{entry}' but its bytes are missing"
            ))
            .with_entity(EntityKind::Media),
        );
    }
    Ok(OpenedContainer {
        snapshot,
        media,
        issues,
    })
}

fn copy_into_zip(zip: &mut ZipWriter<File>, name: &str, source: &Path, options: SimpleFileOptions) -> Result<()> {
    let mut file = File::open(source).map_err(|e| Error::operation("read_container_entry", e))?;
    zip.start_file(name, options)
        .map_err(|e| Error::operation("write_container_entry", e))?;
    std::io::copy(&mut file, zip).map_err(|e| Error::operation("write_container_entry", e))?;
    Ok(())
}

/// Writes a package to `dest`.
///
/// The database is serialized into `work_dir` first. Media payloads are read
/// from `media_dir`; a declared payload that is absent there is skipped and
/// reported as a warning.
///
/// # Errors
///
/// Returns an error if the database or archive cannot be written.
pub fn write(
    snapshot: &Snapshot,
    media: &MediaIndex,
    media_dir: Option<&Path>,
    work_dir: &Path,
    dest: &Path,
    config: &BridgeConfig,
) -> Result<Vec<Issue>> {
    let db_path = work_dir.join(&config.database_entry);
    let start = Instant::now();
    let written = sqlite::write_snapshot(snapshot, &db_path);
    sqlite::record_database_operation("write", start, written.is_ok());
    written?;

    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let file = File::create(dest).map_err(|e| Error::operation("create_container", e))?;
    let mut zip = ZipWriter::new(file);

    copy_into_zip(&mut zip, &config.database_entry, &db_path, deflated)?;

    zip.start_file(META_ENTRY, stored)
        .map_err(|e| Error::operation("write_container_entry", e))?;
    zip.write_all(&PackageMetadata::legacy_v2().to_bytes())
        .map_err(|e| Error::operation("write_container_entry", e))?;

    zip.start_file(MEDIA_ENTRY, stored)
        .map_err(|e| Error::operation("write_container_entry", e))?;
    zip.write_all(media.to_json().as_bytes())
        .map_err(|e| Error::operation("write_container_entry", e))?;

    let mut warnings = Vec::new();
    for (entry, name) in media.iter() {
        let source = media_dir.map(|dir| dir.join(entry));
        match source {
            Some(source) if source.is_file() => copy_into_zip(&mut zip, entry, &source, stored)?,
            _ => warnings.push(
                Issue::warning(format!(
                    "media file '{name}' (entry '{entry}') has no bytes and was not packaged"
                ))
                .with_entity(EntityKind::Media),
            ),
        }
    }

    zip.finish()
        .map_err(|e| Error::operation("finish_container", e))?;
    tracing::info!(
        dest = %dest.display(),
        media = media.len(),
        skipped_media = warnings.len(),
        "container written"
    );
    Ok(warnings)
}
