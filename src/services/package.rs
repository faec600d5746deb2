//! The caller-facing vendor package.
//!
//! A [`VendorPackage`] owns one in-memory [`Snapshot`], the media index, and
//! the scratch directory holding the extracted media payloads. Every public
//! entry point takes an optional [`Policy`] and returns an [`Outcome`].

use super::IssueCollector;
use super::convert;
use crate::config::BridgeConfig;
use crate::io::container;
use crate::io::media::{self, MediaIndex};
use crate::models::{EntityKind, Issue, Outcome, Policy, Snapshot};
use crate::universal::UniversalPackage;
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::TempDir;
use tracing::instrument;

/// An opened or freshly built `.apkg` package.
///
/// The scratch directory is removed by [`VendorPackage::close`], which
/// reports a failed removal as a warning. Dropping the package without
/// closing it removes the directory silently.
#[derive(Debug)]
pub struct VendorPackage {
    snapshot: Snapshot,
    media: MediaIndex,
    scratch: Option<TempDir>,
    config: BridgeConfig,
}

impl VendorPackage {
    /// Creates an empty package holding only the default deck.
    ///
    /// # Errors
    ///
    /// Never fails with an unexpected fault; a scratch directory that cannot
    /// be created is reported as a critical issue.
    pub fn open_default(policy: Option<Policy>) -> Result<Outcome<Self>> {
        Self::open_default_with(&BridgeConfig::load_default(), policy)
    }

    /// Like [`VendorPackage::open_default`] with an explicit configuration.
    ///
    /// # Errors
    ///
    /// See [`VendorPackage::open_default`].
    #[instrument(skip_all, fields(policy = ?policy))]
    pub fn open_default_with(config: &BridgeConfig, policy: Option<Policy>) -> Result<Outcome<Self>> {
        let start = Instant::now();
        let mut collector = IssueCollector::new(config.policy(policy));
        let Some(scratch) = create_scratch(config, &mut collector) else {
            return Ok(record_operation("open_default", start, collector.fail("no scratch directory")));
        };
        let package = Self {
            snapshot: Snapshot::new_default(),
            media: MediaIndex::new(),
            scratch: Some(scratch),
            config: config.clone(),
        };
        Ok(record_operation("open_default", start, collector.finish(package)))
    }

    /// Opens an `.apkg` file with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error only for unexpected faults; every diagnosed container
    /// problem is reported through the outcome.
    pub fn open(path: impl AsRef<Path>, policy: Option<Policy>) -> Result<Outcome<Self>> {
        Self::open_with(path, &BridgeConfig::load_default(), policy)
    }

    /// Opens an `.apkg` file.
    ///
    /// Container-level failures (bad ZIP, bad header, unsupported schema,
    /// unreadable media index) are critical. Rejected entities are errors and
    /// missing media payloads are warnings; both leave the rest usable.
    ///
    /// # Errors
    ///
    /// See [`VendorPackage::open`].
    #[instrument(skip_all, fields(path = %path.as_ref().display(), policy = ?policy))]
    pub fn open_with(
        path: impl AsRef<Path>,
        config: &BridgeConfig,
        policy: Option<Policy>,
    ) -> Result<Outcome<Self>> {
        let start = Instant::now();
        let path = path.as_ref();
        let mut collector = IssueCollector::new(config.policy(policy));
        let Some(scratch) = create_scratch(config, &mut collector) else {
            return Ok(record_operation("open", start, collector.fail("no scratch directory")));
        };

        match container::open(path, scratch.path(), config) {
            Ok(opened) => {
                collector.extend(opened.issues);
                let package = Self {
                    snapshot: opened.snapshot,
                    media: opened.media,
                    scratch: Some(scratch),
                    config: config.clone(),
                };
                tracing::info!(counts = ?package.snapshot.counts(), media = package.media.len(), "package opened");
                Ok(record_operation("open", start, collector.finish(package)))
            },
            Err(e) => {
                collector.extend(e.into_issues());
                collector.extend(release(scratch));
                Ok(record_operation("open", start, collector.fail("package could not be opened")))
            },
        }
    }

    /// Converts the package into a new universal package.
    ///
    /// Media payloads are copied along; a declared payload whose bytes are
    /// missing is skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if a media payload cannot be read from the scratch
    /// directory or the target package rejects a factory call.
    #[instrument(skip_all, fields(policy = ?policy))]
    pub fn to_universal<U>(&self, policy: Option<Policy>) -> Result<Outcome<U>>
    where
        U: UniversalPackage + Default,
    {
        let start = Instant::now();
        let mut collector = IssueCollector::new(self.config.policy(policy));
        let mut target = U::default();
        convert::to_universal(&self.snapshot, &mut target, &mut collector)?;

        for (entry, name) in self.media.iter() {
            let bytes = match self.scratch_path() {
                Ok(dir) => media::read_file(&self.media, dir, name)?,
                Err(_) => None,
            };
            match bytes {
                Some(bytes) => target.add_media(name, bytes)?,
                None => collector.warning(
                    EntityKind::Media,
                    format!("media file '{name}' (entry '{entry}') has no bytes and was not copied"),
                ),
            }
        }
        Ok(record_operation("to_universal", start, collector.finish(target)))
    }

    /// Builds a package from a universal package with the default configuration.
    ///
    /// # Errors
    ///
    /// See [`VendorPackage::from_universal_with`].
    pub fn from_universal<U: UniversalPackage>(
        source: &U,
        policy: Option<Policy>,
    ) -> Result<Outcome<Self>> {
        Self::from_universal_with(source, &BridgeConfig::load_default(), policy)
    }

    /// Builds a package from a universal package.
    ///
    /// The source must hold exactly one deck. Media files whose names cannot
    /// be stored are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if a media payload cannot be written to the scratch
    /// directory.
    #[instrument(skip_all, fields(decks = source.decks().len(), policy = ?policy))]
    pub fn from_universal_with<U: UniversalPackage>(
        source: &U,
        config: &BridgeConfig,
        policy: Option<Policy>,
    ) -> Result<Outcome<Self>> {
        let start = Instant::now();
        let mut collector = IssueCollector::new(config.policy(policy));
        let Some(snapshot) = convert::to_vendor(source, &mut collector)? else {
            return Ok(record_operation(
                "from_universal",
                start,
                collector.fail("universal package could not be converted"),
            ));
        };
        let Some(scratch) = create_scratch(config, &mut collector) else {
            return Ok(record_operation("from_universal", start, collector.fail("no scratch directory")));
        };

        let mut index = MediaIndex::new();
        for name in source.media_names() {
            let Some(bytes) = source.media(&name) else {
                continue;
            };
            match media::add_file(&mut index, scratch.path(), &name, bytes) {
                Ok(()) => {},
                Err(Error::InvalidInput(message)) => collector.warning(EntityKind::Media, message),
                Err(e) => return Err(e),
            }
        }

        let package = Self {
            snapshot,
            media: index,
            scratch: Some(scratch),
            config: config.clone(),
        };
        Ok(record_operation("from_universal", start, collector.finish(package)))
    }

    /// Writes the package to `dest` as an `.apkg` file.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination or the database cannot be written.
    #[instrument(skip_all, fields(dest = %dest.as_ref().display(), policy = ?policy))]
    pub fn export(&self, dest: impl AsRef<Path>, policy: Option<Policy>) -> Result<Outcome<PathBuf>> {
        let start = Instant::now();
        let dest = dest.as_ref();
        let mut collector = IssueCollector::new(self.config.policy(policy));
        let Some(work) = create_scratch(&self.config, &mut collector) else {
            return Ok(record_operation("export", start, collector.fail("no scratch directory")));
        };

        let media_dir = self.scratch.as_ref().map(TempDir::path);
        let written = container::write(
            &self.snapshot,
            &self.media,
            media_dir,
            work.path(),
            dest,
            &self.config,
        );
        collector.extend(release(work));
        collector.extend(written?);
        Ok(record_operation("export", start, collector.finish(dest.to_path_buf())))
    }

    /// The collection content.
    #[must_use]
    pub const fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Mutable access for the snapshot's add/remove operations.
    pub fn snapshot_mut(&mut self) -> &mut Snapshot {
        &mut self.snapshot
    }

    /// The media index.
    #[must_use]
    pub const fn media_index(&self) -> &MediaIndex {
        &self.media
    }

    /// Stores a media file, replacing any file of the same name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is not a plain file name, the package is
    /// closed, or the payload cannot be written.
    pub fn add_media_file(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        let dir = self.scratch_path()?.to_path_buf();
        media::add_file(&mut self.media, &dir, name, bytes)
    }

    /// Removes a media file. Returns false if no such file was registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the package is closed or the payload cannot be deleted.
    pub fn remove_media_file(&mut self, name: &str) -> Result<bool> {
        let dir = self.scratch_path()?.to_path_buf();
        media::remove_file(&mut self.media, &dir, name)
    }

    /// Display names of all registered media files, sorted.
    #[must_use]
    pub fn list_media_files(&self) -> Vec<String> {
        let mut names: Vec<String> = self.media.iter().map(|(_, name)| name.to_string()).collect();
        names.sort();
        names
    }

    /// Size of a media file's payload, if it is registered and present.
    ///
    /// # Errors
    ///
    /// Returns an error if the package is closed or the payload cannot be inspected.
    pub fn media_file_size(&self, name: &str) -> Result<Option<u64>> {
        media::file_size(&self.media, self.scratch_path()?, name)
    }

    /// Bytes of a media file, if it is registered and present.
    ///
    /// # Errors
    ///
    /// Returns an error if the package is closed or the payload cannot be read.
    pub fn read_media_file(&self, name: &str) -> Result<Option<Vec<u8>>> {
        media::read_file(&self.media, self.scratch_path()?, name)
    }

    /// Releases the scratch directory.
    ///
    /// Returns a warning issue if the directory could not be removed.
    #[must_use]
    pub fn close(mut self) -> Vec<Issue> {
        self.scratch.take().map(release).into_iter().flatten().collect()
    }

    fn scratch_path(&self) -> Result<&Path> {
        self.scratch
            .as_ref()
            .map(TempDir::path)
            .ok_or_else(|| Error::operation("access_scratch", "package is closed"))
    }
}

impl Drop for VendorPackage {
    fn drop(&mut self) {
        if let Some(scratch) = self.scratch.take() {
            if let Some(issue) = release(scratch) {
                tracing::warn!(message = %issue.message, "scratch cleanup on drop failed");
            }
        }
    }
}

/// Creates a scratch directory, recording a critical issue on failure.
fn create_scratch(config: &BridgeConfig, collector: &mut IssueCollector) -> Option<TempDir> {
    match config.scratch_dir() {
        Ok(dir) => {
            tracing::debug!(scratch = %dir.path().display(), "scratch directory created");
            Some(dir)
        },
        Err(e) => {
            collector.critical(
                EntityKind::Scratch,
                format!("cannot create scratch directory: {e}"),
            );
            None
        },
    }
}

/// Removes a scratch directory; a failure becomes a warning.
fn release(scratch: TempDir) -> Option<Issue> {
    let path = scratch.path().to_path_buf();
    match scratch.close() {
        Ok(()) => {
            tracing::debug!(scratch = %path.display(), "scratch directory removed");
            None
        },
        Err(e) => Some(
            Issue::warning(format!(
                "failed to remove scratch directory '{}': {e}",
                path.display()
            ))
            .with_entity(EntityKind::Scratch),
        ),
    }
}

fn record_operation<T>(operation: &'static str, start: Instant, outcome: Outcome<T>) -> Outcome<T> {
    let status = if outcome.is_success() {
        "success"
    } else if outcome.is_partial() {
        "partial"
    } else {
        "failure"
    };
    metrics::counter!("apkg_operations_total", "operation" => operation, "outcome" => status)
        .increment(1);
    metrics::histogram!("apkg_operation_duration_ms", "operation" => operation)
        .record(start.elapsed().as_secs_f64() * 1000.0);
    tracing::debug!(operation, status, issues = outcome.issues().len(), "operation finished");
    outcome
}
