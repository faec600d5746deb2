//! The `media` index and media payload files.
//!
//! The index maps numeric-string entry names inside the container to display
//! file names. Payload bytes live in the package's scratch directory under
//! their entry name.

use crate::{Error, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error as ThisError;

/// Problems found while parsing the media index.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum MediaIndexError {
    /// The entry is not UTF-8 JSON.
    #[error("media index is not valid JSON: {0}")]
    InvalidJson(String),
    /// The top level is an array.
    #[error("media index must be a JSON object, found an array")]
    Array,
    /// The top level is neither an object nor an array.
    #[error("media index must be a JSON object, found {0}")]
    NotObject(&'static str),
    /// A value is not a file name string.
    #[error("media index entry '{key}' must map to a file name string, found {found}")]
    NonStringValue {
        /// Offending key.
        key: String,
        /// JSON type found instead.
        found: &'static str,
    },
    /// A key is not a numeric entry name.
    #[error("media index key '{0}' is not a numeric entry name")]
    NonNumericKey(String),
}

const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Entry names are plain decimal integers and never path components.
fn is_entry_name(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit())
}

/// Ordered map of container entry name to display file name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaIndex {
    entries: BTreeMap<String, String>,
}

impl MediaIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the `media` entry. Empty (or whitespace-only) input means no media.
    ///
    /// # Errors
    ///
    /// Returns a [`MediaIndexError`] describing the first violation.
    pub fn parse(bytes: &[u8]) -> std::result::Result<Self, MediaIndexError> {
        let text =
            std::str::from_utf8(bytes).map_err(|e| MediaIndexError::InvalidJson(e.to_string()))?;
        if text.trim().is_empty() {
            return Ok(Self::new());
        }
        let value: Value =
            serde_json::from_str(text).map_err(|e| MediaIndexError::InvalidJson(e.to_string()))?;
        let object = match value {
            Value::Object(object) => object,
            Value::Array(_) => return Err(MediaIndexError::Array),
            other => return Err(MediaIndexError::NotObject(json_type(&other))),
        };
        let mut entries = BTreeMap::new();
        for (key, value) in object {
            if !is_entry_name(&key) {
                return Err(MediaIndexError::NonNumericKey(key));
            }
            match value {
                Value::String(name) => {
                    entries.insert(key, name);
                },
                other => {
                    return Err(MediaIndexError::NonStringValue {
                        key,
                        found: json_type(&other),
                    });
                },
            }
        }
        Ok(Self { entries })
    }

    /// Serializes the index back to JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.entries).unwrap_or_else(|_| "{}".to_string())
    }

    /// Iterates `(entry name, file name)` pairs in entry order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of declared files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no files are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finds the entry name for a display file name.
    #[must_use]
    pub fn entry_for(&self, file_name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, v)| v.as_str() == file_name)
            .map(|(k, _)| k.as_str())
    }

    /// Registers a file name and returns its entry name.
    ///
    /// Re-registering an existing name returns the existing entry.
    pub fn insert(&mut self, file_name: &str) -> String {
        if let Some(entry) = self.entry_for(file_name) {
            return entry.to_string();
        }
        let next = self
            .entries
            .keys()
            .filter_map(|k| k.parse::<u64>().ok())
            .max()
            .map_or(0, |max| max + 1);
        let entry = next.to_string();
        self.entries.insert(entry.clone(), file_name.to_string());
        entry
    }

    /// Unregisters a file name, returning its entry name.
    pub fn remove(&mut self, file_name: &str) -> Option<String> {
        let entry = self.entry_for(file_name)?.to_string();
        self.entries.remove(&entry);
        Some(entry)
    }

    /// Declared entries whose payload file is absent from `dir`.
    #[must_use]
    pub fn missing_payloads(&self, dir: &Path) -> Vec<(&str, &str)> {
        self.iter()
            .filter(|(entry, _)| !dir.join(entry).is_file())
            .collect()
    }
}

/// Rejects names that could escape the media directory.
fn check_file_name(file_name: &str) -> Result<()> {
    if file_name.is_empty()
        || file_name.contains(['/', '\\'])
        || file_name == "."
        || file_name == ".."
    {
        return Err(Error::InvalidInput(format!(
            "invalid media file name: '{file_name}'"
        )));
    }
    Ok(())
}

/// Writes a payload into `dir` and registers it.
pub fn add_file(index: &mut MediaIndex, dir: &Path, file_name: &str, bytes: &[u8]) -> Result<()> {
    check_file_name(file_name)?;
    let entry = index.insert(file_name);
    std::fs::write(dir.join(&entry), bytes).map_err(|e| Error::operation("write_media_file", e))
}

/// Unregisters a payload and deletes it from `dir`.
///
/// Returns false if the name was not registered.
pub fn remove_file(index: &mut MediaIndex, dir: &Path, file_name: &str) -> Result<bool> {
    let Some(entry) = index.remove(file_name) else {
        return Ok(false);
    };
    match std::fs::remove_file(dir.join(entry)) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
        Err(e) => Err(Error::operation("remove_media_file", e)),
    }
}

/// Reads a payload by display file name.
pub fn read_file(index: &MediaIndex, dir: &Path, file_name: &str) -> Result<Option<Vec<u8>>> {
    let Some(entry) = index.entry_for(file_name) else {
        return Ok(None);
    };
    match std::fs::read(dir.join(entry)) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::operation("read_media_file", e)),
    }
}

/// Size in bytes of a payload, if present.
pub fn file_size(index: &MediaIndex, dir: &Path, file_name: &str) -> Result<Option<u64>> {
    let Some(entry) = index.entry_for(file_name) else {
        return Ok(None);
    };
    match std::fs::metadata(dir.join(entry)) {
        Ok(meta) => Ok(Some(meta.len())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::operation("stat_media_file", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_parse_empty_is_no_media() {
        assert!(MediaIndex::parse(b"").unwrap().is_empty());
        assert!(MediaIndex::parse(b"  \n").unwrap().is_empty());
        assert!(MediaIndex::parse(b"{}").unwrap().is_empty());
    }

    #[test]
    fn test_parse_valid_index() {
        let index = MediaIndex::parse(br#"{"0": "a.jpg", "1": "b.mp3"}"#).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.entry_for("b.mp3"), Some("1"));
    }

    #[test]
    fn test_parse_rejects_array() {
        assert_eq!(MediaIndex::parse(b"[]"), Err(MediaIndexError::Array));
    }

    #[test]
    fn test_parse_rejects_scalar() {
        assert_eq!(
            MediaIndex::parse(b"42"),
            Err(MediaIndexError::NotObject("number"))
        );
    }

    #[test]
    fn test_parse_reports_offending_key() {
        let err = MediaIndex::parse(br#"{"0": "a.jpg", "1": 5}"#).unwrap_err();
        assert_eq!(
            err,
            MediaIndexError::NonStringValue {
                key: "1".to_string(),
                found: "number"
            }
        );
        assert!(err.to_string().contains("'1'"));
    }

    #[test_case("../secret"; "parent")]
    #[test_case("/etc/passwd"; "absolute")]
    #[test_case(""; "empty")]
    #[test_case("1a"; "mixed")]
    #[test_case("-1"; "negative")]
    fn test_parse_rejects_non_numeric_keys(key: &str) {
        let json = serde_json::json!({ key: "a.jpg" }).to_string();
        assert_eq!(
            MediaIndex::parse(json.as_bytes()),
            Err(MediaIndexError::NonNumericKey(key.to_string()))
        );
    }

    #[test]
    fn test_parse_rejects_bad_json() {
        assert!(matches!(
            MediaIndex::parse(b"{not json"),
            Err(MediaIndexError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_insert_assigns_next_numeric_entry() {
        let mut index = MediaIndex::parse(br#"{"0": "a.jpg", "7": "b.jpg"}"#).unwrap();
        assert_eq!(index.insert("c.jpg"), "8");
        assert_eq!(index.insert("a.jpg"), "0");
        assert_eq!(index.remove("a.jpg"), Some("0".to_string()));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_to_json_round_trips() {
        let index = MediaIndex::parse(br#"{"0": "a.jpg"}"#).unwrap();
        assert_eq!(MediaIndex::parse(index.to_json().as_bytes()).unwrap(), index);
    }

    #[test]
    fn test_file_operations() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = MediaIndex::new();
        add_file(&mut index, dir.path(), "cat.png", b"meow").unwrap();
        assert_eq!(file_size(&index, dir.path(), "cat.png").unwrap(), Some(4));
        assert_eq!(
            read_file(&index, dir.path(), "cat.png").unwrap(),
            Some(b"meow".to_vec())
        );
        assert!(index.missing_payloads(dir.path()).is_empty());
        assert!(remove_file(&mut index, dir.path(), "cat.png").unwrap());
        assert!(!remove_file(&mut index, dir.path(), "cat.png").unwrap());
        assert!(index.is_empty());
    }

    #[test]
    fn test_rejects_path_like_names() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = MediaIndex::new();
        assert!(add_file(&mut index, dir.path(), "../escape", b"x").is_err());
        assert!(add_file(&mut index, dir.path(), "", b"x").is_err());
    }
}
