//! Vendor-neutral entities.
//!
//! Every entity carries an opaque [`UniversalId`] and an
//! `application_specific_data` string map. The conversion engine stores
//! vendor-only values there so a vendor → universal → vendor trip is lossless.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Per-entity bag of vendor-specific values.
pub type ApplicationData = BTreeMap<String, String>;

/// Opaque identifier of a universal entity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UniversalId(String);

impl UniversalId {
    /// Creates an ID from any string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh time-ordered ID (UUIDv7).
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UniversalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UniversalId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UniversalId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Outcome of a single review.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    /// Forgotten.
    Again,
    /// Recalled with difficulty.
    Hard,
    /// Recalled.
    Normal,
    /// Recalled effortlessly.
    Easy,
    /// Any rating the vendor cannot express.
    #[serde(untagged)]
    Other(String),
}

impl Rating {
    /// Parses a rating name; unknown names become [`Rating::Other`].
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "again" => Self::Again,
            "hard" => Self::Hard,
            "normal" | "good" => Self::Normal,
            "easy" => Self::Easy,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the rating as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Again => "again",
            Self::Hard => "hard",
            Self::Normal => "normal",
            Self::Easy => "easy",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A deck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    /// Opaque ID.
    pub id: UniversalId,
    /// Deck name.
    pub name: String,
    /// Deck description.
    pub description: String,
    /// Vendor-specific values.
    pub application_specific_data: ApplicationData,
}

/// Fields for creating a [`Deck`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeckFields {
    /// Deck name.
    pub name: String,
    /// Deck description.
    pub description: String,
    /// Vendor-specific values.
    pub application_specific_data: ApplicationData,
}

/// A field definition of a note-type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Field name.
    pub name: String,
    /// Position, numbered from 0.
    pub ordinal: u32,
    /// Vendor-specific values.
    pub application_specific_data: ApplicationData,
}

/// A card template of a note-type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    /// Template name.
    pub name: String,
    /// Position, numbered from 0.
    pub ordinal: u32,
    /// Question markup.
    pub question_template: String,
    /// Answer markup.
    pub answer_template: String,
    /// Vendor-specific values.
    pub application_specific_data: ApplicationData,
}

/// A note-type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteType {
    /// Opaque ID.
    pub id: UniversalId,
    /// Display name.
    pub name: String,
    /// Ordered fields.
    pub fields: Vec<Field>,
    /// Ordered templates.
    pub templates: Vec<Template>,
    /// Shared styling.
    pub css: String,
    /// Vendor-specific values.
    pub application_specific_data: ApplicationData,
}

/// Fields for creating a [`NoteType`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteTypeFields {
    /// Display name.
    pub name: String,
    /// Ordered fields.
    pub fields: Vec<Field>,
    /// Ordered templates.
    pub templates: Vec<Template>,
    /// Shared styling.
    pub css: String,
    /// Vendor-specific values.
    pub application_specific_data: ApplicationData,
}

/// A note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Opaque ID.
    pub id: UniversalId,
    /// Owning note-type.
    pub note_type_id: UniversalId,
    /// Owning deck.
    pub deck_id: UniversalId,
    /// `(field name, value)` pairs in note-type field order.
    pub field_values: Vec<(String, String)>,
    /// Tags.
    pub tags: Vec<String>,
    /// Vendor-specific values.
    pub application_specific_data: ApplicationData,
}

impl Note {
    /// Looks up a field value by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.field_values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Fields for creating a [`Note`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteFields {
    /// Owning note-type.
    pub note_type_id: UniversalId,
    /// Owning deck.
    pub deck_id: UniversalId,
    /// `(field name, value)` pairs in note-type field order.
    pub field_values: Vec<(String, String)>,
    /// Tags.
    pub tags: Vec<String>,
    /// Vendor-specific values.
    pub application_specific_data: ApplicationData,
}

/// A card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// Opaque ID.
    pub id: UniversalId,
    /// Owning note.
    pub note_id: UniversalId,
    /// Template (or cloze) ordinal.
    pub ordinal: u32,
    /// Vendor-specific values.
    pub application_specific_data: ApplicationData,
}

/// Fields for creating a [`Card`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardFields {
    /// Owning note.
    pub note_id: UniversalId,
    /// Template (or cloze) ordinal.
    pub ordinal: u32,
    /// Vendor-specific values.
    pub application_specific_data: ApplicationData,
}

/// A review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// Opaque ID.
    pub id: UniversalId,
    /// Reviewed card.
    pub card_id: UniversalId,
    /// When the review happened (Unix ms).
    pub reviewed_at: i64,
    /// Outcome.
    pub rating: Rating,
    /// Time taken (ms).
    pub duration_ms: i64,
    /// Vendor-specific values.
    pub application_specific_data: ApplicationData,
}

/// Fields for creating a [`Review`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewFields {
    /// Reviewed card.
    pub card_id: UniversalId,
    /// When the review happened (Unix ms).
    pub reviewed_at: i64,
    /// Outcome.
    pub rating: Rating,
    /// Time taken (ms).
    pub duration_ms: i64,
    /// Vendor-specific values.
    pub application_specific_data: ApplicationData,
}
