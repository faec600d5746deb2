//! Issue and outcome types shared by every pipeline stage.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity tier of an [`Issue`], ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational; output is still complete and correct.
    Warning,
    /// One entity (and its dependents) was skipped.
    Error,
    /// The operation cannot produce usable output.
    Critical,
}

impl Severity {
    /// Returns the severity as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of entity an issue refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// The ZIP container itself.
    Container,
    /// The embedded collection database.
    Database,
    /// The collection metadata row.
    Collection,
    /// A deck.
    Deck,
    /// Deck options.
    DeckConfig,
    /// A note-type (model).
    NoteType,
    /// A note.
    Note,
    /// A card.
    Card,
    /// A review log entry.
    Review,
    /// A tombstone row.
    Grave,
    /// A media file or the media index.
    Media,
    /// The scratch directory backing a package.
    Scratch,
    /// A universal package as a whole.
    Package,
}

impl EntityKind {
    /// Returns the kind as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Container => "container",
            Self::Database => "database",
            Self::Collection => "collection",
            Self::Deck => "deck",
            Self::DeckConfig => "deck_config",
            Self::NoteType => "note_type",
            Self::Note => "note",
            Self::Card => "card",
            Self::Review => "review",
            Self::Grave => "grave",
            Self::Media => "media",
            Self::Scratch => "scratch",
            Self::Package => "package",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured context attached to an issue.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IssueContext {
    /// Kind of entity affected.
    pub entity: Option<EntityKind>,
    /// The offending raw record, when one exists.
    pub record: Option<serde_json::Value>,
}

/// A single problem found while validating or converting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Severity tier.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    /// Optional structured context.
    pub context: Option<IssueContext>,
}

impl Issue {
    /// Creates an issue without context.
    #[must_use]
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            context: None,
        }
    }

    /// Creates a warning issue.
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    /// Creates an error issue.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    /// Creates a critical issue.
    #[must_use]
    pub fn critical(message: impl Into<String>) -> Self {
        Self::new(Severity::Critical, message)
    }

    /// Attaches the affected entity kind.
    #[must_use]
    pub fn with_entity(mut self, entity: EntityKind) -> Self {
        self.context.get_or_insert_with(IssueContext::default).entity = Some(entity);
        self
    }

    /// Attaches the offending raw record.
    #[must_use]
    pub fn with_record(mut self, record: serde_json::Value) -> Self {
        self.context.get_or_insert_with(IssueContext::default).record = Some(record);
        self
    }

    /// Returns the affected entity kind, if recorded.
    #[must_use]
    pub fn entity(&self) -> Option<EntityKind> {
        self.context.as_ref().and_then(|c| c.entity)
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.entity() {
            Some(entity) => write!(f, "[{}] {}: {}", self.severity, entity, self.message),
            None => write!(f, "[{}] {}", self.severity, self.message),
        }
    }
}

/// Caller-selected issue handling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Policy {
    /// Any error-or-worse fails the whole operation.
    Strict,
    /// Skip what is broken, return everything else and report it.
    #[default]
    BestEffort,
}

impl Policy {
    /// Parses a policy name, accepting `strict`, `best-effort` and `best_effort`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "strict" => Some(Self::Strict),
            "best-effort" | "best_effort" | "besteffort" => Some(Self::BestEffort),
            _ => None,
        }
    }
}

/// Three-valued result of every public operation.
#[derive(Debug)]
pub enum Outcome<T> {
    /// Data and no issues.
    Success(T),
    /// Data plus a non-empty issue list.
    Partial(T, Vec<Issue>),
    /// No data, non-empty issue list.
    Failure(Vec<Issue>),
}

impl<T> Outcome<T> {
    /// Returns true for [`Outcome::Success`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns true for [`Outcome::Partial`].
    #[must_use]
    pub const fn is_partial(&self) -> bool {
        matches!(self, Self::Partial(..))
    }

    /// Returns true for [`Outcome::Failure`].
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// Borrows the data, if any.
    #[must_use]
    pub const fn data(&self) -> Option<&T> {
        match self {
            Self::Success(data) | Self::Partial(data, _) => Some(data),
            Self::Failure(_) => None,
        }
    }

    /// Consumes the outcome and returns the data, if any.
    #[must_use]
    pub fn into_data(self) -> Option<T> {
        match self {
            Self::Success(data) | Self::Partial(data, _) => Some(data),
            Self::Failure(_) => None,
        }
    }

    /// Returns the recorded issues (empty on success).
    #[must_use]
    pub fn issues(&self) -> &[Issue] {
        match self {
            Self::Success(_) => &[],
            Self::Partial(_, issues) | Self::Failure(issues) => issues,
        }
    }

    /// Splits the outcome into its data and issues.
    #[must_use]
    pub fn into_parts(self) -> (Option<T>, Vec<Issue>) {
        match self {
            Self::Success(data) => (Some(data), Vec::new()),
            Self::Partial(data, issues) => (Some(data), issues),
            Self::Failure(issues) => (None, issues),
        }
    }

    /// Maps the carried data, keeping the issues.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Success(data) => Outcome::Success(f(data)),
            Self::Partial(data, issues) => Outcome::Partial(f(data), issues),
            Self::Failure(issues) => Outcome::Failure(issues),
        }
    }
}
