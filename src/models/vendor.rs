//! Typed vendor (Anki collection schema 11) entities.
//!
//! Rows and JSON blobs are decoded into these structs at the snapshot
//! boundary. Fields the vendor defines but this crate has no typed use for
//! are kept in `extra` so they survive a round trip.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Separator between field values inside `notes.flds`.
pub const FIELD_SEPARATOR: char = '\u{1f}';

/// The only supported collection schema version (`col.ver`).
pub const SCHEMA_VERSION: i64 = 11;

/// ID of the deck and deck options every collection carries.
pub const DEFAULT_DECK_ID: i64 = 1;

/// Accepts either a JSON bool or an integer flag (`0`/`1`).
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Bool(b) => Ok(b),
        Value::Number(n) => n
            .as_i64()
            .map(|v| v != 0)
            .ok_or_else(|| de::Error::custom("flag must be an integer")),
        Value::Null => Ok(false),
        other => Err(de::Error::custom(format!("expected flag, got {other}"))),
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn flag_as_int<S>(value: &bool, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u8(u8::from(*value))
}

/// Collection metadata (the single `col` row), with decks and note-types
/// held separately in [`crate::models::Snapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionMeta {
    /// Creation timestamp (seconds, start of the collection's day).
    pub crt: i64,
    /// Last modification (milliseconds).
    #[serde(rename = "mod")]
    pub modified: i64,
    /// Schema modification time (milliseconds).
    pub scm: i64,
    /// Schema version.
    pub ver: i64,
    /// Dirty flag (unused by modern clients).
    #[serde(default)]
    pub dty: i64,
    /// Update sequence number.
    #[serde(default)]
    pub usn: i64,
    /// Last sync time.
    #[serde(default)]
    pub ls: i64,
    /// Global configuration blob.
    #[serde(default)]
    pub conf: Value,
    /// Deck options keyed by stringified ID.
    #[serde(default)]
    pub dconf: Map<String, Value>,
    /// Tag registry blob.
    #[serde(default)]
    pub tags: Value,
}

impl CollectionMeta {
    /// Builds metadata for a freshly created collection.
    #[must_use]
    pub fn fresh() -> Self {
        let now_ms = crate::current_timestamp_millis();
        let mut dconf = Map::new();
        dconf.insert(DEFAULT_DECK_ID.to_string(), default_deck_config());
        Self {
            crt: day_start(crate::current_timestamp()),
            modified: now_ms,
            scm: now_ms,
            ver: SCHEMA_VERSION,
            dty: 0,
            usn: 0,
            ls: 0,
            conf: default_collection_config(),
            dconf,
            tags: Value::Object(Map::new()),
        }
    }
}

/// Rounds a timestamp down to 04:00 UTC of its day, the vendor's day cutoff.
fn day_start(secs: i64) -> i64 {
    chrono::DateTime::from_timestamp(secs, 0)
        .and_then(|dt| dt.date_naive().and_hms_opt(4, 0, 0))
        .map_or(secs, |naive| naive.and_utc().timestamp())
}

fn default_collection_config() -> Value {
    serde_json::json!({
        "activeDecks": [DEFAULT_DECK_ID],
        "curDeck": DEFAULT_DECK_ID,
        "newSpread": 0,
        "collapseTime": 1200,
        "timeLim": 0,
        "estTimes": true,
        "dueCounts": true,
        "curModel": null,
        "nextPos": 1,
        "sortType": "noteFld",
        "sortBackwards": false,
        "addToCur": true
    })
}

fn default_deck_config() -> Value {
    serde_json::json!({
        "id": DEFAULT_DECK_ID,
        "name": "Default",
        "mod": 0,
        "usn": 0,
        "maxTaken": 60,
        "autoplay": true,
        "timer": 0,
        "replayq": true,
        "dyn": false,
        "new": {
            "bury": false,
            "delays": [1.0, 10.0],
            "initialFactor": 2500,
            "ints": [1, 4, 0],
            "order": 1,
            "perDay": 20
        },
        "lapse": {
            "delays": [10.0],
            "leechAction": 1,
            "leechFails": 8,
            "minInt": 1,
            "mult": 0.0
        },
        "rev": {
            "bury": false,
            "ease4": 1.3,
            "ivlFct": 1.0,
            "maxIvl": 36500,
            "perDay": 200,
            "hardFactor": 1.2
        }
    })
}

/// A deck, decoded from the `col.decks` JSON map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    /// Numeric deck ID.
    pub id: i64,
    /// Full deck name (`::` separates hierarchy levels).
    pub name: String,
    /// Description shown on the overview screen.
    #[serde(default)]
    pub desc: String,
    /// Filtered (dynamic) deck flag.
    #[serde(rename = "dyn", default, deserialize_with = "flag", serialize_with = "flag_as_int")]
    pub dynamic: bool,
    /// Deck options ID (absent for filtered decks).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conf: Option<i64>,
    /// Modification time (seconds).
    #[serde(rename = "mod", default)]
    pub modified: i64,
    /// Update sequence number.
    #[serde(default)]
    pub usn: i64,
    /// Extra new cards allowed by custom study.
    #[serde(rename = "extendNew", default)]
    pub extend_new: i64,
    /// Extra reviews allowed by custom study.
    #[serde(rename = "extendRev", default)]
    pub extend_rev: i64,
    /// `[day, count]` of new cards studied today.
    #[serde(rename = "newToday", default = "zero_pair")]
    pub new_today: [i64; 2],
    /// `[day, count]` of reviews done today.
    #[serde(rename = "revToday", default = "zero_pair")]
    pub rev_today: [i64; 2],
    /// `[day, count]` of learning cards studied today.
    #[serde(rename = "lrnToday", default = "zero_pair")]
    pub lrn_today: [i64; 2],
    /// `[day, ms]` of time spent today.
    #[serde(rename = "timeToday", default = "zero_pair")]
    pub time_today: [i64; 2],
    /// Vendor fields without a typed counterpart.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

const fn zero_pair() -> [i64; 2] {
    [0, 0]
}

impl Deck {
    /// Creates a static deck with default limits.
    #[must_use]
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            desc: String::new(),
            dynamic: false,
            conf: Some(DEFAULT_DECK_ID),
            modified: crate::current_timestamp(),
            usn: 0,
            extend_new: 10,
            extend_rev: 50,
            new_today: zero_pair(),
            rev_today: zero_pair(),
            lrn_today: zero_pair(),
            time_today: zero_pair(),
            extra: Map::new(),
        }
    }

    /// The built-in "Default" deck.
    #[must_use]
    pub fn default_deck() -> Self {
        let mut deck = Self::new(DEFAULT_DECK_ID, "Default");
        deck.extra
            .insert("collapsed".to_string(), Value::Bool(false));
        deck.extra
            .insert("browserCollapsed".to_string(), Value::Bool(true));
        deck
    }
}

/// Whether a note-type generates cards per template or per cloze marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum NoteTypeKind {
    /// One card per template.
    #[default]
    Standard,
    /// One card per cloze ordinal.
    Cloze,
}

impl TryFrom<i64> for NoteTypeKind {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Standard),
            1 => Ok(Self::Cloze),
            other => Err(format!("unknown note-type kind {other}")),
        }
    }
}

impl From<NoteTypeKind> for i64 {
    fn from(kind: NoteTypeKind) -> Self {
        match kind {
            NoteTypeKind::Standard => 0,
            NoteTypeKind::Cloze => 1,
        }
    }
}

/// A field definition of a note-type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Position within the note-type.
    pub ord: u32,
    /// Keep the value when adding the next note.
    #[serde(default)]
    pub sticky: bool,
    /// Right-to-left text.
    #[serde(default)]
    pub rtl: bool,
    /// Editor font.
    #[serde(default = "default_font")]
    pub font: String,
    /// Editor font size.
    #[serde(default = "default_font_size")]
    pub size: u32,
    /// Vendor fields without a typed counterpart.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_font() -> String {
    "Arial".to_string()
}

const fn default_font_size() -> u32 {
    20
}

impl FieldDef {
    /// Creates a field with default display metadata.
    #[must_use]
    pub fn new(name: impl Into<String>, ord: u32) -> Self {
        Self {
            name: name.into(),
            ord,
            sticky: false,
            rtl: false,
            font: default_font(),
            size: default_font_size(),
            extra: Map::new(),
        }
    }
}

/// A card template of a note-type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Template name.
    pub name: String,
    /// Position within the note-type.
    pub ord: u32,
    /// Question markup.
    pub qfmt: String,
    /// Answer markup.
    pub afmt: String,
    /// Browser question override.
    #[serde(default)]
    pub bqfmt: String,
    /// Browser answer override.
    #[serde(default)]
    pub bafmt: String,
    /// Deck override for generated cards.
    #[serde(default)]
    pub did: Option<i64>,
    /// Vendor fields without a typed counterpart.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Template {
    /// Creates a template with no browser overrides.
    #[must_use]
    pub fn new(name: impl Into<String>, ord: u32, qfmt: impl Into<String>, afmt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ord,
            qfmt: qfmt.into(),
            afmt: afmt.into(),
            bqfmt: String::new(),
            bafmt: String::new(),
            did: None,
            extra: Map::new(),
        }
    }
}

/// One entry of the vendor's required-fields hint: `[template ord, "any"|"all"|"none", [field ords]]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement(pub u32, pub String, pub Vec<u32>);

/// A note-type (model), decoded from the `col.models` JSON map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteType {
    /// Numeric note-type ID.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Standard or cloze.
    #[serde(rename = "type", default)]
    pub kind: NoteTypeKind,
    /// Modification time (seconds).
    #[serde(rename = "mod", default)]
    pub modified: i64,
    /// Update sequence number.
    #[serde(default)]
    pub usn: i64,
    /// Index of the field used for sorting in the browser.
    #[serde(default)]
    pub sortf: u32,
    /// Last deck used with this note-type.
    #[serde(default)]
    pub did: Option<i64>,
    /// Ordered field definitions.
    pub flds: Vec<FieldDef>,
    /// Ordered card templates.
    pub tmpls: Vec<Template>,
    /// Shared card styling.
    #[serde(default)]
    pub css: String,
    /// LaTeX preamble.
    #[serde(rename = "latexPre", default)]
    pub latex_pre: String,
    /// LaTeX postamble.
    #[serde(rename = "latexPost", default)]
    pub latex_post: String,
    /// Required-fields hint used by the vendor's card generator.
    #[serde(default)]
    pub req: Vec<Requirement>,
    /// Vendor fields without a typed counterpart.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NoteType {
    /// Field names in ordinal order.
    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        let mut fields: Vec<&FieldDef> = self.flds.iter().collect();
        fields.sort_by_key(|f| f.ord);
        fields.into_iter().map(|f| f.name.as_str()).collect()
    }
}

/// A note row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Numeric note ID (creation time in ms).
    pub id: i64,
    /// Globally unique ID used to detect duplicates across collections.
    pub guid: String,
    /// Owning note-type ID.
    pub mid: i64,
    /// Modification time (seconds).
    #[serde(rename = "mod")]
    pub modified: i64,
    /// Update sequence number.
    #[serde(default)]
    pub usn: i64,
    /// Space-separated tags.
    #[serde(default)]
    pub tags: String,
    /// Field values joined by [`FIELD_SEPARATOR`].
    pub flds: String,
    /// Flags (unused).
    #[serde(default)]
    pub flags: i64,
    /// Opaque plugin payload.
    #[serde(default)]
    pub data: String,
}

impl Note {
    /// Splits the joined field text.
    #[must_use]
    pub fn split_fields(&self) -> Vec<&str> {
        self.flds.split(FIELD_SEPARATOR).collect()
    }

    /// Joins field values with [`FIELD_SEPARATOR`].
    #[must_use]
    pub fn join_fields<S: AsRef<str>>(values: &[S]) -> String {
        let mut joined = String::new();
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                joined.push(FIELD_SEPARATOR);
            }
            joined.push_str(value.as_ref());
        }
        joined
    }

    /// Tags as a list.
    #[must_use]
    pub fn tag_list(&self) -> Vec<String> {
        self.tags.split_whitespace().map(str::to_string).collect()
    }

    /// Formats a tag list the way the vendor stores it (`" a b "`).
    #[must_use]
    pub fn format_tags<S: AsRef<str>>(tags: &[S]) -> String {
        let joined: Vec<&str> = tags
            .iter()
            .map(AsRef::as_ref)
            .filter(|t| !t.trim().is_empty())
            .collect();
        if joined.is_empty() {
            String::new()
        } else {
            format!(" {} ", joined.join(" "))
        }
    }
}

/// A card row. Scheduling state is opaque to this crate and kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    /// Numeric card ID.
    pub id: i64,
    /// Owning note ID.
    pub nid: i64,
    /// Owning deck ID.
    pub did: i64,
    /// Template (or cloze) ordinal.
    pub ord: i64,
    /// Modification time (seconds).
    #[serde(rename = "mod", default)]
    pub modified: i64,
    /// Update sequence number.
    #[serde(default)]
    pub usn: i64,
    /// Card type (new, learning, review, relearning).
    #[serde(rename = "type", default)]
    pub card_type: i64,
    /// Queue the card sits in.
    #[serde(default)]
    pub queue: i64,
    /// Due position or day.
    #[serde(default)]
    pub due: i64,
    /// Current interval.
    #[serde(default)]
    pub ivl: i64,
    /// Ease factor in permille.
    #[serde(default)]
    pub factor: i64,
    /// Review count.
    #[serde(default)]
    pub reps: i64,
    /// Lapse count.
    #[serde(default)]
    pub lapses: i64,
    /// Remaining learning steps.
    #[serde(default)]
    pub left: i64,
    /// Original due (filtered decks).
    #[serde(default)]
    pub odue: i64,
    /// Original deck (filtered decks).
    #[serde(default)]
    pub odid: i64,
    /// User flags.
    #[serde(default)]
    pub flags: i64,
    /// Opaque plugin payload.
    #[serde(default)]
    pub data: String,
}

impl Card {
    /// Creates a new, never-studied card.
    #[must_use]
    pub fn new(id: i64, nid: i64, did: i64, ord: i64) -> Self {
        Self {
            id,
            nid,
            did,
            ord,
            modified: crate::current_timestamp(),
            usn: 0,
            card_type: 0,
            queue: 0,
            due: 0,
            ivl: 0,
            factor: 0,
            reps: 0,
            lapses: 0,
            left: 0,
            odue: 0,
            odid: 0,
            flags: 0,
            data: String::new(),
        }
    }
}

/// A review log row. The ID doubles as the review timestamp (ms).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    /// Review timestamp in milliseconds.
    pub id: i64,
    /// Reviewed card ID.
    pub cid: i64,
    /// Update sequence number.
    #[serde(default)]
    pub usn: i64,
    /// Answer button pressed (1-4).
    pub ease: i64,
    /// Interval after the review.
    #[serde(default)]
    pub ivl: i64,
    /// Interval before the review.
    #[serde(rename = "lastIvl", default)]
    pub last_ivl: i64,
    /// Ease factor after the review.
    #[serde(default)]
    pub factor: i64,
    /// Time taken in milliseconds.
    #[serde(default)]
    pub time: i64,
    /// Review kind (learn, review, relearn, filtered, manual).
    #[serde(rename = "type", default)]
    pub review_type: i64,
}

/// Tombstone kinds recorded in `graves.type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraveKind {
    /// A removed card.
    Card = 0,
    /// A removed note.
    Note = 1,
    /// A removed deck.
    Deck = 2,
}

/// A tombstone row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grave {
    /// Update sequence number.
    #[serde(default)]
    pub usn: i64,
    /// ID of the removed object.
    pub oid: i64,
    /// Kind of the removed object.
    #[serde(rename = "type")]
    pub kind: i64,
}

impl Grave {
    /// Creates a tombstone for a removed object.
    #[must_use]
    pub const fn new(oid: i64, kind: GraveKind) -> Self {
        Self {
            usn: -1,
            oid,
            kind: kind as i64,
        }
    }
}
