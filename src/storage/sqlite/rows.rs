//! Row conversion between the collection database and snapshots.
//!
//! Reading produces a [`RawSnapshot`] of column-name JSON objects so the
//! entity validator can check shapes itself. Writing serializes a validated
//! [`Snapshot`] into a fresh database file.

use super::DatabaseError;
use super::connection::configure_for_export;
use super::schema::{
    CARD_COLUMNS, COLLECTION_COLUMNS, COLLECTION_JSON_COLUMNS, COLLECTION_SCHEMA, GRAVE_COLUMNS,
    NOTE_COLUMNS, REVIEW_COLUMNS,
};
use crate::models::vendor::{NoteType, SCHEMA_VERSION};
use crate::models::{FIELD_SEPARATOR, RawSnapshot, Snapshot};
use crate::{Error, Result};
use regex::Regex;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, params};
use serde_json::{Map, Number, Value};
use sha1::{Digest, Sha1};
use std::path::Path;
use std::sync::LazyLock;

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap_or_else(|_| unreachable!()));

/// Converts one `SQLite` cell into JSON.
fn cell_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Number(i.into()),
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(hex::encode(b)),
    }
}

/// Reads every row of a table as column-name objects, in rowid order.
fn read_rows(conn: &Connection, table: &str, columns: &str) -> Result<Vec<Value>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {columns} FROM {table} ORDER BY rowid"))
        .map_err(|e| Error::operation("prepare_read_rows", format!("{table}: {e}")))?;
    let names: Vec<String> = stmt.column_names().iter().map(|n| (*n).to_string()).collect();
    let rows = stmt
        .query_map([], |row| {
            let mut object = Map::with_capacity(names.len());
            for (i, name) in names.iter().enumerate() {
                object.insert(name.clone(), cell_to_json(row.get_ref(i)?));
            }
            Ok(Value::Object(object))
        })
        .and_then(|rows| rows.collect::<rusqlite::Result<Vec<Value>>>())
        .map_err(|e| Error::operation("read_rows", format!("{table}: {e}")))?;
    Ok(rows)
}

/// Reads the single `col` row, parsing its JSON columns.
fn read_collection_row(conn: &Connection) -> std::result::Result<Map<String, Value>, DatabaseError> {
    let rows = read_rows(conn, "col", COLLECTION_COLUMNS)
        .map_err(|e| DatabaseError::MalformedCollection(e.to_string()))?;
    let mut row = match rows.into_iter().next() {
        Some(Value::Object(row)) => row,
        _ => {
            return Err(DatabaseError::MalformedCollection(
                "the collection table has no rows".to_string(),
            ));
        },
    };
    for column in COLLECTION_JSON_COLUMNS {
        let parsed = match row.get(column) {
            Some(Value::String(text)) if text.trim().is_empty() => Value::Object(Map::new()),
            Some(Value::String(text)) => serde_json::from_str(text).map_err(|e| {
                DatabaseError::MalformedCollection(format!("column '{column}' is not valid JSON: {e}"))
            })?,
            Some(other) => other.clone(),
            None => Value::Null,
        };
        row.insert(column.to_string(), parsed);
    }
    Ok(row)
}

fn take_object(
    row: &mut Map<String, Value>,
    column: &str,
) -> std::result::Result<Map<String, Value>, DatabaseError> {
    match row.remove(column) {
        Some(Value::Object(object)) => Ok(object),
        Some(Value::Null) | None => Ok(Map::new()),
        Some(_) => Err(DatabaseError::MalformedCollection(format!(
            "column '{column}' must hold a JSON object"
        ))),
    }
}

/// Reads a whole database into a [`RawSnapshot`].
///
/// The collection schema version is checked here; anything but the
/// supported version is rejected before row data is read.
pub fn read_raw_snapshot(conn: &Connection) -> std::result::Result<RawSnapshot, DatabaseError> {
    let mut collection = read_collection_row(conn)?;
    let version = collection.get("ver").and_then(Value::as_i64);
    if version != Some(SCHEMA_VERSION) {
        return Err(DatabaseError::UnsupportedSchema(version));
    }
    let decks = take_object(&mut collection, "decks")?;
    let note_types = take_object(&mut collection, "models")?;

    let read = |table: &str, columns: &str| {
        read_rows(conn, table, columns).map_err(|e| DatabaseError::Unreadable(e.to_string()))
    };
    let raw = RawSnapshot {
        collection,
        decks,
        note_types,
        notes: read("notes", NOTE_COLUMNS)?,
        cards: read("cards", CARD_COLUMNS)?,
        reviews: read("revlog", REVIEW_COLUMNS)?,
        graves: read("graves", GRAVE_COLUMNS)?,
    };
    tracing::debug!(
        decks = raw.decks.len(),
        note_types = raw.note_types.len(),
        notes = raw.notes.len(),
        cards = raw.cards.len(),
        reviews = raw.reviews.len(),
        "read raw snapshot"
    );
    Ok(raw)
}

/// Strips HTML tags and the most common entity the editor inserts.
#[must_use]
pub fn strip_html(text: &str) -> String {
    HTML_TAG
        .replace_all(text, "")
        .replace("&nbsp;", " ")
        .trim()
        .to_string()
}

/// Duplicate-detection checksum of a note's first field.
///
/// The first 4 bytes (8 hex digits) of the SHA-1 of the stripped field.
#[must_use]
pub fn field_checksum(first_field: &str) -> i64 {
    let digest = Sha1::digest(strip_html(first_field).as_bytes());
    i64::from(u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]))
}

/// Value of the sort field column for a note.
fn sort_field(flds: &str, note_type: Option<&NoteType>) -> String {
    let index = note_type.map_or(0, |nt| nt.sortf as usize);
    let value = flds.split(FIELD_SEPARATOR).nth(index).unwrap_or_default();
    strip_html(value)
}

fn to_json_text<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::operation("encode_collection_json", e))
}

/// Writes a snapshot to a new database file at `path`, replacing any file there.
pub fn write_snapshot(snapshot: &Snapshot, path: &Path) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path).map_err(|e| Error::operation("replace_database", e))?;
    }
    let mut conn = Connection::open(path).map_err(|e| Error::operation("create_database", e))?;
    configure_for_export(&conn).map_err(|e| Error::operation("configure_database", e))?;
    conn.execute_batch(COLLECTION_SCHEMA)
        .map_err(|e| Error::operation("create_schema", e))?;

    let tx = conn
        .transaction()
        .map_err(|e| Error::operation("begin_export", e))?;
    let db = |e: rusqlite::Error| Error::operation("write_snapshot", e);

    let models: Map<String, Value> = snapshot
        .note_types
        .iter()
        .map(|(id, nt)| serde_json::to_value(nt).map(|v| (id.to_string(), v)))
        .collect::<serde_json::Result<_>>()
        .map_err(|e| Error::operation("encode_note_types", e))?;
    let decks: Map<String, Value> = snapshot
        .decks
        .iter()
        .map(|(id, deck)| serde_json::to_value(deck).map(|v| (id.to_string(), v)))
        .collect::<serde_json::Result<_>>()
        .map_err(|e| Error::operation("encode_decks", e))?;
    let meta = &snapshot.meta;
    tx.execute(
        "INSERT INTO col (id, crt, mod, scm, ver, dty, usn, ls, conf, models, decks, dconf, tags)
         VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            meta.crt,
            meta.modified,
            meta.scm,
            meta.ver,
            meta.dty,
            meta.usn,
            meta.ls,
            to_json_text(&meta.conf)?,
            to_json_text(&models)?,
            to_json_text(&decks)?,
            to_json_text(&meta.dconf)?,
            to_json_text(&meta.tags)?,
        ],
    )
    .map_err(db)?;

    {
        let mut stmt = tx
            .prepare(&format!(
                "INSERT INTO notes ({NOTE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
            ))
            .map_err(db)?;
        for note in snapshot.notes.values() {
            let first = note.flds.split(FIELD_SEPARATOR).next().unwrap_or_default();
            stmt.execute(params![
                note.id,
                note.guid,
                note.mid,
                note.modified,
                note.usn,
                note.tags,
                note.flds,
                sort_field(&note.flds, snapshot.note_types.get(&note.mid)),
                field_checksum(first),
                note.flags,
                note.data,
            ])
            .map_err(db)?;
        }
    }

    {
        let mut stmt = tx
            .prepare(&format!(
                "INSERT INTO cards ({CARD_COLUMNS}) VALUES
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)"
            ))
            .map_err(db)?;
        for c in snapshot.cards.values() {
            stmt.execute(params![
                c.id, c.nid, c.did, c.ord, c.modified, c.usn, c.card_type, c.queue, c.due, c.ivl,
                c.factor, c.reps, c.lapses, c.left, c.odue, c.odid, c.flags, c.data,
            ])
            .map_err(db)?;
        }
    }

    {
        let mut stmt = tx
            .prepare(&format!(
                "INSERT INTO revlog ({REVIEW_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
            ))
            .map_err(db)?;
        for r in snapshot.reviews.values() {
            stmt.execute(params![
                r.id,
                r.cid,
                r.usn,
                r.ease,
                r.ivl,
                r.last_ivl,
                r.factor,
                r.time,
                r.review_type,
            ])
            .map_err(db)?;
        }
    }

    {
        let mut stmt = tx
            .prepare(&format!("INSERT INTO graves ({GRAVE_COLUMNS}) VALUES (?1, ?2, ?3)"))
            .map_err(db)?;
        for g in &snapshot.graves {
            stmt.execute(params![g.usn, g.oid, g.kind]).map_err(db)?;
        }
    }

    tx.commit().map_err(|e| Error::operation("commit_export", e))?;
    tracing::debug!(path = %path.display(), "wrote collection database");
    Ok(())
}
