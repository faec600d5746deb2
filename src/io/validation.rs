//! Entity validation and referential filtering.
//!
//! Turns a [`RawSnapshot`] into a typed [`Snapshot`], dropping every entity
//! that fails a shape or reference check. Each dropped entity yields exactly
//! one `error` issue carrying its kind, its ID (or `unknown`), the reason,
//! and the raw record.
//!
//! Order matters: decks and note-types first, then notes (need note-types),
//! cards (need notes and decks), reviews (need cards).

use crate::models::vendor::{Card, CollectionMeta, Deck, Grave, Note, NoteType, Review};
use crate::models::{EntityKind, Issue, RawSnapshot, Snapshot};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Accumulates rejections for one validation pass.
#[derive(Debug, Default)]
struct Rejections {
    issues: Vec<Issue>,
}

impl Rejections {
    fn reject(&mut self, kind: EntityKind, record: &Value, reason: impl std::fmt::Display) {
        let id = record_id(record).map_or_else(|| "unknown".to_string(), |id| id.to_string());
        tracing::debug!(kind = kind.as_str(), id = %id, reason = %reason, "entity rejected");
        metrics::counter!("apkg_entities_rejected_total", "kind" => kind.as_str()).increment(1);
        self.issues.push(
            Issue::error(format!("{} {id} rejected: {reason}", kind.as_str()))
                .with_entity(kind)
                .with_record(record.clone()),
        );
    }
}

fn record_id(record: &Value) -> Option<i64> {
    record.get("id").and_then(Value::as_i64)
}

/// Decodes a record, requiring an integer `id` first so the reason is precise.
fn decode<T: DeserializeOwned>(record: &Value) -> Result<T, String> {
    if record_id(record).is_none() {
        return Err("missing or non-integer id".to_string());
    }
    serde_json::from_value(record.clone()).map_err(|e| format!("malformed record: {e}"))
}

/// Checks that a map key equals the entity's own `id` field.
fn check_key(key: &str, record: &Value) -> Result<(), String> {
    let id = record_id(record).ok_or_else(|| "missing or non-integer id".to_string())?;
    match key.trim().parse::<i64>() {
        Ok(parsed) if parsed == id => Ok(()),
        _ => Err(format!("map key '{key}' does not match id {id}")),
    }
}

fn insert_unique<T>(map: &mut BTreeMap<i64, T>, id: i64, entity: T) -> Result<(), String> {
    if map.contains_key(&id) {
        return Err(format!("duplicate id {id}"));
    }
    map.insert(id, entity);
    Ok(())
}

fn collection_meta(collection: Map<String, Value>, rejections: &mut Vec<Issue>) -> CollectionMeta {
    match serde_json::from_value::<CollectionMeta>(Value::Object(collection)) {
        Ok(meta) => meta,
        Err(e) => {
            rejections.push(
                Issue::critical(format!("collection row is malformed: {e}"))
                    .with_entity(EntityKind::Collection),
            );
            CollectionMeta::fresh()
        },
    }
}

fn validate_decks(raw: Map<String, Value>, out: &mut Rejections) -> BTreeMap<i64, Deck> {
    let mut decks = BTreeMap::new();
    for (key, record) in raw {
        let result = check_key(&key, &record)
            .and_then(|()| decode::<Deck>(&record))
            .and_then(|deck| insert_unique(&mut decks, deck.id, deck));
        if let Err(reason) = result {
            out.reject(EntityKind::Deck, &record, reason);
        }
    }
    decks
}

fn validate_note_types(raw: Map<String, Value>, out: &mut Rejections) -> BTreeMap<i64, NoteType> {
    let mut note_types = BTreeMap::new();
    for (key, record) in raw {
        let result = check_key(&key, &record)
            .and_then(|()| decode::<NoteType>(&record))
            .and_then(|nt| {
                if nt.flds.is_empty() {
                    Err("note-type defines no fields".to_string())
                } else if nt.tmpls.is_empty() {
                    Err("note-type defines no templates".to_string())
                } else {
                    insert_unique(&mut note_types, nt.id, nt)
                }
            });
        if let Err(reason) = result {
            out.reject(EntityKind::NoteType, &record, reason);
        }
    }
    note_types
}

fn validate_notes(
    raw: Vec<Value>,
    note_types: &BTreeMap<i64, NoteType>,
    out: &mut Rejections,
) -> BTreeMap<i64, Note> {
    let mut notes = BTreeMap::new();
    for record in raw {
        let result = decode::<Note>(&record).and_then(|note| {
            let Some(note_type) = note_types.get(&note.mid) else {
                return Err(format!("note-type {} does not exist", note.mid));
            };
            let found = note.split_fields().len();
            if found != note_type.flds.len() {
                return Err(format!(
                    "has {found} fields but note-type {} defines {}",
                    note.mid,
                    note_type.flds.len()
                ));
            }
            insert_unique(&mut notes, note.id, note)
        });
        if let Err(reason) = result {
            out.reject(EntityKind::Note, &record, reason);
        }
    }
    notes
}

fn validate_cards(
    raw: Vec<Value>,
    notes: &BTreeMap<i64, Note>,
    decks: &BTreeMap<i64, Deck>,
    out: &mut Rejections,
) -> BTreeMap<i64, Card> {
    let mut cards = BTreeMap::new();
    for record in raw {
        let result = decode::<Card>(&record).and_then(|card| {
            if card.ord < 0 {
                Err(format!("negative ordinal {}", card.ord))
            } else if !notes.contains_key(&card.nid) {
                Err(format!("note {} does not exist", card.nid))
            } else if !decks.contains_key(&card.did) {
                Err(format!("deck {} does not exist", card.did))
            } else {
                insert_unique(&mut cards, card.id, card)
            }
        });
        if let Err(reason) = result {
            out.reject(EntityKind::Card, &record, reason);
        }
    }
    cards
}

fn validate_reviews(
    raw: Vec<Value>,
    cards: &BTreeMap<i64, Card>,
    out: &mut Rejections,
) -> BTreeMap<i64, Review> {
    let mut reviews = BTreeMap::new();
    for record in raw {
        let result = decode::<Review>(&record).and_then(|review| {
            if cards.contains_key(&review.cid) {
                insert_unique(&mut reviews, review.id, review)
            } else {
                Err(format!("card {} does not exist", review.cid))
            }
        });
        if let Err(reason) = result {
            out.reject(EntityKind::Review, &record, reason);
        }
    }
    reviews
}

fn validate_graves(raw: Vec<Value>, out: &mut Rejections) -> Vec<Grave> {
    raw.into_iter()
        .filter_map(|record| match serde_json::from_value::<Grave>(record.clone()) {
            Ok(grave) if (0..=2).contains(&grave.kind) => Some(grave),
            Ok(grave) => {
                out.reject(EntityKind::Grave, &record, format!("unknown kind {}", grave.kind));
                None
            },
            Err(e) => {
                out.reject(EntityKind::Grave, &record, format!("malformed record: {e}"));
                None
            },
        })
        .collect()
}

/// Validates a raw snapshot, keeping only entities that pass every check.
///
/// Never fails: the result is a (possibly empty) snapshot plus zero or more
/// issues. Rejected entities produce `error` issues; a malformed collection
/// row produces a `critical` one.
#[must_use]
pub fn filter(raw: RawSnapshot) -> (Snapshot, Vec<Issue>) {
    let mut out = Rejections::default();
    let meta = collection_meta(raw.collection, &mut out.issues);

    let decks = validate_decks(raw.decks, &mut out);
    let note_types = validate_note_types(raw.note_types, &mut out);
    let notes = validate_notes(raw.notes, &note_types, &mut out);
    let cards = validate_cards(raw.cards, &notes, &decks, &mut out);
    let reviews = validate_reviews(raw.reviews, &cards, &mut out);
    let graves = validate_graves(raw.graves, &mut out);

    let snapshot = Snapshot {
        meta,
        decks,
        note_types,
        notes,
        cards,
        reviews,
        graves,
    };
    let counts = snapshot.counts();
    tracing::info!(
        decks = counts.decks,
        note_types = counts.note_types,
        notes = counts.notes,
        cards = counts.cards,
        reviews = counts.reviews,
        rejected = out.issues.len(),
        "snapshot validated"
    );
    (snapshot, out.issues)
}
