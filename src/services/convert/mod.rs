//! Bidirectional conversion between snapshots and universal packages.
//!
//! Vendor-only values travel in each universal entity's
//! `application_specific_data` map under the keys defined here. Typed
//! vendor fields the engine does not model individually are bundled into
//! [`VENDOR_EXTRA_KEY`] as a JSON object and restored verbatim.

mod requirements;
mod to_universal;
mod to_vendor;

pub use requirements::{referenced_fields, required_fields};
pub use to_universal::to_universal;
pub use to_vendor::to_vendor;

use super::IssueCollector;
use crate::models::{ApplicationData, EntityKind};
use crate::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

pub use super::id_reconciler::ORIGINAL_VENDOR_ID_KEY;

/// Key of the JSON object holding untyped vendor fields.
pub const VENDOR_EXTRA_KEY: &str = "vendorExtra";

/// Deck: options group ID.
pub const DECK_CONF_KEY: &str = "conf";
/// Deck: filtered flag (`0`/`1`).
pub const DECK_DYN_KEY: &str = "dyn";

/// Note-type: `0` standard, `1` cloze.
pub const NOTE_TYPE_KIND_KEY: &str = "kind";
/// Note-type: sort field index.
pub const NOTE_TYPE_SORTF_KEY: &str = "sortf";
/// Note-type: required-fields hint as JSON.
pub const NOTE_TYPE_REQ_KEY: &str = "req";
/// Note-type: LaTeX preamble.
pub const NOTE_TYPE_LATEX_PRE_KEY: &str = "latexPre";
/// Note-type: LaTeX postamble.
pub const NOTE_TYPE_LATEX_POST_KEY: &str = "latexPost";

/// Note: external guid.
pub const NOTE_GUID_KEY: &str = "guid";

/// Modification time (note-types, notes, cards).
pub const MOD_KEY: &str = "mod";
/// Update sequence number (notes, cards, reviews).
pub const USN_KEY: &str = "usn";
/// Flags (notes, cards).
pub const FLAGS_KEY: &str = "flags";
/// Opaque plugin payload (notes, cards).
pub const DATA_KEY: &str = "data";

/// Card scheduling fields carried verbatim, in row order.
pub const CARD_SCHEDULING_KEYS: [&str; 10] = [
    "type", "queue", "due", "ivl", "factor", "reps", "lapses", "left", "odue", "odid",
];

/// Review fields carried verbatim.
pub const REVIEW_KEYS: [&str; 5] = ["usn", "ivl", "lastIvl", "factor", "type"];

/// Serializes `entity` and returns the fields not listed in `handled` as a
/// JSON object string, or `None` if nothing remains.
fn vendor_extra<T: Serialize>(entity: &T, handled: &[&str]) -> Option<String> {
    let Ok(Value::Object(mut object)) = serde_json::to_value(entity) else {
        return None;
    };
    object.retain(|key, _| !handled.contains(&key.as_str()));
    if object.is_empty() {
        None
    } else {
        serde_json::to_string(&object).ok()
    }
}

/// Rebuilds a vendor entity from `base` plus any stored [`VENDOR_EXTRA_KEY`].
///
/// Keys in `base` win. A malformed extra object is dropped with a warning.
fn restore<T: DeserializeOwned>(
    asd: &ApplicationData,
    base: Map<String, Value>,
    kind: EntityKind,
    collector: &mut IssueCollector,
) -> Result<T> {
    let extra = match asd.get(VENDOR_EXTRA_KEY).map(|s| serde_json::from_str::<Value>(s)) {
        None => Map::new(),
        Some(Ok(Value::Object(extra))) => extra,
        Some(_) => {
            collector.warning(kind, format!("ignored malformed '{VENDOR_EXTRA_KEY}' data"));
            Map::new()
        },
    };
    let had_extra = !extra.is_empty();
    let mut merged = extra;
    merged.extend(base.clone());
    match serde_json::from_value(Value::Object(merged)) {
        Ok(entity) => Ok(entity),
        Err(e) if had_extra => {
            collector.warning(
                kind,
                format!("ignored incompatible '{VENDOR_EXTRA_KEY}' data: {e}"),
            );
            serde_json::from_value(Value::Object(base))
                .map_err(|e| Error::operation("restore_vendor_entity", e))
        },
        Err(e) => Err(Error::operation("restore_vendor_entity", e)),
    }
}

/// Parses an integer stored in application data.
fn asd_i64(asd: &ApplicationData, key: &str) -> Option<i64> {
    asd.get(key).and_then(|v| v.trim().parse().ok())
}

fn count_converted(direction: &'static str, kind: EntityKind) {
    metrics::counter!(
        "apkg_entities_converted_total",
        "direction" => direction,
        "kind" => kind.as_str()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Policy;
    use crate::models::vendor::Deck;

    #[test]
    fn test_vendor_extra_excludes_handled_keys() {
        let mut deck = Deck::new(5, "A");
        deck.extra.insert("collapsed".to_string(), Value::Bool(true));
        let extra = vendor_extra(&deck, &["id", "name", "desc", "conf", "dyn"]).unwrap();
        let object: Map<String, Value> = serde_json::from_str(&extra).unwrap();
        assert!(!object.contains_key("name"));
        assert_eq!(object["collapsed"], Value::Bool(true));
        assert_eq!(object["extendNew"], serde_json::json!(10));
    }

    #[test]
    fn test_restore_base_wins() {
        let mut collector = IssueCollector::new(Policy::BestEffort);
        let mut asd = ApplicationData::new();
        asd.insert(
            VENDOR_EXTRA_KEY.to_string(),
            r#"{"name": "stale", "usn": 7}"#.to_string(),
        );
        let mut base = Map::new();
        base.insert("id".to_string(), serde_json::json!(9));
        base.insert("name".to_string(), serde_json::json!("fresh"));
        let deck: Deck = restore(&asd, base, EntityKind::Deck, &mut collector).unwrap();
        assert_eq!(deck.name, "fresh");
        assert_eq!(deck.usn, 7);
        assert!(collector.is_empty());
    }

    #[test]
    fn test_restore_drops_malformed_extra() {
        let mut collector = IssueCollector::new(Policy::BestEffort);
        let mut asd = ApplicationData::new();
        asd.insert(VENDOR_EXTRA_KEY.to_string(), "[1, 2".to_string());
        let mut base = Map::new();
        base.insert("id".to_string(), serde_json::json!(9));
        base.insert("name".to_string(), serde_json::json!("x"));
        let deck: Deck = restore(&asd, base, EntityKind::Deck, &mut collector).unwrap();
        assert_eq!(deck.id, 9);
        assert_eq!(collector.len(), 1);
    }

    #[test]
    fn test_restore_drops_incompatible_extra() {
        let mut collector = IssueCollector::new(Policy::BestEffort);
        let mut asd = ApplicationData::new();
        asd.insert(VENDOR_EXTRA_KEY.to_string(), r#"{"usn": "seven"}"#.to_string());
        let mut base = Map::new();
        base.insert("id".to_string(), serde_json::json!(9));
        base.insert("name".to_string(), serde_json::json!("x"));
        let deck: Deck = restore(&asd, base, EntityKind::Deck, &mut collector).unwrap();
        assert_eq!(deck.usn, 0);
        assert_eq!(collector.len(), 1);
    }
}
