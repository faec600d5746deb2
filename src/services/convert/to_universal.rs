//! Vendor snapshot → universal package.

use super::{
    CARD_SCHEDULING_KEYS, DATA_KEY, DECK_CONF_KEY, DECK_DYN_KEY, FLAGS_KEY, MOD_KEY,
    NOTE_GUID_KEY, NOTE_TYPE_KIND_KEY, NOTE_TYPE_LATEX_POST_KEY, NOTE_TYPE_LATEX_PRE_KEY,
    NOTE_TYPE_REQ_KEY, NOTE_TYPE_SORTF_KEY, ORIGINAL_VENDOR_ID_KEY, REVIEW_KEYS, USN_KEY,
    VENDOR_EXTRA_KEY, count_converted, vendor_extra,
};
use crate::Result;
use crate::models::universal::{
    CardFields, DeckFields, Field, NoteFields, NoteTypeFields, ReviewFields, Template,
};
use crate::models::vendor::{self, NoteType as VendorNoteType};
use crate::models::{ApplicationData, EntityKind, Rating, Snapshot, UniversalId};
use crate::services::IssueCollector;
use crate::universal::UniversalPackage;
use std::collections::HashMap;

const DIRECTION: &str = "to_universal";

/// Deck fields with a dedicated universal or application-data home.
const DECK_HANDLED: [&str; 5] = ["id", "name", "desc", "conf", "dyn"];

/// Note-type fields with a dedicated universal or application-data home.
const NOTE_TYPE_HANDLED: [&str; 11] = [
    "id", "name", "type", "mod", "sortf", "flds", "tmpls", "css", "latexPre", "latexPost", "req",
];

const FIELD_HANDLED: [&str; 2] = ["name", "ord"];

const TEMPLATE_HANDLED: [&str; 4] = ["name", "ord", "qfmt", "afmt"];

fn with_original_id(id: i64) -> ApplicationData {
    let mut asd = ApplicationData::new();
    asd.insert(ORIGINAL_VENDOR_ID_KEY.to_string(), id.to_string());
    asd
}

fn insert_extra(asd: &mut ApplicationData, extra: Option<String>) {
    if let Some(extra) = extra {
        asd.insert(VENDOR_EXTRA_KEY.to_string(), extra);
    }
}

/// Maps a vendor answer button to a rating.
#[must_use]
pub fn rating_for_ease(ease: i64) -> Option<Rating> {
    match ease {
        1 => Some(Rating::Again),
        2 => Some(Rating::Hard),
        3 => Some(Rating::Normal),
        4 => Some(Rating::Easy),
        _ => None,
    }
}

fn deck_fields(deck: &vendor::Deck) -> DeckFields {
    let mut asd = with_original_id(deck.id);
    if let Some(conf) = deck.conf {
        asd.insert(DECK_CONF_KEY.to_string(), conf.to_string());
    }
    asd.insert(DECK_DYN_KEY.to_string(), u8::from(deck.dynamic).to_string());
    insert_extra(&mut asd, vendor_extra(deck, &DECK_HANDLED));
    DeckFields {
        name: deck.name.clone(),
        description: deck.desc.clone(),
        application_specific_data: asd,
    }
}

fn note_type_fields(note_type: &VendorNoteType) -> NoteTypeFields {
    let mut flds: Vec<&vendor::FieldDef> = note_type.flds.iter().collect();
    flds.sort_by_key(|f| f.ord);
    let fields = flds
        .into_iter()
        .zip(0_u32..)
        .map(|(field, ordinal)| {
            let mut asd = ApplicationData::new();
            insert_extra(&mut asd, vendor_extra(field, &FIELD_HANDLED));
            Field {
                name: field.name.clone(),
                ordinal,
                application_specific_data: asd,
            }
        })
        .collect();

    let mut tmpls: Vec<&vendor::Template> = note_type.tmpls.iter().collect();
    tmpls.sort_by_key(|t| t.ord);
    let templates = tmpls
        .into_iter()
        .zip(0_u32..)
        .map(|(template, ordinal)| {
            let mut asd = ApplicationData::new();
            insert_extra(&mut asd, vendor_extra(template, &TEMPLATE_HANDLED));
            Template {
                name: template.name.clone(),
                ordinal,
                question_template: template.qfmt.clone(),
                answer_template: template.afmt.clone(),
                application_specific_data: asd,
            }
        })
        .collect();

    let mut asd = with_original_id(note_type.id);
    asd.insert(
        NOTE_TYPE_KIND_KEY.to_string(),
        i64::from(note_type.kind).to_string(),
    );
    asd.insert(NOTE_TYPE_SORTF_KEY.to_string(), note_type.sortf.to_string());
    if let Ok(req) = serde_json::to_string(&note_type.req) {
        asd.insert(NOTE_TYPE_REQ_KEY.to_string(), req);
    }
    asd.insert(NOTE_TYPE_LATEX_PRE_KEY.to_string(), note_type.latex_pre.clone());
    asd.insert(NOTE_TYPE_LATEX_POST_KEY.to_string(), note_type.latex_post.clone());
    asd.insert(MOD_KEY.to_string(), note_type.modified.to_string());
    insert_extra(&mut asd, vendor_extra(note_type, &NOTE_TYPE_HANDLED));

    NoteTypeFields {
        name: note_type.name.clone(),
        fields,
        templates,
        css: note_type.css.clone(),
        application_specific_data: asd,
    }
}

fn note_asd(note: &vendor::Note) -> ApplicationData {
    let mut asd = with_original_id(note.id);
    asd.insert(NOTE_GUID_KEY.to_string(), note.guid.clone());
    asd.insert(MOD_KEY.to_string(), note.modified.to_string());
    asd.insert(USN_KEY.to_string(), note.usn.to_string());
    asd.insert(FLAGS_KEY.to_string(), note.flags.to_string());
    asd.insert(DATA_KEY.to_string(), note.data.clone());
    asd
}

fn card_asd(card: &vendor::Card) -> ApplicationData {
    let mut asd = with_original_id(card.id);
    let scheduling = [
        card.card_type,
        card.queue,
        card.due,
        card.ivl,
        card.factor,
        card.reps,
        card.lapses,
        card.left,
        card.odue,
        card.odid,
    ];
    for (key, value) in CARD_SCHEDULING_KEYS.iter().zip(scheduling) {
        asd.insert((*key).to_string(), value.to_string());
    }
    asd.insert(FLAGS_KEY.to_string(), card.flags.to_string());
    asd.insert(DATA_KEY.to_string(), card.data.clone());
    asd.insert(MOD_KEY.to_string(), card.modified.to_string());
    asd.insert(USN_KEY.to_string(), card.usn.to_string());
    asd
}

fn review_asd(review: &vendor::Review) -> ApplicationData {
    let mut asd = with_original_id(review.id);
    let values = [
        review.usn,
        review.ivl,
        review.last_ivl,
        review.factor,
        review.review_type,
    ];
    for (key, value) in REVIEW_KEYS.iter().zip(values) {
        asd.insert((*key).to_string(), value.to_string());
    }
    asd
}

/// Converts a validated snapshot into `target`.
///
/// Entities with a missing parent mapping are skipped with an `error` issue;
/// their dependents are skipped in turn. A note's deck is the deck of its
/// first card in ID order. Unreferenced entities are pruned at the end.
///
/// # Errors
///
/// Returns an error only if the target package fails unexpectedly.
#[tracing::instrument(skip_all, fields(notes = snapshot.notes.len(), cards = snapshot.cards.len()))]
pub fn to_universal<U: UniversalPackage>(
    snapshot: &Snapshot,
    target: &mut U,
    collector: &mut IssueCollector,
) -> Result<()> {
    let mut deck_ids: HashMap<i64, UniversalId> = HashMap::new();
    for deck in snapshot.decks.values() {
        let created = target.create_deck(deck_fields(deck))?;
        deck_ids.insert(deck.id, created.id);
        count_converted(DIRECTION, EntityKind::Deck);
    }

    let mut note_type_ids: HashMap<i64, UniversalId> = HashMap::new();
    for note_type in snapshot.note_types.values() {
        let created = target.create_note_type(note_type_fields(note_type))?;
        note_type_ids.insert(note_type.id, created.id);
        count_converted(DIRECTION, EntityKind::NoteType);
    }

    let mut first_deck: HashMap<i64, i64> = HashMap::new();
    for card in snapshot.cards.values() {
        first_deck.entry(card.nid).or_insert(card.did);
    }

    let mut note_ids: HashMap<i64, UniversalId> = HashMap::new();
    for note in snapshot.notes.values() {
        let (Some(note_type), Some(note_type_id)) = (
            snapshot.note_types.get(&note.mid),
            note_type_ids.get(&note.mid),
        ) else {
            collector.error(
                EntityKind::Note,
                format!("note {} skipped: note-type {} is not mapped", note.id, note.mid),
            );
            continue;
        };
        let Some(deck_id) = first_deck.get(&note.id).and_then(|did| deck_ids.get(did)) else {
            collector.error(
                EntityKind::Note,
                format!("note {} skipped: no deck could be derived from its cards", note.id),
            );
            continue;
        };
        let field_values = note_type
            .field_names()
            .into_iter()
            .zip(note.split_fields())
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        let created = target.create_note(NoteFields {
            note_type_id: note_type_id.clone(),
            deck_id: deck_id.clone(),
            field_values,
            tags: note.tag_list(),
            application_specific_data: note_asd(note),
        })?;
        note_ids.insert(note.id, created.id);
        count_converted(DIRECTION, EntityKind::Note);
    }

    let mut card_ids: HashMap<i64, UniversalId> = HashMap::new();
    for card in snapshot.cards.values() {
        let Some(note_id) = note_ids.get(&card.nid) else {
            collector.error(
                EntityKind::Card,
                format!("card {} skipped: note {} is not mapped", card.id, card.nid),
            );
            continue;
        };
        let Ok(ordinal) = u32::try_from(card.ord) else {
            collector.error(
                EntityKind::Card,
                format!("card {} skipped: ordinal {} is out of range", card.id, card.ord),
            );
            continue;
        };
        let created = target.create_card(CardFields {
            note_id: note_id.clone(),
            ordinal,
            application_specific_data: card_asd(card),
        })?;
        card_ids.insert(card.id, created.id);
        count_converted(DIRECTION, EntityKind::Card);
    }

    for review in snapshot.reviews.values() {
        let Some(card_id) = card_ids.get(&review.cid) else {
            collector.error(
                EntityKind::Review,
                format!("review {} skipped: card {} is not mapped", review.id, review.cid),
            );
            continue;
        };
        if review.id <= 0 {
            collector.error(
                EntityKind::Review,
                format!("review of card {} skipped: it has no id", review.cid),
            );
            continue;
        }
        let Some(rating) = rating_for_ease(review.ease) else {
            collector.error(
                EntityKind::Review,
                format!(
                    "review {} skipped: answer code {} is not one of 1-4",
                    review.id, review.ease
                ),
            );
            continue;
        };
        target.create_review(ReviewFields {
            card_id: card_id.clone(),
            reviewed_at: review.id,
            rating,
            duration_ms: review.time,
            application_specific_data: review_asd(review),
        })?;
        count_converted(DIRECTION, EntityKind::Review);
    }

    let pruned = target.prune_unreferenced();
    tracing::info!(
        decks = target.decks().len(),
        note_types = target.note_types().len(),
        notes = target.notes().len(),
        cards = target.cards().len(),
        reviews = target.reviews().len(),
        pruned,
        "converted snapshot to universal package"
    );
    Ok(())
}
