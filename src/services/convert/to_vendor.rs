//! Universal package → vendor snapshot.

use super::{
    CARD_SCHEDULING_KEYS, DATA_KEY, DECK_CONF_KEY, DECK_DYN_KEY, FLAGS_KEY, MOD_KEY,
    NOTE_GUID_KEY, NOTE_TYPE_LATEX_POST_KEY, NOTE_TYPE_LATEX_PRE_KEY, NOTE_TYPE_REQ_KEY,
    NOTE_TYPE_SORTF_KEY, ORIGINAL_VENDOR_ID_KEY, REVIEW_KEYS, USN_KEY, VENDOR_EXTRA_KEY,
    asd_i64, count_converted, required_fields, restore,
};
use crate::Result;
use crate::models::universal::{Card, Deck, Note, NoteType};
use crate::models::vendor::{self, DEFAULT_DECK_ID, NoteTypeKind, Requirement};
use crate::models::{ApplicationData, EntityKind, Rating, Snapshot, UniversalId};
use crate::services::IssueCollector;
use crate::services::cloze;
use crate::services::id_reconciler::{IdReconciler, IdSpace, derive_vendor_id};
use crate::universal::UniversalPackage;
use serde_json::{Map, Value, json};
use std::collections::HashMap;

const DIRECTION: &str = "to_vendor";

/// LaTeX preamble used when none was carried over.
const DEFAULT_LATEX_PRE: &str = "\\documentclass[12pt]{article}\n\\special{papersize=3in,5in}\n\\usepackage[utf8]{inputenc}\n\\usepackage{amssymb,amsmath}\n\\pagestyle{empty}\n\\setlength{\\parindent}{0in}\n\\begin{document}\n";

/// LaTeX postamble used when none was carried over.
const DEFAULT_LATEX_POST: &str = "\\end{document}";

/// Usn of rows not yet synced.
const UNSYNCED: i64 = -1;

fn hint(asd: &ApplicationData) -> Option<&str> {
    asd.get(ORIGINAL_VENDOR_ID_KEY).map(String::as_str)
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Maps a rating to the vendor answer button; `Other` has no mapping.
#[must_use]
pub const fn ease_for_rating(rating: &Rating) -> Option<i64> {
    match rating {
        Rating::Again => Some(1),
        Rating::Hard => Some(2),
        Rating::Normal => Some(3),
        Rating::Easy => Some(4),
        Rating::Other(_) => None,
    }
}

/// Per-run conversion state.
struct VendorBuilder<'a> {
    snapshot: Snapshot,
    reconciler: IdReconciler,
    collector: &'a mut IssueCollector,
    now: i64,
    deck_id: i64,
    note_types: HashMap<UniversalId, i64>,
    notes: HashMap<UniversalId, (i64, i64)>,
    cards: HashMap<UniversalId, i64>,
}

impl<'a> VendorBuilder<'a> {
    fn new(collector: &'a mut IssueCollector) -> Self {
        Self {
            snapshot: Snapshot::new_default(),
            reconciler: IdReconciler::new(),
            collector,
            now: crate::current_timestamp(),
            deck_id: DEFAULT_DECK_ID,
            note_types: HashMap::new(),
            notes: HashMap::new(),
            cards: HashMap::new(),
        }
    }

    fn add_deck(&mut self, deck: &Deck) -> Result<()> {
        let asd = &deck.application_specific_data;
        let id = self
            .reconciler
            .resolve(IdSpace::Deck, hint(asd), derive_vendor_id(&deck.id));
        let dynamic = asd.get(DECK_DYN_KEY).is_some_and(|v| v.trim() == "1");
        // Decks that never came from a package start from the stock limits.
        let mut base = if asd.contains_key(VENDOR_EXTRA_KEY) {
            Map::new()
        } else {
            object(serde_json::to_value(vendor::Deck::new(id, &deck.name)).unwrap_or_default())
        };
        base.extend(object(json!({
            "id": id,
            "name": deck.name,
            "desc": deck.description,
            "dyn": dynamic,
        })));
        match asd_i64(asd, DECK_CONF_KEY) {
            Some(conf) => {
                base.insert("conf".to_string(), json!(conf));
            },
            None if !dynamic => {
                base.insert("conf".to_string(), json!(DEFAULT_DECK_ID));
            },
            None => {
                base.remove("conf");
            },
        }
        let vendor_deck: vendor::Deck = restore(asd, base, EntityKind::Deck, self.collector)?;
        // Resolving to the default deck's ID replaces it.
        self.snapshot.add_deck(vendor_deck);
        self.deck_id = id;
        count_converted(DIRECTION, EntityKind::Deck);
        Ok(())
    }

    fn field_defs(&mut self, note_type: &NoteType) -> Result<Vec<vendor::FieldDef>> {
        let mut fields: Vec<_> = note_type.fields.iter().collect();
        fields.sort_by_key(|f| f.ordinal);
        fields
            .into_iter()
            .zip(0_u32..)
            .map(|(field, ord)| {
                let base = object(json!({ "name": field.name, "ord": ord }));
                restore(
                    &field.application_specific_data,
                    base,
                    EntityKind::NoteType,
                    self.collector,
                )
            })
            .collect()
    }

    fn templates(&mut self, note_type: &NoteType) -> Result<Vec<vendor::Template>> {
        let mut templates: Vec<_> = note_type.templates.iter().collect();
        templates.sort_by_key(|t| t.ordinal);
        templates
            .into_iter()
            .zip(0_u32..)
            .map(|(template, ord)| {
                let base = object(json!({
                    "name": template.name,
                    "ord": ord,
                    "qfmt": template.question_template,
                    "afmt": template.answer_template,
                }));
                restore(
                    &template.application_specific_data,
                    base,
                    EntityKind::NoteType,
                    self.collector,
                )
            })
            .collect()
    }

    fn add_note_type(&mut self, note_type: &NoteType) -> Result<()> {
        if note_type.fields.is_empty() || note_type.templates.is_empty() {
            self.collector.error(
                EntityKind::NoteType,
                format!(
                    "note-type '{}' skipped: it needs at least one field and one template",
                    note_type.name
                ),
            );
            return Ok(());
        }
        let asd = &note_type.application_specific_data;
        let id = self.reconciler.resolve(
            IdSpace::NoteType,
            hint(asd),
            derive_vendor_id(&note_type.id),
        );
        let flds = self.field_defs(note_type)?;
        let tmpls = self.templates(note_type)?;
        let kind = if cloze::is_cloze_markup(
            tmpls
                .iter()
                .flat_map(|t| [t.qfmt.as_str(), t.afmt.as_str()]),
        ) {
            NoteTypeKind::Cloze
        } else {
            NoteTypeKind::Standard
        };
        let last_field = i64::try_from(flds.len().saturating_sub(1)).unwrap_or(0);
        let sortf = asd_i64(asd, NOTE_TYPE_SORTF_KEY).map_or(0, |s| s.clamp(0, last_field));
        let req: Option<Vec<Requirement>> = asd
            .get(NOTE_TYPE_REQ_KEY)
            .and_then(|r| serde_json::from_str(r).ok());

        let base = object(json!({
            "id": id,
            "name": note_type.name,
            "type": i64::from(kind),
            "mod": asd_i64(asd, MOD_KEY).unwrap_or(self.now),
            "sortf": sortf,
            "flds": flds,
            "tmpls": tmpls,
            "css": note_type.css,
            "latexPre": asd.get(NOTE_TYPE_LATEX_PRE_KEY).map_or(DEFAULT_LATEX_PRE, String::as_str),
            "latexPost": asd.get(NOTE_TYPE_LATEX_POST_KEY).map_or(DEFAULT_LATEX_POST, String::as_str),
            "req": req.clone().unwrap_or_default(),
        }));
        let mut vendor_note_type: vendor::NoteType =
            restore(asd, base, EntityKind::NoteType, self.collector)?;
        if req.is_none() {
            vendor_note_type.req = required_fields(&vendor_note_type);
        }
        self.snapshot.add_note_type(vendor_note_type);
        self.note_types.insert(note_type.id.clone(), id);
        count_converted(DIRECTION, EntityKind::NoteType);
        Ok(())
    }

    fn add_note(&mut self, note: &Note, deck: &Deck) {
        let Some(&mid) = self.note_types.get(&note.note_type_id) else {
            self.collector.error(
                EntityKind::Note,
                format!(
                    "note {} skipped: note-type {} was not converted",
                    note.id, note.note_type_id
                ),
            );
            return;
        };
        if note.deck_id != deck.id {
            self.collector.error(
                EntityKind::Note,
                format!("note {} skipped: deck {} does not exist", note.id, note.deck_id),
            );
            return;
        }
        let Some(note_type) = self.snapshot.note_types.get(&mid) else {
            return;
        };
        let names = note_type.field_names();
        let values: Vec<&str> = names
            .iter()
            .map(|name| note.field(name).unwrap_or_default())
            .collect();
        let unknown: Vec<&str> = note
            .field_values
            .iter()
            .map(|(name, _)| name.as_str())
            .filter(|name| !names.contains(name))
            .collect();
        if !unknown.is_empty() {
            self.collector.warning(
                EntityKind::Note,
                format!(
                    "note {} dropped values of unknown fields: {}",
                    note.id,
                    unknown.join(", ")
                ),
            );
        }

        let asd = &note.application_specific_data;
        let id = self
            .reconciler
            .resolve(IdSpace::Note, hint(asd), derive_vendor_id(&note.id));
        let vendor_note = vendor::Note {
            id,
            guid: asd
                .get(NOTE_GUID_KEY)
                .cloned()
                .unwrap_or_else(|| note.id.to_string()),
            mid,
            modified: asd_i64(asd, MOD_KEY).unwrap_or(self.now),
            usn: asd_i64(asd, USN_KEY).unwrap_or(UNSYNCED),
            tags: vendor::Note::format_tags(&note.tags),
            flds: vendor::Note::join_fields(&values),
            flags: asd_i64(asd, FLAGS_KEY).unwrap_or(0),
            data: asd.get(DATA_KEY).cloned().unwrap_or_default(),
        };
        self.snapshot.add_note(vendor_note);
        self.notes.insert(note.id.clone(), (id, mid));
        count_converted(DIRECTION, EntityKind::Note);
    }

    /// Adds one vendor card. `source` is `None` for manufactured cards.
    fn emit_card(
        &mut self,
        nid: i64,
        note_id: &UniversalId,
        source: Option<&UniversalId>,
        asd: &ApplicationData,
        ord: u32,
    ) -> i64 {
        let fallback = source.map_or_else(
            || derive_vendor_id(note_id).saturating_add(i64::from(ord)),
            derive_vendor_id,
        );
        let id = self.reconciler.resolve(IdSpace::Card, hint(asd), fallback);
        let mut card = vendor::Card::new(id, nid, self.deck_id, i64::from(ord));
        let scheduling = CARD_SCHEDULING_KEYS.map(|key| asd_i64(asd, key).unwrap_or(0));
        let [card_type, queue, due, ivl, factor, reps, lapses, left, odue, odid] = scheduling;
        card.card_type = card_type;
        card.queue = queue;
        card.due = due;
        card.ivl = ivl;
        card.factor = factor;
        card.reps = reps;
        card.lapses = lapses;
        card.left = left;
        card.odue = odue;
        card.odid = odid;
        card.modified = asd_i64(asd, MOD_KEY).unwrap_or(self.now);
        card.usn = asd_i64(asd, USN_KEY).unwrap_or(UNSYNCED);
        card.flags = asd_i64(asd, FLAGS_KEY).unwrap_or(0);
        card.data = asd.get(DATA_KEY).cloned().unwrap_or_default();
        self.snapshot.add_card(card);
        if let Some(source) = source {
            self.cards.insert(source.clone(), id);
        }
        count_converted(DIRECTION, EntityKind::Card);
        id
    }

    fn add_cards(&mut self, note: &Note, cards: &[&Card]) {
        let Some(&(nid, mid)) = self.notes.get(&note.id) else {
            return;
        };
        let Some(note_type) = self.snapshot.note_types.get(&mid) else {
            return;
        };
        let kind = note_type.kind;
        let template_count = note_type.tmpls.len();
        let joined = self
            .snapshot
            .notes
            .get(&nid)
            .map(|n| n.flds.clone())
            .unwrap_or_default();

        let mut emitted: HashMap<u32, i64> = HashMap::new();
        for card in cards {
            if let Some(&kept) = emitted.get(&card.ordinal) {
                // Reviews of the duplicate follow the card that was kept.
                self.cards.insert(card.id.clone(), kept);
                self.collector.warning(
                    EntityKind::Card,
                    format!(
                        "card {} merged into vendor card {kept}: note {} already has a card with ordinal {}",
                        card.id, note.id, card.ordinal
                    ),
                );
                continue;
            }
            let in_range = usize::try_from(card.ordinal).is_ok_and(|o| o < template_count);
            if kind == NoteTypeKind::Standard && !in_range {
                self.collector.error(
                    EntityKind::Card,
                    format!(
                        "card {} skipped: ordinal {} has no template in a note-type with {template_count}",
                        card.id, card.ordinal
                    ),
                );
                continue;
            }
            let id = self.emit_card(
                nid,
                &note.id,
                Some(&card.id),
                &card.application_specific_data,
                card.ordinal,
            );
            emitted.insert(card.ordinal, id);
        }

        if kind != NoteTypeKind::Cloze {
            return;
        }
        let mut required = cloze::ordinals(&joined);
        if required.is_empty() && cards.is_empty() {
            required.push(0);
        }
        let mut template = cards
            .first()
            .map(|c| c.application_specific_data.clone())
            .unwrap_or_default();
        template.remove(ORIGINAL_VENDOR_ID_KEY);
        for ord in required.into_iter().filter(|o| !emitted.contains_key(o)) {
            tracing::debug!(note = %note.id, ord, "manufacturing cloze card");
            self.emit_card(nid, &note.id, None, &template, ord);
        }
    }

    fn add_review(&mut self, review: &crate::models::universal::Review) {
        let Some(&cid) = self.cards.get(&review.card_id) else {
            self.collector.error(
                EntityKind::Review,
                format!(
                    "review {} skipped: card {} was not converted",
                    review.id, review.card_id
                ),
            );
            return;
        };
        let Some(ease) = ease_for_rating(&review.rating) else {
            self.collector.error(
                EntityKind::Review,
                format!(
                    "review {} skipped: rating '{}' has no vendor answer code",
                    review.id, review.rating
                ),
            );
            return;
        };
        let asd = &review.application_specific_data;
        let id = self
            .reconciler
            .resolve(IdSpace::Review, hint(asd), review.reviewed_at);
        let [usn, ivl, last_ivl, factor, review_type] = REVIEW_KEYS.map(|key| asd_i64(asd, key));
        self.snapshot.add_review(vendor::Review {
            id,
            cid,
            usn: usn.unwrap_or(UNSYNCED),
            ease,
            ivl: ivl.unwrap_or(0),
            last_ivl: last_ivl.unwrap_or(0),
            factor: factor.unwrap_or(0),
            time: review.duration_ms,
            review_type: review_type.unwrap_or(0),
        });
        count_converted(DIRECTION, EntityKind::Review);
    }
}

/// Converts a universal package into a fresh vendor snapshot.
///
/// The package must hold exactly one deck; otherwise a critical issue naming
/// the count (and every deck name) is recorded and `None` is returned.
/// Single bad entities are skipped with an `error` issue.
///
/// # Errors
///
/// Returns an error only for unexpected serialization faults.
#[tracing::instrument(skip_all, fields(notes = source.notes().len(), cards = source.cards().len()))]
pub fn to_vendor<U: UniversalPackage>(
    source: &U,
    collector: &mut IssueCollector,
) -> Result<Option<Snapshot>> {
    let [deck] = source.decks() else {
        let decks = source.decks();
        let names: Vec<String> = decks.iter().map(|d| format!("'{}'", d.name)).collect();
        let message = if names.is_empty() {
            "expected exactly one deck, found 0".to_string()
        } else {
            format!(
                "expected exactly one deck, found {}: {}",
                decks.len(),
                names.join(", ")
            )
        };
        collector.critical(EntityKind::Deck, message);
        return Ok(None);
    };

    let mut builder = VendorBuilder::new(collector);
    builder.add_deck(deck)?;
    for note_type in source.note_types() {
        builder.add_note_type(note_type)?;
    }
    for note in source.notes() {
        builder.add_note(note, deck);
    }

    let mut by_note: HashMap<&UniversalId, Vec<&Card>> = HashMap::new();
    for card in source.cards() {
        if builder.notes.contains_key(&card.note_id) {
            by_note.entry(&card.note_id).or_default().push(card);
        } else {
            builder.collector.error(
                EntityKind::Card,
                format!(
                    "card {} skipped: note {} was not converted",
                    card.id, card.note_id
                ),
            );
        }
    }
    for note in source.notes() {
        let cards = by_note.remove(&note.id).unwrap_or_default();
        builder.add_cards(note, &cards);
    }

    for review in source.reviews() {
        builder.add_review(review);
    }

    let snapshot = builder.snapshot;
    let counts = snapshot.counts();
    tracing::info!(
        decks = counts.decks,
        note_types = counts.note_types,
        notes = counts.notes,
        cards = counts.cards,
        reviews = counts.reviews,
        "converted universal package to snapshot"
    );
    Ok(Some(snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Policy;
    use crate::models::universal::{
        CardFields, DeckFields, Field, NoteFields, NoteTypeFields, ReviewFields, Template,
    };
    use crate::universal::MemoryPackage;

    fn field(name: &str, ordinal: u32) -> Field {
        Field {
            name: name.to_string(),
            ordinal,
            application_specific_data: ApplicationData::new(),
        }
    }

    fn template(name: &str, ordinal: u32, q: &str, a: &str) -> Template {
        Template {
            name: name.to_string(),
            ordinal,
            question_template: q.to_string(),
            answer_template: a.to_string(),
            application_specific_data: ApplicationData::new(),
        }
    }

    fn package_with_deck() -> (MemoryPackage, Deck) {
        let mut package = MemoryPackage::new();
        let deck = package
            .create_deck(DeckFields {
                name: "Spanish".to_string(),
                ..DeckFields::default()
            })
            .unwrap();
        (package, deck)
    }

    fn cloze_package(text: &str, existing: &[u32]) -> MemoryPackage {
        let (mut package, deck) = package_with_deck();
        let note_type = package
            .create_note_type(NoteTypeFields {
                name: "Cloze".to_string(),
                fields: vec![field("Text", 0), field("Extra", 1)],
                templates: vec![template("Cloze", 0, "{{cloze:Text}}", "{{cloze:Text}}<br>{{Extra}}")],
                ..NoteTypeFields::default()
            })
            .unwrap();
        let note = package
            .create_note(NoteFields {
                note_type_id: note_type.id,
                deck_id: deck.id,
                field_values: vec![
                    ("Text".to_string(), text.to_string()),
                    ("Extra".to_string(), String::new()),
                ],
                tags: vec!["geo".to_string()],
                application_specific_data: ApplicationData::new(),
            })
            .unwrap();
        for ordinal in existing {
            let mut asd = ApplicationData::new();
            asd.insert("due".to_string(), "99".to_string());
            asd.insert(ORIGINAL_VENDOR_ID_KEY.to_string(), format!("{}", 7000 + ordinal));
            package
                .create_card(CardFields {
                    note_id: note.id.clone(),
                    ordinal: *ordinal,
                    application_specific_data: asd,
                })
                .unwrap();
        }
        package
    }

    fn convert(package: &MemoryPackage) -> (Option<Snapshot>, IssueCollector) {
        let mut collector = IssueCollector::new(Policy::BestEffort);
        let snapshot = to_vendor(package, &mut collector).unwrap();
        (snapshot, collector)
    }

    fn ordinals(snapshot: &Snapshot) -> Vec<i64> {
        let mut ords: Vec<i64> = snapshot.cards.values().map(|c| c.ord).collect();
        ords.sort_unstable();
        ords
    }

    #[test]
    fn test_zero_decks_is_critical() {
        let (snapshot, collector) = convert(&MemoryPackage::new());
        assert!(snapshot.is_none());
        assert!(collector.has_critical());
        assert!(collector.issues()[0].message.contains("found 0"));
    }

    #[test]
    fn test_two_decks_names_both() {
        let (mut package, _) = package_with_deck();
        package
            .create_deck(DeckFields {
                name: "French".to_string(),
                ..DeckFields::default()
            })
            .unwrap();
        let (snapshot, collector) = convert(&package);
        assert!(snapshot.is_none());
        let message = &collector.issues()[0].message;
        assert!(message.contains("found 2"));
        assert!(message.contains("'Spanish'"));
        assert!(message.contains("'French'"));
    }

    #[test]
    fn test_cloze_cards_are_manufactured() {
        let package = cloze_package("{{c1::Paris}} is in {{c2::France}}", &[]);
        let (snapshot, collector) = convert(&package);
        let snapshot = snapshot.unwrap();
        assert!(collector.is_empty(), "{:?}", collector.issues());
        assert_eq!(ordinals(&snapshot), vec![0, 1]);
        let note_type = snapshot.note_types.values().next().unwrap();
        assert_eq!(note_type.kind, NoteTypeKind::Cloze);
        assert!(note_type.req.is_empty());
    }

    #[test]
    fn test_cloze_existing_cards_keep_identity() {
        let package = cloze_package("{{c1::a}} {{c3::c}}", &[0]);
        let (snapshot, _) = convert(&package);
        let snapshot = snapshot.unwrap();
        assert_eq!(ordinals(&snapshot), vec![0, 2]);
        let kept = snapshot.cards.get(&7000).unwrap();
        assert_eq!(kept.ord, 0);
        assert_eq!(kept.due, 99);
        // cloned opaque data, fresh identity
        let made = snapshot.cards.values().find(|c| c.ord == 2).unwrap();
        assert_ne!(made.id, 7000);
        assert_eq!(made.due, 99);
    }

    #[test]
    fn test_cloze_without_markers_gets_one_card() {
        let package = cloze_package("no blanks", &[]);
        let (snapshot, _) = convert(&package);
        assert_eq!(ordinals(&snapshot.unwrap()), vec![0]);
    }

    #[test]
    fn test_cloze_never_drops_existing_cards() {
        let package = cloze_package("{{c1::a}}", &[0, 4]);
        let (snapshot, _) = convert(&package);
        assert_eq!(ordinals(&snapshot.unwrap()), vec![0, 4]);
    }

    #[test]
    fn test_duplicate_ordinal_keeps_first_card() {
        let mut package = cloze_package("{{c1::a}}", &[0, 0]);
        let duplicate = package.cards()[1].id.clone();
        package
            .create_review(ReviewFields {
                card_id: duplicate,
                reviewed_at: 1_700_000_000_000,
                rating: Rating::Normal,
                duration_ms: 1200,
                application_specific_data: ApplicationData::new(),
            })
            .unwrap();
        let (snapshot, collector) = convert(&package);
        let snapshot = snapshot.unwrap();
        assert_eq!(ordinals(&snapshot), vec![0]);
        assert_eq!(collector.len(), 1);
        assert_eq!(collector.issues()[0].severity, crate::models::Severity::Warning);
        assert!(collector.issues()[0].message.contains("ordinal 0"));
        assert_eq!(snapshot.reviews.values().next().unwrap().cid, 7000);
    }

    #[test]
    fn test_standard_card_out_of_range_is_error() {
        let (mut package, deck) = package_with_deck();
        let note_type = package
            .create_note_type(NoteTypeFields {
                name: "Basic".to_string(),
                fields: vec![field("Front", 0), field("Back", 1)],
                templates: vec![template("Card 1", 0, "{{Front}}", "{{Back}}")],
                ..NoteTypeFields::default()
            })
            .unwrap();
        let note = package
            .create_note(NoteFields {
                note_type_id: note_type.id,
                deck_id: deck.id,
                field_values: vec![("Front".to_string(), "q".to_string())],
                tags: Vec::new(),
                application_specific_data: ApplicationData::new(),
            })
            .unwrap();
        for ordinal in [0, 1] {
            package
                .create_card(CardFields {
                    note_id: note.id.clone(),
                    ordinal,
                    application_specific_data: ApplicationData::new(),
                })
                .unwrap();
        }
        let (snapshot, collector) = convert(&package);
        let snapshot = snapshot.unwrap();
        assert_eq!(snapshot.cards.len(), 1);
        assert_eq!(collector.len(), 1);
        assert!(collector.issues()[0].message.contains("ordinal 1"));

        let note_type = snapshot.note_types.values().next().unwrap();
        assert_eq!(note_type.kind, NoteTypeKind::Standard);
        assert_eq!(note_type.req, vec![Requirement(0, "all".to_string(), vec![0])]);
        assert_eq!(note_type.latex_post, DEFAULT_LATEX_POST);
        let vendor_note = snapshot.notes.values().next().unwrap();
        assert_eq!(vendor_note.flds, "q\u{1f}");
        assert_eq!(vendor_note.guid, note.id.to_string());
    }

    #[test]
    fn test_reviews_with_other_rating_are_skipped() {
        let package = {
            let mut package = cloze_package("{{c1::a}}", &[0]);
            let card_id = package.cards()[0].id.clone();
            for rating in [Rating::Easy, Rating::Other("perfect".to_string())] {
                package
                    .create_review(ReviewFields {
                        card_id: card_id.clone(),
                        reviewed_at: 1_700_000_000_000,
                        rating,
                        duration_ms: 1500,
                        application_specific_data: ApplicationData::new(),
                    })
                    .unwrap();
            }
            package
        };
        let (snapshot, collector) = convert(&package);
        let snapshot = snapshot.unwrap();
        assert_eq!(snapshot.reviews.len(), 1);
        let review = snapshot.reviews.values().next().unwrap();
        assert_eq!(review.ease, 4);
        assert_eq!(review.id, 1_700_000_000_000);
        assert_eq!(review.time, 1500);
        assert!(collector.issues()[0].message.contains("perfect"));
    }

    #[test]
    fn test_default_deck_is_kept_alongside_converted_deck() {
        let package = cloze_package("{{c1::a}}", &[]);
        let (snapshot, _) = convert(&package);
        let snapshot = snapshot.unwrap();
        assert_eq!(snapshot.decks.len(), 2);
        assert!(snapshot.decks.contains_key(&DEFAULT_DECK_ID));
        let card = snapshot.cards.values().next().unwrap();
        assert_ne!(card.did, DEFAULT_DECK_ID);
    }

    #[test]
    fn test_ease_for_rating() {
        assert_eq!(ease_for_rating(&Rating::Again), Some(1));
        assert_eq!(ease_for_rating(&Rating::Normal), Some(3));
        assert_eq!(ease_for_rating(&Rating::Other("x".to_string())), None);
    }
}
