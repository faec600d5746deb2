//! Round-trip tests: package → universal → package.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use apkg_bridge::models::universal::Rating;
use apkg_bridge::services::ORIGINAL_VENDOR_ID_KEY;
use apkg_bridge::{MemoryPackage, Policy, Snapshot, UniversalPackage, VendorPackage};
use common::{
    BASIC_TYPE, CLOZE_TYPE, HOLA_CARD, HOLA_NOTE, MADRID_C2_CARD, SPANISH_DECK, config,
    sample_package,
};
use std::collections::BTreeSet;
use std::path::Path;

fn open(path: &Path, root: &Path) -> VendorPackage {
    let outcome = VendorPackage::open_with(path, &config(root), Some(Policy::Strict)).unwrap();
    assert!(outcome.is_success(), "{:?}", outcome.issues());
    outcome.into_data().unwrap()
}

/// Converts a package to universal and back, exporting to `dest`.
fn cycle(package: &VendorPackage, dest: &Path, root: &Path) -> VendorPackage {
    let universal = package
        .to_universal::<MemoryPackage>(Some(Policy::Strict))
        .unwrap();
    assert!(universal.is_success(), "{:?}", universal.issues());
    let universal = universal.into_data().unwrap();

    let rebuilt =
        VendorPackage::from_universal_with(&universal, &config(root), Some(Policy::Strict))
            .unwrap();
    assert!(rebuilt.is_success(), "{:?}", rebuilt.issues());
    let rebuilt = rebuilt.into_data().unwrap();

    let exported = rebuilt.export(dest, Some(Policy::Strict)).unwrap();
    assert!(exported.is_success(), "{:?}", exported.issues());
    assert!(rebuilt.close().is_empty());
    open(dest, root)
}

fn id_sets(snapshot: &Snapshot) -> [BTreeSet<i64>; 5] {
    [
        snapshot.decks.keys().copied().collect(),
        snapshot.note_types.keys().copied().collect(),
        snapshot.notes.keys().copied().collect(),
        snapshot.cards.keys().copied().collect(),
        snapshot.reviews.keys().copied().collect(),
    ]
}

#[test]
fn test_round_trip_preserves_counts_and_ids() {
    let root = tempfile::tempdir().unwrap();
    let original = open(&sample_package(root.path()), root.path());

    let first = cycle(&original, &root.path().join("first.apkg"), root.path());
    let second = cycle(&first, &root.path().join("second.apkg"), root.path());

    assert_eq!(first.snapshot().counts(), original.snapshot().counts());
    assert_eq!(second.snapshot().counts(), original.snapshot().counts());
    assert_eq!(id_sets(first.snapshot()), id_sets(original.snapshot()));
    assert_eq!(id_sets(second.snapshot()), id_sets(first.snapshot()));
}

#[test]
fn test_round_trip_preserves_note_types() {
    let root = tempfile::tempdir().unwrap();
    let original = open(&sample_package(root.path()), root.path());
    let rebuilt = cycle(&original, &root.path().join("out.apkg"), root.path());

    for id in [BASIC_TYPE, CLOZE_TYPE] {
        let before = &original.snapshot().note_types[&id];
        let after = &rebuilt.snapshot().note_types[&id];
        assert_eq!(after.name, before.name);
        assert_eq!(after.kind, before.kind);
        assert_eq!(after.field_names(), before.field_names());
        let templates = |nt: &apkg_bridge::models::vendor::NoteType| {
            nt.tmpls
                .iter()
                .map(|t| (t.name.clone(), t.qfmt.clone(), t.afmt.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(templates(after), templates(before));
        assert_eq!(after.css, before.css);
        assert_eq!(after.latex_pre, before.latex_pre);
        assert_eq!(after.usn, before.usn);
        assert_eq!(after.did, before.did);
    }
}

#[test]
fn test_round_trip_preserves_notes_and_scheduling() {
    let root = tempfile::tempdir().unwrap();
    let original = open(&sample_package(root.path()), root.path());
    let rebuilt = cycle(&original, &root.path().join("out.apkg"), root.path());

    let before = &original.snapshot().notes[&HOLA_NOTE];
    let after = &rebuilt.snapshot().notes[&HOLA_NOTE];
    assert_eq!(after, before);

    for id in [HOLA_CARD, MADRID_C2_CARD] {
        let before = &original.snapshot().cards[&id];
        let after = &rebuilt.snapshot().cards[&id];
        assert_eq!(after, before);
    }
    assert_eq!(rebuilt.snapshot().reviews, original.snapshot().reviews);

    let deck = &rebuilt.snapshot().decks[&SPANISH_DECK];
    assert_eq!(deck.desc, "Everyday vocabulary");
    assert_eq!(deck.extend_new, 10);
}

#[test]
fn test_round_trip_preserves_media() {
    let root = tempfile::tempdir().unwrap();
    let original = open(&sample_package(root.path()), root.path());
    let rebuilt = cycle(&original, &root.path().join("out.apkg"), root.path());
    assert_eq!(rebuilt.list_media_files(), vec!["hola.mp3"]);
    assert_eq!(
        rebuilt.read_media_file("hola.mp3").unwrap(),
        Some(b"ID3 fake audio".to_vec())
    );
}

#[test]
fn test_universal_view_of_sample() {
    let root = tempfile::tempdir().unwrap();
    let package = open(&sample_package(root.path()), root.path());
    let universal = package
        .to_universal::<MemoryPackage>(None)
        .unwrap()
        .into_data()
        .unwrap();

    // the empty Default deck is pruned
    assert_eq!(universal.decks().len(), 1);
    assert_eq!(universal.decks()[0].name, "Spanish");
    assert_eq!(universal.note_types().len(), 2);
    assert_eq!(universal.notes().len(), 3);
    assert_eq!(universal.cards().len(), 5);
    assert_eq!(universal.reviews().len(), 3);

    let hola = universal
        .notes()
        .iter()
        .find(|n| n.field("Front") == Some("hola"))
        .unwrap();
    assert_eq!(hola.field("Back"), Some("hello"));
    assert_eq!(hola.tags, vec!["greeting"]);
    assert_eq!(
        hola.application_specific_data.get(ORIGINAL_VENDOR_ID_KEY),
        Some(&HOLA_NOTE.to_string())
    );

    let ratings: Vec<&Rating> = universal.reviews().iter().map(|r| &r.rating).collect();
    assert!(ratings.contains(&&Rating::Again));
    assert!(ratings.contains(&&Rating::Normal));
    assert!(ratings.contains(&&Rating::Easy));
}

#[test]
fn test_fresh_universal_package_exports() {
    use apkg_bridge::models::ApplicationData;
    use apkg_bridge::models::universal::{
        CardFields, DeckFields, Field, NoteFields, NoteTypeFields, Template,
    };

    let root = tempfile::tempdir().unwrap();
    let mut universal = MemoryPackage::new();
    let deck = universal
        .create_deck(DeckFields {
            name: "Capitals".to_string(),
            ..DeckFields::default()
        })
        .unwrap();
    let note_type = universal
        .create_note_type(NoteTypeFields {
            name: "Cloze".to_string(),
            fields: vec![Field {
                name: "Text".to_string(),
                ordinal: 0,
                application_specific_data: ApplicationData::new(),
            }],
            templates: vec![Template {
                name: "Cloze".to_string(),
                ordinal: 0,
                question_template: "{{cloze:Text}}".to_string(),
                answer_template: "{{cloze:Text}}".to_string(),
                application_specific_data: ApplicationData::new(),
            }],
            ..NoteTypeFields::default()
        })
        .unwrap();
    let note = universal
        .create_note(NoteFields {
            note_type_id: note_type.id,
            deck_id: deck.id,
            field_values: vec![(
                "Text".to_string(),
                "{{c1::Lima}} is in {{c2::Peru}}".to_string(),
            )],
            tags: Vec::new(),
            application_specific_data: ApplicationData::new(),
        })
        .unwrap();
    universal
        .create_card(CardFields {
            note_id: note.id,
            ordinal: 0,
            application_specific_data: ApplicationData::new(),
        })
        .unwrap();
    universal.add_media("peru.png", b"png".to_vec()).unwrap();

    let package = VendorPackage::from_universal_with(&universal, &config(root.path()), None)
        .unwrap()
        .into_data()
        .unwrap();
    let dest = root.path().join("capitals.apkg");
    assert!(package.export(&dest, None).unwrap().is_success());

    let reopened = open(&dest, root.path());
    let snapshot = reopened.snapshot();
    // Default deck plus the converted one
    assert_eq!(snapshot.decks.len(), 2);
    // the second cloze card is generated on export
    assert_eq!(snapshot.cards.len(), 2);
    assert_eq!(reopened.list_media_files(), vec!["peru.png"]);
}
