//! Shared fixtures for integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use apkg_bridge::BridgeConfig;
use apkg_bridge::io::container;
use apkg_bridge::io::media::{self, MediaIndex};
use apkg_bridge::models::vendor::{
    Card, Deck, FieldDef, Note, NoteType, NoteTypeKind, Review, Template,
};
use apkg_bridge::models::Snapshot;
use serde_json::Map;
use std::path::{Path, PathBuf};

pub const SPANISH_DECK: i64 = 1_600_000_000_001;
pub const BASIC_TYPE: i64 = 1_600_000_000_100;
pub const CLOZE_TYPE: i64 = 1_600_000_000_200;

pub const HOLA_NOTE: i64 = 1_600_000_001_000;
pub const ADIOS_NOTE: i64 = 1_600_000_002_000;
pub const MADRID_NOTE: i64 = 1_600_000_003_000;

pub const HOLA_CARD: i64 = 1_600_000_001_001;
pub const HOLA_REVERSE_CARD: i64 = 1_600_000_001_002;
pub const ADIOS_CARD: i64 = 1_600_000_002_001;
pub const MADRID_C1_CARD: i64 = 1_600_000_003_001;
pub const MADRID_C2_CARD: i64 = 1_600_000_003_002;

pub fn basic_note_type() -> NoteType {
    NoteType {
        id: BASIC_TYPE,
        name: "Basic (and reversed card)".to_string(),
        kind: NoteTypeKind::Standard,
        modified: 1_600_000_000,
        usn: 3,
        sortf: 0,
        did: Some(SPANISH_DECK),
        flds: vec![FieldDef::new("Front", 0), FieldDef::new("Back", 1)],
        tmpls: vec![
            Template::new("Card 1", 0, "{{Front}}", "{{FrontSide}}<hr id=answer>{{Back}}"),
            Template::new("Card 2", 1, "{{Back}}", "{{FrontSide}}<hr id=answer>{{Front}}"),
        ],
        css: ".card { font-family: arial; }".to_string(),
        latex_pre: "\\begin{document}".to_string(),
        latex_post: "\\end{document}".to_string(),
        req: Vec::new(),
        extra: Map::new(),
    }
}

pub fn cloze_note_type() -> NoteType {
    NoteType {
        id: CLOZE_TYPE,
        name: "Cloze".to_string(),
        kind: NoteTypeKind::Cloze,
        modified: 1_600_000_000,
        usn: 3,
        sortf: 0,
        did: None,
        flds: vec![FieldDef::new("Text", 0), FieldDef::new("Back Extra", 1)],
        tmpls: vec![Template::new(
            "Cloze",
            0,
            "{{cloze:Text}}",
            "{{cloze:Text}}<br>{{Back Extra}}",
        )],
        css: String::new(),
        latex_pre: String::new(),
        latex_post: String::new(),
        req: Vec::new(),
        extra: Map::new(),
    }
}

pub fn note(id: i64, mid: i64, fields: &[&str], tags: &[&str]) -> Note {
    Note {
        id,
        guid: format!("guid-{id}"),
        mid,
        modified: 1_600_000_500,
        usn: 5,
        tags: Note::format_tags(tags),
        flds: Note::join_fields(fields),
        flags: 0,
        data: String::new(),
    }
}

pub fn studied_card(id: i64, nid: i64, ord: i64, due: i64) -> Card {
    let mut card = Card::new(id, nid, SPANISH_DECK, ord);
    card.card_type = 2;
    card.queue = 2;
    card.due = due;
    card.ivl = 12;
    card.factor = 2500;
    card.reps = 4;
    card.lapses = 1;
    card
}

pub fn review(id: i64, cid: i64, ease: i64) -> Review {
    Review {
        id,
        cid,
        usn: 5,
        ease,
        ivl: 12,
        last_ivl: 4,
        factor: 2500,
        time: 6_500,
        review_type: 1,
    }
}

/// A Spanish vocabulary collection: two standard notes, one cloze note,
/// five cards, three reviews, plus the empty "Default" deck.
pub fn sample_snapshot() -> Snapshot {
    let mut snapshot = Snapshot::new_default();
    let mut deck = Deck::new(SPANISH_DECK, "Spanish");
    deck.desc = "Everyday vocabulary".to_string();
    snapshot.add_deck(deck);
    snapshot.add_note_type(basic_note_type());
    snapshot.add_note_type(cloze_note_type());

    snapshot.add_note(note(HOLA_NOTE, BASIC_TYPE, &["hola", "hello"], &["greeting"]));
    snapshot.add_note(note(ADIOS_NOTE, BASIC_TYPE, &["adiós", "goodbye"], &[]));
    snapshot.add_note(note(
        MADRID_NOTE,
        CLOZE_TYPE,
        &["{{c1::Madrid}} is the capital of {{c2::Spain}}", ""],
        &["geo", "capitals"],
    ));

    snapshot.add_card(studied_card(HOLA_CARD, HOLA_NOTE, 0, 120));
    snapshot.add_card(studied_card(HOLA_REVERSE_CARD, HOLA_NOTE, 1, 121));
    snapshot.add_card(Card::new(ADIOS_CARD, ADIOS_NOTE, SPANISH_DECK, 0));
    snapshot.add_card(studied_card(MADRID_C1_CARD, MADRID_NOTE, 0, 130));
    snapshot.add_card(studied_card(MADRID_C2_CARD, MADRID_NOTE, 1, 131));

    snapshot.add_review(review(1_600_100_000_000, HOLA_CARD, 3));
    snapshot.add_review(review(1_600_200_000_000, HOLA_CARD, 1));
    snapshot.add_review(review(1_600_300_000_000, MADRID_C1_CARD, 4));
    snapshot
}

/// Writes `snapshot` as a package at `dir/name`, with the given media files.
pub fn write_package(
    dir: &Path,
    name: &str,
    snapshot: &Snapshot,
    media_files: &[(&str, &[u8])],
) -> PathBuf {
    let media_dir = dir.join(format!("{name}.media"));
    let work_dir = dir.join(format!("{name}.work"));
    std::fs::create_dir_all(&media_dir).unwrap();
    std::fs::create_dir_all(&work_dir).unwrap();

    let mut index = MediaIndex::new();
    for (file_name, bytes) in media_files {
        media::add_file(&mut index, &media_dir, file_name, bytes).unwrap();
    }
    let dest = dir.join(name);
    container::write(
        snapshot,
        &index,
        Some(&media_dir),
        &work_dir,
        &dest,
        &BridgeConfig::default(),
    )
    .unwrap();
    dest
}

/// The sample collection packaged with one audio file.
pub fn sample_package(dir: &Path) -> PathBuf {
    write_package(
        dir,
        "spanish.apkg",
        &sample_snapshot(),
        &[("hola.mp3", b"ID3 fake audio")],
    )
}

/// Configuration whose scratch directories live under `root`.
pub fn config(root: &Path) -> BridgeConfig {
    BridgeConfig::default().with_scratch_root(root.join("scratch"))
}
