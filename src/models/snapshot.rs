//! In-memory snapshots of one collection database.
//!
//! A [`RawSnapshot`] is what the database accessor produces: loosely typed
//! JSON values, one per row or blob entry. The entity validator turns it into
//! a [`Snapshot`] of typed, referentially consistent entities. A snapshot is
//! built once per load and then mutated only through its `add_*`/`remove_*`
//! operations.

use super::vendor::{
    Card, CollectionMeta, Deck, Grave, GraveKind, Note, NoteType, Review, DEFAULT_DECK_ID,
};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Unvalidated database content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSnapshot {
    /// The collection row, with its JSON columns already parsed.
    pub collection: Map<String, Value>,
    /// Decks keyed by stringified ID, as stored in `col.decks`.
    pub decks: Map<String, Value>,
    /// Note-types keyed by stringified ID, as stored in `col.models`.
    pub note_types: Map<String, Value>,
    /// `notes` rows as column-name objects.
    pub notes: Vec<Value>,
    /// `cards` rows as column-name objects.
    pub cards: Vec<Value>,
    /// `revlog` rows as column-name objects.
    pub reviews: Vec<Value>,
    /// `graves` rows as column-name objects.
    pub graves: Vec<Value>,
}

/// Validated, typed database content.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Collection metadata.
    pub meta: CollectionMeta,
    /// Decks keyed by ID.
    pub decks: BTreeMap<i64, Deck>,
    /// Note-types keyed by ID.
    pub note_types: BTreeMap<i64, NoteType>,
    /// Notes keyed by ID.
    pub notes: BTreeMap<i64, Note>,
    /// Cards keyed by ID.
    pub cards: BTreeMap<i64, Card>,
    /// Reviews keyed by ID.
    pub reviews: BTreeMap<i64, Review>,
    /// Tombstones.
    pub graves: Vec<Grave>,
}

impl Snapshot {
    /// An empty snapshot around the given metadata (no decks at all).
    #[must_use]
    pub const fn empty(meta: CollectionMeta) -> Self {
        Self {
            meta,
            decks: BTreeMap::new(),
            note_types: BTreeMap::new(),
            notes: BTreeMap::new(),
            cards: BTreeMap::new(),
            reviews: BTreeMap::new(),
            graves: Vec::new(),
        }
    }

    /// A fresh collection: metadata, the "Default" deck and its options.
    #[must_use]
    pub fn new_default() -> Self {
        let mut snapshot = Self::empty(CollectionMeta::fresh());
        snapshot.add_deck(Deck::default_deck());
        snapshot
    }

    /// Inserts or replaces a deck.
    pub fn add_deck(&mut self, deck: Deck) {
        self.decks.insert(deck.id, deck);
    }

    /// Inserts or replaces a note-type.
    pub fn add_note_type(&mut self, note_type: NoteType) {
        self.note_types.insert(note_type.id, note_type);
    }

    /// Inserts or replaces a note.
    pub fn add_note(&mut self, note: Note) {
        self.notes.insert(note.id, note);
    }

    /// Inserts or replaces a card.
    pub fn add_card(&mut self, card: Card) {
        self.cards.insert(card.id, card);
    }

    /// Inserts or replaces a review.
    pub fn add_review(&mut self, review: Review) {
        self.reviews.insert(review.id, review);
    }

    /// Removes a card and its reviews, recording a tombstone.
    pub fn remove_card(&mut self, id: i64) -> Option<Card> {
        let card = self.cards.remove(&id)?;
        self.reviews.retain(|_, r| r.cid != id);
        self.graves.push(Grave::new(id, GraveKind::Card));
        Some(card)
    }

    /// Removes a note and its cards, recording tombstones.
    pub fn remove_note(&mut self, id: i64) -> Option<Note> {
        let note = self.notes.remove(&id)?;
        let card_ids: Vec<i64> = self
            .cards
            .values()
            .filter(|c| c.nid == id)
            .map(|c| c.id)
            .collect();
        for card_id in card_ids {
            self.remove_card(card_id);
        }
        self.graves.push(Grave::new(id, GraveKind::Note));
        Some(note)
    }

    /// Removes a note-type and every note using it.
    pub fn remove_note_type(&mut self, id: i64) -> Option<NoteType> {
        let note_type = self.note_types.remove(&id)?;
        let note_ids: Vec<i64> = self
            .notes
            .values()
            .filter(|n| n.mid == id)
            .map(|n| n.id)
            .collect();
        for note_id in note_ids {
            self.remove_note(note_id);
        }
        Some(note_type)
    }

    /// Removes a deck and the cards it holds, recording tombstones.
    ///
    /// The default deck cannot be removed.
    pub fn remove_deck(&mut self, id: i64) -> Option<Deck> {
        if id == DEFAULT_DECK_ID {
            return None;
        }
        let deck = self.decks.remove(&id)?;
        let card_ids: Vec<i64> = self
            .cards
            .values()
            .filter(|c| c.did == id)
            .map(|c| c.id)
            .collect();
        for card_id in card_ids {
            self.remove_card(card_id);
        }
        self.graves.push(Grave::new(id, GraveKind::Deck));
        Some(deck)
    }

    /// Cards belonging to a note, in ID order.
    pub fn cards_of_note(&self, nid: i64) -> impl Iterator<Item = &Card> {
        self.cards.values().filter(move |c| c.nid == nid)
    }

    /// Summary counts, used in logs.
    #[must_use]
    pub fn counts(&self) -> SnapshotCounts {
        SnapshotCounts {
            decks: self.decks.len(),
            note_types: self.note_types.len(),
            notes: self.notes.len(),
            cards: self.cards.len(),
            reviews: self.reviews.len(),
        }
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::new_default()
    }
}

/// Entity counts of a [`Snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SnapshotCounts {
    /// Number of decks.
    pub decks: usize,
    /// Number of note-types.
    pub note_types: usize,
    /// Number of notes.
    pub notes: usize,
    /// Number of cards.
    pub cards: usize,
    /// Number of reviews.
    pub reviews: usize,
}
