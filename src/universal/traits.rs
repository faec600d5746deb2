//! The universal package seam.

use crate::Result;
use crate::models::universal::{
    Card, CardFields, Deck, DeckFields, Note, NoteFields, NoteType, NoteTypeFields, Review,
    ReviewFields,
};

/// A vendor-neutral package the conversion engine reads from and writes to.
///
/// Factories assign a fresh opaque ID and return the stored entity. The
/// engine never mutates an entity after construction; it only constructs,
/// reads, and prunes.
pub trait UniversalPackage {
    /// Creates a deck.
    fn create_deck(&mut self, fields: DeckFields) -> Result<Deck>;

    /// Creates a note-type.
    fn create_note_type(&mut self, fields: NoteTypeFields) -> Result<NoteType>;

    /// Creates a note.
    fn create_note(&mut self, fields: NoteFields) -> Result<Note>;

    /// Creates a card.
    fn create_card(&mut self, fields: CardFields) -> Result<Card>;

    /// Creates a review.
    fn create_review(&mut self, fields: ReviewFields) -> Result<Review>;

    /// All decks, in creation order.
    fn decks(&self) -> &[Deck];

    /// All note-types, in creation order.
    fn note_types(&self) -> &[NoteType];

    /// All notes, in creation order.
    fn notes(&self) -> &[Note];

    /// All cards, in creation order.
    fn cards(&self) -> &[Card];

    /// All reviews, in creation order.
    fn reviews(&self) -> &[Review];

    /// Stores a media file, replacing any file of the same name.
    fn add_media(&mut self, name: &str, bytes: Vec<u8>) -> Result<()>;

    /// Names of all stored media files, sorted.
    fn media_names(&self) -> Vec<String>;

    /// Bytes of a stored media file.
    fn media(&self, name: &str) -> Option<&[u8]>;

    /// Removes entities no longer reachable through their parents.
    ///
    /// Returns the number of entities removed.
    fn prune_unreferenced(&mut self) -> usize;

    /// Total number of entities.
    fn entity_count(&self) -> usize {
        self.decks().len()
            + self.note_types().len()
            + self.notes().len()
            + self.cards().len()
            + self.reviews().len()
    }
}
