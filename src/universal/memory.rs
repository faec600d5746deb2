//! In-memory universal package.

use super::UniversalPackage;
use crate::Result;
use crate::models::UniversalId;
use crate::models::universal::{
    Card, CardFields, Deck, DeckFields, Note, NoteFields, NoteType, NoteTypeFields, Review,
    ReviewFields,
};
use std::collections::{BTreeMap, HashSet};

/// A universal package held entirely in memory.
///
/// IDs are UUIDv7, so each one embeds its creation time in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryPackage {
    decks: Vec<Deck>,
    note_types: Vec<NoteType>,
    notes: Vec<Note>,
    cards: Vec<Card>,
    reviews: Vec<Review>,
    media: BTreeMap<String, Vec<u8>>,
}

impl MemoryPackage {
    /// Creates an empty package.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a deck by ID.
    #[must_use]
    pub fn deck(&self, id: &UniversalId) -> Option<&Deck> {
        self.decks.iter().find(|d| &d.id == id)
    }

    /// Looks up a note by ID.
    #[must_use]
    pub fn note(&self, id: &UniversalId) -> Option<&Note> {
        self.notes.iter().find(|n| &n.id == id)
    }

    /// Prunes one layer of unreferenced entities, returning how many went.
    fn prune_pass(&mut self) -> usize {
        let before = self.entity_count();

        let deck_ids: HashSet<UniversalId> = self.decks.iter().map(|d| d.id.clone()).collect();
        let note_type_ids: HashSet<UniversalId> =
            self.note_types.iter().map(|nt| nt.id.clone()).collect();
        self.notes
            .retain(|n| deck_ids.contains(&n.deck_id) && note_type_ids.contains(&n.note_type_id));

        let note_ids: HashSet<UniversalId> = self.notes.iter().map(|n| n.id.clone()).collect();
        self.cards.retain(|c| note_ids.contains(&c.note_id));

        let card_ids: HashSet<UniversalId> = self.cards.iter().map(|c| c.id.clone()).collect();
        self.reviews.retain(|r| card_ids.contains(&r.card_id));

        let used_decks: HashSet<&UniversalId> = self.notes.iter().map(|n| &n.deck_id).collect();
        self.decks.retain(|d| used_decks.contains(&d.id));

        before - self.entity_count()
    }
}

impl UniversalPackage for MemoryPackage {
    fn create_deck(&mut self, fields: DeckFields) -> Result<Deck> {
        let deck = Deck {
            id: UniversalId::generate(),
            name: fields.name,
            description: fields.description,
            application_specific_data: fields.application_specific_data,
        };
        self.decks.push(deck.clone());
        Ok(deck)
    }

    fn create_note_type(&mut self, fields: NoteTypeFields) -> Result<NoteType> {
        let note_type = NoteType {
            id: UniversalId::generate(),
            name: fields.name,
            fields: fields.fields,
            templates: fields.templates,
            css: fields.css,
            application_specific_data: fields.application_specific_data,
        };
        self.note_types.push(note_type.clone());
        Ok(note_type)
    }

    fn create_note(&mut self, fields: NoteFields) -> Result<Note> {
        let note = Note {
            id: UniversalId::generate(),
            note_type_id: fields.note_type_id,
            deck_id: fields.deck_id,
            field_values: fields.field_values,
            tags: fields.tags,
            application_specific_data: fields.application_specific_data,
        };
        self.notes.push(note.clone());
        Ok(note)
    }

    fn create_card(&mut self, fields: CardFields) -> Result<Card> {
        let card = Card {
            id: UniversalId::generate(),
            note_id: fields.note_id,
            ordinal: fields.ordinal,
            application_specific_data: fields.application_specific_data,
        };
        self.cards.push(card.clone());
        Ok(card)
    }

    fn create_review(&mut self, fields: ReviewFields) -> Result<Review> {
        let review = Review {
            id: UniversalId::generate(),
            card_id: fields.card_id,
            reviewed_at: fields.reviewed_at,
            rating: fields.rating,
            duration_ms: fields.duration_ms,
            application_specific_data: fields.application_specific_data,
        };
        self.reviews.push(review.clone());
        Ok(review)
    }

    fn decks(&self) -> &[Deck] {
        &self.decks
    }

    fn note_types(&self) -> &[NoteType] {
        &self.note_types
    }

    fn notes(&self) -> &[Note] {
        &self.notes
    }

    fn cards(&self) -> &[Card] {
        &self.cards
    }

    fn reviews(&self) -> &[Review] {
        &self.reviews
    }

    fn add_media(&mut self, name: &str, bytes: Vec<u8>) -> Result<()> {
        if name.is_empty() {
            return Err(crate::Error::InvalidInput(
                "media file name must not be empty".to_string(),
            ));
        }
        self.media.insert(name.to_string(), bytes);
        Ok(())
    }

    fn media_names(&self) -> Vec<String> {
        self.media.keys().cloned().collect()
    }

    fn media(&self, name: &str) -> Option<&[u8]> {
        self.media.get(name).map(Vec::as_slice)
    }

    fn prune_unreferenced(&mut self) -> usize {
        let mut removed = 0;
        loop {
            let pass = self.prune_pass();
            if pass == 0 {
                break;
            }
            removed += pass;
        }
        if removed > 0 {
            tracing::debug!(removed, "pruned unreferenced universal entities");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Rating;
    use crate::models::universal::{Field, Template};

    fn populated() -> (MemoryPackage, Deck, Note) {
        let mut package = MemoryPackage::new();
        let deck = package
            .create_deck(DeckFields {
                name: "Spanish".to_string(),
                ..DeckFields::default()
            })
            .unwrap();
        let note_type = package
            .create_note_type(NoteTypeFields {
                name: "Basic".to_string(),
                fields: vec![Field {
                    name: "Front".to_string(),
                    ordinal: 0,
                    application_specific_data: BTreeMap::new(),
                }],
                templates: vec![Template {
                    name: "Card 1".to_string(),
                    ordinal: 0,
                    question_template: "{{Front}}".to_string(),
                    answer_template: "{{Front}}".to_string(),
                    application_specific_data: BTreeMap::new(),
                }],
                ..NoteTypeFields::default()
            })
            .unwrap();
        let note = package
            .create_note(NoteFields {
                note_type_id: note_type.id,
                deck_id: deck.id.clone(),
                field_values: vec![("Front".to_string(), "hola".to_string())],
                tags: Vec::new(),
                application_specific_data: BTreeMap::new(),
            })
            .unwrap();
        let card = package
            .create_card(CardFields {
                note_id: note.id.clone(),
                ordinal: 0,
                application_specific_data: BTreeMap::new(),
            })
            .unwrap();
        package
            .create_review(ReviewFields {
                card_id: card.id,
                reviewed_at: 1_700_000_000_000,
                rating: Rating::Normal,
                duration_ms: 3000,
                application_specific_data: BTreeMap::new(),
            })
            .unwrap();
        (package, deck, note)
    }

    #[test]
    fn test_ids_are_generated_and_distinct() {
        let (package, deck, note) = populated();
        assert_ne!(deck.id, note.id);
        assert_eq!(package.entity_count(), 5);
        assert_eq!(package.deck(&deck.id).map(|d| d.name.as_str()), Some("Spanish"));
        assert!(package.note(&note.id).is_some());
    }

    #[test]
    fn test_prune_keeps_connected_entities() {
        let (mut package, _, _) = populated();
        assert_eq!(package.prune_unreferenced(), 0);
        assert_eq!(package.entity_count(), 5);
    }

    #[test]
    fn test_prune_cascades_from_orphaned_note() {
        let (mut package, _, _) = populated();
        package.notes[0].deck_id = UniversalId::new("gone");
        // note, card, review, and the now-empty deck
        assert_eq!(package.prune_unreferenced(), 4);
        assert!(package.decks().is_empty());
        assert_eq!(package.note_types().len(), 1);
    }

    #[test]
    fn test_prune_removes_empty_deck() {
        let (mut package, _, _) = populated();
        package
            .create_deck(DeckFields {
                name: "Empty".to_string(),
                ..DeckFields::default()
            })
            .unwrap();
        assert_eq!(package.prune_unreferenced(), 1);
        assert_eq!(package.decks().len(), 1);
    }

    #[test]
    fn test_media() {
        let mut package = MemoryPackage::new();
        package.add_media("b.mp3", vec![1]).unwrap();
        package.add_media("a.png", vec![2, 3]).unwrap();
        assert_eq!(package.media_names(), vec!["a.png", "b.mp3"]);
        assert_eq!(package.media("a.png"), Some(&[2_u8, 3][..]));
        assert!(package.add_media("", Vec::new()).is_err());
    }
}
