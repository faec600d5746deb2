//! Mapping of opaque universal IDs onto vendor integer IDs.

use crate::models::UniversalId;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};

/// `applicationSpecificData` key holding the vendor ID an entity was imported with.
pub const ORIGINAL_VENDOR_ID_KEY: &str = "originalVendorId";

/// Entity kinds with independent vendor ID spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdSpace {
    /// Deck IDs.
    Deck,
    /// Note-type IDs.
    NoteType,
    /// Note IDs.
    Note,
    /// Card IDs.
    Card,
    /// Review IDs.
    Review,
}

/// Assigns collision-free vendor IDs during one conversion run.
///
/// A recorded vendor ID (from a previous import) wins when it parses as a
/// number; otherwise the candidate comes from the universal ID. Taken
/// candidates are probed upward one at a time, then downward once the
/// top of the integer range is reached.
#[derive(Debug, Default)]
pub struct IdReconciler {
    assigned: HashMap<IdSpace, HashSet<i64>>,
}

impl IdReconciler {
    /// Creates a reconciler with no IDs taken.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks an ID as taken without resolving it.
    pub fn reserve(&mut self, space: IdSpace, id: i64) {
        self.assigned.entry(space).or_default().insert(id);
    }

    /// Returns true if `id` is already assigned in `space`.
    #[must_use]
    pub fn is_taken(&self, space: IdSpace, id: i64) -> bool {
        self.assigned.get(&space).is_some_and(|ids| ids.contains(&id))
    }

    /// Resolves and records a vendor ID.
    ///
    /// `hint` is the previously recorded vendor ID, if any; `fallback` is
    /// used when the hint is absent or not numeric.
    pub fn resolve(&mut self, space: IdSpace, hint: Option<&str>, fallback: i64) -> i64 {
        let candidate = hint
            .and_then(|h| h.trim().parse::<i64>().ok())
            .unwrap_or(fallback);
        let taken = self.assigned.entry(space).or_default();
        // Upward first; past i64::MAX the probe continues below the candidate.
        let id = (candidate..=i64::MAX)
            .chain((i64::MIN..candidate).rev())
            .find(|id| !taken.contains(id))
            .unwrap_or(candidate);
        if id != candidate {
            tracing::debug!(?space, candidate, assigned = id, "vendor id collision resolved");
        }
        taken.insert(id);
        id
    }
}

/// Derives a fallback vendor ID from a universal ID.
///
/// UUIDv7 identifiers embed their creation time in the top 48 bits, which
/// is exactly the vendor's millisecond-timestamp ID convention. Any other ID
/// is hashed into the same range so the result stays deterministic.
#[must_use]
pub fn derive_vendor_id(id: &UniversalId) -> i64 {
    if let Ok(uuid) = uuid::Uuid::parse_str(id.as_str()) {
        if uuid.get_version_num() == 7 {
            return embedded_millis(uuid.as_bytes());
        }
    }
    let digest = Sha256::digest(id.as_str().as_bytes());
    // 41 bits keeps the value inside the plausible millisecond range.
    embedded_millis(digest.as_slice()) & 0x1FF_FFFF_FFFF
}

fn embedded_millis(bytes: &[u8]) -> i64 {
    bytes
        .iter()
        .take(6)
        .fold(0_i64, |acc, b| (acc << 8) | i64::from(*b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_wins_over_fallback() {
        let mut reconciler = IdReconciler::new();
        assert_eq!(reconciler.resolve(IdSpace::Deck, Some("1700"), 5), 1700);
    }

    #[test]
    fn test_unparseable_hint_uses_fallback() {
        let mut reconciler = IdReconciler::new();
        assert_eq!(reconciler.resolve(IdSpace::Deck, Some("abc"), 5), 5);
        assert_eq!(reconciler.resolve(IdSpace::Deck, None, 9), 9);
    }

    #[test]
    fn test_collision_probes_to_smallest_free() {
        let mut reconciler = IdReconciler::new();
        reconciler.reserve(IdSpace::Deck, 101);
        assert_eq!(reconciler.resolve(IdSpace::Deck, None, 100), 100);
        assert_eq!(reconciler.resolve(IdSpace::Deck, None, 100), 102);
        assert_eq!(reconciler.resolve(IdSpace::Deck, None, 100), 103);
    }

    #[test]
    fn test_collision_at_max_probes_downward() {
        let max = i64::MAX.to_string();
        let mut reconciler = IdReconciler::new();
        assert_eq!(reconciler.resolve(IdSpace::Note, Some(&max), 0), i64::MAX);
        assert_eq!(reconciler.resolve(IdSpace::Note, Some(&max), 0), i64::MAX - 1);
        assert_eq!(reconciler.resolve(IdSpace::Note, Some(&max), 0), i64::MAX - 2);
    }

    #[test]
    fn test_spaces_are_independent() {
        let mut reconciler = IdReconciler::new();
        assert_eq!(reconciler.resolve(IdSpace::Note, None, 7), 7);
        assert_eq!(reconciler.resolve(IdSpace::Card, None, 7), 7);
        assert!(reconciler.is_taken(IdSpace::Note, 7));
        assert!(!reconciler.is_taken(IdSpace::Deck, 7));
    }

    #[test]
    fn test_derive_from_uuid_v7_is_creation_millis() {
        let before = crate::current_timestamp_millis();
        let id = UniversalId::generate();
        let after = crate::current_timestamp_millis();
        let derived = derive_vendor_id(&id);
        assert!(derived >= before && derived <= after);
    }

    #[test]
    fn test_derive_from_other_ids_is_deterministic() {
        let id = UniversalId::new("deck-spanish");
        assert_eq!(derive_vendor_id(&id), derive_vendor_id(&id));
        assert!(derive_vendor_id(&id) >= 0);
        assert_ne!(
            derive_vendor_id(&id),
            derive_vendor_id(&UniversalId::new("deck-french"))
        );
    }
}
