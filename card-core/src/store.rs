//! Saved card collection with name uniqueness and active selection.
//!
//! The [`ProjectStore`] reads its blob once when opened and rewrites the full
//! snapshot on every save or delete. A failed write rolls the in-memory state
//! back, so the store and its blob never disagree. Entries this version cannot
//! read are carried through every rewrite untouched.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::blob::BlobStore;
use crate::{CardEntity, CardError, CardId};

/// Blob key for the saved card collection.
pub const STORE_KEY: &str = "project-cards-v2";

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The card failed save-time validation.
    #[error(transparent)]
    Validation(#[from] CardError),
    /// The requested card does not exist in the store.
    #[error("Card not found: {0}")]
    NotFound(String),
    /// An I/O error occurred during persistence.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Whether this is a save rejected because the name is taken.
    #[must_use]
    pub fn is_name_collision(&self) -> bool {
        matches!(self, Self::Validation(CardError::NameCollision { .. }))
    }
}

/// Outcome of deleting a card.
#[derive(Debug, Clone)]
pub struct Deletion {
    /// The card that was removed.
    pub card: CardEntity,
    /// Whether it was the active selection. The caller should switch to a
    /// fresh card when this is set.
    pub was_active: bool,
}

/// Keyed collection of saved cards.
pub struct ProjectStore {
    cards: HashMap<CardId, CardEntity>,
    /// Raw entries that could not be decoded, written back as they were read.
    unreadable: BTreeMap<String, serde_json::Value>,
    active: Option<CardId>,
    blob: Arc<dyn BlobStore>,
}

impl std::fmt::Debug for ProjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectStore")
            .field("cards", &self.cards.len())
            .field("unreadable", &self.unreadable.len())
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl ProjectStore {
    /// Open the store, reading the saved collection from `blob`.
    ///
    /// Entries that cannot be decoded are kept aside with a warning and
    /// persisted unchanged; every decoded entry is backfilled with current
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob cannot be read or is not a JSON object.
    pub fn open(blob: Arc<dyn BlobStore>) -> Result<Self, StoreError> {
        let mut cards = HashMap::new();
        let mut unreadable = BTreeMap::new();

        if let Some(raw) = blob.get(STORE_KEY)? {
            let snapshot: BTreeMap<String, serde_json::Value> = serde_json::from_str(&raw)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;

            for (key, value) in snapshot {
                let Ok(id) = CardId::parse(&key) else {
                    tracing::warn!("Keeping saved card with invalid id {key:?} unread");
                    unreadable.insert(key, value);
                    continue;
                };
                match CardEntity::from_snapshot(value.clone()) {
                    Ok(mut card) => {
                        card.id = id;
                        cards.insert(id, card);
                    }
                    Err(e) => {
                        tracing::warn!("Keeping unreadable saved card {key} unread: {e}");
                        unreadable.insert(key, value);
                    }
                }
            }
        }

        tracing::debug!(
            "Opened project store with {} cards ({} unreadable)",
            cards.len(),
            unreadable.len()
        );
        Ok(Self {
            cards,
            unreadable,
            active: None,
            blob,
        })
    }

    /// Normalize, validate and upsert `card`, then mark it active.
    ///
    /// The stored copy always satisfies the card invariants, whatever was
    /// written into the caller's fields.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] on a name collision, or a
    /// persistence error if the blob write fails. State is unchanged on error.
    pub fn save(&mut self, card: &CardEntity) -> Result<(), StoreError> {
        let mut card = card.clone();
        card.normalize();
        card.validate_for_save(self.cards.values())?;

        let (id, name) = (card.id, card.name.clone());
        let previous = self.cards.insert(id, card);
        if let Err(e) = self.persist() {
            match previous {
                Some(prev) => self.cards.insert(id, prev),
                None => self.cards.remove(&id),
            };
            return Err(e);
        }

        self.active = Some(id);
        tracing::info!("Saved card {name} ({id})");
        Ok(())
    }

    /// Return the stored card, backfilled with current defaults, and mark it
    /// active.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no card has this ID.
    pub fn load(&mut self, id: CardId) -> Result<CardEntity, StoreError> {
        let card = self
            .cards
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        self.active = Some(id);
        Ok(card)
    }

    /// Remove a card.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no card has this ID, or a
    /// persistence error if the blob write fails. State is unchanged on error.
    pub fn delete(&mut self, id: CardId) -> Result<Deletion, StoreError> {
        let card = self
            .cards
            .remove(&id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if let Err(e) = self.persist() {
            self.cards.insert(id, card);
            return Err(e);
        }

        let was_active = self.active == Some(id);
        if was_active {
            self.active = None;
        }
        tracing::info!("Deleted card {} ({id})", card.name);
        Ok(Deletion { card, was_active })
    }

    /// All saved cards, sorted by name.
    #[must_use]
    pub fn list(&self) -> Vec<&CardEntity> {
        let mut cards: Vec<_> = self.cards.values().collect();
        cards.sort_by(|a, b| compare_names(&a.name, &b.name).then_with(|| a.id.cmp(&b.id)));
        cards
    }

    /// Get a saved card by ID.
    #[must_use]
    pub fn get(&self, id: CardId) -> Option<&CardEntity> {
        self.cards.get(&id)
    }

    /// Find a saved card by name, compared trimmed and case-insensitively.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&CardEntity> {
        let wanted = name.trim().to_lowercase();
        self.cards.values().find(|c| c.normalized_name() == wanted)
    }

    /// The active selection, if any.
    #[must_use]
    pub fn active(&self) -> Option<CardId> {
        self.active
    }

    /// Clear the active selection.
    pub fn clear_active(&mut self) {
        self.active = None;
    }

    /// Number of saved cards.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Whether no cards are saved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Rewrite the full snapshot, unreadable entries included. Keys are
    /// emitted in sorted order so identical collections produce identical
    /// blobs.
    fn persist(&self) -> Result<(), StoreError> {
        let mut snapshot = self.unreadable.clone();
        for (id, card) in &self.cards {
            let value = serde_json::to_value(card)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            snapshot.insert(id.to_string(), value);
        }
        let json = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.blob.set(STORE_KEY, &json)
    }
}

/// Collation used for listing: case-folded first, exact spelling as tiebreak.
fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::MemoryBlobStore;

    fn named(name: &str) -> CardEntity {
        CardEntity {
            name: name.to_string(),
            ..CardEntity::create()
        }
    }

    fn open_memory() -> (ProjectStore, Arc<MemoryBlobStore>) {
        let blob = Arc::new(MemoryBlobStore::new());
        let store = ProjectStore::open(blob.clone()).expect("open");
        (store, blob)
    }

    /// Blob store whose writes always fail.
    struct ReadOnlyBlob;

    impl BlobStore for ReadOnlyBlob {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
        }
    }

    #[test]
    fn test_save_marks_active_and_persists() {
        let (mut store, blob) = open_memory();
        let card = named("Apollo");
        store.save(&card).expect("save");

        assert_eq!(store.active(), Some(card.id));
        assert_eq!(store.len(), 1);
        let raw = blob.get(STORE_KEY).expect("get").expect("written");
        assert!(raw.contains("Apollo"));
    }

    #[test]
    fn test_name_collision_rejected() {
        let (mut store, _) = open_memory();
        store.save(&named("Foo")).expect("save");

        let err = store.save(&named("foo ")).unwrap_err();
        assert!(err.is_name_collision());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_resave_same_card_overwrites() {
        let (mut store, _) = open_memory();
        let mut card = named("Foo");
        store.save(&card).expect("save");
        card.progress = 80.0;
        store.save(&card).expect("re-save");

        assert_eq!(store.len(), 1);
        assert!((store.get(card.id).expect("present").progress - 80.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_load_sets_active() {
        let (mut store, _) = open_memory();
        let a = named("A");
        let b = named("B");
        store.save(&a).expect("save a");
        store.save(&b).expect("save b");

        let loaded = store.load(a.id).expect("load");
        assert_eq!(loaded, a);
        assert_eq!(store.active(), Some(a.id));
    }

    #[test]
    fn test_load_unknown_fails_without_changing_active() {
        let (mut store, _) = open_memory();
        let a = named("A");
        store.save(&a).expect("save");
        assert!(matches!(store.load(CardId::new()), Err(StoreError::NotFound(_))));
        assert_eq!(store.active(), Some(a.id));
    }

    #[test]
    fn test_delete_active_reports_it() {
        let (mut store, _) = open_memory();
        let a = named("A");
        let b = named("B");
        store.save(&a).expect("save a");
        store.save(&b).expect("save b");

        let gone = store.delete(a.id).expect("delete a");
        assert!(!gone.was_active);
        assert_eq!(store.active(), Some(b.id));

        let gone = store.delete(b.id).expect("delete b");
        assert!(gone.was_active);
        assert_eq!(store.active(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_list_is_sorted_by_name() {
        let (mut store, _) = open_memory();
        for name in ["zeta", "Alpha", "beta", "alpha"] {
            store.save(&named(name)).ok();
        }
        // "alpha" collides with "Alpha" and is rejected.
        let names: Vec<_> = store.list().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "beta", "zeta"]);
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let mut store = ProjectStore::open(Arc::new(ReadOnlyBlob)).expect("open");
        let card = named("Doomed");
        assert!(matches!(store.save(&card), Err(StoreError::Io(_))));
        assert!(store.is_empty());
        assert_eq!(store.active(), None);
    }

    #[test]
    fn test_reopen_reads_snapshot() {
        let (mut store, blob) = open_memory();
        let card = named("Persisted");
        store.save(&card).expect("save");

        let reopened = ProjectStore::open(blob).expect("reopen");
        assert_eq!(reopened.get(card.id), Some(&card));
        assert_eq!(reopened.active(), None);
    }

    #[test]
    fn test_unreadable_entries_survive_rewrites() {
        let blob = Arc::new(MemoryBlobStore::new());
        let good = named("Good");
        let stray = CardId::new().to_string();
        let raw = serde_json::json!({
            "not-a-uuid": { "name": "Broken" },
            good.id.to_string(): good,
            stray.clone(): "just a string",
        });
        blob.set(STORE_KEY, &raw.to_string()).expect("seed");

        let mut store = ProjectStore::open(blob.clone()).expect("open");
        assert_eq!(store.len(), 1);
        assert!(store.find_by_name("good").is_some());

        store.save(&named("Other")).expect("save");
        store.delete(good.id).expect("delete");

        let raw = blob.get(STORE_KEY).expect("get").expect("written");
        let snapshot: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(snapshot["not-a-uuid"]["name"], "Broken");
        assert_eq!(snapshot[stray.as_str()], "just a string");
        assert!(snapshot.get(good.id.to_string()).is_none());
    }

    #[test]
    fn test_card_with_bad_field_survives_unrelated_save() {
        let blob = Arc::new(MemoryBlobStore::new());
        let legacy = CardId::new();
        let raw = serde_json::json!({
            legacy.to_string(): { "name": "Legacy", "borderRadius": 6.5 },
        });
        blob.set(STORE_KEY, &raw.to_string()).expect("seed");

        let mut store = ProjectStore::open(blob.clone()).expect("open");
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(legacy).expect("decoded").name, "Legacy");

        store.save(&named("Other")).expect("save");
        let reopened = ProjectStore::open(blob).expect("reopen");
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.get(legacy).expect("kept").name, "Legacy");
    }

    #[test]
    fn test_open_rejects_garbage_blob() {
        let blob = Arc::new(MemoryBlobStore::new());
        blob.set(STORE_KEY, "[]").expect("seed");
        assert!(matches!(
            ProjectStore::open(blob),
            Err(StoreError::Serialization(_))
        ));
    }
}
