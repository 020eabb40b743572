//! The studio context: current card, saved cards, theme and notifications.
//!
//! Everything the user can do to their cards goes through [`Studio`], which
//! owns the state explicitly instead of keeping it in process globals.

use std::sync::Arc;

use crate::blob::BlobStore;
use crate::builder::build_render_tree;
use crate::notify::{Notification, Notifier};
use crate::store::{ProjectStore, StoreError};
use crate::theme::Theme;
use crate::tree::RenderTree;
use crate::{CardEntity, CardId, CardPatch};

/// Owned application state.
pub struct Studio {
    blob: Arc<dyn BlobStore>,
    store: ProjectStore,
    current: CardEntity,
    theme: Theme,
    notifier: Notifier,
}

impl std::fmt::Debug for Studio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Studio")
            .field("store", &self.store)
            .field("current", &self.current.id)
            .field("theme", &self.theme)
            .finish_non_exhaustive()
    }
}

impl Studio {
    /// Load the theme preference and saved cards from `blob`, starting with a
    /// fresh card.
    ///
    /// # Errors
    ///
    /// Returns an error if the saved card collection cannot be read.
    pub fn open(blob: Arc<dyn BlobStore>) -> Result<Self, StoreError> {
        let theme = Theme::load(blob.as_ref());
        let store = ProjectStore::open(Arc::clone(&blob))?;
        Ok(Self {
            blob,
            store,
            current: CardEntity::create(),
            theme,
            notifier: Notifier::new(),
        })
    }

    /// The card being edited.
    #[must_use]
    pub fn current(&self) -> &CardEntity {
        &self.current
    }

    /// Mutable access to the card being edited. Out-of-range values written
    /// here are clamped when the card is saved.
    pub fn current_mut(&mut self) -> &mut CardEntity {
        &mut self.current
    }

    /// The saved cards.
    #[must_use]
    pub fn store(&self) -> &ProjectStore {
        &self.store
    }

    /// The active theme.
    #[must_use]
    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// The visible notification, if any.
    pub fn notification(&mut self) -> Option<&Notification> {
        self.notifier.current()
    }

    /// Show a notification.
    pub fn notify(&mut self, notification: Notification) {
        self.notifier.post(notification);
    }

    /// Lay out the current card for the active theme.
    #[must_use]
    pub fn render_tree(&self) -> RenderTree {
        build_render_tree(&self.current, self.theme)
    }

    /// Merge a partial update into the current card.
    pub fn apply_patch(&mut self, patch: CardPatch) {
        self.current.patch(patch);
    }

    /// Replace the current card with a fresh one and clear the selection.
    pub fn new_card(&mut self) {
        self.current = CardEntity::create();
        self.store.clear_active();
    }

    /// Reset every field of the current card except its ID and name.
    pub fn reset_card(&mut self) {
        self.current = self.current.reset_fields();
    }

    /// Save the current card.
    ///
    /// # Errors
    ///
    /// Returns an error on a name collision or a failed write. The
    /// corresponding error notification is posted either way.
    pub fn save_current(&mut self) -> Result<(), StoreError> {
        self.current.normalize();
        match self.store.save(&self.current) {
            Ok(()) => {
                let message = format!("Card \"{}\" saved!", self.current.name);
                self.notify(Notification::success(message));
                Ok(())
            }
            Err(e) => {
                self.notify(Notification::error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Make a saved card the current one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no card has this ID.
    pub fn load(&mut self, id: CardId) -> Result<(), StoreError> {
        self.current = self.store.load(id)?;
        Ok(())
    }

    /// Delete a saved card. Deleting the active card also starts a new one.
    ///
    /// # Errors
    ///
    /// Returns an error if no card has this ID or the write fails.
    pub fn delete(&mut self, id: CardId) -> Result<(), StoreError> {
        let deletion = self.store.delete(id)?;
        let message = format!("Card \"{}\" deleted.", deletion.card.name);
        self.notify(Notification::success(message));
        if deletion.was_active {
            self.new_card();
        }
        Ok(())
    }

    /// Switch between light and dark, persisting the preference.
    ///
    /// # Errors
    ///
    /// Returns an error if the preference cannot be written; the theme is
    /// left unchanged in that case.
    pub fn toggle_theme(&mut self) -> Result<Theme, StoreError> {
        self.set_theme(self.theme.toggled())
    }

    /// Set and persist the theme.
    ///
    /// # Errors
    ///
    /// Returns an error if the preference cannot be written; the theme is
    /// left unchanged in that case.
    pub fn set_theme(&mut self, theme: Theme) -> Result<Theme, StoreError> {
        theme.save(self.blob.as_ref())?;
        self.theme = theme;
        tracing::debug!("Theme set to {theme}");
        Ok(theme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::MemoryBlobStore;

    fn studio() -> (Studio, Arc<MemoryBlobStore>) {
        let blob = Arc::new(MemoryBlobStore::new());
        let studio = Studio::open(blob.clone()).expect("open");
        (studio, blob)
    }

    #[test]
    fn test_save_posts_success() {
        let (mut studio, _) = studio();
        studio.apply_patch(CardPatch {
            name: Some("Apollo".into()),
            ..CardPatch::default()
        });
        studio.save_current().expect("save");

        let note = studio.notification().expect("notification");
        assert_eq!(note.message, "Card \"Apollo\" saved!");
        assert_eq!(studio.store().active(), Some(studio.current().id));
    }

    #[test]
    fn test_collision_posts_error_and_keeps_store() {
        let (mut studio, _) = studio();
        studio.save_current().expect("first save");
        studio.new_card();
        let err = studio.save_current().unwrap_err();
        assert!(err.is_name_collision());

        let note = studio.notification().expect("notification");
        assert!(note.is_error());
        assert_eq!(
            note.message,
            "A card named \"New Awesome Project\" already exists. Please use a unique name."
        );
        assert_eq!(studio.store().len(), 1);
    }

    #[test]
    fn test_delete_active_starts_new_card() {
        let (mut studio, _) = studio();
        let id = studio.current().id;
        studio.save_current().expect("save");
        studio.delete(id).expect("delete");

        assert_ne!(studio.current().id, id);
        assert_eq!(studio.store().active(), None);
        assert_eq!(
            studio.notification().map(|n| n.message.clone()),
            Some("Card \"New Awesome Project\" deleted.".to_string())
        );
    }

    #[test]
    fn test_delete_other_keeps_current() {
        let (mut studio, _) = studio();
        let first = studio.current().id;
        studio.save_current().expect("save first");
        studio.new_card();
        studio.current_mut().name = "Second".into();
        studio.save_current().expect("save second");
        let second = studio.current().id;

        studio.delete(first).expect("delete");
        assert_eq!(studio.current().id, second);
    }

    #[test]
    fn test_reset_keeps_id_and_name() {
        let (mut studio, _) = studio();
        studio.current_mut().name = "Keep".into();
        studio.current_mut().progress = 90.0;
        let id = studio.current().id;
        studio.reset_card();

        assert_eq!(studio.current().id, id);
        assert_eq!(studio.current().name, "Keep");
        assert!((studio.current().progress - 25.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_theme_toggle_persists() {
        let (mut studio, blob) = studio();
        assert_eq!(studio.theme(), Theme::Dark);
        assert_eq!(studio.toggle_theme().expect("toggle"), Theme::Light);

        let reopened = Studio::open(blob).expect("reopen");
        assert_eq!(reopened.theme(), Theme::Light);
    }

    #[test]
    fn test_save_clamps_direct_edits() {
        let (mut studio, blob) = studio();
        studio.current_mut().progress = 150.0;
        studio.current_mut().border_radius = 200;
        let id = studio.current().id;
        studio.save_current().expect("save");

        let stored = studio.store().get(id).expect("stored");
        assert!((stored.progress - 100.0).abs() < f32::EPSILON);
        assert_eq!(stored.border_radius, 8);
        assert_eq!(studio.current(), stored);

        let raw = blob.get(crate::store::STORE_KEY).expect("get").expect("written");
        let snapshot: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(snapshot[id.to_string()]["progress"], 100.0);
        assert_eq!(snapshot[id.to_string()]["borderRadius"], 8);

        let mut reopened = Studio::open(blob).expect("reopen");
        reopened.load(id).expect("load");
        assert_eq!(reopened.current(), studio.current());
    }

    #[test]
    fn test_load_replaces_current() {
        let (mut studio, _) = studio();
        studio.current_mut().name = "Saved".into();
        let id = studio.current().id;
        studio.save_current().expect("save");
        studio.new_card();
        studio.load(id).expect("load");
        assert_eq!(studio.current().name, "Saved");
        assert_eq!(studio.store().active(), Some(id));
    }
}
