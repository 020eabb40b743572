//! Card Lifecycle Integration Tests
//!
//! Tests the card flow across the public API:
//! - Save / load / delete against a file-backed store
//! - Backfill of snapshots written by older versions
//! - Normalisation properties of patches
//! - Layout invariants of the render tree

use std::sync::Arc;

use card_core::{
    build_render_tree, BlobStore, CardEntity, CardPatch, FileBlobStore, NodeRole, ProjectStore,
    Rect, Studio, Theme,
};
use proptest::prelude::*;

fn file_store(dir: &std::path::Path) -> Arc<FileBlobStore> {
    Arc::new(FileBlobStore::open(dir).expect("open blob store"))
}

// ============================================================================
// Persistence Tests
// ============================================================================

#[test]
fn test_saved_cards_survive_restart() {
    let dir = tempfile::tempdir().expect("tempdir");

    let mut card = CardEntity::create();
    card.patch(CardPatch {
        name: Some("Orbiter".into()),
        progress: Some(64.0),
        warnings: Some("Launch window is tight".into()),
        ..CardPatch::default()
    });
    card.links[0].url = "https://github.com/example/orbiter".into();

    {
        let mut store = ProjectStore::open(file_store(dir.path())).expect("open");
        store.save(&card).expect("save");
    }

    let mut store = ProjectStore::open(file_store(dir.path())).expect("reopen");
    let loaded = store.load(card.id).expect("load");
    assert_eq!(loaded, card);
    assert_eq!(store.active(), Some(card.id));
}

#[test]
fn test_load_backfills_old_snapshot() {
    let dir = tempfile::tempdir().expect("tempdir");
    let blob = file_store(dir.path());
    let id = uuid_string();
    let legacy = serde_json::json!({
        id.clone(): {
            "id": id,
            "name": "Legacy",
            "tag": "Beta",
            "progress": 140,
            "progressBarColor": { "type": "gradient", "color1": "#111111" }
        }
    });
    blob.set("project-cards-v2", &legacy.to_string())
        .expect("seed");

    let store = ProjectStore::open(blob).expect("open");
    let card = store.find_by_name("legacy").expect("present");
    let defaults = CardEntity::create();

    assert_eq!(card.tag, "Beta");
    assert!((card.progress - 100.0).abs() < f32::EPSILON);
    assert_eq!(card.progress_bar_color.color2.as_deref(), Some("#9333ea"));
    assert_eq!(card.description, defaults.description);
    assert_eq!(card.shadow_style, defaults.shadow_style);
    assert!((card.card_width - defaults.card_width).abs() < f32::EPSILON);
}

#[test]
fn test_studio_session_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");

    let saved_id = {
        let mut studio = Studio::open(file_store(dir.path())).expect("open");
        studio.current_mut().name = "Session".into();
        studio.save_current().expect("save");
        studio.set_theme(Theme::Light).expect("theme");
        studio.current().id
    };

    let mut studio = Studio::open(file_store(dir.path())).expect("reopen");
    assert_eq!(studio.theme(), Theme::Light);
    studio.load(saved_id).expect("load");
    assert_eq!(studio.current().name, "Session");
}

fn uuid_string() -> String {
    card_core::CardId::new().to_string()
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #[test]
    fn prop_patch_keeps_ranges(
        progress in prop::num::f32::ANY,
        width in prop::num::f32::ANY,
        height in prop::num::f32::ANY,
        radius in any::<u8>(),
    ) {
        let mut card = CardEntity::create();
        let id = card.id;
        card.patch(CardPatch {
            progress: Some(progress),
            card_width: Some(width),
            card_height: Some(height),
            border_radius: Some(radius),
            ..CardPatch::default()
        });

        prop_assert!((0.0..=100.0).contains(&card.progress));
        prop_assert!((24.0..=60.0).contains(&card.card_width));
        prop_assert!((20.0..=40.0).contains(&card.card_height));
        prop_assert!(card.border_radius <= 8);
        prop_assert_eq!(card.id, id);
    }

    #[test]
    fn prop_layout_stays_inside_composition(
        name in ".{0,80}",
        tag in "[a-zA-Z ]{0,60}",
        description in ".{0,400}",
        width in 24.0f32..=60.0,
        progress in 0.0f32..=100.0,
        links in 0usize..12,
    ) {
        let mut card = CardEntity::create();
        card.patch(CardPatch {
            name: Some(name),
            tag: Some(tag),
            description: Some(description),
            card_width: Some(width),
            progress: Some(progress),
            ..CardPatch::default()
        });
        for _ in 0..links {
            let id = card.add_link();
            card.update_link(id, None, Some("https://example.com".into()));
        }

        let tree = build_render_tree(&card, Theme::Dark);
        let composition = Rect::new(0.0, 0.0, tree.width, tree.height);
        let card_bounds = tree.find(NodeRole::Card).map(|n| n.bounds).expect("card");

        for node in tree.walk() {
            prop_assert!(composition.contains(&node.bounds), "{:?} escapes", node.role);
            if node.role == NodeRole::Link {
                prop_assert!(card_bounds.contains(&node.bounds));
            }
        }
        prop_assert_eq!(tree.count(NodeRole::Link), links);
    }
}
