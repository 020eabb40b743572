//! End-to-end command tests for card-studio.
//!
//! Drives the command runner against a temporary data directory and a mock
//! generative endpoint.

use std::path::Path;

use card_studio::{CardFields, Command, CommandRunner, StudioConfig, StudioError};
use card_synth::SynthConfig;
use serde_json::json;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(dir: &Path, ai: Option<&MockServer>) -> StudioConfig {
    StudioConfig {
        data_dir: dir.to_path_buf(),
        font_url: None,
        scale: 1.0,
        synth: SynthConfig {
            api_key: ai.map(|_| "test-key".to_string()),
            base_url: ai.map_or_else(|| SynthConfig::default().base_url, MockServer::uri),
            request_timeout: None,
            ..SynthConfig::default()
        },
    }
}

fn new_card(name: &str) -> Command {
    Command::New {
        fields: CardFields {
            name: Some(name.into()),
            ..CardFields::default()
        },
        idea: None,
    }
}

// ============================================================================
// Persistence Tests
// ============================================================================

#[tokio::test]
async fn test_cards_survive_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    {
        let mut runner = CommandRunner::open(config(dir.path(), None)).expect("open");
        runner.run(new_card("Orbit")).await.expect("new");
        runner.run(new_card("Atlas")).await.expect("new");
    }

    let mut runner = CommandRunner::open(config(dir.path(), None)).expect("reopen");
    let listing = runner.run(Command::List).await.expect("list");
    let names: Vec<&str> = listing
        .lines()
        .filter_map(|line| line.split("  ").nth(1))
        .collect();
    assert_eq!(names, vec!["Atlas", "Orbit"]);
}

#[tokio::test]
async fn test_delete_removes_card() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut runner = CommandRunner::open(config(dir.path(), None)).expect("open");
    runner.run(new_card("Orbit")).await.expect("new");

    let out = runner
        .run(Command::Delete {
            card: "orbit".into(),
        })
        .await
        .expect("delete");
    assert_eq!(out, "Card \"Orbit\" deleted.");
    assert_eq!(
        runner.run(Command::List).await.expect("list"),
        "No saved cards."
    );
}

// ============================================================================
// Export Tests
// ============================================================================

#[tokio::test]
async fn test_export_writes_png() {
    let dir = tempfile::tempdir().expect("tempdir");
    let target = dir.path().join("orbit.png");
    let mut runner = CommandRunner::open(config(dir.path(), None)).expect("open");
    runner.run(new_card("Orbit")).await.expect("new");

    let out = runner
        .run(Command::Export {
            card: "Orbit".into(),
            output: Some(target.clone()),
        })
        .await
        .expect("export");
    assert!(out.starts_with("Image written to"));

    let bytes = std::fs::read(&target).expect("read");
    assert_eq!(&bytes[0..4], &[137, 80, 78, 71]);
}

#[tokio::test]
async fn test_export_unknown_card() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut runner = CommandRunner::open(config(dir.path(), None)).expect("open");
    let err = runner
        .run(Command::Export {
            card: "Ghost".into(),
            output: Some(dir.path().join("ghost.png")),
        })
        .await
        .expect_err("unknown");
    assert!(matches!(err, StudioError::UnknownCard(_)));
}

// ============================================================================
// Generation Tests
// ============================================================================

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn test_generate_updates_saved_card() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r":generateContent$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{
                "text": "```json\n{\"name\":\"PawPath\",\"tag\":\"MVP\",\"description\":\"Connects dog walkers with owners.\"}\n```"
            }]}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let mut runner = CommandRunner::open(config(dir.path(), Some(&server))).expect("open");
    runner.run(new_card("Walkies")).await.expect("new");

    let out = runner
        .run(Command::Generate {
            card: "Walkies".into(),
            idea: "dog walking marketplace".into(),
        })
        .await
        .expect("generate");
    assert_eq!(out, "Content generated with AI!\nCard \"PawPath\" saved!");

    let shown = runner
        .run(Command::Show {
            card: "PawPath".into(),
        })
        .await
        .expect("show");
    let card: serde_json::Value = serde_json::from_str(&shown).expect("json");
    assert_eq!(card["tag"], "MVP");
    assert_eq!(card["description"], "Connects dog walkers with owners.");
}

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn test_new_with_idea_lets_flags_win() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{
                "text": "{\"name\":\"Generated\",\"tag\":\"AI\",\"description\":\"From the model.\"}"
            }]}}]
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let mut runner = CommandRunner::open(config(dir.path(), Some(&server))).expect("open");
    runner
        .run(Command::New {
            fields: CardFields {
                tag: Some("Beta".into()),
                ..CardFields::default()
            },
            idea: Some("anything".into()),
        })
        .await
        .expect("new");

    let card = runner.studio().current();
    assert_eq!(card.name, "Generated");
    assert_eq!(card.tag, "Beta");
    assert_eq!(card.description, "From the model.");
}
