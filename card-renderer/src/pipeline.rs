//! The export state machine: fetch fonts, rasterise, deliver.
//!
//! ```text
//! Idle ─▶ FetchingFonts ─▶ Rasterizing ─▶ Delivering ─▶ Idle
//!   │            (any hard failure)            │
//!   └──────────────▶ Failed ─▶ Idle ◀──────────┘
//! ```
//!
//! Font fetching never fails the export. Capture and delivery failures do.
//! At most one export runs at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use card_core::{Notification, RenderTree};
use reqwest::Client;

use crate::error::{RenderError, RenderResult};
use crate::export::{CardExporter, ExportArtifact};
use crate::fonts::{FontBundle, FontFetcher};
use crate::image::inline_image;
use crate::sink::ExportSink;

/// Named stages of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportState {
    /// Nothing running.
    Idle,
    /// Fetching the font stylesheet and font files.
    FetchingFonts,
    /// Inlining images and rasterising.
    Rasterizing,
    /// Handing the artifact to the sink.
    Delivering,
    /// A hard failure occurred.
    Failed,
}

/// Runs exports one at a time and records every state transition.
pub struct ExportPipeline {
    exporter: CardExporter,
    fonts: Option<FontFetcher>,
    client: Client,
    sink: Arc<dyn ExportSink>,
    busy: AtomicBool,
    state: Mutex<ExportState>,
    transitions: Mutex<Vec<ExportState>>,
}

impl std::fmt::Debug for ExportPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportPipeline")
            .field("exporter", &self.exporter)
            .field("fonts", &self.fonts.as_ref().map(FontFetcher::css_url))
            .field("sink", &self.sink.name())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Clears the busy flag when an export ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ExportPipeline {
    /// Create a pipeline delivering to `sink`. Without a font fetcher the
    /// export uses only installed fonts.
    #[must_use]
    pub fn new(
        exporter: CardExporter,
        fonts: Option<FontFetcher>,
        client: Client,
        sink: Arc<dyn ExportSink>,
    ) -> Self {
        Self {
            exporter,
            fonts,
            client,
            sink,
            busy: AtomicBool::new(false),
            state: Mutex::new(ExportState::Idle),
            transitions: Mutex::new(Vec::new()),
        }
    }

    /// Current stage.
    #[must_use]
    pub fn state(&self) -> ExportState {
        *self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Stages entered by the most recent export, in order.
    #[must_use]
    pub fn transitions(&self) -> Vec<ExportState> {
        self.transitions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Whether an export is running.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Export `tree` and deliver it to the sink.
    ///
    /// # Errors
    ///
    /// - [`RenderError::Busy`] if another export is running; nothing else
    ///   happens in that case.
    /// - [`RenderError::MissingTarget`] if `tree` is `None`.
    /// - [`RenderError::Capture`] if rasterisation fails.
    /// - [`RenderError::Delivery`] if the sink rejects the artifact.
    pub async fn export(&self, tree: Option<&RenderTree>) -> RenderResult<ExportArtifact> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(RenderError::Busy);
        }
        let _guard = BusyGuard(&self.busy);

        self.transitions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();

        let result = self.run(tree).await;
        if let Err(e) = &result {
            tracing::warn!("Export failed: {e}");
            self.enter(ExportState::Failed);
        }
        self.enter(ExportState::Idle);
        result
    }

    async fn run(&self, tree: Option<&RenderTree>) -> RenderResult<ExportArtifact> {
        let mut tree = tree.cloned().ok_or(RenderError::MissingTarget)?;

        self.enter(ExportState::FetchingFonts);
        let fonts = match &self.fonts {
            Some(fetcher) => fetcher.fetch_bundle().await,
            None => FontBundle::default(),
        };
        if fonts.css.is_empty() {
            tracing::debug!("Rasterising without embedded font CSS");
        }

        self.enter(ExportState::Rasterizing);
        self.inline_images(&mut tree).await;
        let exporter = self.exporter.clone();
        let artifact = tokio::task::spawn_blocking(move || exporter.render_to_png(&tree, &fonts))
            .await
            .map_err(|e| RenderError::Capture(format!("Rasteriser task failed: {e}")))??;

        self.enter(ExportState::Delivering);
        self.sink.deliver(&artifact).await?;

        tracing::info!(
            "Exported {}x{} card ({} bytes) to {}",
            artifact.width,
            artifact.height,
            artifact.bytes.len(),
            self.sink.name()
        );
        Ok(artifact)
    }

    /// Replace every image reference with a data URI, dropping images that
    /// cannot be loaded.
    async fn inline_images(&self, tree: &mut RenderTree) {
        let mut inlined = std::collections::HashMap::new();
        for href in tree.image_hrefs() {
            if inlined.contains_key(href) {
                continue;
            }
            let data = match inline_image(&self.client, href).await {
                Ok(uri) => Some(uri),
                Err(e) => {
                    tracing::warn!("Hiding image {href}: {e}");
                    None
                }
            };
            inlined.insert(href.to_string(), data);
        }

        tree.retain_images(&mut |href| inlined.get(href).is_some_and(Option::is_some));
        tree.map_images(&mut |href| inlined.get(href).cloned().flatten());
    }

    fn enter(&self, next: ExportState) {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        tracing::debug!("Export state {:?} -> {next:?}", *state);
        *state = next;
        self.transitions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(next);
    }
}

/// The user-facing notification for an export outcome.
#[must_use]
pub fn export_notification<T>(result: &RenderResult<T>) -> Notification {
    match result {
        Ok(_) => Notification::success("Image copied to clipboard!"),
        Err(RenderError::MissingTarget) => Notification::error("Error: Card element not found."),
        Err(_) => Notification::error("Failed to copy image."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ExportConfig;
    use crate::sink::MemorySink;
    use card_core::{build_render_tree, CardEntity, Theme};

    fn pipeline(sink: Arc<dyn ExportSink>) -> ExportPipeline {
        ExportPipeline::new(
            CardExporter::new(ExportConfig {
                system_fonts: false,
                ..ExportConfig::default()
            }),
            None,
            Client::new(),
            sink,
        )
    }

    struct RejectingSink;

    #[async_trait::async_trait]
    impl ExportSink for RejectingSink {
        fn name(&self) -> &str {
            "rejecting"
        }

        async fn deliver(&self, _artifact: &ExportArtifact) -> RenderResult<()> {
            Err(RenderError::Delivery("permission denied".into()))
        }
    }

    #[tokio::test]
    async fn test_successful_export_transitions() {
        let sink = Arc::new(MemorySink::new());
        let pipeline = pipeline(sink.clone());
        let tree = build_render_tree(&CardEntity::create(), Theme::Dark);

        let result = pipeline.export(Some(&tree)).await;
        assert!(result.is_ok());
        assert_eq!(
            pipeline.transitions(),
            vec![
                ExportState::FetchingFonts,
                ExportState::Rasterizing,
                ExportState::Delivering,
                ExportState::Idle,
            ]
        );
        assert_eq!(pipeline.state(), ExportState::Idle);
        assert!(!pipeline.is_busy());
        assert_eq!(sink.payloads().len(), 1);
        assert_eq!(
            export_notification(&result).message,
            "Image copied to clipboard!"
        );
    }

    #[tokio::test]
    async fn test_missing_target_fails_without_stages() {
        let sink = Arc::new(MemorySink::new());
        let pipeline = pipeline(sink.clone());

        let result = pipeline.export(None).await;
        assert!(matches!(result, Err(RenderError::MissingTarget)));
        assert_eq!(
            pipeline.transitions(),
            vec![ExportState::Failed, ExportState::Idle]
        );
        assert!(sink.payloads().is_empty());
        let note = export_notification(&result);
        assert!(note.is_error());
        assert_eq!(note.message, "Error: Card element not found.");
    }

    #[tokio::test]
    async fn test_delivery_failure_is_hard() {
        let pipeline = pipeline(Arc::new(RejectingSink));
        let tree = build_render_tree(&CardEntity::create(), Theme::Dark);

        let result = pipeline.export(Some(&tree)).await;
        assert!(result.as_ref().is_err_and(RenderError::is_delivery));
        assert_eq!(
            pipeline.transitions(),
            vec![
                ExportState::FetchingFonts,
                ExportState::Rasterizing,
                ExportState::Delivering,
                ExportState::Failed,
                ExportState::Idle,
            ]
        );
        assert_eq!(export_notification(&result).message, "Failed to copy image.");
        assert!(!pipeline.is_busy());
    }

    /// Sink that holds delivery until released.
    #[derive(Default)]
    struct GatedSink {
        delivering: tokio::sync::Notify,
        release: tokio::sync::Notify,
    }

    #[async_trait::async_trait]
    impl ExportSink for GatedSink {
        fn name(&self) -> &str {
            "gated"
        }

        async fn deliver(&self, _artifact: &ExportArtifact) -> RenderResult<()> {
            self.delivering.notify_one();
            self.release.notified().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_second_export_while_busy_is_rejected() {
        let sink = Arc::new(GatedSink::default());
        let pipeline = pipeline(sink.clone());
        let tree = build_render_tree(&CardEntity::create(), Theme::Dark);

        let first = pipeline.export(Some(&tree));
        let second = async {
            sink.delivering.notified().await;
            let rejected = pipeline.export(Some(&tree)).await;
            assert!(pipeline.is_busy());
            assert_eq!(pipeline.state(), ExportState::Delivering);
            sink.release.notify_one();
            rejected
        };
        let (first, second) = tokio::join!(first, second);

        assert!(first.is_ok());
        assert!(matches!(second, Err(RenderError::Busy)));
        assert_eq!(
            pipeline.transitions(),
            vec![
                ExportState::FetchingFonts,
                ExportState::Rasterizing,
                ExportState::Delivering,
                ExportState::Idle,
            ]
        );
        assert!(!pipeline.is_busy());

        // The guard is released once the first export ends.
        sink.release.notify_one();
        assert!(pipeline.export(Some(&tree)).await.is_ok());
    }

    #[tokio::test]
    async fn test_unloadable_banner_is_hidden() {
        let sink = Arc::new(MemorySink::new());
        let pipeline = pipeline(sink.clone());
        let mut card = CardEntity::create();
        card.image_url = Some("/no/such/banner.png".into());
        let tree = build_render_tree(&card, Theme::Dark);

        pipeline.export(Some(&tree)).await.expect("export");
        assert_eq!(sink.payloads().len(), 1);
    }
}
