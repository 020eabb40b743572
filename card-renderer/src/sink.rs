//! Delivery targets for exported cards.

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{RenderError, RenderResult};
use crate::export::ExportArtifact;

/// Somewhere a finished artifact can be handed off.
#[async_trait]
pub trait ExportSink: Send + Sync {
    /// Short human-readable name for logs.
    fn name(&self) -> &str;

    /// Accept one artifact.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Delivery`] if the artifact was not accepted.
    async fn deliver(&self, artifact: &ExportArtifact) -> RenderResult<()>;
}

/// Keeps every delivered artifact in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    payloads: Mutex<Vec<ExportArtifact>>,
}

impl MemorySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every artifact delivered so far, oldest first.
    #[must_use]
    pub fn payloads(&self) -> Vec<ExportArtifact> {
        self.payloads
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// The most recent artifact.
    #[must_use]
    pub fn last(&self) -> Option<ExportArtifact> {
        self.payloads
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .last()
            .cloned()
    }
}

#[async_trait]
impl ExportSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn deliver(&self, artifact: &ExportArtifact) -> RenderResult<()> {
        self.payloads
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(artifact.clone());
        Ok(())
    }
}

/// Writes the artifact to a file, replacing it.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    /// Create a sink writing to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Destination path.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl ExportSink for FileSink {
    fn name(&self) -> &str {
        "file"
    }

    async fn deliver(&self, artifact: &ExportArtifact) -> RenderResult<()> {
        tokio::fs::write(&self.path, &artifact.bytes)
            .await
            .map_err(|e| RenderError::Delivery(format!("{}: {e}", self.path.display())))?;
        tracing::debug!("Wrote {} bytes to {}", artifact.bytes.len(), self.path.display());
        Ok(())
    }
}

/// Copies the artifact to the system clipboard as an image.
#[cfg(feature = "clipboard")]
#[derive(Debug, Clone, Copy, Default)]
pub struct ClipboardSink;

#[cfg(feature = "clipboard")]
#[async_trait]
impl ExportSink for ClipboardSink {
    fn name(&self) -> &str {
        "clipboard"
    }

    async fn deliver(&self, artifact: &ExportArtifact) -> RenderResult<()> {
        let rgba = image::load_from_memory(&artifact.bytes)
            .map_err(|e| RenderError::Delivery(format!("Failed to decode artifact: {e}")))?
            .to_rgba8();
        let (width, height) = rgba.dimensions();

        tokio::task::spawn_blocking(move || {
            let mut clipboard = arboard::Clipboard::new()
                .map_err(|e| RenderError::Delivery(format!("Clipboard unavailable: {e}")))?;
            clipboard
                .set_image(arboard::ImageData {
                    width: width as usize,
                    height: height as usize,
                    bytes: std::borrow::Cow::Owned(rgba.into_raw()),
                })
                .map_err(|e| RenderError::Delivery(format!("Clipboard write failed: {e}")))
        })
        .await
        .map_err(|e| RenderError::Delivery(format!("Clipboard task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact() -> ExportArtifact {
        ExportArtifact {
            mime: crate::export::PNG_MIME,
            bytes: vec![137, 80, 78, 71],
            width: 1,
            height: 1,
        }
    }

    #[tokio::test]
    async fn test_memory_sink_collects() {
        let sink = MemorySink::new();
        sink.deliver(&artifact()).await.expect("deliver");
        sink.deliver(&artifact()).await.expect("deliver");
        assert_eq!(sink.payloads().len(), 2);
        assert_eq!(sink.last(), Some(artifact()));
    }

    #[tokio::test]
    async fn test_file_sink_writes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sink = FileSink::new(dir.path().join("card.png"));
        sink.deliver(&artifact()).await.expect("deliver");
        assert_eq!(std::fs::read(sink.path()).expect("read"), artifact().bytes);
    }

    #[tokio::test]
    async fn test_file_sink_reports_delivery_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sink = FileSink::new(dir.path().join("missing").join("card.png"));
        let err = sink.deliver(&artifact()).await.unwrap_err();
        assert!(err.is_delivery());
    }
}
