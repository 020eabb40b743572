//! # Card Renderer
//!
//! Turns a card's render tree into a PNG and hands it to a sink.
//!
//! ## Export Pipeline
//!
//! ```text
//! ┌──────────────┬──────────────┬──────────────┐
//! │ Font CSS +   │ SVG → resvg  │ Sink         │
//! │ font files   │ → PNG        │ (clipboard,  │
//! │ (best effort)│              │  file, mem)  │
//! └──────────────┴──────────────┴──────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod export;
pub mod fonts;
pub mod image;
pub mod pipeline;
pub mod sink;
pub mod svg;

pub use error::{RenderError, RenderResult};
pub use export::{CardExporter, ExportArtifact, ExportConfig, PNG_MIME};
pub use fonts::{FontBundle, FontFetcher, DEFAULT_FONT_CSS_URL};
pub use pipeline::{export_notification, ExportPipeline, ExportState};
#[cfg(feature = "clipboard")]
pub use sink::ClipboardSink;
pub use sink::{ExportSink, FileSink, MemorySink};

/// Card renderer version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
