//! Render tree export to PNG.
//!
//! Renders a [`RenderTree`] to PNG using an SVG intermediate representation
//! and the resvg/tiny-skia rasterization pipeline.

use card_core::style::Color;
use card_core::RenderTree;

use crate::error::{RenderError, RenderResult};
use crate::fonts::FontBundle;
use crate::svg::{output_dimensions, render_svg, SvgOptions};

/// Configuration for card export.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Scale factor (e.g. 2.0 for retina).
    pub scale: f32,
    /// Backdrop colour, or `None` for a transparent backdrop.
    pub background: Option<Color>,
    /// Whether installed system fonts are available to the rasteriser in
    /// addition to fetched ones.
    pub system_fonts: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            scale: 1.0,
            background: None,
            system_fonts: true,
        }
    }
}

/// A rasterised card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    /// MIME type of `bytes`.
    pub mime: &'static str,
    /// Encoded image.
    pub bytes: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// MIME type of exported artifacts.
pub const PNG_MIME: &str = "image/png";

/// Exports a [`RenderTree`] to SVG or PNG.
#[derive(Debug, Clone, Default)]
pub struct CardExporter {
    config: ExportConfig,
}

impl CardExporter {
    /// Create a new exporter with the given configuration.
    #[must_use]
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    /// Create an exporter with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(ExportConfig::default())
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Export the tree to an SVG string with `font_css` embedded.
    #[must_use]
    pub fn render_to_svg(&self, tree: &RenderTree, font_css: &str) -> String {
        render_svg(
            tree,
            &SvgOptions {
                scale: self.config.scale,
                background: self.config.background,
                font_css: font_css.to_string(),
            },
        )
    }

    /// Export the tree to a PNG artifact.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Capture`] if rendering or encoding fails.
    pub fn render_to_png(&self, tree: &RenderTree, fonts: &FontBundle) -> RenderResult<ExportArtifact> {
        let svg_string = self.render_to_svg(tree, &fonts.css);
        let pixmap = self.rasterize_svg(&svg_string, &fonts.faces)?;
        let (width, height) = (pixmap.width(), pixmap.height());

        let bytes = pixmap
            .encode_png()
            .map_err(|e| RenderError::Capture(format!("PNG encoding failed: {e}")))?;

        Ok(ExportArtifact {
            mime: PNG_MIME,
            bytes,
            width,
            height,
        })
    }

    /// Expected pixel size of the artifact for `tree`.
    #[must_use]
    pub fn output_dimensions(&self, tree: &RenderTree) -> (u32, u32) {
        output_dimensions(tree, self.config.scale)
    }

    /// Rasterize an SVG string to a tiny-skia Pixmap.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn rasterize_svg(&self, svg_string: &str, faces: &[Vec<u8>]) -> RenderResult<tiny_skia::Pixmap> {
        let mut opt = usvg::Options::default();
        {
            let fontdb = opt.fontdb_mut();
            if self.config.system_fonts {
                fontdb.load_system_fonts();
            }
            for face in faces {
                fontdb.load_font_data(face.clone());
            }
        }

        let tree = usvg::Tree::from_str(svg_string, &opt)
            .map_err(|e| RenderError::Capture(format!("SVG parsing failed: {e}")))?;

        let px_w = tree.size().width().ceil() as u32;
        let px_h = tree.size().height().ceil() as u32;

        let mut pixmap = tiny_skia::Pixmap::new(px_w.max(1), px_h.max(1))
            .ok_or_else(|| RenderError::Capture("Failed to create pixmap".to_string()))?;

        resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

        Ok(pixmap)
    }
}
