//! Render tree to SVG serialisation.
//!
//! Definition IDs are assigned from a counter in paint order, so the same
//! tree always serialises to the same document.

use std::fmt::Write;

use card_core::style::{Color, Fill, GradientDirection, ShadowSpec};
use card_core::tree::{NodeKind, RenderNode, RenderTree, Stroke, TextAnchor, TextStyle};

/// Share of the font size between the top of the em box and the baseline.
const ASCENT: f32 = 0.8;

/// Document-level options.
#[derive(Debug, Clone, Default)]
pub struct SvgOptions {
    /// Output scale factor; the viewBox stays in tree units.
    pub scale: f32,
    /// Opaque backdrop, or `None` for a transparent one.
    pub background: Option<Color>,
    /// Font CSS embedded as a `<style>` block. Empty means none.
    pub font_css: String,
}

/// Pixel size of the document for `tree` at `scale`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn output_dimensions(tree: &RenderTree, scale: f32) -> (u32, u32) {
    let scale = if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    };
    let w = (tree.width * scale).ceil().max(1.0) as u32;
    let h = (tree.height * scale).ceil().max(1.0) as u32;
    (w, h)
}

/// Serialise `tree` to a standalone SVG document.
#[must_use]
pub fn render_svg(tree: &RenderTree, options: &SvgOptions) -> String {
    let (out_w, out_h) = output_dimensions(tree, options.scale);
    let mut writer = SvgWriter::default();

    let _ = write!(
        writer.out,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{out_w}\" height=\"{out_h}\" viewBox=\"0 0 {} {}\" font-family=\"{}\">",
        tree.width,
        tree.height,
        escape_xml(&tree.font),
    );

    if !options.font_css.trim().is_empty() {
        let css = options.font_css.replace("]]>", "]]]]><![CDATA[>");
        let _ = write!(writer.out, "<defs><style><![CDATA[{css}]]></style></defs>");
    }

    if let Some(bg) = options.background {
        let _ = write!(
            writer.out,
            "<rect width=\"100%\" height=\"100%\" fill=\"{}\" fill-opacity=\"{}\"/>",
            bg.to_hex(),
            bg.a,
        );
    }

    for node in &tree.nodes {
        writer.node(node);
    }

    writer.out.push_str("</svg>");
    writer.out
}

#[derive(Default)]
struct SvgWriter {
    out: String,
    next_id: usize,
}

impl SvgWriter {
    fn id(&mut self, prefix: &str) -> String {
        let id = format!("{prefix}{}", self.next_id);
        self.next_id += 1;
        id
    }

    fn node(&mut self, node: &RenderNode) {
        let b = node.bounds;
        match &node.kind {
            NodeKind::Group {
                clip_radius,
                children,
            } => {
                if let Some(radius) = clip_radius {
                    let id = self.id("clip");
                    let rx = radius.min(b.width / 2.0).min(b.height / 2.0).max(0.0);
                    let _ = write!(
                        self.out,
                        "<defs><clipPath id=\"{id}\"><rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" rx=\"{rx}\"/></clipPath></defs><g clip-path=\"url(#{id})\">",
                        b.x, b.y, b.width, b.height,
                    );
                } else {
                    self.out.push_str("<g>");
                }
                for child in children {
                    self.node(child);
                }
                self.out.push_str("</g>");
            }

            NodeKind::Shape {
                fill,
                corner_radius,
                stroke,
                shadow,
            } => self.shape(node, fill, *corner_radius, stroke.as_ref(), shadow.as_ref()),

            NodeKind::Text { lines, style } => self.text(node, lines, style),

            NodeKind::Image { href } => {
                let _ = write!(
                    self.out,
                    "<image x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" preserveAspectRatio=\"xMidYMid slice\" href=\"{}\"/>",
                    b.x,
                    b.y,
                    b.width,
                    b.height,
                    escape_xml(href),
                );
            }

            NodeKind::Icon { path, color } => {
                let scale = b.width.min(b.height) / 24.0;
                let _ = write!(
                    self.out,
                    "<g transform=\"translate({},{}) scale({scale})\"><path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-opacity=\"{}\" stroke-width=\"2\" stroke-linecap=\"round\" stroke-linejoin=\"round\"/></g>",
                    b.x,
                    b.y,
                    escape_xml(path),
                    color.to_hex(),
                    color.a,
                );
            }
        }
    }

    fn shape(
        &mut self,
        node: &RenderNode,
        fill: &Fill,
        corner_radius: f32,
        stroke: Option<&Stroke>,
        shadow: Option<&ShadowSpec>,
    ) {
        let b = node.bounds;
        if b.width <= 0.0 || b.height <= 0.0 {
            return;
        }

        let paint = self.paint(fill);
        let filter = shadow.map(|s| self.shadow_filter(s));
        let rx = corner_radius.min(b.width / 2.0).min(b.height / 2.0).max(0.0);

        let _ = write!(
            self.out,
            "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" rx=\"{rx}\" {paint}",
            b.x, b.y, b.width, b.height,
        );
        if let Some(stroke) = stroke {
            let _ = write!(
                self.out,
                " stroke=\"{}\" stroke-opacity=\"{}\" stroke-width=\"{}\"",
                stroke.color.to_hex(),
                stroke.color.a,
                stroke.width,
            );
        }
        if let Some(id) = filter {
            let _ = write!(self.out, " filter=\"url(#{id})\"");
        }
        self.out.push_str("/>");
    }

    /// Emit any definitions `fill` needs and return its paint attributes.
    fn paint(&mut self, fill: &Fill) -> String {
        match fill {
            Fill::Solid(color) => {
                format!("fill=\"{}\" fill-opacity=\"{}\"", color.to_hex(), color.a)
            }
            Fill::LinearGradient {
                from,
                to,
                direction,
            } => {
                let id = self.id("grad");
                let (x1, y1, x2, y2) = match direction {
                    GradientDirection::LeftToRight => (0, 0, 1, 0),
                    GradientDirection::BottomToTop => (0, 1, 0, 0),
                };
                let _ = write!(
                    self.out,
                    "<defs><linearGradient id=\"{id}\" x1=\"{x1}\" y1=\"{y1}\" x2=\"{x2}\" y2=\"{y2}\"><stop offset=\"0\" stop-color=\"{}\" stop-opacity=\"{}\"/><stop offset=\"1\" stop-color=\"{}\" stop-opacity=\"{}\"/></linearGradient></defs>",
                    from.to_hex(),
                    from.a,
                    to.to_hex(),
                    to.a,
                );
                format!("fill=\"url(#{id})\"")
            }
        }
    }

    fn shadow_filter(&mut self, shadow: &ShadowSpec) -> String {
        let id = self.id("shadow");
        let deviation = shadow.blur / 2.0;
        let color = shadow.color.to_hex();
        let opacity = shadow.color.a;

        if shadow.inset {
            let _ = write!(
                self.out,
                "<defs><filter id=\"{id}\" x=\"0\" y=\"0\" width=\"1\" height=\"1\"><feFlood flood-color=\"{color}\" flood-opacity=\"{opacity}\"/><feComposite in2=\"SourceAlpha\" operator=\"out\"/><feGaussianBlur stdDeviation=\"{deviation}\"/><feOffset dy=\"{}\" result=\"inner\"/><feComposite in=\"inner\" in2=\"SourceAlpha\" operator=\"in\" result=\"shadow\"/><feMerge><feMergeNode in=\"SourceGraphic\"/><feMergeNode in=\"shadow\"/></feMerge></filter></defs>",
                shadow.offset_y,
            );
        } else {
            let _ = write!(
                self.out,
                "<defs><filter id=\"{id}\" x=\"-50%\" y=\"-50%\" width=\"200%\" height=\"200%\"><feDropShadow dx=\"0\" dy=\"{}\" stdDeviation=\"{deviation}\" flood-color=\"{color}\" flood-opacity=\"{opacity}\"/></filter></defs>",
                shadow.offset_y,
            );
        }
        id
    }

    #[allow(clippy::cast_precision_loss)]
    fn text(&mut self, node: &RenderNode, lines: &[String], style: &TextStyle) {
        if lines.iter().all(|l| l.trim().is_empty()) {
            return;
        }
        let b = node.bounds;
        let (x, anchor) = match style.anchor {
            TextAnchor::Start => (b.x, "start"),
            TextAnchor::Middle => (b.x + b.width / 2.0, "middle"),
            TextAnchor::End => (b.right(), "end"),
        };

        let _ = write!(
            self.out,
            "<text font-size=\"{}\" font-weight=\"{}\" fill=\"{}\" fill-opacity=\"{}\" text-anchor=\"{anchor}\">",
            style.size,
            style.weight,
            style.color.to_hex(),
            style.color.a,
        );
        let lead = (style.line_height - style.size) / 2.0 + style.size * ASCENT;
        for (i, line) in lines.iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            let y = b.y + i as f32 * style.line_height + lead;
            let _ = write!(
                self.out,
                "<tspan x=\"{x}\" y=\"{y}\">{}</tspan>",
                escape_xml(line)
            );
        }
        self.out.push_str("</text>");
    }
}

/// Escape special XML characters.
#[must_use]
pub fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
