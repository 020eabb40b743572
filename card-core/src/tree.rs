//! Render tree - the laid-out visual description of a card.
//!
//! All coordinates are absolute pixels in the composition's coordinate space,
//! with the origin at the top-left of the padded bounding box.

use serde::{Deserialize, Serialize};

use crate::style::{Color, Fill, ShadowSpec};

/// Axis-aligned rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl Rect {
    /// Create a rectangle.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge.
    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge.
    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Whether `other` lies entirely inside this rectangle.
    #[must_use]
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

/// What part of the card a node draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeRole {
    /// Card surface, carrying the shadow.
    Card,
    /// Clipped card content.
    CardContent,
    /// Banner region.
    Banner,
    /// Banner picture.
    BannerImage,
    /// Darkening gradient over the banner.
    BannerOverlay,
    /// Project name.
    Title,
    /// Health indicator pill.
    Meteo,
    /// Body text.
    Description,
    /// "Progress" label and percentage.
    ProgressLabel,
    /// Progress bar background.
    ProgressTrack,
    /// Progress bar fill.
    ProgressFill,
    /// Warnings block.
    Warnings,
    /// Links footer.
    LinksRow,
    /// A single link icon.
    Link,
    /// Tag badge overlay.
    TagBadge,
    /// Anything without a role of its own.
    Decoration,
}

/// Horizontal text alignment relative to the node's bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextAnchor {
    /// Left-aligned.
    #[default]
    Start,
    /// Centred.
    Middle,
    /// Right-aligned.
    End,
}

/// Text appearance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    /// Font size in pixels.
    pub size: f32,
    /// CSS font weight.
    pub weight: u16,
    /// Fill colour.
    pub color: Color,
    /// Distance between baselines in pixels.
    pub line_height: f32,
    /// Alignment within the bounds.
    pub anchor: TextAnchor,
}

/// A shape outline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    /// Line colour.
    pub color: Color,
    /// Line width in pixels.
    pub width: f32,
}

/// The content of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Container for child nodes.
    Group {
        /// Corner radius of the clip region, or `None` for no clipping.
        clip_radius: Option<f32>,
        /// Children, painted in order.
        children: Vec<RenderNode>,
    },
    /// Filled rounded rectangle.
    Shape {
        /// Paint.
        fill: Fill,
        /// Corner radius in pixels.
        corner_radius: f32,
        /// Optional outline.
        stroke: Option<Stroke>,
        /// Optional shadow.
        shadow: Option<ShadowSpec>,
    },
    /// Pre-wrapped text, one entry per line.
    Text {
        /// Lines, top to bottom.
        lines: Vec<String>,
        /// Appearance.
        style: TextStyle,
    },
    /// Raster image scaled to cover the bounds.
    Image {
        /// Image reference (URL or data URI).
        href: String,
    },
    /// Stroked 24x24 icon scaled into the bounds.
    Icon {
        /// SVG path data.
        path: String,
        /// Stroke colour.
        color: Color,
    },
}

/// A node in the render tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderNode {
    /// What the node draws.
    pub role: NodeRole,
    /// Where it draws it.
    pub bounds: Rect,
    /// How it draws it.
    pub kind: NodeKind,
}

impl RenderNode {
    /// Create a node.
    #[must_use]
    pub fn new(role: NodeRole, bounds: Rect, kind: NodeKind) -> Self {
        Self { role, bounds, kind }
    }

    /// Children of a group; empty for leaves.
    #[must_use]
    pub fn children(&self) -> &[RenderNode] {
        match &self.kind {
            NodeKind::Group { children, .. } => children,
            _ => &[],
        }
    }

    /// Text lines of a text node.
    #[must_use]
    pub fn text_lines(&self) -> Option<&[String]> {
        match &self.kind {
            NodeKind::Text { lines, .. } => Some(lines),
            _ => None,
        }
    }
}

/// A fully laid-out card composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderTree {
    /// Composition width in pixels, including padding.
    pub width: f32,
    /// Composition height in pixels, including padding.
    pub height: f32,
    /// `font-family` value applied to all text.
    pub font: String,
    /// Top-level nodes, painted in order.
    pub nodes: Vec<RenderNode>,
}

impl RenderTree {
    /// Every node in paint order, depth-first.
    #[must_use]
    pub fn walk(&self) -> Vec<&RenderNode> {
        fn visit<'a>(node: &'a RenderNode, out: &mut Vec<&'a RenderNode>) {
            out.push(node);
            for child in node.children() {
                visit(child, out);
            }
        }

        let mut out = Vec::new();
        for node in &self.nodes {
            visit(node, &mut out);
        }
        out
    }

    /// First node with `role`, in paint order.
    #[must_use]
    pub fn find(&self, role: NodeRole) -> Option<&RenderNode> {
        self.walk().into_iter().find(|n| n.role == role)
    }

    /// Number of nodes with `role`.
    #[must_use]
    pub fn count(&self, role: NodeRole) -> usize {
        self.walk().iter().filter(|n| n.role == role).count()
    }

    /// Image references in paint order.
    #[must_use]
    pub fn image_hrefs(&self) -> Vec<&str> {
        self.walk()
            .into_iter()
            .filter_map(|n| match &n.kind {
                NodeKind::Image { href } => Some(href.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Remove every image node whose reference fails `keep`.
    pub fn retain_images(&mut self, keep: &mut dyn FnMut(&str) -> bool) {
        fn prune(nodes: &mut Vec<RenderNode>, keep: &mut dyn FnMut(&str) -> bool) {
            nodes.retain(|n| match &n.kind {
                NodeKind::Image { href } => keep(href),
                _ => true,
            });
            for node in nodes.iter_mut() {
                if let NodeKind::Group { children, .. } = &mut node.kind {
                    prune(children, keep);
                }
            }
        }
        prune(&mut self.nodes, keep);
    }

    /// Rewrite every image reference through `map`.
    pub fn map_images(&mut self, map: &mut dyn FnMut(&str) -> Option<String>) {
        fn rewrite(nodes: &mut [RenderNode], map: &mut dyn FnMut(&str) -> Option<String>) {
            for node in nodes {
                match &mut node.kind {
                    NodeKind::Image { href } => {
                        if let Some(new) = map(href) {
                            *href = new;
                        }
                    }
                    NodeKind::Group { children, .. } => rewrite(children, map),
                    _ => {}
                }
            }
        }
        rewrite(&mut self.nodes, map);
    }
}
