//! Card layout: `(entity, theme) -> RenderTree`.
//!
//! The builder is a pure function. Text is wrapped with a fixed per-font
//! advance estimate so identical input always produces an identical tree,
//! independent of which fonts happen to be installed.

use crate::card::{CardEntity, DEFAULT_PROGRESS_COLOR, DEFAULT_TAG_COLOR};
use crate::style::{
    resolve_fill, resolve_font, resolve_link_icon, resolve_meteo, resolve_radius, resolve_shadow,
    resolve_theme_palette, Color, Fill, GradientDirection, MeteoSpec, Palette, REM_PX,
};
use crate::theme::Theme;
use crate::tree::{NodeKind, NodeRole, Rect, RenderNode, RenderTree, TextAnchor, TextStyle};

/// Padding around the card so the tag badge and shadow are captured.
pub const COMPOSITION_PADDING: f32 = 32.0;
/// Inner padding of the card content.
pub const CONTENT_PADDING: f32 = 24.0;
/// Banner height.
pub const BANNER_HEIGHT: f32 = 192.0;
/// Gap between the banner and the title.
pub const BANNER_GAP: f32 = 16.0;
/// Tag badge offset from the card's right edge and above its top edge.
pub const TAG_INSET: f32 = 16.0;

const TITLE_SIZE: f32 = 30.0;
const TITLE_LINE: f32 = 36.0;
const BODY_SIZE: f32 = 16.0;
const BODY_LINE: f32 = 24.0;
const SMALL_SIZE: f32 = 14.0;
const SMALL_LINE: f32 = 20.0;
const SECTION_GAP: f32 = 24.0;
const TRACK_HEIGHT: f32 = 20.0;
const METEO_HEIGHT: f32 = 28.0;
const METEO_ICON: f32 = 16.0;
const LINK_ICON: f32 = 20.0;
const LINK_GAP: f32 = 12.0;
const BADGE_HEIGHT: f32 = 32.0;
const BADGE_PADDING_X: f32 = 16.0;
const WARNING_ACCENT_WIDTH: f32 = 4.0;
const WARNING_PADDING: f32 = 12.0;
const WARNING_COLOR: Color = Color::rgb(0xf5, 0x9e, 0x0b);
const ELLIPSIS: char = '\u{2026}';

/// Lay out `card` for `theme`.
#[must_use]
pub fn build_render_tree(card: &CardEntity, theme: Theme) -> RenderTree {
    let palette = resolve_theme_palette(theme);
    let font = resolve_font(card.font_family);
    let ratio = font.advance_ratio();

    let card_w = card.card_width * REM_PX;
    let min_h = card.card_height * REM_PX;
    let left = COMPOSITION_PADDING;
    let top = COMPOSITION_PADDING;
    let content_x = left + CONTENT_PADDING;
    let content_w = (card_w - 2.0 * CONTENT_PADDING).max(0.0);

    let mut content = Vec::new();
    let mut cursor = top;

    if let Some(url) = card.banner_url() {
        content.push(banner(url, Rect::new(left, top, card_w, BANNER_HEIGHT)));
        cursor += BANNER_HEIGHT + BANNER_GAP;
    } else {
        cursor += CONTENT_PADDING;
    }

    // Header: title on the left, meteo pill on the right.
    let meteo = if card.show_meteo {
        resolve_meteo(card.meteo_status)
    } else {
        None
    };
    let meteo_w = meteo.map_or(0.0, |m| meteo_width(&m, ratio));
    let title_w = if meteo.is_some() {
        (content_w - meteo_w - LINK_GAP).max(0.0)
    } else {
        content_w
    };
    let title_lines = wrap_text(&card.name, TITLE_SIZE, title_w, ratio);
    let title_h = line_block(title_lines.len(), TITLE_LINE);
    content.push(text(
        NodeRole::Title,
        Rect::new(content_x, cursor, title_w, title_h),
        title_lines,
        TextStyle {
            size: TITLE_SIZE,
            weight: 700,
            color: palette.text,
            line_height: TITLE_LINE,
            anchor: TextAnchor::Start,
        },
    ));
    if let Some(spec) = meteo {
        let y = cursor + (TITLE_LINE - METEO_HEIGHT) / 2.0;
        let bounds = Rect::new(content_x + content_w - meteo_w, y, meteo_w, METEO_HEIGHT);
        content.push(meteo_pill(&spec, bounds));
    }
    cursor += title_h.max(METEO_HEIGHT);

    if !card.description.trim().is_empty() {
        cursor += 16.0;
        let lines = wrap_text(&card.description, BODY_SIZE, content_w, ratio);
        let h = line_block(lines.len(), BODY_LINE);
        content.push(text(
            NodeRole::Description,
            Rect::new(content_x, cursor, content_w, h),
            lines,
            TextStyle {
                size: BODY_SIZE,
                weight: 400,
                color: palette.muted,
                line_height: BODY_LINE,
                anchor: TextAnchor::Start,
            },
        ));
        cursor += h;
    }

    cursor += SECTION_GAP;
    content.extend(progress(card, &palette, content_x, cursor, content_w));
    cursor += SMALL_LINE + 8.0 + TRACK_HEIGHT;

    if !card.warnings.trim().is_empty() {
        cursor += SECTION_GAP;
        let block = warnings(&card.warnings, &palette, content_x, cursor, content_w, ratio);
        cursor += block.bounds.height;
        content.push(block);
    }

    // Links footer, pinned to the bottom edge of the card.
    let links: Vec<_> = card.visible_links().collect();
    let label = "Links:";
    let label_w = text_width(label, SMALL_SIZE, ratio);
    let icons_x = content_x + label_w + LINK_GAP;
    let per_row = fit_count(content_x + content_w - icons_x + LINK_GAP, LINK_ICON + LINK_GAP);
    let rows = links.len().div_ceil(per_row);
    let footer_h = if links.is_empty() {
        0.0
    } else {
        1.0 + 16.0 + line_block(rows, LINK_ICON + 8.0) - 8.0
    };
    let needed = cursor - top
        + if links.is_empty() {
            0.0
        } else {
            SECTION_GAP + footer_h
        }
        + CONTENT_PADDING;
    let card_h = min_h.max(needed);

    if !links.is_empty() {
        let footer_y = top + card_h - CONTENT_PADDING - footer_h;
        let row_y = footer_y + 17.0;
        let mut children = vec![
            shape(
                NodeRole::Decoration,
                Rect::new(content_x, footer_y, content_w, 1.0),
                Fill::Solid(palette.divider),
                0.0,
            ),
            text(
                NodeRole::Decoration,
                Rect::new(content_x, row_y, label_w, SMALL_LINE),
                vec![label.to_string()],
                small(palette.muted, 600, TextAnchor::Start),
            ),
        ];
        for (i, link) in links.iter().enumerate() {
            let col = index_f32(i % per_row);
            let row = index_f32(i / per_row);
            let icon = resolve_link_icon(link.kind);
            children.push(RenderNode::new(
                NodeRole::Link,
                Rect::new(
                    icons_x + col * (LINK_ICON + LINK_GAP),
                    row_y + row * (LINK_ICON + 8.0),
                    LINK_ICON,
                    LINK_ICON,
                ),
                NodeKind::Icon {
                    path: icon.path.to_string(),
                    color: palette.icon,
                },
            ));
        }
        content.push(group(
            NodeRole::LinksRow,
            Rect::new(content_x, footer_y, content_w, footer_h),
            None,
            children,
        ));
    }

    let card_bounds = Rect::new(left, top, card_w, card_h);
    let radius = resolve_radius(card.border_radius)
        .min(card_w / 2.0)
        .min(card_h / 2.0);

    let mut nodes = vec![
        RenderNode::new(
            NodeRole::Card,
            card_bounds,
            NodeKind::Shape {
                fill: Fill::Solid(palette.surface),
                corner_radius: radius,
                stroke: None,
                shadow: resolve_shadow(card.shadow_style),
            },
        ),
        group(NodeRole::CardContent, card_bounds, Some(radius), content),
    ];

    if !card.tag.trim().is_empty() {
        nodes.push(tag_badge(card, card_bounds, ratio));
    }

    RenderTree {
        width: card_w + 2.0 * COMPOSITION_PADDING,
        height: card_h + 2.0 * COMPOSITION_PADDING,
        font: font.css_stack(),
        nodes,
    }
}

fn banner(url: &str, bounds: Rect) -> RenderNode {
    group(
        NodeRole::Banner,
        bounds,
        None,
        vec![
            RenderNode::new(
                NodeRole::BannerImage,
                bounds,
                NodeKind::Image {
                    href: url.to_string(),
                },
            ),
            shape(
                NodeRole::BannerOverlay,
                bounds,
                Fill::LinearGradient {
                    from: Color::BLACK.with_alpha(0.6),
                    to: Color::TRANSPARENT,
                    direction: GradientDirection::BottomToTop,
                },
                0.0,
            ),
        ],
    )
}

fn meteo_width(spec: &MeteoSpec, ratio: f32) -> f32 {
    10.0 + METEO_ICON + 6.0 + text_width(spec.label, SMALL_SIZE, ratio) + 10.0
}

fn meteo_pill(spec: &MeteoSpec, bounds: Rect) -> RenderNode {
    let icon_y = bounds.y + (METEO_HEIGHT - METEO_ICON) / 2.0;
    let label_x = bounds.x + 10.0 + METEO_ICON + 6.0;
    group(
        NodeRole::Meteo,
        bounds,
        None,
        vec![
            shape(
                NodeRole::Decoration,
                bounds,
                Fill::Solid(spec.background),
                METEO_HEIGHT / 2.0,
            ),
            RenderNode::new(
                NodeRole::Decoration,
                Rect::new(bounds.x + 10.0, icon_y, METEO_ICON, METEO_ICON),
                NodeKind::Icon {
                    path: spec.icon.to_string(),
                    color: spec.color,
                },
            ),
            text(
                NodeRole::Decoration,
                Rect::new(
                    label_x,
                    bounds.y + (METEO_HEIGHT - SMALL_LINE) / 2.0,
                    bounds.right() - label_x - 10.0,
                    SMALL_LINE,
                ),
                vec![spec.label.to_string()],
                small(spec.color, 600, TextAnchor::Start),
            ),
        ],
    )
}

fn progress(card: &CardEntity, palette: &Palette, x: f32, y: f32, width: f32) -> Vec<RenderNode> {
    let label_row = group(
        NodeRole::ProgressLabel,
        Rect::new(x, y, width, SMALL_LINE),
        None,
        vec![
            text(
                NodeRole::Decoration,
                Rect::new(x, y, width, SMALL_LINE),
                vec!["Progress".to_string()],
                small(palette.muted, 600, TextAnchor::Start),
            ),
            text(
                NodeRole::Decoration,
                Rect::new(x, y, width, SMALL_LINE),
                vec![format!("{:.0}%", card.progress)],
                small(palette.text, 600, TextAnchor::End),
            ),
        ],
    );

    let track_y = y + SMALL_LINE + 8.0;
    let radius = TRACK_HEIGHT / 2.0;
    let mut nodes = vec![
        label_row,
        shape(
            NodeRole::ProgressTrack,
            Rect::new(x, track_y, width, TRACK_HEIGHT),
            Fill::Solid(palette.track),
            radius,
        ),
    ];

    if card.progress > 0.0 {
        let fallback = Color::parse_hex(DEFAULT_PROGRESS_COLOR).unwrap_or(Color::BLACK);
        let fill_w = width * card.progress / 100.0;
        nodes.push(shape(
            NodeRole::ProgressFill,
            Rect::new(x, track_y, fill_w, TRACK_HEIGHT),
            resolve_fill(&card.progress_bar_color, fallback),
            radius.min(fill_w / 2.0),
        ));
    }
    nodes
}

fn warnings(body: &str, palette: &Palette, x: f32, y: f32, width: f32, ratio: f32) -> RenderNode {
    let inner_x = x + WARNING_ACCENT_WIDTH + WARNING_PADDING;
    let inner_w = (width - WARNING_ACCENT_WIDTH - 2.0 * WARNING_PADDING).max(0.0);
    let lines = wrap_text(body, SMALL_SIZE, inner_w, ratio);
    let body_h = line_block(lines.len(), SMALL_LINE);
    let height = WARNING_PADDING + SMALL_LINE + 4.0 + body_h + WARNING_PADDING;
    let bounds = Rect::new(x, y, width, height);

    group(
        NodeRole::Warnings,
        bounds,
        None,
        vec![
            shape(
                NodeRole::Decoration,
                bounds,
                Fill::Solid(WARNING_COLOR.with_alpha(0.1)),
                4.0,
            ),
            shape(
                NodeRole::Decoration,
                Rect::new(x, y, WARNING_ACCENT_WIDTH, height),
                Fill::Solid(WARNING_COLOR),
                0.0,
            ),
            text(
                NodeRole::Decoration,
                Rect::new(inner_x, y + WARNING_PADDING, inner_w, SMALL_LINE),
                vec!["Warnings & Risks".to_string()],
                small(WARNING_COLOR, 700, TextAnchor::Start),
            ),
            text(
                NodeRole::Decoration,
                Rect::new(inner_x, y + WARNING_PADDING + SMALL_LINE + 4.0, inner_w, body_h),
                lines,
                small(palette.muted, 400, TextAnchor::Start),
            ),
        ],
    )
}

fn tag_badge(card: &CardEntity, card_bounds: Rect, ratio: f32) -> RenderNode {
    let max_text_w = (card_bounds.width - 2.0 * TAG_INSET - 2.0 * BADGE_PADDING_X).max(0.0);
    let label = truncate_to_width(&card.tag.trim().to_uppercase(), SMALL_SIZE, max_text_w, ratio);
    let badge_w = text_width(&label, SMALL_SIZE, ratio) + 2.0 * BADGE_PADDING_X;
    let bounds = Rect::new(
        card_bounds.right() - TAG_INSET - badge_w,
        card_bounds.y - TAG_INSET,
        badge_w,
        BADGE_HEIGHT,
    );
    let fallback = Color::parse_hex(DEFAULT_TAG_COLOR).unwrap_or(Color::BLACK);

    group(
        NodeRole::TagBadge,
        bounds,
        None,
        vec![
            shape(
                NodeRole::Decoration,
                bounds,
                resolve_fill(&card.tag_color, fallback),
                BADGE_HEIGHT / 2.0,
            ),
            text(
                NodeRole::Decoration,
                Rect::new(
                    bounds.x,
                    bounds.y + (BADGE_HEIGHT - SMALL_LINE) / 2.0,
                    badge_w,
                    SMALL_LINE,
                ),
                vec![label],
                small(Color::WHITE, 700, TextAnchor::Middle),
            ),
        ],
    )
}

fn group(role: NodeRole, bounds: Rect, clip_radius: Option<f32>, children: Vec<RenderNode>) -> RenderNode {
    RenderNode::new(
        role,
        bounds,
        NodeKind::Group {
            clip_radius,
            children,
        },
    )
}

fn shape(role: NodeRole, bounds: Rect, fill: Fill, corner_radius: f32) -> RenderNode {
    RenderNode::new(
        role,
        bounds,
        NodeKind::Shape {
            fill,
            corner_radius,
            stroke: None,
            shadow: None,
        },
    )
}

fn text(role: NodeRole, bounds: Rect, lines: Vec<String>, style: TextStyle) -> RenderNode {
    RenderNode::new(role, bounds, NodeKind::Text { lines, style })
}

fn small(color: Color, weight: u16, anchor: TextAnchor) -> TextStyle {
    TextStyle {
        size: SMALL_SIZE,
        weight,
        color,
        line_height: SMALL_LINE,
        anchor,
    }
}

#[allow(clippy::cast_precision_loss)]
fn index_f32(i: usize) -> f32 {
    i as f32
}

fn line_block(lines: usize, line_height: f32) -> f32 {
    index_f32(lines) * line_height
}

/// Estimated rendered width of a single line.
#[must_use]
pub fn text_width(text: &str, size: f32, advance_ratio: f32) -> f32 {
    index_f32(text.chars().count()) * size * advance_ratio
}

/// How many items of `step` width fit in `available`; at least one.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn fit_count(available: f32, step: f32) -> usize {
    if step <= 0.0 || !available.is_finite() {
        return 1;
    }
    ((available / step).floor().max(1.0)) as usize
}

fn truncate_to_width(text: &str, size: f32, max_width: f32, advance_ratio: f32) -> String {
    let max_chars = fit_count(max_width, size * advance_ratio);
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    out.push(ELLIPSIS);
    out
}

/// Greedy word wrap using a fixed advance per character.
///
/// Explicit newlines start a new line. Words longer than a full line are
/// broken at the line limit.
#[must_use]
pub fn wrap_text(text: &str, size: f32, max_width: f32, advance_ratio: f32) -> Vec<String> {
    let max_chars = fit_count(max_width, size * advance_ratio);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut line = String::new();
        let mut len = 0usize;

        for word in paragraph.split_whitespace() {
            let mut chars: Vec<char> = word.chars().collect();
            while chars.len() > max_chars {
                if len > 0 {
                    lines.push(std::mem::take(&mut line));
                    len = 0;
                }
                let rest = chars.split_off(max_chars);
                lines.push(chars.into_iter().collect());
                chars = rest;
            }

            if len > 0 && len + 1 + chars.len() > max_chars {
                lines.push(std::mem::take(&mut line));
                len = 0;
            }
            if len > 0 {
                line.push(' ');
                len += 1;
            }
            len += chars.len();
            line.extend(chars);
        }
        lines.push(line);
    }
    lines
}
