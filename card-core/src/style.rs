//! Style resolvers: abstract card knobs to concrete visual attributes.
//!
//! Every resolver is total. Unknown or out-of-range inputs fall back to a
//! documented preset instead of failing.

use serde::{Deserialize, Serialize};

use crate::card::{ColorMode, FontFamily, GradientSpec, LinkKind, MeteoStatus, ShadowStyle};
use crate::theme::Theme;

/// Pixels per rem used for all layout conversions.
pub const REM_PX: f32 = 16.0;

/// Corner radius presets in pixels, indexed by `CardEntity::border_radius`.
/// The last entry is "fully rounded" and gets clamped by the shape size.
pub const RADIUS_PRESETS_PX: [f32; 9] = [0.0, 2.0, 4.0, 6.0, 8.0, 12.0, 16.0, 24.0, 9999.0];

/// Index of the fully rounded preset, used for pills and bars.
pub const RADIUS_FULL: u8 = 8;

/// An sRGB colour with straight alpha.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Opacity in `0.0..=1.0`.
    pub a: f32,
}

impl Color {
    /// Opaque colour from channels.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self {
        r: 0,
        g: 0,
        b: 0,
        a: 0.0,
    };

    /// Opaque white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    /// Same colour with a different opacity.
    #[must_use]
    pub fn with_alpha(self, a: f32) -> Self {
        Self {
            a: a.clamp(0.0, 1.0),
            ..self
        }
    }

    /// Parse `#rgb` or `#rrggbb` (the leading `#` is optional).
    #[must_use]
    pub fn parse_hex(input: &str) -> Option<Self> {
        let hex = input.trim().trim_start_matches('#');
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            3 => {
                let mut it = hex.chars().map(|c| c.to_digit(16));
                let r = u8::try_from(it.next()??).ok()?;
                let g = u8::try_from(it.next()??).ok()?;
                let b = u8::try_from(it.next()??).ok()?;
                Some(Self::rgb(r * 17, g * 17, b * 17))
            }
            6 => Some(Self::rgb(
                channel(hex.get(0..2)?)?,
                channel(hex.get(2..4)?)?,
                channel(hex.get(4..6)?)?,
            )),
            _ => None,
        }
    }

    /// `#rrggbb`, without alpha.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Direction of a two-stop gradient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GradientDirection {
    /// Left edge to right edge.
    LeftToRight,
    /// Bottom edge to top edge.
    BottomToTop,
}

/// A concrete paint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Fill {
    /// Single colour.
    Solid(Color),
    /// Two-stop linear gradient.
    LinearGradient {
        /// Start colour.
        from: Color,
        /// End colour.
        to: Color,
        /// Gradient axis.
        direction: GradientDirection,
    },
}

/// A concrete shadow.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShadowSpec {
    /// Vertical offset in pixels.
    pub offset_y: f32,
    /// Blur radius in pixels.
    pub blur: f32,
    /// Shadow colour including opacity.
    pub color: Color,
    /// Whether the shadow is drawn inside the shape.
    pub inset: bool,
}

/// A concrete font selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FontSpec {
    /// Primary family name.
    pub family: &'static str,
    /// CSS generic fallback.
    pub fallback: &'static str,
    /// Average glyph advance as a fraction of the font size, for wrapping.
    pub advance_ratio_milli: u16,
}

impl FontSpec {
    /// `font-family` attribute value.
    #[must_use]
    pub fn css_stack(&self) -> String {
        format!("'{}', {}", self.family, self.fallback)
    }

    /// Average glyph advance as a multiple of the font size.
    #[must_use]
    pub fn advance_ratio(&self) -> f32 {
        f32::from(self.advance_ratio_milli) / 1000.0
    }
}

/// Registered fonts, in registration order. The first is the fallback.
pub const FONTS: [FontSpec; 3] = [
    FontSpec {
        family: "Inter",
        fallback: "sans-serif",
        advance_ratio_milli: 550,
    },
    FontSpec {
        family: "Roboto Slab",
        fallback: "serif",
        advance_ratio_milli: 570,
    },
    FontSpec {
        family: "Space Mono",
        fallback: "monospace",
        advance_ratio_milli: 610,
    },
];

/// Meteo indicator appearance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeteoSpec {
    /// Label text.
    pub label: &'static str,
    /// Icon and label colour.
    pub color: Color,
    /// Pill background.
    pub background: Color,
    /// 24x24 SVG path data of the icon.
    pub icon: &'static str,
}

/// Link icon appearance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IconSpec {
    /// Human label for the link kind.
    pub label: &'static str,
    /// 24x24 stroked SVG path data.
    pub path: &'static str,
}

/// Theme-dependent surface colours.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    /// Card background.
    pub surface: Color,
    /// Primary text.
    pub text: Color,
    /// Secondary text.
    pub muted: Color,
    /// Progress track background.
    pub track: Color,
    /// Footer divider.
    pub divider: Color,
    /// Link icon colour.
    pub icon: Color,
}

/// Resolve a shadow preset. `None` means no shadow; unknown presets use Large.
#[must_use]
pub fn resolve_shadow(style: ShadowStyle) -> Option<ShadowSpec> {
    let drop = |offset_y: f32, blur: f32, alpha: f32| ShadowSpec {
        offset_y,
        blur,
        color: Color::BLACK.with_alpha(alpha),
        inset: false,
    };
    let glow = |color: Color| ShadowSpec {
        offset_y: 0.0,
        blur: 25.0,
        color: color.with_alpha(0.7),
        inset: false,
    };

    match style {
        ShadowStyle::None => None,
        ShadowStyle::Small => Some(drop(1.0, 2.0, 0.05)),
        ShadowStyle::Medium => Some(drop(4.0, 6.0, 0.1)),
        ShadowStyle::ExtraLarge => Some(drop(20.0, 25.0, 0.1)),
        ShadowStyle::Inner => Some(ShadowSpec {
            offset_y: 2.0,
            blur: 4.0,
            color: Color::BLACK.with_alpha(0.05),
            inset: true,
        }),
        ShadowStyle::GlowBlue => Some(glow(Color::rgb(0x3b, 0x82, 0xf6))),
        ShadowStyle::GlowPurple => Some(glow(Color::rgb(0xa8, 0x55, 0xf7))),
        ShadowStyle::GlowGreen => Some(glow(Color::rgb(0x22, 0xc5, 0x5e))),
        ShadowStyle::GlowRed => Some(glow(Color::rgb(0xef, 0x44, 0x44))),
        ShadowStyle::GlowGold => Some(glow(Color::rgb(0xfb, 0xbf, 0x24))),
        ShadowStyle::Large | ShadowStyle::Unknown => Some(drop(10.0, 15.0, 0.1)),
    }
}

/// Resolve a radius preset index to pixels, clamping out-of-range indices.
#[must_use]
pub fn resolve_radius(index: u8) -> f32 {
    let last = RADIUS_PRESETS_PX.len() - 1;
    RADIUS_PRESETS_PX[usize::from(index).min(last)]
}

/// Resolve a font family. Unknown families use the first registered font.
#[must_use]
pub fn resolve_font(family: FontFamily) -> FontSpec {
    match family {
        FontFamily::RobotoSlab => FONTS[1],
        FontFamily::SpaceMono => FONTS[2],
        FontFamily::Inter | FontFamily::Unknown => FONTS[0],
    }
}

/// Resolve a fill spec. Unparseable colours fall back to `fallback`; a
/// gradient without a usable second stop renders solid.
#[must_use]
pub fn resolve_fill(spec: &GradientSpec, fallback: Color) -> Fill {
    let from = Color::parse_hex(&spec.color1).unwrap_or(fallback);
    let to = spec.color2.as_deref().and_then(Color::parse_hex);
    match (spec.mode, to) {
        (ColorMode::Gradient, Some(to)) => Fill::LinearGradient {
            from,
            to,
            direction: GradientDirection::LeftToRight,
        },
        _ => Fill::Solid(from),
    }
}

/// Resolve a meteo status. Unknown statuses have no indicator.
#[must_use]
pub fn resolve_meteo(status: MeteoStatus) -> Option<MeteoSpec> {
    let spec = |label, color: Color, bg: Color, bg_alpha, icon| MeteoSpec {
        label,
        color,
        background: bg.with_alpha(bg_alpha),
        icon,
    };
    match status {
        MeteoStatus::Excellent => Some(spec(
            "Excellent",
            Color::rgb(0x22, 0xc5, 0x5e),
            Color::rgb(0x4a, 0xde, 0x80),
            0.1,
            icons::STAR,
        )),
        MeteoStatus::OnTrack => Some(spec(
            "On Track",
            Color::rgb(0x3b, 0x82, 0xf6),
            Color::rgb(0x60, 0xa5, 0xfa),
            0.1,
            icons::CHECK_CIRCLE,
        )),
        MeteoStatus::MinorIssues => Some(spec(
            "Minor Issues",
            Color::rgb(0xf5, 0x9e, 0x0b),
            Color::rgb(0xfb, 0xbf, 0x24),
            0.1,
            icons::CLOUD,
        )),
        MeteoStatus::AtRisk => Some(spec(
            "At Risk",
            Color::rgb(0xf9, 0x73, 0x16),
            Color::rgb(0xf9, 0x73, 0x16),
            0.1,
            icons::ZAP,
        )),
        MeteoStatus::Critical => Some(spec(
            "Critical",
            Color::rgb(0xdc, 0x26, 0x26),
            Color::rgb(0xef, 0x44, 0x44),
            0.1,
            icons::ALERT_TRIANGLE,
        )),
        MeteoStatus::Unknown => None,
    }
}

/// Resolve a link kind to its icon. Unknown kinds use the website globe.
#[must_use]
pub fn resolve_link_icon(kind: LinkKind) -> IconSpec {
    match kind {
        LinkKind::SourceControl => IconSpec {
            label: "GITHUB",
            path: icons::GITHUB,
        },
        LinkKind::Docs => IconSpec {
            label: "DOCS",
            path: icons::DOCS,
        },
        LinkKind::IssueTracker => IconSpec {
            label: "JIRA",
            path: icons::CHECK_CIRCLE,
        },
        LinkKind::DesignTool => IconSpec {
            label: "FIGMA",
            path: icons::FIGMA,
        },
        LinkKind::Chat => IconSpec {
            label: "SLACK",
            path: icons::SLACK,
        },
        LinkKind::Website | LinkKind::Unknown => IconSpec {
            label: "WEBSITE",
            path: icons::GLOBE,
        },
    }
}

/// Resolve the surface palette for a theme.
#[must_use]
pub fn resolve_theme_palette(theme: Theme) -> Palette {
    match theme {
        Theme::Light => Palette {
            surface: Color::WHITE,
            text: Color::rgb(0x0f, 0x17, 0x2a),
            muted: Color::rgb(0x0f, 0x17, 0x2a).with_alpha(0.8),
            track: Color::rgb(0xe2, 0xe8, 0xf0),
            divider: Color::rgb(0xe2, 0xe8, 0xf0),
            icon: Color::rgb(0x64, 0x74, 0x8b),
        },
        Theme::Dark => Palette {
            surface: Color::rgb(0x1e, 0x29, 0x3b),
            text: Color::rgb(0xf1, 0xf5, 0xf9),
            muted: Color::rgb(0xf1, 0xf5, 0xf9).with_alpha(0.7),
            track: Color::rgb(0x47, 0x55, 0x69).with_alpha(0.5),
            divider: Color::WHITE.with_alpha(0.1),
            icon: Color::rgb(0x94, 0xa3, 0xb8),
        },
    }
}

/// Stroked 24x24 icon outlines.
pub mod icons {
    /// Five-point star.
    pub const STAR: &str = "M12 2 L15.09 8.26 L22 9.27 L17 14.14 L18.18 21.02 L12 17.77 L5.82 21.02 L7 14.14 L2 9.27 L8.91 8.26 Z";
    /// Circle with check mark.
    pub const CHECK_CIRCLE: &str = "M22 11.08V12a10 10 0 1 1-5.93-9.14 M22 4 L12 14.01 L9 11.01";
    /// Cloud.
    pub const CLOUD: &str = "M18 10h-1.26A8 8 0 1 0 9 20h9a5 5 0 0 0 0-10z";
    /// Lightning bolt.
    pub const ZAP: &str = "M13 2 L3 14 L12 14 L11 22 L21 10 L12 10 Z";
    /// Warning triangle.
    pub const ALERT_TRIANGLE: &str = "M10.29 3.86L1.82 18a2 2 0 0 0 1.71 3h16.94a2 2 0 0 0 1.71-3L13.71 3.86a2 2 0 0 0-3.42 0z M12 9 L12 13 M12 17 L12.01 17";
    /// GitHub mark.
    pub const GITHUB: &str = "M9 19c-5 1.5-5-2.5-7-3m14 6v-3.87a3.37 3.37 0 0 0-.94-2.61c3.14-.35 6.44-1.54 6.44-7A5.44 5.44 0 0 0 20 4.77 5.07 5.07 0 0 0 19.91 1S18.73.65 16 2.48a13.38 13.38 0 0 0-7 0C6.27.65 5.09 1 5.09 1A5.07 5.07 0 0 0 5 4.77a5.44 5.44 0 0 0-1.5 3.78c0 5.42 3.3 6.61 6.44 7A3.37 3.37 0 0 0 9 18.13V22";
    /// Document.
    pub const DOCS: &str = "M14 2H6a2 2 0 0 0-2 2v16a2 2 0 0 0 2 2h12a2 2 0 0 0 2-2V8z M14 2 L14 8 L20 8 M16 13 L8 13 M16 17 L8 17 M10 9 L8 9";
    /// Figma logo.
    pub const FIGMA: &str = "M5 5.5A3.5 3.5 0 0 1 8.5 2H12v7H8.5A3.5 3.5 0 0 1 5 5.5z M12 2h3.5a3.5 3.5 0 1 1 0 7H12V2z M12 12.5a3.5 3.5 0 1 1 7 0 3.5 3.5 0 1 1-7 0z M5 19.5A3.5 3.5 0 0 1 8.5 16H12v3.5a3.5 3.5 0 1 1-7 0z";
    /// Slack logo.
    pub const SLACK: &str = "M14.5 10c-1.93 0-3.5 1.57-3.5 3.5s1.57 3.5 3.5 3.5h1a3.5 3.5 0 0 0 0-7h-1z M8.5 14h-1a3.5 3.5 0 1 0 0 7h1a3.5 3.5 0 0 0 0-7z M10 14.5c0-1.93-1.57-3.5-3.5-3.5s-3.5 1.57-3.5 3.5v1a3.5 3.5 0 0 0 7 0v-1z M14 8.5v-1a3.5 3.5 0 1 0-7 0v1a3.5 3.5 0 0 0 7 0z";
    /// Globe.
    pub const GLOBE: &str = "M22 12a10 10 0 1 1-20 0 10 10 0 1 1 20 0z M2 12 L22 12 M12 2a15.3 15.3 0 0 1 4 10 15.3 15.3 0 0 1-4 10 15.3 15.3 0 0 1-4-10 15.3 15.3 0 0 1 4-10z";
}
