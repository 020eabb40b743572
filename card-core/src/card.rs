//! The styled project card - the canonical entity everything else renders.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CardError, CardResult};

/// Default card name for freshly created cards.
pub const DEFAULT_NAME: &str = "New Awesome Project";

/// Default tag for freshly created cards.
pub const DEFAULT_TAG: &str = "PoC";

/// Default description for freshly created cards.
pub const DEFAULT_DESCRIPTION: &str = "A brief and exciting description of what this project aims to achieve. This section can grow to talk about goals, milestones, and expected outcomes.";

/// Default progress bar colour (blue).
pub const DEFAULT_PROGRESS_COLOR: &str = "#3b82f6";

/// Default tag badge colour (purple).
pub const DEFAULT_TAG_COLOR: &str = "#8b5cf6";

/// Second stop used when a fill switches to gradient without one.
pub const DEFAULT_GRADIENT_END: &str = "#9333ea";

/// Allowed progress range, in percent.
pub const PROGRESS_RANGE: (f32, f32) = (0.0, 100.0);

/// Allowed card width range, in rem.
pub const WIDTH_RANGE: (f32, f32) = (24.0, 60.0);

/// Allowed card minimum height range, in rem.
pub const HEIGHT_RANGE: (f32, f32) = (20.0, 40.0);

/// Number of corner rounding presets; valid indices are `0..RADIUS_PRESET_COUNT`.
pub const RADIUS_PRESET_COUNT: u8 = 9;

/// Unique identifier for a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(Uuid);

impl CardId {
    /// Create a new unique card ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse a card ID from its string form.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid UUID.
    pub fn parse(input: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(input.trim()).map(Self)
    }
}

impl Default for CardId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a link within a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkId(Uuid);

impl LinkId {
    /// Create a new unique link ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LinkId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of destination a link points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LinkKind {
    /// Source control (GitHub and friends).
    #[default]
    #[serde(rename = "GITHUB")]
    SourceControl,
    /// Documentation.
    #[serde(rename = "DOCS")]
    Docs,
    /// Issue tracker.
    #[serde(rename = "JIRA")]
    IssueTracker,
    /// Design tool.
    #[serde(rename = "FIGMA")]
    DesignTool,
    /// Team chat.
    #[serde(rename = "SLACK")]
    Chat,
    /// Any other website.
    #[serde(rename = "WEBSITE")]
    Website,
    /// A kind this version does not know about.
    #[serde(other)]
    Unknown,
}

/// A single link shown in the card footer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectLink {
    /// Identifier, unique within the owning card.
    pub id: LinkId,
    /// Destination kind.
    #[serde(rename = "type", default)]
    pub kind: LinkKind,
    /// Destination URL. May be empty; empty links are not rendered.
    #[serde(default)]
    pub url: String,
}

impl ProjectLink {
    /// Create an empty link of the given kind.
    #[must_use]
    pub fn new(kind: LinkKind) -> Self {
        Self {
            id: LinkId::new(),
            kind,
            url: String::new(),
        }
    }

    /// Whether this link has a URL worth rendering.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

/// Solid or two-stop gradient fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Single colour.
    #[default]
    Solid,
    /// Left-to-right gradient between two colours.
    Gradient,
}

/// A fill description used by the progress bar and the tag badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradientSpec {
    /// Fill mode.
    #[serde(rename = "type", default)]
    pub mode: ColorMode,
    /// First (or only) colour, as hex RGB.
    pub color1: String,
    /// Second colour, used only in gradient mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color2: Option<String>,
}

impl GradientSpec {
    /// A solid fill.
    #[must_use]
    pub fn solid(color: impl Into<String>) -> Self {
        Self {
            mode: ColorMode::Solid,
            color1: color.into(),
            color2: None,
        }
    }

    /// A two-stop gradient.
    #[must_use]
    pub fn gradient(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            mode: ColorMode::Gradient,
            color1: from.into(),
            color2: Some(to.into()),
        }
    }

    /// Switch fill mode.
    ///
    /// Switching to gradient without a second colour fills it with
    /// [`DEFAULT_GRADIENT_END`]. Switching to solid keeps `color2` so a later
    /// switch back restores it.
    pub fn set_mode(&mut self, mode: ColorMode) {
        self.mode = mode;
        self.ensure_second_stop();
    }

    fn ensure_second_stop(&mut self) {
        if self.mode == ColorMode::Gradient
            && self.color2.as_deref().map_or(true, |c| c.trim().is_empty())
        {
            self.color2 = Some(DEFAULT_GRADIENT_END.to_string());
        }
    }
}

/// Shadow presets, from flat to glowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShadowStyle {
    /// No shadow.
    #[serde(rename = "None")]
    None,
    /// Small drop shadow.
    #[serde(rename = "Small")]
    Small,
    /// Medium drop shadow.
    #[serde(rename = "Medium")]
    Medium,
    /// Large drop shadow.
    #[default]
    #[serde(rename = "Large")]
    Large,
    /// Extra large drop shadow.
    #[serde(rename = "Extra Large")]
    ExtraLarge,
    /// Inset shadow.
    #[serde(rename = "Inner")]
    Inner,
    /// Blue glow.
    #[serde(rename = "Glow (Blue)")]
    GlowBlue,
    /// Purple glow.
    #[serde(rename = "Glow (Purple)")]
    GlowPurple,
    /// Green glow.
    #[serde(rename = "Glow (Green)")]
    GlowGreen,
    /// Red glow.
    #[serde(rename = "Glow (Red)")]
    GlowRed,
    /// Gold glow.
    #[serde(rename = "Glow (Gold)")]
    GlowGold,
    /// A preset this version does not know about.
    #[serde(other)]
    Unknown,
}

/// Project health indicator, best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum MeteoStatus {
    /// Everything is great.
    #[serde(rename = "Excellent")]
    Excellent,
    /// Progressing as planned.
    #[default]
    #[serde(rename = "On Track")]
    OnTrack,
    /// Small problems.
    #[serde(rename = "Minor Issues")]
    MinorIssues,
    /// Delivery at risk.
    #[serde(rename = "At Risk")]
    AtRisk,
    /// Serious trouble.
    #[serde(rename = "Critical")]
    Critical,
    /// A status this version does not know about.
    #[serde(other)]
    Unknown,
}

/// Font families available to cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FontFamily {
    /// Inter (sans-serif).
    #[default]
    #[serde(rename = "Inter")]
    Inter,
    /// Roboto Slab (serif).
    #[serde(rename = "Roboto Slab")]
    RobotoSlab,
    /// Space Mono (monospace).
    #[serde(rename = "Space Mono")]
    SpaceMono,
    /// A font this version does not know about.
    #[serde(other)]
    Unknown,
}

/// The styled project card.
///
/// Every field except `id` is backfilled from [`CardEntity::create`] when a
/// stored snapshot lacks it, so snapshots written by older versions still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CardEntity {
    /// Unique identifier, fixed at creation.
    pub id: CardId,
    /// Display name.
    pub name: String,
    /// Short badge text.
    pub tag: String,
    /// Body text.
    pub description: String,
    /// Completion in percent, always within [`PROGRESS_RANGE`].
    pub progress: f32,
    /// Warnings and risks; the block is hidden when empty.
    pub warnings: String,
    /// Footer links, in display order.
    pub links: Vec<ProjectLink>,
    /// Progress bar fill.
    pub progress_bar_color: GradientSpec,
    /// Tag badge fill.
    pub tag_color: GradientSpec,
    /// Card shadow preset.
    pub shadow_style: ShadowStyle,
    /// Whether the health indicator is shown.
    pub show_meteo: bool,
    /// Health indicator value.
    pub meteo_status: MeteoStatus,
    /// Card width in rem.
    pub card_width: f32,
    /// Card minimum height in rem.
    pub card_height: f32,
    /// Index into the corner rounding presets.
    pub border_radius: u8,
    /// Font family for all card text.
    pub font_family: FontFamily,
    /// Optional banner image reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Default for CardEntity {
    fn default() -> Self {
        Self::create()
    }
}

impl CardEntity {
    /// Create a new card with the documented defaults and a fresh ID.
    #[must_use]
    pub fn create() -> Self {
        Self {
            id: CardId::new(),
            name: DEFAULT_NAME.to_string(),
            tag: DEFAULT_TAG.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            progress: 25.0,
            warnings: String::new(),
            links: vec![ProjectLink::new(LinkKind::SourceControl)],
            progress_bar_color: GradientSpec::solid(DEFAULT_PROGRESS_COLOR),
            tag_color: GradientSpec::solid(DEFAULT_TAG_COLOR),
            shadow_style: ShadowStyle::Large,
            show_meteo: true,
            meteo_status: MeteoStatus::OnTrack,
            card_width: 28.0,
            card_height: 28.0,
            border_radius: 6,
            font_family: FontFamily::Inter,
            image_url: None,
        }
    }

    /// Decode a persisted snapshot, backfilling absent fields with current
    /// defaults and normalizing the result.
    ///
    /// A field whose value has an incompatible type is treated as absent, so
    /// one bad field never costs the whole card.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot is not a JSON object.
    pub fn from_snapshot(snapshot: serde_json::Value) -> CardResult<Self> {
        let fields = match snapshot {
            serde_json::Value::Object(fields) => fields,
            other => {
                return Err(CardError::InvalidSnapshot(format!(
                    "expected an object, got {other}"
                )))
            }
        };

        let readable: serde_json::Map<String, serde_json::Value> = fields
            .into_iter()
            .filter(|(key, value)| {
                let single = serde_json::json!({ key.as_str(): value });
                let ok = serde_json::from_value::<Self>(single).is_ok();
                if !ok {
                    tracing::warn!("Ignoring unreadable card field {key:?}: {value}");
                }
                ok
            })
            .collect();

        let mut card: Self = serde_json::from_value(serde_json::Value::Object(readable))?;
        card.normalize();
        Ok(card)
    }

    /// Return a copy with every field reset to defaults except `id` and `name`.
    #[must_use]
    pub fn reset_fields(&self) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            ..Self::create()
        }
    }

    /// Shallow-merge the fields present in `patch`. The ID never changes.
    pub fn patch(&mut self, patch: CardPatch) {
        let CardPatch {
            name,
            tag,
            description,
            progress,
            warnings,
            links,
            progress_bar_color,
            tag_color,
            shadow_style,
            show_meteo,
            meteo_status,
            card_width,
            card_height,
            border_radius,
            font_family,
            image_url,
        } = patch;

        if let Some(v) = name {
            self.name = v;
        }
        if let Some(v) = tag {
            self.tag = v;
        }
        if let Some(v) = description {
            self.description = v;
        }
        if let Some(v) = progress {
            self.progress = v;
        }
        if let Some(v) = warnings {
            self.warnings = v;
        }
        if let Some(v) = links {
            self.links = v;
        }
        if let Some(v) = progress_bar_color {
            self.progress_bar_color = v;
        }
        if let Some(v) = tag_color {
            self.tag_color = v;
        }
        if let Some(v) = shadow_style {
            self.shadow_style = v;
        }
        if let Some(v) = show_meteo {
            self.show_meteo = v;
        }
        if let Some(v) = meteo_status {
            self.meteo_status = v;
        }
        if let Some(v) = card_width {
            self.card_width = v;
        }
        if let Some(v) = card_height {
            self.card_height = v;
        }
        if let Some(v) = border_radius {
            self.border_radius = v;
        }
        if let Some(v) = font_family {
            self.font_family = v;
        }
        if let Some(v) = image_url {
            self.image_url = Some(v);
        }

        self.normalize();
    }

    /// Append an empty source-control link and return its ID.
    pub fn add_link(&mut self) -> LinkId {
        let link = ProjectLink::new(LinkKind::SourceControl);
        let id = link.id;
        self.links.push(link);
        id
    }

    /// Remove a link by ID. Absent IDs are ignored.
    pub fn remove_link(&mut self, id: LinkId) -> Option<ProjectLink> {
        let index = self.links.iter().position(|l| l.id == id)?;
        Some(self.links.remove(index))
    }

    /// Edit a link in place. Returns `false` if the ID is absent.
    pub fn update_link(&mut self, id: LinkId, kind: Option<LinkKind>, url: Option<String>) -> bool {
        let Some(link) = self.links.iter_mut().find(|l| l.id == id) else {
            return false;
        };
        if let Some(kind) = kind {
            link.kind = kind;
        }
        if let Some(url) = url {
            link.url = url;
        }
        true
    }

    /// Check that no other card in `existing` uses the same normalized name.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::NameCollision`] if a card with a different ID has
    /// the same name, compared trimmed and case-insensitively.
    pub fn validate_for_save<'a, I>(&self, existing: I) -> CardResult<()>
    where
        I: IntoIterator<Item = &'a CardEntity>,
    {
        let name = self.normalized_name();
        let collides = existing
            .into_iter()
            .any(|other| other.id != self.id && other.normalized_name() == name);
        if collides {
            return Err(CardError::NameCollision {
                name: self.name.clone(),
            });
        }
        Ok(())
    }

    /// The name as used for uniqueness checks.
    #[must_use]
    pub fn normalized_name(&self) -> String {
        self.name.trim().to_lowercase()
    }

    /// Whether a banner image should be shown.
    #[must_use]
    pub fn has_banner(&self) -> bool {
        self.banner_url().is_some()
    }

    /// The banner URL, if non-blank.
    #[must_use]
    pub fn banner_url(&self) -> Option<&str> {
        self.image_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Links with a non-blank URL, in order.
    pub fn visible_links(&self) -> impl Iterator<Item = &ProjectLink> {
        self.links.iter().filter(|l| l.is_visible())
    }

    /// Re-establish every invariant: ranges clamped, radius index valid,
    /// gradient second stops present, link IDs unique.
    pub fn normalize(&mut self) {
        self.progress = clamp_or_min(self.progress, PROGRESS_RANGE);
        self.card_width = clamp_or_min(self.card_width, WIDTH_RANGE);
        self.card_height = clamp_or_min(self.card_height, HEIGHT_RANGE);
        self.border_radius = self.border_radius.min(RADIUS_PRESET_COUNT - 1);
        self.progress_bar_color.ensure_second_stop();
        self.tag_color.ensure_second_stop();

        let mut seen = std::collections::HashSet::with_capacity(self.links.len());
        for link in &mut self.links {
            while !seen.insert(link.id) {
                tracing::debug!("Duplicate link id {} on card {}, reassigning", link.id, self.id);
                link.id = LinkId::new();
            }
        }
    }
}

/// Clamp into `range`; NaN maps to the lower bound.
fn clamp_or_min(value: f32, (min, max): (f32, f32)) -> f32 {
    if value.is_nan() {
        min
    } else {
        value.clamp(min, max)
    }
}

/// A partial update to a card. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[allow(missing_docs)]
pub struct CardPatch {
    pub name: Option<String>,
    pub tag: Option<String>,
    pub description: Option<String>,
    pub progress: Option<f32>,
    pub warnings: Option<String>,
    pub links: Option<Vec<ProjectLink>>,
    pub progress_bar_color: Option<GradientSpec>,
    pub tag_color: Option<GradientSpec>,
    pub shadow_style: Option<ShadowStyle>,
    pub show_meteo: Option<bool>,
    pub meteo_status: Option<MeteoStatus>,
    pub card_width: Option<f32>,
    pub card_height: Option<f32>,
    pub border_radius: Option<u8>,
    pub font_family: Option<FontFamily>,
    pub image_url: Option<String>,
}

impl CardPatch {
    /// Whether applying this patch would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
