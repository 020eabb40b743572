//! # Card Core
//!
//! The styled project card, its style resolvers, the saved card store and
//! the layout that turns a card into a render tree.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                  card-core                  │
//! ├─────────────────────────────────────────────┤
//! │  Card Entity     │  Style Resolvers         │
//! │  - Defaults      │  - Shadow / radius       │
//! │  - Patch / links │  - Font / fill / meteo   │
//! │  - Validation    │  - Theme palette         │
//! ├─────────────────────────────────────────────┤
//! │  Project Store   │  Render Tree Builder     │
//! │  - Blob stores   │  - Layout                │
//! │  - Active card   │  - Text wrapping         │
//! ├─────────────────────────────────────────────┤
//! │  Studio: theme, notifications, actions      │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod blob;
pub mod builder;
pub mod card;
pub mod error;
pub mod notify;
pub mod store;
pub mod studio;
pub mod style;
pub mod theme;
pub mod tree;

pub use blob::{BlobStore, FileBlobStore, MemoryBlobStore};
pub use builder::build_render_tree;
pub use card::{
    CardEntity, CardId, CardPatch, ColorMode, FontFamily, GradientSpec, LinkId, LinkKind,
    MeteoStatus, ProjectLink, ShadowStyle,
};
pub use error::{CardError, CardResult};
pub use notify::{Notification, NotificationKind, Notifier, NOTIFICATION_TTL};
pub use store::{Deletion, ProjectStore, StoreError};
pub use studio::Studio;
pub use style::{Color, Fill, FontSpec, MeteoSpec, Palette, ShadowSpec};
pub use theme::Theme;
pub use tree::{NodeKind, NodeRole, Rect, RenderNode, RenderTree, TextAnchor, TextStyle};

/// Card core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
