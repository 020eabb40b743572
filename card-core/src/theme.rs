//! Light/dark theme preference and its persistence.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::blob::BlobStore;
use crate::store::StoreError;

/// Blob key for the theme preference.
pub const THEME_KEY: &str = "project-card-theme";

/// Process-wide colour theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light surfaces, dark text.
    Light,
    /// Dark surfaces, light text.
    #[default]
    Dark,
}

impl Theme {
    /// The other theme.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    /// Lowercase name, as persisted.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    /// Read the persisted preference. Missing or unreadable values fall back
    /// to the default theme.
    #[must_use]
    pub fn load(blob: &dyn BlobStore) -> Self {
        let raw = match blob.get(THEME_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::default(),
            Err(e) => {
                tracing::warn!("Failed to read theme preference: {e}");
                return Self::default();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!("Ignoring unreadable theme preference {raw:?}: {e}");
            Self::default()
        })
    }

    /// Persist this theme as the preference.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob store rejects the write.
    pub fn save(self, blob: &dyn BlobStore) -> Result<(), StoreError> {
        let json = serde_json::to_string(&self)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        blob.set(THEME_KEY, &json)
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(format!("unknown theme: {other}")),
        }
    }
}
