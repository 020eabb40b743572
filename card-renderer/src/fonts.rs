//! Best-effort fetching of the web font stylesheet and its font files.
//!
//! Every failure here is swallowed with a warning: an export without
//! embedded fonts falls back to system fonts rather than failing.

use reqwest::Client;
use url::Url;

use crate::error::{RenderError, RenderResult};

/// Stylesheet declaring every font a card can use.
pub const DEFAULT_FONT_CSS_URL: &str = "https://fonts.googleapis.com/css2?family=Inter:wght@400;500;600;700;800&family=Roboto+Slab:wght@400;700&family=Space+Mono:wght@400;700&display=swap";

/// Fonts gathered for one export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FontBundle {
    /// Stylesheet text, empty if it could not be fetched.
    pub css: String,
    /// Raw TrueType/OpenType font files referenced by the stylesheet.
    pub faces: Vec<Vec<u8>>,
}

impl FontBundle {
    /// Whether nothing was fetched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.css.is_empty() && self.faces.is_empty()
    }
}

/// Fetches the font stylesheet and the font files it references.
#[derive(Debug, Clone)]
pub struct FontFetcher {
    client: Client,
    css_url: Url,
}

impl FontFetcher {
    /// Create a fetcher for the stylesheet at `css_url`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidUrl`] if the URL is malformed.
    pub fn new(client: Client, css_url: &str) -> RenderResult<Self> {
        let css_url =
            Url::parse(css_url.trim()).map_err(|e| RenderError::InvalidUrl(e.to_string()))?;
        Ok(Self { client, css_url })
    }

    /// The stylesheet URL.
    #[must_use]
    pub fn css_url(&self) -> &Url {
        &self.css_url
    }

    /// Fetch the stylesheet text. Non-2xx responses and transport errors
    /// yield an empty string.
    pub async fn fetch_css(&self) -> String {
        let response = match self.client.get(self.css_url.clone()).send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!("Failed to fetch font CSS from {}: {e}", self.css_url);
                return String::new();
            }
        };

        if !response.status().is_success() {
            tracing::warn!(
                "Font CSS request to {} returned {}",
                self.css_url,
                response.status()
            );
            return String::new();
        }

        response.text().await.unwrap_or_else(|e| {
            tracing::warn!("Failed to read font CSS body: {e}");
            String::new()
        })
    }

    /// Fetch the stylesheet and every loadable font file it references.
    pub async fn fetch_bundle(&self) -> FontBundle {
        let css = self.fetch_css().await;
        let mut faces = Vec::new();

        for reference in extract_font_urls(&css) {
            let Ok(url) = self.css_url.join(&reference) else {
                tracing::warn!("Skipping malformed font URL {reference:?}");
                continue;
            };
            match self.fetch_face(&url).await {
                Some(data) => faces.push(data),
                None => tracing::debug!("Font {url} not loaded"),
            }
        }

        tracing::debug!(
            "Fetched font bundle: {} bytes of CSS, {} faces",
            css.len(),
            faces.len()
        );
        FontBundle { css, faces }
    }

    async fn fetch_face(&self, url: &Url) -> Option<Vec<u8>> {
        let response = match self.client.get(url.clone()).send().await {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(resp) => {
                tracing::warn!("Font request to {url} returned {}", resp.status());
                return None;
            }
            Err(e) => {
                tracing::warn!("Failed to fetch font {url}: {e}");
                return None;
            }
        };

        let data = response.bytes().await.ok()?.to_vec();
        if is_sfnt(&data) {
            Some(data)
        } else {
            // WOFF/WOFF2 cannot be loaded by the rasteriser.
            tracing::debug!("Font {url} is not TrueType/OpenType, skipping");
            None
        }
    }
}

/// Collect the targets of every `url(...)` in `css`, in order, without
/// duplicates.
#[must_use]
pub fn extract_font_urls(css: &str) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    let mut rest = css;

    while let Some(start) = rest.find("url(") {
        rest = &rest[start + 4..];
        let Some(end) = rest.find(')') else {
            break;
        };
        let target = rest[..end].trim().trim_matches(['"', '\'']).trim();
        if !target.is_empty() && !target.starts_with("data:") && !urls.iter().any(|u| u == target)
        {
            urls.push(target.to_string());
        }
        rest = &rest[end + 1..];
    }
    urls
}

/// Whether `data` starts with a TrueType, OpenType or collection header.
#[must_use]
pub fn is_sfnt(data: &[u8]) -> bool {
    let Some(head) = data.get(0..4) else {
        return false;
    };
    head == [0x00, 0x01, 0x00, 0x00] || head == b"OTTO" || head == b"true" || head == b"ttcf"
}
