//! Image loading for banner inlining.
//!
//! Supports images from `http(s)` URLs, local files and data URIs. Every
//! source is decoded once to prove it is a usable image before it is
//! re-encoded as a base64 data URI for the SVG document.

use base64::Engine;
use reqwest::Client;

use crate::error::{RenderError, RenderResult};

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG with alpha support.
    Png,
    /// JPEG (no alpha).
    Jpeg,
    /// WebP (alpha support).
    WebP,
    /// GIF (first frame).
    Gif,
    /// Unknown/other format.
    Unknown,
}

impl ImageFormat {
    /// Detect format from MIME type.
    #[must_use]
    pub fn from_mime(mime: &str) -> Self {
        match mime.trim().to_lowercase().as_str() {
            "image/png" => Self::Png,
            "image/jpeg" | "image/jpg" => Self::Jpeg,
            "image/webp" => Self::WebP,
            "image/gif" => Self::Gif,
            _ => Self::Unknown,
        }
    }

    /// Detect format from magic bytes.
    #[must_use]
    pub fn from_magic_bytes(data: &[u8]) -> Self {
        if data.len() < 4 {
            return Self::Unknown;
        }

        // PNG: 89 50 4E 47
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Self::Png;
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Self::Jpeg;
        }

        // GIF: "GIF8"
        if data.starts_with(b"GIF8") {
            return Self::Gif;
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Self::WebP;
        }

        Self::Unknown
    }

    /// MIME type for data URIs.
    #[must_use]
    pub fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
            Self::Unknown => "application/octet-stream",
        }
    }
}

/// Decode `data` to prove it is a usable image and return its format.
///
/// # Errors
///
/// Returns an error if the image cannot be decoded.
pub fn validate_image(data: &[u8]) -> RenderResult<ImageFormat> {
    let format = ImageFormat::from_magic_bytes(data);
    image::load_from_memory(data)
        .map_err(|e| RenderError::Resource(format!("Failed to decode image: {e}")))?;
    Ok(format)
}

/// Encode image bytes as a base64 data URI.
#[must_use]
pub fn to_data_uri(data: &[u8], format: ImageFormat) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(data);
    format!("data:{};base64,{encoded}", format.mime())
}

/// Decode the payload of a data URI.
///
/// Supports formats like: `data:image/png;base64,iVBORw0KGgo...`
///
/// # Errors
///
/// Returns an error if the data URI is malformed.
pub fn decode_data_uri(uri: &str) -> RenderResult<Vec<u8>> {
    let uri_data = uri
        .strip_prefix("data:")
        .ok_or_else(|| RenderError::Resource("Not a data URI".to_string()))?;

    // Find the comma separating metadata from data
    let comma_pos = uri_data
        .find(',')
        .ok_or_else(|| RenderError::Resource("Invalid data URI: missing comma".to_string()))?;

    let metadata = &uri_data[..comma_pos];
    let encoded_data = &uri_data[comma_pos + 1..];

    if metadata.contains(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(encoded_data.trim())
            .map_err(|e| RenderError::Resource(format!("Failed to decode base64: {e}")))
    } else {
        urlencoding_decode(encoded_data)
    }
}

/// Simple URL decoding (percent-encoding).
fn urlencoding_decode(input: &str) -> RenderResult<Vec<u8>> {
    let bytes = input.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let byte = input
                .get(i + 1..i + 3)
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .ok_or_else(|| RenderError::Resource("Invalid URL encoding".to_string()))?;
            result.push(byte);
            i += 3;
        } else {
            result.push(bytes[i]);
            i += 1;
        }
    }

    Ok(result)
}

/// Load the image behind `href` and return it as a validated data URI.
///
/// # Errors
///
/// Returns an error if the image cannot be fetched, read or decoded.
pub async fn inline_image(client: &Client, href: &str) -> RenderResult<String> {
    let href = href.trim();
    let bytes = if href.starts_with("data:") {
        decode_data_uri(href)?
    } else if href.starts_with("http://") || href.starts_with("https://") {
        let response = client
            .get(href)
            .send()
            .await
            .map_err(|e| RenderError::Resource(format!("GET {href} failed: {e}")))?;
        if !response.status().is_success() {
            return Err(RenderError::Resource(format!(
                "GET {href} returned {}",
                response.status()
            )));
        }
        response
            .bytes()
            .await
            .map_err(|e| RenderError::Resource(format!("Reading {href} failed: {e}")))?
            .to_vec()
    } else {
        let path = href.strip_prefix("file://").unwrap_or(href);
        tokio::fs::read(path)
            .await
            .map_err(|e| RenderError::Resource(format!("Reading {path} failed: {e}")))?
    };

    let format = validate_image(&bytes)?;
    Ok(to_data_uri(&bytes, format))
}
