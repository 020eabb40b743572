//! Clients for the generative text endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{SynthError, SynthResult};

/// Maximum number of bytes of an error body kept in [`SynthError::Endpoint`].
const ERROR_BODY_LIMIT: usize = 512;

/// Something that turns a prompt into generated text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Send `prompt` and return the raw generated text.
    async fn generate(&self, prompt: &str) -> SynthResult<String>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate.
    fn into_text(self) -> Option<String> {
        let parts = self.candidates.into_iter().next()?.content?.parts;
        let text: String = parts.into_iter().filter_map(|p| p.text).collect();
        (!text.is_empty()).then_some(text)
    }
}

/// Client for a Gemini-style `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    endpoint: Url,
    api_key: String,
}

impl GeminiClient {
    /// Create a client for `model` under `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`SynthError::InvalidUrl`] if the URL is malformed.
    /// Returns [`SynthError::Http`] if the HTTP client fails to build.
    pub fn new(
        base_url: impl AsRef<str>,
        model: &str,
        api_key: impl Into<String>,
        timeout: Option<Duration>,
    ) -> SynthResult<Self> {
        let base =
            Url::parse(base_url.as_ref()).map_err(|e| SynthError::InvalidUrl(e.to_string()))?;
        let path = format!(
            "{}/v1beta/models/{model}:generateContent",
            base.path().trim_end_matches('/')
        );
        let mut endpoint = base;
        endpoint.set_path(&path);

        let mut builder =
            Client::builder().user_agent(concat!("card-synth/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            endpoint,
            api_key: api_key.into(),
        })
    }

    /// The `generateContent` URL, without the key.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> SynthResult<String> {
        let request = GenerateRequest {
            contents: [Content {
                parts: [RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };

        tracing::debug!("POST {}", self.endpoint);
        let response = self
            .http
            .post(self.endpoint.clone())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > ERROR_BODY_LIMIT {
                let mut cut = ERROR_BODY_LIMIT;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(SynthError::Endpoint {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let parsed: GenerateResponse = serde_json::from_slice(&bytes)?;
        parsed
            .into_text()
            .ok_or_else(|| SynthError::Parse("reply contained no generated text".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_path() {
        let client =
            GeminiClient::new("https://example.test", "demo-model", "k", None).expect("client");
        assert_eq!(
            client.endpoint().as_str(),
            "https://example.test/v1beta/models/demo-model:generateContent"
        );

        let nested = GeminiClient::new("http://127.0.0.1:8080/proxy/", "m", "k", None)
            .expect("client");
        assert_eq!(
            nested.endpoint().path(),
            "/proxy/v1beta/models/m:generateContent"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let err = GeminiClient::new("not a url", "m", "k", None).expect_err("invalid");
        assert!(matches!(err, SynthError::InvalidUrl(_)));
    }

    #[test]
    fn test_request_body_shape() {
        let request = GenerateRequest {
            contents: [Content {
                parts: [RequestPart { text: "hello" }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };
        assert_eq!(
            serde_json::to_value(&request).expect("serialize"),
            json!({
                "contents": [{"parts": [{"text": "hello"}]}],
                "generationConfig": {"responseMimeType": "application/json"}
            })
        );
    }

    #[test]
    fn test_response_text_extraction() {
        let parsed: GenerateResponse = serde_json::from_value(json!({
            "candidates": [
                {"content": {"parts": [{"text": "{\"name\":"}, {"text": "\"A\"}"}]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }))
        .expect("decode");
        assert_eq!(parsed.into_text().as_deref(), Some("{\"name\":\"A\"}"));

        let empty: GenerateResponse =
            serde_json::from_value(json!({"candidates": []})).expect("decode");
        assert_eq!(empty.into_text(), None);

        let blocked: GenerateResponse =
            serde_json::from_value(json!({"candidates": [{"finishReason": "SAFETY"}]}))
                .expect("decode");
        assert_eq!(blocked.into_text(), None);
    }
}
