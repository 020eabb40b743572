//! The synthesis state machine.
//!
//! ```text
//! Idle ─▶ Requesting ─▶ Parsing ─▶ Idle
//!              │            │
//!              └──▶ Failed ◀┘ ─▶ Idle
//! ```
//!
//! The credential is checked before anything else, so a missing key leaves
//! no transitions behind. At most one synthesis runs at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use card_core::Notification;

use crate::client::{GeminiClient, TextGenerator};
use crate::error::{SynthError, SynthResult};
use crate::parse::{parse_response, render_prompt, SynthesisPatch};

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-04-17";

/// Endpoint root used when none is configured.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Configuration for the synthesizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthConfig {
    /// API key. Synthesis fails fast without one.
    pub api_key: Option<String>,
    /// Model name.
    pub model: String,
    /// Endpoint root.
    pub base_url: String,
    /// Overall request timeout.
    pub request_timeout: Option<Duration>,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Named stages of a synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SynthState {
    /// Nothing running.
    Idle,
    /// Waiting for the endpoint.
    Requesting,
    /// Turning the reply into fields.
    Parsing,
    /// The request or the parse failed.
    Failed,
}

/// Generates card content from a free-text idea.
pub struct Synthesizer {
    generator: Option<Arc<dyn TextGenerator>>,
    busy: AtomicBool,
    state: Mutex<SynthState>,
    transitions: Mutex<Vec<SynthState>>,
}

impl std::fmt::Debug for Synthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synthesizer")
            .field("has_credential", &self.has_credential())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Synthesizer {
    /// Build a synthesizer talking to the configured endpoint. A blank or
    /// missing key yields a synthesizer that always reports
    /// [`SynthError::MissingCredential`].
    ///
    /// # Errors
    ///
    /// Returns [`SynthError::InvalidUrl`] or [`SynthError::Http`] if the
    /// client cannot be built.
    pub fn from_config(config: &SynthConfig) -> SynthResult<Self> {
        let key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty());
        let generator = match key {
            Some(key) => Some(Arc::new(GeminiClient::new(
                &config.base_url,
                &config.model,
                key,
                config.request_timeout,
            )?) as Arc<dyn TextGenerator>),
            None => {
                tracing::debug!("No API key configured, synthesis disabled");
                None
            }
        };
        Ok(Self::with_generator(generator))
    }

    /// Build a synthesizer around any generator. `None` means no credential.
    #[must_use]
    pub fn with_generator(generator: Option<Arc<dyn TextGenerator>>) -> Self {
        Self {
            generator,
            busy: AtomicBool::new(false),
            state: Mutex::new(SynthState::Idle),
            transitions: Mutex::new(Vec::new()),
        }
    }

    /// Whether a credential is configured.
    #[must_use]
    pub fn has_credential(&self) -> bool {
        self.generator.is_some()
    }

    /// Current stage.
    #[must_use]
    pub fn state(&self) -> SynthState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stages entered by the most recent synthesis, in order.
    #[must_use]
    pub fn transitions(&self) -> Vec<SynthState> {
        self.transitions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether a synthesis is running.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Ask the endpoint for content matching `idea`.
    ///
    /// The result is a patch; the caller applies it to whichever card is
    /// current when it arrives.
    ///
    /// # Errors
    ///
    /// - [`SynthError::MissingCredential`] without a key, before any request.
    /// - [`SynthError::Busy`] if another synthesis is running.
    /// - Transport, endpoint and parse errors otherwise.
    pub async fn synthesize(&self, idea: &str) -> SynthResult<SynthesisPatch> {
        let Some(generator) = self.generator.as_ref() else {
            return Err(SynthError::MissingCredential);
        };

        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SynthError::Busy);
        }
        let _guard = BusyGuard(&self.busy);

        self.transitions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();

        let result = self.run(generator.as_ref(), idea).await;
        match &result {
            Ok(patch) => tracing::info!(
                "Generated card content (name: {}, tag: {}, description: {})",
                patch.name.is_some(),
                patch.tag.is_some(),
                patch.description.is_some()
            ),
            Err(e) => {
                tracing::warn!("Synthesis failed: {e}");
                self.enter(SynthState::Failed);
            }
        }
        self.enter(SynthState::Idle);
        result
    }

    async fn run(&self, generator: &dyn TextGenerator, idea: &str) -> SynthResult<SynthesisPatch> {
        self.enter(SynthState::Requesting);
        let raw = generator.generate(&render_prompt(idea)).await?;

        self.enter(SynthState::Parsing);
        parse_response(&raw)
    }

    fn enter(&self, next: SynthState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        tracing::debug!("Synthesis state {:?} -> {next:?}", *state);
        *state = next;
        self.transitions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(next);
    }
}

/// The user-facing notification for a synthesis outcome.
#[must_use]
pub fn synthesis_notification<T>(result: &SynthResult<T>) -> Notification {
    match result {
        Ok(_) => Notification::success("Content generated with AI!"),
        Err(SynthError::MissingCredential) => Notification::error("API_KEY is not configured."),
        Err(_) => Notification::error("Failed to generate AI content."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct Canned {
        reply: SynthResult<String>,
        calls: AtomicUsize,
        last_prompt: Mutex<String>,
    }

    impl Canned {
        fn ok(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(String::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: Err(SynthError::Endpoint {
                    status: 500,
                    body: "boom".into(),
                }),
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(String::new()),
            })
        }
    }

    /// Generator that holds its reply until released.
    #[derive(Default)]
    struct Gated {
        started: tokio::sync::Notify,
        release: tokio::sync::Notify,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextGenerator for Gated {
        async fn generate(&self, _prompt: &str) -> SynthResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.started.notify_one();
            self.release.notified().await;
            Ok(r#"{"name":"X"}"#.to_string())
        }
    }

    #[async_trait]
    impl TextGenerator for Canned {
        async fn generate(&self, prompt: &str) -> SynthResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().expect("lock") = prompt.to_string();
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(_) => Err(SynthError::Endpoint {
                    status: 500,
                    body: "boom".into(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn test_missing_credential_makes_no_call() {
        let synth = Synthesizer::with_generator(None);
        let result = synth.synthesize("anything").await;
        assert!(matches!(result, Err(SynthError::MissingCredential)));
        assert!(synth.transitions().is_empty());
        assert_eq!(
            synthesis_notification(&result).message,
            "API_KEY is not configured."
        );
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        let synth = Synthesizer::from_config(&SynthConfig {
            api_key: Some("   ".into()),
            ..SynthConfig::default()
        })
        .expect("build");
        assert!(!synth.has_credential());

        let keyed = Synthesizer::from_config(&SynthConfig {
            api_key: Some("secret".into()),
            ..SynthConfig::default()
        })
        .expect("build");
        assert!(keyed.has_credential());
    }

    #[tokio::test]
    async fn test_success_transitions() {
        let canned = Canned::ok(r#"{"name":"PawPath","tag":"MVP","description":"Walks."}"#);
        let synth = Synthesizer::with_generator(Some(canned.clone()));

        let result = synth.synthesize("dog walking").await;
        let patch = result.as_ref().expect("patch");
        assert_eq!(patch.name.as_deref(), Some("PawPath"));
        assert_eq!(
            synth.transitions(),
            vec![SynthState::Requesting, SynthState::Parsing, SynthState::Idle]
        );
        assert_eq!(canned.calls.load(Ordering::SeqCst), 1);
        assert!(canned
            .last_prompt
            .lock()
            .expect("lock")
            .contains("Idea: \"dog walking\"."));
        assert_eq!(
            synthesis_notification(&result).message,
            "Content generated with AI!"
        );
        assert!(!synth.is_busy());
    }

    #[tokio::test]
    async fn test_endpoint_failure_transitions() {
        let synth = Synthesizer::with_generator(Some(Canned::failing()));
        let result = synth.synthesize("idea").await;
        assert!(matches!(result, Err(SynthError::Endpoint { status: 500, .. })));
        assert_eq!(
            synth.transitions(),
            vec![SynthState::Requesting, SynthState::Failed, SynthState::Idle]
        );
        assert_eq!(
            synthesis_notification(&result).message,
            "Failed to generate AI content."
        );
    }

    #[tokio::test]
    async fn test_parse_failure_transitions() {
        let synth = Synthesizer::with_generator(Some(Canned::ok("I cannot help with that.")));
        let result = synth.synthesize("idea").await;
        assert!(result.is_err_and(|e| e.is_parse()));
        assert_eq!(
            synth.transitions(),
            vec![
                SynthState::Requesting,
                SynthState::Parsing,
                SynthState::Failed,
                SynthState::Idle
            ]
        );
        assert_eq!(synth.state(), SynthState::Idle);
    }

    #[tokio::test]
    async fn test_busy_rejects_second_request() {
        let gated = Arc::new(Gated::default());
        let synth = Synthesizer::with_generator(Some(gated.clone()));

        let first = synth.synthesize("first");
        let second = async {
            gated.started.notified().await;
            let rejected = synth.synthesize("second").await;
            assert!(synth.is_busy());
            assert_eq!(synth.state(), SynthState::Requesting);
            gated.release.notify_one();
            rejected
        };
        let (first, second) = tokio::join!(first, second);

        assert_eq!(first.expect("first").name.as_deref(), Some("X"));
        assert!(matches!(second, Err(SynthError::Busy)));
        assert_eq!(gated.calls.load(Ordering::SeqCst), 1);
        assert!(!synth.is_busy());

        // The guard is released once the first synthesis ends.
        gated.release.notify_one();
        assert!(synth.synthesize("third").await.is_ok());
        assert_eq!(gated.calls.load(Ordering::SeqCst), 2);
    }
}
