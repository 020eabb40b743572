//! # Card Synth
//!
//! Generates a card's name, tag and description from a free-text idea.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────────┬──────────────┬──────────────┐
//! │ Idea →       │ Generative   │ Fenced JSON  │
//! │ prompt       │ endpoint     │ → patch      │
//! └──────────────┴──────────────┴──────────────┘
//! ```
//!
//! The synthesizer only produces a [`SynthesisPatch`]. Applying it to a card
//! is the caller's decision.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod error;
pub mod parse;
pub mod synthesizer;

pub use client::{GeminiClient, TextGenerator};
pub use error::{SynthError, SynthResult};
pub use parse::{parse_response, render_prompt, strip_code_fence, SynthesisPatch};
pub use synthesizer::{
    synthesis_notification, SynthConfig, SynthState, Synthesizer, DEFAULT_BASE_URL, DEFAULT_MODEL,
};

/// Card synth version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
