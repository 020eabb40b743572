//! # Project Card Studio
//!
//! Command-line host for project status cards: create and manage saved
//! cards, export them as PNG images and generate their text with AI.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p card-studio -- new --name "Orbit" --tag Beta --progress 40
//! cargo run -p card-studio -- export Orbit --output orbit.png
//! GEMINI_API_KEY=... cargo run -p card-studio -- generate Orbit "satellite tracker"
//! ```
//!
//! ## Architecture
//!
//! - `CliArgs` - Command-line arguments parsed with clap
//! - `StudioConfig` - Data directory, AI and export settings
//! - `CommandRunner` - Executes one [`Command`] against a `card_core::Studio`

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

mod commands;

pub use commands::{CommandRunner, StudioError};

use std::path::PathBuf;
use std::time::Duration;

use card_renderer::DEFAULT_FONT_CSS_URL;
use card_synth::{SynthConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
use clap::{Args, Parser, Subcommand, ValueEnum};

/// Command-line arguments for card-studio.
#[derive(Debug, Clone, Parser)]
#[command(name = "card-studio")]
#[command(about = "Create, export and generate project status cards")]
#[command(version)]
pub struct CliArgs {
    /// Directory holding saved cards and the theme preference
    #[arg(long, env = "CARD_DATA_DIR", default_value = "./card-data")]
    pub data_dir: PathBuf,

    /// API key for the generative endpoint
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Generative model name
    #[arg(long, env = "CARD_AI_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Generative endpoint root
    #[arg(long, env = "CARD_AI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub ai_base_url: String,

    /// Web font stylesheet embedded into exports
    #[arg(long, env = "CARD_FONT_URL", default_value = DEFAULT_FONT_CSS_URL)]
    pub font_url: String,

    /// Export with installed fonts only
    #[arg(long)]
    pub no_web_fonts: bool,

    /// Export pixel ratio
    #[arg(long, default_value = "1.0")]
    pub scale: f32,

    /// What to do
    #[command(subcommand)]
    pub command: Command,
}

/// Text fields settable from the command line.
#[derive(Debug, Clone, Default, PartialEq, Args)]
pub struct CardFields {
    /// Project name
    #[arg(long)]
    pub name: Option<String>,

    /// Tag shown in the badge
    #[arg(long)]
    pub tag: Option<String>,

    /// One-sentence description
    #[arg(long)]
    pub description: Option<String>,

    /// Completion percentage, clamped to 0-100
    #[arg(long)]
    pub progress: Option<f32>,

    /// Warning text shown under the progress bar
    #[arg(long)]
    pub warnings: Option<String>,

    /// Banner image URL or path
    #[arg(long)]
    pub image_url: Option<String>,
}

/// Subcommands.
#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Create and save a card
    New {
        /// Initial field values
        #[command(flatten)]
        fields: CardFields,

        /// Generate name, tag and description from this idea first
        #[arg(long)]
        idea: Option<String>,
    },

    /// List saved cards
    List,

    /// Print a saved card as JSON
    Show {
        /// Card name or ID
        card: String,
    },

    /// Delete a saved card
    Delete {
        /// Card name or ID
        card: String,
    },

    /// Render a saved card to PNG
    Export {
        /// Card name or ID
        card: String,

        /// Write the image here instead of the clipboard
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Fill a saved card's name, tag and description from an idea
    Generate {
        /// Card name or ID
        card: String,

        /// Free-text project idea
        idea: String,
    },

    /// Show or change the theme
    Theme {
        /// New theme; prints the current one when omitted
        #[arg(value_enum)]
        action: Option<ThemeAction>,
    },
}

/// Theme changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ThemeAction {
    /// Light surfaces
    Light,
    /// Dark surfaces
    Dark,
    /// Switch to the other theme
    Toggle,
}

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct StudioConfig {
    /// Directory holding saved cards and the theme preference.
    pub data_dir: PathBuf,
    /// Web font stylesheet, `None` for installed fonts only.
    pub font_url: Option<String>,
    /// Export pixel ratio.
    pub scale: f32,
    /// Generative endpoint settings.
    pub synth: SynthConfig,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl StudioConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data_dir: PathBuf::from("./card-data"),
            font_url: Some(DEFAULT_FONT_CSS_URL.to_string()),
            scale: 1.0,
            synth: SynthConfig::default(),
        }
    }
}

impl From<&CliArgs> for StudioConfig {
    fn from(args: &CliArgs) -> Self {
        let font_url = (!args.no_web_fonts && !args.font_url.trim().is_empty())
            .then(|| args.font_url.clone());
        Self {
            data_dir: args.data_dir.clone(),
            font_url,
            scale: args.scale,
            synth: SynthConfig {
                api_key: args.api_key.clone(),
                model: args.model.clone(),
                base_url: args.ai_base_url.clone(),
                request_timeout: Some(Duration::from_secs(30)),
            },
        }
    }
}

impl From<CliArgs> for StudioConfig {
    fn from(args: CliArgs) -> Self {
        Self::from(&args)
    }
}
