//! Executes subcommands against a file-backed studio.

use std::path::Path;
use std::sync::Arc;

use card_core::{CardId, CardPatch, FileBlobStore, Notification, StoreError, Studio};
use card_renderer::{
    export_notification, CardExporter, ExportConfig, ExportPipeline, ExportSink, FileSink,
    FontFetcher, RenderError,
};
use card_synth::{synthesis_notification, SynthError, Synthesizer};
use reqwest::Client;
use thiserror::Error;

use crate::{CardFields, Command, StudioConfig, ThemeAction};

/// Errors surfaced by a command.
#[derive(Debug, Error)]
pub enum StudioError {
    /// Store or validation failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Export failure.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// AI synthesis failure.
    #[error(transparent)]
    Synth(#[from] SynthError),

    /// No saved card matches the given name or ID.
    #[error("no saved card named or with ID \"{0}\"")]
    UnknownCard(String),

    /// The command cannot run in this build or configuration.
    #[error("{0}")]
    Unsupported(String),

    /// JSON output failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CardFields {
    fn into_patch(self) -> CardPatch {
        CardPatch {
            name: self.name,
            tag: self.tag,
            description: self.description,
            progress: self.progress,
            warnings: self.warnings,
            image_url: self.image_url,
            ..CardPatch::default()
        }
    }
}

/// Runs commands, one studio per process.
pub struct CommandRunner {
    config: StudioConfig,
    studio: Studio,
    synthesizer: Synthesizer,
    client: Client,
}

impl std::fmt::Debug for CommandRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRunner")
            .field("config", &self.config.data_dir)
            .field("studio", &self.studio)
            .finish_non_exhaustive()
    }
}

impl CommandRunner {
    /// Open the data directory and build the AI client.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be opened, the saved
    /// cards cannot be read, or an HTTP client cannot be built.
    pub fn open(config: StudioConfig) -> Result<Self, StudioError> {
        let blob = FileBlobStore::open(config.data_dir.clone())?;
        let studio = Studio::open(Arc::new(blob))?;
        let synthesizer = Synthesizer::from_config(&config.synth)?;
        let client = Client::builder()
            .user_agent(concat!("card-studio/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(RenderError::from)?;

        tracing::debug!(
            "Opened {} with {} saved card(s)",
            config.data_dir.display(),
            studio.store().len()
        );
        Ok(Self {
            config,
            studio,
            synthesizer,
            client,
        })
    }

    /// The underlying studio.
    #[must_use]
    pub fn studio(&self) -> &Studio {
        &self.studio
    }

    /// Run one command and return what it prints.
    ///
    /// # Errors
    ///
    /// Returns the first error the command hits. State is unchanged on error.
    pub async fn run(&mut self, command: Command) -> Result<String, StudioError> {
        match command {
            Command::New { fields, idea } => self.new_card(fields, idea.as_deref()).await,
            Command::List => Ok(self.list()),
            Command::Show { card } => self.show(&card),
            Command::Delete { card } => self.delete(&card),
            Command::Export { card, output } => self.export(&card, output.as_deref()).await,
            Command::Generate { card, idea } => self.generate(&card, &idea).await,
            Command::Theme { action } => self.theme(action),
        }
    }

    async fn new_card(
        &mut self,
        fields: CardFields,
        idea: Option<&str>,
    ) -> Result<String, StudioError> {
        self.studio.new_card();
        if let Some(idea) = idea {
            self.synthesize_into_current(idea).await?;
        }
        // Explicit flags win over generated text.
        self.studio.apply_patch(fields.into_patch());
        self.studio.save_current()?;
        Ok(format!("{}\n{}", self.message(), self.studio.current().id))
    }

    fn list(&self) -> String {
        let cards = self.studio.store().list();
        if cards.is_empty() {
            return "No saved cards.".to_string();
        }
        cards
            .iter()
            .map(|c| format!("{}  {}  [{}]  {:.0}%", c.id, c.name, c.tag, c.progress))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn show(&self, key: &str) -> Result<String, StudioError> {
        let id = self.resolve(key)?;
        let card = self
            .studio
            .store()
            .get(id)
            .ok_or_else(|| StudioError::UnknownCard(key.to_string()))?;
        Ok(serde_json::to_string_pretty(card)?)
    }

    fn delete(&mut self, key: &str) -> Result<String, StudioError> {
        let id = self.resolve(key)?;
        self.studio.delete(id)?;
        Ok(self.message())
    }

    async fn export(&mut self, key: &str, output: Option<&Path>) -> Result<String, StudioError> {
        let id = self.resolve(key)?;
        self.studio.load(id)?;

        let sink = Self::sink_for(output)?;
        let fonts = match &self.config.font_url {
            Some(url) => Some(FontFetcher::new(self.client.clone(), url)?),
            None => None,
        };
        let exporter = CardExporter::new(ExportConfig {
            scale: self.config.scale,
            ..ExportConfig::default()
        });
        let pipeline = ExportPipeline::new(exporter, fonts, self.client.clone(), sink);

        let tree = self.studio.render_tree();
        let result = pipeline.export(Some(&tree)).await;
        let notification = match (&result, output) {
            (Ok(_), Some(path)) => {
                Notification::success(format!("Image written to {}", path.display()))
            }
            _ => export_notification(&result),
        };
        self.studio.notify(notification);
        result?;
        Ok(self.message())
    }

    fn sink_for(output: Option<&Path>) -> Result<Arc<dyn ExportSink>, StudioError> {
        match output {
            Some(path) => Ok(Arc::new(FileSink::new(path))),
            #[cfg(feature = "clipboard")]
            None => Ok(Arc::new(card_renderer::ClipboardSink)),
            #[cfg(not(feature = "clipboard"))]
            None => Err(StudioError::Unsupported(
                "built without clipboard support, pass --output".to_string(),
            )),
        }
    }

    async fn generate(&mut self, key: &str, idea: &str) -> Result<String, StudioError> {
        let id = self.resolve(key)?;
        self.studio.load(id)?;
        self.synthesize_into_current(idea).await?;
        let generated = self.message();
        self.studio.save_current()?;
        Ok(format!("{generated}\n{}", self.message()))
    }

    /// Merge generated text into whatever card is current when the reply
    /// arrives.
    async fn synthesize_into_current(&mut self, idea: &str) -> Result<(), StudioError> {
        let result = self.synthesizer.synthesize(idea).await;
        self.studio.notify(synthesis_notification(&result));
        let patch = result?;
        self.studio.apply_patch(patch.to_card_patch());
        Ok(())
    }

    fn theme(&mut self, action: Option<ThemeAction>) -> Result<String, StudioError> {
        let theme = match action {
            None => self.studio.theme(),
            Some(ThemeAction::Light) => self.studio.set_theme(card_core::Theme::Light)?,
            Some(ThemeAction::Dark) => self.studio.set_theme(card_core::Theme::Dark)?,
            Some(ThemeAction::Toggle) => self.studio.toggle_theme()?,
        };
        Ok(format!("Theme: {theme}"))
    }

    /// Resolve an ID or a case-insensitive name to a saved card.
    fn resolve(&self, key: &str) -> Result<CardId, StudioError> {
        let store = self.studio.store();
        if let Ok(id) = CardId::parse(key) {
            if store.get(id).is_some() {
                return Ok(id);
            }
        }
        store
            .find_by_name(key)
            .map(|c| c.id)
            .ok_or_else(|| StudioError::UnknownCard(key.to_string()))
    }

    fn message(&mut self) -> String {
        self.studio
            .notification()
            .map(|n| n.message.clone())
            .unwrap_or_default()
    }
}
