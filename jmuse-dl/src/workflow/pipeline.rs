//! Pipeline Orchestrator
//!
//! Sequences the services for one score. Nothing runs concurrently: each
//! request is awaited before the next is issued, and the first error ends the
//! run. Files already written stay where they are.
//!
//! # Example
//! ```rust,ignore
//! let pipeline = Pipeline::new(client, Box::new(ScriptSeedDiscovery), config)
//!     .with_reporter(Box::new(ConsoleReporter));
//! let summary = pipeline.run(url, &mut ConsolePrompter::new()).await?;
//! ```

use super::{NullReporter, PipelineError, PipelineEvent, ProgressReporter, RunSummary};
use crate::console::Prompter;
use crate::models::{sanitize_file_name, AssetFile, AssetFormat, EncryptionSeed, ScoreIdentifier};
use crate::services::document_assembler::{assemble_document, order_pages};
use crate::services::page_scraper::extract_metadata;
use crate::services::{JmuseClient, SeedProvider};
use reqwest::Url;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Per-run pipeline settings
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Parent of the per-score folder when no folder override is given
    pub output_root: PathBuf,
    /// Score name to use instead of the page title (skips the name prompt)
    pub name_override: Option<String>,
    /// Output folder to use instead of `{output_root}/{name}` (skips the folder prompt)
    pub folder_override: Option<PathBuf>,
}

/// Score download orchestrator
pub struct Pipeline {
    client: JmuseClient,
    seed_provider: Box<dyn SeedProvider>,
    config: PipelineConfig,
    reporter: Box<dyn ProgressReporter>,
}

impl Pipeline {
    pub fn new(
        client: JmuseClient,
        seed_provider: Box<dyn SeedProvider>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            client,
            seed_provider,
            config,
            reporter: Box::new(NullReporter),
        }
    }

    /// Replace the progress sink
    pub fn with_reporter(mut self, reporter: Box<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Download everything for the score at `page_url`
    ///
    /// # Arguments
    /// * `page_url` - Score page URL; its last path segment is the score id
    /// * `prompter` - Asked for name/folder overrides not fixed by config
    pub async fn run(
        &self,
        page_url: &str,
        prompter: &mut dyn Prompter,
    ) -> Result<RunSummary, PipelineError> {
        let id = ScoreIdentifier::from_url(page_url)?;
        let url = Url::parse(page_url.trim())
            .map_err(|e| PipelineError::InvalidInput(format!("'{}': {}", page_url, e)))?;

        info!(id = %id, url = %url, "Pipeline started");

        // Stage 1: score page
        self.emit(PipelineEvent::Loading {
            url: url.to_string(),
        });
        let page_html = self.client.fetch_text(&url).await?;

        // Stage 2: metadata
        let metadata = extract_metadata(&page_html)?;
        info!(title = %metadata.title, pages = metadata.page_count, "Score resolved");
        self.emit(PipelineEvent::ScoreResolved {
            id: id.clone(),
            metadata: metadata.clone(),
        });

        // Stage 3: overrides
        let name = self.choose_name(&metadata.title, prompter).await?;
        let folder = self.choose_folder(&name, prompter).await?;

        tokio::fs::create_dir_all(&folder).await?;
        debug!(folder = %folder.display(), "Output folder ready");
        self.emit(PipelineEvent::OutputReady {
            folder: folder.clone(),
        });

        // Stage 4: seed; no signed request may precede this
        let seed = self
            .seed_provider
            .acquire(&self.client, &page_html, &url)
            .await?;
        info!(strategy = self.seed_provider.name(), "Encryption seed acquired");
        self.emit(PipelineEvent::SeedAcquired {
            strategy: self.seed_provider.name().to_string(),
        });

        // Stage 5: single-section assets
        let audio = self
            .fetch_single(&id, AssetFormat::Audio, &seed, &folder, &name)
            .await?;
        let midi = self
            .fetch_single(&id, AssetFormat::Midi, &seed, &folder, &name)
            .await?;

        // Stage 6: pages, strictly in section order
        self.emit(PipelineEvent::AssetStarted {
            format: AssetFormat::Image,
        });
        let image_base = base_name(&name, AssetFormat::Image);
        let mut images: Vec<AssetFile> = Vec::with_capacity(metadata.page_count as usize);
        for section in 0..metadata.page_count {
            let image = self
                .client
                .fetch_asset(&id, AssetFormat::Image, section, &seed, &folder, &image_base)
                .await?;
            self.emit(PipelineEvent::PageDownloaded {
                section,
                total: metadata.page_count,
            });
            images.push(image);
        }
        self.emit(PipelineEvent::AssetCompleted {
            format: AssetFormat::Image,
        });

        // Stage 7: assemble + cleanup
        let ordered = order_pages(&images);
        let document_path = folder.join(format!("{}.pdf", name));
        self.emit(PipelineEvent::AssemblyStarted {
            pages: ordered.len(),
        });

        let output = document_path.clone();
        let assembled = tokio::task::spawn_blocking(move || assemble_document(&output, &ordered))
            .await
            .map_err(|e| PipelineError::Task(e.to_string()))??;

        let summary = RunSummary {
            folder,
            audio: audio.path,
            midi: midi.path,
            document: assembled.path,
            page_count: assembled.page_count,
        };

        info!(document = %summary.document.display(), "Pipeline finished");
        self.emit(PipelineEvent::Finished {
            summary: summary.clone(),
        });

        Ok(summary)
    }

    async fn fetch_single(
        &self,
        id: &ScoreIdentifier,
        format: AssetFormat,
        seed: &EncryptionSeed,
        folder: &Path,
        name: &str,
    ) -> Result<AssetFile, PipelineError> {
        self.emit(PipelineEvent::AssetStarted { format });
        let asset = self
            .client
            .fetch_asset(id, format, 0, seed, folder, &base_name(name, format))
            .await?;
        self.emit(PipelineEvent::AssetCompleted { format });
        Ok(asset)
    }

    /// Score name used for every output file name
    async fn choose_name(
        &self,
        title: &str,
        prompter: &mut dyn Prompter,
    ) -> Result<String, PipelineError> {
        let chosen = match &self.config.name_override {
            Some(name) => name.clone(),
            None => prompter
                .ask("Score name", Some(title))
                .await?
                .unwrap_or_else(|| title.to_string()),
        };
        Ok(sanitize_file_name(&chosen))
    }

    async fn choose_folder(
        &self,
        name: &str,
        prompter: &mut dyn Prompter,
    ) -> Result<PathBuf, PipelineError> {
        if let Some(folder) = &self.config.folder_override {
            return Ok(folder.clone());
        }

        let default = self.config.output_root.join(name);
        let default_text = default.to_string_lossy().into_owned();
        let answer = prompter.ask("Output folder", Some(&default_text)).await?;
        Ok(answer.map(PathBuf::from).unwrap_or(default))
    }

    fn emit(&self, event: PipelineEvent) {
        self.reporter.report(&event);
    }
}

/// `{name}-{tag}`, the stem shared by all sections of one format
fn base_name(name: &str, format: AssetFormat) -> String {
    format!("{}-{}", name, format.tag())
}
