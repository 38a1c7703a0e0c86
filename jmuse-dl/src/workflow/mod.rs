//! Score download workflow
//!
//! A run is strictly linear:
//!
//! ```text
//! fetch page → metadata → name/folder overrides → create folder
//!   → acquire seed (abort if absent) → audio → MIDI → pages 0..n
//!   → order + assemble PDF → delete page images → done
//! ```
//!
//! Every stage is fatal on error. Progress is pushed to a [`ProgressReporter`]
//! synchronously so it interleaves correctly with interactive prompts.

pub mod pipeline;

pub use pipeline::{Pipeline, PipelineConfig};

use crate::models::{AssetFormat, ScoreIdentifier, ScoreMetadata, SectionIndex};
use crate::services::{AssembleError, FetchError, ScrapeError, SeedError};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Outputs of a completed run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Folder holding every output
    pub folder: PathBuf,
    pub audio: PathBuf,
    pub midi: PathBuf,
    /// Assembled PDF
    pub document: PathBuf,
    pub page_count: usize,
}

/// Progress events emitted during a run
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    /// Score page is being fetched
    Loading {
        /// Score page URL
        url: String,
    },

    /// Title and page count known
    ScoreResolved {
        id: ScoreIdentifier,
        metadata: ScoreMetadata,
    },

    /// Output folder chosen and created
    OutputReady {
        folder: PathBuf,
    },

    /// Encryption seed obtained
    SeedAcquired {
        /// Strategy name ("discover" or "constant")
        strategy: String,
    },

    /// Download of an asset (or of all pages) started
    AssetStarted {
        format: AssetFormat,
    },

    /// One page image stored
    PageDownloaded {
        /// Section index (0-based)
        section: SectionIndex,
        /// Total pages in the score
        total: u32,
    },

    /// Download of an asset (or of all pages) finished
    AssetCompleted {
        format: AssetFormat,
    },

    /// PDF assembly started
    AssemblyStarted {
        pages: usize,
    },

    /// Run completed
    Finished {
        summary: RunSummary,
    },
}

/// Receives pipeline progress
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: &PipelineEvent);
}

/// Drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn report(&self, _event: &PipelineEvent) {}
}

/// Pipeline errors; each stage's error converts into this
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Common(#[from] jmuse_common::Error),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Score page not understood: {0}")]
    Scrape(#[from] ScrapeError),

    #[error("Seed unavailable: {0}")]
    Seed(#[from] SeedError),

    #[error("Document assembly failed: {0}")]
    Assemble(#[from] AssembleError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Blocking assembly task panicked or was cancelled
    #[error("Background task failed: {0}")]
    Task(String),
}
