//! jmuse-dl library interface
//!
//! Downloads a score's audio, MIDI and page images from the score service and
//! assembles the pages into one PDF. Exposed as a library so the pipeline can
//! be driven from integration tests against a local fake service.

pub mod config;
pub mod console;
pub mod models;
pub mod services;
pub mod workflow;

pub use crate::workflow::{Pipeline, PipelineConfig, PipelineError, PipelineEvent, RunSummary};
