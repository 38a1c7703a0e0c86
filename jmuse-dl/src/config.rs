//! Run configuration resolution for jmuse-dl
//!
//! **Priority:** CLI flag / ENV (both via clap) → TOML → built-in default

use crate::services::{provider_for, ClientConfig, SeedProvider};
use crate::workflow::PipelineConfig;
use jmuse_common::config::{
    DEFAULT_API_BASE_URL, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_USER_AGENT,
};
use jmuse_common::{SeedStrategy, TomlConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub api_base_url: Option<String>,
    pub seed: Option<String>,
    pub seed_strategy: Option<SeedStrategy>,
    pub name: Option<String>,
    pub output: Option<PathBuf>,
}

/// Fully resolved settings for one run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub client: ClientConfig,
    pub seed_strategy: SeedStrategy,
    /// Only set when the constant strategy is in effect
    pub seed_value: Option<String>,
    pub pipeline: PipelineConfig,
    pub log_level: String,
}

impl RunConfig {
    /// Merge CLI/ENV overrides over the TOML file over defaults
    ///
    /// `current_dir` is the output root when neither CLI nor TOML names one.
    pub fn resolve(cli: CliOverrides, toml: &TomlConfig, current_dir: PathBuf) -> Self {
        let api_base_url = cli
            .api_base_url
            .or_else(|| toml.api_base_url.clone())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        let user_agent = toml
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        let timeout_secs = toml
            .request_timeout_secs
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        let (seed_strategy, seed_value) = match cli.seed {
            Some(seed) => (SeedStrategy::Constant, Some(seed)),
            None => {
                let strategy = cli.seed_strategy.unwrap_or(toml.seed.strategy);
                let value = match strategy {
                    SeedStrategy::Constant => toml.seed.value.clone(),
                    SeedStrategy::Discover => None,
                };
                (strategy, value)
            }
        };

        let output_root = toml.output_root.clone().unwrap_or(current_dir);

        Self {
            client: ClientConfig {
                api_base_url,
                user_agent,
                request_timeout: Duration::from_secs(timeout_secs),
            },
            seed_strategy,
            seed_value,
            pipeline: PipelineConfig {
                output_root,
                name_override: cli.name,
                folder_override: cli.output,
            },
            log_level: toml.logging.level.clone(),
        }
    }

    /// Seed strategy selected by this configuration
    pub fn seed_provider(&self) -> Box<dyn SeedProvider> {
        info!(strategy = %self.seed_strategy, "Seed strategy selected");
        provider_for(self.seed_strategy, self.seed_value.clone())
    }
}
