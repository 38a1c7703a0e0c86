//! Encryption seed acquisition
//!
//! The seed that goes into every request signature lives in the service's
//! client bundle and changes over time. Two strategies are available:
//! - [`ScriptSeedDiscovery`] fetches the page's preloaded scripts and reads the
//!   literal out of the signing call (default)
//! - [`ConstantSeed`] uses a configured value and never touches the network
//!
//! Whichever is chosen, it runs once per run, before any signed request.

use crate::models::EncryptionSeed;
use crate::services::jmuse_client::JmuseClient;
use crate::services::page_scraper::{extract_seed_literal, preload_script_urls};
use async_trait::async_trait;
use jmuse_common::config::DEFAULT_FALLBACK_SEED;
use jmuse_common::SeedStrategy;
use reqwest::Url;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Seed acquisition errors
#[derive(Debug, Error)]
pub enum SeedError {
    /// None of the preloaded scripts contained the signing call
    #[error("Encryption seed not found in the score page's scripts")]
    NotFound,

    #[error("Configured seed is empty")]
    EmptySeed,
}

/// Capability for obtaining the per-run encryption seed
#[async_trait]
pub trait SeedProvider: Send + Sync {
    /// Strategy name for progress reporting
    fn name(&self) -> &'static str;

    /// Produce the seed for this run
    ///
    /// # Arguments
    /// * `client` - Session used for any script fetches
    /// * `page_html` - Score page markup, already fetched by the pipeline
    /// * `page_url` - Score page URL, for resolving relative script links
    async fn acquire(
        &self,
        client: &JmuseClient,
        page_html: &str,
        page_url: &Url,
    ) -> Result<EncryptionSeed, SeedError>;
}

/// Fixed seed from configuration
#[derive(Debug, Clone)]
pub struct ConstantSeed {
    seed: String,
}

impl ConstantSeed {
    pub fn new(seed: impl Into<String>) -> Self {
        Self { seed: seed.into() }
    }
}

impl Default for ConstantSeed {
    fn default() -> Self {
        Self::new(DEFAULT_FALLBACK_SEED)
    }
}

#[async_trait]
impl SeedProvider for ConstantSeed {
    fn name(&self) -> &'static str {
        "constant"
    }

    async fn acquire(
        &self,
        _client: &JmuseClient,
        _page_html: &str,
        _page_url: &Url,
    ) -> Result<EncryptionSeed, SeedError> {
        if self.seed.is_empty() {
            return Err(SeedError::EmptySeed);
        }
        Ok(EncryptionSeed::new(self.seed.clone()))
    }
}

/// Seed read from the page's preloaded client bundle
#[derive(Debug, Clone, Default)]
pub struct ScriptSeedDiscovery;

#[async_trait]
impl SeedProvider for ScriptSeedDiscovery {
    fn name(&self) -> &'static str {
        "discover"
    }

    async fn acquire(
        &self,
        client: &JmuseClient,
        page_html: &str,
        page_url: &Url,
    ) -> Result<EncryptionSeed, SeedError> {
        discover_seed(client, page_html, page_url)
            .await
            .ok_or(SeedError::NotFound)
    }
}

/// Scan preloaded scripts in document order and return the first seed found
///
/// A script that fails to download is skipped. Returns `None` when no script
/// yields the pattern; the caller must not issue signed requests then.
pub async fn discover_seed(
    client: &JmuseClient,
    page_html: &str,
    page_url: &Url,
) -> Option<EncryptionSeed> {
    let candidates = preload_script_urls(page_html, page_url);
    debug!(count = candidates.len(), "Preloaded script candidates");

    for script_url in &candidates {
        let script = match client.fetch_text(script_url).await {
            Ok(text) => text,
            Err(e) => {
                warn!(url = %script_url, error = %e, "Skipping script that failed to load");
                continue;
            }
        };

        if let Some(seed) = extract_seed_literal(&script) {
            info!(url = %script_url, "Encryption seed found");
            return Some(EncryptionSeed::new(seed));
        }
    }

    warn!(
        candidates = candidates.len(),
        "No preloaded script contained the encryption seed"
    );
    None
}

/// Build the provider selected by configuration
///
/// An explicit seed value always means the constant strategy.
pub fn provider_for(strategy: SeedStrategy, value: Option<String>) -> Box<dyn SeedProvider> {
    match (strategy, value) {
        (_, Some(seed)) => Box::new(ConstantSeed::new(seed)),
        (SeedStrategy::Constant, None) => Box::new(ConstantSeed::default()),
        (SeedStrategy::Discover, None) => Box::new(ScriptSeedDiscovery),
    }
}
