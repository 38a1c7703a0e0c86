//! Score service HTTP client
//!
//! One client (and so one cookie jar and connection pool) per run. It serves
//! three kinds of requests:
//! - plain text fetches (score page, client bundles)
//! - signed lookups against `/api/jmuse` that return a short-lived download URL
//! - streamed downloads of the asset behind that URL
//!
//! Requests are issued one at a time by the pipeline; nothing here retries.

use crate::models::{
    asset_file_name, AssetFile, AssetFormat, EncryptionSeed, ScoreIdentifier, SectionIndex,
};
use crate::services::signature::derive_signature;
use reqwest::header::AUTHORIZATION;
use reqwest::Url;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::debug;

const API_PATH: &str = "api/jmuse";

/// Longest slice of an error body kept in `ApiError`
const ERROR_BODY_LIMIT: usize = 200;

/// Score service client errors
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    /// Lookup succeeded but carried no `info.url`; usually a rejected signature
    #[error("No download URL for {format} section {section} (signature rejected?)")]
    MissingDownloadUrl {
        format: AssetFormat,
        section: SectionIndex,
    },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Connection settings for [`JmuseClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Service root, e.g. `https://musescore.com`
    pub api_base_url: String,
    pub user_agent: String,
    /// Applies to page, script and API requests, and to connecting for downloads
    pub request_timeout: Duration,
}

/// `/api/jmuse` response body
#[derive(Debug, Deserialize)]
struct JmuseResponse {
    info: Option<JmuseInfo>,
}

#[derive(Debug, Deserialize)]
struct JmuseInfo {
    url: Option<String>,
}

/// Score service client
pub struct JmuseClient {
    http_client: reqwest::Client,
    api_endpoint: Url,
    request_timeout: Duration,
}

impl JmuseClient {
    pub fn new(config: &ClientConfig) -> Result<Self, FetchError> {
        let base = config.api_base_url.trim_end_matches('/');
        let api_endpoint = Url::parse(&format!("{}/{}", base, API_PATH))
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", config.api_base_url, e)))?;

        // No overall timeout on the client: downloads may legitimately take
        // longer than any single API call.
        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .cookie_store(true)
            .connect_timeout(config.request_timeout)
            .build()
            .map_err(|e| FetchError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            api_endpoint,
            request_timeout: config.request_timeout,
        })
    }

    /// GET a text resource (score page or script bundle)
    pub async fn fetch_text(&self, url: &Url) -> Result<String, FetchError> {
        debug!(url = %url, "Fetching text resource");

        let response = self
            .http_client
            .get(url.clone())
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| FetchError::NetworkError(e.to_string()))?;

        let response = check_status(response).await?;

        response
            .text()
            .await
            .map_err(|e| FetchError::NetworkError(e.to_string()))
    }

    /// Ask the API for the download URL of one asset section
    pub async fn lookup_download_url(
        &self,
        id: &ScoreIdentifier,
        format: AssetFormat,
        section: SectionIndex,
        seed: &EncryptionSeed,
    ) -> Result<Url, FetchError> {
        let signature = derive_signature(id, format, section, seed);
        let index = section.to_string();

        debug!(
            id = %id,
            format = %format,
            section = section,
            signature = %signature,
            "Requesting signed download URL"
        );

        let response = self
            .http_client
            .get(self.api_endpoint.clone())
            .query(&[("id", id.as_str()), ("index", index.as_str()), ("type", format.tag())])
            .header(AUTHORIZATION, signature.as_str())
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| FetchError::NetworkError(e.to_string()))?;

        let response = check_status(response).await?;

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::NetworkError(e.to_string()))?;

        let parsed: JmuseResponse =
            serde_json::from_str(&body).map_err(|e| FetchError::ParseError(e.to_string()))?;

        let url = parsed
            .info
            .and_then(|info| info.url)
            .filter(|url| !url.trim().is_empty())
            .ok_or(FetchError::MissingDownloadUrl { format, section })?;

        Url::parse(&url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))
    }

    /// Stream `url` into `path`, returning the number of bytes written
    ///
    /// On failure a partially written file is left in place.
    pub async fn download_to(&self, url: &Url, path: &Path) -> Result<u64, FetchError> {
        debug!(path = %path.display(), "Downloading asset");

        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::NetworkError(e.to_string()))?;

        let mut response = check_status(response).await?;

        let mut file = tokio::fs::File::create(path).await?;
        let mut written: u64 = 0;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| FetchError::NetworkError(e.to_string()))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        debug!(path = %path.display(), bytes = written, "Download complete");
        Ok(written)
    }

    /// Look up and download one asset section
    ///
    /// The file lands at `{output_dir}/{base_name}{suffix}.{ext}`; see
    /// [`asset_file_name`].
    pub async fn fetch_asset(
        &self,
        id: &ScoreIdentifier,
        format: AssetFormat,
        section: SectionIndex,
        seed: &EncryptionSeed,
        output_dir: &Path,
        base_name: &str,
    ) -> Result<AssetFile, FetchError> {
        let download_url = self.lookup_download_url(id, format, section, seed).await?;

        let path = output_dir.join(asset_file_name(base_name, format, section));
        self.download_to(&download_url, &path).await?;

        Ok(AssetFile {
            path,
            format,
            section,
        })
    }
}

/// Turn non-2xx responses into `ApiError` with a trimmed body
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, FetchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let mut error_text = response.text().await.unwrap_or_default();
    if error_text.len() > ERROR_BODY_LIMIT {
        let mut cut = ERROR_BODY_LIMIT;
        while !error_text.is_char_boundary(cut) {
            cut -= 1;
        }
        error_text.truncate(cut);
    }

    Err(FetchError::ApiError(status.as_u16(), error_text))
}
