//! Score, asset and seed types shared by the services and the pipeline

use jmuse_common::{Error, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Page index within a paginated asset; always 0 for audio and MIDI
pub type SectionIndex = u32;

/// Opaque score id: the last path segment of the score page URL
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScoreIdentifier(String);

impl ScoreIdentifier {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::InvalidInput("score identifier is empty".to_string()));
        }
        Ok(Self(id))
    }

    /// Take the identifier from a score page URL
    ///
    /// Query string, fragment and trailing slashes are ignored, so
    /// `https://host/user/1/scores/12345/?share=x` yields `12345`. A URL with
    /// an empty path has no identifier.
    pub fn from_url(url: &str) -> Result<Self> {
        let parsed = Url::parse(url.trim())
            .map_err(|e| Error::InvalidInput(format!("'{}' is not a URL: {}", url, e)))?;

        let last = parsed
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .ok_or_else(|| {
                Error::InvalidInput(format!("cannot find a score identifier in '{}'", url))
            })?;

        Self::new(last)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScoreIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Downloadable asset kinds
///
/// The wire tag and the file extension are fixed by the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetFormat {
    Audio,
    Midi,
    Image,
}

impl AssetFormat {
    /// Value of the `type` query parameter, also mixed into the signature
    pub fn tag(&self) -> &'static str {
        match self {
            AssetFormat::Audio => "mp3",
            AssetFormat::Midi => "midi",
            AssetFormat::Image => "img",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            AssetFormat::Audio => "mp3",
            AssetFormat::Midi => "midi",
            AssetFormat::Image => "svg",
        }
    }

    /// Human-readable name for progress lines
    pub fn label(&self) -> &'static str {
        match self {
            AssetFormat::Audio => "MP3",
            AssetFormat::Midi => "MIDI",
            AssetFormat::Image => "images",
        }
    }

    pub fn is_paginated(&self) -> bool {
        matches!(self, AssetFormat::Image)
    }
}

impl fmt::Display for AssetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Secret mixed into every request signature
///
/// One per run. `Debug` does not print the value.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionSeed(String);

impl EncryptionSeed {
    pub fn new(seed: impl Into<String>) -> Self {
        Self(seed.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EncryptionSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptionSeed(<{} chars>)", self.0.chars().count())
    }
}

/// 4-character lowercase hex request signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature(pub(crate) String);

impl Signature {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A downloaded file owned by the current run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFile {
    pub path: PathBuf,
    pub format: AssetFormat,
    pub section: SectionIndex,
}

/// Title and page count scraped from the score page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreMetadata {
    pub title: String,
    pub page_count: u32,
}

/// `{base_name}{suffix}.{ext}` where the suffix is empty for section 0
/// and `-{section}` otherwise
pub fn asset_file_name(base_name: &str, format: AssetFormat, section: SectionIndex) -> String {
    if section == 0 {
        format!("{}.{}", base_name, format.extension())
    } else {
        format!("{}-{}.{}", base_name, section, format.extension())
    }
}

/// Make a score title usable as a single file or folder name
pub fn sanitize_file_name(title: &str) -> String {
    let cleaned: String = title
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let cleaned = cleaned.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if cleaned.is_empty() {
        "score".to_string()
    } else {
        cleaned.to_string()
    }
}
