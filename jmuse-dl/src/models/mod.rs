//! Data model for a single score download run

pub mod score;

pub use score::{
    asset_file_name, sanitize_file_name, AssetFile, AssetFormat, EncryptionSeed, ScoreIdentifier,
    ScoreMetadata, SectionIndex, Signature,
};
