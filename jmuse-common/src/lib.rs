//! # jmuse Common Library
//!
//! Shared code for the jmuse workspace:
//! - Error and result types
//! - Configuration file model, lookup and atomic write-back

pub mod config;
pub mod error;

pub use config::{SeedStrategy, TomlConfig};
pub use error::{Error, Result};
