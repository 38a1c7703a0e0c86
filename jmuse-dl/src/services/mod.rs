//! Score service access and document production
//!
//! - [`signature`]: request signature derivation
//! - [`page_scraper`]: title, page count, script links and seed literal matching
//! - [`seed_provider`]: per-run seed strategies
//! - [`jmuse_client`]: HTTP session, signed lookups and downloads
//! - [`document_assembler`]: SVG pages to one PDF

pub mod document_assembler;
pub mod jmuse_client;
pub mod page_scraper;
pub mod seed_provider;
pub mod signature;

pub use document_assembler::{assemble_document, order_pages, AssembleError, AssembledDocument};
pub use jmuse_client::{ClientConfig, FetchError, JmuseClient};
pub use page_scraper::{extract_metadata, ScrapeError};
pub use seed_provider::{
    discover_seed, provider_for, ConstantSeed, ScriptSeedDiscovery, SeedError, SeedProvider,
};
pub use signature::derive_signature;
