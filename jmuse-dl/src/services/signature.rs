//! Request signature derivation
//!
//! The score API rejects asset lookups whose `Authorization` header does not
//! match what the service's own web client would compute. The client does:
//!
//! 1. Concatenate id, format tag, decimal section index and seed, no separators
//! 2. MD5 over the UTF-8 bytes
//! 3. Keep the first 4 lowercase hex characters
//!
//! Any deviation (order, separators, truncation) is silently rejected upstream,
//! so every step here is part of the external contract.

use crate::models::{AssetFormat, EncryptionSeed, ScoreIdentifier, SectionIndex, Signature};
use md5::{Digest, Md5};

/// Number of hex characters the service checks
pub const SIGNATURE_LEN: usize = 4;

/// Compute the signature for one asset request
///
/// # Examples
///
/// ```
/// use jmuse_dl::models::{AssetFormat, EncryptionSeed, ScoreIdentifier};
/// use jmuse_dl::services::signature::derive_signature;
///
/// let id = ScoreIdentifier::new("12345").unwrap();
/// let seed = EncryptionSeed::new("8(a(");
/// let signature = derive_signature(&id, AssetFormat::Midi, 0, &seed);
/// assert_eq!(signature.as_str(), "2f26");
/// ```
pub fn derive_signature(
    id: &ScoreIdentifier,
    format: AssetFormat,
    section: SectionIndex,
    seed: &EncryptionSeed,
) -> Signature {
    let to_hash = format!("{}{}{}{}", id.as_str(), format.tag(), section, seed.as_str());

    let mut hasher = Md5::new();
    hasher.update(to_hash.as_bytes());
    let digest = format!("{:x}", hasher.finalize());

    Signature(digest[..SIGNATURE_LEN].to_string())
}
