//! Name hashes and artifact digests.
//!
//! Two unrelated hashes live here:
//! - [`name_hash`], the 16-bit identifier the runtime uses for attribute
//!   names. It must stay bit-compatible with the decoder on the nodes, so it
//!   reproduces `String.hashCode() & 0xFFFF` over UTF-16 code units.
//!   Collisions are possible and are reported through [`HashRegistry`], never
//!   silently resolved.
//! - [`ArtifactDigest`], a domain-separated SHA-256 over rendered artifacts,
//!   used to check that two compiles of the same input are byte-identical.
//!
//! # Determinism
//! Both hashes depend only on their input bytes. The registry iterates in
//! hash order.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Domain for digests of the textual artifact rendering (v1).
pub const DOMAIN_TEXT_ARTIFACTS_V1: &[u8] = b"TEXT_ARTIFACTS";

/// Domain for digests of the CBOR artifact bundle (v1).
pub const DOMAIN_BINARY_ARTIFACTS_V1: &[u8] = b"BINARY_ARTIFACTS";

/// Computes the 16-bit runtime identifier of an attribute name.
///
/// ```
/// assert_eq!(vigil::fingerprint::name_hash("a"), 97);
/// ```
pub fn name_hash(name: &str) -> u16 {
    let mut h: i32 = 0;
    for unit in name.encode_utf16() {
        h = h.wrapping_mul(31).wrapping_add(i32::from(unit));
    }
    (h & 0xFFFF) as u16
}

/// A 256-bit digest of emitted artifacts.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactDigest(pub [u8; 32]);

impl ArtifactDigest {
    /// Returns the raw bytes.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// SHA-256 of `data` under a domain tag.
    ///
    /// Layout: `b"VIGIL:" || domain || b":v1" || len(data) as u64 LE || data`.
    pub fn hash_with_domain(domain: &[u8], data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"VIGIL:");
        hasher.update(domain);
        hasher.update(b":v1");
        hasher.update((data.len() as u64).to_le_bytes());
        hasher.update(data);
        Self(hasher.finalize().into())
    }
}

impl std::fmt::Display for ArtifactDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Two distinct names that share a runtime hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashCollision {
    pub hash: u16,
    pub first: String,
    pub second: String,
}

/// Tracks which name owns each 16-bit hash.
#[derive(Debug, Default, Clone)]
pub struct HashRegistry {
    owners: BTreeMap<u16, String>,
}

impl HashRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `name`; returns the collision if another name already owns
    /// its hash. The first owner is kept.
    pub fn observe(&mut self, name: &str) -> Option<HashCollision> {
        let hash = name_hash(name);
        match self.owners.get(&hash) {
            Some(owner) if owner != name => Some(HashCollision {
                hash,
                first: owner.clone(),
                second: name.to_string(),
            }),
            Some(_) => None,
            None => {
                self.owners.insert(hash, name.to_string());
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}
