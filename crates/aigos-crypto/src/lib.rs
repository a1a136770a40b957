//! Canonical hashing, Merkle tree construction and multi-algorithm signature
//! verification. These are the leaf primitives every governance subsystem
//! builds its integrity guarantees on top of: identities are hashed with
//! [`canonical`], kill-switch commands and governance tokens are checked with
//! [`verify`], and the daily integrity checkpoint folds event hashes with
//! [`merkle`].

pub mod canonical;
pub mod error;
pub mod merkle;
pub mod verify;

pub use canonical::{canonical_json_bytes, hash_canonical_value, sha256_hex, sha256_prefixed};
pub use error::CryptoError;
pub use merkle::{build_merkle_tree, EMPTY_MERKLE_ROOT};
pub use verify::{Algorithm, KeyRegistry, SignatureEnvelope, TrustedKey};
