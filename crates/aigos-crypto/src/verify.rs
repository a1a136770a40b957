//! Multi-algorithm signature verification over canonically-serialised
//! messages: Ed25519, RSA-SHA256 (PKCS#1 v1.5) and ECDSA-P256 (DER). Used by
//! the kill switch to authenticate out-of-band commands and by the
//! governance token validator to check JWT signatures.

use std::collections::HashMap;
use std::str::FromStr;

use base64::Engine;
use ed25519_dalek::Verifier as Ed25519Verifier;
use rsa::pkcs1v15::{Signature as RsaSignature, VerifyingKey as RsaVerifyingKey};
use rsa::signature::Verifier as RsaVerifierTrait;
use rsa::RsaPublicKey;
use sha2::Sha256;
use signature::Verifier as EcdsaVerifierTrait;

use crate::error::CryptoError;

/// Supported signature algorithms, in the wire-format names used by the
/// `<alg>:<keyId>:<base64url>` envelope.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Ed25519,
    RsaSha256,
    EcdsaP256,
}

impl Algorithm {
    pub fn wire_name(&self) -> &'static str {
        match self {
            Algorithm::Ed25519 => "Ed25519",
            Algorithm::RsaSha256 => "RSA-SHA256",
            Algorithm::EcdsaP256 => "ECDSA-P256",
        }
    }
}

impl FromStr for Algorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Ed25519" | "ed25519" => Ok(Algorithm::Ed25519),
            "RSA-SHA256" | "rsa-sha256" => Ok(Algorithm::RsaSha256),
            "ECDSA-P256" | "ecdsa-p256" => Ok(Algorithm::EcdsaP256),
            other => Err(CryptoError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// A public key entry in the trusted key registry.
#[derive(Clone)]
pub enum TrustedKey {
    Ed25519(Box<ed25519_dalek::VerifyingKey>),
    Rsa(Box<RsaPublicKey>),
    EcdsaP256(Box<p256::ecdsa::VerifyingKey>),
}

impl TrustedKey {
    pub fn algorithm(&self) -> Algorithm {
        match self {
            TrustedKey::Ed25519(_) => Algorithm::Ed25519,
            TrustedKey::Rsa(_) => Algorithm::RsaSha256,
            TrustedKey::EcdsaP256(_) => Algorithm::EcdsaP256,
        }
    }

    fn verify(&self, message: &[u8], signature_bytes: &[u8]) -> Result<(), CryptoError> {
        match self {
            TrustedKey::Ed25519(key) => {
                let sig = ed25519_dalek::Signature::from_slice(signature_bytes)
                    .map_err(|_| CryptoError::VerificationFailed)?;
                key.verify(message, &sig)
                    .map_err(|_| CryptoError::VerificationFailed)
            }
            TrustedKey::Rsa(key) => {
                let verifying = RsaVerifyingKey::<Sha256>::new(key.as_ref().clone());
                let sig = RsaSignature::try_from(signature_bytes)
                    .map_err(|_| CryptoError::VerificationFailed)?;
                verifying
                    .verify(message, &sig)
                    .map_err(|_| CryptoError::VerificationFailed)
            }
            TrustedKey::EcdsaP256(key) => {
                let sig = p256::ecdsa::Signature::from_der(signature_bytes)
                    .map_err(|_| CryptoError::VerificationFailed)?;
                key.verify(message, &sig)
                    .map_err(|_| CryptoError::VerificationFailed)
            }
        }
    }
}

/// Parsed `<alg>:<keyId>:<base64url>` signature envelope. `keyId` is
/// mandatory: it is always how the verifying key is resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureEnvelope {
    pub algorithm: Algorithm,
    pub key_id: String,
    pub signature_b64: String,
}

impl SignatureEnvelope {
    pub fn parse(raw: &str) -> Result<Self, CryptoError> {
        let parts: Vec<&str> = raw.splitn(3, ':').collect();
        match parts.as_slice() {
            [alg, key_id, sig] => Ok(Self {
                algorithm: Algorithm::from_str(alg)?,
                key_id: key_id.to_string(),
                signature_b64: sig.to_string(),
            }),
            _ => Err(CryptoError::MalformedEnvelope(raw.to_string())),
        }
    }

    pub fn signature_bytes(&self) -> Result<Vec<u8>, CryptoError> {
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(&self.signature_b64)?)
    }

    pub fn encode(algorithm: Algorithm, key_id: &str, signature_bytes: &[u8]) -> String {
        let sig_b64 = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(signature_bytes);
        format!("{}:{}:{}", algorithm.wire_name(), key_id, sig_b64)
    }
}

/// Trusted key registry, immutable after construction. Keyed by `keyId`.
#[derive(Clone, Default)]
pub struct KeyRegistry {
    keys: HashMap<String, TrustedKey>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, key_id: impl Into<String>, key: TrustedKey) -> Self {
        self.keys.insert(key_id.into(), key);
        self
    }

    pub fn insert(&mut self, key_id: impl Into<String>, key: TrustedKey) {
        self.keys.insert(key_id.into(), key);
    }

    /// Verifies `message` against `envelope`, resolving the key by `keyId`.
    pub fn verify(&self, message: &[u8], envelope: &SignatureEnvelope) -> Result<(), CryptoError> {
        let key = self.keys.get(&envelope.key_id).ok_or_else(|| {
            CryptoError::KeyNotFound(
                envelope.key_id.clone(),
                envelope.algorithm.wire_name().to_string(),
            )
        })?;

        if key.algorithm() != envelope.algorithm {
            return Err(CryptoError::VerificationFailed);
        }

        let sig_bytes = envelope.signature_bytes()?;
        key.verify(message, &sig_bytes)
    }
}
