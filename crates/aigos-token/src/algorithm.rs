//! JWT-flavoured signing and verification. JWS signatures are fixed-width
//! (not the DER encoding [`aigos_crypto`] uses for kill-switch commands) so
//! this is a separate, small implementation over the same underlying
//! primitives: ed25519-dalek, rsa, p256 and hmac.

use ed25519_dalek::{Signer as Ed25519Signer, Verifier as Ed25519Verifier};
use hmac::{Hmac, Mac};
use rsa::pkcs1v15::{Signature as RsaSignature, SigningKey as RsaSigningKey, VerifyingKey as RsaVerifyingKey};
use rsa::signature::{Signer as RsaSignerTrait, Verifier as RsaVerifierTrait};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use signature::{Signer as EcdsaSignerTrait, Verifier as EcdsaVerifierTrait};

use crate::error::TokenError;

/// The four algorithms the generator/validator allow-list, in JWT `alg`
/// header spelling.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SigningAlgorithm {
    Rs256,
    Es256,
    Hs256,
    EdDsa,
}

impl SigningAlgorithm {
    pub fn header_name(&self) -> &'static str {
        match self {
            SigningAlgorithm::Rs256 => "RS256",
            SigningAlgorithm::Es256 => "ES256",
            SigningAlgorithm::Hs256 => "HS256",
            SigningAlgorithm::EdDsa => "EdDSA",
        }
    }

    pub fn from_header_name(name: &str) -> Option<Self> {
        match name {
            "RS256" => Some(SigningAlgorithm::Rs256),
            "ES256" => Some(SigningAlgorithm::Es256),
            "HS256" => Some(SigningAlgorithm::Hs256),
            "EdDSA" => Some(SigningAlgorithm::EdDsa),
            _ => None,
        }
    }
}

/// Private key material for the token generator.
pub enum SigningKey {
    Rsa(Box<RsaPrivateKey>),
    Ecdsa(Box<p256::ecdsa::SigningKey>),
    Ed25519(Box<ed25519_dalek::SigningKey>),
    Hmac(Vec<u8>),
}

impl SigningKey {
    pub fn algorithm(&self) -> SigningAlgorithm {
        match self {
            SigningKey::Rsa(_) => SigningAlgorithm::Rs256,
            SigningKey::Ecdsa(_) => SigningAlgorithm::Es256,
            SigningKey::Ed25519(_) => SigningAlgorithm::EdDsa,
            SigningKey::Hmac(_) => SigningAlgorithm::Hs256,
        }
    }

    pub fn sign(&self, signing_input: &[u8]) -> Result<Vec<u8>, TokenError> {
        match self {
            SigningKey::Rsa(key) => {
                let signing_key = RsaSigningKey::<Sha256>::new(key.as_ref().clone());
                let sig = signing_key.try_sign(signing_input).map_err(|_| TokenError::InvalidSignature)?;
                Ok(sig.to_vec())
            }
            SigningKey::Ecdsa(key) => {
                let sig: p256::ecdsa::Signature = key.sign(signing_input);
                Ok(sig.to_bytes().to_vec())
            }
            SigningKey::Ed25519(key) => Ok(key.sign(signing_input).to_bytes().to_vec()),
            SigningKey::Hmac(secret) => {
                let mut mac = Hmac::<Sha256>::new_from_slice(secret).map_err(|_| TokenError::InvalidSignature)?;
                mac.update(signing_input);
                Ok(mac.finalize().into_bytes().to_vec())
            }
        }
    }
}

/// Public key material for the token validator.
#[derive(Clone)]
pub enum VerifyingKey {
    Rsa(Box<RsaPublicKey>),
    Ecdsa(Box<p256::ecdsa::VerifyingKey>),
    Ed25519(Box<ed25519_dalek::VerifyingKey>),
    Hmac(Vec<u8>),
}

impl VerifyingKey {
    pub fn algorithm(&self) -> SigningAlgorithm {
        match self {
            VerifyingKey::Rsa(_) => SigningAlgorithm::Rs256,
            VerifyingKey::Ecdsa(_) => SigningAlgorithm::Es256,
            VerifyingKey::Ed25519(_) => SigningAlgorithm::EdDsa,
            VerifyingKey::Hmac(_) => SigningAlgorithm::Hs256,
        }
    }

    pub fn verify(&self, signing_input: &[u8], signature_bytes: &[u8]) -> Result<(), TokenError> {
        match self {
            VerifyingKey::Rsa(key) => {
                let verifying = RsaVerifyingKey::<Sha256>::new(key.as_ref().clone());
                let sig = RsaSignature::try_from(signature_bytes).map_err(|_| TokenError::InvalidSignature)?;
                verifying.verify(signing_input, &sig).map_err(|_| TokenError::InvalidSignature)
            }
            VerifyingKey::Ecdsa(key) => {
                let sig = p256::ecdsa::Signature::from_slice(signature_bytes)
                    .map_err(|_| TokenError::InvalidSignature)?;
                key.verify(signing_input, &sig).map_err(|_| TokenError::InvalidSignature)
            }
            VerifyingKey::Ed25519(key) => {
                let sig = ed25519_dalek::Signature::from_slice(signature_bytes)
                    .map_err(|_| TokenError::InvalidSignature)?;
                key.verify(signing_input, &sig).map_err(|_| TokenError::InvalidSignature)
            }
            VerifyingKey::Hmac(secret) => {
                let mut mac = Hmac::<Sha256>::new_from_slice(secret).map_err(|_| TokenError::InvalidSignature)?;
                mac.update(signing_input);
                mac.verify_slice(signature_bytes).map_err(|_| TokenError::InvalidSignature)
            }
        }
    }
}
