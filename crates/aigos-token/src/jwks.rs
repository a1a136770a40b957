//! JWKS key cache: read-mostly, refreshed on a cache miss and otherwise
//! reused for the configured TTL (default 1 h). A failed refresh fails
//! closed (`KEY_NOT_FOUND`) unless a previously cached key is still on hand.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use crate::algorithm::{SigningAlgorithm, VerifyingKey};
use crate::error::TokenError;

/// One key as returned by a JWKS endpoint: a `kid`, its algorithm, and the
/// algorithm-specific encoding of the public key bytes (SEC1 for ES256,
/// PKCS#1 DER for RS256, raw 32 bytes for EdDSA, raw secret for HS256).
#[derive(Clone, Debug)]
pub struct JwkEntry {
    pub kid: String,
    pub algorithm: SigningAlgorithm,
    pub key_bytes: Vec<u8>,
}

impl JwkEntry {
    pub fn to_verifying_key(&self) -> Result<VerifyingKey, TokenError> {
        match self.algorithm {
            SigningAlgorithm::Rs256 => {
                use rsa::pkcs1::DecodeRsaPublicKey;
                let key = rsa::RsaPublicKey::from_pkcs1_der(&self.key_bytes)
                    .map_err(|_| TokenError::KeyNotFound(Some(self.kid.clone()), "RS256".to_string()))?;
                Ok(VerifyingKey::Rsa(Box::new(key)))
            }
            SigningAlgorithm::Es256 => {
                let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(&self.key_bytes)
                    .map_err(|_| TokenError::KeyNotFound(Some(self.kid.clone()), "ES256".to_string()))?;
                Ok(VerifyingKey::Ecdsa(Box::new(key)))
            }
            SigningAlgorithm::EdDsa => {
                let bytes: [u8; 32] = self
                    .key_bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| TokenError::KeyNotFound(Some(self.kid.clone()), "EdDSA".to_string()))?;
                let key = ed25519_dalek::VerifyingKey::from_bytes(&bytes)
                    .map_err(|_| TokenError::KeyNotFound(Some(self.kid.clone()), "EdDSA".to_string()))?;
                Ok(VerifyingKey::Ed25519(Box::new(key)))
            }
            SigningAlgorithm::Hs256 => Ok(VerifyingKey::Hmac(self.key_bytes.clone())),
        }
    }
}

#[async_trait]
pub trait JwksProvider: Send + Sync {
    async fn fetch(&self) -> Result<Vec<JwkEntry>, TokenError>;
}

/// Fetches a JWKS document over HTTPS with a configurable timeout and a
/// single retry on failure.
pub struct HttpJwksProvider {
    pub endpoint: String,
    pub timeout: StdDuration,
}

#[derive(serde::Deserialize)]
struct WireJwk {
    kid: String,
    alg: String,
    key: String,
}

#[async_trait]
impl JwksProvider for HttpJwksProvider {
    async fn fetch(&self) -> Result<Vec<JwkEntry>, TokenError> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|_| TokenError::KeyNotFound(None, "jwks-client".to_string()))?;

        let attempt = || async {
            client
                .get(&self.endpoint)
                .send()
                .await
                .map_err(|_| ())?
                .json::<Vec<WireJwk>>()
                .await
                .map_err(|_| ())
        };

        let body = match attempt().await {
            Ok(body) => body,
            Err(()) => attempt()
                .await
                .map_err(|()| TokenError::KeyNotFound(None, "jwks-fetch".to_string()))?,
        };

        body.into_iter()
            .map(|w| {
                let algorithm = SigningAlgorithm::from_header_name(&w.alg)
                    .ok_or_else(|| TokenError::KeyNotFound(Some(w.kid.clone()), w.alg.clone()))?;
                let key_bytes = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, &w.key)
                    .map_err(|_| TokenError::KeyNotFound(Some(w.kid.clone()), w.alg.clone()))?;
                Ok(JwkEntry { kid: w.kid, algorithm, key_bytes })
            })
            .collect()
    }
}

struct CacheState {
    keys: HashMap<String, JwkEntry>,
    fetched_at: Option<DateTime<Utc>>,
}

pub struct JwksCache {
    provider: Arc<dyn JwksProvider>,
    ttl: Duration,
    state: RwLock<CacheState>,
}

impl JwksCache {
    pub fn new(provider: Arc<dyn JwksProvider>, ttl: Duration) -> Self {
        Self {
            provider,
            ttl,
            state: RwLock::new(CacheState {
                keys: HashMap::new(),
                fetched_at: None,
            }),
        }
    }

    /// Returns the verifying key for `kid`, refreshing the cache when the
    /// key is missing or the TTL has elapsed. On refresh failure, falls
    /// back to a still-cached (possibly stale) entry before failing closed.
    pub async fn get(&self, kid: &str, now: DateTime<Utc>) -> Result<VerifyingKey, TokenError> {
        {
            let state = self.state.read().await;
            let fresh = state.fetched_at.is_some_and(|at| now - at < self.ttl);
            if fresh {
                if let Some(entry) = state.keys.get(kid) {
                    return entry.to_verifying_key();
                }
            }
        }

        match self.provider.fetch().await {
            Ok(entries) => {
                let mut state = self.state.write().await;
                state.keys = entries.into_iter().map(|e| (e.kid.clone(), e)).collect();
                state.fetched_at = Some(now);
                state
                    .keys
                    .get(kid)
                    .ok_or_else(|| TokenError::KeyNotFound(Some(kid.to_string()), "unknown".to_string()))?
                    .to_verifying_key()
            }
            Err(err) => {
                let state = self.state.read().await;
                match state.keys.get(kid) {
                    Some(entry) => entry.to_verifying_key(),
                    None => Err(err),
                }
            }
        }
    }

    pub async fn insert(&self, entry: JwkEntry, now: DateTime<Utc>) {
        let mut state = self.state.write().await;
        state.keys.insert(entry.kid.clone(), entry);
        state.fetched_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticProvider(Vec<JwkEntry>);

    #[async_trait]
    impl JwksProvider for StaticProvider {
        async fn fetch(&self) -> Result<Vec<JwkEntry>, TokenError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn cache_hit_skips_refetch() {
        let cache = JwksCache::new(
            Arc::new(StaticProvider(vec![JwkEntry {
                kid: "k1".into(),
                algorithm: SigningAlgorithm::Hs256,
                key_bytes: b"secret".to_vec(),
            }])),
            Duration::hours(1),
        );
        let now = Utc::now();
        assert!(cache.get("k1", now).await.is_ok());
        assert!(cache.get("k1", now + Duration::minutes(1)).await.is_ok());
    }

    #[tokio::test]
    async fn missing_key_fails_closed() {
        let cache = JwksCache::new(Arc::new(StaticProvider(vec![])), Duration::hours(1));
        assert!(cache.get("missing", Utc::now()).await.is_err());
    }
}
