use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("malformed signature envelope: {0}")]
    MalformedEnvelope(String),
    #[error("unknown signature algorithm: {0}")]
    UnknownAlgorithm(String),
    #[error("no trusted key found for kid={0} algorithm={1}")]
    KeyNotFound(String, String),
    #[error("signature verification failed")]
    VerificationFailed,
    #[error("invalid key material: {0}")]
    InvalidKey(String),
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("hex decode error: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
