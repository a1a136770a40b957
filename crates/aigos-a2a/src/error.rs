use thiserror::Error;

use aigos_token::TokenError;

#[derive(Debug, Error)]
pub enum A2aError {
    #[error("request is missing the required {0} header")]
    MissingToken(&'static str),
    #[error("governance token rejected: {0}")]
    Token(#[from] TokenError),
    #[error("policy violation [{code}]: {reason}")]
    PolicyViolated { code: String, reason: String },
}

impl A2aError {
    pub fn policy(code: impl Into<String>, reason: impl Into<String>) -> Self {
        A2aError::PolicyViolated {
            code: code.into(),
            reason: reason.into(),
        }
    }
}
