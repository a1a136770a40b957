//! AIGOS governance tokens: JWTs carrying identity and live governance
//! state between agents. The generator issues them; the validator checks
//! format, signature, standard claims, AIGOS claim shape, control claims
//! and an optional capability-escalation bound, in that order.

pub mod algorithm;
pub mod claims;
pub mod error;
pub mod generator;
pub mod jwks;
pub mod validator;

pub use algorithm::{SigningAlgorithm, SigningKey, VerifyingKey};
pub use claims::{
    AigosClaims, CapabilitiesClaim, ControlClaim, GoldenThreadClaim, GovernanceClaim,
    IdentityClaim, KillSwitchClaim, LineageClaim,
};
pub use error::{TokenError, TokenWarning};
pub use generator::{TokenConfig, TokenGenerator};
pub use jwks::{HttpJwksProvider, JwkEntry, JwksCache, JwksProvider};
pub use validator::{TokenValidator, TrustedKeys, ValidationOutcome, ValidatorConfig};
