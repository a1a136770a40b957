//! Agent-to-agent handshake: governance-token exchange over a fixed header
//! triplet, plus the inbound/outbound policy gates run against the claims
//! each side presents.

pub mod error;
pub mod events;
pub mod handshake;
pub mod headers;
pub mod inbound;
pub mod outbound;

pub use error::A2aError;
pub use events::{A2aEventBus, PolicyViolatedEvent};
pub use handshake::{ClaimTemplate, Handshake, InboundOutcome};
pub use headers::{A2aHeaders, PROTOCOL_VERSION, PROTOCOL_VERSION_HEADER, REQUEST_ID_HEADER, TOKEN_HEADER, TOKEN_TYPE};
pub use inbound::{InboundPolicy, InboundPredicate};
pub use outbound::OutboundPolicy;
