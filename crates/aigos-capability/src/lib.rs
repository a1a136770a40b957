//! Capability manifests, the pattern matcher leaf and the capability decay
//! manager. These types feed the policy engine and are embedded inside
//! every runtime identity.

pub mod decay;
pub mod error;
pub mod events;
pub mod manifest;
pub mod pattern;

pub use decay::{
    compare_capabilities, compute_child, CapabilityComparison, ChildOptions, DecayConfig,
    DecayResult,
};
pub use error::CapabilityError;
pub use events::{CapabilityEvent, CapabilityEventBus};
pub use manifest::{CapabilitiesManifest, CapabilityMode, CompiledCapabilities};
pub use pattern::{wildcard_allow_or_matches, PatternSet};
