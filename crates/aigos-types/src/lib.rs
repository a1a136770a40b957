//! Primitive types shared across the AIGOS runtime governance subsystems:
//! risk classification, operating mode, and the instance identifiers that
//! every other crate keys its registries on.

pub mod ids;
pub mod risk;

pub use ids::InstanceId;
pub use risk::{Mode, RiskLevel};
