//! Runtime identity: a bound, hashed description of who an agent is, its
//! golden-thread business justification, its risk tier, its capabilities
//! and its lineage. Built once via [`IdentityBuilder`]; spawning a child
//! runs the capability decay manager and produces a new, lineage-linked
//! identity via [`spawn_child`].

pub mod error;
pub mod golden_thread;
pub mod identity;
pub mod lineage;
pub mod spawn;

pub use error::IdentityError;
pub use golden_thread::GoldenThread;
pub use identity::{IdentityBuilder, RuntimeIdentity};
pub use lineage::Lineage;
pub use spawn::{spawn_child, ChildAsset};
