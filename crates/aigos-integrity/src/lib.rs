//! Daily, per-organisation Merkle integrity checkpoint over the governance
//! event stream: fold the day's event hashes, persist the root, emit a
//! verification event.

pub mod checkpoint;
pub mod checkpointer;
pub mod error;
pub mod events;

pub use checkpoint::{Checkpoint, CheckpointStore, InMemoryCheckpointStore};
pub use checkpointer::IntegrityCheckpointer;
pub use error::IntegrityError;
pub use events::{IntegrityEvent, IntegrityEventBus};
