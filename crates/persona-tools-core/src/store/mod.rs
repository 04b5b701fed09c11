//! Persistence collaborator
//!
//! - `Persistence`: read-only queries issued during construction
//! - `MemoryPersistence`: in-memory implementation

mod traits;
mod memory;

pub use traits::{BuiltinToolRecord, Persistence, StoreError, StoreResult};
pub use memory::MemoryPersistence;
