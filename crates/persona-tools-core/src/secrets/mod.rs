//! Secret lookup for tool backend API keys
//!
//! - `SecretStore` trait for read-only lookups
//! - `EnvSecretStore`, `MemorySecretStore` and `ChainSecretStore` implementations

mod traits;
mod env_store;
mod memory_store;
mod chain_store;

pub use traits::{SecretInfo, SecretStore};
pub use env_store::EnvSecretStore;
pub use memory_store::MemorySecretStore;
pub use chain_store::ChainSecretStore;
