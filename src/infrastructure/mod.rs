//! Infrastructure Layer
//!
//! Contains implementations for external concerns:
//! - In-memory data store (standalone deployments and tests)
//! - Prometheus metrics

pub mod memory_store;
pub mod metrics;

pub use memory_store::MemoryStore;
