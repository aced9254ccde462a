//! Application Error Types
//!
//! Centralized error handling for the gateway.
//!
//! Delivery failures are deliberately absent from this module: a failed write
//! to one connection is logged and resolved by the heartbeat monitor, never
//! surfaced to the caller of the event router.

/// Errors surfaced by the data-store collaborator.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("backing store unavailable: {0}")]
    Unavailable(String),

    #[error("unknown channel: {0}")]
    UnknownChannel(String),

    #[error("unknown user: {0}")]
    UnknownUser(String),
}
