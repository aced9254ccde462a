//! # Domain Layer
//!
//! Collaborator seams for the realtime core. The gateway owns no persistent
//! state of its own; everything it reports to clients (unread counts, pending
//! friend requests, channel membership) comes from the external data service
//! behind the [`UnreadStore`] trait.

pub mod store;

pub use store::*;
