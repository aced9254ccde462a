//! # Chat Gateway Library
//!
//! This crate provides the real-time core of the chat platform:
//! - WebSocket gateway for live client connections
//! - Presence tracking (one user, many simultaneous connections)
//! - Event fan-out to every live connection of an addressed user
//! - Session supersede semantics (a re-login kicks the old tab)
//! - Heartbeat-based liveness detection
//!
//! ## Architecture
//!
//! All persistent state (messages, channels, friends) lives in an external
//! service reached through the [`domain::UnreadStore`] trait. HTTP request
//! handlers in that service push realtime notifications through
//! [`presentation::websocket::EventRouter`] after committing mutations.
//!
//! ## Module Structure
//!
//! ```text
//! chat_gateway/
//! +-- config/         Configuration management
//! +-- domain/         Data-store collaborator trait
//! +-- infrastructure/ In-memory store and Prometheus metrics
//! +-- presentation/   HTTP routes and the WebSocket gateway
//! +-- shared/         Common utilities (errors)
//! ```

// Configuration module
pub mod config;

// Domain layer - collaborator seams
pub mod domain;

// Infrastructure layer - store implementation and metrics
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
