//! Presentation Layer
//!
//! The gateway's outward-facing surfaces: the WebSocket endpoint and a
//! small HTTP router (health, metrics).

pub mod http;
pub mod websocket;
