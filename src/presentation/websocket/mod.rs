//! WebSocket Gateway
//!
//! Real-time presence and fan-out over WebSocket connections.

pub mod fanout;
pub mod handler;
pub mod messages;
pub mod monitor;
pub mod registry;
pub mod session_gate;

pub use fanout::EventRouter;
pub use handler::ws_handler;
pub use messages::{CatchUpSnapshot, EventFrame, HelloPayload, OpCode};
pub use monitor::HeartbeatMonitor;
pub use registry::{ConnectionHandle, ConnectionRegistry, SocketCommand, Sweep};
pub use session_gate::SessionGate;
