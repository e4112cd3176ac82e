//! # helpwire-core
//!
//! Wire-protocol core for the helpwire support-desk system.
//!
//! This crate contains:
//! - **Framing**: `Packet`, `encode_frame`, `drain` — the
//!   length-prefixed binary frame format and the receive-buffer
//!   drain loop
//! - **Codec**: `FrameCodec` for framed TCP I/O via `tokio_util`
//! - **Catalog**: `MessageKind` plus typed builders/parsers for every
//!   message kind, validated against one table-driven schema
//! - **Network**: `ConnectionManager` for a managed client connection
//!   with automatic reconnection, `NetworkStatus` for diagnostics
//! - **Session**: `SessionManager` — sliding-expiration session
//!   lifecycle with keep-alive refresh
//! - **Error**: `WireError` — typed, `thiserror`-based error
//!   hierarchy

pub mod catalog;
pub mod codec;
pub mod error;
pub mod message;
pub mod network;
pub mod packet;
pub mod schema;
pub mod session;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use codec::FrameCodec;
pub use error::WireError;
pub use message::MessageKind;
pub use network::{
    ConnectionConfig, ConnectionEvent, ConnectionManager, DEFAULT_RECONNECT_INTERVAL_MS,
    LinkState, MAX_RECONNECT_ATTEMPTS, NetworkStatus,
};
pub use packet::{Drained, Packet, drain, encode_frame};
pub use session::{
    DEFAULT_REFRESH_INTERVAL_SECS, DEFAULT_TIMEOUT_MINUTES, SessionConfig, SessionEvent,
    SessionManager, SessionRecord,
};
