//! Protocol message kinds.
//!
//! Uses a proper enum with `TryFrom` — no panics on unknown values.

use std::fmt;

use crate::error::WireError;

/// All message kinds understood by the helpwire protocol.
///
/// Organized by category:
/// - `0x00xx` — Protocol-level (heartbeat, control, server events)
/// - `0x01xx` — Authentication
/// - `0x02xx` — Tickets
/// - `0x03xx` — Rooms and chat
/// - `0x04xx` — Device data and media frames
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    // ── Protocol (0x00xx) ────────────────────────────────────────
    /// Keep-alive ping, client → server.
    Heartbeat = 0x0001,
    /// Keep-alive reply, server → client.
    HeartbeatAck = 0x0002,
    /// Out-of-band control action.
    Control = 0x0003,
    /// Server-originated notification.
    ServerEvent = 0x0004,
    /// Error report from the peer.
    Error = 0x0005,

    // ── Auth (0x01xx) ────────────────────────────────────────────
    /// Authenticate an existing account.
    Login = 0x0101,
    /// Create a new account.
    Register = 0x0102,

    // ── Tickets (0x02xx) ─────────────────────────────────────────
    /// Open a new support ticket.
    CreateTicket = 0x0201,
    /// Modify an existing ticket.
    UpdateTicket = 0x0202,
    /// Query tickets with pagination.
    ListTickets = 0x0203,

    // ── Rooms (0x03xx) ───────────────────────────────────────────
    /// Join a chat room.
    JoinRoom = 0x0301,
    /// Leave a chat room.
    LeaveRoom = 0x0302,
    /// Text chat message within a room.
    Text = 0x0303,

    // ── Media (0x04xx) ───────────────────────────────────────────
    /// Device telemetry payload.
    DeviceData = 0x0401,
    /// A video frame (parameters in json, frame bytes in bin).
    VideoFrame = 0x0402,
    /// An audio frame (parameters in json, sample bytes in bin).
    AudioFrame = 0x0403,
}

impl TryFrom<u16> for MessageKind {
    type Error = WireError;

    fn try_from(value: u16) -> Result<Self, WireError> {
        match value {
            0x0001 => Ok(MessageKind::Heartbeat),
            0x0002 => Ok(MessageKind::HeartbeatAck),
            0x0003 => Ok(MessageKind::Control),
            0x0004 => Ok(MessageKind::ServerEvent),
            0x0005 => Ok(MessageKind::Error),

            0x0101 => Ok(MessageKind::Login),
            0x0102 => Ok(MessageKind::Register),

            0x0201 => Ok(MessageKind::CreateTicket),
            0x0202 => Ok(MessageKind::UpdateTicket),
            0x0203 => Ok(MessageKind::ListTickets),

            0x0301 => Ok(MessageKind::JoinRoom),
            0x0302 => Ok(MessageKind::LeaveRoom),
            0x0303 => Ok(MessageKind::Text),

            0x0401 => Ok(MessageKind::DeviceData),
            0x0402 => Ok(MessageKind::VideoFrame),
            0x0403 => Ok(MessageKind::AudioFrame),

            _ => Err(WireError::UnknownKind(value)),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl MessageKind {
    /// The on-wire kind code.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Returns `true` for kinds whose payload rides in the binary
    /// section of the frame.
    pub fn carries_binary(self) -> bool {
        matches!(self, MessageKind::VideoFrame | MessageKind::AudioFrame)
    }
}
