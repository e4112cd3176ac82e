//! Typed payload definitions for every message kind.
//!
//! Each sub-module covers one protocol category (auth, tickets,
//! rooms, media, system). Payload structs offer a symmetric triple:
//! a builder that produces a JSON payload (stamping a millisecond
//! timestamp where the kind requires one), a parser that turns a
//! payload back into the typed struct, and `into_packet` for the
//! wire. Parsers run [`schema::validate`] before extracting fields,
//! so anything a builder produces is accepted by the validator and
//! vice versa.
//!
//! [`schema::validate`]: crate::schema::validate

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Map, Value};

use crate::error::WireError;

pub mod auth;
pub mod media;
pub mod room;
pub mod system;
pub mod ticket;

// Re-export the payload types at the catalog level.
pub use auth::{LoginRequest, RegisterRequest};
pub use media::{AudioFrame, DeviceData, VideoFrame};
pub use room::{JoinRoom, LeaveRoom, TextMessage};
pub use system::{Control, ErrorReport, Heartbeat, HeartbeatAck, ServerNotice};
pub use ticket::{CreateTicket, ListTickets, UpdateTicket};

/// Milliseconds since the UNIX epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ── Field extraction helpers ─────────────────────────────────────
//
// All of these run after schema validation, but still fail soft on a
// missing field rather than panicking.

pub(crate) fn str_field(
    payload: &Map<String, Value>,
    name: &'static str,
) -> Result<String, WireError> {
    payload
        .get(name)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or(WireError::MissingField(name))
}

pub(crate) fn opt_str_field(payload: &Map<String, Value>, name: &str) -> Option<String> {
    payload.get(name).and_then(Value::as_str).map(str::to_owned)
}

pub(crate) fn u64_field(
    payload: &Map<String, Value>,
    name: &'static str,
) -> Result<u64, WireError> {
    payload
        .get(name)
        .and_then(Value::as_u64)
        .ok_or(WireError::MissingField(name))
}

pub(crate) fn opt_u64_field(payload: &Map<String, Value>, name: &str) -> Option<u64> {
    payload.get(name).and_then(Value::as_u64)
}

pub(crate) fn u64_field_or(payload: &Map<String, Value>, name: &str, default: u64) -> u64 {
    opt_u64_field(payload, name).unwrap_or(default)
}

pub(crate) fn opt_object_field(
    payload: &Map<String, Value>,
    name: &str,
) -> Option<Map<String, Value>> {
    payload.get(name).and_then(Value::as_object).cloned()
}

/// Insert an optional string field only when present and non-empty.
pub(crate) fn insert_opt_str(
    payload: &mut Map<String, Value>,
    name: &str,
    value: &Option<String>,
) {
    if let Some(s) = value
        && !s.is_empty()
    {
        payload.insert(name.to_owned(), Value::String(s.clone()));
    }
}
