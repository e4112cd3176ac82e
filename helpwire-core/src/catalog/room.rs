//! Room payloads — membership and text chat.

use serde_json::{Map, Value};

use crate::catalog::{now_millis, str_field, u64_field};
use crate::error::WireError;
use crate::message::MessageKind;
use crate::packet::Packet;
use crate::schema;

// ── Join / Leave ─────────────────────────────────────────────────

/// Payload for [`MessageKind::JoinRoom`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRoom {
    pub room_id: String,
}

impl JoinRoom {
    pub const KIND: MessageKind = MessageKind::JoinRoom;

    pub fn new(room_id: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
        }
    }

    pub fn to_json(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("room_id".into(), Value::String(self.room_id.clone()));
        payload
    }

    pub fn from_json(payload: &Map<String, Value>) -> Result<Self, WireError> {
        schema::validate(Self::KIND, payload)?;
        Ok(Self {
            room_id: str_field(payload, "room_id")?,
        })
    }

    pub fn into_packet(self) -> Result<Packet, WireError> {
        let json = self.to_json();
        Packet::new(Self::KIND.code(), json, Vec::new())
    }
}

/// Payload for [`MessageKind::LeaveRoom`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveRoom {
    pub room_id: String,
}

impl LeaveRoom {
    pub const KIND: MessageKind = MessageKind::LeaveRoom;

    pub fn new(room_id: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
        }
    }

    pub fn to_json(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("room_id".into(), Value::String(self.room_id.clone()));
        payload
    }

    pub fn from_json(payload: &Map<String, Value>) -> Result<Self, WireError> {
        schema::validate(Self::KIND, payload)?;
        Ok(Self {
            room_id: str_field(payload, "room_id")?,
        })
    }

    pub fn into_packet(self) -> Result<Packet, WireError> {
        let json = self.to_json();
        Packet::new(Self::KIND.code(), json, Vec::new())
    }
}

// ── Text ─────────────────────────────────────────────────────────

/// Payload for [`MessageKind::Text`]. The constructor stamps the
/// current time; the parser preserves the sender's stamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMessage {
    pub room_id: String,
    pub content: String,
    /// Milliseconds since the UNIX epoch.
    pub timestamp: u64,
}

impl TextMessage {
    pub const KIND: MessageKind = MessageKind::Text;

    pub fn new(room_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            content: content.into(),
            timestamp: now_millis(),
        }
    }

    pub fn to_json(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("room_id".into(), Value::String(self.room_id.clone()));
        payload.insert("content".into(), Value::String(self.content.clone()));
        payload.insert("timestamp".into(), self.timestamp.into());
        payload
    }

    pub fn from_json(payload: &Map<String, Value>) -> Result<Self, WireError> {
        schema::validate(Self::KIND, payload)?;
        Ok(Self {
            room_id: str_field(payload, "room_id")?,
            content: str_field(payload, "content")?,
            timestamp: u64_field(payload, "timestamp")?,
        })
    }

    pub fn into_packet(self) -> Result<Packet, WireError> {
        let json = self.to_json();
        Packet::new(Self::KIND.code(), json, Vec::new())
    }
}

// ── Tests ────────────────────────────────────────────────────────
