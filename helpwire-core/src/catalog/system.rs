//! Protocol-level payloads — heartbeats, control actions, server
//! notices, and error reports.

use serde_json::{Map, Value};

use crate::catalog::{insert_opt_str, now_millis, opt_str_field, opt_u64_field, str_field, u64_field};
use crate::error::WireError;
use crate::message::MessageKind;
use crate::packet::Packet;
use crate::schema;

// ── Heartbeat ────────────────────────────────────────────────────

/// Payload for [`MessageKind::Heartbeat`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heartbeat {
    pub timestamp: u64,
}

impl Heartbeat {
    pub const KIND: MessageKind = MessageKind::Heartbeat;

    pub fn new() -> Self {
        Self {
            timestamp: now_millis(),
        }
    }

    pub fn to_json(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("timestamp".into(), self.timestamp.into());
        payload
    }

    pub fn from_json(payload: &Map<String, Value>) -> Result<Self, WireError> {
        schema::validate(Self::KIND, payload)?;
        Ok(Self {
            timestamp: u64_field(payload, "timestamp")?,
        })
    }

    pub fn into_packet(self) -> Result<Packet, WireError> {
        let json = self.to_json();
        Packet::new(Self::KIND.code(), json, Vec::new())
    }
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::new()
    }
}

/// Payload for [`MessageKind::HeartbeatAck`]. `echo_timestamp`
/// carries the stamp of the heartbeat being answered so the sender
/// can measure round-trip latency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatAck {
    pub timestamp: u64,
    pub echo_timestamp: Option<u64>,
}

impl HeartbeatAck {
    pub const KIND: MessageKind = MessageKind::HeartbeatAck;

    pub fn new() -> Self {
        Self {
            timestamp: now_millis(),
            echo_timestamp: None,
        }
    }

    pub fn echoing(heartbeat: &Heartbeat) -> Self {
        Self {
            timestamp: now_millis(),
            echo_timestamp: Some(heartbeat.timestamp),
        }
    }

    pub fn to_json(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("timestamp".into(), self.timestamp.into());
        if let Some(echo) = self.echo_timestamp {
            payload.insert("echo_timestamp".into(), echo.into());
        }
        payload
    }

    pub fn from_json(payload: &Map<String, Value>) -> Result<Self, WireError> {
        schema::validate(Self::KIND, payload)?;
        Ok(Self {
            timestamp: u64_field(payload, "timestamp")?,
            echo_timestamp: opt_u64_field(payload, "echo_timestamp"),
        })
    }

    pub fn into_packet(self) -> Result<Packet, WireError> {
        let json = self.to_json();
        Packet::new(Self::KIND.code(), json, Vec::new())
    }
}

impl Default for HeartbeatAck {
    fn default() -> Self {
        Self::new()
    }
}

// ── Control ──────────────────────────────────────────────────────

/// Payload for [`MessageKind::Control`] — an out-of-band action such
/// as muting a stream or kicking a participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub action: String,
    pub target: Option<String>,
}

impl Control {
    pub const KIND: MessageKind = MessageKind::Control;

    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            target: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn to_json(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("action".into(), Value::String(self.action.clone()));
        insert_opt_str(&mut payload, "target", &self.target);
        payload
    }

    pub fn from_json(payload: &Map<String, Value>) -> Result<Self, WireError> {
        schema::validate(Self::KIND, payload)?;
        Ok(Self {
            action: str_field(payload, "action")?,
            target: opt_str_field(payload, "target"),
        })
    }

    pub fn into_packet(self) -> Result<Packet, WireError> {
        let json = self.to_json();
        Packet::new(Self::KIND.code(), json, Vec::new())
    }
}

// ── Server notice ────────────────────────────────────────────────

/// Payload for [`MessageKind::ServerEvent`] — a server-originated
/// notification (login acknowledged, ticket stored, peer joined).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerNotice {
    pub event: String,
    pub detail: Option<String>,
    pub timestamp: u64,
}

impl ServerNotice {
    pub const KIND: MessageKind = MessageKind::ServerEvent;

    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            detail: None,
            timestamp: now_millis(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn to_json(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("event".into(), Value::String(self.event.clone()));
        insert_opt_str(&mut payload, "detail", &self.detail);
        payload.insert("timestamp".into(), self.timestamp.into());
        payload
    }

    pub fn from_json(payload: &Map<String, Value>) -> Result<Self, WireError> {
        schema::validate(Self::KIND, payload)?;
        Ok(Self {
            event: str_field(payload, "event")?,
            detail: opt_str_field(payload, "detail"),
            timestamp: u64_field(payload, "timestamp")?,
        })
    }

    pub fn into_packet(self) -> Result<Packet, WireError> {
        let json = self.to_json();
        Packet::new(Self::KIND.code(), json, Vec::new())
    }
}

// ── Error report ─────────────────────────────────────────────────

/// Payload for [`MessageKind::Error`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub code: u64,
    pub message: String,
}

impl ErrorReport {
    pub const KIND: MessageKind = MessageKind::Error;

    pub fn new(code: u64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("code".into(), self.code.into());
        payload.insert("message".into(), Value::String(self.message.clone()));
        payload
    }

    pub fn from_json(payload: &Map<String, Value>) -> Result<Self, WireError> {
        schema::validate(Self::KIND, payload)?;
        Ok(Self {
            code: u64_field(payload, "code")?,
            message: str_field(payload, "message")?,
        })
    }

    pub fn into_packet(self) -> Result<Packet, WireError> {
        let json = self.to_json();
        Packet::new(Self::KIND.code(), json, Vec::new())
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heartbeat_roundtrip() {
        let hb = Heartbeat::new();
        assert!(hb.timestamp > 0);
        assert_eq!(Heartbeat::from_json(&hb.to_json()).unwrap(), hb);
    }

    #[test]
    fn ack_echoes_heartbeat_stamp() {
        let hb = Heartbeat::new();
        let ack = HeartbeatAck::echoing(&hb);
        assert_eq!(ack.echo_timestamp, Some(hb.timestamp));

        let parsed = HeartbeatAck::from_json(&ack.to_json()).unwrap();
        assert_eq!(parsed, ack);
    }

    #[test]
    fn plain_ack_omits_echo() {
        let payload = HeartbeatAck::new().to_json();
        assert!(!payload.contains_key("echo_timestamp"));
        assert!(HeartbeatAck::from_json(&payload).is_ok());
    }

    #[test]
    fn control_roundtrip() {
        let ctl = Control::new("mute").with_target("cam-7");
        assert_eq!(Control::from_json(&ctl.to_json()).unwrap(), ctl);
    }

    #[test]
    fn notice_roundtrip() {
        let notice = ServerNotice::new("login-ok").with_detail("session s1");
        assert_eq!(ServerNotice::from_json(&notice.to_json()).unwrap(), notice);
    }

    #[test]
    fn error_report_requires_message() {
        let mut payload = ErrorReport::new(400, "bad payload").to_json();
        payload.remove("message");
        assert!(matches!(
            ErrorReport::from_json(&payload),
            Err(WireError::MissingField("message"))
        ));
    }

    #[test]
    fn every_builder_passes_its_validator() {
        assert!(schema::validate(Heartbeat::KIND, &Heartbeat::new().to_json()).is_ok());
        assert!(schema::validate(HeartbeatAck::KIND, &HeartbeatAck::new().to_json()).is_ok());
        assert!(schema::validate(Control::KIND, &Control::new("kick").to_json()).is_ok());
        assert!(schema::validate(ServerNotice::KIND, &ServerNotice::new("up").to_json()).is_ok());
        assert!(schema::validate(ErrorReport::KIND, &ErrorReport::new(1, "m").to_json()).is_ok());
    }
}
