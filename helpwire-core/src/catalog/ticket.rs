//! Ticket payloads — creation, updates, and paginated listing.

use serde_json::{Map, Value};

use crate::catalog::{insert_opt_str, opt_str_field, opt_u64_field, str_field, u64_field, u64_field_or};
use crate::error::WireError;
use crate::message::MessageKind;
use crate::packet::Packet;
use crate::schema::{self, DEFAULT_LIST_LIMIT};

// ── Create ───────────────────────────────────────────────────────

/// Payload for [`MessageKind::CreateTicket`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTicket {
    pub title: String,
    pub description: String,
    /// 1 = low, 2 = normal, 3 = urgent.
    pub priority: u64,
}

impl CreateTicket {
    pub const KIND: MessageKind = MessageKind::CreateTicket;

    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        priority: u64,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            priority,
        }
    }

    pub fn to_json(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("title".into(), Value::String(self.title.clone()));
        payload.insert(
            "description".into(),
            Value::String(self.description.clone()),
        );
        payload.insert("priority".into(), self.priority.into());
        payload
    }

    pub fn from_json(payload: &Map<String, Value>) -> Result<Self, WireError> {
        schema::validate(Self::KIND, payload)?;
        Ok(Self {
            title: str_field(payload, "title")?,
            description: str_field(payload, "description")?,
            priority: u64_field(payload, "priority")?,
        })
    }

    pub fn into_packet(self) -> Result<Packet, WireError> {
        let json = self.to_json();
        Packet::new(Self::KIND.code(), json, Vec::new())
    }
}

// ── Update ───────────────────────────────────────────────────────

/// Payload for [`MessageKind::UpdateTicket`]. Only the ticket id is
/// mandatory; unset fields are left untouched by the receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTicket {
    pub ticket_id: u64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<u64>,
    pub status: Option<String>,
}

impl UpdateTicket {
    pub const KIND: MessageKind = MessageKind::UpdateTicket;

    pub fn new(ticket_id: u64) -> Self {
        Self {
            ticket_id,
            title: None,
            description: None,
            priority: None,
            status: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_priority(mut self, priority: u64) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn to_json(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("ticket_id".into(), self.ticket_id.into());
        insert_opt_str(&mut payload, "title", &self.title);
        insert_opt_str(&mut payload, "description", &self.description);
        if let Some(priority) = self.priority {
            payload.insert("priority".into(), priority.into());
        }
        insert_opt_str(&mut payload, "status", &self.status);
        payload
    }

    pub fn from_json(payload: &Map<String, Value>) -> Result<Self, WireError> {
        schema::validate(Self::KIND, payload)?;
        Ok(Self {
            ticket_id: u64_field(payload, "ticket_id")?,
            title: opt_str_field(payload, "title"),
            description: opt_str_field(payload, "description"),
            priority: opt_u64_field(payload, "priority"),
            status: opt_str_field(payload, "status"),
        })
    }

    pub fn into_packet(self) -> Result<Packet, WireError> {
        let json = self.to_json();
        Packet::new(Self::KIND.code(), json, Vec::new())
    }
}

// ── List ─────────────────────────────────────────────────────────

/// Payload for [`MessageKind::ListTickets`].
///
/// `limit` defaults to [`DEFAULT_LIST_LIMIT`] and `offset` to 0 when
/// absent from a received payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListTickets {
    pub limit: u64,
    pub offset: u64,
    pub status: Option<String>,
}

impl Default for ListTickets {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
            status: None,
        }
    }
}

impl ListTickets {
    pub const KIND: MessageKind = MessageKind::ListTickets;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn to_json(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("limit".into(), self.limit.into());
        payload.insert("offset".into(), self.offset.into());
        insert_opt_str(&mut payload, "status", &self.status);
        payload
    }

    pub fn from_json(payload: &Map<String, Value>) -> Result<Self, WireError> {
        schema::validate(Self::KIND, payload)?;
        Ok(Self {
            limit: u64_field_or(payload, "limit", DEFAULT_LIST_LIMIT),
            offset: u64_field_or(payload, "offset", 0),
            status: opt_str_field(payload, "status"),
        })
    }

    pub fn into_packet(self) -> Result<Packet, WireError> {
        let json = self.to_json();
        Packet::new(Self::KIND.code(), json, Vec::new())
    }
}

// ── Tests ────────────────────────────────────────────────────────
