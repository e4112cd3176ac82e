//! Authentication payloads — login and account registration.

use serde_json::{Map, Value};

use crate::catalog::{insert_opt_str, opt_str_field, opt_u64_field, str_field};
use crate::error::WireError;
use crate::message::MessageKind;
use crate::packet::Packet;
use crate::schema;

// ── Login ────────────────────────────────────────────────────────

/// Payload for [`MessageKind::Login`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    pub const KIND: MessageKind = MessageKind::Login;

    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Build the JSON payload.
    pub fn to_json(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("username".into(), Value::String(self.username.clone()));
        payload.insert("password".into(), Value::String(self.password.clone()));
        payload
    }

    /// Parse and validate a received payload.
    pub fn from_json(payload: &Map<String, Value>) -> Result<Self, WireError> {
        schema::validate(Self::KIND, payload)?;
        Ok(Self {
            username: str_field(payload, "username")?,
            password: str_field(payload, "password")?,
        })
    }

    /// Build a wire packet carrying this request.
    pub fn into_packet(self) -> Result<Packet, WireError> {
        let json = self.to_json();
        Packet::new(Self::KIND.code(), json, Vec::new())
    }
}

// ── Register ─────────────────────────────────────────────────────

/// Payload for [`MessageKind::Register`].
///
/// Email, phone and user type are optional; the builder omits them
/// from the payload when unset or empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// 0 = end user, 1 = operator.
    pub user_type: Option<u64>,
}

impl RegisterRequest {
    pub const KIND: MessageKind = MessageKind::Register;

    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            email: None,
            phone: None,
            user_type: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_user_type(mut self, user_type: u64) -> Self {
        self.user_type = Some(user_type);
        self
    }

    pub fn to_json(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("username".into(), Value::String(self.username.clone()));
        payload.insert("password".into(), Value::String(self.password.clone()));
        insert_opt_str(&mut payload, "email", &self.email);
        insert_opt_str(&mut payload, "phone", &self.phone);
        if let Some(user_type) = self.user_type {
            payload.insert("user_type".into(), user_type.into());
        }
        payload
    }

    pub fn from_json(payload: &Map<String, Value>) -> Result<Self, WireError> {
        schema::validate(Self::KIND, payload)?;
        Ok(Self {
            username: str_field(payload, "username")?,
            password: str_field(payload, "password")?,
            email: opt_str_field(payload, "email"),
            phone: opt_str_field(payload, "phone"),
            user_type: opt_u64_field(payload, "user_type"),
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
    fn login_build_passes_validation() {
        let req = LoginRequest::new("alice", "hunter2");
        assert!(schema::validate(LoginRequest::KIND, &req.to_json()).is_ok());
    }

    #[test]
    fn login_roundtrip() {
        let req = LoginRequest::new("alice", "hunter2");
        let parsed = LoginRequest::from_json(&req.to_json()).unwrap();
        assert_eq!(req, parsed);
    }

    #[test]
    fn login_missing_password_rejected() {
        let mut payload = LoginRequest::new("alice", "pw").to_json();
        payload.remove("password");
        assert!(matches!(
            LoginRequest::from_json(&payload),
            Err(WireError::MissingField("password"))
        ));
    }

    #[test]
    fn register_full_roundtrip() {
        let req = RegisterRequest::new("bob", "pw")
            .with_email("bob@example.com")
            .with_phone("13812345678")
            .with_user_type(1);
        assert!(schema::validate(RegisterRequest::KIND, &req.to_json()).is_ok());

        let parsed = RegisterRequest::from_json(&req.to_json()).unwrap();
        assert_eq!(req, parsed);
    }

    #[test]
    fn register_omits_unset_optionals() {
        let payload = RegisterRequest::new("bob", "pw").to_json();
        assert!(!payload.contains_key("email"));
        assert!(!payload.contains_key("phone"));
        assert!(!payload.contains_key("user_type"));
    }

    #[test]
    fn register_empty_email_omitted_not_sent_invalid() {
        let payload = RegisterRequest::new("bob", "pw").with_email("").to_json();
        assert!(!payload.contains_key("email"));
        assert!(schema::validate(RegisterRequest::KIND, &payload).is_ok());
    }

    #[test]
    fn login_packet_kind() {
        let pkt = LoginRequest::new("alice", "pw").into_packet().unwrap();
        assert_eq!(pkt.kind(), MessageKind::Login.code());
        assert!(pkt.bin().is_empty());
    }
}
