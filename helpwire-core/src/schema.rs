//! Table-driven payload schemas.
//!
//! One table per message kind names every field, whether it is
//! required, and the rule its value must satisfy. The validator walks
//! the table and reports the first violation; the catalog's parsers
//! run the same validator before extracting fields, so the two can
//! never disagree about what is mandatory.

use serde_json::{Map, Value};

use crate::error::WireError;
use crate::message::MessageKind;

// ── Limits ───────────────────────────────────────────────────────

pub const USERNAME_MAX: usize = 32;
pub const PASSWORD_MAX: usize = 64;
pub const TITLE_MAX: usize = 128;
pub const DESCRIPTION_MAX: usize = 2048;
pub const TEXT_MAX: usize = 1024;
pub const NAME_MAX: usize = 64;
pub const DETAIL_MAX: usize = 512;
pub const CODEC_MAX: usize = 16;
pub const STATUS_MAX: usize = 32;

pub const PRIORITY_MIN: u64 = 1;
pub const PRIORITY_MAX: u64 = 3;
pub const USER_TYPE_MAX: u64 = 1;
pub const VIDEO_WIDTH_MAX: u64 = 7680;
pub const VIDEO_HEIGHT_MAX: u64 = 4320;
pub const FRAME_RATE_MIN: u64 = 1;
pub const FRAME_RATE_MAX: u64 = 120;
pub const SAMPLE_RATE_MIN: u64 = 8000;
pub const SAMPLE_RATE_MAX: u64 = 192_000;
pub const CHANNELS_MIN: u64 = 1;
pub const CHANNELS_MAX: u64 = 8;

/// Default page size for ticket listings.
pub const DEFAULT_LIST_LIMIT: u64 = 50;

// ── Field rules ──────────────────────────────────────────────────

/// The rule a field's value must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    /// Non-empty UTF-8 string of at most `max` characters.
    Str { max: usize },
    /// Unsigned integer within `min..=max`.
    UInt { min: u64, max: u64 },
    /// `local@domain` with a dotted domain.
    Email,
    /// Exactly 11 digits, the first two being 13–19.
    Phone,
    /// A nested JSON object.
    Object,
}

/// One entry in a message kind's schema table.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub rule: FieldRule,
    pub required: bool,
}

const fn req(name: &'static str, rule: FieldRule) -> FieldSpec {
    FieldSpec {
        name,
        rule,
        required: true,
    }
}

const fn opt(name: &'static str, rule: FieldRule) -> FieldSpec {
    FieldSpec {
        name,
        rule,
        required: false,
    }
}

const MILLIS: FieldRule = FieldRule::UInt { min: 0, max: u64::MAX };

// ── Tables ───────────────────────────────────────────────────────

static HEARTBEAT: &[FieldSpec] = &[req("timestamp", MILLIS)];

static HEARTBEAT_ACK: &[FieldSpec] = &[
    req("timestamp", MILLIS),
    opt("echo_timestamp", MILLIS),
];

static CONTROL: &[FieldSpec] = &[
    req("action", FieldRule::Str { max: NAME_MAX }),
    opt("target", FieldRule::Str { max: NAME_MAX }),
];

static SERVER_EVENT: &[FieldSpec] = &[
    req("event", FieldRule::Str { max: NAME_MAX }),
    opt("detail", FieldRule::Str { max: DETAIL_MAX }),
    req("timestamp", MILLIS),
];

static ERROR: &[FieldSpec] = &[
    req("code", FieldRule::UInt { min: 0, max: u64::MAX }),
    req("message", FieldRule::Str { max: DETAIL_MAX }),
];

static LOGIN: &[FieldSpec] = &[
    req("username", FieldRule::Str { max: USERNAME_MAX }),
    req("password", FieldRule::Str { max: PASSWORD_MAX }),
];

static REGISTER: &[FieldSpec] = &[
    req("username", FieldRule::Str { max: USERNAME_MAX }),
    req("password", FieldRule::Str { max: PASSWORD_MAX }),
    opt("email", FieldRule::Email),
    opt("phone", FieldRule::Phone),
    opt("user_type", FieldRule::UInt { min: 0, max: USER_TYPE_MAX }),
];

static CREATE_TICKET: &[FieldSpec] = &[
    req("title", FieldRule::Str { max: TITLE_MAX }),
    req("description", FieldRule::Str { max: DESCRIPTION_MAX }),
    req("priority", FieldRule::UInt { min: PRIORITY_MIN, max: PRIORITY_MAX }),
];

static UPDATE_TICKET: &[FieldSpec] = &[
    req("ticket_id", FieldRule::UInt { min: 1, max: u64::MAX }),
    opt("title", FieldRule::Str { max: TITLE_MAX }),
    opt("description", FieldRule::Str { max: DESCRIPTION_MAX }),
    opt("priority", FieldRule::UInt { min: PRIORITY_MIN, max: PRIORITY_MAX }),
    opt("status", FieldRule::Str { max: STATUS_MAX }),
];

static LIST_TICKETS: &[FieldSpec] = &[
    opt("limit", FieldRule::UInt { min: 1, max: u64::MAX }),
    opt("offset", FieldRule::UInt { min: 0, max: u64::MAX }),
    opt("status", FieldRule::Str { max: STATUS_MAX }),
];

static JOIN_ROOM: &[FieldSpec] = &[req("room_id", FieldRule::Str { max: NAME_MAX })];

static LEAVE_ROOM: &[FieldSpec] = &[req("room_id", FieldRule::Str { max: NAME_MAX })];

static TEXT: &[FieldSpec] = &[
    req("room_id", FieldRule::Str { max: NAME_MAX }),
    req("content", FieldRule::Str { max: TEXT_MAX }),
    req("timestamp", MILLIS),
];

static DEVICE_DATA: &[FieldSpec] = &[
    req("device_id", FieldRule::Str { max: NAME_MAX }),
    opt("metrics", FieldRule::Object),
    req("timestamp", MILLIS),
];

static VIDEO_FRAME: &[FieldSpec] = &[
    req("width", FieldRule::UInt { min: 1, max: VIDEO_WIDTH_MAX }),
    req("height", FieldRule::UInt { min: 1, max: VIDEO_HEIGHT_MAX }),
    req("frame_rate", FieldRule::UInt { min: FRAME_RATE_MIN, max: FRAME_RATE_MAX }),
    opt("codec", FieldRule::Str { max: CODEC_MAX }),
    req("timestamp", MILLIS),
];

static AUDIO_FRAME: &[FieldSpec] = &[
    req("sample_rate", FieldRule::UInt { min: SAMPLE_RATE_MIN, max: SAMPLE_RATE_MAX }),
    req("channels", FieldRule::UInt { min: CHANNELS_MIN, max: CHANNELS_MAX }),
    opt("codec", FieldRule::Str { max: CODEC_MAX }),
    req("timestamp", MILLIS),
];

/// The schema table for a message kind.
pub fn schema_for(kind: MessageKind) -> &'static [FieldSpec] {
    match kind {
        MessageKind::Heartbeat => HEARTBEAT,
        MessageKind::HeartbeatAck => HEARTBEAT_ACK,
        MessageKind::Control => CONTROL,
        MessageKind::ServerEvent => SERVER_EVENT,
        MessageKind::Error => ERROR,
        MessageKind::Login => LOGIN,
        MessageKind::Register => REGISTER,
        MessageKind::CreateTicket => CREATE_TICKET,
        MessageKind::UpdateTicket => UPDATE_TICKET,
        MessageKind::ListTickets => LIST_TICKETS,
        MessageKind::JoinRoom => JOIN_ROOM,
        MessageKind::LeaveRoom => LEAVE_ROOM,
        MessageKind::Text => TEXT,
        MessageKind::DeviceData => DEVICE_DATA,
        MessageKind::VideoFrame => VIDEO_FRAME,
        MessageKind::AudioFrame => AUDIO_FRAME,
    }
}

// ── Validation ───────────────────────────────────────────────────

/// Validate a payload against its kind's schema table.
///
/// Returns on the first violation: a missing required field, or a
/// present field whose value breaks its rule. Unknown extra fields
/// are tolerated for forward compatibility.
pub fn validate(kind: MessageKind, payload: &Map<String, Value>) -> Result<(), WireError> {
    for spec in schema_for(kind) {
        match payload.get(spec.name) {
            None if spec.required => return Err(WireError::MissingField(spec.name)),
            None => {}
            Some(value) => check_rule(spec, value)?,
        }
    }
    Ok(())
}

fn check_rule(spec: &FieldSpec, value: &Value) -> Result<(), WireError> {
    let fail = |reason: String| WireError::InvalidField {
        field: spec.name,
        reason,
    };

    match spec.rule {
        FieldRule::Str { max } => {
            let s = value
                .as_str()
                .ok_or_else(|| fail("expected a string".into()))?;
            if s.is_empty() {
                return Err(fail("must not be empty".into()));
            }
            let len = s.chars().count();
            if len > max {
                return Err(fail(format!("{len} characters exceeds maximum of {max}")));
            }
        }
        FieldRule::UInt { min, max } => {
            let n = value
                .as_u64()
                .ok_or_else(|| fail("expected an unsigned integer".into()))?;
            if n < min || n > max {
                return Err(fail(format!("{n} outside allowed range {min}..={max}")));
            }
        }
        FieldRule::Email => {
            let s = value
                .as_str()
                .ok_or_else(|| fail("expected a string".into()))?;
            if !is_valid_email(s) {
                return Err(fail("not a valid email address".into()));
            }
        }
        FieldRule::Phone => {
            let s = value
                .as_str()
                .ok_or_else(|| fail("expected a string".into()))?;
            if !is_valid_phone(s) {
                return Err(fail("not a valid phone number".into()));
            }
        }
        FieldRule::Object => {
            if !value.is_object() {
                return Err(fail("expected an object".into()));
            }
        }
    }
    Ok(())
}

/// Exactly 11 ASCII digits, with the leading two digits in 13–19.
fn is_valid_phone(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 11
        && bytes.iter().all(u8::is_ascii_digit)
        && bytes[0] == b'1'
        && (b'3'..=b'9').contains(&bytes[1])
}

/// `local@domain` where the domain contains an interior dot.
fn is_valid_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    if domain.starts_with('.') || domain.ends_with('.') || !domain.contains('.') {
        return false;
    }
    let ok_char = |c: char| c.is_ascii_alphanumeric() || "._%+-".contains(c);
    local.chars().all(ok_char) && domain.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
}

// ── Tests ────────────────────────────────────────────────────────
