//! Domain-specific error types for the helpwire protocol.
//!
//! All fallible operations return `Result<T, WireError>`.
//! No panics on invalid input — every error is typed and recoverable.

use thiserror::Error;

/// The canonical error type for the helpwire protocol core.
#[derive(Debug, Error)]
pub enum WireError {
    // ── Framing Errors ───────────────────────────────────────────
    /// A declared frame length was too small to hold the mandatory
    /// kind + json-size fields. The stream cannot be resynchronized.
    #[error("framing corrupted: declared length {declared} below minimum {min}")]
    FramingCorrupted { declared: u32, min: u32 },

    /// A frame declared a json size larger than its own body.
    #[error("json size {json_size} exceeds frame body of {body} bytes")]
    JsonOverrun { json_size: u32, body: u32 },

    /// The structured payload was not a UTF-8 JSON object.
    #[error("invalid payload json: {0}")]
    PayloadJson(String),

    /// Message kind zero is reserved and never valid on the wire.
    #[error("message kind must be non-zero")]
    ZeroKind,

    // ── Catalog Errors ───────────────────────────────────────────
    /// A kind value did not map to any known catalog entry.
    #[error("unknown message kind: {0:#06x}")]
    UnknownKind(u16),

    /// A mandatory payload field was absent.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// A payload field was present but violated its schema rule.
    #[error("invalid field `{field}`: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },

    // ── Connection Errors ────────────────────────────────────────
    /// The TCP/IO layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// An operation was attempted from a state that does not allow it.
    #[error("invalid connection state: {0}")]
    InvalidTransition(&'static str),

    /// An operation required an established connection.
    #[error("not connected")]
    NotConnected,

    /// An mpsc channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    // ── Session Errors ───────────────────────────────────────────
    /// A session could not be created or refreshed.
    #[error("invalid session: {0}")]
    Session(&'static str),

    /// An operation required an active session.
    #[error("no active session")]
    NoSession,

    // ── Serialization Errors ─────────────────────────────────────
    /// Encoding or decoding of a payload failed.
    #[error("encoding error: {0}")]
    Encoding(String),
}

// ── Convenient From implementations ──────────────────────────────

impl From<serde_json::Error> for WireError {
    fn from(e: serde_json::Error) -> Self {
        WireError::Encoding(e.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for WireError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        WireError::ChannelClosed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = WireError::FramingCorrupted {
            declared: 3,
            min: 6,
        };
        assert!(e.to_string().contains("3"));
        assert!(e.to_string().contains("6"));

        let e = WireError::MissingField("username");
        assert!(e.to_string().contains("username"));

        let e = WireError::InvalidField {
            field: "priority",
            reason: "out of range".into(),
        };
        assert!(e.to_string().contains("priority"));
        assert!(e.to_string().contains("out of range"));
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke");
        let e: WireError = io_err.into();
        assert!(matches!(e, WireError::Connection(_)));
    }

    #[test]
    fn from_serde_json() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let e: WireError = parse_err.into();
        assert!(matches!(e, WireError::Encoding(_)));
    }
}
