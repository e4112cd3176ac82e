//! The wire frame format and the receive-buffer drain loop.
//!
//! ```text
//! byte[0..4)   length     = 2 + 4 + len(json_bytes) + len(bin)
//! byte[4..6)   kind
//! byte[6..10)  json_size
//! byte[10..10+json_size)        json_bytes  (UTF-8 JSON object)
//! byte[10+json_size..4+length)  bin         (opaque)
//! ```
//!
//! All integers are big-endian, unsigned. The `length` field covers
//! everything after itself.
//!
//! Corruption is handled at two severities: a declared length smaller
//! than the mandatory kind + json-size fields loses stream framing and
//! discards the whole buffer; a json size larger than the frame's own
//! body corrupts only that frame and is dropped with the stream
//! position preserved.

use bytes::{Buf, BytesMut};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::WireError;

/// Bytes occupied by the kind + json-size fields inside the frame body.
pub const FRAME_FIXED_FIELDS: u32 = 6;

/// Bytes occupied by the length prefix.
pub const LENGTH_PREFIX: usize = 4;

// ── Packet ───────────────────────────────────────────────────────

/// A decoded protocol unit: kind code, structured payload, and an
/// optional opaque binary payload.
///
/// Packets are produced by [`drain`] (or the framed codec), handed to
/// the message catalog, and discarded — they are never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    kind: u16,
    json: Map<String, Value>,
    bin: Vec<u8>,
}

impl Packet {
    /// Build a packet. Kind zero is reserved and rejected.
    pub fn new(kind: u16, json: Map<String, Value>, bin: Vec<u8>) -> Result<Self, WireError> {
        if kind == 0 {
            return Err(WireError::ZeroKind);
        }
        Ok(Self { kind, json, bin })
    }

    /// The on-wire kind code.
    pub fn kind(&self) -> u16 {
        self.kind
    }

    /// The structured payload.
    pub fn json(&self) -> &Map<String, Value> {
        &self.json
    }

    /// The opaque binary payload (possibly empty).
    pub fn bin(&self) -> &[u8] {
        &self.bin
    }

    /// Decompose into `(kind, json, bin)`.
    pub fn into_parts(self) -> (u16, Map<String, Value>, Vec<u8>) {
        (self.kind, self.json, self.bin)
    }

    /// Encode this packet as one wire frame.
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        encode_frame(self.kind, &self.json, &self.bin)
    }
}

// ── Encoding ─────────────────────────────────────────────────────

/// Encode one frame. No upper bound is enforced on the frame size —
/// that is the caller's responsibility.
pub fn encode_frame(
    kind: u16,
    json: &Map<String, Value>,
    bin: &[u8],
) -> Result<Vec<u8>, WireError> {
    if kind == 0 {
        return Err(WireError::ZeroKind);
    }
    let json_bytes = serde_json::to_vec(json)?;
    let length = FRAME_FIXED_FIELDS as usize + json_bytes.len() + bin.len();

    let mut frame = Vec::with_capacity(LENGTH_PREFIX + length);
    frame.extend_from_slice(&(length as u32).to_be_bytes());
    frame.extend_from_slice(&kind.to_be_bytes());
    frame.extend_from_slice(&(json_bytes.len() as u32).to_be_bytes());
    frame.extend_from_slice(&json_bytes);
    frame.extend_from_slice(bin);
    Ok(frame)
}

// ── Draining ─────────────────────────────────────────────────────

/// Result of draining a receive buffer.
#[derive(Debug, Default)]
pub struct Drained {
    /// Complete packets extracted, in byte-stream order.
    pub packets: Vec<Packet>,
    /// Set when framing was lost and the buffer was wholly discarded.
    pub corrupted: bool,
}

impl Drained {
    /// `true` iff at least one packet was produced.
    pub fn any(&self) -> bool {
        !self.packets.is_empty()
    }
}

/// Extract every currently-complete frame from `buf`, leaving any
/// partial frame in place.
///
/// Chunking is transparent: feeding bytes in arbitrary fragments
/// produces the same packet sequence as one call over the
/// concatenated stream.
pub fn drain(buf: &mut BytesMut) -> Drained {
    let mut out = Drained::default();

    loop {
        // Not even a length prefix yet — wait for more data.
        if buf.len() < LENGTH_PREFIX {
            return out;
        }

        // Peek the length without consuming it.
        let length = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);

        // Too small to hold the mandatory fields: framing is lost and
        // there is no way to resynchronize. Discard everything.
        if length < FRAME_FIXED_FIELDS {
            warn!(
                declared = length,
                discarded = buf.len(),
                "framing corrupted; discarding receive buffer"
            );
            buf.clear();
            out.corrupted = true;
            return out;
        }

        // Partial frame — consume nothing, wait for more bytes.
        if buf.len() < LENGTH_PREFIX + length as usize {
            return out;
        }

        let mut frame = buf.split_to(LENGTH_PREFIX + length as usize);
        frame.advance(LENGTH_PREFIX);

        match parse_frame_body(frame) {
            Ok(packet) => out.packets.push(packet),
            // A malformed body corrupts only this frame; subsequent
            // frames in the buffer are still aligned.
            Err(e) => warn!(error = %e, "dropping malformed frame"),
        }
    }
}

/// Parse one frame body (everything after the length prefix) into a
/// packet.
pub(crate) fn parse_frame_body(mut frame: BytesMut) -> Result<Packet, WireError> {
    let body = frame.len() as u32 - FRAME_FIXED_FIELDS;
    let kind = frame.get_u16();
    let json_size = frame.get_u32();

    if json_size > body {
        return Err(WireError::JsonOverrun { json_size, body });
    }

    let json_bytes = frame.split_to(json_size as usize);
    let json = match serde_json::from_slice::<Value>(&json_bytes) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            return Err(WireError::PayloadJson(format!(
                "expected object, got {}",
                json_type_name(&other)
            )));
        }
        Err(e) => return Err(WireError::PayloadJson(e.to_string())),
    };

    Packet::new(kind, json, frame.to_vec())
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ── Tests ────────────────────────────────────────────────────────
