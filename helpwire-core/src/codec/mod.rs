//! `tokio_util` codec over the helpwire frame format.
//!
//! Applies the same per-frame rules as [`packet::drain`], one packet
//! at a time, for use with `Framed<TcpStream, FrameCodec>` on the
//! server side. An undersized declared length is unrecoverable and
//! surfaces as a decode error; a malformed single frame is skipped
//! and decoding continues with the next frame.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::error::WireError;
use crate::packet::{self, FRAME_FIXED_FIELDS, LENGTH_PREFIX, Packet};

/// Stateless frame codec.
#[derive(Debug, Default)]
pub struct FrameCodec;

impl Decoder for FrameCodec {
    type Item = Packet;
    type Error = WireError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if src.len() < LENGTH_PREFIX {
                return Ok(None);
            }

            let length = u32::from_be_bytes([src[0], src[1], src[2], src[3]]);
            if length < FRAME_FIXED_FIELDS {
                // Stream framing is lost; the connection must be torn
                // down by the caller.
                src.clear();
                return Err(WireError::FramingCorrupted {
                    declared: length,
                    min: FRAME_FIXED_FIELDS,
                });
            }

            let total = LENGTH_PREFIX + length as usize;
            if src.len() < total {
                src.reserve(total - src.len());
                return Ok(None);
            }

            let mut frame = src.split_to(total);
            frame.advance(LENGTH_PREFIX);
            match packet::parse_frame_body(frame) {
                Ok(pkt) => return Ok(Some(pkt)),
                Err(e) => {
                    warn!(error = %e, "dropping malformed frame");
                    continue;
                }
            }
        }
    }
}

impl Encoder<Packet> for FrameCodec {
    type Error = WireError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let frame = item.encode()?;
        dst.extend_from_slice(&frame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, json};

    fn packet(kind: u16) -> Packet {
        let mut map = Map::new();
        map.insert("timestamp".into(), json!(1_700_000_000_000u64));
        Packet::new(kind, map, b"bin".to_vec()).unwrap()
    }

    #[test]
    fn encode_decode_roundtrip() {
        let mut codec = FrameCodec;
        let mut buf = BytesMut::new();

        codec.encode(packet(0x0001), &mut buf).unwrap();
        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.kind(), 0x0001);
        assert_eq!(decoded.bin(), b"bin");
        assert!(buf.is_empty());
    }

    #[test]
    fn partial_input_returns_none() {
        let mut codec = FrameCodec;
        let mut buf = BytesMut::new();
        codec.encode(packet(0x0001), &mut buf).unwrap();
        let full = buf.split();

        let mut partial = BytesMut::from(&full[..full.len() - 1]);
        assert!(codec.decode(&mut partial).unwrap().is_none());

        partial.extend_from_slice(&full[full.len() - 1..]);
        assert!(codec.decode(&mut partial).unwrap().is_some());
    }

    #[test]
    fn undersized_length_is_a_decode_error() {
        let mut codec = FrameCodec;
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&2u32.to_be_bytes());
        buf.extend_from_slice(&[0u8; 16]);

        let err = codec.decode(&mut buf).unwrap_err();
        assert!(matches!(err, WireError::FramingCorrupted { .. }));
        assert!(buf.is_empty());
    }

    #[test]
    fn malformed_frame_skipped_next_frame_decoded() {
        let mut codec = FrameCodec;
        let mut buf = BytesMut::new();

        // json_size overruns the body.
        let body_len = FRAME_FIXED_FIELDS + 2;
        buf.extend_from_slice(&body_len.to_be_bytes());
        buf.extend_from_slice(&0x0101u16.to_be_bytes());
        buf.extend_from_slice(&100u32.to_be_bytes());
        buf.extend_from_slice(b"{}");

        codec.encode(packet(0x0002), &mut buf).unwrap();

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.kind(), 0x0002);
    }
}
