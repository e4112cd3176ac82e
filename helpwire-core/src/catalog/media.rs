//! Media payloads — device telemetry and audio/video frames.
//!
//! Frame parameters travel in the JSON section; the actual frame or
//! sample bytes ride in the binary section of the packet.

use serde_json::{Map, Value};

use crate::catalog::{
    insert_opt_str, now_millis, opt_object_field, opt_str_field, str_field, u64_field,
};
use crate::error::WireError;
use crate::message::MessageKind;
use crate::packet::Packet;
use crate::schema;

// ── Device data ──────────────────────────────────────────────────

/// Payload for [`MessageKind::DeviceData`].
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceData {
    pub device_id: String,
    /// Free-form metric object (readings, health flags).
    pub metrics: Option<Map<String, Value>>,
    pub timestamp: u64,
}

impl DeviceData {
    pub const KIND: MessageKind = MessageKind::DeviceData;

    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            metrics: None,
            timestamp: now_millis(),
        }
    }

    pub fn with_metrics(mut self, metrics: Map<String, Value>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn to_json(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("device_id".into(), Value::String(self.device_id.clone()));
        if let Some(metrics) = &self.metrics
            && !metrics.is_empty()
        {
            payload.insert("metrics".into(), Value::Object(metrics.clone()));
        }
        payload.insert("timestamp".into(), self.timestamp.into());
        payload
    }

    pub fn from_json(payload: &Map<String, Value>) -> Result<Self, WireError> {
        schema::validate(Self::KIND, payload)?;
        Ok(Self {
            device_id: str_field(payload, "device_id")?,
            metrics: opt_object_field(payload, "metrics"),
            timestamp: u64_field(payload, "timestamp")?,
        })
    }

    pub fn into_packet(self) -> Result<Packet, WireError> {
        let json = self.to_json();
        Packet::new(Self::KIND.code(), json, Vec::new())
    }
}

// ── Video frame ──────────────────────────────────────────────────

/// Parameters for [`MessageKind::VideoFrame`]. Resolution is capped
/// at 8K, frame rate at 120.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    pub width: u64,
    pub height: u64,
    pub frame_rate: u64,
    pub codec: Option<String>,
    pub timestamp: u64,
}

impl VideoFrame {
    pub const KIND: MessageKind = MessageKind::VideoFrame;

    pub fn new(width: u64, height: u64, frame_rate: u64) -> Self {
        Self {
            width,
            height,
            frame_rate,
            codec: None,
            timestamp: now_millis(),
        }
    }

    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = Some(codec.into());
        self
    }

    pub fn to_json(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("width".into(), self.width.into());
        payload.insert("height".into(), self.height.into());
        payload.insert("frame_rate".into(), self.frame_rate.into());
        insert_opt_str(&mut payload, "codec", &self.codec);
        payload.insert("timestamp".into(), self.timestamp.into());
        payload
    }

    pub fn from_json(payload: &Map<String, Value>) -> Result<Self, WireError> {
        schema::validate(Self::KIND, payload)?;
        Ok(Self {
            width: u64_field(payload, "width")?,
            height: u64_field(payload, "height")?,
            frame_rate: u64_field(payload, "frame_rate")?,
            codec: opt_str_field(payload, "codec"),
            timestamp: u64_field(payload, "timestamp")?,
        })
    }

    /// Build a wire packet carrying the encoded frame bytes.
    pub fn into_packet(self, frame: Vec<u8>) -> Result<Packet, WireError> {
        let json = self.to_json();
        Packet::new(Self::KIND.code(), json, frame)
    }
}

// ── Audio frame ──────────────────────────────────────────────────

/// Parameters for [`MessageKind::AudioFrame`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    pub sample_rate: u64,
    pub channels: u64,
    pub codec: Option<String>,
    pub timestamp: u64,
}

impl AudioFrame {
    pub const KIND: MessageKind = MessageKind::AudioFrame;

    pub fn new(sample_rate: u64, channels: u64) -> Self {
        Self {
            sample_rate,
            channels,
            codec: None,
            timestamp: now_millis(),
        }
    }

    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = Some(codec.into());
        self
    }

    pub fn to_json(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("sample_rate".into(), self.sample_rate.into());
        payload.insert("channels".into(), self.channels.into());
        insert_opt_str(&mut payload, "codec", &self.codec);
        payload.insert("timestamp".into(), self.timestamp.into());
        payload
    }

    pub fn from_json(payload: &Map<String, Value>) -> Result<Self, WireError> {
        schema::validate(Self::KIND, payload)?;
        Ok(Self {
            sample_rate: u64_field(payload, "sample_rate")?,
            channels: u64_field(payload, "channels")?,
            codec: opt_str_field(payload, "codec"),
            timestamp: u64_field(payload, "timestamp")?,
        })
    }

    /// Build a wire packet carrying the sample bytes.
    pub fn into_packet(self, samples: Vec<u8>) -> Result<Packet, WireError> {
        let json = self.to_json();
        Packet::new(Self::KIND.code(), json, samples)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn device_data_roundtrip() {
        let mut metrics = Map::new();
        metrics.insert("cpu".into(), json!(87));
        let data = DeviceData::new("cam-7").with_metrics(metrics);

        let parsed = DeviceData::from_json(&data.to_json()).unwrap();
        assert_eq!(parsed, data);
    }

    #[test]
    fn device_data_empty_metrics_omitted() {
        let data = DeviceData::new("cam-7").with_metrics(Map::new());
        assert!(!data.to_json().contains_key("metrics"));
    }

    #[test]
    fn video_frame_boundary_build_validates() {
        let frame = VideoFrame::new(7680, 4320, 120).with_codec("h264");
        assert!(schema::validate(VideoFrame::KIND, &frame.to_json()).is_ok());

        let frame = VideoFrame::new(1, 1, 1);
        assert!(schema::validate(VideoFrame::KIND, &frame.to_json()).is_ok());
    }

    #[test]
    fn video_frame_out_of_range_rejected() {
        let frame = VideoFrame::new(7681, 1080, 30);
        assert!(VideoFrame::from_json(&frame.to_json()).is_err());

        let frame = VideoFrame::new(1920, 1080, 121);
        assert!(VideoFrame::from_json(&frame.to_json()).is_err());
    }

    #[test]
    fn video_frame_packet_carries_binary() {
        let pkt = VideoFrame::new(1920, 1080, 30)
            .into_packet(vec![0xAB; 64])
            .unwrap();
        assert_eq!(pkt.kind(), MessageKind::VideoFrame.code());
        assert_eq!(pkt.bin().len(), 64);
    }

    #[test]
    fn audio_frame_boundary_build_validates() {
        for (rate, channels) in [(8000, 1), (192_000, 8)] {
            let frame = AudioFrame::new(rate, channels);
            assert!(schema::validate(AudioFrame::KIND, &frame.to_json()).is_ok());
        }
        for (rate, channels) in [(7999, 1), (192_001, 1), (44_100, 0), (44_100, 9)] {
            let frame = AudioFrame::new(rate, channels);
            assert!(schema::validate(AudioFrame::KIND, &frame.to_json()).is_err());
        }
    }

    #[test]
    fn audio_frame_roundtrip() {
        let frame = AudioFrame::new(48_000, 2).with_codec("opus");
        let parsed = AudioFrame::from_json(&frame.to_json()).unwrap();
        assert_eq!(parsed, frame);
    }
}
