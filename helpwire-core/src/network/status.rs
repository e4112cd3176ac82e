//! Passive connection diagnostics.
//!
//! [`NetworkStatus`] aggregates counters from the stream of
//! [`ConnectionEvent`]s without feeding anything back into the
//! manager. Feed it every event the manager emits; call
//! [`NetworkStatus::record_send`] after each successful send.

use std::time::{Duration, Instant};

use crate::network::connection::{ConnectionEvent, LinkState};

/// Aggregated connection counters and state for diagnostics.
#[derive(Debug, Default)]
pub struct NetworkStatus {
    state: LinkState,
    connected_since: Option<Instant>,
    packets_received: u64,
    bytes_received: u64,
    packets_sent: u64,
    bytes_sent: u64,
    reconnect_attempts_total: u64,
    transport_errors: u64,
    last_error: Option<String>,
}

impl NetworkStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one connection event into the counters.
    pub fn observe(&mut self, event: &ConnectionEvent) {
        match event {
            ConnectionEvent::Connected => {
                self.state = LinkState::Connected;
                self.connected_since = Some(Instant::now());
            }
            ConnectionEvent::Disconnected => {
                self.state = LinkState::Disconnected;
                self.connected_since = None;
            }
            ConnectionEvent::Reconnecting { .. } => {
                self.state = LinkState::Reconnecting;
                self.reconnect_attempts_total += 1;
            }
            ConnectionEvent::ReconnectsExhausted => {
                self.state = LinkState::Disconnected;
            }
            ConnectionEvent::ConnectionError(error) => {
                self.state = LinkState::Error;
                self.connected_since = None;
                self.transport_errors += 1;
                self.last_error = Some(error.clone());
            }
            ConnectionEvent::Message { json, bin, .. } => {
                self.packets_received += 1;
                // Approximate: payload sizes, not wire framing.
                self.bytes_received += bin.len() as u64;
                self.bytes_received += serde_json::to_vec(json).map_or(0, |v| v.len() as u64);
            }
        }
    }

    /// Count one successfully sent frame of `bytes` length.
    pub fn record_send(&mut self, bytes: usize) {
        self.packets_sent += 1;
        self.bytes_sent += bytes as u64;
    }

    // ── Accessors ────────────────────────────────────────────────

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// How long the link has been up, if it is.
    pub fn uptime(&self) -> Option<Duration> {
        self.connected_since.map(|t| t.elapsed())
    }

    pub fn packets_received(&self) -> u64 {
        self.packets_received
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    pub fn packets_sent(&self) -> u64 {
        self.packets_sent
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    pub fn reconnect_attempts_total(&self) -> u64 {
        self.reconnect_attempts_total
    }

    pub fn transport_errors(&self) -> u64 {
        self.transport_errors
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind;
    use serde_json::Map;
    use std::time::Duration;

    #[test]
    fn connect_disconnect_cycle() {
        let mut status = NetworkStatus::new();
        assert_eq!(status.state(), LinkState::Disconnected);
        assert!(status.uptime().is_none());

        status.observe(&ConnectionEvent::Connected);
        assert_eq!(status.state(), LinkState::Connected);
        assert!(status.uptime().is_some());

        status.observe(&ConnectionEvent::Disconnected);
        assert_eq!(status.state(), LinkState::Disconnected);
        assert!(status.uptime().is_none());
    }

    #[test]
    fn message_and_send_counters() {
        let mut status = NetworkStatus::new();
        status.observe(&ConnectionEvent::Message {
            kind: MessageKind::Heartbeat,
            json: Map::new(),
            bin: vec![0; 10],
        });
        assert_eq!(status.packets_received(), 1);
        assert!(status.bytes_received() >= 10);

        status.record_send(42);
        assert_eq!(status.packets_sent(), 1);
        assert_eq!(status.bytes_sent(), 42);
    }

    #[test]
    fn reconnects_and_errors_accumulate() {
        let mut status = NetworkStatus::new();
        status.observe(&ConnectionEvent::Reconnecting {
            attempt: 1,
            delay: Duration::from_secs(5),
        });
        status.observe(&ConnectionEvent::Reconnecting {
            attempt: 2,
            delay: Duration::from_secs(5),
        });
        assert_eq!(status.reconnect_attempts_total(), 2);

        status.observe(&ConnectionEvent::ConnectionError("timed out".into()));
        assert_eq!(status.transport_errors(), 1);
        assert_eq!(status.last_error(), Some("timed out"));
        assert_eq!(status.state(), LinkState::Error);
    }
}
