//! Session lifecycle tracking with sliding expiration.
//!
//! A [`SessionManager`] records the authenticated user's session,
//! expires it after a configurable period of inactivity, and — when
//! auto-refresh is enabled — keeps it alive with a repeating refresh
//! timer. Timers are plain deadline fields awaited by [`tick`]; the
//! caller selects on `tick()` alongside its other event sources.
//! Disarming a timer is setting its deadline to `None`, so no
//! callback can fire after teardown.
//!
//! Lifecycle events are emitted through an injected channel sender,
//! always after the state mutation they describe.
//!
//! [`tick`]: SessionManager::tick

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::WireError;

/// Sessions expire after this many minutes without activity.
pub const DEFAULT_TIMEOUT_MINUTES: u64 = 120;

/// Keep-alive refresh cadence.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 60;

// ── Configuration ────────────────────────────────────────────────

/// Session timeout and keep-alive policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub timeout_minutes: u64,
    pub auto_refresh: bool,
    pub refresh_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_minutes: DEFAULT_TIMEOUT_MINUTES,
            auto_refresh: true,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
        }
    }
}

// ── Events ───────────────────────────────────────────────────────

/// Session lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A session was established.
    Created { user: String, session_id: String },
    /// The keep-alive refresh ran and slid the expiration window.
    Refreshed,
    /// The inactivity window elapsed.
    Expired,
    /// The session was cleared explicitly (logout).
    Cleared,
}

// ── Record ───────────────────────────────────────────────────────

/// The active session, while one exists.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub user: String,
    pub session_id: String,
    pub started_at: Instant,
    pub last_activity: Instant,
    pub timeout_minutes: u64,
}

// ── SessionManager ───────────────────────────────────────────────

/// Tracks a logged-in session's validity window.
#[derive(Debug)]
pub struct SessionManager {
    config: SessionConfig,
    record: Option<SessionRecord>,
    session_deadline: Option<Instant>,
    refresh_deadline: Option<Instant>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionManager {
    pub fn new(config: SessionConfig, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self {
            config,
            record: None,
            session_deadline: None,
            refresh_deadline: None,
            events,
        }
    }

    // ── Queries ──────────────────────────────────────────────────

    pub fn is_logged_in(&self) -> bool {
        self.record.is_some()
    }

    /// The logged-in user, or `""` when no session exists.
    pub fn user(&self) -> &str {
        self.record.as_ref().map(|r| r.user.as_str()).unwrap_or("")
    }

    /// The session id, or `""` when no session exists.
    pub fn session_id(&self) -> &str {
        self.record
            .as_ref()
            .map(|r| r.session_id.as_str())
            .unwrap_or("")
    }

    /// The configured inactivity window, or 0 when no session exists.
    pub fn timeout_minutes(&self) -> u64 {
        self.record.as_ref().map(|r| r.timeout_minutes).unwrap_or(0)
    }

    pub fn record(&self) -> Option<&SessionRecord> {
        self.record.as_ref()
    }

    /// Pure query: has the inactivity window elapsed? Whole minutes
    /// since the last activity are compared against the timeout.
    /// `false` while logged out.
    pub fn is_session_expired(&self) -> bool {
        match &self.record {
            Some(r) => {
                let idle_minutes = Instant::now().duration_since(r.last_activity).as_secs() / 60;
                idle_minutes >= r.timeout_minutes
            }
            None => false,
        }
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Establish a session. Fails on an empty user or session id.
    /// A `timeout_minutes` of 0 falls back to the configured value.
    /// Replaces any existing session.
    pub fn create_session(
        &mut self,
        user: &str,
        session_id: &str,
        timeout_minutes: u64,
    ) -> Result<(), WireError> {
        if user.is_empty() {
            return Err(WireError::Session("user identity must be non-empty"));
        }
        if session_id.is_empty() {
            return Err(WireError::Session("session id must be non-empty"));
        }
        let timeout_minutes = if timeout_minutes == 0 {
            self.config.timeout_minutes
        } else {
            timeout_minutes
        };

        let now = Instant::now();
        self.record = Some(SessionRecord {
            user: user.to_owned(),
            session_id: session_id.to_owned(),
            started_at: now,
            last_activity: now,
            timeout_minutes,
        });
        self.session_deadline = Some(now + Duration::from_secs(timeout_minutes * 60));
        self.refresh_deadline = self
            .config
            .auto_refresh
            .then(|| now + Duration::from_secs(self.config.refresh_interval_secs));

        info!(user, session_id, timeout_minutes, "session created");
        let _ = self.events.send(SessionEvent::Created {
            user: user.to_owned(),
            session_id: session_id.to_owned(),
        });
        Ok(())
    }

    /// Record activity: slides the expiration window back to its
    /// full length. Fails when no session exists.
    pub fn update_session_activity(&mut self) -> Result<(), WireError> {
        let Some(record) = self.record.as_mut() else {
            return Err(WireError::NoSession);
        };
        let now = Instant::now();
        record.last_activity = now;
        self.session_deadline = Some(now + Duration::from_secs(record.timeout_minutes * 60));
        Ok(())
    }

    /// Tear down the session and emit `Expired`. No-op while logged
    /// out.
    pub fn expire_session(&mut self) {
        if self.teardown() {
            info!("session expired");
            let _ = self.events.send(SessionEvent::Expired);
        }
    }

    /// Tear down the session and emit `Cleared` (logout). No-op
    /// while logged out.
    pub fn clear_session(&mut self) {
        if self.teardown() {
            info!("session cleared");
            let _ = self.events.send(SessionEvent::Cleared);
        }
    }

    /// Disarm both timers and drop the record. Returns `true` when a
    /// session actually existed.
    fn teardown(&mut self) -> bool {
        self.session_deadline = None;
        self.refresh_deadline = None;
        self.record.take().is_some()
    }

    // ── Timers ───────────────────────────────────────────────────

    /// Await the nearest armed deadline and handle it. Pends forever
    /// while no timer is armed, so it can sit in a `tokio::select!`
    /// arm unconditionally.
    pub async fn tick(&mut self) {
        let deadline = match (self.session_deadline, self.refresh_deadline) {
            (None, None) => return std::future::pending().await,
            (Some(session), None) => session,
            (None, Some(refresh)) => refresh,
            (Some(session), Some(refresh)) => session.min(refresh),
        };
        tokio::time::sleep_until(deadline).await;

        let now = Instant::now();
        // On a tie the session timer wins: expiry is unconditional.
        if self.session_deadline.is_some_and(|d| d <= now) {
            self.on_session_timer();
            return;
        }
        if self.refresh_deadline.is_some_and(|d| d <= now) {
            self.on_refresh_timer();
        }
    }

    fn on_session_timer(&mut self) {
        self.session_deadline = None;
        self.expire_session();
    }

    fn on_refresh_timer(&mut self) {
        if !self.is_logged_in() {
            // Lost the session since the timer was armed; disarm.
            self.refresh_deadline = None;
            return;
        }
        // Keep-alive: refreshing counts as activity.
        let _ = self.update_session_activity();
        debug!("session refreshed");
        let _ = self.events.send(SessionEvent::Refreshed);
        self.refresh_deadline =
            Some(Instant::now() + Duration::from_secs(self.config.refresh_interval_secs));
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio::time::advance;

    fn manager(config: SessionConfig) -> (SessionManager, UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (SessionManager::new(config, tx), rx)
    }

    fn no_refresh() -> SessionConfig {
        SessionConfig {
            auto_refresh: false,
            ..SessionConfig::default()
        }
    }

    #[tokio::test]
    async fn create_requires_identity() {
        let (mut sm, _rx) = manager(no_refresh());
        assert!(sm.create_session("", "s1", 1).is_err());
        assert!(sm.create_session("alice", "", 1).is_err());
        assert!(!sm.is_logged_in());

        assert!(sm.create_session("alice", "s1", 1).is_ok());
        assert!(sm.is_logged_in());
    }

    #[tokio::test]
    async fn getters_empty_while_logged_out() {
        let (sm, _rx) = manager(no_refresh());
        assert_eq!(sm.user(), "");
        assert_eq!(sm.session_id(), "");
        assert_eq!(sm.timeout_minutes(), 0);
        assert!(sm.record().is_none());
        assert!(!sm.is_session_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn expires_after_inactivity() {
        let (mut sm, mut rx) = manager(no_refresh());
        sm.create_session("alice", "s1", 1).unwrap();
        assert_eq!(rx.try_recv().unwrap(), SessionEvent::Created {
            user: "alice".into(),
            session_id: "s1".into(),
        });

        advance(Duration::from_secs(61)).await;
        assert!(sm.is_session_expired());

        sm.tick().await;
        assert!(!sm.is_logged_in());
        assert_eq!(rx.try_recv().unwrap(), SessionEvent::Expired);
    }

    #[tokio::test(start_paused = true)]
    async fn not_expired_before_window() {
        let (mut sm, _rx) = manager(no_refresh());
        sm.create_session("alice", "s1", 1).unwrap();
        advance(Duration::from_secs(59)).await;
        assert!(!sm.is_session_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn activity_slides_the_window() {
        let (mut sm, mut rx) = manager(no_refresh());
        sm.create_session("alice", "s1", 1).unwrap();
        let _ = rx.try_recv();

        advance(Duration::from_secs(59)).await;
        sm.update_session_activity().unwrap();

        // The original deadline (60 s after creation) passes without
        // expiry: the timer was re-armed from zero.
        let fired = tokio::time::timeout(Duration::from_secs(59), sm.tick()).await;
        assert!(fired.is_err(), "session expired at the original deadline");
        assert!(sm.is_logged_in());
        assert!(!sm.is_session_expired());

        // The slid deadline does fire.
        sm.tick().await;
        assert!(!sm.is_logged_in());
        assert_eq!(rx.try_recv().unwrap(), SessionEvent::Expired);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_keeps_session_alive() {
        let config = SessionConfig {
            timeout_minutes: 2,
            auto_refresh: true,
            refresh_interval_secs: 60,
        };
        let (mut sm, mut rx) = manager(config);
        sm.create_session("alice", "s1", 2).unwrap();
        let _ = rx.try_recv();

        // First refresh at 60 s slides expiry to 180 s.
        sm.tick().await;
        assert_eq!(rx.try_recv().unwrap(), SessionEvent::Refreshed);
        assert!(sm.is_logged_in());

        // Second refresh at 120 s; the 120 s session deadline was
        // already slid, so the session survives.
        sm.tick().await;
        assert_eq!(rx.try_recv().unwrap(), SessionEvent::Refreshed);
        assert!(sm.is_logged_in());
    }

    #[tokio::test]
    async fn update_activity_requires_session() {
        let (mut sm, _rx) = manager(no_refresh());
        assert!(matches!(
            sm.update_session_activity(),
            Err(WireError::NoSession)
        ));
    }

    #[tokio::test]
    async fn clear_emits_cleared() {
        let (mut sm, mut rx) = manager(no_refresh());
        sm.create_session("alice", "s1", 1).unwrap();
        let _ = rx.try_recv();

        sm.clear_session();
        assert!(!sm.is_logged_in());
        assert_eq!(sm.user(), "");
        assert_eq!(rx.try_recv().unwrap(), SessionEvent::Cleared);

        // Idempotent: a second clear emits nothing.
        sm.clear_session();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn expire_when_logged_out_is_a_noop() {
        let (mut sm, mut rx) = manager(no_refresh());
        sm.expire_session();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn replacing_session_rearms() {
        let (mut sm, mut rx) = manager(no_refresh());
        sm.create_session("alice", "s1", 1).unwrap();
        sm.create_session("bob", "s2", 5).unwrap();

        assert_eq!(sm.user(), "bob");
        assert_eq!(sm.session_id(), "s2");
        assert_eq!(sm.timeout_minutes(), 5);

        // Two Created events, no Expired/Cleared in between.
        assert!(matches!(rx.try_recv(), Ok(SessionEvent::Created { .. })));
        assert!(matches!(rx.try_recv(), Ok(SessionEvent::Created { .. })));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn zero_timeout_uses_configured_default() {
        let (mut sm, _rx) = manager(no_refresh());
        sm.create_session("alice", "s1", 0).unwrap();
        assert_eq!(sm.timeout_minutes(), DEFAULT_TIMEOUT_MINUTES);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_timer_disarms_when_logged_out() {
        let (mut sm, _rx) = manager(SessionConfig::default());
        sm.create_session("alice", "s1", 2).unwrap();
        sm.clear_session();
        assert!(sm.session_deadline.is_none());
        assert!(sm.refresh_deadline.is_none());

        // With both timers disarmed tick() pends forever.
        let fired = tokio::time::timeout(Duration::from_secs(600), sm.tick()).await;
        assert!(fired.is_err());
    }

    #[tokio::test]
    async fn last_activity_tracks_updates() {
        let (mut sm, _rx) = manager(no_refresh());
        sm.create_session("alice", "s1", 1).unwrap();
        sm.update_session_activity().unwrap();
        let record = sm.record().unwrap();
        assert!(record.last_activity >= record.started_at);
    }
}
