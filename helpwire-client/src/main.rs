//! Helpwire demo client — entry point.
//!
//! ```text
//! helpwire-client                        Connect with defaults
//! helpwire-client -u alice -r lobby      Custom user and room
//! helpwire-client --config client.toml   Load a config TOML
//! helpwire-client --gen-config           Write default config to stdout
//! ```
//!
//! Connects, logs in, joins a room, files a demo ticket, and then
//! relays heartbeats while printing everything the server sends.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use helpwire_core::catalog::{
    CreateTicket, Heartbeat, JoinRoom, LoginRequest, ServerNotice, TextMessage,
};
use helpwire_core::{
    ConnectionEvent, ConnectionManager, MessageKind, NetworkStatus, SessionEvent, SessionManager,
};

mod config;

use config::ClientConfig;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "helpwire-client", about = "Helpwire demo client")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "helpwire-client.toml")]
    config: PathBuf,

    /// Username to log in with.
    #[arg(short, long, default_value = "demo")]
    username: String,

    /// Room to join after login.
    #[arg(short, long, default_value = "lobby")]
    room: String,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        println!("{}", toml::to_string_pretty(&ClientConfig::default())?);
        return Ok(());
    }

    let cfg = ClientConfig::load(&cli.config);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("helpwire-client v{}", env!("CARGO_PKG_VERSION"));
    info!("server: {}:{}", cfg.network.host, cfg.network.port);

    let mut conn = ConnectionManager::new(cfg.to_connection_config());
    let (session_tx, mut session_events) = mpsc::unbounded_channel();
    let mut session = SessionManager::new(cfg.to_session_config(), session_tx);
    let mut status = NetworkStatus::new();

    conn.connect()?;

    let mut heartbeat = tokio::time::interval(Duration::from_secs(
        cfg.network.heartbeat_interval_secs.max(1),
    ));
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            event = conn.next_event() => {
                status.observe(&event);
                if !handle_connection_event(event, &cli, &cfg, &mut conn, &mut session) {
                    break;
                }
            }

            () = session.tick() => {}

            Some(event) = session_events.recv() => {
                match event {
                    SessionEvent::Expired => {
                        warn!("session expired — disconnecting");
                        conn.disconnect();
                        break;
                    }
                    event => info!(?event, "session event"),
                }
            }

            _ = heartbeat.tick() => {
                if conn.state().is_connected() {
                    let payload = Heartbeat::new().to_json();
                    let approx = serde_json::to_vec(&payload).map_or(0, |v| v.len()) + 10;
                    if conn.send(MessageKind::Heartbeat, payload, &[]) {
                        status.record_send(approx);
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received — shutting down");
                session.clear_session();
                conn.disconnect();
                break;
            }
        }
    }

    info!(
        packets_received = status.packets_received(),
        packets_sent = status.packets_sent(),
        reconnects = status.reconnect_attempts_total(),
        "goodbye"
    );
    Ok(())
}

/// React to one connection event. Returns `false` when the loop
/// should end.
fn handle_connection_event(
    event: ConnectionEvent,
    cli: &Cli,
    cfg: &ClientConfig,
    conn: &mut ConnectionManager,
    session: &mut SessionManager,
) -> bool {
    match event {
        ConnectionEvent::Connected => {
            info!("connected — logging in as {}", cli.username);
            let login = LoginRequest::new(&cli.username, "demo-password");
            conn.send(MessageKind::Login, login.to_json(), &[]);
        }

        ConnectionEvent::Message { kind: MessageKind::ServerEvent, json, .. } => {
            match ServerNotice::from_json(&json) {
                Ok(notice) => handle_notice(notice, cli, cfg, conn, session),
                Err(e) => warn!(error = %e, "bad server notice"),
            }
        }

        ConnectionEvent::Message { kind: MessageKind::HeartbeatAck, .. } => {
            // Traffic from the server counts as session activity.
            let _ = session.update_session_activity();
        }

        ConnectionEvent::Message { kind: MessageKind::Text, json, .. } => {
            if let Ok(msg) = TextMessage::from_json(&json) {
                info!(room = %msg.room_id, "<{}> {}", msg.room_id, msg.content);
            }
        }

        ConnectionEvent::Message { kind, .. } => {
            info!(%kind, "message received");
        }

        ConnectionEvent::Disconnected => {
            info!("disconnected");
        }

        ConnectionEvent::Reconnecting { attempt, delay } => {
            info!(attempt, ?delay, "reconnecting");
        }

        ConnectionEvent::ReconnectsExhausted => {
            warn!("reconnect attempts exhausted — giving up");
            session.clear_session();
            return false;
        }

        ConnectionEvent::ConnectionError(error) => {
            warn!(%error, "connection error");
        }
    }
    true
}

/// React to a server notice (login ack, ticket ack, room ack).
fn handle_notice(
    notice: ServerNotice,
    cli: &Cli,
    cfg: &ClientConfig,
    conn: &mut ConnectionManager,
    session: &mut SessionManager,
) {
    match notice.event.as_str() {
        "login-ok" => {
            let session_id = notice.detail.unwrap_or_default();
            match session.create_session(&cli.username, &session_id, cfg.session.timeout_minutes)
            {
                Ok(()) => info!(%session_id, "logged in"),
                Err(e) => {
                    warn!(error = %e, "could not establish session");
                    return;
                }
            }
            // Demo flow: join the room and file a ticket.
            let join = JoinRoom::new(&cli.room);
            conn.send(MessageKind::JoinRoom, join.to_json(), &[]);

            let ticket = CreateTicket::new(
                "connectivity check",
                format!("filed automatically by {}", cli.username),
                1,
            );
            conn.send(MessageKind::CreateTicket, ticket.to_json(), &[]);
        }

        "room-joined" => {
            let room = notice.detail.unwrap_or_default();
            info!(%room, "joined room");
            let hello = TextMessage::new(&room, format!("{} is online", cli.username));
            conn.send(MessageKind::Text, hello.to_json(), &[]);
        }

        "ticket-created" => {
            info!(ticket_id = ?notice.detail, "ticket filed");
        }

        event => {
            info!(event, detail = ?notice.detail, "server notice");
        }
    }
}
