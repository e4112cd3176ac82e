//! Accept loop and per-connection dispatch.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use helpwire_core::catalog::{
    Control, CreateTicket, ErrorReport, Heartbeat, HeartbeatAck, JoinRoom, LeaveRoom,
    ListTickets, LoginRequest, RegisterRequest, ServerNotice, TextMessage, UpdateTicket,
    now_millis,
};
use helpwire_core::{FrameCodec, MessageKind, Packet, WireError, schema};

use crate::context::ServerContext;

/// Accept connections forever, one handler task per connection.
pub async fn run(listener: TcpListener, ctx: Arc<ServerContext>) -> std::io::Result<()> {
    let mut next_conn_id: u64 = 0;
    loop {
        let (stream, peer) = listener.accept().await?;
        next_conn_id += 1;
        let conn_id = next_conn_id;
        info!(conn_id, %peer, "connection accepted");

        let ctx = Arc::clone(&ctx);
        tokio::spawn(async move {
            handle_connection(stream, conn_id, ctx).await;
            info!(conn_id, "connection closed");
        });
    }
}

async fn handle_connection(stream: TcpStream, conn_id: u64, ctx: Arc<ServerContext>) {
    let (mut sink, mut packets) = Framed::new(stream, FrameCodec).split();

    // All replies and room relays go through one outbound channel so
    // the sink has a single writer.
    let (tx, mut rx) = mpsc::unbounded_channel::<Packet>();
    let writer = tokio::spawn(async move {
        while let Some(packet) = rx.recv().await {
            if let Err(e) = sink.send(packet).await {
                warn!(error = %e, "outbound write failed");
                break;
            }
        }
    });

    while let Some(result) = packets.next().await {
        match result {
            Ok(packet) => dispatch(packet, conn_id, &ctx, &tx).await,
            Err(WireError::FramingCorrupted { declared, min }) => {
                // Stream alignment is lost; the only safe move is to
                // drop the connection.
                warn!(conn_id, declared, min, "framing corrupted; closing connection");
                break;
            }
            Err(e) => {
                warn!(conn_id, error = %e, "read failed; closing connection");
                break;
            }
        }
    }

    ctx.rooms.lock().await.leave_all(conn_id);
    drop(tx);
    let _ = writer.await;
}

/// Validate and answer one inbound packet. Invalid traffic is
/// answered with an error report and otherwise ignored.
async fn dispatch(
    packet: Packet,
    conn_id: u64,
    ctx: &ServerContext,
    tx: &mpsc::UnboundedSender<Packet>,
) {
    let (code, json, bin) = packet.into_parts();

    let kind = match MessageKind::try_from(code) {
        Ok(kind) => kind,
        Err(e) => {
            warn!(conn_id, code, "unknown message kind");
            reply(tx, ErrorReport::new(400, e.to_string()).into_packet());
            return;
        }
    };
    if let Err(e) = schema::validate(kind, &json) {
        warn!(conn_id, %kind, error = %e, "invalid payload");
        reply(tx, ErrorReport::new(400, e.to_string()).into_packet());
        return;
    }

    match kind {
        MessageKind::Heartbeat => {
            if let Ok(hb) = Heartbeat::from_json(&json) {
                reply(tx, HeartbeatAck::echoing(&hb).into_packet());
            }
        }

        MessageKind::Login => {
            if let Ok(req) = LoginRequest::from_json(&json) {
                let session_id = format!("s-{conn_id}-{}", now_millis());
                info!(conn_id, user = %req.username, %session_id, "login");
                reply(
                    tx,
                    ServerNotice::new("login-ok")
                        .with_detail(session_id)
                        .into_packet(),
                );
            }
        }

        MessageKind::Register => {
            if let Ok(req) = RegisterRequest::from_json(&json) {
                info!(conn_id, user = %req.username, "register");
                reply(tx, ServerNotice::new("register-ok").into_packet());
            }
        }

        MessageKind::CreateTicket => {
            if let Ok(req) = CreateTicket::from_json(&json) {
                let id = ctx.tickets.lock().await.create(req);
                info!(conn_id, ticket_id = id, "ticket created");
                reply(
                    tx,
                    ServerNotice::new("ticket-created")
                        .with_detail(id.to_string())
                        .into_packet(),
                );
            }
        }

        MessageKind::UpdateTicket => {
            if let Ok(req) = UpdateTicket::from_json(&json) {
                let updated = ctx.tickets.lock().await.update(&req);
                if updated {
                    reply(
                        tx,
                        ServerNotice::new("ticket-updated")
                            .with_detail(req.ticket_id.to_string())
                            .into_packet(),
                    );
                } else {
                    reply(
                        tx,
                        ErrorReport::new(404, format!("no ticket {}", req.ticket_id))
                            .into_packet(),
                    );
                }
            }
        }

        MessageKind::ListTickets => {
            if let Ok(query) = ListTickets::from_json(&json) {
                let store = ctx.tickets.lock().await;
                let page = store.list(&query);
                let detail = format!(
                    "{} of {} tickets from offset {}",
                    page.len(),
                    store.len(),
                    query.offset
                );
                reply(
                    tx,
                    ServerNotice::new("tickets").with_detail(detail).into_packet(),
                );
            }
        }

        MessageKind::JoinRoom => {
            if let Ok(req) = JoinRoom::from_json(&json) {
                ctx.rooms.lock().await.join(&req.room_id, conn_id, tx.clone());
                info!(conn_id, room = %req.room_id, "joined room");
                reply(
                    tx,
                    ServerNotice::new("room-joined")
                        .with_detail(req.room_id)
                        .into_packet(),
                );
            }
        }

        MessageKind::LeaveRoom => {
            if let Ok(req) = LeaveRoom::from_json(&json) {
                ctx.rooms.lock().await.leave(&req.room_id, conn_id);
                reply(
                    tx,
                    ServerNotice::new("room-left")
                        .with_detail(req.room_id)
                        .into_packet(),
                );
            }
        }

        MessageKind::Text => {
            if let Ok(msg) = TextMessage::from_json(&json) {
                let room_id = msg.room_id.clone();
                if let Ok(relay) = Packet::new(code, json, bin) {
                    let reached = ctx.rooms.lock().await.broadcast(&room_id, conn_id, &relay);
                    debug!(conn_id, room = %room_id, reached, "text relayed");
                }
            }
        }

        MessageKind::Control => {
            if let Ok(ctl) = Control::from_json(&json) {
                info!(conn_id, action = %ctl.action, target = ?ctl.target, "control");
                reply(tx, ServerNotice::new("control-accepted").into_packet());
            }
        }

        MessageKind::DeviceData | MessageKind::VideoFrame | MessageKind::AudioFrame => {
            // Media sinks (storage, playback) live outside this
            // server; count and drop.
            debug!(conn_id, %kind, bin_bytes = bin.len(), "media payload received");
        }

        MessageKind::ServerEvent | MessageKind::HeartbeatAck | MessageKind::Error => {
            // Server-originated kinds arriving from a client.
            warn!(conn_id, %kind, "unexpected direction; ignoring");
        }
    }
}

fn reply(tx: &mpsc::UnboundedSender<Packet>, packet: Result<Packet, WireError>) {
    match packet {
        Ok(packet) => {
            let _ = tx.send(packet);
        }
        Err(e) => warn!(error = %e, "failed to build reply"),
    }
}
