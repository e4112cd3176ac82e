//! Shared server state, passed explicitly to every handler.
//!
//! Built once at the composition root in `main` — there are no
//! global singletons. Each registry sits behind its own lock.

use std::collections::HashMap;

use tokio::sync::{Mutex, mpsc};

use helpwire_core::Packet;
use helpwire_core::catalog::{CreateTicket, ListTickets, UpdateTicket};

// ── Tickets ──────────────────────────────────────────────────────

/// A stored ticket. In-memory only: durable persistence lives
/// outside this server.
#[derive(Debug, Clone)]
pub struct Ticket {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub priority: u64,
    pub status: String,
}

/// Sequential in-memory ticket store.
#[derive(Debug, Default)]
pub struct TicketStore {
    next_id: u64,
    tickets: Vec<Ticket>,
}

impl TicketStore {
    /// Store a new ticket and return its id.
    pub fn create(&mut self, req: CreateTicket) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.tickets.push(Ticket {
            id,
            title: req.title,
            description: req.description,
            priority: req.priority,
            status: "open".into(),
        });
        id
    }

    /// Apply the set fields of an update. Returns `false` when the
    /// ticket does not exist.
    pub fn update(&mut self, req: &UpdateTicket) -> bool {
        let Some(ticket) = self.tickets.iter_mut().find(|t| t.id == req.ticket_id) else {
            return false;
        };
        if let Some(title) = &req.title {
            ticket.title = title.clone();
        }
        if let Some(description) = &req.description {
            ticket.description = description.clone();
        }
        if let Some(priority) = req.priority {
            ticket.priority = priority;
        }
        if let Some(status) = &req.status {
            ticket.status = status.clone();
        }
        true
    }

    /// Page through tickets, optionally filtered by status.
    pub fn list(&self, query: &ListTickets) -> Vec<Ticket> {
        self.tickets
            .iter()
            .filter(|t| query.status.as_deref().is_none_or(|s| t.status == s))
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }
}

// ── Rooms ────────────────────────────────────────────────────────

/// Maps room ids to the outbound channels of their members.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<String, HashMap<u64, mpsc::UnboundedSender<Packet>>>,
}

impl RoomRegistry {
    pub fn join(&mut self, room_id: &str, conn_id: u64, tx: mpsc::UnboundedSender<Packet>) {
        self.rooms
            .entry(room_id.to_owned())
            .or_default()
            .insert(conn_id, tx);
    }

    pub fn leave(&mut self, room_id: &str, conn_id: u64) {
        if let Some(members) = self.rooms.get_mut(room_id) {
            members.remove(&conn_id);
            if members.is_empty() {
                self.rooms.remove(room_id);
            }
        }
    }

    /// Drop a connection from every room (used on disconnect).
    pub fn leave_all(&mut self, conn_id: u64) {
        self.rooms.retain(|_, members| {
            members.remove(&conn_id);
            !members.is_empty()
        });
    }

    /// Relay a packet to every member of a room except the sender.
    /// Returns the number of members reached.
    pub fn broadcast(&self, room_id: &str, sender_conn_id: u64, packet: &Packet) -> usize {
        let Some(members) = self.rooms.get(room_id) else {
            return 0;
        };
        members
            .iter()
            .filter(|(id, _)| **id != sender_conn_id)
            .filter(|(_, tx)| tx.send(packet.clone()).is_ok())
            .count()
    }
}

// ── Context ──────────────────────────────────────────────────────

/// Everything the connection handlers share.
#[derive(Debug, Default)]
pub struct ServerContext {
    pub tickets: Mutex<TicketStore>,
    pub rooms: Mutex<RoomRegistry>,
}

// ── Tests ────────────────────────────────────────────────────────
