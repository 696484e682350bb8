// realtime/hub.rs
use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
};

use serde::Serialize;
use tokio::sync::{mpsc::UnboundedSender, RwLock};
use uuid::Uuid;

use crate::models::usermodel::UserRole;

pub type ConnId = u64;

/// What the socket writer is asked to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Frame(String),
    /// Send a close frame with this reason and stop writing.
    Close(String),
}

#[derive(Debug)]
struct Connection {
    session_id: Uuid,
    sender: UnboundedSender<Outbound>,
}

#[derive(Debug)]
struct UserRoom {
    role: UserRole,
    connections: HashMap<ConnId, Connection>,
}

/// In-process registry of open sockets, one room per user.
///
/// Emits are fire-and-forget: a closed receiver is pruned, never reported.
#[derive(Debug, Default)]
pub struct RealtimeHub {
    rooms: RwLock<HashMap<Uuid, UserRoom>>,
    next_id: AtomicU64,
}

/// `{event, data}` frame as sent to clients.
pub fn frame<T: Serialize>(event: &str, data: &T) -> Option<String> {
    match serde_json::to_value(data) {
        Ok(data) => Some(serde_json::json!({ "event": event, "data": data }).to_string()),
        Err(e) => {
            tracing::warn!("Dropping {} event, payload did not serialize: {}", event, e);
            None
        }
    }
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection. The flag is `true` when it is the user's first.
    pub async fn connect(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        role: UserRole,
        sender: UnboundedSender<Outbound>,
    ) -> (ConnId, bool) {
        let conn_id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut rooms = self.rooms.write().await;

        let room = rooms.entry(user_id).or_insert_with(|| UserRoom {
            role,
            connections: HashMap::new(),
        });
        room.role = role;
        let first = room.connections.is_empty();
        room.connections.insert(conn_id, Connection { session_id, sender });

        (conn_id, first)
    }

    /// Removes a connection. The flag is `true` when it was the user's last.
    pub async fn disconnect(&self, user_id: Uuid, conn_id: ConnId) -> bool {
        let mut rooms = self.rooms.write().await;

        let Some(room) = rooms.get_mut(&user_id) else {
            return false;
        };
        if room.connections.remove(&conn_id).is_none() {
            return false;
        }
        if room.connections.is_empty() {
            rooms.remove(&user_id);
            return true;
        }
        false
    }

    pub async fn emit_to_user<T: Serialize>(&self, user_id: Uuid, event: &str, data: &T) -> usize {
        let Some(payload) = frame(event, data) else {
            return 0;
        };
        self.deliver(&payload, |id, _| *id == user_id).await
    }

    pub async fn emit_to_staff<T: Serialize>(&self, event: &str, data: &T) -> usize {
        let Some(payload) = frame(event, data) else {
            return 0;
        };
        self.deliver(&payload, |_, room| room.role.is_staff()).await
    }

    pub async fn broadcast<T: Serialize>(&self, event: &str, data: &T) -> usize {
        let Some(payload) = frame(event, data) else {
            return 0;
        };
        self.deliver(&payload, |_, _| true).await
    }

    /// Asks every socket of the user to close. The sockets unregister
    /// themselves as they shut down.
    pub async fn close_user(&self, user_id: Uuid, reason: &str) -> usize {
        self.close_where(user_id, reason, |_| true).await
    }

    /// Closes only the sockets opened under one session.
    pub async fn close_session(&self, user_id: Uuid, session_id: Uuid, reason: &str) -> usize {
        self.close_where(user_id, reason, |conn| conn.session_id == session_id)
            .await
    }

    async fn close_where<F>(&self, user_id: Uuid, reason: &str, select: F) -> usize
    where
        F: Fn(&Connection) -> bool,
    {
        let rooms = self.rooms.read().await;
        let Some(room) = rooms.get(&user_id) else {
            return 0;
        };

        let closed = room
            .connections
            .values()
            .filter(|conn| select(*conn))
            .filter(|conn| conn.sender.send(Outbound::Close(reason.to_string())).is_ok())
            .count();
        if closed > 0 {
            tracing::info!("Closing {} socket(s) of user {}: {}", closed, user_id, reason);
        }
        closed
    }

    pub async fn online_users(&self) -> Vec<Uuid> {
        self.rooms.read().await.keys().copied().collect()
    }

    pub async fn is_online(&self, user_id: Uuid) -> bool {
        self.rooms.read().await.contains_key(&user_id)
    }

    async fn deliver<F>(&self, payload: &str, select: F) -> usize
    where
        F: Fn(&Uuid, &UserRoom) -> bool,
    {
        let mut rooms = self.rooms.write().await;
        let mut delivered = 0;

        for (user_id, room) in rooms.iter_mut().filter(|(id, room)| select(id, room)) {
            room.connections.retain(|conn_id, conn| {
                if conn.sender.send(Outbound::Frame(payload.to_string())).is_ok() {
                    delivered += 1;
                    true
                } else {
                    tracing::debug!("Pruning closed connection {} of user {}", conn_id, user_id);
                    false
                }
            });
        }
        rooms.retain(|_, room| !room.connections.is_empty());

        delivered
    }
}
