// ============================
// codecollab-backend/src/hub.rs
// ============================
//! Per-connection outbound queues.
//!
//! Sends never block: each connection owns an unbounded queue drained by its
//! socket task, so a room can enqueue while its lock is held and every
//! participant observes that room's events in one order.
use codecollab_common::{ConnectionId, ServerToClient};
use dashmap::DashMap;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::trace;
use uuid::Uuid;

/// Registry of live connections and their outbound queues
#[derive(Debug, Default)]
pub struct ConnectionHub {
    senders: DashMap<ConnectionId, UnboundedSender<ServerToClient>>,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh connection id and its outbound queue
    pub fn register(&self) -> (ConnectionId, UnboundedReceiver<ServerToClient>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        self.senders.insert(id, tx);
        (id, rx)
    }

    /// Drop the queue of `connection`. Returns `false` if it was already gone.
    pub fn unregister(&self, connection: &ConnectionId) -> bool {
        self.senders.remove(connection).is_some()
    }

    /// Enqueue `event` for `connection`.
    ///
    /// Returns `false` when the connection is unknown or its receiver is
    /// closed; the event is dropped in both cases.
    pub fn send(&self, connection: &ConnectionId, event: ServerToClient) -> bool {
        let Some(sender) = self.senders.get(connection) else {
            trace!(%connection, "send to unknown connection");
            return false;
        };
        sender.send(event).is_ok()
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}
