// ============================
// codecollab-backend/src/gateway.rs
// ============================
//! Intent dispatch.
//!
//! The gateway turns one inbound intent into a room operation and the
//! deliveries it causes. Deliveries for a room are pushed into the hub while
//! that room is still locked, so each room's participants see its events in
//! the order the gateway applied them.
use crate::config::Limits;
use crate::error::AppError;
use crate::hub::ConnectionHub;
use crate::metrics::{
    INTENT_HANDLED, INTENT_REJECTED, MALFORMED_FRAME, WS_ACTIVE, WS_CONNECTION, WS_DISCONNECTION,
};
use crate::registry::RoomRegistry;
use crate::room::{Broadcast, CursorHint, IntoBroadcast, LeaveOutcome, Room, RoomError};
use crate::validation;
use codecollab_common::{ClientToServer, ConnectionId, ServerToClient};
use metrics::{counter, gauge};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

/// One event and the connections it was sent to
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub recipients: Vec<ConnectionId>,
    pub event: ServerToClient,
}

/// Binds participant intents to room operations
#[derive(Debug)]
pub struct SessionGateway {
    registry: Arc<RoomRegistry>,
    hub: Arc<ConnectionHub>,
    limits: Limits,
}

impl SessionGateway {
    pub fn new(registry: Arc<RoomRegistry>, hub: Arc<ConnectionHub>, limits: Limits) -> Self {
        Self {
            registry,
            hub,
            limits,
        }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub fn hub(&self) -> &ConnectionHub {
        &self.hub
    }

    /// Open a connection and hand back the queue its transport must drain
    pub fn connect(&self) -> (ConnectionId, UnboundedReceiver<ServerToClient>) {
        let (id, rx) = self.hub.register();
        counter!(WS_CONNECTION).increment(1);
        gauge!(WS_ACTIVE).increment(1.0);
        info!(connection = %id, "Connection opened");
        (id, rx)
    }

    /// Parse and handle one text frame
    pub fn handle_text(&self, origin: ConnectionId, text: &str) -> Vec<Delivery> {
        match serde_json::from_str::<ClientToServer>(text) {
            Ok(message) => self.handle(origin, message),
            Err(e) => {
                warn!(connection = %origin, "Malformed frame: {e}");
                counter!(MALFORMED_FRAME).increment(1);
                vec![self.reply(
                    origin,
                    ServerToClient::MalformedMessage {
                        err_msg: e.to_string(),
                    },
                )]
            },
        }
    }

    /// Apply one intent from `origin`
    pub fn handle(&self, origin: ConnectionId, message: ClientToServer) -> Vec<Delivery> {
        let kind = message.kind();
        if let Err(e) = validation::validate_client_message(&message, &self.limits) {
            return vec![self.reject(origin, kind, e.into())];
        }

        let room_id = message.room_id().to_string();
        debug!(connection = %origin, room = %room_id, kind, "Handling intent");

        match message {
            ClientToServer::JoinRoom { .. } => self.join(origin, &room_id),
            ClientToServer::CodeChange {
                code,
                language_id,
                file_path,
                ..
            } => self.in_room(origin, &room_id, kind, |room| {
                room.update_file(file_path.as_deref(), code, language_id)
            }),
            ClientToServer::LanguageChange { language_id, .. } => {
                self.in_room(origin, &room_id, kind, |room| {
                    Ok(room.change_language(language_id))
                })
            },
            ClientToServer::CreateFile {
                file_path, content, ..
            } => self.in_room(origin, &room_id, kind, |room| {
                room.create_file(&file_path, content)
            }),
            ClientToServer::CreateFolder { folder_path, .. } => {
                self.in_room(origin, &room_id, kind, |room| room.create_folder(&folder_path))
            },
            ClientToServer::DeleteFile { file_path, .. } => {
                self.in_room(origin, &room_id, kind, |room| Ok(room.delete_file(&file_path)))
            },
            ClientToServer::DeleteFolder { folder_path, .. } => {
                self.in_room(origin, &room_id, kind, |room| {
                    Ok(room.delete_folder(&folder_path))
                })
            },
            ClientToServer::SelectFile { file_path, .. } => {
                self.in_room(origin, &room_id, kind, |room| {
                    Ok(room.select_file(&origin, &file_path))
                })
            },
            ClientToServer::CursorPosition {
                position, user_id, ..
            } => self.in_room(origin, &room_id, kind, |_| {
                Ok(CursorHint {
                    position,
                    participant_id: user_id,
                })
            }),
        }
    }

    /// Remove `origin` from every room it is in.
    ///
    /// Safe to call more than once and for connections that never joined;
    /// both cases yield no deliveries.
    pub fn disconnect(&self, origin: ConnectionId) -> Vec<Delivery> {
        if self.hub.unregister(&origin) {
            counter!(WS_DISCONNECTION).increment(1);
            gauge!(WS_ACTIVE).decrement(1.0);
            info!(connection = %origin, "Connection closed");
        }

        let mut deliveries = Vec::new();
        for room_id in self.registry.rooms_of(&origin) {
            let delivery = self.registry.with_room_pruning(&room_id, |room| {
                match room.leave(&origin) {
                    LeaveOutcome::Remaining(membership) => {
                        let broadcast = membership.into_broadcast(room.id(), origin);
                        Some(self.broadcast(room, broadcast))
                    },
                    LeaveOutcome::Closed | LeaveOutcome::NotMember => None,
                }
            });
            deliveries.extend(delivery.flatten());
        }
        deliveries
    }

    fn join(&self, origin: ConnectionId, room_id: &str) -> Vec<Delivery> {
        let mut room = self.registry.get_or_create(room_id);
        let membership = room.join(origin);
        info!(
            connection = %origin,
            room = room_id,
            participants = membership.participants.len(),
            "Joined room"
        );

        let snapshot = room.snapshot().into_message(room.id());
        let reply = self.reply(origin, snapshot);
        let broadcast = membership.into_broadcast(room.id(), origin);
        let joined = self.broadcast(&room, broadcast);
        counter!(INTENT_HANDLED, "kind" => "join_room").increment(1);

        vec![reply, joined]
    }

    /// Run `op` on an existing room and fan its result out.
    ///
    /// An absent room is a silent no-op; only `join` creates rooms.
    fn in_room<T: IntoBroadcast>(
        &self,
        origin: ConnectionId,
        room_id: &str,
        kind: &'static str,
        op: impl FnOnce(&mut Room) -> Result<T, RoomError>,
    ) -> Vec<Delivery> {
        let outcome = self.registry.with_room(room_id, |room| {
            let result = op(room)?;
            let broadcast = result.into_broadcast(room.id(), origin);
            Ok::<_, RoomError>(self.broadcast(room, broadcast))
        });

        match outcome {
            Some(Ok(delivery)) => {
                counter!(INTENT_HANDLED, "kind" => kind).increment(1);
                vec![delivery]
            },
            Some(Err(e)) => vec![self.reject(origin, kind, AppError::Room(e))],
            None => {
                debug!(connection = %origin, room = room_id, kind, "Room does not exist, ignoring");
                Vec::new()
            },
        }
    }

    fn broadcast(&self, room: &Room, broadcast: Broadcast) -> Delivery {
        let recipients = broadcast.fan_out.recipients(room.participants());
        for recipient in &recipients {
            if !self.hub.send(recipient, broadcast.event.clone()) {
                debug!(room = %room.id(), connection = %recipient, "Recipient gone, dropping event");
            }
        }
        Delivery {
            recipients,
            event: broadcast.event,
        }
    }

    fn reply(&self, origin: ConnectionId, event: ServerToClient) -> Delivery {
        self.hub.send(&origin, event.clone());
        Delivery {
            recipients: vec![origin],
            event,
        }
    }

    fn reject(&self, origin: ConnectionId, kind: &'static str, error: AppError) -> Delivery {
        warn!(connection = %origin, kind, "Rejected intent: {error}");
        counter!(INTENT_REJECTED, "kind" => kind).increment(1);
        self.reply(origin, error.to_event())
    }
}
