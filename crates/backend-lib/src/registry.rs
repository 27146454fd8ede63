// ============================
// codecollab-backend/src/registry.rs
// ============================
//! Room management.
//!
//! Rooms live in a sharded map keyed by room id. A room is created by the
//! first join and dropped in the same critical section that removes its last
//! participant, so no room is ever observable with zero participants.
use crate::metrics::{ROOM_ACTIVE, ROOM_CLOSED, ROOM_CREATED};
use crate::room::{Room, RoomSeed};
use codecollab_common::{ConnectionId, RoomId};
use dashmap::mapref::entry::Entry;
use dashmap::mapref::one::{Ref, RefMut};
use dashmap::DashMap;
use metrics::{counter, gauge};
use serde::Serialize;
use tracing::info;

/// Manager for all live rooms
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: DashMap<RoomId, Room>,
    seed: RoomSeed,
}

/// Public summary of one room
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub room_id: RoomId,
    pub participants: usize,
    pub language_id: String,
    pub current_file: Option<String>,
    pub file_count: usize,
}

impl RoomSummary {
    fn of(room: &Room) -> Self {
        Self {
            room_id: room.id().clone(),
            participants: room.participants().len(),
            language_id: room.language().to_string(),
            current_file: room.selected_file().map(str::to_string),
            file_count: room.tree().file_paths().len(),
        }
    }
}

impl RoomRegistry {
    /// Create a registry whose new rooms start from `seed`
    pub fn new(seed: RoomSeed) -> Self {
        Self {
            rooms: DashMap::new(),
            seed,
        }
    }

    /// Lock the room, creating it from the seed if absent.
    ///
    /// The guard holds the room's shard; do not call back into the registry
    /// while it is alive.
    pub fn get_or_create(&self, room_id: &str) -> RefMut<'_, RoomId, Room> {
        match self.rooms.entry(room_id.to_string()) {
            Entry::Occupied(entry) => entry.into_ref(),
            Entry::Vacant(entry) => {
                info!(room = room_id, "Creating room");
                counter!(ROOM_CREATED).increment(1);
                gauge!(ROOM_ACTIVE).increment(1.0);
                entry.insert(Room::new(room_id.to_string(), &self.seed))
            },
        }
    }

    /// Run `f` on an existing room. `None` when the room does not exist.
    pub fn with_room<R>(&self, room_id: &str, f: impl FnOnce(&mut Room) -> R) -> Option<R> {
        self.rooms.get_mut(room_id).map(|mut room| f(&mut room))
    }

    /// Run `f` on an existing room and drop the room if `f` left it empty.
    ///
    /// Removal happens under the same lock as `f`, so no other intent can
    /// reach the room in between.
    pub fn with_room_pruning<R>(
        &self,
        room_id: &str,
        f: impl FnOnce(&mut Room) -> R,
    ) -> Option<R> {
        let mut result = None;
        let removed = self.rooms.remove_if_mut(room_id, |_, room| {
            result = Some(f(room));
            room.is_empty()
        });

        if removed.is_some() {
            info!(room = room_id, "Closing empty room");
            counter!(ROOM_CLOSED).increment(1);
            gauge!(ROOM_ACTIVE).decrement(1.0);
        }
        result
    }

    /// Ids of every room `connection` participates in
    pub fn rooms_of(&self, connection: &ConnectionId) -> Vec<RoomId> {
        self.rooms
            .iter()
            .filter(|entry| entry.value().has_participant(connection))
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Read-only access to a room
    pub fn get(&self, room_id: &str) -> Option<Ref<'_, RoomId, Room>> {
        self.rooms.get(room_id)
    }

    pub fn summary(&self, room_id: &str) -> Option<RoomSummary> {
        self.rooms.get(room_id).map(|room| RoomSummary::of(&room))
    }

    /// Drop a room outright. Removing an absent room is a no-op.
    pub fn remove(&self, room_id: &str) -> bool {
        let removed = self.rooms.remove(room_id).is_some();
        if removed {
            counter!(ROOM_CLOSED).increment(1);
            gauge!(ROOM_ACTIVE).decrement(1.0);
        }
        removed
    }

    pub fn contains(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::LeaveOutcome;
    use std::sync::Arc;
    use uuid::Uuid;

    fn registry() -> RoomRegistry {
        RoomRegistry::new(RoomSeed::default())
    }

    fn leave(registry: &RoomRegistry, room_id: &str, id: &ConnectionId) -> Option<LeaveOutcome> {
        registry.with_room_pruning(room_id, |room| room.leave(id))
    }

    #[test]
    fn test_get_or_create_seeds_once() {
        let registry = registry();
        let a = Uuid::new_v4();

        registry.get_or_create("r1").join(a);
        registry
            .with_room("r1", |room| room.create_file("extra.txt", None))
            .unwrap()
            .unwrap();

        // Second lookup sees the same room, not a fresh seed
        let room = registry.get_or_create("r1");
        assert!(room.tree().is_file("extra.txt"));
        assert_eq!(room.participants(), &[a]);
        drop(room);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_with_room_on_absent_room_is_none() {
        let registry = registry();
        assert!(registry.with_room("ghost", |room| room.change_language("go".to_string())).is_none());
        assert!(!registry.contains("ghost"));
    }

    #[test]
    fn test_last_leave_removes_room() {
        let registry = registry();
        let members: Vec<ConnectionId> = (0..4).map(|_| Uuid::new_v4()).collect();
        for id in &members {
            registry.get_or_create("r1").join(*id);
        }

        for id in &members[..3] {
            assert!(matches!(
                leave(&registry, "r1", id),
                Some(LeaveOutcome::Remaining(_))
            ));
            assert!(registry.contains("r1"));
        }

        assert_eq!(leave(&registry, "r1", &members[3]), Some(LeaveOutcome::Closed));
        assert!(!registry.contains("r1"));
        assert_eq!(leave(&registry, "r1", &members[3]), None);
    }

    #[test]
    fn test_leave_by_non_member_keeps_room() {
        let registry = registry();
        registry.get_or_create("r1").join(Uuid::new_v4());

        assert_eq!(
            leave(&registry, "r1", &Uuid::new_v4()),
            Some(LeaveOutcome::NotMember)
        );
        assert!(registry.contains("r1"));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let registry = registry();
        registry.get_or_create("r1").join(Uuid::new_v4());

        assert!(registry.remove("r1"));
        assert!(!registry.remove("r1"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_pruning_keeps_non_empty_room() {
        let registry = registry();
        registry.get_or_create("r1").join(Uuid::new_v4());

        let language = registry.with_room_pruning("r1", |room| {
            room.change_language("go".to_string());
            room.language().to_string()
        });
        assert_eq!(language.as_deref(), Some("go"));
        assert!(registry.contains("r1"));
        assert!(registry.with_room_pruning("ghost", |room| room.is_empty()).is_none());
    }

    #[test]
    fn test_rooms_of() {
        let registry = registry();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        registry.get_or_create("r1").join(a);
        registry.get_or_create("r2").join(a);
        registry.get_or_create("r3").join(b);

        let mut rooms = registry.rooms_of(&a);
        rooms.sort();
        assert_eq!(rooms, vec!["r1", "r2"]);
        assert!(registry.rooms_of(&Uuid::new_v4()).is_empty());
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_summary() {
        let registry = registry();
        registry.get_or_create("r1").join(Uuid::new_v4());

        let summary = registry.summary("r1").unwrap();
        assert_eq!(summary.participants, 1);
        assert_eq!(summary.language_id, "javascript");
        assert_eq!(summary.current_file.as_deref(), Some("main.js"));
        assert_eq!(summary.file_count, 3);
        assert!(registry.summary("nope").is_none());
    }

    #[tokio::test]
    async fn test_concurrent_first_joins_create_one_room() {
        let registry = Arc::new(registry());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                let id = Uuid::new_v4();
                registry.get_or_create("shared").join(id);
                id
            }));
        }

        let mut joined = Vec::new();
        for handle in handles {
            joined.push(handle.await.unwrap());
        }

        assert_eq!(registry.len(), 1);
        let room = registry.get("shared").unwrap();
        assert_eq!(room.participants().len(), 16);
        for id in &joined {
            assert!(room.has_participant(id));
        }
    }
}
