//! Process-wide room directory.
//!
//! The registry maps room names to live rooms. It is constructed once by
//! the server and shared with every session; there is no global state.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::room::Room;

/// Name→room directory shared by all sessions.
///
/// Rooms are created lazily on first lookup and never removed, even once
/// empty: `get_or_create` must keep returning the same room for the
/// lifetime of the process. Entries therefore accumulate for as long as
/// distinct names keep arriving; this is a deliberate property of the
/// design, not leak cleanup left undone.
#[derive(Debug, Default)]
pub struct Registry {
    /// Rooms indexed by name.
    rooms: DashMap<String, Arc<Room>>,
}

impl Registry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the room for `name`, creating it on first reference.
    ///
    /// Idempotent: repeated calls with the same name yield the same room
    /// instance.
    #[must_use]
    pub fn get_or_create(&self, name: &str) -> Arc<Room> {
        let entry = self.rooms.entry(name.to_owned()).or_insert_with(|| {
            debug!(room = %name, "Creating new room");
            Arc::new(Room::new(name))
        });
        Arc::clone(entry.value())
    }

    /// Check if a room exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.rooms.contains_key(name)
    }

    /// Get the number of rooms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Check if the registry has no rooms.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Get all room names.
    #[must_use]
    pub fn room_names(&self) -> Vec<String> {
        self.rooms.iter().map(|e| e.key().clone()).collect()
    }

    /// Get registry statistics.
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            room_count: self.rooms.len(),
            member_count: self.rooms.iter().map(|e| e.value().member_count()).sum(),
        }
    }
}

/// Registry statistics.
#[derive(Debug, Clone)]
pub struct RegistryStats {
    /// Number of rooms ever referenced.
    pub room_count: usize,
    /// Total members across all rooms.
    pub member_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_returns_same_instance() {
        let registry = Registry::new();

        let first = registry.get_or_create("lobby");
        for _ in 0..10 {
            assert!(Arc::ptr_eq(&first, &registry.get_or_create("lobby")));
        }
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_distinct_names_get_distinct_rooms() {
        let registry = Registry::new();

        let lobby = registry.get_or_create("lobby");
        let other = registry.get_or_create("other");
        assert!(!Arc::ptr_eq(&lobby, &other));
        assert_eq!(lobby.name(), "lobby");
        assert_eq!(other.name(), "other");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_empty_rooms_are_never_evicted() {
        let registry = Registry::new();

        let room = registry.get_or_create("lobby");
        assert!(room.is_empty());
        assert!(registry.contains("lobby"));
        assert!(Arc::ptr_eq(&room, &registry.get_or_create("lobby")));
    }

    #[test]
    fn test_stats() {
        let registry = Registry::new();
        registry.get_or_create("a");
        registry.get_or_create("b");

        let stats = registry.stats();
        assert_eq!(stats.room_count, 2);
        assert_eq!(stats.member_count, 0);
    }
}
