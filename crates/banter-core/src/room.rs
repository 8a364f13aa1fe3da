//! Room abstraction for banter.
//!
//! A room is a named broadcast domain: every member receives every event
//! fanned out to the room. Membership is keyed by session identity, not by
//! display name, so two members may share a name.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use banter_protocol::{codec, ServerFrame};
use tracing::{debug, error};

use crate::session::Session;

/// A named broadcast domain holding a live member set.
///
/// The member list preserves insertion order: the roster reported by
/// `/members` is the join order. All membership operations and fan-out
/// iteration take the same lock, so join, leave, and broadcast are
/// mutually exclusive on a single room.
#[derive(Debug)]
pub struct Room {
    /// Room name, unique key in the registry.
    name: String,
    /// Current members, in join order.
    members: Mutex<Vec<Arc<Session>>>,
}

impl Room {
    /// Create a new empty room. Rooms are only created by the registry,
    /// on first lookup of a name.
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Mutex::new(Vec::new()),
        }
    }

    /// Get the room name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the number of current members.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.lock_members().len()
    }

    /// Check if the room has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock_members().is_empty()
    }

    /// Add a session to the member set.
    ///
    /// Joining a room the session is already in is a no-op: membership is
    /// deduplicated by session identity.
    pub fn join(&self, session: &Arc<Session>) {
        let mut members = self.lock_members();
        if members.iter().any(|m| m.id() == session.id()) {
            return;
        }
        members.push(Arc::clone(session));
        debug!(room = %self.name, session = %session.id(), members = members.len(), "Member joined");
    }

    /// Remove a session from the member set.
    ///
    /// Removing an absent session is a no-op. Returns `true` if the
    /// session was a member.
    pub fn leave(&self, session: &Session) -> bool {
        let mut members = self.lock_members();
        let before = members.len();
        members.retain(|m| m.id() != session.id());
        let removed = members.len() != before;
        if removed {
            debug!(room = %self.name, session = %session.id(), members = members.len(), "Member left");
        }
        removed
    }

    /// Fan a frame out to every current member.
    ///
    /// The frame is encoded once and handed to each member's delivery
    /// callback. A failing callback only loses the frame for that
    /// recipient; delivery to the others proceeds. Returns the number of
    /// members actually reached. No cross-member ordering is promised.
    pub fn broadcast(&self, frame: &ServerFrame) -> usize {
        let encoded = match codec::encode(frame) {
            Ok(encoded) => encoded,
            Err(err) => {
                error!(room = %self.name, error = %err, "Dropping unencodable frame");
                return 0;
            }
        };

        let members = self.lock_members();
        let mut delivered = 0;
        for member in members.iter() {
            if member.try_deliver(&encoded) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Snapshot the display names of all current members, in join order.
    /// A member that never completed a join reports an empty name.
    #[must_use]
    pub fn roster(&self) -> Vec<String> {
        self.lock_members()
            .iter()
            .map(|m| m.name().unwrap_or_default().to_owned())
            .collect()
    }

    /// Find the first member (in join order) with the given display name.
    #[must_use]
    pub fn find_member(&self, name: &str) -> Option<Arc<Session>> {
        self.lock_members()
            .iter()
            .find(|m| m.name() == Some(name))
            .cloned()
    }

    /// Membership operations never panic while the lock is held, so a
    /// poisoned lock still guards a consistent list.
    fn lock_members(&self) -> MutexGuard<'_, Vec<Arc<Session>>> {
        self.members.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
