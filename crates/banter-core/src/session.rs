//! Per-connection session state and protocol dispatch.
//!
//! A session owns one client's identity and room membership. The transport
//! hands it raw inbound text frames and a delivery callback; the session
//! decodes frames, drives its room, and encodes outbound events.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use banter_protocol::{codec, ClientFrame, ProtocolError, ServerFrame};
use tracing::{debug, error, trace};

use crate::command::{Command, JOKE_LINE};
use crate::deliver::Deliver;
use crate::room::Room;

/// Counter backing [`SessionId`] generation.
static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique session identifier.
///
/// Room membership is keyed by this, never by display name, so two
/// sessions sharing a name stay distinct members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    fn next() -> Self {
        Self(SESSION_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sess-{}", self.0)
    }
}

/// Server-side state for one client connection.
///
/// A session starts unjoined (no display name) and becomes joined when the
/// client's `join` frame is processed; the display name is immutable from
/// then on. The room is resolved once, at construction, and never changes
/// for the lifetime of the connection.
pub struct Session {
    /// Unique identity for room membership.
    id: SessionId,
    /// Display name; unset until a join is processed, then immutable.
    name: OnceLock<String>,
    /// The room this connection is bound to. Back-reference only: the
    /// registry owns room lifetimes.
    room: Arc<Room>,
    /// Transport delivery callback for this connection.
    outbox: Box<dyn Deliver>,
    /// Handle to self, for registering with the room on join.
    weak_self: Weak<Session>,
}

impl Session {
    /// Create a session bound to `room`, delivering through `outbox`.
    ///
    /// The session is not yet a room member; membership starts with the
    /// client's `join` frame.
    #[must_use]
    pub fn new(room: Arc<Room>, outbox: impl Deliver + 'static) -> Arc<Self> {
        let session = Arc::new_cyclic(|weak| Self {
            id: SessionId::next(),
            name: OnceLock::new(),
            room,
            outbox: Box::new(outbox),
            weak_self: weak.clone(),
        });
        debug!(session = %session.id, room = %session.room.name(), "Session created");
        session
    }

    /// Get the session's unique identifier.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Get the display name, if a join has been processed.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.get().map(String::as_str)
    }

    /// Get the room this session is bound to.
    #[must_use]
    pub fn room(&self) -> &Arc<Room> {
        &self.room
    }

    /// Name used for message attribution: empty until joined.
    fn display_name(&self) -> &str {
        self.name().unwrap_or_default()
    }

    /// Decode and dispatch one inbound frame.
    ///
    /// Frames from one connection are handled to completion in arrival
    /// order; the transport must not overlap calls for the same session.
    ///
    /// # Errors
    ///
    /// Propagates [`ProtocolError`] for malformed payloads and
    /// unrecognized `type` values. The error is not handled here; the
    /// transport shell decides whether to close the connection.
    pub fn handle_incoming(&self, raw: &str) -> Result<(), ProtocolError> {
        match codec::decode(raw)? {
            ClientFrame::Join { name } => self.handle_join(name),
            ClientFrame::Chat { text } => {
                if text.starts_with('/') {
                    self.handle_command(&text);
                } else {
                    self.handle_chat(&text);
                }
            }
        }
        Ok(())
    }

    /// Join the room and announce it, including to self.
    fn handle_join(&self, name: String) {
        // First join wins; a repeated join keeps the original name.
        let _ = self.name.set(name);

        if let Some(me) = self.weak_self.upgrade() {
            self.room.join(&me);
        }
        let note = format!("{} joined \"{}\".", self.display_name(), self.room.name());
        self.room.broadcast(&ServerFrame::note(note));
    }

    /// Broadcast a chat line to the room, including the sender.
    fn handle_chat(&self, text: &str) {
        let delivered = self
            .room
            .broadcast(&ServerFrame::chat(self.display_name(), text));
        trace!(session = %self.id, recipients = delivered, "Chat broadcast");
    }

    /// Interpret a slash-prefixed chat line.
    fn handle_command(&self, text: &str) {
        match Command::parse(text) {
            Command::Joke => self.send(&ServerFrame::server_chat(JOKE_LINE)),
            Command::Members => {
                let roster = self.room.roster().join(", ");
                self.send(&ServerFrame::server_chat(format!("In this room: {roster}")));
            }
            Command::Priv { to, text } => self.handle_priv(to, text),
            Command::Unknown => {
                trace!(session = %self.id, "Ignoring unrecognized command");
            }
        }
    }

    /// Deliver a private message to the first member matching `to`, and
    /// echo it to the sender. No other member sees it. A lookup miss is a
    /// normal response path, not an error, and sends nothing private.
    fn handle_priv(&self, to: &str, text: &str) {
        match self.room.find_member(to) {
            Some(receiver) => {
                let frame = ServerFrame::priv_msg(self.display_name(), text);
                self.send(&frame);
                receiver.send(&frame);
            }
            None => {
                self.send(&ServerFrame::server_chat(format!("User {to} not found!")));
            }
        }
    }

    /// Deliver a frame to this session alone.
    ///
    /// Fire and forget: a failed delivery is discarded, the caller never
    /// observes it.
    pub fn send(&self, frame: &ServerFrame) {
        match codec::encode(frame) {
            Ok(encoded) => {
                self.try_deliver(&encoded);
            }
            Err(err) => {
                error!(session = %self.id, error = %err, "Dropping unencodable frame");
            }
        }
    }

    /// Hand an encoded frame to the transport callback, swallowing
    /// failure. Returns `false` when the peer is gone.
    pub(crate) fn try_deliver(&self, encoded: &str) -> bool {
        match self.outbox.deliver(encoded) {
            Ok(()) => true,
            Err(_) => {
                debug!(session = %self.id, "Delivery failed, peer gone");
                false
            }
        }
    }

    /// Connection teardown hook: leave the room and announce departure.
    ///
    /// Safe to call for a session that never joined; the announcement then
    /// carries an empty name.
    pub fn handle_close(&self) {
        self.room.leave(self);
        let note = format!("{} left {}.", self.display_name(), self.room.name());
        self.room.broadcast(&ServerFrame::note(note));
        debug!(session = %self.id, room = %self.room.name(), "Session closed");
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("name", &self.name.get())
            .field("room", &self.room.name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deliver::DeliveryFailure;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingOutbox {
        frames: Mutex<Vec<String>>,
    }

    impl RecordingOutbox {
        fn frames(&self) -> Vec<ServerFrame> {
            self.frames
                .lock()
                .unwrap()
                .iter()
                .map(|raw| serde_json::from_str(raw).unwrap())
                .collect()
        }

        fn clear(&self) {
            self.frames.lock().unwrap().clear();
        }
    }

    impl Deliver for RecordingOutbox {
        fn deliver(&self, frame: &str) -> Result<(), DeliveryFailure> {
            self.frames.lock().unwrap().push(frame.to_owned());
            Ok(())
        }
    }

    struct FailingOutbox;

    impl Deliver for FailingOutbox {
        fn deliver(&self, _frame: &str) -> Result<(), DeliveryFailure> {
            Err(DeliveryFailure)
        }
    }

    /// Join `name` into `room` through the real protocol path.
    fn joined(room: &Arc<Room>, name: &str) -> (Arc<Session>, Arc<RecordingOutbox>) {
        let outbox = Arc::new(RecordingOutbox::default());
        let session = Session::new(Arc::clone(room), Arc::clone(&outbox));
        session
            .handle_incoming(&format!(r#"{{"type":"join","name":"{name}"}}"#))
            .unwrap();
        (session, outbox)
    }

    /// Discard setup traffic (join notes) so tests assert only on the
    /// frames they provoke.
    fn reset(outboxes: &[&Arc<RecordingOutbox>]) {
        for outbox in outboxes {
            outbox.clear();
        }
    }

    fn test_room(name: &str) -> Arc<Room> {
        Arc::new(Room::new(name))
    }

    #[test]
    fn test_join_announces_to_room_including_self() {
        let room = test_room("lobby");
        let (_alice, alice_out) = joined(&room, "alice");
        reset(&[&alice_out]);

        let bob_out = Arc::new(RecordingOutbox::default());
        let bob = Session::new(Arc::clone(&room), Arc::clone(&bob_out));
        bob.handle_incoming(r#"{"type":"join","name":"bob"}"#)
            .unwrap();

        let expected = ServerFrame::note("bob joined \"lobby\".");
        assert_eq!(alice_out.frames(), vec![expected.clone()]);
        assert_eq!(bob_out.frames(), vec![expected]);
        assert_eq!(bob.name(), Some("bob"));
    }

    #[test]
    fn test_chat_broadcasts_including_self() {
        let room = test_room("lobby");
        let (alice, alice_out) = joined(&room, "alice");
        let (_bob, bob_out) = joined(&room, "bob");
        reset(&[&alice_out, &bob_out]);

        alice
            .handle_incoming(r#"{"type":"chat","text":"hello"}"#)
            .unwrap();

        let expected = ServerFrame::chat("alice", "hello");
        assert_eq!(alice_out.frames(), vec![expected.clone()]);
        assert_eq!(bob_out.frames(), vec![expected]);
    }

    #[test]
    fn test_bogus_type_propagates_protocol_error() {
        let room = test_room("lobby");
        let (alice, alice_out) = joined(&room, "alice");
        reset(&[&alice_out]);

        let err = alice
            .handle_incoming(r#"{"type":"bogus"}"#)
            .unwrap_err();
        assert_eq!(err.to_string(), "bad message: bogus");
        assert!(alice_out.frames().is_empty());
    }

    #[test]
    fn test_malformed_payload_propagates_protocol_error() {
        let room = test_room("lobby");
        let (alice, _) = joined(&room, "alice");

        assert!(matches!(
            alice.handle_incoming("not json"),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn test_joke_goes_to_requester_only() {
        let room = test_room("lobby");
        let (alice, alice_out) = joined(&room, "alice");
        let (_bob, bob_out) = joined(&room, "bob");
        reset(&[&alice_out, &bob_out]);

        alice
            .handle_incoming(r#"{"type":"chat","text":"/joke"}"#)
            .unwrap();

        assert_eq!(
            alice_out.frames(),
            vec![ServerFrame::server_chat(JOKE_LINE)]
        );
        assert!(bob_out.frames().is_empty());
    }

    #[test]
    fn test_members_reports_roster_in_join_order() {
        let room = test_room("lobby");
        let (alice, alice_out) = joined(&room, "alice");
        let (_bob, bob_out) = joined(&room, "bob");
        reset(&[&alice_out, &bob_out]);

        alice
            .handle_incoming(r#"{"type":"chat","text":"/members"}"#)
            .unwrap();

        assert_eq!(
            alice_out.frames(),
            vec![ServerFrame::server_chat("In this room: alice, bob")]
        );
        assert!(bob_out.frames().is_empty());
    }

    #[test]
    fn test_double_join_keeps_one_roster_entry_and_first_name() {
        let room = test_room("lobby");
        let (alice, alice_out) = joined(&room, "alice");

        // Repeat join: membership stays deduplicated, name is immutable.
        alice
            .handle_incoming(r#"{"type":"join","name":"impostor"}"#)
            .unwrap();
        alice_out.clear();
        alice
            .handle_incoming(r#"{"type":"chat","text":"/members"}"#)
            .unwrap();

        assert_eq!(
            alice_out.frames(),
            vec![ServerFrame::server_chat("In this room: alice")]
        );
        assert_eq!(alice.name(), Some("alice"));
    }

    #[test]
    fn test_priv_reaches_sender_and_target_only() {
        let room = test_room("lobby");
        let (alice, alice_out) = joined(&room, "alice");
        let (_bob, bob_out) = joined(&room, "bob");
        let (_carol, carol_out) = joined(&room, "carol");
        reset(&[&alice_out, &bob_out, &carol_out]);

        alice
            .handle_incoming(r#"{"type":"chat","text":"/priv bob hello there"}"#)
            .unwrap();

        let expected = ServerFrame::priv_msg("alice", "hello there");
        assert_eq!(alice_out.frames(), vec![expected.clone()]);
        assert_eq!(bob_out.frames(), vec![expected]);
        assert!(carol_out.frames().is_empty());
    }

    #[test]
    fn test_priv_unknown_target_notifies_sender_and_sends_nothing_private() {
        // The lookup miss short-circuits: only the notice goes out, no
        // priv frame is produced for anyone.
        let room = test_room("lobby");
        let (alice, alice_out) = joined(&room, "alice");
        let (_bob, bob_out) = joined(&room, "bob");
        reset(&[&alice_out, &bob_out]);

        alice
            .handle_incoming(r#"{"type":"chat","text":"/priv ghost hi"}"#)
            .unwrap();

        assert_eq!(
            alice_out.frames(),
            vec![ServerFrame::server_chat("User ghost not found!")]
        );
        assert!(bob_out.frames().is_empty());
    }

    #[test]
    fn test_unrecognized_command_is_silently_ignored() {
        let room = test_room("lobby");
        let (alice, alice_out) = joined(&room, "alice");
        let (_bob, bob_out) = joined(&room, "bob");
        reset(&[&alice_out, &bob_out]);

        alice
            .handle_incoming(r#"{"type":"chat","text":"/dance"}"#)
            .unwrap();

        assert!(alice_out.frames().is_empty());
        assert!(bob_out.frames().is_empty());
    }

    #[test]
    fn test_close_announces_departure() {
        let room = test_room("lobby");
        let (_alice, alice_out) = joined(&room, "alice");
        let (bob, _) = joined(&room, "bob");
        reset(&[&alice_out]);

        bob.handle_close();

        assert_eq!(
            alice_out.frames(),
            vec![ServerFrame::note("bob left lobby.")]
        );
        assert_eq!(room.member_count(), 1);
        assert_eq!(room.roster(), vec!["alice"]);
    }

    #[test]
    fn test_close_before_join_is_safe() {
        let room = test_room("lobby");
        let (_alice, alice_out) = joined(&room, "alice");
        reset(&[&alice_out]);

        let ghost = Session::new(Arc::clone(&room), RecordingOutbox::default());
        ghost.handle_close();

        // Departure note carries an empty placeholder name.
        assert_eq!(alice_out.frames(), vec![ServerFrame::note(" left lobby.")]);
        assert_eq!(room.member_count(), 1);
    }

    #[test]
    fn test_chat_before_join_uses_empty_name() {
        let room = test_room("lobby");
        let (_alice, alice_out) = joined(&room, "alice");
        reset(&[&alice_out]);

        let lurker_out = Arc::new(RecordingOutbox::default());
        let lurker = Session::new(Arc::clone(&room), Arc::clone(&lurker_out));
        lurker
            .handle_incoming(r#"{"type":"chat","text":"hi"}"#)
            .unwrap();

        // The lurker is not a member, so only alice hears it.
        assert_eq!(alice_out.frames(), vec![ServerFrame::chat("", "hi")]);
        assert!(lurker_out.frames().is_empty());
    }

    #[test]
    fn test_send_failure_is_swallowed() {
        let room = test_room("lobby");
        let session = Session::new(Arc::clone(&room), FailingOutbox);

        // Never panics, never propagates.
        session.send(&ServerFrame::server_chat("anyone home?"));
    }

    #[test]
    fn test_session_ids_are_unique() {
        let room = test_room("lobby");
        let a = Session::new(Arc::clone(&room), RecordingOutbox::default());
        let b = Session::new(Arc::clone(&room), RecordingOutbox::default());
        assert_ne!(a.id(), b.id());
    }
}
