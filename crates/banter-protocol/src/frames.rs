//! Frame types for the banter protocol.
//!
//! Frames are the unit of communication between clients and the server.
//! Each frame is a single JSON object with a `type` discriminator.

use serde::{Deserialize, Serialize};

/// Display name attached to server-generated replies (`/joke`, `/members`,
/// lookup failures). Not a reserved name: clients may also call themselves
/// "Server", membership is keyed by session identity.
pub const SERVER_NAME: &str = "Server";

/// A frame sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientFrame {
    /// Join the room this connection was bound to, under a display name.
    Join {
        /// Display name to use in the room.
        name: String,
    },

    /// A chat line, interpreted as a command when the text starts with `/`.
    Chat {
        /// The chat text.
        text: String,
    },
}

/// A frame delivered by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerFrame {
    /// A broadcast chat line.
    Chat {
        /// Sender's display name, or [`SERVER_NAME`] for command replies.
        name: String,
        /// The chat text.
        text: String,
    },

    /// A system announcement (join/leave).
    Note {
        /// Announcement text.
        text: String,
    },

    /// A private message, delivered only to sender and addressee.
    Priv {
        /// Sender's display name.
        name: String,
        /// The message text.
        text: String,
    },
}

impl ClientFrame {
    /// Create a new Join frame.
    #[must_use]
    pub fn join(name: impl Into<String>) -> Self {
        ClientFrame::Join { name: name.into() }
    }

    /// Create a new Chat frame.
    #[must_use]
    pub fn chat(text: impl Into<String>) -> Self {
        ClientFrame::Chat { text: text.into() }
    }
}

impl ServerFrame {
    /// Create a new broadcast Chat frame.
    #[must_use]
    pub fn chat(name: impl Into<String>, text: impl Into<String>) -> Self {
        ServerFrame::Chat {
            name: name.into(),
            text: text.into(),
        }
    }

    /// Create a Chat frame attributed to [`SERVER_NAME`].
    #[must_use]
    pub fn server_chat(text: impl Into<String>) -> Self {
        Self::chat(SERVER_NAME, text)
    }

    /// Create a new Note frame.
    #[must_use]
    pub fn note(text: impl Into<String>) -> Self {
        ServerFrame::Note { text: text.into() }
    }

    /// Create a new Priv frame.
    #[must_use]
    pub fn priv_msg(name: impl Into<String>, text: impl Into<String>) -> Self {
        ServerFrame::Priv {
            name: name.into(),
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The wire shapes are fixed: browser clients match on the literal
    // `type` strings, so the serde attributes must produce exactly these.

    #[test]
    fn test_client_join_wire_shape() {
        let json: serde_json::Value =
            serde_json::to_value(ClientFrame::join("alice")).unwrap();
        assert_eq!(json["type"], "join");
        assert_eq!(json["name"], "alice");
    }

    #[test]
    fn test_client_chat_wire_shape() {
        let json: serde_json::Value =
            serde_json::to_value(ClientFrame::chat("hello")).unwrap();
        assert_eq!(json["type"], "chat");
        assert_eq!(json["text"], "hello");
    }

    #[test]
    fn test_server_chat_wire_shape() {
        let json: serde_json::Value =
            serde_json::to_value(ServerFrame::chat("alice", "hi")).unwrap();
        assert_eq!(json["type"], "chat");
        assert_eq!(json["name"], "alice");
        assert_eq!(json["text"], "hi");
    }

    #[test]
    fn test_server_note_wire_shape() {
        let json: serde_json::Value =
            serde_json::to_value(ServerFrame::note("alice joined \"lobby\".")).unwrap();
        assert_eq!(json["type"], "note");
        assert_eq!(json["text"], "alice joined \"lobby\".");
    }

    #[test]
    fn test_server_priv_wire_shape() {
        let json: serde_json::Value =
            serde_json::to_value(ServerFrame::priv_msg("bob", "psst")).unwrap();
        assert_eq!(json["type"], "priv");
        assert_eq!(json["name"], "bob");
        assert_eq!(json["text"], "psst");
    }

    #[test]
    fn test_server_chat_attribution() {
        let frame = ServerFrame::server_chat("notice");
        assert_eq!(frame, ServerFrame::chat(SERVER_NAME, "notice"));
    }

    #[test]
    fn test_client_frame_round_trip() {
        let frames = vec![ClientFrame::join("alice"), ClientFrame::chat("/members")];
        for frame in frames {
            let encoded = serde_json::to_string(&frame).unwrap();
            let decoded: ClientFrame = serde_json::from_str(&encoded).unwrap();
            assert_eq!(frame, decoded);
        }
    }
}
