//! Codec for encoding and decoding banter frames.
//!
//! The wire format is one JSON object per WebSocket text message. There is
//! no length prefix or binary framing; the transport already delimits
//! messages.

use thiserror::Error;

use crate::frames::{ClientFrame, ServerFrame};

/// Maximum inbound frame size in bytes (64 KiB).
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

/// Protocol errors that can occur during encoding/decoding.
///
/// Decode errors propagate to the transport shell, which decides whether to
/// close the connection; they are never swallowed inside the core.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame exceeds maximum size.
    #[error("frame size {0} exceeds maximum {MAX_FRAME_SIZE}")]
    FrameTooLarge(usize),

    /// JSON encoding error.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// The payload is not well-formed, or a recognized frame is missing
    /// required fields.
    #[error("malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),

    /// The payload is valid JSON but carries an unrecognized `type`.
    #[error("bad message: {0}")]
    BadMessage(String),
}

/// Encode a server frame to its JSON text form.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode(frame: &ServerFrame) -> Result<String, ProtocolError> {
    serde_json::to_string(frame).map_err(ProtocolError::Encode)
}

/// Decode a client frame from a raw text message.
///
/// # Errors
///
/// Returns [`ProtocolError::FrameTooLarge`] for oversized input,
/// [`ProtocolError::BadMessage`] when the `type` discriminator is not one of
/// the recognized values, and [`ProtocolError::Malformed`] otherwise.
pub fn decode(raw: &str) -> Result<ClientFrame, ProtocolError> {
    if raw.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge(raw.len()));
    }

    match serde_json::from_str(raw) {
        Ok(frame) => Ok(frame),
        Err(err) => Err(classify(raw, err)),
    }
}

/// Distinguish an unrecognized `type` from a structurally broken payload.
/// A recognized tag with bad fields stays `Malformed` so the shell can log
/// the underlying serde error.
fn classify(raw: &str, err: serde_json::Error) -> ProtocolError {
    let tag = serde_json::from_str::<serde_json::Value>(raw)
        .ok()
        .and_then(|v| v.get("type")?.as_str().map(String::from));

    match tag {
        Some(tag) if tag != "join" && tag != "chat" => ProtocolError::BadMessage(tag),
        _ => ProtocolError::Malformed(err),
    }
}
