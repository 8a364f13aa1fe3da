//! # banter-protocol
//!
//! Wire protocol definitions for the banter chat relay.
//!
//! This crate defines the frames exchanged between clients and the server,
//! and the codec that maps them to UTF-8 JSON text messages.
//!
//! ## Frame Types
//!
//! - `Join` / `Chat` - Client requests (join a room, send a chat line)
//! - `Chat` / `Note` / `Priv` - Server deliveries (broadcast line, system
//!   announcement, private message)
//!
//! ## Example
//!
//! ```rust
//! use banter_protocol::{codec, ClientFrame, ServerFrame};
//!
//! let frame = ServerFrame::note("alice joined \"lobby\".");
//! let encoded = codec::encode(&frame).unwrap();
//!
//! let inbound: ClientFrame = codec::decode(r#"{"type":"chat","text":"hi"}"#).unwrap();
//! assert_eq!(inbound, ClientFrame::Chat { text: "hi".into() });
//! ```

pub mod codec;
pub mod frames;

pub use codec::{decode, encode, ProtocolError, MAX_FRAME_SIZE};
pub use frames::{ClientFrame, ServerFrame, SERVER_NAME};
