//! # banter-core
//!
//! Room membership and message routing for the banter chat relay.
//!
//! This crate provides the stateful heart of the relay:
//!
//! - **Room** - Named broadcast domain holding a live member set
//! - **Registry** - Process-wide name→room directory
//! - **Session** - Per-connection identity and protocol dispatch
//! - **Command** - In-band slash-command interpretation
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Transport  │────▶│   Session   │────▶│    Room     │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            │                   ▲
//!                            ▼                   │
//!                     ┌─────────────┐            │
//!                     │  Registry   │────────────┘
//!                     └─────────────┘
//! ```
//!
//! The transport hands each session raw text frames and a delivery
//! callback; the session decodes frames, mutates its room through the
//! registry, and the room fans resulting events out to every member.

pub mod command;
pub mod deliver;
pub mod registry;
pub mod room;
pub mod session;

pub use command::Command;
pub use deliver::{Deliver, DeliveryFailure};
pub use registry::{Registry, RegistryStats};
pub use room::Room;
pub use session::{Session, SessionId};
