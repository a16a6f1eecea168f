//! Core data model for the line-oriented chat client.
//!
//! This crate provides the fundamental building blocks:
//! - `ConnectionParameters` - Immutable host/ports/token/timeout value
//! - `ChatMessage` - Timestamped, display-ready chat line
//! - `LivenessEvent` and `StatusEvent` - Health and lifecycle signals
//! - `HistoryStore` - Append-only message history with replay

pub mod event;
pub mod history;
pub mod message;
pub mod params;

pub use event::{ChannelKind, ConnectionState, LivenessEvent, StatusEvent};
pub use history::HistoryStore;
pub use message::ChatMessage;
pub use params::{ConnectionParameters, ParamsError};
