//! Wire protocol for the chat server.
//!
//! Provides:
//! - Line framing (`LineCodec`, frame encoders)
//! - Account JSON decoding
//! - Registration and authentication handshakes

pub mod account;
pub mod codec;
pub mod handshake;

pub use account::AccountIdentity;
pub use codec::{CodecError, LineCodec, encode_message, encode_nickname, encode_token, send_frame};
pub use handshake::{HandshakeError, authorize, register};
