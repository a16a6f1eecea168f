//! Connection supervision for the chat client.
//!
//! Provides:
//! - `ConnectionSupervisor` - Runs both channels and the health monitor as
//!   one unit and reconnects after failures
//! - `ReadChannel` / `SendChannel` - Socket-owning channel loops
//! - `HealthMonitor` - Turns missed timeouts into faults
//! - `ChatHandle` - Presentation-side queues and interruption
//! - `register_account` - One-shot account registration

pub mod connection;
pub mod error;
pub mod handle;
pub mod monitor;
pub mod reader;
pub mod registration;
pub mod sender;
pub mod supervisor;

#[cfg(test)]
mod test_support;

pub use connection::{ChannelConnection, ChannelExit};
pub use error::SessionError;
pub use handle::{ChatHandle, InterruptHandle, OutgoingClosed};
pub use monitor::{FaultPolicy, HealthMonitor, TimeoutFault};
pub use reader::ReadChannel;
pub use registration::register_account;
pub use sender::SendChannel;
pub use supervisor::{ConnectionSupervisor, SupervisorOptions};
