//! Two-node round protocol
//!
//! # Architecture
//!
//! - **Server**: waits for the round count, runs the basic phase alone, then
//!   the accelerated phase on its share and merges the client's results
//! - **Client**: picks the round count, computes its share of each
//!   accelerated phase and ships the results
//! - **Listener**: background task per node that decodes datagrams into the
//!   mailbox
//!
//! # Modules
//!
//! - `protocol`: text datagram codec
//! - `mailbox`: signal counters and peer results shared with the listener
//! - `coordinator`: per-node round state machine

pub mod coordinator;
pub mod mailbox;
pub mod protocol;

pub use coordinator::{run_standalone, Coordinator, Role, RoundState};
pub use mailbox::{Mailbox, MailboxState, WaitError};
pub use protocol::Message;
