//! Push-channel synchronization
//!
//! - **Hub**: fans the full document out to every connected observer
//! - **Channel**: decodes observer messages into document mutations

pub mod channel;
pub mod hub;

pub use channel::{dispatch, ClientMessage};
pub use hub::{ServerMessage, SyncHub};
