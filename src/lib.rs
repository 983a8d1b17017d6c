//! Inspection Gateway - shared inspection checklist with live sync
//!
//! One checklist document is held in memory, persisted to a JSON file and
//! pushed in full to every connected observer after each accepted change.
//!
//! ## Surfaces
//!
//! - **HTTP API**: `/api/inspection` read, add, delete and status updates
//! - **Push channel**: `/inspection` WebSocket carrying `full_update` messages
//!   out and `sync_local_changes`, `add_item`, `update_status` in
//! - **Health**: `/health` liveness and document summary

pub mod config;
pub mod inspection;
pub mod routes;
pub mod server;
pub mod sync;
pub mod types;

pub use config::Args;
pub use server::{run, serve, AppState};
pub use types::{InspectionError, Result};
