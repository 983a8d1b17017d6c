//! HTTP server and WebSocket push channel

pub mod http;
pub mod websocket;

pub use http::{run, serve, AppState};
