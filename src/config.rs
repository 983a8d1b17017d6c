//! Configuration for the inspection gateway
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Shared inspection checklist with real-time WebSocket sync
#[derive(Parser, Debug, Clone)]
#[command(name = "inspection-gateway")]
#[command(about = "Shared inspection checklist served over HTTP and WebSocket")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "127.0.0.1:4999")]
    pub listen: SocketAddr,

    /// JSON file holding the checklist
    #[arg(long, env = "DATA_FILE", default_value = "inspection_data.json")]
    pub data_file: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,

    /// Updates buffered per observer before a slow one starts skipping
    #[arg(long, env = "BROADCAST_CAPACITY", default_value = "100")]
    pub broadcast_capacity: usize,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.broadcast_capacity == 0 {
            return Err("BROADCAST_CAPACITY must be greater than zero".to_string());
        }

        if self.data_file.as_os_str().is_empty() {
            return Err("DATA_FILE must not be empty".to_string());
        }

        Ok(())
    }
}
