//! Full-document fan-out to connected observers
//!
//! Every accepted mutation pushes the entire document, never a diff, so an
//! observer that misses messages converges again on the next one.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::inspection::InspectionDocument;

/// Message sent from server to observers
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The whole current document
    FullUpdate(InspectionDocument),
}

impl ServerMessage {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Hub for broadcasting document updates to connected observers
pub struct SyncHub {
    sender: broadcast::Sender<ServerMessage>,
}

impl SyncHub {
    /// `capacity` bounds how many updates a slow observer may fall behind
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe a new observer
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.sender.subscribe()
    }

    /// Push the full document to every observer
    pub fn broadcast(&self, doc: InspectionDocument) {
        // Err only means nobody is listening
        match self.sender.send(ServerMessage::FullUpdate(doc)) {
            Ok(observers) => debug!(observers, "Broadcast full update"),
            Err(_) => debug!("Full update dropped, no observers connected"),
        }
    }

    /// Number of connected observers
    pub fn observer_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for SyncHub {
    fn default() -> Self {
        Self::new(100)
    }
}
