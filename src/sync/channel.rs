//! Inbound push-channel messages
//!
//! ## Protocol
//!
//! Messages (observer → server):
//! - `sync_local_changes` - replace top-level fields with the observer's local copy
//! - `add_item` - append a checklist item
//! - `update_status` - set an item's status
//!
//! ```json
//! { "type": "add_item", "payload": { "name": "Check valves" } }
//! { "type": "update_status", "payload": { "item_id": "…", "status": "completed", "user_id": "Alice" } }
//! ```
//!
//! There is no error channel back to the sender. Every message with a known
//! `type` ends in a full-update broadcast, including ones whose payload was
//! malformed or whose mutation was rejected or matched nothing. Payload
//! fields of the wrong JSON type are read as empty text.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::inspection::validate::sanitize_value;
use crate::inspection::{DocumentPatch, DocumentState};

/// Outer frame shape; `payload` is interpreted once `type` is known
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
}

/// Message received from an observer
#[derive(Debug)]
pub enum ClientMessage {
    SyncLocalChanges(DocumentPatch),
    AddItem(AddItemPayload),
    UpdateStatus(UpdateStatusPayload),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AddItemPayload {
    pub name: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateStatusPayload {
    pub item_id: Value,
    pub status: Value,
    pub user_id: Option<Value>,
}

impl ClientMessage {
    /// Parse one text frame.
    ///
    /// `None` when the frame is not JSON or its `type` is unknown. `Some(Err)`
    /// when the type is known but the payload does not fit it. A missing
    /// payload counts as an empty object.
    pub fn parse(text: &str) -> Option<serde_json::Result<Self>> {
        let Envelope { kind, payload } = serde_json::from_str(text).ok()?;
        let payload = match payload {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        let message = match kind.as_str() {
            "sync_local_changes" => serde_json::from_value(payload).map(Self::SyncLocalChanges),
            "add_item" => serde_json::from_value(payload).map(Self::AddItem),
            "update_status" => serde_json::from_value(payload).map(Self::UpdateStatus),
            _ => return None,
        };
        Some(message)
    }
}

/// Parse and apply one text frame. Unrecognized frames are dropped without a
/// broadcast since nothing was attempted.
pub async fn dispatch(state: &DocumentState, text: &str) {
    match ClientMessage::parse(text) {
        Some(Ok(message)) => apply(state, message).await,
        Some(Err(e)) => {
            // Known type, unusable payload: treated like a rejected mutation
            debug!(error = %e, "Channel message payload rejected");
            state.publish().await;
        }
        None => debug!("Ignoring unrecognized channel message"),
    }
}

/// Apply a parsed message.
pub async fn apply(state: &DocumentState, message: ClientMessage) {
    let outcome = match message {
        ClientMessage::SyncLocalChanges(patch) => {
            state.replace_with(patch).await;
            Ok(())
        }
        ClientMessage::AddItem(payload) => state
            .add_item(payload.name.as_str().unwrap_or_default())
            .await
            .map(|_| ()),
        ClientMessage::UpdateStatus(payload) => {
            let actor = payload.user_id.as_ref().map(sanitize_value);
            state
                .set_item_status(
                    payload.item_id.as_str().unwrap_or_default(),
                    payload.status.as_str().unwrap_or_default(),
                    actor.as_deref(),
                )
                .await
                .map(|_| ())
        }
    };

    // Rejections are discarded on this path; observers still get the current
    // document. Successful mutations already broadcast.
    if let Err(e) = outcome {
        debug!(error = %e, "Channel mutation rejected");
        state.publish().await;
    }
}
