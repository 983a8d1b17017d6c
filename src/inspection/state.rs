//! The shared checklist and its mutations
//!
//! `DocumentState` is the only writer of the document. Each mutation runs
//! under one lock covering mutate, persist and broadcast, so concurrent
//! requests on the multi-threaded runtime cannot recompute the aggregate
//! status from a stale snapshot.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use super::model::{now_timestamp, DocumentPatch, InspectionDocument, InspectionItem, ItemStatus};
use super::store::InspectionStore;
use super::validate::{is_canonical_id, sanitize, MAX_NAME_LEN};
use crate::sync::SyncHub;
use crate::types::{InspectionError, Result};

/// Actor recorded when a status update names nobody
pub const ANONYMOUS_ACTOR: &str = "Anonymous";

pub struct DocumentState {
    document: Mutex<InspectionDocument>,
    store: InspectionStore,
    hub: Arc<SyncHub>,
}

impl DocumentState {
    pub fn new(document: InspectionDocument, store: InspectionStore, hub: Arc<SyncHub>) -> Self {
        Self {
            document: Mutex::new(document),
            store,
            hub,
        }
    }

    /// Load from `store`, falling back to the default checklist
    pub async fn load(store: InspectionStore, hub: Arc<SyncHub>) -> Self {
        let document = store.load().await;
        Self::new(document, store, hub)
    }

    pub fn hub(&self) -> &Arc<SyncHub> {
        &self.hub
    }

    /// Copy of the current document
    pub async fn snapshot(&self) -> InspectionDocument {
        self.document.lock().await.clone()
    }

    /// Broadcast the current document without mutating it
    pub async fn publish(&self) {
        let doc = self.document.lock().await;
        self.hub.broadcast(doc.clone());
    }

    /// Overwrite the top-level fields present in `patch`.
    ///
    /// Neither the aggregate status nor item shapes are re-derived; the client
    /// is trusted to push a coherent local copy.
    pub async fn replace_with(&self, patch: DocumentPatch) -> InspectionDocument {
        let mut doc = self.document.lock().await;
        doc.apply_patch(patch);
        info!(items = doc.items.len(), "Replaced document from client state");
        self.commit(&mut doc).await
    }

    /// Append a new pending item.
    ///
    /// The aggregate status is left alone: appending to a completed checklist
    /// keeps it `completed` until the next status update.
    pub async fn add_item(&self, raw_name: &str) -> Result<(InspectionItem, InspectionDocument)> {
        let name = sanitize(raw_name);
        if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
            return Err(InspectionError::InvalidInput("Invalid item name".into()));
        }

        let item = InspectionItem::new(name);
        let mut doc = self.document.lock().await;
        doc.items.push(item.clone());
        info!(item_id = %item.id, name = %item.name, "Added item");
        let snapshot = self.commit(&mut doc).await;
        Ok((item, snapshot))
    }

    /// Remove the item with `id`. The aggregate status is left alone.
    pub async fn remove_item(&self, id: &str) -> Result<InspectionDocument> {
        if !is_canonical_id(id) {
            return Err(InspectionError::InvalidInput("Invalid item ID".into()));
        }

        let mut doc = self.document.lock().await;
        let Some(index) = doc.items.iter().position(|item| item.id == id) else {
            return Err(InspectionError::NotFound("Item not found".into()));
        };
        doc.items.remove(index);
        info!(item_id = %id, "Removed item");
        Ok(self.commit(&mut doc).await)
    }

    /// Set an item's status and recompute the aggregate status.
    ///
    /// `actor` is sanitized; when absent or empty after sanitization the
    /// completion is attributed to `ANONYMOUS_ACTOR`.
    pub async fn set_item_status(
        &self,
        id: &str,
        status: &str,
        actor: Option<&str>,
    ) -> Result<InspectionDocument> {
        if !is_canonical_id(id) {
            return Err(InspectionError::InvalidInput("Invalid item ID".into()));
        }
        let status: ItemStatus = status.parse()?;
        let actor = actor
            .map(sanitize)
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| ANONYMOUS_ACTOR.to_string());

        let mut doc = self.document.lock().await;
        let Some(item) = doc.find_item_mut(id) else {
            return Err(InspectionError::NotFound("Item not found".into()));
        };
        match status {
            ItemStatus::Completed => item.complete(actor.as_str(), now_timestamp()),
            ItemStatus::Pending => item.reset(),
        }
        doc.recompute_overall_status();
        info!(
            item_id = %id,
            status = %status,
            actor = %actor,
            overall_status = ?doc.overall_status,
            "Updated item status"
        );
        Ok(self.commit(&mut doc).await)
    }

    /// Refresh `updated_at`, persist, then fan out. Caller holds the lock.
    async fn commit(&self, doc: &mut InspectionDocument) -> InspectionDocument {
        doc.touch();
        self.store.save(doc).await;
        let snapshot = doc.clone();
        self.hub.broadcast(snapshot.clone());
        snapshot
    }
}
