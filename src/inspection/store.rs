//! JSON file persistence for the checklist
//!
//! The whole document lives in one UTF-8 JSON file that is overwritten on
//! every save. Loading never fails: a missing, unreadable or malformed file
//! yields the default checklist.

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error, info, warn};

use super::model::{InspectionDocument, InspectionItem, OverallStatus};
use super::validate::validate_item;
use crate::types::{InspectionError, Result};

/// File-backed document store
#[derive(Debug, Clone)]
pub struct InspectionStore {
    path: PathBuf,
}

impl InspectionStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document, falling back to the default checklist.
    ///
    /// Completion state never survives a restart: every kept item comes back
    /// pending with its completion fields cleared.
    pub async fn load(&self) -> InspectionDocument {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No data file, starting with default checklist");
                return InspectionDocument::default_checklist();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Data file unreadable, starting with default checklist");
                return InspectionDocument::default_checklist();
            }
        };

        match parse_document(&raw) {
            Ok(doc) => {
                info!(
                    path = %self.path.display(),
                    items = doc.items.len(),
                    "Loaded inspection data"
                );
                doc
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Data file invalid, starting with default checklist");
                InspectionDocument::default_checklist()
            }
        }
    }

    /// Serialize and overwrite the backing file
    pub async fn write(&self, doc: &InspectionDocument) -> Result<()> {
        let json = serde_json::to_vec_pretty(doc)
            .map_err(|e| InspectionError::Internal(format!("Failed to serialize document: {e}")))?;
        fs::write(&self.path, json)
            .await
            .map_err(|e| InspectionError::Persistence(format!("{}: {e}", self.path.display())))?;
        debug!(path = %self.path.display(), "Saved inspection data");
        Ok(())
    }

    /// Write, logging and swallowing any failure. The in-memory document stays
    /// authoritative until the next successful save.
    pub async fn save(&self, doc: &InspectionDocument) {
        if let Err(e) = self.write(doc).await {
            error!(path = %self.path.display(), error = %e, "Failed to save inspection data");
        }
    }
}

fn parse_document(raw: &[u8]) -> Result<InspectionDocument> {
    let value: Value = serde_json::from_slice(raw)?;
    let Value::Object(mut data) = value else {
        return Err(InspectionError::InvalidInput("data file is not an object".into()));
    };
    let items = match data.remove("items") {
        Some(Value::Array(items)) => items,
        Some(_) => return Err(InspectionError::InvalidInput("`items` is not a list".into())),
        None => return Err(InspectionError::InvalidInput("missing `items`".into())),
    };

    let total = items.len();
    let items: Vec<InspectionItem> = items
        .iter()
        .filter(|candidate| validate_item(candidate))
        .filter_map(restore_item)
        .collect();
    if items.len() < total {
        warn!(dropped = total - items.len(), "Dropped invalid items from data file");
    }

    let overall_status = data
        .remove("overall_status")
        .and_then(|v| serde_json::from_value::<OverallStatus>(v).ok())
        .unwrap_or_default();
    let created_at = take_string(&mut data, "created_at");
    let updated_at = take_string(&mut data, "updated_at");

    Ok(InspectionDocument {
        items,
        overall_status,
        created_at: created_at.unwrap_or_else(super::model::now_timestamp),
        updated_at: updated_at.unwrap_or_else(super::model::now_timestamp),
    })
}

/// Rebuild a validated item as pending
fn restore_item(candidate: &Value) -> Option<InspectionItem> {
    let id = candidate.get("id")?.as_str()?;
    let name = candidate.get("name")?.as_str()?;
    Some(InspectionItem::with_id(id, name))
}

fn take_string(data: &mut Map<String, Value>, key: &str) -> Option<String> {
    match data.remove(key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}
