//! Checklist document model
//!
//! Field names are shared by the persisted file, the REST responses and the
//! push channel, so they serialize verbatim in snake_case.

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::types::InspectionError;

/// Timestamp layout used for `completed_at`, `created_at` and `updated_at`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Names of the checklist synthesized when no usable data file exists
pub const DEFAULT_ITEM_NAMES: [&str; 5] = [
    "设备外观检查",
    "电源连接检查",
    "安全装置检查",
    "运行状态检查",
    "清洁度检查",
];

/// Current local time in `TIMESTAMP_FORMAT`
pub fn now_timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Completion state of a single item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Completed,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = InspectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            _ => Err(InspectionError::InvalidInput("Invalid status".into())),
        }
    }
}

/// Aggregate status of the whole checklist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    #[default]
    InProgress,
    Completed,
}

/// One checklist entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionItem {
    pub id: String,
    pub name: String,
    pub status: ItemStatus,
    /// Empty unless `status` is completed
    #[serde(default)]
    pub completed_by: String,
    /// Empty unless `status` is completed
    #[serde(default)]
    pub completed_at: String,
}

impl InspectionItem {
    /// New pending item with a fresh id
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), name)
    }

    /// Pending item with the given id
    pub fn with_id(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: ItemStatus::Pending,
            completed_by: String::new(),
            completed_at: String::new(),
        }
    }

    /// Mark completed by `actor` at `at`
    pub fn complete(&mut self, actor: impl Into<String>, at: impl Into<String>) {
        self.status = ItemStatus::Completed;
        self.completed_by = actor.into();
        self.completed_at = at.into();
    }

    /// Back to pending; completion fields are cleared
    pub fn reset(&mut self) {
        self.status = ItemStatus::Pending;
        self.completed_by.clear();
        self.completed_at.clear();
    }

    pub fn is_completed(&self) -> bool {
        self.status == ItemStatus::Completed
    }
}

/// The shared checklist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionDocument {
    pub items: Vec<InspectionItem>,
    pub overall_status: OverallStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl InspectionDocument {
    /// Fresh checklist with the default items, all pending
    pub fn default_checklist() -> Self {
        let now = now_timestamp();
        Self {
            items: DEFAULT_ITEM_NAMES.iter().map(|name| InspectionItem::new(*name)).collect(),
            overall_status: OverallStatus::InProgress,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn find_item(&self, id: &str) -> Option<&InspectionItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn find_item_mut(&mut self, id: &str) -> Option<&mut InspectionItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    /// Completed iff there is at least one item and every item is completed.
    pub fn derive_overall_status(&self) -> OverallStatus {
        if !self.items.is_empty() && self.items.iter().all(InspectionItem::is_completed) {
            OverallStatus::Completed
        } else {
            OverallStatus::InProgress
        }
    }

    pub fn recompute_overall_status(&mut self) {
        self.overall_status = self.derive_overall_status();
    }

    pub fn touch(&mut self) {
        self.updated_at = now_timestamp();
    }

    /// Overwrite the top-level fields present in `patch`
    pub fn apply_patch(&mut self, patch: DocumentPatch) {
        if let Some(items) = patch.items {
            self.items = items;
        }
        if let Some(overall_status) = patch.overall_status {
            self.overall_status = overall_status;
        }
    }
}

/// Client-supplied replacement of top-level document fields.
///
/// Only `items` and `overall_status` are overwritten. `created_at` is
/// immutable and `updated_at` is refreshed by every mutation, so both are
/// accepted (clients echo the whole document back) and ignored. Any other
/// key rejects the patch.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocumentPatch {
    #[serde(default)]
    pub items: Option<Vec<InspectionItem>>,
    #[serde(default)]
    pub overall_status: Option<OverallStatus>,
    #[serde(default, rename = "created_at")]
    _created_at: Option<IgnoredAny>,
    #[serde(default, rename = "updated_at")]
    _updated_at: Option<IgnoredAny>,
}

impl DocumentPatch {
    pub fn new(items: Option<Vec<InspectionItem>>, overall_status: Option<OverallStatus>) -> Self {
        Self {
            items,
            overall_status,
            ..Self::default()
        }
    }
}
