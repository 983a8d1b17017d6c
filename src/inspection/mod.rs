//! The shared inspection checklist
//!
//! - **Model**: items, statuses and the document itself
//! - **Validate**: persisted-item shape checks and free-text sanitization
//! - **Store**: whole-document JSON file persistence
//! - **State**: the single in-memory document and its mutations

pub mod model;
pub mod state;
pub mod store;
pub mod validate;

pub use model::{
    now_timestamp, DocumentPatch, InspectionDocument, InspectionItem, ItemStatus, OverallStatus,
};
pub use state::{DocumentState, ANONYMOUS_ACTOR};
pub use store::InspectionStore;
pub use validate::{is_canonical_id, sanitize, validate_item, MAX_NAME_LEN};
