//! Shared types

pub mod error;

pub use error::{InspectionError, Result};
