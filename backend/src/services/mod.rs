//! Service layer for business logic that is not session persistence.

pub mod export;

pub use export::{TimetableExport, EXPORT_FILE_NAME};
