//! Orchestration: the sync pass against the partner API and the
//! assembly of the forecast model from stored inputs.

pub mod model;
pub mod sync;

pub use model::{ModelService, ModelView};
pub use sync::{SyncError, SyncReport, SyncRunner};
