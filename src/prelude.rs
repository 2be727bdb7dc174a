//! Re-exports the pieces most callers need in one place.

pub use crate::api::{apply, context, disable, enable, fork, log, log_typed, with_context};
pub use crate::backend::file::{FileReader, FileWriter, FileWriterConfig};
pub use crate::backend::{BackendError, Reader, Writer};
pub use crate::branch::Branch;
pub use crate::id::BranchId;
pub use crate::logger::{TreeLogger, TreeLoggerConfig};
pub use crate::logs::{BranchData, LogEntry, Metadata, MessageType, Scalar};
pub use crate::validate::ValidationError;

cfg_tracing_adapter! {
    pub use crate::bridge::ForestBridgeLayer;
}
