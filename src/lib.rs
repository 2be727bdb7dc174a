//! Hierarchical, branch-aware logging for concurrent and recursive computations.
//!
//! # Overview
//!
//! A conventional logger sees one flat stream of events. This crate instead
//! organizes logs into a tree of [`Branch`]es: a root branch for a top-level
//! computation, with child branches for each concurrent or recursive piece of
//! work it spins off. Every branch keeps its own ordered log, tags, and
//! metadata, and is linked to its parent and children, so a reader can follow
//! one branch's story without it being interleaved with its siblings'.
//!
//! Call patterns are driven through a small set of free functions —
//! [`log`][api::log], [`apply`][api::apply], [`fork`][api::fork],
//! [`context`][api::context], [`disable`][api::disable], and
//! [`enable`][api::enable] — that act on whichever branches are in scope for
//! the calling task, rather than requiring a branch handle to be threaded
//! through every function signature.
//!
//! # Getting started
//!
//! ```
//! # use branchforest::prelude::*;
//! # use std::sync::Arc;
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let writer = FileWriterConfig::new("./logs").build().await?;
//! let logger = TreeLoggerConfig::new("entrypoint").build(Arc::new(writer));
//!
//! logger
//!     .on_future(async {
//!         log("hello from the root branch", MessageType::User, None);
//!
//!         fork("child")
//!             .on_future(async {
//!                 log("hello from a child branch", MessageType::User, None);
//!             })
//!             .await;
//!     })
//!     .await;
//! # Ok(())
//! # }
//! ```
//!
//! # Propagation across concurrent tasks
//!
//! The active frontier (the set of branches a task writes to) is carried with
//! [`tokio::task_local!`] rather than a plain thread-local, so it follows a
//! task wherever it's polled rather than leaking across tasks that happen to
//! share a worker thread. Spawning a genuinely independent concurrent
//! sub-task (one that should start its own branch) goes through
//! [`fork`][api::fork]; tasks that don't fork simply inherit whatever frontier
//! was active when they were spawned, since `tokio::spawn` captures the
//! calling task's context the same way cloning any other task-local value
//! would.
//!
//! # Pluggable storage
//!
//! Persistence goes through the [`Writer`][backend::Writer]/[`Reader`][backend::Reader]
//! traits in [`backend`], so alternative storage can be swapped in without
//! touching the batching worker. [`backend::file`] ships a default
//! filesystem-backed implementation.
//!
//! # Feature flags
//!
//! * `tracing-adapter`: adds [`bridge::ForestBridgeLayer`], a
//!   [`tracing_subscriber::Layer`] that forwards ordinary [`tracing`] events
//!   into whatever frontier is active, for programs migrating from or mixing
//!   with standard `tracing`-based logging.

#[doc(hidden)]
#[macro_use]
mod cfg;
mod fail;

pub mod api;
pub mod backend;
pub mod branch;
pub mod id;
pub mod logger;
pub mod logs;
pub mod validate;

mod context;
mod event;

cfg_tracing_adapter! {
    pub mod bridge;
}

pub mod prelude;

pub use crate::api::{apply, context as current_context, disable, enable, fork, log, log_typed, with_context};
pub use crate::backend::{BackendError, Reader, Writer};
pub use crate::branch::Branch;
pub use crate::id::BranchId;
pub use crate::logger::{TreeLogger, TreeLoggerConfig};
pub use crate::logs::{BranchData, LogEntry, Metadata, MessageType, Scalar};
pub use crate::validate::ValidationError;
