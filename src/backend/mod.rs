//! The storage contract a [`TreeLogger`][crate::logger::TreeLogger] writes through.
//!
//! A backend only needs to implement the async methods; each has a default
//! body in terms of the others where the original implementation allowed a
//! synchronous-only backend, but in this crate every method is async from the
//! start since writers always run on the worker's own runtime.

use std::collections::HashMap;

use async_trait::async_trait;
use std::fmt;

use crate::id::BranchId;
use crate::logs::{BranchData, LogEntry, Metadata};

pub mod file;

/// An error raised by a [`Writer`] or [`Reader`] implementation.
#[derive(Debug)]
pub struct BackendError {
    message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        BackendError { message: message.into(), source: None }
    }

    pub fn wrap(message: impl Into<String>, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        BackendError { message: message.into(), source: Some(Box::new(source)) }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for BackendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_deref().map(|e| e as _)
    }
}

/// Durably persists the events a [`TreeLogger`][crate::logger::TreeLogger]'s
/// worker batches up.
///
/// Implementations receive a whole batch (keyed by branch id) per call rather
/// than one branch at a time, so they can amortize I/O across a debounce
/// window.
#[async_trait]
pub trait Writer: Send + Sync {
    async fn append_entries(&self, entries: HashMap<BranchId, Vec<LogEntry>>) -> Result<(), BackendError>;

    async fn add_tags(&self, tags: HashMap<BranchId, Vec<String>>) -> Result<(), BackendError>;

    /// Removes tags from branches. Not exercised by the batching worker
    /// (nothing in the pipeline ever emits a remove-tags event) but kept on
    /// the trait for backend implementers who expose it directly.
    async fn remove_tags(&self, tags: HashMap<BranchId, Vec<String>>) -> Result<(), BackendError>;

    async fn update_tree(&self, relationships: HashMap<BranchId, (Option<BranchId>, Vec<BranchId>)>) -> Result<(), BackendError>;

    async fn update_branch_metadata(&self, metadata: HashMap<BranchId, Metadata>) -> Result<(), BackendError>;
}

/// Reads back what a [`Writer`] has persisted.
#[async_trait]
pub trait Reader: Send + Sync {
    async fn get_branch_data(&self, id: &BranchId) -> Result<BranchData, BackendError>;

    async fn get_branch_data_many(&self, ids: &[BranchId]) -> Result<Vec<BranchData>, BackendError>;

    async fn get_branch_ids_by_tag(&self, tag: &str) -> Result<Vec<BranchId>, BackendError>;

    async fn get_branch_ids(&self) -> Result<Vec<BranchId>, BackendError>;

    async fn get_branch_metadata(&self, id: &BranchId) -> Result<Metadata, BackendError>;
}
