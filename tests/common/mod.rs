use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use branchforest::prelude::*;

#[derive(Default)]
pub struct Captured {
    pub entries: HashMap<BranchId, Vec<LogEntry>>,
    pub tags: HashMap<BranchId, Vec<String>>,
    pub metadata: HashMap<BranchId, Metadata>,
    pub tree: HashMap<BranchId, (Option<BranchId>, Vec<BranchId>)>,
}

/// An in-memory [`Writer`] for asserting on what a [`TreeLogger`] flushed,
/// without touching the filesystem.
#[derive(Clone, Default)]
pub struct MockWriter(pub Arc<Mutex<Captured>>);

impl MockWriter {
    pub fn new() -> Self {
        MockWriter::default()
    }

    pub fn snapshot(&self) -> std::sync::MutexGuard<'_, Captured> {
        self.0.lock().unwrap()
    }
}

#[async_trait]
impl Writer for MockWriter {
    async fn append_entries(&self, entries: HashMap<BranchId, Vec<LogEntry>>) -> Result<(), BackendError> {
        let mut guard = self.0.lock().unwrap();
        for (id, mut logs) in entries {
            guard.entries.entry(id).or_default().append(&mut logs);
        }
        Ok(())
    }

    async fn add_tags(&self, tags: HashMap<BranchId, Vec<String>>) -> Result<(), BackendError> {
        let mut guard = self.0.lock().unwrap();
        for (id, new_tags) in tags {
            let existing = guard.tags.entry(id).or_default();
            for tag in new_tags {
                if !existing.contains(&tag) {
                    existing.push(tag);
                }
            }
        }
        Ok(())
    }

    async fn remove_tags(&self, tags: HashMap<BranchId, Vec<String>>) -> Result<(), BackendError> {
        let mut guard = self.0.lock().unwrap();
        for (id, removed) in tags {
            if let Some(existing) = guard.tags.get_mut(&id) {
                existing.retain(|t| !removed.contains(t));
            }
        }
        Ok(())
    }

    async fn update_tree(&self, relationships: HashMap<BranchId, (Option<BranchId>, Vec<BranchId>)>) -> Result<(), BackendError> {
        self.0.lock().unwrap().tree.extend(relationships);
        Ok(())
    }

    async fn update_branch_metadata(&self, metadata: HashMap<BranchId, Metadata>) -> Result<(), BackendError> {
        let mut guard = self.0.lock().unwrap();
        for (id, new_meta) in metadata {
            guard.metadata.entry(id).or_default().extend(new_meta);
        }
        Ok(())
    }
}

/// Builds a `TreeLogger` with a short debounce so tests don't have to wait
/// out the production default.
pub fn quick_logger(name: &str, writer: MockWriter) -> (TreeLogger, MockWriter) {
    let logger = TreeLoggerConfig::new(name)
        .debounce(std::time::Duration::from_millis(20))
        .build(Arc::new(writer.clone()));
    (logger, writer)
}
