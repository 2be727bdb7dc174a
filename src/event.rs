//! The worker's internal task queue items.
//!
//! Every public mutation (logging a message, relinking the tree, merging
//! metadata, adding tags) is turned into an [`Event`] and handed to the
//! logger's queue. The worker coalesces same-branch, same-kind events between
//! flushes rather than writing one event at a time.

use std::collections::HashMap;

use crate::id::BranchId;
use crate::logs::{LogEntry, Metadata};

#[derive(Debug)]
pub enum Event {
    AppendEntry {
        branch: BranchId,
        entry: LogEntry,
    },
    UpdateTree {
        branch: BranchId,
        parent: Option<BranchId>,
        children: Vec<BranchId>,
    },
    UpdateMetadata {
        branch: BranchId,
        metadata: Metadata,
    },
    UpdateTags {
        branch: BranchId,
        tags: Vec<String>,
    },
    /// Drains the queue, flushes whatever's pending, and stops the worker.
    Shutdown,
}

/// Accumulates events of one kind between flushes, coalesced by branch id.
#[derive(Default)]
pub struct Batch {
    pub entries: HashMap<BranchId, Vec<LogEntry>>,
    pub tree: HashMap<BranchId, (Option<BranchId>, Vec<BranchId>)>,
    pub metadata: HashMap<BranchId, Metadata>,
    pub tags: HashMap<BranchId, Vec<String>>,
}

impl Batch {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.tree.is_empty() && self.metadata.is_empty() && self.tags.is_empty()
    }

    /// The largest of the four per-kind maps, used against the max-batch-size trigger.
    pub fn len(&self) -> usize {
        [self.entries.len(), self.tree.len(), self.metadata.len(), self.tags.len()]
            .into_iter()
            .max()
            .unwrap_or(0)
    }

    pub fn absorb(&mut self, event: Event) {
        match event {
            Event::AppendEntry { branch, entry } => {
                self.entries.entry(branch).or_default().push(entry);
            }
            Event::UpdateTree { branch, parent, children } => {
                self.tree.insert(branch, (parent, children));
            }
            Event::UpdateMetadata { branch, metadata } => {
                self.metadata.entry(branch).or_default().extend(metadata);
            }
            Event::UpdateTags { branch, tags } => {
                let existing = self.tags.entry(branch).or_default();
                for tag in tags {
                    if !existing.contains(&tag) {
                        existing.push(tag);
                    }
                }
            }
            Event::Shutdown => unreachable!("Shutdown is handled by the worker loop, not absorbed into a batch"),
        }
    }

    pub fn take(&mut self) -> Batch {
        std::mem::take(self)
    }
}
