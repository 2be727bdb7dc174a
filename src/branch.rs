//! A single node in a tree logger's branch tree.
//!
//! A [`Branch`] is a cheap, `Arc`-backed handle: cloning it shares the same
//! underlying id, tag set, and metadata, and every handle enqueues onto the
//! same worker queue. Branches are not dropped explicitly; they're retired in
//! bulk when their owning [`TreeLogger`][crate::logger::TreeLogger] scope ends.

use std::sync::Mutex;

use tokio::sync::mpsc::UnboundedSender;

use crate::event::Event;
use crate::id::BranchId;
use crate::logs::{LogEntry, Metadata, MessageType, Scalar};

#[derive(Clone)]
pub struct Branch(std::sync::Arc<Inner>);

struct Inner {
    id: BranchId,
    name: String,
    parent: Mutex<Option<BranchId>>,
    children: Mutex<Vec<BranchId>>,
    tags: Mutex<Vec<String>>,
    queue: UnboundedSender<Event>,
}

impl Branch {
    /// Creates a fresh, unparented branch and enqueues its initial `name` metadata.
    pub fn new(name: impl Into<String>, queue: UnboundedSender<Event>) -> Self {
        let name = name.into();
        let id = BranchId::new();

        let mut metadata = Metadata::new();
        metadata.insert("name".to_string(), Scalar::Text(name.clone()));
        let _ = queue.send(Event::UpdateMetadata { branch: id.clone(), metadata: metadata.clone() });

        Branch(std::sync::Arc::new(Inner {
            id,
            name,
            parent: Mutex::new(None),
            children: Mutex::new(Vec::new()),
            tags: Mutex::new(Vec::new()),
            queue,
        }))
    }

    pub fn id(&self) -> &BranchId {
        &self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn parent(&self) -> Option<BranchId> {
        self.0.parent.lock().unwrap().clone()
    }

    pub fn children(&self) -> Vec<BranchId> {
        self.0.children.lock().unwrap().clone()
    }

    pub fn log(&self, message: String, message_type: MessageType, entry_metadata: Option<Metadata>) {
        let entry = LogEntry::new(message, message_type, entry_metadata);
        let _ = self.0.queue.send(Event::AppendEntry { branch: self.0.id.clone(), entry });
    }

    /// Creates a child branch, linking both ends of the edge and logging a
    /// system entry noting the new branch.
    pub fn fork(&self, name: impl Into<String>) -> Branch {
        let child = Branch::new(name, self.0.queue.clone());
        child.set_parent(self.0.id.clone());
        self.add_child(child.0.id.clone());

        self.log(
            format!("Branched Logger: {}", child.name()),
            MessageType::System,
            Some(Metadata::from([("branch_id".to_string(), Scalar::Text(child.id().to_string()))])),
        );

        child
    }

    fn set_parent(&self, parent: BranchId) {
        *self.0.parent.lock().unwrap() = Some(parent.clone());
        self.push_tree_update(Some(parent));
    }

    fn add_child(&self, child: BranchId) {
        self.0.children.lock().unwrap().push(child);
        let parent = self.parent();
        self.push_tree_update(parent);
    }

    fn push_tree_update(&self, parent: Option<BranchId>) {
        let children = self.children();
        let _ = self.0.queue.send(Event::UpdateTree { branch: self.0.id.clone(), parent, children });
    }

    /// Merges new tags into this branch, enqueuing only the ones not already
    /// present locally (the backend additionally guards against duplicates).
    pub fn add_tags(&self, tags: Vec<String>) {
        let mut guard = self.0.tags.lock().unwrap();
        let fresh: Vec<String> = tags.into_iter().filter(|t| !guard.contains(t)).collect();
        if fresh.is_empty() {
            return;
        }
        guard.extend(fresh.iter().cloned());
        drop(guard);
        let _ = self.0.queue.send(Event::UpdateTags { branch: self.0.id.clone(), tags: fresh });
    }

    pub fn tags(&self) -> Vec<String> {
        self.0.tags.lock().unwrap().clone()
    }

    /// Merges new metadata into this branch, enqueuing only the delta (the
    /// backend applies it as a key-wise update, not a replace).
    pub fn add_metadata(&self, metadata: Metadata) {
        let _ = self.0.queue.send(Event::UpdateMetadata { branch: self.0.id.clone(), metadata });
    }
}
