//! The default, filesystem-backed [`Writer`]/[`Reader`] implementation.
//!
//! Branches are sharded across a fixed number of "partitions", each backed by
//! one `treelog_logging_storage_partition_{n}.jsonl` file holding the whole
//! partition as a single JSON object (the `.jsonl` suffix is carried over from
//! the source implementation's naming even though the file isn't
//! newline-delimited). A branch is assigned to a partition once, by hashing
//! its id; once a partition accumulates `num_flows_per_partition` branches, it
//! is retired from the open set and a fresh partition takes its place.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;

use crate::backend::{BackendError, Reader, Writer};
use crate::id::BranchId;
use crate::logs::{BranchData, LogEntry, Metadata};

const FILE_FORMAT: &str = "treelog_logging_storage_partition_{}.jsonl";

fn partition_file_name(partition: usize) -> String {
    FILE_FORMAT.replacen("{}", &partition.to_string(), 1)
}

#[derive(Default, Clone, Serialize, Deserialize)]
struct PartitionRecord {
    messages: Vec<LogEntry>,
    metadata: Metadata,
    tags: Vec<String>,
    parent: Option<BranchId>,
    children: Vec<BranchId>,
}

type PartitionFile = HashMap<BranchId, PartitionRecord>;

struct Router {
    open: Vec<usize>,
    next: usize,
}

/// A fluent builder for [`FileWriter`], mirroring the rest of the crate's
/// builder style.
pub struct FileWriterConfig {
    base_path: PathBuf,
    num_flows_per_partition: usize,
    num_concurrent_writes: usize,
}

impl FileWriterConfig {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        FileWriterConfig {
            base_path: base_path.into(),
            num_flows_per_partition: 1000,
            num_concurrent_writes: 16,
        }
    }

    pub fn num_flows_per_partition(mut self, n: usize) -> Self {
        self.num_flows_per_partition = n;
        self
    }

    pub fn num_concurrent_writes(mut self, n: usize) -> Self {
        self.num_concurrent_writes = n;
        self
    }

    /// Creates the backing directory (if needed) and the initial set of open partitions.
    pub async fn build(self) -> Result<FileWriter, BackendError> {
        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| BackendError::wrap("failed to create tree logger storage directory", e))?;

        let open: Vec<usize> = (0..self.num_concurrent_writes).collect();
        let mut data = HashMap::new();
        for partition in &open {
            data.insert(*partition, Mutex::new(PartitionFile::new()));
        }

        Ok(FileWriter {
            base_path: self.base_path,
            num_flows_per_partition: self.num_flows_per_partition,
            router: Mutex::new(Router { open, next: self.num_concurrent_writes }),
            assignment: Mutex::new(HashMap::new()),
            data: Mutex::new(data),
        })
    }
}

/// Writes branch data to a fixed set of rotating, JSON-encoded partition files.
pub struct FileWriter {
    base_path: PathBuf,
    num_flows_per_partition: usize,
    router: Mutex<Router>,
    assignment: Mutex<HashMap<BranchId, usize>>,
    data: Mutex<HashMap<usize, Mutex<PartitionFile>>>,
}

impl FileWriter {
    /// Selects (assigning if necessary) the partition a branch id belongs to.
    async fn select_partition(&self, id: &BranchId) -> usize {
        if let Some(partition) = self.assignment.lock().await.get(id).copied() {
            return partition;
        }

        let mut router = self.router.lock().await;
        let index = fold_hash(id.as_str().as_bytes()) % router.open.len() as u64;
        let partition = router.open[index as usize];

        {
            let mut data = self.data.lock().await;
            let partition_data = data.entry(partition).or_insert_with(|| Mutex::new(PartitionFile::new()));
            partition_data.lock().await.entry(id.clone()).or_default();
        }

        self.assignment.lock().await.insert(id.clone(), partition);

        let partition_len = self.data.lock().await.get(&partition).unwrap().lock().await.len();
        if partition_len >= self.num_flows_per_partition {
            router.open.retain(|p| *p != partition);
            router.open.push(router.next);
            self.data.lock().await.insert(router.next, Mutex::new(PartitionFile::new()));
            router.next += 1;
        }

        partition
    }

    async fn flush_partition(&self, partition: usize) -> Result<(), BackendError> {
        let data = self.data.lock().await;
        let Some(partition_data) = data.get(&partition) else { return Ok(()) };
        let snapshot = partition_data.lock().await.clone();
        drop(data);

        let serialized = serde_json::to_string(&snapshot)
            .map_err(|e| BackendError::wrap("failed to serialize partition", e))?;
        let path = self.base_path.join(partition_file_name(partition));
        fs::write(&path, serialized)
            .await
            .map_err(|e| BackendError::wrap(format!("failed to write {}", path.display()), e))
    }

    async fn with_partition_entry<F>(&self, ids: impl IntoIterator<Item = BranchId>, mut update: F) -> Result<(), BackendError>
    where
        F: FnMut(&mut PartitionRecord) + Send,
    {
        let mut touched = std::collections::HashSet::new();
        for id in ids {
            let partition = self.select_partition(&id).await;
            touched.insert(partition);
            let data = self.data.lock().await;
            let partition_data = data.get(&partition).unwrap();
            let mut guard = partition_data.lock().await;
            update(guard.entry(id).or_default());
        }
        for partition in touched {
            self.flush_partition(partition).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Writer for FileWriter {
    async fn append_entries(&self, entries: HashMap<BranchId, Vec<LogEntry>>) -> Result<(), BackendError> {
        let mut touched = std::collections::HashSet::new();
        for (id, mut logs) in entries {
            let partition = self.select_partition(&id).await;
            touched.insert(partition);
            let data = self.data.lock().await;
            let mut guard = data.get(&partition).unwrap().lock().await;
            guard.entry(id).or_default().messages.append(&mut logs);
        }
        for partition in touched {
            self.flush_partition(partition).await?;
        }
        Ok(())
    }

    async fn add_tags(&self, tags: HashMap<BranchId, Vec<String>>) -> Result<(), BackendError> {
        for (id, new_tags) in tags {
            self.with_partition_entry([id], |record| {
                for tag in &new_tags {
                    if !record.tags.contains(tag) {
                        record.tags.push(tag.clone());
                    }
                }
            })
            .await?;
        }
        Ok(())
    }

    async fn remove_tags(&self, tags: HashMap<BranchId, Vec<String>>) -> Result<(), BackendError> {
        for (id, removed) in tags {
            self.with_partition_entry([id], |record| {
                record.tags.retain(|t| !removed.contains(t));
            })
            .await?;
        }
        Ok(())
    }

    async fn update_tree(&self, relationships: HashMap<BranchId, (Option<BranchId>, Vec<BranchId>)>) -> Result<(), BackendError> {
        for (id, (parent, children)) in relationships {
            self.with_partition_entry([id], |record| {
                record.parent = parent.clone();
                record.children = children.clone();
            })
            .await?;
        }
        Ok(())
    }

    async fn update_branch_metadata(&self, metadata: HashMap<BranchId, Metadata>) -> Result<(), BackendError> {
        for (id, new_meta) in metadata {
            self.with_partition_entry([id], |record| {
                record.metadata.extend(new_meta.clone());
            })
            .await?;
        }
        Ok(())
    }
}

/// Reads back whatever partitions a [`FileWriter`] (or a compatible one) has
/// written under a given directory.
pub struct FileReader {
    base_path: PathBuf,
    loaded: Mutex<Option<Arc<Loaded>>>,
}

struct Loaded {
    by_id: HashMap<BranchId, BranchData>,
    by_tag: HashMap<String, Vec<BranchId>>,
}

impl FileReader {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        FileReader { base_path: base_path.into(), loaded: Mutex::new(None) }
    }

    async fn loaded(&self) -> Result<Arc<Loaded>, BackendError> {
        let mut guard = self.loaded.lock().await;
        if let Some(loaded) = &*guard {
            return Ok(Arc::clone(loaded));
        }

        let mut by_id = HashMap::new();
        let mut by_tag: HashMap<String, Vec<BranchId>> = HashMap::new();

        let mut entries = fs::read_dir(&self.base_path)
            .await
            .map_err(|e| BackendError::wrap("failed to read tree logger storage directory", e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| BackendError::wrap("failed to iterate tree logger storage directory", e))?
        {
            let path = entry.path();
            if !is_partition_file(&path) {
                continue;
            }
            for (id, record) in load_partition(&path).await? {
                for tag in &record.tags {
                    by_tag.entry(tag.clone()).or_default().push(id.clone());
                }
                by_id.insert(
                    id,
                    BranchData {
                        messages: record.messages,
                        metadata: record.metadata,
                        tags: record.tags,
                        parent: record.parent,
                        children: record.children,
                    },
                );
            }
        }

        let loaded = Arc::new(Loaded { by_id, by_tag });
        *guard = Some(Arc::clone(&loaded));
        Ok(loaded)
    }
}

fn is_partition_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with("treelog_logging_storage_partition_") && n.ends_with(".jsonl"))
        .unwrap_or(false)
}

async fn load_partition(path: &Path) -> Result<PartitionFile, BackendError> {
    let contents = fs::read_to_string(path)
        .await
        .map_err(|e| BackendError::wrap(format!("failed to read {}", path.display()), e))?;
    serde_json::from_str(&contents).map_err(|e| BackendError::wrap(format!("failed to parse {}", path.display()), e))
}

#[async_trait]
impl Reader for FileReader {
    async fn get_branch_data(&self, id: &BranchId) -> Result<BranchData, BackendError> {
        let loaded = self.loaded().await?;
        loaded.by_id.get(id).cloned().ok_or_else(|| BackendError::new(format!("no branch with id `{id}`")))
    }

    async fn get_branch_data_many(&self, ids: &[BranchId]) -> Result<Vec<BranchData>, BackendError> {
        let loaded = self.loaded().await?;
        ids.iter()
            .map(|id| loaded.by_id.get(id).cloned().ok_or_else(|| BackendError::new(format!("no branch with id `{id}`"))))
            .collect()
    }

    async fn get_branch_ids_by_tag(&self, tag: &str) -> Result<Vec<BranchId>, BackendError> {
        let loaded = self.loaded().await?;
        Ok(loaded.by_tag.get(tag).cloned().unwrap_or_default())
    }

    async fn get_branch_ids(&self) -> Result<Vec<BranchId>, BackendError> {
        let loaded = self.loaded().await?;
        Ok(loaded.by_id.keys().cloned().collect())
    }

    async fn get_branch_metadata(&self, id: &BranchId) -> Result<Metadata, BackendError> {
        let loaded = self.loaded().await?;
        loaded
            .by_id
            .get(id)
            .map(|data| data.metadata.clone())
            .ok_or_else(|| BackendError::new(format!("no branch with id `{id}`")))
    }
}

/// Folds a byte string into a `u64` the way the source implementation's
/// arbitrary-precision `int.from_bytes(id, "big") % n` does, without needing
/// bignum arithmetic: each byte shifts the accumulator by a base-256 digit,
/// reducing modulo the partition count at every step keeps it in range.
fn fold_hash(bytes: &[u8]) -> u64 {
    const MODULUS: u64 = 1 << 61; // a convenient, large prime-adjacent bound
    bytes.iter().fold(0u64, |acc, &b| (acc.wrapping_mul(256).wrapping_add(b as u64)) % MODULUS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn append_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FileWriterConfig::new(dir.path()).num_concurrent_writes(2).build().await.unwrap();

        let id = BranchId::new();
        let mut entries = HashMap::new();
        entries.insert(id.clone(), vec![LogEntry::new("hi".into(), crate::logs::MessageType::User, None)]);
        writer.append_entries(entries).await.unwrap();

        let mut tags = HashMap::new();
        tags.insert(id.clone(), vec!["alpha".to_string()]);
        writer.add_tags(tags).await.unwrap();

        let reader = FileReader::new(dir.path());
        let data = reader.get_branch_data(&id).await.unwrap();
        assert_eq!(data.messages.len(), 1);
        assert_eq!(data.tags, vec!["alpha".to_string()]);

        let by_tag = reader.get_branch_ids_by_tag("alpha").await.unwrap();
        assert_eq!(by_tag, vec![id]);
    }

    #[tokio::test]
    async fn update_tree_round_trips_parent_and_children_untruncated() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FileWriterConfig::new(dir.path()).num_concurrent_writes(2).build().await.unwrap();

        let parent = BranchId::new();
        let child_a = BranchId::new();
        let child_b = BranchId::new();

        let mut relationships = HashMap::new();
        relationships.insert(parent.clone(), (None, vec![child_a.clone(), child_b.clone()]));
        relationships.insert(child_a.clone(), (Some(parent.clone()), Vec::new()));
        writer.update_tree(relationships).await.unwrap();

        let reader = FileReader::new(dir.path());
        let parent_data = reader.get_branch_data(&parent).await.unwrap();
        assert_eq!(parent_data.parent, None);
        assert_eq!(parent_data.children, vec![child_a.clone(), child_b.clone()]);

        let child_data = reader.get_branch_data(&child_a).await.unwrap();
        assert_eq!(child_data.parent, Some(parent.clone()));
    }

    #[test]
    fn fold_hash_is_deterministic() {
        assert_eq!(fold_hash(b"abc"), fold_hash(b"abc"));
    }
}
