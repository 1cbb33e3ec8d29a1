//! Run checkpointing: completed-node set and pending-frontier snapshot
//!
//! `checkpoint.json` holds the ids of nodes whose records and children have
//! all been durably written; a restarted run skips them. `frontier.json`
//! snapshots the pending queue at the same moments, so a restart resumes
//! from pending work instead of re-walking the taxonomy. Both writes are
//! atomic (temp file + rename).

use super::writer::{OutputError, OutputResult};
use crate::crawl::CrawlNode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// The set of node ids already fully processed within this output root.
///
/// Invariant: an id appears here only after every record and child node
/// the node produced has been durably written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Checkpoint {
    pub completed: BTreeSet<String>,

    #[serde(rename = "updated-at", default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Checkpoint {
    pub fn contains(&self, id: &str) -> bool {
        self.completed.contains(id)
    }

    pub fn record(&mut self, id: impl Into<String>) {
        self.completed.insert(id.into());
    }

    pub fn len(&self) -> usize {
        self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.completed.is_empty()
    }
}

/// Snapshot of not-yet-completed work: the pending queue plus the nodes
/// that failed this run. A restarted run re-enqueues both: failed nodes
/// are retried, completed ones stay skipped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrontierSnapshot {
    #[serde(default)]
    pub pending: Vec<CrawlNode>,

    #[serde(default)]
    pub failed: Vec<CrawlNode>,
}

impl FrontierSnapshot {
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.failed.is_empty()
    }
}

/// Persists checkpoint and frontier beside the crawl output.
pub struct CheckpointStore {
    checkpoint_path: PathBuf,
    frontier_path: PathBuf,
}

impl CheckpointStore {
    pub fn new(output_root: &Path) -> Self {
        Self {
            checkpoint_path: output_root.join("checkpoint.json"),
            frontier_path: output_root.join("frontier.json"),
        }
    }

    /// Loads the completed-node set; an absent file is an empty checkpoint.
    pub fn load_checkpoint(&self) -> OutputResult<Checkpoint> {
        match fs::read_to_string(&self.checkpoint_path) {
            Ok(body) => serde_json::from_str(&body).map_err(|source| OutputError::Json {
                path: self.checkpoint_path.display().to_string(),
                source,
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Checkpoint::default()),
            Err(source) => Err(OutputError::Read {
                path: self.checkpoint_path.display().to_string(),
                source,
            }),
        }
    }

    /// Loads the frontier snapshot; `None` when no snapshot exists.
    pub fn load_frontier(&self) -> OutputResult<Option<FrontierSnapshot>> {
        match fs::read_to_string(&self.frontier_path) {
            Ok(body) => serde_json::from_str(&body)
                .map(Some)
                .map_err(|source| OutputError::Json {
                    path: self.frontier_path.display().to_string(),
                    source,
                }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(OutputError::Read {
                path: self.frontier_path.display().to_string(),
                source,
            }),
        }
    }

    /// Atomically persists the checkpoint and the current frontier.
    pub fn save(&self, checkpoint: &Checkpoint, frontier: &FrontierSnapshot) -> OutputResult<()> {
        let mut stamped = checkpoint.clone();
        stamped.updated_at = Some(Utc::now());

        self.write_atomic_json(&self.checkpoint_path, &stamped)?;
        self.write_atomic_json(&self.frontier_path, frontier)
    }

    /// Removes any previous checkpoint/frontier; missing files are fine.
    pub fn clear(&self) -> OutputResult<()> {
        for path in [&self.checkpoint_path, &self.frontier_path] {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(OutputError::Write {
                        path: path.display().to_string(),
                        source,
                    })
                }
            }
        }
        Ok(())
    }

    fn write_atomic_json<T: Serialize>(&self, path: &Path, value: &T) -> OutputResult<()> {
        let body = serde_json::to_string_pretty(value).map_err(|source| OutputError::Json {
            path: path.display().to_string(),
            source,
        })?;

        let write = || -> io::Result<()> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let tmp = path.with_extension("json.tmp");
            fs::write(&tmp, &body)?;
            fs::rename(&tmp, path)
        };

        write().map_err(|source| OutputError::Write {
            path: path.display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::NodeKind;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_checkpoint_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path());

        let checkpoint = store.load_checkpoint().unwrap();
        assert!(checkpoint.is_empty());
        assert!(store.load_frontier().unwrap().is_none());
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path());

        let mut checkpoint = Checkpoint::default();
        checkpoint.record("detail:https://example.com/items/1");
        checkpoint.record("subcategory:https://example.com/c1/");

        let snapshot = FrontierSnapshot {
            pending: vec![CrawlNode::new(
                NodeKind::DetailItem,
                "https://example.com/items/2",
                None,
                vec!["Books".to_string()],
            )],
            failed: vec![CrawlNode::new(
                NodeKind::DetailItem,
                "https://example.com/items/3",
                None,
                vec!["Books".to_string()],
            )],
        };

        store.save(&checkpoint, &snapshot).unwrap();

        let loaded = store.load_checkpoint().unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded.contains("detail:https://example.com/items/1"));
        assert!(loaded.updated_at.is_some());

        let frontier = store.load_frontier().unwrap().unwrap();
        assert_eq!(frontier.pending.len(), 1);
        assert_eq!(frontier.failed.len(), 1);
        assert_eq!(frontier.pending[0].kind, NodeKind::DetailItem);
    }

    #[test]
    fn test_save_creates_output_root() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("out");
        let store = CheckpointStore::new(&nested);

        store
            .save(&Checkpoint::default(), &FrontierSnapshot::default())
            .unwrap();
        assert!(nested.join("checkpoint.json").exists());
        assert!(nested.join("frontier.json").exists());
    }

    #[test]
    fn test_clear_removes_state() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path());

        store
            .save(&Checkpoint::default(), &FrontierSnapshot::default())
            .unwrap();
        store.clear().unwrap();

        assert!(!dir.path().join("checkpoint.json").exists());
        assert!(store.load_checkpoint().unwrap().is_empty());

        // Clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_save_overwrites_previous_state() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path());

        let mut checkpoint = Checkpoint::default();
        checkpoint.record("a");
        store.save(&checkpoint, &FrontierSnapshot::default()).unwrap();

        checkpoint.record("b");
        store.save(&checkpoint, &FrontierSnapshot::default()).unwrap();

        assert_eq!(store.load_checkpoint().unwrap().len(), 2);
    }
}
