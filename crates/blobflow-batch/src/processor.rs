//! Chunked execution of large id and request lists, plus change-set helpers.

use std::collections::HashMap;

use blobflow_diff::{DiffEngine, DiffRequest, DiffResult};
use blobflow_store::ObjectStore;
use blobflow_types::{unique_sorted, BatchResult, ObjectId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::BatchConfig;
use crate::loader::BlobLoader;
use crate::result::BlobResult;

/// One chunk of an owned-copy load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobChunk {
    /// Sequential chunk number, starting at zero.
    pub batch_id: usize,
    pub results: Vec<BlobResult>,
    pub loaded: usize,
}

/// One chunk of a diff run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffChunk {
    pub batch_id: usize,
    pub results: Vec<DiffResult>,
    pub succeeded: usize,
}

/// Kind of change to a path between two trees.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Insert,
    Delete,
    Modify,
}

/// A changed path and the blobs on either side of it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Change {
    pub action: ChangeAction,
    pub path: String,
    /// Blob before the change; `None` for inserts.
    pub from: Option<ObjectId>,
    /// Blob after the change; `None` for deletes.
    pub to: Option<ObjectId>,
}

impl Change {
    pub fn insert(path: impl Into<String>, to: ObjectId) -> Self {
        Self {
            action: ChangeAction::Insert,
            path: path.into(),
            from: None,
            to: Some(to),
        }
    }

    pub fn delete(path: impl Into<String>, from: ObjectId) -> Self {
        Self {
            action: ChangeAction::Delete,
            path: path.into(),
            from: Some(from),
            to: None,
        }
    }

    pub fn modify(path: impl Into<String>, from: ObjectId, to: ObjectId) -> Self {
        Self {
            action: ChangeAction::Modify,
            path: path.into(),
            from: Some(from),
            to: Some(to),
        }
    }

    /// Blob ids this change references.
    pub fn blob_ids(&self) -> impl Iterator<Item = ObjectId> {
        self.from.into_iter().chain(self.to)
    }
}

/// Runs loader and diff engine calls over arbitrarily large inputs in
/// fixed-size chunks.
pub struct BatchProcessor<'s, S: ObjectStore + ?Sized> {
    store: &'s S,
    config: BatchConfig,
}

impl<'s, S: ObjectStore + ?Sized> BatchProcessor<'s, S> {
    pub fn new(store: &'s S, config: BatchConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn loader(&self) -> BlobLoader<'s, S> {
        BlobLoader::new(self.store, self.config.loader.clone())
    }

    pub fn engine(&self) -> DiffEngine<'s, S> {
        DiffEngine::new(self.store, self.config.diff.clone())
    }

    /// Load `ids` in chunks of `blob_batch_size`, one loader call per chunk.
    pub fn load_chunked(&self, ids: &[ObjectId]) -> BatchResult<Vec<BlobChunk>> {
        let loader = self.loader();
        let chunk_len = self.config.blob_chunk_len();
        ids.chunks(chunk_len)
            .enumerate()
            .map(|(batch_id, chunk)| {
                let report = loader.load_many(chunk)?;
                debug!(batch_id, items = chunk.len(), loaded = report.loaded, "blob chunk done");
                Ok(BlobChunk {
                    batch_id,
                    results: report.results,
                    loaded: report.loaded,
                })
            })
            .collect()
    }

    /// Diff `requests` in chunks of `diff_batch_size`, one engine call per chunk.
    pub fn diff_chunked(&self, requests: &[DiffRequest]) -> Vec<DiffChunk> {
        let engine = self.engine();
        let chunk_len = self.config.diff_chunk_len();
        requests
            .chunks(chunk_len)
            .enumerate()
            .map(|(batch_id, chunk)| {
                let batch = engine.diff_many(chunk);
                debug!(batch_id, items = chunk.len(), succeeded = batch.succeeded, "diff chunk done");
                DiffChunk {
                    batch_id,
                    results: batch.results,
                    succeeded: batch.succeeded,
                }
            })
            .collect()
    }

    /// Load every blob referenced by `changes`, once each.
    ///
    /// The map holds only blobs that loaded; missing ids are left out.
    pub fn process_change_blobs(
        &self,
        changes: &[Change],
    ) -> BatchResult<HashMap<ObjectId, BlobResult>> {
        let ids = unique_sorted(changes.iter().flat_map(Change::blob_ids).collect());
        let mut blobs = HashMap::with_capacity(ids.len());
        for chunk in self.load_chunked(&ids)? {
            blobs.extend(
                chunk
                    .results
                    .into_iter()
                    .filter(BlobResult::is_ok)
                    .map(|r| (r.id, r)),
            );
        }
        Ok(blobs)
    }

    /// Diff every [`ChangeAction::Modify`] change, keyed by path.
    ///
    /// Inserts and deletes are skipped. Failed diffs are kept with their
    /// error so callers can tell binary files from missing ones.
    pub fn process_change_diffs(&self, changes: &[Change]) -> HashMap<String, DiffResult> {
        let modified: Vec<(&str, DiffRequest)> = changes
            .iter()
            .filter(|c| c.action == ChangeAction::Modify)
            .filter_map(|c| Some((c.path.as_str(), DiffRequest::modified(c.from?, c.to?))))
            .collect();
        let requests: Vec<DiffRequest> = modified.iter().map(|(_, r)| r.clone()).collect();

        let results = self
            .diff_chunked(&requests)
            .into_iter()
            .flat_map(|chunk| chunk.results);
        modified
            .iter()
            .map(|(path, _)| path.to_string())
            .zip(results)
            .collect()
    }
}
