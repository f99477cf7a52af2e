//! Batch diff engine.
//!
//! A batch of M requests references at most 2M blobs, and in practice far
//! fewer: the same base blob is compared against many candidates, and
//! reversed pairs share both sides. The engine collects the unique ids,
//! fetches each once in id order, then diffs every request against that
//! preloaded set without touching the store again.

use blobflow_store::{ObjectReader, ObjectStore};
use blobflow_types::{classify, BatchError, BatchResult, Classification, ObjectId};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::config::DiffConfig;
use crate::encoder::{diff_lines, DiffOp, LineDiff, TextInput};
use crate::preload::PreloadSet;

/// Where one side of a diff comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiffSide {
    /// A blob to read from the store.
    Stored(ObjectId),
    /// Content the caller already holds.
    Inline(Bytes),
}

/// One pair to diff. A missing old side is an addition, a missing new side
/// a deletion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiffRequest {
    pub old: Option<DiffSide>,
    pub new: Option<DiffSide>,
}

impl DiffRequest {
    pub fn modified(old: ObjectId, new: ObjectId) -> Self {
        Self {
            old: Some(DiffSide::Stored(old)),
            new: Some(DiffSide::Stored(new)),
        }
    }

    pub fn added(new: ObjectId) -> Self {
        Self {
            old: None,
            new: Some(DiffSide::Stored(new)),
        }
    }

    pub fn deleted(old: ObjectId) -> Self {
        Self {
            old: Some(DiffSide::Stored(old)),
            new: None,
        }
    }

    /// A request over content the caller already holds.
    pub fn inline(old: Option<Bytes>, new: Option<Bytes>) -> Self {
        Self {
            old: old.map(DiffSide::Inline),
            new: new.map(DiffSide::Inline),
        }
    }
}

/// Outcome of one diff request.
///
/// When `error` is set, `ops` is empty and the line counts describe only the
/// sides that were readable text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffResult {
    pub old_line_count: usize,
    pub new_line_count: usize,
    pub ops: Vec<DiffOp>,
    pub error: Option<BatchError>,
    /// Runs beyond the configured cap were dropped.
    pub truncated: bool,
}

impl DiffResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Free the ops. Calling it again is a no-op.
    pub fn release(&mut self) {
        self.ops = Vec::new();
    }

    fn rejected(error: BatchError, old_line_count: usize, new_line_count: usize) -> Self {
        Self {
            old_line_count,
            new_line_count,
            error: Some(error),
            ..Default::default()
        }
    }
}

impl From<LineDiff> for DiffResult {
    fn from(diff: LineDiff) -> Self {
        Self {
            old_line_count: diff.old_line_count,
            new_line_count: diff.new_line_count,
            ops: diff.ops,
            error: None,
            truncated: diff.truncated,
        }
    }
}

/// Results of a `diff_many` call, in request order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiffBatch {
    pub results: Vec<DiffResult>,
    /// Number of results without an error.
    pub succeeded: usize,
}

/// A side after resolution against the store or preload set.
enum SideContent {
    Absent,
    Missing,
    Present { data: Bytes, class: Classification },
}

impl SideContent {
    fn inline(data: &Bytes) -> Self {
        Self::Present {
            data: data.clone(),
            class: classify(data),
        }
    }

    /// `Ok(None)` for an absent side, the text for a diffable one.
    fn text(&self) -> Result<Option<TextInput<'_>>, BatchError> {
        match self {
            Self::Absent => Ok(None),
            Self::Missing => Err(BatchError::Lookup),
            Self::Present { class, .. } if class.is_binary => Err(BatchError::Binary),
            Self::Present { data, class } => Ok(Some(TextInput {
                data,
                line_count: class.line_count,
            })),
        }
    }
}

/// Computes line diffs for batches of blob pairs.
pub struct DiffEngine<'s, S: ObjectStore + ?Sized> {
    store: &'s S,
    config: DiffConfig,
}

impl<'s, S: ObjectStore + ?Sized> DiffEngine<'s, S> {
    pub fn new(store: &'s S, config: DiffConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &DiffConfig {
        &self.config
    }

    /// Diff every request, returning results in request order.
    ///
    /// Never fails as a whole: every problem is attached to its own result.
    /// If no store handle can be opened, requests that need the store fail
    /// with a lookup error and the rest are still diffed. If the preload set
    /// cannot be built, each request is fetched and diffed on its own.
    pub fn diff_many(&self, requests: &[DiffRequest]) -> DiffBatch {
        if requests.is_empty() {
            return DiffBatch::default();
        }

        let reader = match self.store.open() {
            Ok(reader) => reader,
            Err(err) => {
                tracing::warn!(error = %err, requests = requests.len(), "store handle unavailable, diffing without store");
                return self.collect(requests, |_| SideContent::Missing);
            }
        };
        if let Err(err) = reader.refresh() {
            tracing::warn!(error = %err, "store refresh failed, continuing with current view");
        }

        let preloaded = PreloadSet::build(&*reader, requests);
        self.diff_preloaded(&*reader, requests, preloaded)
    }

    /// Diff against a built preload set, or fetch each side through `reader`
    /// when the set could not be built.
    fn diff_preloaded(
        &self,
        reader: &dyn ObjectReader,
        requests: &[DiffRequest],
        preloaded: BatchResult<PreloadSet>,
    ) -> DiffBatch {
        match preloaded {
            Ok(preloaded) => {
                tracing::debug!(
                    requests = requests.len(),
                    unique = preloaded.len(),
                    valid = preloaded.valid_count(),
                    "preloaded diff sides"
                );
                self.collect(requests, |id| match preloaded.get(id) {
                    Some(object) if object.valid => SideContent::Present {
                        data: object.bytes.clone(),
                        class: object.classification(),
                    },
                    _ => SideContent::Missing,
                })
            }
            Err(err) => {
                tracing::warn!(error = %err, requests = requests.len(), "preload failed, diffing pairs individually");
                self.collect(requests, |id| fetch_side(reader, id))
            }
        }
    }

    /// Diff one request, reading stored sides through `reader`.
    pub fn diff_one(&self, reader: &dyn ObjectReader, request: &DiffRequest) -> DiffResult {
        let mut lookup = |id: &ObjectId| fetch_side(reader, id);
        self.diff_request(request, &mut lookup)
    }

    fn collect<F>(&self, requests: &[DiffRequest], mut lookup: F) -> DiffBatch
    where
        F: FnMut(&ObjectId) -> SideContent,
    {
        let results: Vec<DiffResult> = requests
            .iter()
            .map(|request| self.diff_request(request, &mut lookup))
            .collect();
        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        tracing::debug!(requests = requests.len(), succeeded, "diff batch complete");
        DiffBatch { results, succeeded }
    }

    fn diff_request<F>(&self, request: &DiffRequest, lookup: &mut F) -> DiffResult
    where
        F: FnMut(&ObjectId) -> SideContent,
    {
        // The old side is checked in full before the new side is looked at.
        let old_side = resolve(request.old.as_ref(), lookup);
        let old = match old_side.text() {
            Ok(old) => old,
            Err(error) => return DiffResult::rejected(error, 0, 0),
        };
        let new_side = resolve(request.new.as_ref(), lookup);
        let new = match new_side.text() {
            Ok(new) => new,
            Err(error) => {
                return DiffResult::rejected(error, old.map_or(0, |t| t.line_count), 0)
            }
        };

        match diff_lines(old, new, &self.config) {
            Ok(diff) => diff.into(),
            Err(error) => DiffResult::rejected(
                error,
                old.map_or(0, |t| t.line_count),
                new.map_or(0, |t| t.line_count),
            ),
        }
    }
}

fn resolve<F>(side: Option<&DiffSide>, lookup: &mut F) -> SideContent
where
    F: FnMut(&ObjectId) -> SideContent,
{
    match side {
        None => SideContent::Absent,
        Some(DiffSide::Stored(id)) => lookup(id),
        Some(DiffSide::Inline(data)) => SideContent::inline(data),
    }
}

fn fetch_side(reader: &dyn ObjectReader, id: &ObjectId) -> SideContent {
    match reader.read_blob(id) {
        Ok(data) => {
            let class = classify(&data);
            SideContent::Present { data, class }
        }
        Err(err) => {
            tracing::trace!(id = %id, error = %err, "diff side lookup failed");
            SideContent::Missing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::DiffOpKind;
    use blobflow_store::{InMemoryObjectStore, ObjectKind, StoredObject};

    fn store_with(contents: &[&[u8]]) -> (InMemoryObjectStore, Vec<ObjectId>) {
        let store = InMemoryObjectStore::new();
        let ids = contents
            .iter()
            .map(|c| store.write(&StoredObject::blob(c.to_vec())).unwrap())
            .collect();
        (store, ids)
    }

    fn engine(store: &InMemoryObjectStore) -> DiffEngine<'_, InMemoryObjectStore> {
        DiffEngine::new(store, DiffConfig::default())
    }

    // -----------------------------------------------------------------------
    // Preload and dedup
    // -----------------------------------------------------------------------

    #[test]
    fn reversed_pairs_fetch_each_blob_once() {
        let (store, ids) = store_with(&[b"a\nb\nc\n", b"a\nX\nc\n"]);
        let (a, b) = (ids[0], ids[1]);

        let batch = engine(&store).diff_many(&[DiffRequest::modified(a, b), DiffRequest::modified(b, a)]);
        assert_eq!(store.read_count(), 2);
        assert_eq!(store.refresh_count(), 1);
        assert_eq!(batch.succeeded, 2);

        assert_eq!(
            batch.results[0].ops,
            vec![DiffOp::equal(1), DiffOp::delete(1), DiffOp::insert(1), DiffOp::equal(1)]
        );
        assert_eq!(batch.results[0].old_line_count, 3);
        assert_eq!(batch.results[0].new_line_count, 3);
        assert_eq!(batch.results[1].ops.len(), 4);
    }

    #[test]
    fn shared_base_against_many_candidates() {
        let (store, ids) = store_with(&[b"base\n", b"one\n", b"two\n", b"three\n"]);
        let requests: Vec<DiffRequest> = ids[1..]
            .iter()
            .map(|&candidate| DiffRequest::modified(ids[0], candidate))
            .collect();

        let batch = engine(&store).diff_many(&requests);
        assert_eq!(store.read_count(), 4);
        assert_eq!(batch.succeeded, 3);
    }

    #[test]
    fn empty_batch_does_not_open_store() {
        let store = InMemoryObjectStore::new();
        let batch = engine(&store).diff_many(&[]);
        assert!(batch.results.is_empty());
        assert_eq!(store.refresh_count(), 0);
    }

    // -----------------------------------------------------------------------
    // Additions, deletions, inline content
    // -----------------------------------------------------------------------

    #[test]
    fn pure_addition_and_deletion() {
        let (store, ids) = store_with(&[b"x\ny\n"]);
        let batch = engine(&store).diff_many(&[DiffRequest::added(ids[0]), DiffRequest::deleted(ids[0])]);

        let added = &batch.results[0];
        assert_eq!(added.ops, vec![DiffOp::insert(2)]);
        assert_eq!((added.old_line_count, added.new_line_count), (0, 2));

        let deleted = &batch.results[1];
        assert_eq!(deleted.ops, vec![DiffOp::delete(2)]);
        assert_eq!((deleted.old_line_count, deleted.new_line_count), (2, 0));
    }

    #[test]
    fn inline_sides_mix_with_stored_sides() {
        let (store, ids) = store_with(&[b"a\nb\n"]);
        let request = DiffRequest {
            old: Some(DiffSide::Stored(ids[0])),
            new: Some(DiffSide::Inline(Bytes::from_static(b"a\nb\nc\n"))),
        };
        let batch = engine(&store).diff_many(&[request]);
        assert_eq!(store.read_count(), 1);
        assert_eq!(batch.results[0].ops, vec![DiffOp::equal(2), DiffOp::insert(1)]);
    }

    // -----------------------------------------------------------------------
    // Per-pair errors
    // -----------------------------------------------------------------------

    #[test]
    fn missing_side_is_lookup_error() {
        let (store, ids) = store_with(&[b"text\n"]);
        let missing = ObjectId::from_hash([0xee; 20]);
        let batch = engine(&store).diff_many(&[
            DiffRequest::modified(ids[0], missing),
            DiffRequest::added(ids[0]),
        ]);

        assert_eq!(batch.succeeded, 1);
        let failed = &batch.results[0];
        assert_eq!(failed.error, Some(BatchError::Lookup));
        assert!(failed.ops.is_empty());
        assert_eq!(failed.old_line_count, 1);
        assert!(batch.results[1].is_ok());
    }

    #[test]
    fn non_blob_side_is_lookup_error() {
        let (store, ids) = store_with(&[b"text\n"]);
        let tree = store
            .write(&StoredObject::new(ObjectKind::Tree, &b"tree body"[..]))
            .unwrap();
        let batch = engine(&store).diff_many(&[DiffRequest::modified(tree, ids[0])]);
        assert_eq!(batch.results[0].error, Some(BatchError::Lookup));
    }

    #[test]
    fn binary_side_is_binary_error() {
        let (store, ids) = store_with(&[b"a\nb\n", b"\x00\x01\x02"]);
        let batch = engine(&store).diff_many(&[DiffRequest::modified(ids[0], ids[1])]);

        let result = &batch.results[0];
        assert_eq!(result.error, Some(BatchError::Binary));
        assert!(result.ops.is_empty());
        assert_eq!(result.old_line_count, 2);
        assert_eq!(result.new_line_count, 0);
        assert_eq!(batch.succeeded, 0);
    }

    #[test]
    fn old_side_error_is_reported_first() {
        let (store, ids) = store_with(&[b"\x00bin", b"one\ntwo\n"]);
        let (bin, text) = (ids[0], ids[1]);
        let missing = ObjectId::from_hash([1; 20]);
        let batch = engine(&store).diff_many(&[
            DiffRequest::modified(bin, missing),
            DiffRequest::modified(missing, text),
            DiffRequest::modified(missing, bin),
        ]);

        assert_eq!(batch.results[0].error, Some(BatchError::Binary));
        let second = &batch.results[1];
        assert_eq!(second.error, Some(BatchError::Lookup));
        assert_eq!((second.old_line_count, second.new_line_count), (0, 0));
        assert_eq!(batch.results[2].error, Some(BatchError::Lookup));
    }

    #[test]
    fn new_side_error_keeps_old_line_count() {
        let (store, ids) = store_with(&[b"a\nb\nc\n"]);
        let missing = ObjectId::from_hash([2; 20]);
        let batch = engine(&store).diff_many(&[DiffRequest::modified(ids[0], missing)]);
        let result = &batch.results[0];
        assert_eq!(result.error, Some(BatchError::Lookup));
        assert_eq!((result.old_line_count, result.new_line_count), (3, 0));
    }

    // -----------------------------------------------------------------------
    // Degraded paths
    // -----------------------------------------------------------------------

    #[test]
    fn offline_store_still_diffs_inline_requests() {
        let (store, ids) = store_with(&[b"a\n"]);
        store.set_available(false);

        let batch = engine(&store).diff_many(&[
            DiffRequest::added(ids[0]),
            DiffRequest::inline(None, Some(Bytes::from_static(b"z\n"))),
        ]);
        assert_eq!(batch.results.len(), 2);
        assert_eq!(batch.results[0].error, Some(BatchError::Lookup));
        assert_eq!(batch.results[1].ops, vec![DiffOp::insert(1)]);
        assert_eq!(batch.succeeded, 1);
    }

    #[test]
    fn diff_one_matches_batch_result() {
        let (store, ids) = store_with(&[b"1\n2\n3\n", b"1\n3\n4\n"]);
        let request = DiffRequest::modified(ids[0], ids[1]);
        let engine = engine(&store);

        let batch = engine.diff_many(std::slice::from_ref(&request));
        let reader = store.open().unwrap();
        let single = engine.diff_one(&*reader, &request);
        assert_eq!(batch.results[0], single);
    }

    #[test]
    fn fallback_without_preload_gives_same_batch() {
        let (store, ids) = store_with(&[b"a\nb\nc\n", b"a\nX\nc\n", b"\x00\x01", b""]);
        let (a, b, bin, empty) = (ids[0], ids[1], ids[2], ids[3]);
        let missing = ObjectId::from_hash([0x5a; 20]);
        let requests = vec![
            DiffRequest::modified(a, b),
            DiffRequest::modified(b, a),
            DiffRequest::modified(a, missing),
            DiffRequest::modified(missing, a),
            DiffRequest::modified(bin, a),
            DiffRequest::modified(a, bin),
            DiffRequest::added(b),
            DiffRequest::deleted(empty),
            DiffRequest::inline(Some(Bytes::from_static(b"x\n")), None),
        ];
        let engine = engine(&store);
        let reader = store.open().unwrap();

        let preloaded = engine.diff_preloaded(
            &*reader,
            &requests,
            PreloadSet::build(&*reader, &requests),
        );
        store.reset_counters();
        let fallback = engine.diff_preloaded(&*reader, &requests, Err(BatchError::OutOfMemory));

        assert_eq!(fallback, preloaded);
        assert_eq!(fallback.succeeded, 5);
        // Each stored side is fetched per request; the old-side error skips the new side.
        assert_eq!(store.read_count(), 12);
    }

    // -----------------------------------------------------------------------
    // Results
    // -----------------------------------------------------------------------

    #[test]
    fn run_invariant_holds_across_batch() {
        let (store, ids) = store_with(&[
            b"fn main() {\n    println!(\"hi\");\n}\n",
            b"fn main() {\n    let x = 1;\n    println!(\"{x}\");\n}\n",
            b"",
            b"only\n",
        ]);
        let mut requests = Vec::new();
        for &old in &ids {
            for &new in &ids {
                requests.push(DiffRequest::modified(old, new));
            }
        }
        let batch = engine(&store).diff_many(&requests);
        assert_eq!(batch.succeeded, requests.len());
        assert_eq!(store.read_count(), ids.len());

        for result in &batch.results {
            let old: usize = result
                .ops
                .iter()
                .filter(|op| op.kind != DiffOpKind::Insert)
                .map(|op| op.run_length)
                .sum();
            let new: usize = result
                .ops
                .iter()
                .filter(|op| op.kind != DiffOpKind::Delete)
                .map(|op| op.run_length)
                .sum();
            assert_eq!(old, result.old_line_count);
            assert_eq!(new, result.new_line_count);
        }
    }

    #[test]
    fn release_is_idempotent() {
        let (store, ids) = store_with(&[b"a\n", b"b\n"]);
        let mut batch = engine(&store).diff_many(&[DiffRequest::modified(ids[0], ids[1])]);
        let result = &mut batch.results[0];
        assert!(!result.ops.is_empty());
        result.release();
        result.release();
        assert!(result.ops.is_empty());
        assert_eq!(result.old_line_count, 1);
    }
}
