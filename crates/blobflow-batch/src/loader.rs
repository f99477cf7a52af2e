//! Batch blob loading in three output shapes.
//!
//! Every variant opens one store handle per call, refreshes it once, then
//! walks the requested ids in ascending order while writing each result to
//! the slot of its original request. Fetch work fans out across scoped worker
//! threads once a batch reaches [`LoaderConfig::parallel_min_batch`].

use blobflow_store::{ObjectReader, ObjectStore};
use blobflow_types::{classify, locality_order, BatchError, BatchResult, ObjectId};
use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::config::LoaderConfig;
use crate::pool::fan_out;
use crate::result::{ArenaLoad, BlobResult, LoadReport, PackedBlobResult, PackedBlobs};

/// Loads many blobs from an [`ObjectStore`] per call.
pub struct BlobLoader<'s, S: ObjectStore + ?Sized> {
    store: &'s S,
    config: LoaderConfig,
}

impl<'s, S: ObjectStore + ?Sized> BlobLoader<'s, S> {
    pub fn new(store: &'s S, config: LoaderConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Load every id into its own owned buffer.
    ///
    /// Results are in request order. Missing objects and non-blobs get a
    /// [`BatchError::Lookup`] slot; only allocation failure fails the call.
    pub fn load_many(&self, ids: &[ObjectId]) -> BatchResult<LoadReport> {
        let mut results = Vec::new();
        results.try_reserve_exact(ids.len())?;
        results.extend(ids.iter().map(|&id| BlobResult::pending(id)));

        match self.open_reader() {
            Some(reader) => {
                let mut order = locality_order(&mut results, |r| r.id)?;
                self.run(&mut order, |slot| load_owned(&*reader, slot));
            }
            None => results
                .iter_mut()
                .for_each(|r| r.error = Some(BatchError::Lookup)),
        }

        if results
            .iter()
            .any(|r| r.error == Some(BatchError::OutOfMemory))
        {
            warn!(batch = ids.len(), "blob copy allocation failed");
            return Err(BatchError::OutOfMemory);
        }

        let loaded = results.iter().filter(|r| r.is_ok()).count();
        debug!(batch = ids.len(), loaded, "loaded blobs");
        Ok(LoadReport { results, loaded })
    }

    /// Load every id into one arena sized exactly to the fetched bytes.
    ///
    /// Offsets follow ascending id order. Failed items take no space.
    pub fn load_many_packed(&self, ids: &[ObjectId]) -> BatchResult<PackedBlobs> {
        let mut staged = self.stage(ids)?;

        let total = staged
            .iter()
            .filter(|s| s.result.is_ok())
            .try_fold(0usize, |acc, s| acc.checked_add(s.bytes.len()))
            .ok_or(BatchError::OutOfMemory)?;

        let mut arena = Vec::new();
        arena.try_reserve_exact(total)?;
        arena.resize(total, 0);

        let used = {
            let order = locality_order(&mut staged, |s| s.result.id)?;
            self.copy_into(order, &mut arena)?
        };
        debug_assert_eq!(used, total);

        let results = unstage(staged)?;
        let loaded = results.iter().filter(|r| r.is_ok()).count();
        debug!(batch = ids.len(), loaded, bytes = total, "packed blobs");
        Ok(PackedBlobs {
            arena,
            results,
            loaded,
        })
    }

    /// Append every id into a caller-owned arena.
    ///
    /// Blobs are placed back-to-back from offset zero in ascending id order.
    /// A blob that does not fit is marked [`BatchError::ArenaFull`] and
    /// skipped; later, smaller blobs may still fit.
    pub fn load_many_into_arena(&self, ids: &[ObjectId], arena: &mut [u8]) -> BatchResult<ArenaLoad> {
        let mut staged = self.stage(ids)?;

        let used = {
            let order = locality_order(&mut staged, |s| s.result.id)?;
            self.copy_into(order, arena)?
        };

        let results = unstage(staged)?;
        let loaded = results.iter().filter(|r| r.is_ok()).count();
        debug!(
            batch = ids.len(),
            loaded,
            used,
            capacity = arena.len(),
            "loaded blobs into arena"
        );
        Ok(ArenaLoad {
            results,
            used,
            loaded,
        })
    }

    fn open_reader(&self) -> Option<Box<dyn ObjectReader + 's>> {
        match self.store.open() {
            Ok(reader) => {
                if let Err(err) = reader.refresh() {
                    warn!(error = %err, "store refresh failed, continuing with current view");
                }
                Some(reader)
            }
            Err(err) => {
                warn!(error = %err, "cannot open store handle, failing every item");
                None
            }
        }
    }

    fn run<T, F>(&self, items: &mut [T], work: F)
    where
        T: Send,
        F: Fn(&mut T) + Sync,
    {
        if self.config.is_parallel(items.len()) {
            trace!(items = items.len(), workers = self.config.workers, "fanning out");
            fan_out(items, self.config.workers, work);
        } else {
            items.iter_mut().for_each(work);
        }
    }

    /// Fetch phase shared by the arena variants: one shared store view per
    /// item, in request order.
    fn stage(&self, ids: &[ObjectId]) -> BatchResult<Vec<Staged>> {
        let mut staged = Vec::new();
        staged.try_reserve_exact(ids.len())?;
        staged.extend(ids.iter().map(|&id| Staged {
            result: PackedBlobResult::pending(id),
            bytes: Bytes::new(),
        }));

        match self.open_reader() {
            Some(reader) => {
                let mut order = locality_order(&mut staged, |s| s.result.id)?;
                self.run(&mut order, |slot| slot.fetch(&*reader));
            }
            None => staged
                .iter_mut()
                .for_each(|s| s.result.fail(BatchError::Lookup)),
        }
        Ok(staged)
    }

    /// Assign offsets in `order`, then copy each staged blob into its own
    /// disjoint range of `arena`. Returns the bytes written.
    fn copy_into(&self, order: Vec<&mut Staged>, arena: &mut [u8]) -> BatchResult<usize> {
        let mut jobs = Vec::new();
        jobs.try_reserve_exact(order.len())?;

        let mut remaining = arena;
        let mut offset = 0usize;
        for staged in order {
            if !staged.result.is_ok() {
                continue;
            }
            let size = staged.bytes.len();
            if size > remaining.len() {
                trace!(id = %staged.result.id, size, free = remaining.len(), "arena full");
                staged.result.fail(BatchError::ArenaFull);
                staged.bytes = Bytes::new();
                continue;
            }
            let (dest, rest) = std::mem::take(&mut remaining).split_at_mut(size);
            remaining = rest;
            staged.result.offset = offset;
            staged.result.size = size;
            offset += size;
            jobs.push(CopyJob { staged, dest });
        }

        self.run(&mut jobs, CopyJob::copy);
        Ok(offset)
    }
}

fn load_owned(reader: &dyn ObjectReader, slot: &mut BlobResult) {
    let bytes = match reader.read_blob(&slot.id) {
        Ok(bytes) => bytes,
        Err(err) => {
            trace!(id = %slot.id, error = %err, "blob lookup failed");
            slot.error = Some(BatchError::Lookup);
            return;
        }
    };

    let mut data = Vec::new();
    if data.try_reserve_exact(bytes.len()).is_err() {
        slot.error = Some(BatchError::OutOfMemory);
        return;
    }
    data.extend_from_slice(&bytes);
    let class = classify(&data);
    slot.fill(data, class);
}

/// A fetched blob waiting for its arena range.
struct Staged {
    result: PackedBlobResult,
    bytes: Bytes,
}

impl Staged {
    fn fetch(&mut self, reader: &dyn ObjectReader) {
        match reader.read_blob(&self.result.id) {
            Ok(bytes) => {
                self.result.size = bytes.len();
                self.bytes = bytes;
            }
            Err(err) => {
                trace!(id = %self.result.id, error = %err, "blob lookup failed");
                self.result.fail(BatchError::Lookup);
            }
        }
    }
}

struct CopyJob<'a> {
    staged: &'a mut Staged,
    dest: &'a mut [u8],
}

impl CopyJob<'_> {
    fn copy(&mut self) {
        self.dest.copy_from_slice(&self.staged.bytes);
        let class = classify(&*self.dest);
        self.staged.result.is_binary = class.is_binary;
        self.staged.result.line_count = class.line_count;
        self.staged.bytes = Bytes::new();
    }
}

fn unstage(staged: Vec<Staged>) -> BatchResult<Vec<PackedBlobResult>> {
    let mut results = Vec::new();
    results.try_reserve_exact(staged.len())?;
    results.extend(staged.into_iter().map(|s| s.result));
    Ok(results)
}
