//! Bounded fan-out over pre-sized work slices.

/// Run `work` on every item, splitting `items` into at most `workers`
/// contiguous shards, one scoped thread per shard.
///
/// Each thread owns a disjoint sub-slice, so results written through `&mut T`
/// need no synchronisation. Callers pass items already in locality order;
/// contiguous shards keep each thread walking ascending ids.
pub fn fan_out<T, F>(items: &mut [T], workers: usize, work: F)
where
    T: Send,
    F: Fn(&mut T) + Sync,
{
    let workers = workers.clamp(1, items.len().max(1));
    if workers == 1 {
        items.iter_mut().for_each(&work);
        return;
    }

    let shard_len = items.len().div_ceil(workers);
    let work = &work;
    std::thread::scope(|scope| {
        for shard in items.chunks_mut(shard_len) {
            scope.spawn(move || shard.iter_mut().for_each(work));
        }
    });
}
