//! Locality ordering and deduplication of object identifiers.
//!
//! Pack-backed stores serve objects far faster when neighbouring requests
//! land in the same pack window, so every batch walks its identifiers in
//! ascending byte order. Results must still be delivered in request order;
//! the helpers here keep the mapping back to the caller's slot.

use crate::error::BatchResult;
use crate::object::ObjectId;

/// An identifier paired with its position in the caller's request slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexedId {
    pub id: ObjectId,
    pub index: usize,
}

/// Project `ids` into ascending id order, remembering each original index.
///
/// Duplicates are kept and ordered by original index, so the projection is
/// deterministic.
pub fn sort_indexed(ids: &[ObjectId]) -> BatchResult<Vec<IndexedId>> {
    let mut sorted = Vec::new();
    sorted.try_reserve_exact(ids.len())?;
    sorted.extend(
        ids.iter()
            .enumerate()
            .map(|(index, &id)| IndexedId { id, index }),
    );
    sorted.sort_unstable_by(|a, b| a.id.cmp(&b.id).then(a.index.cmp(&b.index)));
    Ok(sorted)
}

/// Sort and deduplicate in place, returning the unique set.
pub fn unique_sorted(mut ids: Vec<ObjectId>) -> Vec<ObjectId> {
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Binary search over a sorted, deduplicated id list.
pub fn find_sorted(sorted: &[ObjectId], id: &ObjectId) -> Option<usize> {
    sorted.binary_search(id).ok()
}

/// Borrow every slot mutably, permuted into ascending id order.
///
/// Each returned reference still points at the slot for its original request,
/// so workers handed disjoint sub-slices of the permutation write to disjoint
/// slots without any further bookkeeping.
pub fn locality_order<T, F>(slots: &mut [T], key: F) -> BatchResult<Vec<&mut T>>
where
    F: Fn(&T) -> ObjectId,
{
    let mut order = Vec::new();
    order.try_reserve_exact(slots.len())?;
    order.extend(slots.iter_mut());
    // Stable: equal ids stay in request order.
    order.sort_by_key(|slot| key(&**slot));
    Ok(order)
}
