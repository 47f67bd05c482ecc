//! Binary search over a byte range with a line-resolving comparator.
//!
//! The search walks byte positions, not line indices: each probe is expected
//! to resolve the line containing the probed byte and order that line's
//! timestamp against the needle. Because timestamps are monotonically
//! non-decreasing in file order, the per-byte comparator is a monotone step
//! function and the search converges even though many byte positions map to
//! the same line.

use std::cmp::Ordering;

/// Result of a byte-range binary search.
///
/// Replaces the negative-complement insertion-index convention with an
/// explicit variant pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Some byte of the line whose timestamp equals the needle exactly
    Found(u64),
    /// No exact match; the byte position where the needle would insert
    InsertAt(u64),
}

/// Binary-search the inclusive byte range `[low, high]`.
///
/// `probe(pos)` must order the line containing byte `pos` against the needle:
/// `Less` when the line is older, `Greater` when newer, `Equal` on an exact
/// timestamp match. Probe errors abort the search.
pub fn search_byte_range<E>(
    mut low: u64,
    mut high: u64,
    mut probe: impl FnMut(u64) -> Result<Ordering, E>,
) -> Result<SearchOutcome, E> {
    while low <= high {
        let mid = low + (high - low) / 2;
        match probe(mid)? {
            Ordering::Less => low = mid + 1,
            Ordering::Greater => match mid.checked_sub(1) {
                Some(next_high) => high = next_high,
                None => break,
            },
            Ordering::Equal => return Ok(SearchOutcome::Found(mid)),
        }
    }
    Ok(SearchOutcome::InsertAt(low))
}
