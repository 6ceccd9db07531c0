//! Stable sorting utilities for Chamberlain.
//!
//! This module provides explicit, deterministic sorting helpers that:
//! - avoid locale-dependent ordering (keys compare byte-wise)
//! - avoid HashMap iteration
//! - make ordering rules visible and auditable

use crate::errors::{ChamberlainError, ChamberlainResult};

/// Sort a vector by a key extractor in a stable, deterministic way.
pub fn stable_sort_by_key<T, K, F>(items: &mut [T], mut key_fn: F)
where
    F: FnMut(&T) -> K,
    K: Ord,
{
    // slice::sort_by is stable.
    items.sort_by(|a, b| key_fn(a).cmp(&key_fn(b)));
}

/// Ensure a slice is sorted by key with no two equal keys.
///
/// Returns an error if a key repeats or goes backwards.
pub fn ensure_strictly_increasing<T, K, F>(items: &[T], mut key_fn: F) -> ChamberlainResult<()>
where
    F: FnMut(&T) -> K,
    K: Ord,
{
    for w in items.windows(2) {
        if key_fn(&w[0]) >= key_fn(&w[1]) {
            return Err(ChamberlainError::invariant(
                "collection is not strictly increasing",
            ));
        }
    }
    Ok(())
}
