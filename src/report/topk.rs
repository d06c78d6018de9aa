//! Top-K selection over scored items
//!
//! Min-heap/max-heap selection keeps only K candidates while scanning,
//! O(N log K) instead of sorting the whole ledger. Ties keep ledger
//! order: the earlier item ranks first.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::experiment::ScoreType;
use crate::Error;

/// Sort order for Top-K selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending order (smallest K values)
    Ascending,
    /// Descending order (largest K values)
    Descending,
}

impl From<ScoreType> for SortOrder {
    /// Best-first order for a score type.
    fn from(score_type: ScoreType) -> Self {
        match score_type {
            ScoreType::Error => Self::Ascending,
            ScoreType::Accuracy => Self::Descending,
        }
    }
}

// Heap item ordered so the worst candidate sits at the top of the max-heap.
#[derive(Debug)]
struct HeapItem<T> {
    value: f64,
    index: usize,
    order: SortOrder,
    item: T,
}

impl<T> HeapItem<T> {
    fn worseness(&self, other: &Self) -> Ordering {
        let by_value = match self.order {
            // larger is worse
            SortOrder::Ascending => self.value.total_cmp(&other.value),
            // smaller is worse
            SortOrder::Descending => other.value.total_cmp(&self.value),
        };
        by_value.then(self.index.cmp(&other.index))
    }
}

impl<T> PartialEq for HeapItem<T> {
    fn eq(&self, other: &Self) -> bool {
        self.worseness(other) == Ordering::Equal
    }
}

impl<T> Eq for HeapItem<T> {}

impl<T> Ord for HeapItem<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.worseness(other)
    }
}

impl<T> PartialOrd for HeapItem<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Select the K best items by `key`, best first.
///
/// NaN keys are skipped.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if `k` is zero.
///
/// # Examples
///
/// ```rust
/// use deepflow::report::topk::{top_k_by, SortOrder};
///
/// let scores = [3.0, 9.0, 1.0, 7.0];
/// let best = top_k_by(scores.iter(), 2, SortOrder::Descending, |s| **s)?;
/// assert_eq!(best, vec![&9.0, &7.0]);
/// # Ok::<(), deepflow::Error>(())
/// ```
pub fn top_k_by<T, I, F>(items: I, k: usize, order: SortOrder, key: F) -> crate::Result<Vec<T>>
where
    I: IntoIterator<Item = T>,
    F: Fn(&T) -> f64,
{
    if k == 0 {
        return Err(Error::InvalidInput("k must be greater than 0".to_string()));
    }

    // Grows with the input: k may be far larger than it, up to usize::MAX.
    let mut heap: BinaryHeap<HeapItem<T>> = BinaryHeap::new();
    for (index, item) in items.into_iter().enumerate() {
        let value = key(&item);
        if value.is_nan() {
            continue;
        }
        heap.push(HeapItem {
            value,
            index,
            order,
            item,
        });
        if heap.len() > k {
            heap.pop();
        }
    }

    Ok(heap
        .into_sorted_vec()
        .into_iter()
        .map(|entry| entry.item)
        .collect())
}
