//! Chart page planning
//!
//! A ranked result set with hundreds of modules does not fit on one readable
//! chart. The planner splits the ranking into contiguous pages, either into a
//! fixed number of pages of near-equal size or into pages of a target row
//! count.

use crate::error::UsageError;
use std::num::NonZeroUsize;
use std::ops::Range;

/// Rows per chart when neither limit is configured.
pub const DEFAULT_MAX_ROWS: usize = 13;

/// Which limit drives the page split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartLimit {
    /// At most this many pages, balanced to within one row.
    Pages(NonZeroUsize),
    /// Pages of at least this many rows.
    Rows(NonZeroUsize),
}

impl Default for ChartLimit {
    fn default() -> Self {
        ChartLimit::Rows(NonZeroUsize::new(DEFAULT_MAX_ROWS).unwrap_or(NonZeroUsize::MIN))
    }
}

impl ChartLimit {
    /// Validates the `max_charts` / `max_rows` pair coming from CLI or config.
    pub fn from_options(max_charts: Option<usize>, max_rows: Option<usize>) -> Result<Self, UsageError> {
        match (max_charts, max_rows) {
            (Some(_), Some(_)) => Err(UsageError::InvalidConfiguration(
                "max charts and max rows cannot both be set".to_string(),
            )),
            (Some(pages), None) => NonZeroUsize::new(pages)
                .map(ChartLimit::Pages)
                .ok_or_else(|| UsageError::InvalidConfiguration("max charts must be at least 1".to_string())),
            (None, Some(rows)) => NonZeroUsize::new(rows)
                .map(ChartLimit::Rows)
                .ok_or_else(|| UsageError::InvalidConfiguration("max rows must be at least 1".to_string())),
            (None, None) => Ok(ChartLimit::default()),
        }
    }

    pub fn plan(&self, total: usize) -> BucketPlan {
        let sizes = match *self {
            ChartLimit::Pages(pages) => page_sizes(total, pages),
            ChartLimit::Rows(rows) => capacity_sizes(total, rows),
        };
        sizes_to_buckets(&sizes)
    }
}

/// Contiguous index range over a ranked sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    pub floor: usize,
    pub len: usize,
}

impl Bucket {
    /// Last index covered, `None` for the empty bucket.
    pub fn ceiling(&self) -> Option<usize> {
        (self.len > 0).then(|| self.floor + self.len - 1)
    }

    pub fn range(&self) -> Range<usize> {
        self.floor..self.floor + self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketPlan {
    buckets: Vec<Bucket>,
}

impl BucketPlan {
    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.buckets.iter().map(|bucket| bucket.len).collect()
    }

    /// Items covered by the plan.
    pub fn total(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.len).sum()
    }

    /// Cuts `items` into the planned pages. Pages past the end of `items` are clamped.
    pub fn pages<'a, T>(&'a self, items: &'a [T]) -> impl Iterator<Item = &'a [T]> + 'a {
        self.buckets.iter().map(move |bucket| {
            let start = bucket.floor.min(items.len());
            let end = (bucket.floor + bucket.len).min(items.len());
            &items[start..end]
        })
    }
}

/// Splits `total` items into exactly `pages` buckets whose sizes differ by at most one.
///
/// The larger buckets come last: 31 items over 7 pages gives `[4, 4, 4, 4, 5, 5, 5]`.
/// With fewer items than pages only `total` single-item buckets are returned.
pub fn distribute_by_pages(total: usize, pages: usize) -> Result<Vec<usize>, UsageError> {
    let pages = NonZeroUsize::new(pages)
        .ok_or_else(|| UsageError::InvalidConfiguration("page count must be at least 1".to_string()))?;
    Ok(page_sizes(total, pages))
}

/// Splits `total` items into pages of `capacity`, spreading the remainder.
///
/// `total / capacity` pages are created and the `total % capacity` leftover
/// items are handed out one per page from the first page on, wrapping around
/// when there are more leftovers than pages. 31 items at capacity 7 gives
/// `[8, 8, 8, 7]`.
pub fn distribute_by_capacity(total: usize, capacity: usize) -> Result<Vec<usize>, UsageError> {
    let capacity = NonZeroUsize::new(capacity)
        .ok_or_else(|| UsageError::InvalidConfiguration("page capacity must be at least 1".to_string()))?;
    Ok(capacity_sizes(total, capacity))
}

fn page_sizes(total: usize, pages: NonZeroUsize) -> Vec<usize> {
    let pages = pages.get();
    if total == 0 {
        return vec![0];
    }
    if total < pages {
        return vec![1; total];
    }

    let base = total / pages;
    let extra = total % pages;
    let mut sizes = vec![base; pages];
    for size in sizes.iter_mut().skip(pages - extra) {
        *size += 1;
    }
    sizes
}

fn capacity_sizes(total: usize, capacity: NonZeroUsize) -> Vec<usize> {
    let capacity = capacity.get();
    if total == 0 {
        return vec![0];
    }
    if total < capacity {
        return vec![total];
    }

    let pages = total / capacity;
    let extra = total % capacity;
    let mut sizes = vec![capacity; pages];
    for i in 0..extra {
        sizes[i % pages] += 1;
    }
    sizes
}

/// Turns bucket sizes into contiguous ranges starting at index 0.
pub fn sizes_to_buckets(sizes: &[usize]) -> BucketPlan {
    let mut floor = 0;
    let buckets = sizes
        .iter()
        .map(|&len| {
            let bucket = Bucket { floor, len };
            floor += len;
            bucket
        })
        .collect();
    BucketPlan { buckets }
}
