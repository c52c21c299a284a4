//! Sample index for position lookups
//!
//! Built once per loaded route. Exact lookups go through a key map since
//! routes may be filtered and sparse; nearest lookups binary search the
//! ordered sample sequence.

use std::sync::Arc;

use ahash::AHashMap;

use crate::{RouteError, Sample};

/// Ordered, immutable sample sequence of one route
#[derive(Debug, Clone, Default)]
pub struct SampleIndex {
    samples: Vec<Arc<Sample>>,
    /// Sample index -> position in `samples`
    by_key: AHashMap<u64, usize>,
}

impl SampleIndex {
    /// Create an index, checking that indices ascend strictly and
    /// timestamps never go backwards
    pub fn new(samples: Vec<Sample>) -> crate::Result<Self> {
        let mut by_key = AHashMap::with_capacity(samples.len());

        for (position, pair) in samples.windows(2).enumerate() {
            let (previous, current) = (&pair[0], &pair[1]);
            if current.index <= previous.index {
                return Err(RouteError::IndexNotAscending {
                    position: position + 1,
                    previous: previous.index,
                    index: current.index,
                });
            }
            if current.timestamp < previous.timestamp {
                return Err(RouteError::TimestampDecreasing {
                    position: position + 1,
                    previous: previous.timestamp,
                    timestamp: current.timestamp,
                });
            }
        }

        let samples: Vec<Arc<Sample>> = samples.into_iter().map(Arc::new).collect();
        for (position, sample) in samples.iter().enumerate() {
            by_key.insert(sample.index, position);
        }

        Ok(Self { samples, by_key })
    }

    /// An index with no samples; every lookup misses
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Arc<Sample>] {
        &self.samples
    }

    pub fn first(&self) -> Option<&Arc<Sample>> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&Arc<Sample>> {
        self.samples.last()
    }

    /// First and last timestamp of the route
    pub fn time_span(&self) -> Option<(i64, i64)> {
        Some((self.first()?.timestamp, self.last()?.timestamp))
    }

    /// Position of a sample in the ordered sequence, by its index key
    pub fn position_of(&self, index: u64) -> Option<usize> {
        self.by_key.get(&index).copied()
    }

    /// Sample whose own `index` equals `index`
    pub fn by_exact_index(&self, index: u64) -> Option<Arc<Sample>> {
        self.position_of(index).map(|position| self.samples[position].clone())
    }

    /// Closest sample by index, clamped to the route boundaries.
    ///
    /// Accepts fractional indices; ties go to the lower index.
    pub fn nearest_by_index(&self, index: f64) -> Option<Arc<Sample>> {
        if index.is_nan() {
            return None;
        }
        let first = self.first()?;
        let last = self.last()?;

        if index <= first.index as f64 {
            return Some(first.clone());
        }
        if index >= last.index as f64 {
            return Some(last.clone());
        }

        // first.index < index < last.index, so 0 < upper < len
        let upper = self.samples.partition_point(|s| (s.index as f64) < index);
        let above = &self.samples[upper];
        let below = &self.samples[upper - 1];

        if index - below.index as f64 <= above.index as f64 - index {
            Some(below.clone())
        } else {
            Some(above.clone())
        }
    }

    /// Closest sample by timestamp.
    ///
    /// Lower-bound search, then the predecessor wins when it is at least as
    /// close as the found sample.
    pub fn nearest_by_timestamp(&self, timestamp: i64) -> Option<Arc<Sample>> {
        if self.samples.is_empty() {
            return None;
        }

        let lower = self.samples.partition_point(|s| s.timestamp < timestamp);
        if lower == 0 {
            return Some(self.samples[0].clone());
        }
        if lower == self.samples.len() {
            return self.last().cloned();
        }

        let found = &self.samples[lower];
        let previous = &self.samples[lower - 1];
        if (timestamp - previous.timestamp).abs() <= (found.timestamp - timestamp).abs() {
            Some(previous.clone())
        } else {
            Some(found.clone())
        }
    }
}
