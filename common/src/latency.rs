//! Bounded latency sampling.
//!
//! Samples are kept in a fixed-capacity ring so a long-running process never
//! grows its history without bound. Only the most recent sample is needed by
//! the hot path; the rest is kept for summaries.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

pub const DEFAULT_LATENCY_CAPACITY: usize = 1_000;

const PREALLOC_LIMIT: usize = 1_024;

#[derive(Debug, Clone)]
pub struct LatencyTracker {
    samples: VecDeque<Duration>,
    capacity: usize,
}

impl Default for LatencyTracker {
    fn default() -> Self {
        Self::new(DEFAULT_LATENCY_CAPACITY)
    }
}

impl LatencyTracker {
    /// A capacity of zero is bumped to one so `latest()` stays meaningful.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity.min(PREALLOC_LIMIT)),
            capacity,
        }
    }

    /// Record `now - start` and return the sample.
    pub fn record(&mut self, start: Instant) -> Duration {
        self.record_between(start, Instant::now())
    }

    /// Record `end - start`; a reversed pair records zero.
    pub fn record_between(&mut self, start: Instant, end: Instant) -> Duration {
        let sample = end.saturating_duration_since(start);
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
        sample
    }

    /// Most recent sample, or zero if nothing has been recorded.
    pub fn latest(&self) -> Duration {
        self.samples.back().copied().unwrap_or(Duration::ZERO)
    }

    pub fn latest_secs(&self) -> f64 {
        self.latest().as_secs_f64()
    }

    pub fn mean(&self) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        let total: Duration = self.samples.iter().sum();
        Some(total / self.samples.len() as u32)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
