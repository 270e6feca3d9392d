use std::collections::VecDeque;

use crate::types::MetricsRecord;

pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

// Larger buffers grow on demand instead of reserving everything up front.
const PREALLOC_LIMIT: usize = 1_024;

/// Fixed-capacity, insertion-ordered history of tick metrics.
///
/// Oldest records are evicted first once `capacity` is reached.
#[derive(Debug, Clone)]
pub struct MetricsBuffer {
    records: VecDeque<MetricsRecord>,
    capacity: usize,
}

/// Read-time view of the buffer plus derived presentation series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsHistory {
    pub records: Vec<MetricsRecord>,
    /// `records[i].latency_secs` in milliseconds.
    pub latency_ms: Vec<f64>,
}

impl Default for MetricsBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl MetricsBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity.min(PREALLOC_LIMIT)),
            capacity,
        }
    }

    /// Append `record`, returning the evicted record if the buffer was full.
    pub fn add(&mut self, record: MetricsRecord) -> Option<MetricsRecord> {
        let evicted = if self.records.len() == self.capacity {
            self.records.pop_front()
        } else {
            None
        };
        self.records.push_back(record);
        evicted
    }

    pub fn snapshot(&self) -> MetricsHistory {
        let records: Vec<MetricsRecord> = self.records.iter().cloned().collect();
        let latency_ms = records.iter().map(MetricsRecord::latency_ms).collect();
        MetricsHistory {
            records,
            latency_ms,
        }
    }

    pub fn records(&self) -> Vec<MetricsRecord> {
        self.records.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<&MetricsRecord> {
        self.records.back()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
