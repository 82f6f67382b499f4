//! Lifecycle Statistics
//!
//! Counters for allocation, finalization and deallocation. Each counter
//! sits on its own cache line so that threads allocating concurrently do not
//! contend on a shared line.

use crossbeam::utils::CachePadded;
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// LifecycleStats - statistics collector
pub struct LifecycleStats {
    zeroed_allocations: CachePadded<AtomicU64>,
    non_zeroed_allocations: CachePadded<AtomicU64>,
    bytes_allocated: CachePadded<AtomicU64>,
    objects_finalized: CachePadded<AtomicU64>,
    properties_torn_down: CachePadded<AtomicU64>,
    objects_deallocated: CachePadded<AtomicU64>,
}

impl LifecycleStats {
    pub fn new() -> Self {
        Self {
            zeroed_allocations: CachePadded::new(AtomicU64::new(0)),
            non_zeroed_allocations: CachePadded::new(AtomicU64::new(0)),
            bytes_allocated: CachePadded::new(AtomicU64::new(0)),
            objects_finalized: CachePadded::new(AtomicU64::new(0)),
            properties_torn_down: CachePadded::new(AtomicU64::new(0)),
            objects_deallocated: CachePadded::new(AtomicU64::new(0)),
        }
    }

    /// Record an allocation of `size` bytes
    pub fn record_allocation(&self, size: usize, zeroed: bool) {
        if zeroed {
            self.zeroed_allocations.fetch_add(1, Ordering::Relaxed);
        } else {
            self.non_zeroed_allocations.fetch_add(1, Ordering::Relaxed);
        }
        self.bytes_allocated.fetch_add(size as u64, Ordering::Relaxed);
    }

    /// Record a finalize call that visited `properties` properties
    pub fn record_finalization(&self, properties: usize) {
        self.objects_finalized.fetch_add(1, Ordering::Relaxed);
        self.properties_torn_down
            .fetch_add(properties as u64, Ordering::Relaxed);
    }

    pub fn record_deallocation(&self) {
        self.objects_deallocated.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        let zeroed = self.zeroed_allocations.load(Ordering::Relaxed);
        let non_zeroed = self.non_zeroed_allocations.load(Ordering::Relaxed);
        let deallocated = self.objects_deallocated.load(Ordering::Relaxed);

        StatsSnapshot {
            zeroed_allocations: zeroed,
            non_zeroed_allocations: non_zeroed,
            bytes_allocated: self.bytes_allocated.load(Ordering::Relaxed),
            objects_finalized: self.objects_finalized.load(Ordering::Relaxed),
            properties_torn_down: self.properties_torn_down.load(Ordering::Relaxed),
            objects_deallocated: deallocated,
            live_objects: (zeroed + non_zeroed).saturating_sub(deallocated),
        }
    }
}

impl Default for LifecycleStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy of the lifecycle counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub zeroed_allocations: u64,
    pub non_zeroed_allocations: u64,
    pub bytes_allocated: u64,
    pub objects_finalized: u64,
    pub properties_torn_down: u64,
    pub objects_deallocated: u64,
    pub live_objects: u64,
}

impl StatsSnapshot {
    /// Total objects allocated
    pub fn objects_allocated(&self) -> u64 {
        self.zeroed_allocations + self.non_zeroed_allocations
    }

    fn metrics(&self) -> IndexMap<&'static str, u64> {
        let mut metrics = IndexMap::new();
        metrics.insert("orc_objects_allocated_zeroed_total", self.zeroed_allocations);
        metrics.insert("orc_objects_allocated_non_zeroed_total", self.non_zeroed_allocations);
        metrics.insert("orc_bytes_allocated_total", self.bytes_allocated);
        metrics.insert("orc_objects_finalized_total", self.objects_finalized);
        metrics.insert("orc_properties_torn_down_total", self.properties_torn_down);
        metrics.insert("orc_objects_deallocated_total", self.objects_deallocated);
        metrics.insert("orc_live_objects", self.live_objects);
        metrics
    }

    /// Export to Prometheus text format
    pub fn to_prometheus(&self) -> String {
        self.metrics()
            .iter()
            .map(|(name, value)| format!("{} {}\n", name, value))
            .collect()
    }

    /// Export to JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
