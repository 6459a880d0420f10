pub mod analyzer;
pub mod logger;
pub mod stats;

pub use stats::{Counters, DerivedStats, StatsAggregator};

use crate::network::PacketStatus;
use crate::simulation::Snapshot;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// One flat row per tick, flat so it goes straight into a csv
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub tick: u64,
    pub time: f64,
    pub active_users: usize,
    pub per_user_bandwidth_mbps: f64,
    pub contended: bool,
    pub packets_created: u64,
    pub packets_in_system: usize,
    pub transmitting: usize,
    pub buffered: usize,
    pub processing: usize,
    pub processed_packets: u64,
    pub dropped_packets: u64,
    pub throughput_mbps: f64,
    pub window_closed: bool,
    pub utilization_pct: f64,
    pub loss_rate_pct: f64,
    pub buffer_occupancy_pct: f64,
    pub avg_latency_ms: f64,
}

impl From<&Snapshot> for MetricsSnapshot {
    fn from(snap: &Snapshot) -> Self {
        Self {
            tick: snap.tick,
            time: snap.time,
            active_users: snap.active_users.len(),
            per_user_bandwidth_mbps: snap.allocation.per_user_bps / 1e6,
            contended: snap.allocation.contended,
            packets_created: snap.counters.packets_created,
            packets_in_system: snap.packets_in_system(),
            transmitting: snap.count(PacketStatus::Transmitting),
            buffered: snap.buffer_contents.len(),
            processing: snap.count(PacketStatus::Processing),
            processed_packets: snap.counters.processed_packets,
            dropped_packets: snap.counters.dropped_packets,
            throughput_mbps: snap.derived_stats.throughput_mbps,
            window_closed: snap.window_closed,
            utilization_pct: snap.derived_stats.utilization_pct,
            loss_rate_pct: snap.derived_stats.loss_rate_pct,
            buffer_occupancy_pct: snap.derived_stats.buffer_occupancy_pct,
            avg_latency_ms: snap.avg_latency_ms,
        }
    }
}

/// Per-tick history. Cheap to clone; clones share the same history so a reporter can read while
/// the runner records.
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    inner: Arc<RwLock<Vec<MetricsSnapshot>>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, snapshot: MetricsSnapshot) {
        self.inner.write().push(snapshot);
    }

    pub fn latest(&self) -> Option<MetricsSnapshot> {
        self.inner.read().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn get_snapshots(&self) -> Vec<MetricsSnapshot> {
        self.inner.read().clone()
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }
}
