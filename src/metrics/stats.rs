use serde::{Deserialize, Serialize};

// Throughput is measured over fixed windows of simulated time
pub const THROUGHPUT_WINDOW_S: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Counters {
    pub packets_created: u64,
    pub transmissions_completed: u64,
    pub processed_packets: u64,
    pub dropped_packets: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DerivedStats {
    pub throughput_mbps: f64,
    pub utilization_pct: f64,
    pub loss_rate_pct: f64,
    pub buffer_occupancy_pct: f64,
}

/// Read-only bookkeeping over engine events. Nothing in here feeds back into admission.
#[derive(Debug, Clone)]
pub struct StatsAggregator {
    link_capacity_mbps: f64,
    bytes_in_window: u64,
    window_start: f64,
    window_closed: bool,
    current: DerivedStats,
    latency_sum_s: f64,
    latency_samples: u64,
}

impl StatsAggregator {
    pub fn new(link_capacity_bps: f64) -> Self {
        Self {
            link_capacity_mbps: link_capacity_bps / 1e6,
            bytes_in_window: 0,
            window_start: 0.0,
            window_closed: false,
            current: DerivedStats::default(),
            latency_sum_s: 0.0,
            latency_samples: 0,
        }
    }

    pub fn record_delivery(&mut self, size_bytes: u32, sojourn_s: f64) {
        self.bytes_in_window += size_bytes as u64;
        self.latency_sum_s += sojourn_s;
        self.latency_samples += 1;
    }

    pub fn update(
        &mut self,
        now: f64,
        counters: &Counters,
        buffer_len: usize,
        buffer_capacity: usize,
    ) {
        self.window_closed = false;
        if now - self.window_start >= THROUGHPUT_WINDOW_S {
            let throughput_mbps = self.bytes_in_window as f64 * 8.0 / 1e6;
            self.current.throughput_mbps = throughput_mbps;
            self.current.utilization_pct =
                (throughput_mbps / self.link_capacity_mbps * 100.0).min(100.0);
            self.bytes_in_window = 0;
            self.window_start = now;
            self.window_closed = true;
        }

        let finished = counters.processed_packets + counters.dropped_packets;
        self.current.loss_rate_pct = if finished > 0 {
            counters.dropped_packets as f64 * 100.0 / finished as f64
        } else {
            0.0
        };

        self.current.buffer_occupancy_pct = if buffer_capacity > 0 {
            buffer_len as f64 * 100.0 / buffer_capacity as f64
        } else {
            0.0
        };
    }

    pub fn current(&self) -> DerivedStats {
        self.current
    }

    pub fn bytes_in_window(&self) -> u64 {
        self.bytes_in_window
    }

    /// Did the last `update` close a throughput window?
    pub fn window_closed(&self) -> bool {
        self.window_closed
    }

    pub fn avg_latency_ms(&self) -> f64 {
        if self.latency_samples == 0 {
            return 0.0;
        }
        self.latency_sum_s / self.latency_samples as f64 * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loss_rate_is_zero_before_anything_finishes() {
        let mut stats = StatsAggregator::new(1e9);
        stats.update(0.05, &Counters::default(), 0, 50);
        assert_eq!(stats.current().loss_rate_pct, 0.0);
    }

    #[test]
    fn loss_rate_counts_drops_against_finished_packets() {
        let mut stats = StatsAggregator::new(1e9);
        let counters = Counters {
            processed_packets: 75,
            dropped_packets: 25,
            ..Default::default()
        };
        stats.update(0.05, &counters, 10, 50);
        assert_eq!(stats.current().loss_rate_pct, 25.0);
        assert_eq!(stats.current().buffer_occupancy_pct, 20.0);
    }

    #[test]
    fn throughput_only_updates_on_window_boundary() {
        let mut stats = StatsAggregator::new(1e6);
        let counters = Counters::default();

        // 62_500 bytes in one second = 0.5 Mb/s on a 1 Mb/s link
        stats.record_delivery(62_500, 0.1);
        stats.update(0.5, &counters, 0, 10);
        assert_eq!(stats.current().throughput_mbps, 0.0);
        assert!(!stats.window_closed());
        assert_eq!(stats.bytes_in_window(), 62_500);

        stats.update(1.0, &counters, 0, 10);
        assert!(stats.window_closed());
        assert_eq!(stats.current().throughput_mbps, 0.5);
        assert_eq!(stats.current().utilization_pct, 50.0);
        assert_eq!(stats.bytes_in_window(), 0);

        // nothing delivered in the next window
        stats.update(2.0, &counters, 0, 10);
        assert_eq!(stats.current().throughput_mbps, 0.0);
    }

    #[test]
    fn utilization_is_capped() {
        let mut stats = StatsAggregator::new(1e6);
        stats.record_delivery(1_000_000, 0.0);
        stats.update(1.0, &Counters::default(), 0, 10);
        assert_eq!(stats.current().utilization_pct, 100.0);
    }

    #[test]
    fn zero_capacity_buffer_reports_empty() {
        let mut stats = StatsAggregator::new(1e9);
        stats.update(0.05, &Counters::default(), 0, 0);
        assert_eq!(stats.current().buffer_occupancy_pct, 0.0);
    }

    #[test]
    fn average_latency() {
        let mut stats = StatsAggregator::new(1e9);
        stats.record_delivery(500, 0.5);
        stats.record_delivery(500, 0.7);
        assert!((stats.avg_latency_ms() - 600.0).abs() < 1e-9);
    }
}
