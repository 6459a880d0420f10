use super::MetricsSnapshot;
use crate::simulation::SimConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub scenario_name: String,
    pub num_users: u32,
    pub user_active_prob: f64,
    pub ticks: u64,
    pub avg_throughput_mbps: f64,
    pub peak_throughput_mbps: f64,
    pub avg_utilization_pct: f64,
    pub loss_rate_pct: f64,
    pub processed_packets: u64,
    pub dropped_packets: u64,
    pub avg_buffer_occupancy_pct: f64,
    pub peak_buffer_occupancy_pct: f64,
    pub avg_active_users: f64,
    pub peak_active_users: usize,
    // share of ticks where more users were active than the link could carry at full rate
    pub contended_tick_pct: f64,
    pub avg_latency_ms: f64,
}

pub fn analyze(snapshots: &[MetricsSnapshot], config: &SimConfig) -> AnalysisReport {
    let ticks = snapshots.len();
    let n = ticks.max(1) as f64;

    // throughput only means something on the ticks that closed a window
    let windows: Vec<&MetricsSnapshot> = snapshots.iter().filter(|s| s.window_closed).collect();
    let (avg_throughput_mbps, avg_utilization_pct) = if windows.is_empty() {
        (0.0, 0.0)
    } else {
        let w = windows.len() as f64;
        (
            windows.iter().map(|s| s.throughput_mbps).sum::<f64>() / w,
            windows.iter().map(|s| s.utilization_pct).sum::<f64>() / w,
        )
    };
    let peak_throughput_mbps = windows.iter().map(|s| s.throughput_mbps).fold(0.0, f64::max);

    let last = snapshots.last();

    AnalysisReport {
        scenario_name: config.name.clone(),
        num_users: config.num_users,
        user_active_prob: config.user_active_prob,
        ticks: ticks as u64,
        avg_throughput_mbps,
        peak_throughput_mbps,
        avg_utilization_pct,
        loss_rate_pct: last.map(|s| s.loss_rate_pct).unwrap_or(0.0),
        processed_packets: last.map(|s| s.processed_packets).unwrap_or(0),
        dropped_packets: last.map(|s| s.dropped_packets).unwrap_or(0),
        avg_buffer_occupancy_pct: snapshots.iter().map(|s| s.buffer_occupancy_pct).sum::<f64>() / n,
        peak_buffer_occupancy_pct: snapshots
            .iter()
            .map(|s| s.buffer_occupancy_pct)
            .fold(0.0, f64::max),
        avg_active_users: snapshots.iter().map(|s| s.active_users as f64).sum::<f64>() / n,
        peak_active_users: snapshots.iter().map(|s| s.active_users).max().unwrap_or(0),
        contended_tick_pct: snapshots.iter().filter(|s| s.contended).count() as f64 * 100.0 / n,
        avg_latency_ms: last.map(|s| s.avg_latency_ms).unwrap_or(0.0),
    }
}

/// Folds repetitions of the same scenario into one report. Counters are averaged too.
pub fn average_reports(reports: &[AnalysisReport]) -> Option<AnalysisReport> {
    let first = reports.first()?;
    let n = reports.len() as f64;
    let mean = |f: fn(&AnalysisReport) -> f64| reports.iter().map(f).sum::<f64>() / n;

    Some(AnalysisReport {
        scenario_name: first.scenario_name.clone(),
        num_users: first.num_users,
        user_active_prob: first.user_active_prob,
        ticks: first.ticks,
        avg_throughput_mbps: mean(|r| r.avg_throughput_mbps),
        peak_throughput_mbps: reports.iter().map(|r| r.peak_throughput_mbps).fold(0.0, f64::max),
        avg_utilization_pct: mean(|r| r.avg_utilization_pct),
        loss_rate_pct: mean(|r| r.loss_rate_pct),
        processed_packets: (mean(|r| r.processed_packets as f64)).round() as u64,
        dropped_packets: (mean(|r| r.dropped_packets as f64)).round() as u64,
        avg_buffer_occupancy_pct: mean(|r| r.avg_buffer_occupancy_pct),
        peak_buffer_occupancy_pct: reports
            .iter()
            .map(|r| r.peak_buffer_occupancy_pct)
            .fold(0.0, f64::max),
        avg_active_users: mean(|r| r.avg_active_users),
        peak_active_users: reports.iter().map(|r| r.peak_active_users).max().unwrap_or(0),
        contended_tick_pct: mean(|r| r.contended_tick_pct),
        avg_latency_ms: mean(|r| r.avg_latency_ms),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(tick: u64, active: usize, window_closed: bool, throughput: f64) -> MetricsSnapshot {
        MetricsSnapshot {
            tick,
            time: tick as f64 * 0.05,
            active_users: active,
            per_user_bandwidth_mbps: 100.0,
            contended: active > 10,
            packets_created: 0,
            packets_in_system: 0,
            transmitting: 0,
            buffered: 0,
            processing: 0,
            processed_packets: tick * 2,
            dropped_packets: tick,
            throughput_mbps: throughput,
            window_closed,
            utilization_pct: throughput / 10.0,
            loss_rate_pct: 33.0,
            buffer_occupancy_pct: 50.0,
            avg_latency_ms: 500.0,
        }
    }

    #[test]
    fn throughput_averages_only_closed_windows() {
        let rows = vec![
            row(1, 4, false, 0.0),
            row(2, 12, true, 200.0),
            row(3, 8, false, 200.0),
            row(4, 16, true, 400.0),
        ];
        let report = analyze(&rows, &SimConfig::default());

        assert_eq!(report.ticks, 4);
        assert_eq!(report.avg_throughput_mbps, 300.0);
        assert_eq!(report.peak_throughput_mbps, 400.0);
        assert_eq!(report.avg_utilization_pct, 30.0);
        assert_eq!(report.avg_active_users, 10.0);
        assert_eq!(report.peak_active_users, 16);
        assert_eq!(report.contended_tick_pct, 50.0);
        assert_eq!(report.dropped_packets, 4);
    }

    #[test]
    fn empty_history_is_all_zero() {
        let report = analyze(&[], &SimConfig::default());
        assert_eq!(report.ticks, 0);
        assert_eq!(report.avg_throughput_mbps, 0.0);
        assert_eq!(report.avg_buffer_occupancy_pct, 0.0);
    }

    #[test]
    fn averaging_reports() {
        let config = SimConfig::default();
        let a = analyze(&[row(1, 4, true, 100.0)], &config);
        let b = analyze(&[row(1, 20, true, 300.0)], &config);

        let avg = average_reports(&[a, b]).unwrap();
        assert_eq!(avg.avg_throughput_mbps, 200.0);
        assert_eq!(avg.peak_active_users, 20);
        assert_eq!(avg.contended_tick_pct, 50.0);
        assert!(average_reports(&[]).is_none());
    }
}
