pub mod config;
pub mod engine;
pub mod snapshot;

pub use config::SimConfig;
pub use engine::{Engine, TickReport};
pub use snapshot::{LoadLevel, PacketView, Snapshot};

use crate::metrics::analyzer::{self, AnalysisReport};
use crate::metrics::logger::MetricsLogger;
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// Driving loop around an Engine: tick budget, history, progress bar, result files
pub struct Simulation {
    engine: Engine,
    ticks: u64,
    show_progress: bool,
    pub metrics: MetricsCollector,
}

impl Simulation {
    pub fn new(config: SimConfig, ticks: u64) -> Result<Self> {
        Ok(Self {
            engine: Engine::new(config)?,
            ticks,
            show_progress: false,
            metrics: MetricsCollector::new(),
        })
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn config(&self) -> &SimConfig {
        self.engine.config()
    }

    pub fn run(&mut self) -> Result<AnalysisReport> {
        let config = self.engine.config().clone();
        info!("Starting simulation: {}", config.name);
        info!(
            "Users: {}, p = {}, link {:.0} Mb/s, {:.0} Mb/s per user",
            config.num_users,
            config.user_active_prob,
            config.link_capacity_mbps(),
            config.user_capacity_bps / 1e6
        );
        info!(
            "Ticks: {} x {}s, buffer {}, seed {}",
            self.ticks,
            config.dt,
            config.max_buffer_size,
            self.engine.seed()
        );

        let pb = if self.show_progress {
            let pb = ProgressBar::new(self.ticks);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40.orange/yellow} {pos}/{len} ticks {msg}")?
                    .progress_chars("█▓░"),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        for _ in 0..self.ticks {
            self.engine.step()?;
            let snapshot = self.engine.snapshot();
            self.metrics.record(MetricsSnapshot::from(&snapshot));

            pb.inc(1);
            // redrawing the message every tick is wasted work
            if snapshot.window_closed {
                pb.set_message(format!(
                    "Loss: {:.2}% | Buffer: {}/{} | {:.1} Mb/s",
                    snapshot.derived_stats.loss_rate_pct,
                    snapshot.buffer_contents.len(),
                    config.max_buffer_size,
                    snapshot.derived_stats.throughput_mbps
                ));
            }
        }
        pb.finish_with_message("Simulation complete");

        let report = analyzer::analyze(&self.metrics.get_snapshots(), &config);
        info!("Avg Throughput: {:.2} Mb/s", report.avg_throughput_mbps);
        info!("Avg Utilization: {:.1}%", report.avg_utilization_pct);
        info!(
            "Processed: {} | Dropped: {} | Loss: {:.2}%",
            report.processed_packets, report.dropped_packets, report.loss_rate_pct
        );
        if report.loss_rate_pct > snapshot::HIGH_LOSS_PCT {
            warn!(
                "High packet loss in {}: {:.2}% of finished packets were dropped",
                config.name, report.loss_rate_pct
            );
        }

        Ok(report)
    }

    /// Writes `<name>_<timestamp>.csv` and `<name>_<timestamp>_analysis.json` into `dir`.
    pub fn save_results(
        &self,
        dir: impl AsRef<Path>,
        report: &AnalysisReport,
    ) -> Result<(PathBuf, PathBuf)> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let name = &self.engine.config().name;

        let csv_path = dir.join(format!("{}_{}.csv", name, timestamp));
        let mut logger = MetricsLogger::new(&csv_path)?;
        logger.log_batch(&self.metrics.get_snapshots())?;
        info!("Results saved to: {}", csv_path.display());

        let json_path = dir.join(format!("{}_{}_analysis.json", name, timestamp));
        std::fs::write(&json_path, serde_json::to_string_pretty(report)?)?;
        info!("Analysis saved to: {}", json_path.display());

        Ok((csv_path, json_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_one_row_per_tick() {
        let config = SimConfig::default().with_users(50, 0.1).with_seed(8).with_name("unit");
        let mut sim = Simulation::new(config, 60).unwrap();
        let report = sim.run().unwrap();

        assert_eq!(sim.metrics.len(), 60);
        assert_eq!(report.ticks, 60);
        assert_eq!(report.scenario_name, "unit");
        assert_eq!(report.processed_packets, sim.engine().counters().processed_packets);
    }

    #[test]
    fn saves_csv_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let config = SimConfig::default().with_seed(2).with_name("saved");
        let mut sim = Simulation::new(config, 25).unwrap();
        let report = sim.run().unwrap();

        let (csv_path, json_path) = sim.save_results(dir.path(), &report).unwrap();
        assert!(csv_path.exists());

        let back: AnalysisReport =
            serde_json::from_str(&std::fs::read_to_string(json_path).unwrap()).unwrap();
        assert_eq!(back.scenario_name, "saved");
        assert_eq!(back.ticks, 25);
        assert_eq!(back.processed_packets, report.processed_packets);
        assert_eq!(back.dropped_packets, report.dropped_packets);
    }

    #[test]
    fn bad_config_never_starts() {
        assert!(Simulation::new(SimConfig::default().with_dt(0.0), 10).is_err());
    }
}
