use super::MetricsSnapshot;
use anyhow::Result;
use csv::Writer;
use std::fs::File;
use std::path::Path;

pub struct MetricsLogger {
    writer: Writer<File>,
    rows: usize,
}

impl MetricsLogger {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let writer = Writer::from_path(path)?;
        Ok(Self { writer, rows: 0 })
    }

    pub fn log(&mut self, snapshot: &MetricsSnapshot) -> Result<()> {
        self.writer.serialize(snapshot)?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    pub fn log_batch(&mut self, snapshots: &[MetricsSnapshot]) -> Result<usize> {
        for snapshot in snapshots {
            self.writer.serialize(snapshot)?;
        }
        self.writer.flush()?;
        self.rows += snapshots.len();
        Ok(snapshots.len())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }
}

pub fn read_history(path: impl AsRef<Path>) -> Result<Vec<MetricsSnapshot>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{Engine, SimConfig};

    #[test]
    fn history_survives_a_csv_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("run.csv");

        let config = SimConfig::default().with_users(60, 0.2).with_seed(5);
        let mut engine = Engine::new(config).unwrap();
        let mut history = Vec::new();
        for _ in 0..30 {
            engine.step().unwrap();
            history.push(MetricsSnapshot::from(&engine.snapshot()));
        }

        let mut logger = MetricsLogger::new(&path).unwrap();
        logger.log(&history[0]).unwrap();
        assert_eq!(logger.log_batch(&history[1..]).unwrap(), 29);
        assert_eq!(logger.rows(), 30);
        drop(logger);

        let back = read_history(&path).unwrap();
        assert_eq!(back.len(), 30);
        assert_eq!(back.last().unwrap().tick, 30);
        assert_eq!(back.last().unwrap().dropped_packets, history[29].dropped_packets);
    }
}
