use crate::metrics::{Counters, DerivedStats};
use crate::network::{PacketId, PacketStatus};
use crate::switch::Allocation;
use serde::{Deserialize, Serialize};

// Thresholds used to label the system state in reports
pub const WARNING_UTILIZATION_PCT: f64 = 70.0;
pub const CRITICAL_UTILIZATION_PCT: f64 = 90.0;
pub const HIGH_LOSS_PCT: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadLevel {
    Normal,
    Warning,
    Critical,
}

impl LoadLevel {
    pub fn from_utilization(utilization_pct: f64) -> Self {
        if utilization_pct > CRITICAL_UTILIZATION_PCT {
            Self::Critical
        } else if utilization_pct > WARNING_UTILIZATION_PCT {
            Self::Warning
        } else {
            Self::Normal
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacketView {
    pub id: PacketId,
    pub user_id: u32,
    pub status: PacketStatus,
    pub progress: f64,
    pub size_bytes: u32,
}

/// Copy of the engine state after a tick. Renderers and reporters only ever see this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: u64,
    pub time: f64,
    pub active_users: Vec<u32>,
    pub packets: Vec<PacketView>,
    pub buffer_contents: Vec<PacketId>,
    pub counters: Counters,
    pub derived_stats: DerivedStats,
    pub allocation: Allocation,
    pub window_closed: bool,
    pub avg_latency_ms: f64,
    pub load_level: LoadLevel,
    pub high_loss: bool,
}

impl Snapshot {
    pub fn count(&self, status: PacketStatus) -> usize {
        self.packets.iter().filter(|p| p.status == status).count()
    }

    pub fn packets_in_system(&self) -> usize {
        self.packets.len()
    }
}
