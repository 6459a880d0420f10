pub mod error;
pub mod metrics;
pub mod network;
pub mod simulation;
pub mod switch;
pub mod theory;

pub use error::SimError;
pub use metrics::MetricsCollector;
pub use simulation::{Engine, SimConfig, Simulation, Snapshot};

pub mod prelude {
    pub use crate::error::{Result, SimError};
    pub use crate::metrics::analyzer::AnalysisReport;
    pub use crate::metrics::{Counters, DerivedStats, MetricsSnapshot};
    pub use crate::network::{Packet, PacketId, PacketStatus};
    pub use crate::simulation::{Engine, SimConfig, Simulation, Snapshot, TickReport};
    pub use crate::switch::{Allocation, BandwidthAllocator};
    pub use crate::theory::TheoreticalStats;
}
