use serde::{Deserialize, Serialize};

/// What each active sender gets for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Allocation {
    pub active_count: usize,
    pub per_user_bps: f64,
    // true when demand exceeded the link and everyone got squeezed
    pub contended: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct BandwidthAllocator {
    link_capacity_bps: f64,
    user_capacity_bps: f64,
}

impl BandwidthAllocator {
    pub fn new(link_capacity_bps: f64, user_capacity_bps: f64) -> Self {
        Self {
            link_capacity_bps,
            user_capacity_bps,
        }
    }

    /// How many users can send at full rate before the link saturates (1 Gb/s / 100 Mb/s = 10).
    pub fn max_uncontended_users(&self) -> f64 {
        self.link_capacity_bps / self.user_capacity_bps
    }

    /// Equal share among the senders active right now. Nothing carries over between ticks.
    pub fn allocate(&self, active_count: usize) -> Allocation {
        if active_count == 0 {
            return Allocation::default();
        }

        let demand = active_count as f64 * self.user_capacity_bps;
        if demand <= self.link_capacity_bps {
            Allocation {
                active_count,
                per_user_bps: self.user_capacity_bps,
                contended: false,
            }
        } else {
            Allocation {
                active_count,
                per_user_bps: self.link_capacity_bps / active_count as f64,
                contended: true,
            }
        }
    }
}
