use crate::error::{Result, SimError};
use serde::{Deserialize, Serialize};
use std::path::Path;

// Defaults match the classic 1 Gb/s link shared by 100 Mb/s users example
pub const DEFAULT_LINK_CAPACITY_BPS: f64 = 1e9;
pub const DEFAULT_USER_CAPACITY_BPS: f64 = 100e6;
pub const DEFAULT_USER_ACTIVE_PROB: f64 = 0.1;
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 50;
pub const DEFAULT_DT: f64 = 0.05;
pub const DEFAULT_EMISSION_PROB: f64 = 0.7;
pub const DEFAULT_PROCESSING_CAPACITY: usize = 8;
pub const DEFAULT_PROCESSING_SPEED: f64 = 3.0;
pub const DEFAULT_PROCESSING_DISTANCE: f64 = 1.4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub name: String,
    pub num_users: u32,
    pub user_active_prob: f64,
    pub link_capacity_bps: f64,
    pub user_capacity_bps: f64,
    pub max_buffer_size: usize,
    pub dt: f64,
    pub processing_capacity: usize,
    pub random_seed: Option<u64>,

    // chance an active user actually emits a packet on a given tick
    pub emission_prob: f64,
    // distance units per second, and how far a packet travels before it counts as delivered
    pub processing_speed: f64,
    pub processing_distance: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            name: "default_sim".to_string(),
            num_users: 35,
            user_active_prob: DEFAULT_USER_ACTIVE_PROB,
            link_capacity_bps: DEFAULT_LINK_CAPACITY_BPS,
            user_capacity_bps: DEFAULT_USER_CAPACITY_BPS,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            dt: DEFAULT_DT,
            processing_capacity: DEFAULT_PROCESSING_CAPACITY,
            random_seed: None,
            emission_prob: DEFAULT_EMISSION_PROB,
            processing_speed: DEFAULT_PROCESSING_SPEED,
            processing_distance: DEFAULT_PROCESSING_DISTANCE,
        }
    }
}

impl SimConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_users(mut self, num_users: u32, active_prob: f64) -> Self {
        self.num_users = num_users;
        self.user_active_prob = active_prob;
        self
    }

    pub fn with_link(mut self, link_capacity_bps: f64, user_capacity_bps: f64) -> Self {
        self.link_capacity_bps = link_capacity_bps;
        self.user_capacity_bps = user_capacity_bps;
        self
    }

    pub fn with_buffer(mut self, max_buffer_size: usize) -> Self {
        self.max_buffer_size = max_buffer_size;
        self
    }

    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    pub fn with_emission_prob(mut self, emission_prob: f64) -> Self {
        self.emission_prob = emission_prob;
        self
    }

    pub fn with_processing(mut self, capacity: usize, speed: f64, distance: f64) -> Self {
        self.processing_capacity = capacity;
        self.processing_speed = speed;
        self.processing_distance = distance;
        self
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SimConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn link_capacity_mbps(&self) -> f64 {
        self.link_capacity_bps / 1e6
    }

    /// Rejects anything the engine can't run with. There is no recovering from a bad config.
    pub fn validate(&self) -> Result<()> {
        if self.num_users == 0 {
            return Err(SimError::config("num_users", "must be greater than zero"));
        }
        if !(self.user_active_prob > 0.0 && self.user_active_prob <= 1.0) {
            return Err(SimError::config(
                "user_active_prob",
                format!("must be in (0, 1], got {}", self.user_active_prob),
            ));
        }
        if !(0.0..=1.0).contains(&self.emission_prob) {
            return Err(SimError::config(
                "emission_prob",
                format!("must be in [0, 1], got {}", self.emission_prob),
            ));
        }
        positive("link_capacity_bps", self.link_capacity_bps)?;
        positive("user_capacity_bps", self.user_capacity_bps)?;
        positive("dt", self.dt)?;
        positive("processing_speed", self.processing_speed)?;
        if self.processing_capacity == 0 {
            return Err(SimError::config("processing_capacity", "must be greater than zero"));
        }
        if !(self.processing_distance.is_finite() && self.processing_distance >= 0.0) {
            return Err(SimError::config(
                "processing_distance",
                format!(
                    "must be a finite, non-negative distance, got {}",
                    self.processing_distance
                ),
            ));
        }
        Ok(())
    }
}

// NaN fails the comparison too
fn positive(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SimError::config(field, format!("must be a finite positive number, got {}", value)))
    }
}
