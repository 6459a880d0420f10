// Bernoulli on/off users, the whole point of statistical multiplexing

use super::packet::{MAX_PACKET_SIZE, MIN_PACKET_SIZE};
use crate::error::{Result, SimError};
use rand::Rng;
use rand_distr::{Bernoulli, Distribution, Uniform};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u32,
    active: bool,
    packets_sent: u64,
}

impl User {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            active: false,
            packets_sent: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn packets_sent(&self) -> u64 {
        self.packets_sent
    }

    // Returns the per-user sequence number of the packet being sent
    pub(crate) fn record_sent(&mut self) -> u64 {
        let seq = self.packets_sent;
        self.packets_sent += 1;
        seq
    }
}

/// A packet a user decided to send this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Emission {
    pub user_id: u32,
    pub sequence_id: u64,
    pub size_bytes: u32,
}

#[derive(Debug, Clone)]
pub struct ActivityModel {
    active: Bernoulli,
    emission: Bernoulli,
    size: Uniform<u32>,
}

impl ActivityModel {
    pub fn new(active_prob: f64, emission_prob: f64) -> Result<Self> {
        let active = Bernoulli::new(active_prob)
            .map_err(|e| SimError::config("user_active_prob", e.to_string()))?;
        let emission = Bernoulli::new(emission_prob)
            .map_err(|e| SimError::config("emission_prob", e.to_string()))?;

        Ok(Self {
            active,
            emission,
            size: Uniform::new_inclusive(MIN_PACKET_SIZE, MAX_PACKET_SIZE),
        })
    }

    /// Redraws every user's `active` flag and returns the packets they emit.
    ///
    /// Draw order is fixed (activity, then emission, then size, user by user) so a seeded rng
    /// always replays the same tick.
    pub fn draw<R: Rng + ?Sized>(&self, users: &mut [User], rng: &mut R) -> Vec<Emission> {
        let mut emissions = Vec::new();

        for user in users.iter_mut() {
            user.active = self.active.sample(rng);
            if !user.active {
                continue;
            }

            if self.emission.sample(rng) {
                let size_bytes = self.size.sample(rng);
                emissions.push(Emission {
                    user_id: user.id,
                    sequence_id: user.record_sent(),
                    size_bytes,
                });
            }
        }

        emissions
    }
}

pub fn active_count(users: &[User]) -> usize {
    users.iter().filter(|u| u.is_active()).count()
}
