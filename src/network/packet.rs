use crate::error::{Result, SimError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const MIN_PACKET_SIZE: u32 = 500;
pub const MAX_PACKET_SIZE: u32 = 1500;

/// Every packet still alive in the engine, keyed (and therefore ordered) by creation.
pub type PacketRegistry = BTreeMap<PacketId, Packet>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PacketId(u64);

impl PacketId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PacketStatus {
    Created,
    Transmitting,
    Buffered,
    Processing,
    Delivered,
    Dropped,
}

impl PacketStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Dropped)
    }

    // Created -> Transmitting -> {Buffered -> Processing -> Delivered | Dropped}
    fn can_become(&self, next: PacketStatus) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Transmitting)
                | (Self::Transmitting, Self::Buffered)
                | (Self::Transmitting, Self::Dropped)
                | (Self::Buffered, Self::Processing)
                | (Self::Processing, Self::Delivered)
        )
    }
}

impl fmt::Display for PacketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Transmitting => "transmitting",
            Self::Buffered => "buffered",
            Self::Processing => "processing",
            Self::Delivered => "delivered",
            Self::Dropped => "dropped",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Packet {
    pub id: PacketId,
    pub user_id: u32,
    pub sequence_id: u64,
    pub size_bytes: u32,
    status: PacketStatus,

    // Fractional bits carry over between ticks, bandwidth * dt is rarely a whole number
    bits_transmitted: f64,
    progress: f64,

    // Simulated seconds, not wall clock
    created_at: f64,

    // How far the packet has travelled past the switch while processing
    distance: f64,
}

impl Packet {
    pub fn new(
        id: PacketId,
        user_id: u32,
        sequence_id: u64,
        size_bytes: u32,
        created_at: f64,
    ) -> Self {
        Self {
            id,
            user_id,
            sequence_id,
            size_bytes,
            status: PacketStatus::Created,
            bits_transmitted: 0.0,
            progress: 0.0,
            created_at,
            distance: 0.0,
        }
    }

    pub fn status(&self) -> PacketStatus {
        self.status
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn bits_transmitted(&self) -> f64 {
        self.bits_transmitted
    }

    pub fn size_bits(&self) -> f64 {
        self.size_bytes as f64 * 8.0
    }

    pub fn remaining_bits(&self) -> f64 {
        (self.size_bits() - self.bits_transmitted).max(0.0)
    }

    pub fn created_at(&self) -> f64 {
        self.created_at
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Sojourn time = the total time a packet spent inside the system up to `now`.
    pub fn sojourn_time(&self, now: f64) -> f64 {
        (now - self.created_at).max(0.0)
    }

    pub fn transition(&mut self, next: PacketStatus) -> Result<()> {
        if self.status.is_terminal() {
            return Err(SimError::TerminalPacket {
                id: self.id,
                status: self.status,
            });
        }
        if !self.status.can_become(next) {
            return Err(SimError::InvalidTransition {
                id: self.id,
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Pushes `bandwidth_bps * dt` bits onto the wire. Returns true on the tick the last bit leaves.
    pub fn update_transmission(&mut self, bandwidth_bps: f64, dt: f64) -> Result<bool> {
        self.expect_status(PacketStatus::Transmitting)?;

        let bits_this_tick = (bandwidth_bps * dt).max(0.0);
        if bits_this_tick >= self.remaining_bits() {
            self.bits_transmitted = self.size_bits();
            self.progress = 1.0;
            return Ok(true);
        }

        self.bits_transmitted += bits_this_tick;
        self.progress = self.bits_transmitted / self.size_bits();
        Ok(false)
    }

    /// Moves a processing packet `delta` units further downstream, returns the total so far.
    pub fn advance(&mut self, delta: f64) -> Result<f64> {
        self.expect_status(PacketStatus::Processing)?;
        self.distance += delta.max(0.0);
        Ok(self.distance)
    }

    fn expect_status(&self, expected: PacketStatus) -> Result<()> {
        if self.status.is_terminal() {
            return Err(SimError::TerminalPacket {
                id: self.id,
                status: self.status,
            });
        }
        if self.status != expected {
            return Err(SimError::InvalidTransition {
                id: self.id,
                from: self.status,
                to: expected,
            });
        }
        Ok(())
    }
}
