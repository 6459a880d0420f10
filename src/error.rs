use crate::network::{PacketId, PacketStatus};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    /// Rejected at construction time, the engine never starts.
    #[error("invalid configuration: {field} {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: String,
    },

    #[error("packet {id} is already {status} and cannot change state")]
    TerminalPacket { id: PacketId, status: PacketStatus },

    #[error("packet {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: PacketId,
        from: PacketStatus,
        to: PacketStatus,
    },

    #[error("packet {0} is not in the registry")]
    UnknownPacket(PacketId),

    #[error("user {0} does not exist")]
    UnknownUser(u32),

    #[error("packet size {0} bytes is outside 500..=1500")]
    InvalidPacketSize(u32),
}

impl SimError {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }

    /// True for the faults that mean the engine itself is broken, as opposed to bad input.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::TerminalPacket { .. } | Self::InvalidTransition { .. } | Self::UnknownPacket(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
