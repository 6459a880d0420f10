pub mod packet;
pub mod user;

pub use packet::{Packet, PacketId, PacketRegistry, PacketStatus, MAX_PACKET_SIZE, MIN_PACKET_SIZE};
pub use user::{ActivityModel, Emission, User};
