use super::buffer::Buffer;
use crate::error::{Result, SimError};
use crate::network::{PacketId, PacketRegistry, PacketStatus};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Delivery {
    pub id: PacketId,
    pub size_bytes: u32,
    pub sojourn: f64,
}

/// Service side of the switch: pulls packets off the buffer and walks them to the far end.
#[derive(Debug, Clone, Copy)]
pub struct Processor {
    capacity: usize,
    speed: f64,
    distance: f64,
}

impl Processor {
    pub fn new(capacity: usize, speed: f64, distance: f64) -> Self {
        Self {
            capacity,
            speed,
            distance,
        }
    }

    /// Moves every processing packet `speed * dt` along; the ones past the far end are delivered.
    /// Delivered packets stay in the registry, the engine sweeps them after the tick.
    pub fn advance(
        &self,
        packets: &mut PacketRegistry,
        dt: f64,
        now: f64,
    ) -> Result<Vec<Delivery>> {
        let step = self.speed * dt;
        let mut delivered = Vec::new();

        for packet in packets.values_mut() {
            if packet.status() != PacketStatus::Processing {
                continue;
            }
            if packet.advance(step)? > self.distance {
                packet.transition(PacketStatus::Delivered)?;
                delivered.push(Delivery {
                    id: packet.id,
                    size_bytes: packet.size_bytes,
                    sojourn: packet.sojourn_time(now),
                });
            }
        }

        Ok(delivered)
    }

    /// Dequeues up to `capacity` packets, head first, and starts processing them.
    pub fn drain(&self, buffer: &mut Buffer, packets: &mut PacketRegistry) -> Result<usize> {
        let mut dequeued = 0;

        while dequeued < self.capacity {
            let Some(id) = buffer.pop_front() else {
                break;
            };
            let packet = packets.get_mut(&id).ok_or(SimError::UnknownPacket(id))?;
            packet.transition(PacketStatus::Processing)?;
            dequeued += 1;
        }

        if dequeued > 0 {
            debug!("Processor dequeued {} packets, {} still waiting", dequeued, buffer.len());
        }

        Ok(dequeued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Packet;

    fn buffered(packets: &mut PacketRegistry, buffer: &mut Buffer, n: u64) {
        for i in 0..n {
            let id = PacketId::new(i);
            let mut packet = Packet::new(id, 0, i, 1000, 0.0);
            packet.transition(PacketStatus::Transmitting).unwrap();
            packet.transition(PacketStatus::Buffered).unwrap();
            packets.insert(id, packet);
            buffer.offer(id);
        }
    }

    #[test]
    fn drains_at_most_capacity_in_fifo_order() {
        let mut packets = PacketRegistry::new();
        let mut buffer = Buffer::new(20);
        buffered(&mut packets, &mut buffer, 12);

        let processor = Processor::new(8, 3.0, 1.4);
        assert_eq!(processor.drain(&mut buffer, &mut packets).unwrap(), 8);
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.iter().next(), Some(&PacketId::new(8)));

        let processing = packets
            .values()
            .filter(|p| p.status() == PacketStatus::Processing)
            .count();
        assert_eq!(processing, 8);
    }

    #[test]
    fn delivers_after_crossing_the_distance() {
        let mut packets = PacketRegistry::new();
        let mut buffer = Buffer::new(4);
        buffered(&mut packets, &mut buffer, 1);

        let processor = Processor::new(8, 3.0, 1.4);
        processor.drain(&mut buffer, &mut packets).unwrap();

        // 0.15 units per 50ms tick, 1.4 is crossed on the tenth tick
        for tick in 1..10 {
            let now = tick as f64 * 0.05;
            assert!(processor.advance(&mut packets, 0.05, now).unwrap().is_empty());
        }
        let delivered = processor.advance(&mut packets, 0.05, 0.5).unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].size_bytes, 1000);
        assert!((delivered[0].sojourn - 0.5).abs() < 1e-12);
        assert_eq!(packets[&PacketId::new(0)].status(), PacketStatus::Delivered);
    }

    #[test]
    fn missing_packet_is_an_invariant_fault() {
        let mut packets = PacketRegistry::new();
        let mut buffer = Buffer::new(4);
        buffer.offer(PacketId::new(99));

        let err = Processor::new(8, 3.0, 1.4)
            .drain(&mut buffer, &mut packets)
            .unwrap_err();
        assert!(matches!(err, SimError::UnknownPacket(_)));
    }
}
