// Plain drop-tail, the only place the switch loses packets

use crate::network::PacketId;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accept,
    Drop,
}

#[derive(Debug, Clone)]
pub struct Buffer {
    queue: VecDeque<PacketId>,
    capacity: usize,
    peak_len: usize,
}

impl Buffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            capacity,
            peak_len: 0,
        }
    }

    /// Enqueues at the tail if there is room, otherwise the caller has to drop the packet.
    pub fn offer(&mut self, id: PacketId) -> Admission {
        if self.queue.len() >= self.capacity {
            return Admission::Drop;
        }

        self.queue.push_back(id);
        self.peak_len = self.peak_len.max(self.queue.len());
        Admission::Accept
    }

    pub fn pop_front(&mut self) -> Option<PacketId> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.queue.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn peak_len(&self) -> usize {
        self.peak_len
    }

    // A zero sized buffer never holds anything, report it as empty rather than dividing by zero
    pub fn occupancy_pct(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.queue.len() as f64 * 100.0 / self.capacity as f64
    }

    /// Queued ids, head first.
    pub fn iter(&self) -> impl Iterator<Item = &PacketId> {
        self.queue.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u64) -> PacketId {
        PacketId::new(n)
    }

    #[test]
    fn drops_once_full() {
        let mut buffer = Buffer::new(3);
        for n in 0..3 {
            assert_eq!(buffer.offer(id(n)), Admission::Accept);
        }
        assert!(buffer.is_full());
        assert_eq!(buffer.offer(id(3)), Admission::Drop);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.occupancy_pct(), 100.0);
    }

    #[test]
    fn fifo_order() {
        let mut buffer = Buffer::new(8);
        for n in [4, 1, 9] {
            buffer.offer(id(n));
        }
        let order: Vec<u64> = buffer.iter().map(|p| p.value()).collect();
        assert_eq!(order, vec![4, 1, 9]);

        assert_eq!(buffer.pop_front(), Some(id(4)));
        assert_eq!(buffer.pop_front(), Some(id(1)));
        assert_eq!(buffer.pop_front(), Some(id(9)));
        assert_eq!(buffer.pop_front(), None);
        assert_eq!(buffer.peak_len(), 3);
    }

    #[test]
    fn zero_capacity_drops_everything() {
        let mut buffer = Buffer::new(0);
        assert_eq!(buffer.offer(id(0)), Admission::Drop);
        assert!(buffer.is_empty());
        assert_eq!(buffer.occupancy_pct(), 0.0);
    }

    #[test]
    fn huge_capacity_costs_nothing_until_used() {
        let mut buffer = Buffer::new(1usize << 40);
        assert_eq!(buffer.capacity(), 1usize << 40);
        assert_eq!(buffer.offer(id(0)), Admission::Accept);
        assert_eq!(buffer.len(), 1);
        assert!(!buffer.is_full());
    }
}
