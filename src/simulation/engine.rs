use super::config::SimConfig;
use super::snapshot::{LoadLevel, PacketView, Snapshot, HIGH_LOSS_PCT};
use crate::error::{Result, SimError};
use crate::metrics::{Counters, DerivedStats, StatsAggregator};
use crate::network::user::active_count;
use crate::network::{
    ActivityModel, Packet, PacketId, PacketRegistry, PacketStatus, User, MAX_PACKET_SIZE,
    MIN_PACKET_SIZE,
};
use crate::switch::{Admission, Allocation, BandwidthAllocator, Buffer, Processor};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// What happened during one call to [`Engine::step`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickReport {
    pub tick: u64,
    pub time: f64,
    pub allocation: Allocation,
    pub created: usize,
    pub completed: usize,
    pub buffered: usize,
    pub dropped: usize,
    pub dequeued: usize,
    pub delivered: usize,
}

/// The switch. Owns every user, packet and the buffer; only `step` mutates them.
#[derive(Debug, Clone)]
pub struct Engine {
    config: SimConfig,
    seed: u64,
    rng: ChaCha8Rng,

    users: Vec<User>,
    activity: ActivityModel,
    allocator: BandwidthAllocator,
    buffer: Buffer,
    processor: Processor,
    packets: PacketRegistry,
    next_packet_id: u64,

    counters: Counters,
    stats: StatsAggregator,
    allocation: Allocation,
    tick: u64,
    time: f64,
}

impl Engine {
    pub fn new(config: SimConfig) -> Result<Self> {
        let seed = config.random_seed.unwrap_or_else(rand::random::<u64>);
        Self::with_rng(config, seed, ChaCha8Rng::seed_from_u64(seed))
    }

    /// Builds an engine around an rng the caller already set up. `seed` is only kept for reporting.
    pub fn with_rng(config: SimConfig, seed: u64, rng: ChaCha8Rng) -> Result<Self> {
        config.validate()?;

        let activity = ActivityModel::new(config.user_active_prob, config.emission_prob)?;
        let allocator = BandwidthAllocator::new(config.link_capacity_bps, config.user_capacity_bps);
        let processor = Processor::new(
            config.processing_capacity,
            config.processing_speed,
            config.processing_distance,
        );

        Ok(Self {
            users: (0..config.num_users).map(User::new).collect(),
            activity,
            allocator,
            buffer: Buffer::new(config.max_buffer_size),
            processor,
            packets: PacketRegistry::new(),
            next_packet_id: 0,
            counters: Counters::default(),
            stats: StatsAggregator::new(config.link_capacity_bps),
            allocation: Allocation::default(),
            tick: 0,
            time: 0.0,
            seed,
            rng,
            config,
        })
    }

    /// Runs one tick. The order below is fixed; determinism depends on it.
    pub fn step(&mut self) -> Result<TickReport> {
        let dt = self.config.dt;

        // 1. clock
        self.tick += 1;
        self.time = self.tick as f64 * dt;
        let mut report = TickReport {
            tick: self.tick,
            time: self.time,
            ..Default::default()
        };

        // 2. who is talking this tick
        let emissions = self.activity.draw(&mut self.users, &mut self.rng);
        for emission in &emissions {
            self.spawn(emission.user_id, emission.sequence_id, emission.size_bytes)?;
        }
        report.created = emissions.len();

        // 3. share the link among them
        let allocation = self.allocator.allocate(active_count(&self.users));
        if allocation.contended {
            debug!(
                "Tick {}: {} active users over capacity, {:.2} Mb/s each",
                self.tick,
                allocation.active_count,
                allocation.per_user_bps / 1e6
            );
        }
        self.allocation = allocation;
        report.allocation = allocation;

        // Terminal packets are collected here and swept once the tick is done
        let mut finished: Vec<PacketId> = Vec::new();

        // 4. push bits, completed packets go to the buffer or get dropped
        for packet in self.packets.values_mut() {
            if packet.status() != PacketStatus::Transmitting {
                continue;
            }
            if !packet.update_transmission(allocation.per_user_bps, dt)? {
                continue;
            }

            self.counters.transmissions_completed += 1;
            report.completed += 1;

            match self.buffer.offer(packet.id) {
                Admission::Accept => {
                    packet.transition(PacketStatus::Buffered)?;
                    report.buffered += 1;
                }
                Admission::Drop => {
                    packet.transition(PacketStatus::Dropped)?;
                    self.counters.dropped_packets += 1;
                    report.dropped += 1;
                    finished.push(packet.id);
                }
            }
        }
        if report.dropped > 0 {
            debug!(
                "Tick {}: buffer full ({}/{}), dropped {} packets",
                self.tick,
                self.buffer.len(),
                self.buffer.capacity(),
                report.dropped
            );
        }

        // 5. service: finish in-flight processing, then pull the next batch off the buffer
        let deliveries = self.processor.advance(&mut self.packets, dt, self.time)?;
        for delivery in &deliveries {
            self.counters.processed_packets += 1;
            self.stats.record_delivery(delivery.size_bytes, delivery.sojourn);
            finished.push(delivery.id);
        }
        report.delivered = deliveries.len();
        report.dequeued = self.processor.drain(&mut self.buffer, &mut self.packets)?;

        for id in &finished {
            self.packets.remove(id);
        }

        // 6. statistics, strictly read-only with respect to the above
        self.stats.update(self.time, &self.counters, self.buffer.len(), self.buffer.capacity());

        Ok(report)
    }

    pub fn run(&mut self, ticks: u64) -> Result<()> {
        for _ in 0..ticks {
            self.step()?;
        }
        Ok(())
    }

    /// Adds a packet outside the random activity model, for scripted traffic.
    /// It starts transmitting on the next tick.
    pub fn inject_packet(&mut self, user_id: u32, size_bytes: u32) -> Result<PacketId> {
        if !(MIN_PACKET_SIZE..=MAX_PACKET_SIZE).contains(&size_bytes) {
            return Err(SimError::InvalidPacketSize(size_bytes));
        }
        let user = self
            .users
            .get_mut(user_id as usize)
            .ok_or(SimError::UnknownUser(user_id))?;
        let sequence_id = user.record_sent();
        self.spawn(user_id, sequence_id, size_bytes)
    }

    fn spawn(&mut self, user_id: u32, sequence_id: u64, size_bytes: u32) -> Result<PacketId> {
        let id = PacketId::new(self.next_packet_id);
        self.next_packet_id += 1;

        let mut packet = Packet::new(id, user_id, sequence_id, size_bytes, self.time);
        packet.transition(PacketStatus::Transmitting)?;
        self.packets.insert(id, packet);
        self.counters.packets_created += 1;
        Ok(id)
    }

    pub fn snapshot(&self) -> Snapshot {
        let derived_stats = self.stats.current();
        Snapshot {
            tick: self.tick,
            time: self.time,
            active_users: self.users.iter().filter(|u| u.is_active()).map(|u| u.id).collect(),
            packets: self
                .packets
                .values()
                .map(|p| PacketView {
                    id: p.id,
                    user_id: p.user_id,
                    status: p.status(),
                    progress: p.progress(),
                    size_bytes: p.size_bytes,
                })
                .collect(),
            buffer_contents: self.buffer.iter().copied().collect(),
            counters: self.counters,
            derived_stats,
            allocation: self.allocation,
            window_closed: self.stats.window_closed(),
            avg_latency_ms: self.stats.avg_latency_ms(),
            load_level: LoadLevel::from_utilization(derived_stats.utilization_pct),
            high_loss: derived_stats.loss_rate_pct > HIGH_LOSS_PCT,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn packets(&self) -> impl Iterator<Item = &Packet> {
        self.packets.values()
    }

    pub fn packet(&self, id: PacketId) -> Option<&Packet> {
        self.packets.get(&id)
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn stats(&self) -> DerivedStats {
        self.stats.current()
    }

    pub fn allocation(&self) -> Allocation {
        self.allocation
    }
}
