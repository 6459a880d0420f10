use statmux::prelude::*;

fn single_sender(link_bps: f64) -> SimConfig {
    SimConfig::default()
        .with_users(1, 1.0)
        .with_link(link_bps, link_bps)
        .with_emission_prob(0.0)
        .with_dt(0.05)
        .with_seed(7)
}

#[test]
fn lone_packet_takes_the_expected_number_of_ticks() {
    for link_bps in [16_000.0, 30_000.0, 100_000.0, 1e6] {
        let mut engine = Engine::new(single_sender(link_bps)).unwrap();
        let id = engine.inject_packet(0, 1000).unwrap();
        let expected = (8000.0 / (link_bps * 0.05)).ceil() as u64;

        let mut ticks = 0;
        loop {
            let report = engine.step().unwrap();
            ticks += 1;
            if report.completed == 1 {
                break;
            }
            assert_eq!(engine.packet(id).unwrap().status(), PacketStatus::Transmitting);
            assert!(ticks <= expected, "link {} still sending after {} ticks", link_bps, ticks);
        }

        assert_eq!(ticks, expected, "link {}", link_bps);
        assert_eq!(engine.counters().dropped_packets, 0);
    }
}

#[test]
fn bufferless_switch_drops_every_completion() {
    let config = SimConfig::default()
        .with_users(40, 0.5)
        .with_buffer(0)
        .with_seed(99);
    let mut engine = Engine::new(config).unwrap();

    for _ in 0..200 {
        let report = engine.step().unwrap();
        assert_eq!(report.dropped, report.completed);
        assert_eq!(report.buffered, 0);
    }

    let counters = engine.counters();
    assert!(counters.transmissions_completed > 0);
    assert_eq!(counters.dropped_packets, counters.transmissions_completed);
    assert_eq!(counters.processed_packets, 0);
    assert_eq!(engine.stats().loss_rate_pct, 100.0);
    assert_eq!(engine.stats().buffer_occupancy_pct, 0.0);
}

#[test]
fn crowded_link_is_shared_equally() {
    // 100 always-on users on a link that fits 10 of them
    let config = SimConfig::default().with_users(100, 1.0).with_seed(3);
    let mut engine = Engine::new(config).unwrap();
    let report = engine.step().unwrap();

    let alloc = report.allocation;
    assert_eq!(alloc.active_count, 100);
    assert!(alloc.contended);
    assert!(alloc.per_user_bps < 100e6);
    assert!((alloc.per_user_bps - 1e9 / 100.0).abs() < 1e-6);
}

#[test]
fn quiet_link_gives_full_rate() {
    let config = SimConfig::default().with_users(10, 1.0).with_seed(3);
    let mut engine = Engine::new(config).unwrap();
    let alloc = engine.step().unwrap().allocation;
    assert_eq!(alloc.active_count, 10);
    assert!(!alloc.contended);
    assert_eq!(alloc.per_user_bps, 100e6);
}

#[test]
fn overload_shows_up_as_loss() {
    // same offered load per user, ten times the users
    let light = SimConfig::default().with_users(10, 0.1).with_seed(21);
    let heavy = SimConfig::default()
        .with_users(400, 0.5)
        .with_processing(1, 3.0, 1.4)
        .with_seed(21);

    let mut light = Engine::new(light).unwrap();
    let mut heavy = Engine::new(heavy).unwrap();
    light.run(400).unwrap();
    heavy.run(400).unwrap();

    assert_eq!(light.counters().dropped_packets, 0);
    assert!(heavy.counters().dropped_packets > 0);
    assert!(heavy.stats().loss_rate_pct > light.stats().loss_rate_pct);
    assert!(heavy.snapshot().high_loss);
}

#[test]
fn throughput_window_reports_delivered_bytes() {
    let mut engine = Engine::new(single_sender(1e6)).unwrap();
    for _ in 0..4 {
        engine.inject_packet(0, 1250).unwrap();
    }

    // everything is delivered well inside the first simulated second
    for _ in 0..19 {
        engine.step().unwrap();
        assert_eq!(engine.stats().throughput_mbps, 0.0);
    }
    engine.step().unwrap();
    let snap = engine.snapshot();
    assert!(snap.window_closed);
    assert_eq!(snap.counters.processed_packets, 4);
    assert_eq!(snap.derived_stats.throughput_mbps, 0.04);
    assert!((snap.derived_stats.utilization_pct - 4.0).abs() < 1e-9);
}

#[test]
fn runner_and_engine_agree() {
    let config = SimConfig::default().with_users(60, 0.2).with_seed(77);

    let mut sim = Simulation::new(config.clone(), 300).unwrap();
    let report = sim.run().unwrap();

    let mut engine = Engine::new(config).unwrap();
    engine.run(300).unwrap();

    assert_eq!(report.processed_packets, engine.counters().processed_packets);
    assert_eq!(report.dropped_packets, engine.counters().dropped_packets);
}

#[test]
fn snapshot_serializes_for_renderers() {
    let mut engine = Engine::new(SimConfig::default().with_seed(4)).unwrap();
    engine.run(30).unwrap();

    let json = serde_json::to_value(engine.snapshot()).unwrap();
    assert!(json["packets"].is_array());
    assert!(json["buffer_contents"].is_array());
    assert!(json["counters"]["processed_packets"].is_u64());
    assert!(json["derived_stats"]["loss_rate_pct"].is_number());
}
