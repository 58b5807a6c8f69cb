//! Integration tests for dashboard sessions.
//!
//! Messages are published straight into the session's registry, the same
//! path the live feed uses after decoding.

use fleetpulse::{
    CapacityTable, DashboardSession, LiveDataResponse, MetricFamily, NodeCapacity, PointValues,
    RawSample, WindowError, WindowSizes,
};

fn message(node: &str, usage: f64, updated_at: &str) -> LiveDataResponse {
    let mut msg = LiveDataResponse::default();
    msg.data.online.push(node.to_string());
    let mut sample = RawSample::default();
    sample.cpu.usage = usage;
    sample.ram.used = 512;
    sample.disk.used = 2048;
    sample.updated_at = updated_at.to_string();
    msg.data.data.insert(node.to_string(), sample);
    msg
}

fn tick(second: u32) -> String {
    format!("2024-05-01T10:00:{:02}Z", second)
}

#[test]
fn test_zero_window_size_rejected() {
    let result = DashboardSession::new(WindowSizes {
        dashboard: 0,
        instance: 180,
    });
    assert_eq!(result.err(), Some(WindowError::ZeroCapacity));
}

#[test]
fn test_one_message_reaches_every_chart() {
    let session = DashboardSession::new(WindowSizes::default()).unwrap();
    let cpu = session.mount_chart("n1", MetricFamily::Cpu).unwrap();
    let detail = session.mount_instance("n1").unwrap();
    assert_eq!(session.registry().subscriber_count(), 2);

    for i in 0..3 {
        let delivered = session
            .registry()
            .publish(&message("n1", 10.0 * i as f64, &tick(i)));
        assert_eq!(delivered, 2);
    }

    assert_eq!(cpu.capacity(), 50);
    assert_eq!(detail.capacity(), 180);
    assert_eq!(cpu.len(), 3);
    assert_eq!(detail.len(), 3);
    assert_eq!(
        cpu.latest().map(|p| p.values),
        Some(PointValues::Cpu { cpu_usage: 20.0 })
    );
}

#[test]
fn test_other_nodes_are_ignored() {
    let session = DashboardSession::new(WindowSizes::default()).unwrap();
    let cpu = session.mount_chart("n1", MetricFamily::Cpu).unwrap();

    session.registry().publish(&message("n2", 50.0, &tick(1)));
    assert!(cpu.is_empty());
}

#[test]
fn test_instance_view_drops_repeated_ticks() {
    let session = DashboardSession::new(WindowSizes::default()).unwrap();
    let cpu = session.mount_chart("n1", MetricFamily::Cpu).unwrap();
    let detail = session.mount_instance("n1").unwrap();

    session.registry().publish(&message("n1", 1.0, &tick(5)));
    session.registry().publish(&message("n1", 2.0, &tick(5)));

    assert_eq!(detail.len(), 1);
    assert_eq!(cpu.len(), 2);
}

#[test]
fn test_unmounted_chart_stops_receiving() {
    let session = DashboardSession::new(WindowSizes::default()).unwrap();
    let cpu = session.mount_chart("n1", MetricFamily::Cpu).unwrap();
    let memory = session.mount_chart("n1", MetricFamily::Memory).unwrap();
    assert!(cpu.is_subscribed());

    drop(memory);
    assert_eq!(session.registry().subscriber_count(), 1);

    let delivered = session.registry().publish(&message("n1", 3.0, &tick(1)));
    assert_eq!(delivered, 1);
    assert_eq!(cpu.len(), 1);
}

#[test]
fn test_windows_stay_bounded() {
    let session = DashboardSession::new(WindowSizes {
        dashboard: 5,
        instance: 8,
    })
    .unwrap();
    let cpu = session.mount_chart("n1", MetricFamily::Cpu).unwrap();
    let detail = session.mount_instance("n1").unwrap();

    for i in 0..20 {
        session
            .registry()
            .publish(&message("n1", i as f64, &tick(i)));
    }

    assert_eq!(cpu.len(), 5);
    assert_eq!(detail.len(), 8);
    let times: Vec<String> = cpu.snapshot().into_iter().map(|p| p.time).collect();
    assert_eq!(times.len(), 5);
    assert_eq!(
        cpu.snapshot().first().map(|p| p.values.clone()),
        Some(PointValues::Cpu { cpu_usage: 15.0 })
    );
}

#[test]
fn test_node_dashboard_seeds_and_uses_capacities() {
    let session = DashboardSession::new(WindowSizes::default()).unwrap();
    let mut table = CapacityTable::new();
    table.insert(
        "n1",
        NodeCapacity {
            mem_total: 4096,
            swap_total: 0,
            disk_total: 10_000,
        },
    );
    session.set_capacities(table);

    let dashboard = session.mount_node_dashboard("n1").unwrap();
    assert_eq!(dashboard.charts().len(), 6);
    assert_eq!(session.registry().subscriber_count(), 6);

    let history: Vec<RawSample> = (0..60)
        .map(|i| message("n1", 1.0, &tick(i % 60)).sample("n1").cloned().unwrap())
        .collect();
    dashboard.seed(&history);

    for chart in dashboard.charts() {
        assert_eq!(chart.len(), 50);
    }
    let disk = dashboard.chart(MetricFamily::Disk).unwrap();
    assert_eq!(disk.axis_upper_bound(), Some(10_000));

    // Seeding is applied only once per view
    dashboard.seed(&history[..3]);
    assert_eq!(disk.len(), 50);

    session.registry().publish(&message("n1", 9.0, &tick(59)));
    assert_eq!(disk.len(), 50);
    assert_eq!(
        dashboard
            .chart(MetricFamily::Cpu)
            .and_then(|c| c.latest())
            .map(|p| p.values),
        Some(PointValues::Cpu { cpu_usage: 9.0 })
    );

    drop(dashboard);
    assert_eq!(session.registry().subscriber_count(), 0);
}
