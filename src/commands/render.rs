//! Text rendering of chart windows for the terminal views.

use fleetpulse::{format_bytes, format_speed, ChartPoint, MetricFamily, PointValues};

const SPARK: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Human-readable values of one point.
pub fn describe_point(point: &ChartPoint) -> String {
    match &point.values {
        PointValues::Cpu { cpu_usage } => format!("cpu {:.2}%", cpu_usage),
        PointValues::Memory {
            ram_used,
            swap_used,
        } => format!(
            "ram {}  swap {}",
            format_bytes(*ram_used as f64, 2),
            format_bytes(*swap_used as f64, 2)
        ),
        PointValues::Disk { disk_used } => format!("disk {}", format_bytes(*disk_used as f64, 2)),
        PointValues::Network {
            upload_speed,
            download_speed,
        } => format!(
            "up {}  down {}",
            format_speed(*upload_speed as f64, 2),
            format_speed(*download_speed as f64, 2)
        ),
        PointValues::Connections {
            tcp_connections,
            udp_connections,
        } => format!("tcp {}  udp {}", tcp_connections, udp_connections),
        PointValues::Process { process_count } => format!("processes {}", process_count),
        PointValues::Instance(m) => format!(
            "cpu {:.2}%  ram {:.2}%  swap {:.2}%  disk {:.2}%  up {}  down {}  tcp {}  udp {}  proc {}  load {:.2}",
            m.cpu_usage,
            m.ram_percent,
            m.swap_percent,
            m.disk_percent,
            format_speed(m.upload_speed as f64, 2),
            format_speed(m.download_speed as f64, 2),
            m.tcp_connections,
            m.udp_connections,
            m.process_count,
            m.load1
        ),
    }
}

/// The value a sparkline plots for a point.
pub fn primary_value(point: &ChartPoint) -> f64 {
    match &point.values {
        PointValues::Cpu { cpu_usage } => *cpu_usage,
        PointValues::Memory { ram_used, .. } => *ram_used as f64,
        PointValues::Disk { disk_used } => *disk_used as f64,
        PointValues::Network {
            upload_speed,
            download_speed,
        } => upload_speed.saturating_add(*download_speed) as f64,
        PointValues::Connections {
            tcp_connections,
            udp_connections,
        } => tcp_connections.saturating_add(*udp_connections) as f64,
        PointValues::Process { process_count } => *process_count as f64,
        PointValues::Instance(m) => m.cpu_usage,
    }
}

/// Sparkline over the points, scaled to `upper` when given, else to the
/// largest value (CPU always scales to 100).
pub fn sparkline(points: &[ChartPoint], family: MetricFamily, upper: Option<u64>) -> String {
    let values: Vec<f64> = points.iter().map(primary_value).collect();
    let max = match (family, upper) {
        (MetricFamily::Cpu | MetricFamily::Instance, _) => 100.0,
        (_, Some(bound)) if bound > 0 => bound as f64,
        _ => values.iter().copied().fold(0.0, f64::max),
    };

    values
        .iter()
        .map(|&v| {
            if max <= 0.0 {
                return SPARK[0];
            }
            let ratio = (v / max).clamp(0.0, 1.0);
            let index = (ratio * (SPARK.len() - 1) as f64).round() as usize;
            SPARK[index.min(SPARK.len() - 1)]
        })
        .collect()
}

/// One chart as a single terminal line.
pub fn render_chart_line(
    family: MetricFamily,
    points: &[ChartPoint],
    capacity: usize,
    upper: Option<u64>,
) -> String {
    let latest = points
        .last()
        .map(describe_point)
        .unwrap_or_else(|| "N/A".to_string());
    let bound = match (family, upper) {
        (MetricFamily::Memory | MetricFamily::Disk, Some(b)) => {
            format!("  / {}", format_bytes(b as f64, 2))
        }
        _ => String::new(),
    };
    format!(
        "{:<12} {:>3}/{:<3} {}  {}{}",
        family.as_str(),
        points.len(),
        capacity,
        sparkline(points, family, upper),
        latest,
        bound
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cpu(v: f64) -> ChartPoint {
        ChartPoint {
            time: "00:00:00".into(),
            values: PointValues::Cpu { cpu_usage: v },
        }
    }

    #[test]
    fn test_primary_value_saturates() {
        let network = ChartPoint {
            time: "00:00:00".into(),
            values: PointValues::Network {
                upload_speed: u64::MAX,
                download_speed: u64::MAX,
            },
        };
        assert_eq!(primary_value(&network), u64::MAX as f64);

        let connections = ChartPoint {
            time: "00:00:00".into(),
            values: PointValues::Connections {
                tcp_connections: u64::MAX,
                udp_connections: 1,
            },
        };
        assert_eq!(primary_value(&connections), u64::MAX as f64);
    }

    #[test]
    fn test_sparkline_cpu_scale() {
        let points = vec![cpu(0.0), cpu(50.0), cpu(100.0)];
        assert_eq!(sparkline(&points, MetricFamily::Cpu, None), "▁▅█");
    }

    #[test]
    fn test_sparkline_empty_and_zero() {
        assert_eq!(sparkline(&[], MetricFamily::Process, None), "");
        let zero = ChartPoint {
            time: "00:00:00".into(),
            values: PointValues::Process { process_count: 0 },
        };
        assert_eq!(sparkline(&[zero], MetricFamily::Process, None), "▁");
    }

    #[test]
    fn test_describe_memory() {
        let point = ChartPoint {
            time: "00:00:00".into(),
            values: PointValues::Memory {
                ram_used: 1536,
                swap_used: 0,
            },
        };
        assert_eq!(describe_point(&point), "ram 1.50 KB  swap 0 Bytes");
    }

    #[test]
    fn test_empty_chart_line() {
        let line = render_chart_line(MetricFamily::Disk, &[], 50, Some(1024));
        assert!(line.contains("N/A"));
        assert!(line.contains("0/50"));
        assert!(line.contains("1.00 KB"));
    }
}
