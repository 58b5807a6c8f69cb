//! Projection of raw samples into chart-ready points, one family per chart.
//!
//! A transformer is a pure function of a `RawSample` and the node's static
//! capacity totals. Families that drive a dynamic axis (memory, disk) also
//! report an upper bound alongside the point.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::format::time_label;
use crate::sample::{NodeCapacity, RawSample};

/// Disk axis upper bound used until a positive total is known (1 GiB).
pub const DEFAULT_DISK_AXIS_BOUND: u64 = 1024 * 1024 * 1024;

/// Metric family rendered by one chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricFamily {
    Cpu,
    Memory,
    Disk,
    Network,
    Connections,
    Process,
    /// Multi-metric projection of the node detail view.
    Instance,
}

impl MetricFamily {
    /// The six families shown as dashboard mini-charts.
    pub const DASHBOARD: [MetricFamily; 6] = [
        MetricFamily::Cpu,
        MetricFamily::Memory,
        MetricFamily::Network,
        MetricFamily::Connections,
        MetricFamily::Disk,
        MetricFamily::Process,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricFamily::Cpu => "cpu",
            MetricFamily::Memory => "memory",
            MetricFamily::Disk => "disk",
            MetricFamily::Network => "network",
            MetricFamily::Connections => "connections",
            MetricFamily::Process => "process",
            MetricFamily::Instance => "instance",
        }
    }
}

impl fmt::Display for MetricFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(MetricFamily::Cpu),
            "memory" | "ram" | "swap" => Ok(MetricFamily::Memory),
            "disk" => Ok(MetricFamily::Disk),
            "network" | "net" => Ok(MetricFamily::Network),
            "connections" | "conn" => Ok(MetricFamily::Connections),
            "process" | "processes" => Ok(MetricFamily::Process),
            "instance" => Ok(MetricFamily::Instance),
            other => Err(format!(
                "unknown metric family '{}', expected one of cpu, memory, disk, network, connections, process, instance",
                other
            )),
        }
    }
}

/// Values of the node detail view, one row per sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InstanceMetrics {
    pub cpu_usage: f64,
    pub ram_percent: f64,
    pub swap_percent: f64,
    pub disk_percent: f64,
    pub upload_speed: u64,
    pub download_speed: u64,
    pub tcp_connections: u64,
    pub udp_connections: u64,
    pub process_count: u64,
    pub load1: f64,
}

/// Family-specific numeric series of one point.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum PointValues {
    Cpu { cpu_usage: f64 },
    Memory { ram_used: u64, swap_used: u64 },
    Disk { disk_used: u64 },
    Network { upload_speed: u64, download_speed: u64 },
    Connections { tcp_connections: u64, udp_connections: u64 },
    Process { process_count: u64 },
    Instance(InstanceMetrics),
}

/// Display-ready projection of a raw sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    /// `HH:MM:SS` label derived from `updated_at`.
    pub time: String,
    #[serde(flatten)]
    pub values: PointValues,
}

/// A chart point plus the axis bound it implies, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Transformed {
    pub point: ChartPoint,
    pub axis_bound: Option<u64>,
}

/// Maps one raw sample to one chart point.
pub trait SampleTransformer: Send + Sync {
    fn family(&self) -> MetricFamily;

    fn transform(&self, sample: &RawSample, capacity: &NodeCapacity) -> Transformed;
}

/// Rounds to two decimals; non-finite input becomes 0.
fn round2(value: f64) -> f64 {
    if value.is_finite() {
        (value * 100.0).round() / 100.0
    } else {
        0.0
    }
}

/// Percentage of `used` in `total`, 0 when the total is unknown.
pub fn percent_of(used: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        used as f64 / total as f64 * 100.0
    }
}

fn first_positive(candidates: &[u64]) -> Option<u64> {
    candidates.iter().copied().find(|&v| v > 0)
}

impl SampleTransformer for MetricFamily {
    fn family(&self) -> MetricFamily {
        *self
    }

    fn transform(&self, sample: &RawSample, capacity: &NodeCapacity) -> Transformed {
        let time = time_label(&sample.updated_at);
        let mut axis_bound = None;

        let values = match self {
            MetricFamily::Cpu => PointValues::Cpu {
                cpu_usage: round2(sample.cpu.usage),
            },
            MetricFamily::Memory => {
                axis_bound = first_positive(&[sample.ram.total, capacity.mem_total]);
                PointValues::Memory {
                    ram_used: sample.ram.used,
                    swap_used: sample.swap.used,
                }
            }
            MetricFamily::Disk => {
                axis_bound = first_positive(&[sample.disk.total, capacity.disk_total]);
                PointValues::Disk {
                    disk_used: sample.disk.used,
                }
            }
            MetricFamily::Network => PointValues::Network {
                upload_speed: sample.network.up,
                download_speed: sample.network.down,
            },
            MetricFamily::Connections => PointValues::Connections {
                tcp_connections: sample.connections.tcp,
                udp_connections: sample.connections.udp,
            },
            MetricFamily::Process => PointValues::Process {
                process_count: sample.process,
            },
            MetricFamily::Instance => {
                let mem_total = first_positive(&[capacity.mem_total, sample.ram.total]);
                let swap_total = first_positive(&[capacity.swap_total, sample.swap.total]);
                let disk_total = first_positive(&[capacity.disk_total, sample.disk.total]);
                PointValues::Instance(InstanceMetrics {
                    cpu_usage: round2(sample.cpu.usage),
                    ram_percent: round2(percent_of(sample.ram.used, mem_total.unwrap_or(0))),
                    swap_percent: round2(percent_of(sample.swap.used, swap_total.unwrap_or(0))),
                    disk_percent: round2(percent_of(sample.disk.used, disk_total.unwrap_or(0))),
                    upload_speed: sample.network.up,
                    download_speed: sample.network.down,
                    tcp_connections: sample.connections.tcp,
                    udp_connections: sample.connections.udp,
                    process_count: sample.process,
                    load1: round2(sample.load.load1),
                })
            }
        };

        Transformed {
            point: ChartPoint { time, values },
            axis_bound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{CpuStats, UsageStats};

    fn sample() -> RawSample {
        RawSample {
            cpu: CpuStats { usage: 12.3456 },
            ram: UsageStats {
                used: 512,
                total: 2048,
            },
            swap: UsageStats {
                used: 64,
                total: 0,
            },
            disk: UsageStats {
                used: 300,
                total: 0,
            },
            process: 87,
            updated_at: "2024-05-01T10:00:00Z".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_cpu_rounds_to_two_decimals() {
        let out = MetricFamily::Cpu.transform(&sample(), &NodeCapacity::default());
        assert_eq!(out.point.values, PointValues::Cpu { cpu_usage: 12.35 });
        assert_eq!(out.axis_bound, None);
    }

    #[test]
    fn test_memory_axis_prefers_sample_total() {
        let capacity = NodeCapacity {
            mem_total: 4096,
            ..Default::default()
        };
        let out = MetricFamily::Memory.transform(&sample(), &capacity);
        assert_eq!(
            out.point.values,
            PointValues::Memory {
                ram_used: 512,
                swap_used: 64
            }
        );
        assert_eq!(out.axis_bound, Some(2048));
    }

    #[test]
    fn test_disk_axis_falls_back_to_capacity() {
        let capacity = NodeCapacity {
            disk_total: 1000,
            ..Default::default()
        };
        let out = MetricFamily::Disk.transform(&sample(), &capacity);
        assert_eq!(out.axis_bound, Some(1000));

        let unknown = MetricFamily::Disk.transform(&sample(), &NodeCapacity::default());
        assert_eq!(unknown.axis_bound, None);
    }

    #[test]
    fn test_empty_sample_yields_zeros() {
        for family in MetricFamily::DASHBOARD {
            let out = family.transform(&RawSample::default(), &NodeCapacity::default());
            let json = serde_json::to_value(&out.point).unwrap();
            for (key, value) in json.as_object().unwrap() {
                if key == "time" || key == "family" {
                    continue;
                }
                assert_eq!(value.as_f64(), Some(0.0), "{} {} not zero", family, key);
            }
        }
    }

    #[test]
    fn test_instance_percentages() {
        let capacity = NodeCapacity {
            mem_total: 1024,
            swap_total: 128,
            disk_total: 600,
        };
        let out = MetricFamily::Instance.transform(&sample(), &capacity);
        match out.point.values {
            PointValues::Instance(m) => {
                assert_eq!(m.ram_percent, 50.0);
                assert_eq!(m.swap_percent, 50.0);
                assert_eq!(m.disk_percent, 50.0);
                assert_eq!(m.process_count, 87);
            }
            other => panic!("unexpected values: {:?}", other),
        }
    }

    #[test]
    fn test_instance_without_totals_is_zero_percent() {
        let out = MetricFamily::Instance.transform(&sample(), &NodeCapacity::default());
        match out.point.values {
            PointValues::Instance(m) => {
                assert_eq!(m.ram_percent, 25.0);
                assert_eq!(m.swap_percent, 0.0);
                assert_eq!(m.disk_percent, 0.0);
            }
            other => panic!("unexpected values: {:?}", other),
        }
    }

    #[test]
    fn test_family_from_str() {
        assert_eq!("RAM".parse::<MetricFamily>(), Ok(MetricFamily::Memory));
        assert_eq!("net".parse::<MetricFamily>(), Ok(MetricFamily::Network));
        assert!("gpu".parse::<MetricFamily>().is_err());
    }
}
