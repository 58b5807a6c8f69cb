//! Telemetry payload types pushed by the fleet server.
//!
//! This module defines the raw per-node snapshot (`RawSample`), the push
//! envelope that carries one snapshot per node (`LiveDataResponse`), and the
//! static node directory (`NodeIdentity`) together with the capacity table
//! derived from it.
//!
//! Every numeric field is lenient on input: absent keys, `null`, negative
//! values and non-finite floats all decode to `0`, so a transformer never
//! sees a missing number.

use ahash::AHashMap as HashMap;
use serde::{Deserialize, Deserializer, Serialize};

/// Decodes any JSON number (or null) into a non-negative integer.
fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Numeric {
        Unsigned(u64),
        Signed(i64),
        Float(f64),
    }

    let value = Option::<Numeric>::deserialize(deserializer)?;
    Ok(match value {
        Some(Numeric::Unsigned(v)) => v,
        Some(Numeric::Signed(v)) => v.max(0) as u64,
        Some(Numeric::Float(v)) if v.is_finite() && v > 0.0 => v as u64,
        _ => 0,
    })
}

/// Decodes any JSON number (or null) into a finite float.
fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value.filter(|v| v.is_finite()).unwrap_or(0.0))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuStats {
    /// Usage in percent (0-100).
    #[serde(deserialize_with = "lenient_f64")]
    pub usage: f64,
}

/// Used/total pair in bytes (RAM, swap, disk).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageStats {
    #[serde(deserialize_with = "lenient_u64")]
    pub used: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub total: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadStats {
    #[serde(deserialize_with = "lenient_f64")]
    pub load1: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub load5: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub load15: f64,
}

/// Network rates (bytes per second) and cumulative counters (bytes).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkStats {
    #[serde(deserialize_with = "lenient_u64")]
    pub up: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub down: u64,
    #[serde(rename = "totalUp", deserialize_with = "lenient_u64")]
    pub total_up: u64,
    #[serde(rename = "totalDown", deserialize_with = "lenient_u64")]
    pub total_down: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionStats {
    #[serde(deserialize_with = "lenient_u64")]
    pub tcp: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub udp: u64,
}

/// One telemetry snapshot for one node at one instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSample {
    pub cpu: CpuStats,
    pub ram: UsageStats,
    pub swap: UsageStats,
    pub load: LoadStats,
    pub disk: UsageStats,
    pub network: NetworkStats,
    pub connections: ConnectionStats,
    /// Uptime in seconds.
    #[serde(deserialize_with = "lenient_u64")]
    pub uptime: u64,
    /// Process count. Fractional input is floored.
    #[serde(deserialize_with = "lenient_u64")]
    pub process: u64,
    pub message: String,
    /// ISO-8601 timestamp of the snapshot.
    pub updated_at: String,
}

/// Body of a push message: online node ids plus the latest sample per node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveData {
    pub online: Vec<String>,
    pub data: HashMap<String, RawSample>,
}

/// Push message envelope as delivered on the live channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveDataResponse {
    pub data: LiveData,
    pub status: String,
}

impl LiveDataResponse {
    /// Returns the sample for a node, if this message carries one.
    pub fn sample(&self, node_id: &str) -> Option<&RawSample> {
        self.data.data.get(node_id)
    }

    /// Returns true if the node is listed as online.
    pub fn is_online(&self, node_id: &str) -> bool {
        self.data.online.iter().any(|id| id == node_id)
    }
}

/// Static node metadata from the node directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeIdentity {
    pub uuid: String,
    pub name: String,
    pub cpu_name: String,
    pub virtualization: String,
    pub arch: String,
    #[serde(deserialize_with = "lenient_u64")]
    pub cpu_cores: u64,
    pub os: String,
    pub gpu_name: String,
    pub region: String,
    #[serde(deserialize_with = "lenient_u64")]
    pub mem_total: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub swap_total: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub disk_total: u64,
    pub version: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub weight: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub price: f64,
    /// Billing cycle in days.
    #[serde(deserialize_with = "lenient_u64")]
    pub billing_cycle: u64,
    pub expired_at: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Response of the node directory endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeResponse {
    pub data: Vec<NodeIdentity>,
    pub status: String,
}

/// Capacity totals of one node in bytes. Zero means unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NodeCapacity {
    pub mem_total: u64,
    pub swap_total: u64,
    pub disk_total: u64,
}

impl From<&NodeIdentity> for NodeCapacity {
    fn from(node: &NodeIdentity) -> Self {
        Self {
            mem_total: node.mem_total,
            swap_total: node.swap_total,
            disk_total: node.disk_total,
        }
    }
}

/// Capacity totals keyed by node id.
#[derive(Debug, Clone, Default)]
pub struct CapacityTable {
    nodes: HashMap<String, NodeCapacity>,
}

impl CapacityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the table from a node directory listing.
    pub fn from_nodes(nodes: &[NodeIdentity]) -> Self {
        let nodes = nodes
            .iter()
            .map(|node| (node.uuid.clone(), NodeCapacity::from(node)))
            .collect();
        Self { nodes }
    }

    pub fn insert(&mut self, node_id: impl Into<String>, capacity: NodeCapacity) {
        self.nodes.insert(node_id.into(), capacity);
    }

    /// Returns the capacity for a node; unknown nodes yield all zeros.
    pub fn get(&self, node_id: &str) -> NodeCapacity {
        self.nodes.get(node_id).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
