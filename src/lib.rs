//! Fleetpulse Live Telemetry Library
//!
//! This library ingests the live telemetry feed of a server-fleet dashboard
//! and maintains the rolling chart windows built from it. One push channel
//! is fanned out to many independent windows, each seeded once from recent
//! history and then kept at a fixed size.
//!
//! # Features
//!
//! - **Live Feed Client**: connect, keep-alive probes, reconnect with a fixed delay, teardown
//! - **Fan-out Registry**: synchronous delivery to any number of subscribers with RAII handles
//! - **Bounded Sample Windows**: seed once, append with FIFO eviction, optional tick dedup
//! - **Sample Transformers**: CPU, memory, disk, network, connections, process and instance views
//! - **History Client**: recent samples and node directory over HTTP with graceful degradation
//!
//! # Usage
//!
//! ```rust
//! use fleetpulse::{MetricFamily, RawSample, SampleWindow};
//!
//! let mut window = SampleWindow::dashboard(MetricFamily::Cpu);
//! window.seed(&[RawSample::default()]);
//! window.append(&RawSample::default());
//! assert_eq!(window.snapshot().len(), 2);
//!
//! assert_eq!(fleetpulse::format_bytes(1536.0, 2), "1.50 KB");
//! ```

pub mod feed;
pub mod feed_stats;
pub mod format;
pub mod history;
pub mod registry;
pub mod ringbuffer;
pub mod sample;
pub mod session;
pub mod transform;
pub mod transport;
pub mod window;

// Re-export main types for convenience
pub use feed::{
    ConnectionStatus, Connector, FeedChannel, FeedConfig, FeedError, FeedHandle, Frame,
    LiveFeedClient, LiveFeedState, ReconnectPolicy,
};
pub use feed_stats::{FeedStats, FeedStatsSnapshot};
pub use format::{format_bytes, format_os, format_speed, format_uptime, time_label};
pub use history::{HistoryClient, HistoryError, SeedOutcome};
pub use registry::{FanoutRegistry, Subscription, SubscriptionId};
pub use sample::{
    CapacityTable, LiveData, LiveDataResponse, NodeCapacity, NodeIdentity, NodeResponse, RawSample,
};
pub use session::{ChartView, DashboardSession, NodeDashboard, WindowSizes};
pub use transform::{ChartPoint, MetricFamily, PointValues, SampleTransformer};
pub use transport::{feed_url, WebSocketConnector};
pub use window::{AppendOutcome, DedupPolicy, SampleWindow, WindowError};
