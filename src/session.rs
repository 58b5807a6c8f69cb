//! Dashboard session: one live feed and one fan-out registry, shared by every
//! chart mounted in it.
//!
//! Charts receive the registry and capacity table from the session instead
//! of looking them up globally. Each mounted [`ChartView`] owns its window
//! and its subscription; dropping the view unsubscribes it.

use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info};

use crate::feed::{Connector, FeedConfig, FeedHandle, LiveFeedClient};
use crate::registry::{FanoutRegistry, Subscription};
use crate::sample::{CapacityTable, LiveDataResponse, NodeCapacity, RawSample};
use crate::transform::{ChartPoint, MetricFamily};
use crate::window::{
    DedupPolicy, SampleWindow, WindowError, DASHBOARD_CAPACITY, INSTANCE_CAPACITY,
};

/// Window sizes used by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSizes {
    pub dashboard: usize,
    pub instance: usize,
}

impl Default for WindowSizes {
    fn default() -> Self {
        Self {
            dashboard: DASHBOARD_CAPACITY,
            instance: INSTANCE_CAPACITY,
        }
    }
}

pub struct DashboardSession {
    registry: Arc<FanoutRegistry>,
    capacities: Arc<RwLock<CapacityTable>>,
    sizes: WindowSizes,
    feed: Option<FeedHandle>,
}

impl DashboardSession {
    /// Creates a session. Zero-sized windows are rejected here, before any
    /// chart is mounted.
    pub fn new(sizes: WindowSizes) -> Result<Self, WindowError> {
        if sizes.dashboard == 0 || sizes.instance == 0 {
            return Err(WindowError::ZeroCapacity);
        }
        Ok(Self {
            registry: FanoutRegistry::new(),
            capacities: Arc::new(RwLock::new(CapacityTable::new())),
            sizes,
            feed: None,
        })
    }

    pub fn registry(&self) -> &Arc<FanoutRegistry> {
        &self.registry
    }

    pub fn sizes(&self) -> WindowSizes {
        self.sizes
    }

    /// Connects the session's live feed. A feed started earlier is torn down
    /// first so the session never holds two channels.
    pub async fn start(&mut self, config: FeedConfig, connector: Arc<dyn Connector>) -> &FeedHandle {
        if let Some(previous) = self.feed.take() {
            debug!("Replacing running live feed");
            previous.teardown().await;
        }
        let client = LiveFeedClient::new(config, connector, Arc::clone(&self.registry));
        self.feed.insert(client.connect())
    }

    pub fn feed(&self) -> Option<&FeedHandle> {
        self.feed.as_ref()
    }

    /// Replaces the capacity table used for percentages and axis bounds.
    pub fn set_capacities(&self, table: CapacityTable) {
        if let Ok(mut guard) = self.capacities.write() {
            debug!(nodes = table.len(), "Capacity table updated");
            *guard = table;
        }
    }

    pub fn capacity_for(&self, node_id: &str) -> NodeCapacity {
        lookup_capacity(&self.capacities, node_id)
    }

    /// Mounts one dashboard mini-chart for a node.
    pub fn mount_chart(&self, node_id: &str, family: MetricFamily) -> Result<ChartView, WindowError> {
        let window = SampleWindow::new(family, self.sizes.dashboard, DedupPolicy::None)?;
        Ok(self.mount(node_id, window))
    }

    /// Mounts the node detail view.
    pub fn mount_instance(&self, node_id: &str) -> Result<ChartView, WindowError> {
        let window = SampleWindow::new(
            MetricFamily::Instance,
            self.sizes.instance,
            DedupPolicy::LastTimeLabel,
        )?;
        Ok(self.mount(node_id, window))
    }

    /// Mounts the six dashboard mini-charts of a node.
    pub fn mount_node_dashboard(&self, node_id: &str) -> Result<NodeDashboard, WindowError> {
        let charts = MetricFamily::DASHBOARD
            .iter()
            .map(|&family| self.mount_chart(node_id, family))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(NodeDashboard {
            node_id: node_id.to_string(),
            charts,
        })
    }

    fn mount(&self, node_id: &str, window: SampleWindow) -> ChartView {
        let family = window.family();
        let window = Arc::new(Mutex::new(window));

        let target = Arc::clone(&window);
        let capacities = Arc::clone(&self.capacities);
        let node = node_id.to_string();
        let subscription = self.registry.subscribe(move |message: &LiveDataResponse| {
            let Some(sample) = message.sample(&node) else {
                return;
            };
            let capacity = lookup_capacity(&capacities, &node);
            if let Ok(mut guard) = target.lock() {
                guard.append_with(sample, &capacity);
            }
        });

        debug!(node = node_id, family = %family, subscription = %subscription.id(), "Chart mounted");
        ChartView {
            node_id: node_id.to_string(),
            family,
            window,
            capacities: Arc::clone(&self.capacities),
            subscription,
        }
    }

    /// Tears down the live feed, if one was started.
    pub async fn shutdown(mut self) {
        if let Some(feed) = self.feed.take() {
            feed.teardown().await;
        }
        info!(subscribers = self.registry.subscriber_count(), "Session closed");
    }
}

fn lookup_capacity(table: &RwLock<CapacityTable>, node_id: &str) -> NodeCapacity {
    table
        .read()
        .map(|guard| guard.get(node_id))
        .unwrap_or_default()
}

/// One mounted chart: a window fed by the session's registry.
pub struct ChartView {
    node_id: String,
    family: MetricFamily,
    window: Arc<Mutex<SampleWindow>>,
    capacities: Arc<RwLock<CapacityTable>>,
    subscription: Subscription,
}

impl ChartView {
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn family(&self) -> MetricFamily {
        self.family
    }

    /// Seeds the window with the node's history; see [`SampleWindow::seed`].
    pub fn seed(&self, history: &[RawSample]) -> bool {
        let capacity = lookup_capacity(&self.capacities, &self.node_id);
        self.window
            .lock()
            .map(|mut guard| guard.seed_with(history, &capacity))
            .unwrap_or(false)
    }

    pub fn snapshot(&self) -> Vec<ChartPoint> {
        self.window
            .lock()
            .map(|guard| guard.snapshot())
            .unwrap_or_default()
    }

    pub fn latest(&self) -> Option<ChartPoint> {
        self.window
            .lock()
            .ok()
            .and_then(|guard| guard.latest().cloned())
    }

    pub fn len(&self) -> usize {
        self.window.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.window.lock().map(|guard| guard.capacity()).unwrap_or(0)
    }

    pub fn axis_upper_bound(&self) -> Option<u64> {
        self.window
            .lock()
            .ok()
            .and_then(|guard| guard.axis_upper_bound())
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_active()
    }
}

/// The six mini-charts of one node.
pub struct NodeDashboard {
    node_id: String,
    charts: Vec<ChartView>,
}

impl NodeDashboard {
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn charts(&self) -> &[ChartView] {
        &self.charts
    }

    pub fn chart(&self, family: MetricFamily) -> Option<&ChartView> {
        self.charts.iter().find(|c| c.family() == family)
    }

    pub fn into_charts(self) -> Vec<ChartView> {
        self.charts
    }

    /// Seeds every chart from the same history batch.
    pub fn seed(&self, history: &[RawSample]) {
        for chart in &self.charts {
            chart.seed(history);
        }
    }
}
