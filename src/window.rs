//! Bounded sample windows backing individual charts.
//!
//! A `SampleWindow` owns a transformer and a ringbuffer of chart points. It
//! can be seeded once from a historical batch, then grows with every live
//! sample until it reaches capacity, after which the oldest point is evicted.

use std::num::NonZeroUsize;
use thiserror::Error;
use tracing::{debug, trace};

use crate::ringbuffer::Ringbuffer;
use crate::sample::{NodeCapacity, RawSample};
use crate::transform::{ChartPoint, MetricFamily, SampleTransformer, DEFAULT_DISK_AXIS_BOUND};

/// Window size of the dashboard mini-charts.
pub const DASHBOARD_CAPACITY: usize = 50;
/// Window size of the node detail view.
pub const INSTANCE_CAPACITY: usize = 180;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("window capacity must be at least 1")]
    ZeroCapacity,
}

/// How a window treats a point whose time label repeats the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupPolicy {
    /// Always append (dashboard mini-charts).
    None,
    /// Drop a point whose time label equals the most recent point's label
    /// (node detail view).
    LastTimeLabel,
}

/// Result of appending a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended,
    /// Appended and the oldest point was evicted.
    Evicted,
    /// Discarded as a repeat of the previous tick.
    Duplicate,
}

pub struct SampleWindow<T: SampleTransformer = MetricFamily> {
    transformer: T,
    buffer: Ringbuffer<ChartPoint>,
    dedup: DedupPolicy,
    seeded: bool,
    axis_bound: Option<u64>,
}

impl SampleWindow<MetricFamily> {
    /// Dashboard mini-chart window: capacity 50, no dedup.
    pub fn dashboard(family: MetricFamily) -> Self {
        Self::from_parts(
            family,
            NonZeroUsize::new(DASHBOARD_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            DedupPolicy::None,
        )
    }

    /// Node detail window: capacity 180, dedup on repeated time labels.
    pub fn instance() -> Self {
        Self::from_parts(
            MetricFamily::Instance,
            NonZeroUsize::new(INSTANCE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            DedupPolicy::LastTimeLabel,
        )
    }
}

impl<T: SampleTransformer> SampleWindow<T> {
    /// Creates an empty window.
    ///
    /// Fails with `WindowError::ZeroCapacity` when `capacity` is 0.
    pub fn new(transformer: T, capacity: usize, dedup: DedupPolicy) -> Result<Self, WindowError> {
        let capacity = NonZeroUsize::new(capacity).ok_or(WindowError::ZeroCapacity)?;
        Ok(Self::from_parts(transformer, capacity, dedup))
    }

    fn from_parts(transformer: T, capacity: NonZeroUsize, dedup: DedupPolicy) -> Self {
        Self {
            transformer,
            buffer: Ringbuffer::new(capacity),
            dedup,
            seeded: false,
            axis_bound: None,
        }
    }

    /// Seeds the window from a historical batch ordered oldest to newest.
    ///
    /// Only the last `capacity` points are kept. Seeding happens at most once
    /// and never over live content; returns false when it was a no-op.
    pub fn seed(&mut self, history: &[RawSample]) -> bool {
        self.seed_with(history, &NodeCapacity::default())
    }

    /// Like [`seed`](Self::seed), with the node's capacity totals.
    pub fn seed_with(&mut self, history: &[RawSample], capacity: &NodeCapacity) -> bool {
        if self.seeded || !self.buffer.is_empty() {
            debug!(
                family = %self.transformer.family(),
                "Window already has content, ignoring seed"
            );
            self.seeded = true;
            return false;
        }
        self.seeded = true;

        let skip = history.len().saturating_sub(self.buffer.capacity());
        for sample in &history[skip..] {
            let transformed = self.transformer.transform(sample, capacity);
            self.buffer.push(transformed.point);
            self.update_axis_bound(transformed.axis_bound);
        }

        debug!(
            family = %self.transformer.family(),
            history = history.len(),
            kept = self.buffer.len(),
            "Window seeded"
        );
        true
    }

    /// Transforms and appends one live sample.
    pub fn append(&mut self, sample: &RawSample) -> AppendOutcome {
        self.append_with(sample, &NodeCapacity::default())
    }

    /// Like [`append`](Self::append), with the node's capacity totals.
    pub fn append_with(&mut self, sample: &RawSample, capacity: &NodeCapacity) -> AppendOutcome {
        let transformed = self.transformer.transform(sample, capacity);

        if self.dedup == DedupPolicy::LastTimeLabel
            && self
                .buffer
                .last()
                .is_some_and(|last| last.time == transformed.point.time)
        {
            trace!(time = %transformed.point.time, "Dropping duplicate tick");
            return AppendOutcome::Duplicate;
        }

        let evicts = self.buffer.is_full();
        self.buffer.push(transformed.point);
        self.update_axis_bound(transformed.axis_bound);

        if evicts {
            AppendOutcome::Evicted
        } else {
            AppendOutcome::Appended
        }
    }

    fn update_axis_bound(&mut self, bound: Option<u64>) {
        if let Some(bound) = bound.filter(|&b| b > 0) {
            self.axis_bound = Some(bound);
        }
    }

    /// Current points, oldest first.
    pub fn snapshot(&self) -> Vec<ChartPoint> {
        self.buffer.get_history()
    }

    /// Most recent point.
    pub fn latest(&self) -> Option<&ChartPoint> {
        self.buffer.last()
    }

    /// Upper bound for the value axis, if the family tracks one.
    ///
    /// Disk windows fall back to 1 GiB until a positive total is seen.
    pub fn axis_upper_bound(&self) -> Option<u64> {
        match (self.axis_bound, self.transformer.family()) {
            (Some(bound), _) => Some(bound),
            (None, MetricFamily::Disk) => Some(DEFAULT_DISK_AXIS_BOUND),
            (None, _) => None,
        }
    }

    pub fn family(&self) -> MetricFamily {
        self.transformer.family()
    }

    pub fn dedup_policy(&self) -> DedupPolicy {
        self.dedup
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }
}
