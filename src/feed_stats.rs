//! Counters and running statistics for the live feed.
//!
//! Every field is updated from the feed task and read from anywhere, so
//! counters are atomics and aggregate statistics sit behind a `Mutex`.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::Instant;

/// Running statistics for a single metric.
#[derive(Clone, Copy, Default, Debug)]
pub struct RunningStat {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    last: f64,
}

impl RunningStat {
    pub fn add(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
            self.last = value;
            self.sum = value;
            self.count = 1;
            return;
        }
        self.count += 1;
        self.sum += value;
        self.last = value;
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / (self.count as f64)
        }
    }
}

/// Thread-safe wrapper for running statistics.
#[derive(Default)]
pub struct Stat {
    inner: Mutex<RunningStat>,
}

impl Stat {
    pub fn add_sample(&self, value: f64) {
        if let Ok(mut s) = self.inner.lock() {
            s.add(value);
        }
    }

    pub fn snapshot(&self) -> StatSnapshot {
        if let Ok(s) = self.inner.lock() {
            StatSnapshot {
                last: s.last,
                avg: s.avg(),
                max: s.max,
                min: s.min,
                count: s.count,
            }
        } else {
            StatSnapshot::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatSnapshot {
    pub last: f64,
    pub avg: f64,
    pub max: f64,
    pub min: f64,
    pub count: u64,
}

/// Statistics of one live feed client.
pub struct FeedStats {
    pub connect_attempts: AtomicU64,
    pub connect_failures: AtomicU64,
    pub connections_opened: AtomicU64,
    pub reconnects_scheduled: AtomicU64,

    pub messages_received: AtomicU64,
    pub decode_errors: AtomicU64,
    pub message_size_bytes: Stat,

    pub probes_sent: AtomicU64,
    pub probe_failures: AtomicU64,

    pub start_time: Instant,
    pub last_message_time: RwLock<Option<Instant>>,
}

impl Default for FeedStats {
    fn default() -> Self {
        Self {
            connect_attempts: AtomicU64::new(0),
            connect_failures: AtomicU64::new(0),
            connections_opened: AtomicU64::new(0),
            reconnects_scheduled: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            message_size_bytes: Stat::default(),
            probes_sent: AtomicU64::new(0),
            probe_failures: AtomicU64::new(0),
            start_time: Instant::now(),
            last_message_time: RwLock::new(None),
        }
    }
}

impl FeedStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_connect_attempt(&self) {
        self.connect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connect_failure(&self) {
        self.connect_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_open(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reconnect_scheduled(&self) {
        self.reconnects_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a received text frame of `size` bytes.
    pub fn record_message(&self, size: usize) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
        self.message_size_bytes.add_sample(size as f64);
        if let Ok(mut guard) = self.last_message_time.write() {
            *guard = Some(Instant::now());
        }
    }

    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_probe(&self, delivered: bool) {
        if delivered {
            self.probes_sent.fetch_add(1, Ordering::Relaxed);
        } else {
            self.probe_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> FeedStatsSnapshot {
        let seconds_since_last_message = self
            .last_message_time
            .read()
            .ok()
            .and_then(|guard| *guard)
            .map(|t| t.elapsed().as_secs_f64());

        FeedStatsSnapshot {
            uptime_seconds: self.start_time.elapsed().as_secs_f64(),
            connect_attempts: self.connect_attempts.load(Ordering::Relaxed),
            connect_failures: self.connect_failures.load(Ordering::Relaxed),
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
            reconnects_scheduled: self.reconnects_scheduled.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            message_size_bytes: self.message_size_bytes.snapshot(),
            probes_sent: self.probes_sent.load(Ordering::Relaxed),
            probe_failures: self.probe_failures.load(Ordering::Relaxed),
            seconds_since_last_message,
        }
    }
}

/// Point-in-time copy of [`FeedStats`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeedStatsSnapshot {
    pub uptime_seconds: f64,
    pub connect_attempts: u64,
    pub connect_failures: u64,
    pub connections_opened: u64,
    pub reconnects_scheduled: u64,
    pub messages_received: u64,
    pub decode_errors: u64,
    pub message_size_bytes: StatSnapshot,
    pub probes_sent: u64,
    pub probe_failures: u64,
    pub seconds_since_last_message: Option<f64>,
}
