//! Generate testdata command implementation.
//!
//! Generates a synthetic recent-history JSON file for one node.

use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, Utc};
use fleetpulse::sample::{ConnectionStats, CpuStats, LoadStats, NetworkStats, UsageStats};
use fleetpulse::RawSample;
use rand::Rng;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

// Constants for byte conversions
const MB: u64 = 1024 * 1024;
const GB: u64 = 1024 * MB;

// Static totals of the synthetic node
const RAM_TOTAL: u64 = 8 * GB;
const SWAP_TOTAL: u64 = 2 * GB;
const DISK_TOTAL: u64 = 100 * GB;

// Upper bounds for rates and counts
const MAX_RATE_BYTES: u64 = 20 * MB;
const MAX_TCP: u64 = 400;
const MAX_UDP: u64 = 60;

/// Generates synthetic history samples ending at `end`, oldest first.
pub fn generate_samples(
    rng: &mut impl Rng,
    count: usize,
    interval_secs: u64,
    end: DateTime<Utc>,
) -> Vec<RawSample> {
    let mut samples = Vec::with_capacity(count);

    let mut cpu: f64 = rng.gen_range(5.0..40.0);
    let mut ram_used = rng.gen_range(GB..4 * GB);
    let mut disk_used = rng.gen_range(10 * GB..60 * GB);
    let mut total_up: u64 = rng.gen_range(0..10 * GB);
    let mut total_down: u64 = rng.gen_range(0..10 * GB);
    let uptime_start: u64 = rng.gen_range(3_600..30 * 86_400);

    for i in 0..count {
        let steps_back = (count - 1 - i) as i64;
        let at = end - ChronoDuration::seconds(steps_back * interval_secs as i64);

        // Random walks keep neighbouring points related
        cpu = (cpu + rng.gen_range(-8.0..8.0)).clamp(0.0, 100.0);
        let ram_step = rng.gen_range(0..64 * MB);
        ram_used = if rng.gen_bool(0.5) {
            ram_used.saturating_add(ram_step).min(RAM_TOTAL)
        } else {
            ram_used.saturating_sub(ram_step)
        };
        disk_used = (disk_used + rng.gen_range(0..MB)).min(DISK_TOTAL);

        let up = rng.gen_range(0..MAX_RATE_BYTES);
        let down = rng.gen_range(0..MAX_RATE_BYTES);
        total_up += up * interval_secs;
        total_down += down * interval_secs;

        let load1 = cpu / 25.0;
        samples.push(RawSample {
            cpu: CpuStats {
                usage: (cpu * 100.0).round() / 100.0,
            },
            ram: UsageStats {
                used: ram_used,
                total: RAM_TOTAL,
            },
            swap: UsageStats {
                used: rng.gen_range(0..SWAP_TOTAL / 8),
                total: SWAP_TOTAL,
            },
            load: LoadStats {
                load1,
                load5: load1 * 0.9,
                load15: load1 * 0.8,
            },
            disk: UsageStats {
                used: disk_used,
                total: DISK_TOTAL,
            },
            network: NetworkStats {
                up,
                down,
                total_up,
                total_down,
            },
            connections: ConnectionStats {
                tcp: rng.gen_range(0..MAX_TCP),
                udp: rng.gen_range(0..MAX_UDP),
            },
            uptime: uptime_start + i as u64 * interval_secs,
            process: rng.gen_range(80..400),
            message: String::new(),
            updated_at: at.to_rfc3339_opts(SecondsFormat::Secs, true),
        });
    }

    samples
}

/// Writes a synthetic history file usable with `--test-data-file`.
pub fn command_generate_testdata(
    output: PathBuf,
    count: usize,
    interval_secs: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    if interval_secs == 0 {
        return Err("interval_secs must be greater than 0".into());
    }

    debug!(
        "Generating test data: count={}, interval_secs={}, output={}",
        count,
        interval_secs,
        output.display()
    );

    let mut rng = rand::thread_rng();
    let samples = generate_samples(&mut rng, count, interval_secs, Utc::now());

    // Write to file as pretty-printed JSON
    let json_content = serde_json::to_string_pretty(&samples)?;
    fs::write(&output, &json_content)?;

    println!(
        "✅ Generated test data: {} samples in {}",
        samples.len(),
        output.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fleetpulse::history::{load_samples_from_file, parse_recent};

    fn end() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_samples_are_ordered_and_bounded() {
        let mut rng = rand::thread_rng();
        let samples = generate_samples(&mut rng, 30, 2, end());

        assert_eq!(samples.len(), 30);
        assert_eq!(samples.last().unwrap().updated_at, "2024-05-01T12:00:00Z");
        assert_eq!(samples[0].updated_at, "2024-05-01T11:59:02Z");
        for pair in samples.windows(2) {
            assert!(pair[0].updated_at < pair[1].updated_at);
            assert!(pair[0].uptime < pair[1].uptime);
        }
        for s in &samples {
            assert!((0.0..=100.0).contains(&s.cpu.usage));
            assert!(s.ram.used <= s.ram.total);
            assert!(s.disk.used <= s.disk.total);
        }
    }

    #[test]
    fn test_generated_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        command_generate_testdata(path.clone(), 5, 1).unwrap();

        let loaded = load_samples_from_file(&path).unwrap();
        assert_eq!(loaded.len(), 5);

        let body = std::fs::read_to_string(&path).unwrap();
        assert_eq!(parse_recent(&body).unwrap().len(), 5);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(command_generate_testdata(dir.path().join("x.json"), 5, 0).is_err());
    }
}
