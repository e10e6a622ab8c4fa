//! C8 — telemetry: per-frame and cumulative counters, write-only from every
//! other component (§4.8). Nothing here ever fails; it only counts.
//!
//! Grounded on the teacher's own diagnostic counters in `sid_emulated.rs`
//! (`frame_counter`, the "WARNING: sample() loop exceeded" rate-limited
//! `eprintln!`), generalized into the fuller counter set the ambient spec
//! asks for and a formatted status line instead of ad hoc `eprintln!` calls.

use std::time::Instant;

use crate::error::TelemetryError;

/// One frame's worth of accounting, as the frame parser reports it.
#[derive(Debug, Clone, Copy)]
pub struct FrameStats {
    pub events: u32,
    pub bytes: u32,
    pub duration_us: u64,
    pub frame_index: u32,
}

/// Cumulative + rolling telemetry (§4.8). `Display`ed as a single status
/// line; the render context formats it further, this struct just tracks the
/// numbers.
#[derive(Debug)]
pub struct Telemetry {
    frame_count: u64,
    total_events: u64,
    total_bytes: u64,
    min_frame_duration_us: u64,
    max_frame_duration_us: u64,
    sum_frame_duration_us: u64,
    last_frame_duration_us: u64,
    last_frame_at: Option<Instant>,
    last_inter_frame_gap_us: u64,
    local_frame_counter: u64,
    host_frame_offset: Option<i64>,
    drift: i64,
    queue_peak_depth: usize,
    dropped_count: u32,
    error_counts: [u32; 7],
    recent_bytes: Vec<u8>,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self {
            frame_count: 0,
            total_events: 0,
            total_bytes: 0,
            min_frame_duration_us: u64::MAX,
            max_frame_duration_us: 0,
            sum_frame_duration_us: 0,
            last_frame_duration_us: 0,
            last_frame_at: None,
            last_inter_frame_gap_us: 0,
            local_frame_counter: 0,
            host_frame_offset: None,
            drift: 0,
            queue_peak_depth: 0,
            dropped_count: 0,
            error_counts: [0; 7],
            recent_bytes: Vec::new(),
        }
    }
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed frame (§4.5 "per-frame accounting"). `now` is
    /// passed in rather than read internally so callers in tests can supply
    /// deterministic timestamps.
    pub fn record_frame(&mut self, stats: FrameStats, now: Instant) {
        self.frame_count += 1;
        self.total_events += stats.events as u64;
        self.total_bytes += stats.bytes as u64;
        self.last_frame_duration_us = stats.duration_us;
        self.min_frame_duration_us = self.min_frame_duration_us.min(stats.duration_us);
        self.max_frame_duration_us = self.max_frame_duration_us.max(stats.duration_us);
        self.sum_frame_duration_us += stats.duration_us;

        if let Some(prev) = self.last_frame_at {
            self.last_inter_frame_gap_us = now.duration_since(prev).as_micros() as u64;
        }
        self.last_frame_at = Some(now);

        self.local_frame_counter += 1;
        let offset = *self
            .host_frame_offset
            .get_or_insert(stats.frame_index as i64 - self.local_frame_counter as i64);
        self.drift = (stats.frame_index as i64) - (self.local_frame_counter as i64 + offset);
    }

    pub fn record_queue_depth(&mut self, depth: usize) {
        self.queue_peak_depth = self.queue_peak_depth.max(depth);
    }

    pub fn record_dropped_count(&mut self, dropped_count: u32) {
        self.dropped_count = dropped_count;
    }

    /// Absorb a fresh snapshot of the parser's recent-bytes ring (§3
    /// GLOSSARY). Telemetry only ever reads this ring — the parser is the
    /// sole writer.
    pub fn record_recent_bytes(&mut self, snapshot: Vec<u8>) {
        self.recent_bytes = snapshot;
    }

    pub fn recent_bytes(&self) -> &[u8] {
        &self.recent_bytes
    }

    /// Count a recoverable error without propagating it (§7/§9a).
    pub fn record_error(&mut self, error: TelemetryError) {
        self.error_counts[error as usize] += 1;
    }

    pub fn avg_frame_duration_us(&self) -> u64 {
        if self.frame_count == 0 {
            0
        } else {
            self.sum_frame_duration_us / self.frame_count
        }
    }

    /// Bytes/sec expressed as kbps, from the running total and the time
    /// since the first frame.
    pub fn read_throughput_kbps(&self, elapsed_us: u64) -> f64 {
        if elapsed_us == 0 {
            0.0
        } else {
            (self.total_bytes as f64 * 8.0) / (elapsed_us as f64 / 1000.0)
        }
    }

    pub fn drift(&self) -> i64 {
        self.drift
    }

    pub fn queue_peak_depth(&self) -> usize {
        self.queue_peak_depth
    }

    pub fn dropped_count(&self) -> u32 {
        self.dropped_count
    }

    /// The single status line every other component treats as write-only
    /// and the render context formats further (§4.8).
    pub fn status_line(&self) -> String {
        format!(
            "frames={} events={} bytes={} dur(min/avg/max)={}/{}/{}us gap={}us drift={} qpeak={} dropped={}",
            self.frame_count,
            self.total_events,
            self.total_bytes,
            if self.min_frame_duration_us == u64::MAX {
                0
            } else {
                self.min_frame_duration_us
            },
            self.avg_frame_duration_us(),
            self.max_frame_duration_us,
            self.last_inter_frame_gap_us,
            self.drift,
            self.queue_peak_depth,
            self.dropped_count,
        )
    }
}
