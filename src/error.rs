//! Hot-path error taxonomy (§7). None of these are ever propagated as
//! `Result` — they are counted locally and surfaced through telemetry.
//! Startup failures (bad transport path, no audio device) are ordinary
//! `Result<T, String>` values instead; see `config.rs` and `main.rs`.

/// Design-level error kinds for the event/audio hot path. Every variant is
/// recovered locally within the same call that detects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryError {
    /// Parser dropped one byte while scanning for the FDIS magic.
    TransportMagicLost,
    /// Header declared `count > 8192`.
    TransportOversizedCount,
    /// Parser's internal byte buffer saturated; oldest half discarded.
    TransportBufferFull,
    /// C4 was full; oldest event dropped and its delta merged forward.
    QueueOverflow,
    /// Sample pump found no free buffer; retried next tick.
    AudioNoFreeBuffer,
    /// Host detach observed; parser + C4 reset, SID cells kept.
    SessionReset,
    /// `cycles_per_sample` rounded to zero; forced to 1 for forward progress.
    SchedulerZeroCycle,
}

impl TelemetryError {
    pub fn as_str(self) -> &'static str {
        match self {
            TelemetryError::TransportMagicLost => "Transport.MagicLost",
            TelemetryError::TransportOversizedCount => "Transport.OversizedCount",
            TelemetryError::TransportBufferFull => "Transport.BufferFull",
            TelemetryError::QueueOverflow => "Queue.Overflow",
            TelemetryError::AudioNoFreeBuffer => "Audio.NoFreeBuffer",
            TelemetryError::SessionReset => "Session.Reset",
            TelemetryError::SchedulerZeroCycle => "Scheduler.ZeroCycle",
        }
    }
}

impl std::fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
