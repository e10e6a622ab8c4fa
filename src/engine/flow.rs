//! C7 — the flow controller: watermark-based backpressure signal the parser
//! consults before pulling more bytes from USB (§4.7).
//!
//! Grounded directly on the watermark pause/resume pattern used by this
//! ecosystem's existing SID-write drain logic (`has_max_data_in_buffer()` /
//! `has_min_data_in_buffer()` gating a "start draining" decision) — the
//! closest available precedent, carried over almost as-is.

/// Cushion below full capacity before asserting "halt host reads".
const HIGH_WATERMARK_SLACK: usize = 128;
/// Depth at or below which reads resume.
const LOW_WATERMARK: usize = 256;

pub struct FlowController {
    paused: bool,
    high: usize,
    low: usize,
}

impl FlowController {
    pub fn new(capacity: usize) -> Self {
        Self {
            paused: false,
            high: capacity.saturating_sub(HIGH_WATERMARK_SLACK),
            low: LOW_WATERMARK.min(capacity),
        }
    }

    /// Re-evaluate pause state against the queue's current depth (§4.7
    /// transitions). Call after every push/pop.
    pub fn update(&mut self, depth: usize) {
        if !self.paused && depth >= self.high {
            self.paused = true;
        } else if self.paused && depth <= self.low {
            self.paused = false;
        }
    }

    /// Whether the parser must yield instead of pulling more USB bytes.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn reset(&mut self) {
        self.paused = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pauses_at_high_watermark_and_resumes_at_low() {
        let mut f = FlowController::new(4096);
        assert!(!f.is_paused());

        f.update(4096 - 128); // exactly high
        assert!(f.is_paused());

        f.update(300); // above low, still paused
        assert!(f.is_paused());

        f.update(256); // exactly low
        assert!(!f.is_paused());
    }

    #[test]
    fn does_not_flap_between_watermarks() {
        let mut f = FlowController::new(4096);
        f.update(4096 - 128);
        assert!(f.is_paused());
        f.update(1000); // between low and high: must stay paused
        assert!(f.is_paused());
    }

    #[test]
    fn reset_clears_pause() {
        let mut f = FlowController::new(4096);
        f.update(4096);
        assert!(f.is_paused());
        f.reset();
        assert!(!f.is_paused());
    }
}
