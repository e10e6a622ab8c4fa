//! C1 — the SID cell: an opaque, external, cycle-accurate SID chip emulator.
//!
//! The event scheduler (C2) never depends on a concrete emulator; it talks to
//! this trait. The reference implementation links `resid-rs`, wrapped the
//! same way `sid_emulated.rs::SendSid` wraps it — `resid::Sid` is `!Send` by
//! default on some backends, so the wrapper asserts `Send` for the
//! single-threaded event/audio context that owns it exclusively.

use resid::{ChipModel as ResidChipModel, SamplingMethod, Sid};

/// Chip model a cell can be configured to emulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipModel {
    Mos6581,
    Mos8580,
}

impl ChipModel {
    fn to_resid(self) -> ResidChipModel {
        match self {
            ChipModel::Mos6581 => ResidChipModel::Mos6581,
            ChipModel::Mos8580 => ResidChipModel::Mos8580,
        }
    }
}

/// Register + envelope snapshot for telemetry (§4.1 `read_state`).
#[derive(Debug, Clone)]
pub struct CellState {
    pub sid_register: [u8; 32],
    pub envelope_counter: [u8; 3],
}

/// The external contract C2 schedules work against. All operations are
/// synchronous, non-blocking, and single-threaded — the scheduler is the
/// only caller.
pub trait SidCell {
    fn write(&mut self, addr: u8, value: u8);
    fn clock(&mut self, cycles: u32);
    fn output(&self) -> i32;
    fn set_chip_model(&mut self, model: ChipModel);
    fn reset(&mut self);
    fn enable_filter(&mut self, enabled: bool);
    fn enable_external_filter(&mut self, enabled: bool);
    fn set_sampling_parameters(&mut self, clock_freq_hz: u32, sample_freq_hz: u32);
    fn read_state(&self) -> CellState;
}

/// `resid-rs`-backed cell. Asserting `Send` is sound here because the engine
/// owns all cells exclusively from the single event/audio context (§5); it is
/// never touched from the render context.
pub struct ResidCell {
    sid: Sid,
}

unsafe impl Send for ResidCell {}

impl ResidCell {
    pub fn new(model: ChipModel) -> Self {
        let mut sid = Sid::new(model.to_resid());
        sid.enable_filter(true);
        sid.enable_external_filter(true);
        Self { sid }
    }
}

impl SidCell for ResidCell {
    fn write(&mut self, addr: u8, value: u8) {
        self.sid.write(addr & 0x1F, value);
    }

    fn clock(&mut self, cycles: u32) {
        self.sid.clock_delta(cycles);
    }

    fn output(&self) -> i32 {
        self.sid.output() as i32
    }

    fn set_chip_model(&mut self, model: ChipModel) {
        self.sid.set_chip_model(model.to_resid());
    }

    fn reset(&mut self) {
        self.sid.reset();
    }

    fn enable_filter(&mut self, enabled: bool) {
        self.sid.enable_filter(enabled);
    }

    fn enable_external_filter(&mut self, enabled: bool) {
        self.sid.enable_external_filter(enabled);
    }

    fn set_sampling_parameters(&mut self, clock_freq_hz: u32, sample_freq_hz: u32) {
        self.sid.set_sampling_parameters(
            SamplingMethod::Fast,
            clock_freq_hz,
            sample_freq_hz,
        );
    }

    fn read_state(&self) -> CellState {
        let state = self.sid.read_state();
        let mut sid_register = [0u8; 32];
        sid_register.copy_from_slice(&state.sid_register[..32]);
        let mut envelope_counter = [0u8; 3];
        envelope_counter.copy_from_slice(&state.envelope_counter[..3]);
        CellState {
            sid_register,
            envelope_counter,
        }
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;

    /// Deterministic, allocation-free test double. Records every write and
    /// the cumulative cycles clocked so scheduler tests can assert on call
    /// order and totals without linking a real emulator (§9a test tooling).
    #[derive(Debug, Default, Clone)]
    pub struct MockCell {
        pub writes: Vec<(u8, u8)>,
        pub cycles_clocked: u64,
        pub model: Option<ChipModel>,
        pub filter_enabled: bool,
        pub external_filter_enabled: bool,
        pub reset_count: u32,
        /// Test hook: `output()` returns this verbatim so clamp behavior can
        /// be exercised without a real emulator.
        pub forced_output: i32,
    }

    impl SidCell for MockCell {
        fn write(&mut self, addr: u8, value: u8) {
            self.writes.push((addr & 0x1F, value));
        }

        fn clock(&mut self, cycles: u32) {
            self.cycles_clocked += cycles as u64;
        }

        fn output(&self) -> i32 {
            self.forced_output
        }

        fn set_chip_model(&mut self, model: ChipModel) {
            self.model = Some(model);
        }

        fn reset(&mut self) {
            self.reset_count += 1;
        }

        fn enable_filter(&mut self, enabled: bool) {
            self.filter_enabled = enabled;
        }

        fn enable_external_filter(&mut self, enabled: bool) {
            self.external_filter_enabled = enabled;
        }

        fn set_sampling_parameters(&mut self, _clock_freq_hz: u32, _sample_freq_hz: u32) {}

        fn read_state(&self) -> CellState {
            CellState {
                sid_register: [0u8; 32],
                envelope_counter: [0u8; 3],
            }
        }
    }
}
