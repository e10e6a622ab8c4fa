//! C2 — the event scheduler: the cycle-accurate heart of the pipeline.
//!
//! Grounded on `sid_emulated.rs::clock_and_push()` / `clock_sid()` (clock two
//! SIDs forward by a cycle delta, read back a sample, push a stereo pair),
//! generalized from "clock by the next queued write's delta, repeat" to the
//! fractional residual-accumulator algorithm the ambient spec lays out: the
//! SID clock and the audio sample clock are incommensurate, so each rendered
//! sample advances a non-integer number of SID cycles and the remainder
//! carries forward.

pub mod control;
pub mod flow;
pub mod queue;
pub mod voice;

use crate::sid_cell::{CellState, ChipModel, SidCell};
use control::{ControlEffect, ControlHandler};
use flow::FlowController;
use queue::{HostEventQueue, PendingEvent};

/// Owns both SID cells, the host event queue, and the control/flow policy
/// state. One `Engine` per session; constructed once at startup and driven
/// from the single event/audio context (§5) for its whole lifetime.
pub struct Engine<C: SidCell> {
    cells: [C; 2],
    queue: HostEventQueue,
    flow: FlowController,
    control: ControlHandler,
    cycles_per_sample: f64,
    cycle_residual: f64,
    output_gain: f32,
    zero_cycle_guard_count: u64,
}

impl<C: SidCell> Engine<C> {
    /// `cell_a`/`cell_b` are constructed by the caller (see `ResidCell::new`
    /// in the reference binary, or `MockCell::default()` in tests) so this
    /// type never depends on a concrete emulator.
    pub fn new(
        mut cell_a: C,
        mut cell_b: C,
        sid_clock_hz: u32,
        sample_rate_hz: u32,
        event_queue_capacity: usize,
        initial_model: ChipModel,
        output_gain: f32,
    ) -> Self {
        cell_a.set_sampling_parameters(sid_clock_hz, sample_rate_hz);
        cell_b.set_sampling_parameters(sid_clock_hz, sample_rate_hz);

        Self {
            cells: [cell_a, cell_b],
            queue: HostEventQueue::new(event_queue_capacity),
            flow: FlowController::new(event_queue_capacity),
            control: ControlHandler::new(initial_model),
            cycles_per_sample: sid_clock_hz as f64 / sample_rate_hz as f64,
            cycle_residual: 0.0,
            output_gain,
            zero_cycle_guard_count: 0,
        }
    }

    /// Queue a host write (§3/§4.4). Re-evaluates flow control afterwards.
    pub fn queue_event(&mut self, chip_mask: u8, addr: u8, value: u8, delta_cycles: u32) {
        self.queue.push(PendingEvent {
            chip_mask,
            addr,
            value,
            delta: delta_cycles,
        });
        self.flow.update(self.queue.depth());
    }

    pub fn get_queue_depth(&self) -> usize {
        self.queue.depth()
    }

    pub fn get_dropped_event_count(&self) -> u32 {
        self.queue.dropped_count()
    }

    /// Read-only snapshot of both cells plus queue/flow state, for a
    /// telemetry-facing caller that wants more than the four counters (§4.2
    /// C2 query methods). Never mutates anything; safe to call from the
    /// status/render context at any cadence.
    pub fn get_monitor(&self) -> EngineMonitor {
        EngineMonitor {
            cell_a: self.cells[0].read_state(),
            cell_b: self.cells[1].read_state(),
            queue_depth: self.queue.depth(),
            dropped_count: self.queue.dropped_count(),
            flow_paused: self.flow.is_paused(),
            zero_cycle_guard_count: self.zero_cycle_guard_count,
        }
    }

    /// Whether the transport must stop pulling host bytes (§4.7).
    pub fn is_flow_paused(&self) -> bool {
        self.flow.is_paused()
    }

    /// Clears queued events and pause state without touching the cumulative
    /// drop counter (§7 `Session.Reset`, §8 invariant 10).
    pub fn reset_queue_state(&mut self) {
        self.queue.reset();
        self.flow.reset();
        self.cycle_residual = 0.0;
    }

    /// Decode and apply a 4-byte command record (§4.6).
    pub fn handle_command(&mut self, opcode: u8, param0: u8, param1: u8, param2: u8) {
        let effect = self.control.dispatch(opcode, param0, param1, param2);
        self.apply_control_effect(effect);
    }

    fn apply_control_effect(&mut self, effect: ControlEffect) {
        match effect {
            ControlEffect::CycleModel { models } => {
                self.reinit_cell(0, models.0);
                self.reinit_cell(1, models.1);
            }
            ControlEffect::SetVoiceMask { .. } => {
                // Mask itself lives in `ControlHandler`; `apply_event` reads
                // it back through `self.control.voice_mute_mask()` at write
                // time, since the cell contract has no per-voice mute hook.
            }
            ControlEffect::SetFilter { enabled } => {
                self.cells[0].enable_filter(enabled);
                self.cells[1].enable_filter(enabled);
            }
            ControlEffect::Unknown => {}
        }
    }

    /// Re-point a cell at a different chip model without losing whatever is
    /// currently sounding: snapshot its 32 registers, reset, switch model,
    /// then replay the snapshot. The host event queue is untouched (S4).
    fn reinit_cell(&mut self, index: usize, model: ChipModel) {
        let snapshot = self.cells[index].read_state();
        self.cells[index].set_chip_model(model);
        self.cells[index].reset();
        for (addr, &value) in snapshot.sid_register.iter().enumerate() {
            self.cells[index].write(addr as u8, value);
        }
    }

    /// Apply one due event to the cell(s) its `chip_mask` selects. Bit 0 is
    /// cell A, bit 1 is cell B, `0` broadcasts to both (§4.2 edge cases). A
    /// write targeting a muted voice's register range is suppressed rather
    /// than forwarded — the only way to honor `SET_VOICE_MASK` through a
    /// cell contract that only exposes whole-chip `output()`.
    fn apply_event(&mut self, event: PendingEvent) {
        let voice = (event.addr & 0x1F) / 7;
        if voice < 3 && self.control.voice_mute_mask() & (1 << voice) != 0 {
            return;
        }

        // Only bits 0/1 are meaningful (§4.2 edge cases); any other
        // host-supplied bits (e.g. the free-form 8-byte wire variant's
        // `chip` byte) are ignored before deciding broadcast-vs-routed, so a
        // value like 0b100 still broadcasts instead of silently dropping.
        let m = event.chip_mask & 0b11;
        let broadcast = m == 0;
        if broadcast || m & 0x01 != 0 {
            self.cells[0].write(event.addr, event.value);
        }
        if broadcast || m & 0x02 != 0 {
            self.cells[1].write(event.addr, event.value);
        }
    }

    /// Pop and apply every event already due (`delta == 0`) without
    /// advancing the clock, so a burst of simultaneous writes all lands
    /// before the next sample is rendered.
    fn drain_due_events(&mut self) {
        while matches!(self.queue.peek(), Some(e) if e.delta == 0) {
            if let Some(event) = self.queue.pop() {
                self.apply_event(event);
            }
        }
    }

    /// Render one stereo sample (§4.2). This is the entire per-sample
    /// scheduling algorithm: accumulate the fractional SID-cycle budget,
    /// clock both cells forward in runs bounded by the next due event,
    /// applying events as their deltas reach zero, then read back and scale
    /// the cells' raw output.
    pub fn render_sample(&mut self) -> (i16, i16) {
        self.cycle_residual += self.cycles_per_sample;
        let mut cycles = self.cycle_residual.floor() as i64;
        self.cycle_residual -= cycles as f64;

        if cycles < 1 {
            // The sample/SID clock ratio can momentarily round to zero
            // whole cycles; force one cycle so time still advances and
            // count it as a scheduling anomaly rather than silently
            // stalling (§8 invariant 5).
            cycles = 1;
            self.cycle_residual = 0.0;
            self.zero_cycle_guard_count += 1;
        }
        let mut cycles = cycles as u32;

        self.drain_due_events();

        while cycles > 0 {
            let run = match self.queue.cycles_to_next() {
                Some(next) => cycles.min(next.max(1)),
                None => cycles,
            };

            self.cells[0].clock(run);
            self.cells[1].clock(run);
            cycles -= run;

            if let Some(head) = self.queue.peek_mut() {
                head.delta = head.delta.saturating_sub(run);
            }
            self.drain_due_events();
        }

        let left = scale_and_clamp(self.cells[0].output(), self.output_gain);
        let right = scale_and_clamp(self.cells[1].output(), self.output_gain);
        (left, right)
    }

    /// Count of `render_sample` calls that hit the zero-cycle guard. Counted
    /// telemetry, never propagated as an error (§7/§9a).
    pub fn zero_cycle_guard_count(&self) -> u64 {
        self.zero_cycle_guard_count
    }

}

/// Point-in-time snapshot exposed by `Engine::get_monitor` (§4.2). Plain
/// data, no behavior; a caller reads it once and discards it.
#[derive(Debug, Clone)]
pub struct EngineMonitor {
    pub cell_a: CellState,
    pub cell_b: CellState,
    pub queue_depth: usize,
    pub dropped_count: u32,
    pub flow_paused: bool,
    pub zero_cycle_guard_count: u64,
}

/// Scale a cell's raw output by the configured gain and clamp to `i16`
/// range (§8 invariant 9) rather than wrapping on overflow.
fn scale_and_clamp(raw: i32, gain: f32) -> i16 {
    let scaled = raw as f32 * gain;
    scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sid_cell::mock::MockCell;

    fn engine(capacity: usize) -> Engine<MockCell> {
        Engine::new(
            MockCell::default(),
            MockCell::default(),
            985_248,
            44_100,
            capacity,
            ChipModel::Mos6581,
            1.0,
        )
    }

    /// §8 invariant 9: output never exceeds i16 range even with gain > 1.
    #[test]
    fn output_is_clamped_not_wrapped() {
        let mut e = engine(16);
        e.cells[0].forced_output = 40_000;
        e.cells[1].forced_output = -40_000;
        e.output_gain = 1.0;
        let (l, r) = e.render_sample();
        assert_eq!(l, i16::MAX);
        assert_eq!(r, i16::MIN);
    }

    /// S1: a single event with a large delta only fires once enough cycles
    /// have been clocked across possibly several `render_sample` calls.
    #[test]
    fn event_fires_only_after_its_delta_elapses() {
        let mut e = engine(16);
        e.queue_event(0, 0x00, 0xAB, 50);
        // cycles_per_sample ~= 22.34; two samples (44 cycles) aren't enough.
        e.render_sample();
        e.render_sample();
        assert!(e.cells[0].writes.is_empty());
        e.render_sample(); // third sample crosses the 50-cycle delta
        assert_eq!(e.cells[0].writes, vec![(0x00, 0xAB)]);
    }

    /// S3-equivalent: broadcast (chip_mask == 0) reaches both cells.
    #[test]
    fn broadcast_event_reaches_both_cells() {
        let mut e = engine(16);
        e.queue_event(0, 0x05, 0x42, 0);
        e.render_sample();
        assert_eq!(e.cells[0].writes, vec![(0x05, 0x42)]);
        assert_eq!(e.cells[1].writes, vec![(0x05, 0x42)]);
    }

    /// Chip mask bit 0 / bit 1 route exclusively to one cell.
    #[test]
    fn chip_mask_routes_to_single_cell() {
        let mut e = engine(16);
        e.queue_event(0x01, 0x05, 0x11, 0);
        e.queue_event(0x02, 0x06, 0x22, 0);
        e.render_sample();
        assert_eq!(e.cells[0].writes, vec![(0x05, 0x11)]);
        assert_eq!(e.cells[1].writes, vec![(0x06, 0x22)]);
    }

    /// §8 invariant 5: bits outside {bit0, bit1} are ignored before the
    /// broadcast check, so a stray high bit (e.g. from the 8-byte wire
    /// variant's free-form chip byte) still broadcasts instead of being
    /// dropped to neither cell.
    #[test]
    fn chip_mask_ignores_bits_above_bit_one_and_still_broadcasts() {
        let mut e = engine(16);
        e.queue_event(0b100, 0x05, 0x42, 0);
        e.render_sample();
        assert_eq!(e.cells[0].writes, vec![(0x05, 0x42)]);
        assert_eq!(e.cells[1].writes, vec![(0x05, 0x42)]);
    }

    /// S4: CYCLE_MODE reinitializes both cells but the host queue survives.
    #[test]
    fn cycle_model_preserves_queued_events() {
        let mut e = engine(16);
        e.queue_event(0, 0x18, 0x0F, 1000);
        e.handle_command(control::OPCODE_CYCLE_MODE, 0, 0, 0);
        assert_eq!(e.cells[0].model, Some(ChipModel::Mos8580));
        assert_eq!(e.cells[0].reset_count, 1);
        assert_eq!(e.get_queue_depth(), 1);
    }

    /// SET_VOICE_MASK suppresses writes into a muted voice's register range
    /// without affecting other voices.
    #[test]
    fn voice_mask_suppresses_writes_to_muted_voice() {
        let mut e = engine(16);
        e.handle_command(control::OPCODE_SET_VOICE_MASK, 0b001, 0, 0); // mute voice 0
        e.queue_event(0, 0x00, 0xFF, 0); // voice 0 frequency lo
        e.queue_event(0, 0x07, 0xFF, 0); // voice 1 frequency lo
        e.render_sample();
        assert_eq!(e.cells[0].writes, vec![(0x07, 0xFF)]);
    }

    /// SET_FILTER toggles both cells' filter stage.
    #[test]
    fn set_filter_toggles_both_cells() {
        let mut e = engine(16);
        e.handle_command(control::OPCODE_SET_FILTER, 0, 0, 0);
        assert!(!e.cells[0].filter_enabled);
        assert!(!e.cells[1].filter_enabled);
    }

    /// §4.2: `get_monitor` surfaces both cells' register snapshots plus the
    /// same queue/flow numbers the dedicated query methods report.
    #[test]
    fn get_monitor_reports_cell_state_and_queue_stats() {
        let mut e = engine(2);
        e.queue_event(0, 0x00, 0x00, 1);
        e.queue_event(0, 0x00, 0x00, 1);
        e.queue_event(0, 0x00, 0x00, 1); // forces a drop
        let mon = e.get_monitor();
        assert_eq!(mon.queue_depth, e.get_queue_depth());
        assert_eq!(mon.dropped_count, 1);
        assert_eq!(mon.cell_a.sid_register.len(), 32);
        assert_eq!(mon.cell_b.envelope_counter.len(), 3);
    }

    /// §7 / §8 invariant 10: a queue reset clears depth but not the
    /// lifetime-cumulative drop counter.
    #[test]
    fn reset_clears_queue_but_not_drop_counter() {
        let mut e = engine(2);
        e.queue_event(0, 0, 0, 1);
        e.queue_event(0, 0, 0, 1);
        e.queue_event(0, 0, 0, 1); // forces a drop
        assert_eq!(e.get_dropped_event_count(), 1);
        e.reset_queue_state();
        assert_eq!(e.get_queue_depth(), 0);
        assert_eq!(e.get_dropped_event_count(), 1);
    }
}
