//! C6 — the control handler: applies out-of-band commands multiplexed on the
//! same FDIS stream as events (§4.6). Grounded on the fixed byte-opcode
//! command dispatch in `usb_bridge.rs` (`CMD_INIT`/`CMD_CLOCK`/... sent as a
//! single command byte plus parameters), generalized from a fixed hardware
//! command set to the three opcodes this spec defines.

use crate::sid_cell::ChipModel;

pub const OPCODE_CYCLE_MODE: u8 = 0x01;
pub const OPCODE_SET_VOICE_MASK: u8 = 0x02;
pub const OPCODE_SET_FILTER: u8 = 0x03;

/// Per-cell chip model assignment. `Split` assigns 6581 to cell 0 and 8580 to
/// cell 1 — see DESIGN.md Open Question 3 for how this interacts with
/// `SET_VOICE_MASK` (it doesn't: voice muting is orthogonal to chip model).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidModelMode {
    Mos6581,
    Mos8580,
    Split,
}

impl SidModelMode {
    /// `CYCLE_MODE` advances through exactly these three states in order
    /// (§8 invariant 6).
    pub fn next(self) -> Self {
        match self {
            SidModelMode::Mos6581 => SidModelMode::Mos8580,
            SidModelMode::Mos8580 => SidModelMode::Split,
            SidModelMode::Split => SidModelMode::Mos6581,
        }
    }

    /// Per-cell `(cell 0, cell 1)` model assignment for this mode.
    pub fn cell_models(self) -> (ChipModel, ChipModel) {
        match self {
            SidModelMode::Mos6581 => (ChipModel::Mos6581, ChipModel::Mos6581),
            SidModelMode::Mos8580 => (ChipModel::Mos8580, ChipModel::Mos8580),
            SidModelMode::Split => (ChipModel::Mos6581, ChipModel::Mos8580),
        }
    }
}

/// What the engine must do after a command record is parsed. Kept separate
/// from `ControlHandler`'s own state so the handler can be unit-tested
/// without an `Engine` in scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEffect {
    /// Reinitialize both cells with the new per-cell models; queued events
    /// are left intact (§4.6, S4).
    CycleModel { models: (ChipModel, ChipModel) },
    SetVoiceMask { mask: u8 },
    SetFilter { enabled: bool },
    /// Unknown opcode; its 4 bytes were already consumed by the parser.
    Unknown,
}

/// Holds the control-handler's own policy state: current model mode, voice
/// mute mask, and filter-enable flag. `Engine` asks this for an effect and
/// then carries it out against its cells.
pub struct ControlHandler {
    mode: SidModelMode,
    voice_mute_mask: u8,
    filter_enabled: bool,
}

impl ControlHandler {
    pub fn new(initial_model: ChipModel) -> Self {
        let mode = match initial_model {
            ChipModel::Mos6581 => SidModelMode::Mos6581,
            ChipModel::Mos8580 => SidModelMode::Mos8580,
        };
        Self {
            mode,
            voice_mute_mask: 0,
            filter_enabled: true,
        }
    }

    pub fn mode(&self) -> SidModelMode {
        self.mode
    }

    pub fn voice_mute_mask(&self) -> u8 {
        self.voice_mute_mask
    }

    pub fn filter_enabled(&self) -> bool {
        self.filter_enabled
    }

    /// Decode and apply a 4-byte command record (§4.6). Unknown opcodes
    /// consume their bytes silently and produce `ControlEffect::Unknown`.
    pub fn dispatch(&mut self, opcode: u8, param0: u8, _param1: u8, _param2: u8) -> ControlEffect {
        match opcode {
            OPCODE_CYCLE_MODE => {
                self.mode = self.mode.next();
                ControlEffect::CycleModel {
                    models: self.mode.cell_models(),
                }
            }
            OPCODE_SET_VOICE_MASK => {
                self.voice_mute_mask = param0;
                ControlEffect::SetVoiceMask { mask: param0 }
            }
            OPCODE_SET_FILTER => {
                let enabled = param0 != 0;
                self.filter_enabled = enabled;
                ControlEffect::SetFilter { enabled }
            }
            _ => ControlEffect::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// §8 invariant 6: CYCLE_MODE returns to start after three invocations.
    #[test]
    fn cycle_mode_has_period_three() {
        let mut h = ControlHandler::new(ChipModel::Mos6581);
        assert_eq!(h.mode(), SidModelMode::Mos6581);
        h.dispatch(OPCODE_CYCLE_MODE, 0, 0, 0);
        assert_eq!(h.mode(), SidModelMode::Mos8580);
        h.dispatch(OPCODE_CYCLE_MODE, 0, 0, 0);
        assert_eq!(h.mode(), SidModelMode::Split);
        h.dispatch(OPCODE_CYCLE_MODE, 0, 0, 0);
        assert_eq!(h.mode(), SidModelMode::Mos6581);
    }

    #[test]
    fn set_voice_mask_updates_state() {
        let mut h = ControlHandler::new(ChipModel::Mos6581);
        let effect = h.dispatch(OPCODE_SET_VOICE_MASK, 0b101, 0, 0);
        assert_eq!(effect, ControlEffect::SetVoiceMask { mask: 0b101 });
        assert_eq!(h.voice_mute_mask(), 0b101);
    }

    #[test]
    fn unknown_opcode_is_a_noop_effect() {
        let mut h = ControlHandler::new(ChipModel::Mos6581);
        let effect = h.dispatch(0xFE, 1, 2, 3);
        assert_eq!(effect, ControlEffect::Unknown);
        assert_eq!(h.mode(), SidModelMode::Mos6581);
    }

    #[test]
    fn split_mode_assigns_models_per_cell() {
        let mut h = ControlHandler::new(ChipModel::Mos8580);
        h.dispatch(OPCODE_CYCLE_MODE, 0, 0, 0); // 8580 -> Split
        assert_eq!(h.mode(), SidModelMode::Split);
        assert_eq!(
            h.mode().cell_models(),
            (ChipModel::Mos6581, ChipModel::Mos8580)
        );
    }
}
