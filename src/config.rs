//! Init-time configuration knobs (§6). Unlike the wider player ecosystem this
//! crate is descended from, there is no playlist, no favorites, and no
//! songlength database to persist — SPEC_FULL.md §6 states "Persisted state:
//! none" — so this is a plain `Default`-implementing struct built once from
//! CLI flags, not the load/save-to-disk pattern the teacher uses for its own
//! on-disk config.

use crate::sid_cell::ChipModel;

/// Width of an event record on the wire (§6, Open Question 1 — resolved in
/// DESIGN.md as a local config knob rather than a wire-negotiated value).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventRecordWidth {
    /// `addr:u8, value:u8, delta:u32` — 6 bytes, the default.
    Six,
    /// `chip:u8, addr:u8, value:u8, pad:u8, delta:u32` — 8 bytes.
    Eight,
}

/// On-wire header width (§6): the 10-byte form omits the reserved padding
/// field and is the one every host tool is required to support; the 12-byte
/// form carries it. Resolved the same way as `EventRecordWidth` — a local
/// knob rather than something negotiated over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderWidth {
    Ten,
    Twelve,
}

/// Where the reference binary reads framed bytes from (§9b).
#[derive(Debug, Clone)]
pub enum TransportSource {
    /// A serial device path, e.g. `/dev/ttyACM0`, opened as a plain file
    /// handle standing in for the USB CDC endpoint.
    SerialPath(String),
    /// A file to replay (a captured FDIS dump).
    File(String),
    /// Standard input.
    Stdin,
}

impl Default for TransportSource {
    fn default() -> Self {
        TransportSource::Stdin
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub sample_rate_hz: u32,
    pub audio_buffer_frames: usize,
    pub event_queue_capacity: usize,
    pub sid_clock_hz: u32,
    pub initial_chip_model: ChipModel,
    pub output_gain: f32,
    pub event_record_width: EventRecordWidth,
    pub header_width: HeaderWidth,
    pub transport: TransportSource,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 44_100,
            audio_buffer_frames: 128,
            event_queue_capacity: 4096,
            sid_clock_hz: 985_248, // PAL
            initial_chip_model: ChipModel::Mos6581,
            output_gain: 1.5,
            event_record_width: EventRecordWidth::Six,
            header_width: HeaderWidth::Ten,
            transport: TransportSource::default(),
        }
    }
}

impl EngineConfig {
    /// Parse CLI flags over the defaults. Unrecognized flags are ignored,
    /// matching the permissive style of the teacher's own ad hoc arg parsing
    /// in `main.rs`.
    pub fn from_args<I: IntoIterator<Item = String>>(args: I) -> Result<Self, String> {
        let mut cfg = Self::default();
        let mut iter = args.into_iter().peekable();

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--sample-rate" => cfg.sample_rate_hz = next_u32(&mut iter, "--sample-rate")?,
                "--buffer-frames" => {
                    cfg.audio_buffer_frames = next_u32(&mut iter, "--buffer-frames")? as usize
                }
                "--queue-capacity" => {
                    cfg.event_queue_capacity = next_u32(&mut iter, "--queue-capacity")? as usize
                }
                "--sid-clock" => cfg.sid_clock_hz = next_u32(&mut iter, "--sid-clock")?,
                "--output-gain" => {
                    let v = iter
                        .next()
                        .ok_or_else(|| "--output-gain requires a value".to_string())?;
                    cfg.output_gain = v
                        .parse()
                        .map_err(|_| format!("--output-gain: invalid float {v:?}"))?;
                }
                "--chip-model" => {
                    let v = iter
                        .next()
                        .ok_or_else(|| "--chip-model requires a value".to_string())?;
                    cfg.initial_chip_model = match v.as_str() {
                        "6581" => ChipModel::Mos6581,
                        "8580" => ChipModel::Mos8580,
                        other => return Err(format!("--chip-model: unknown model {other:?}")),
                    };
                }
                "--record-width" => {
                    let v = iter
                        .next()
                        .ok_or_else(|| "--record-width requires a value".to_string())?;
                    cfg.event_record_width = match v.as_str() {
                        "6" => EventRecordWidth::Six,
                        "8" => EventRecordWidth::Eight,
                        other => return Err(format!("--record-width: unknown width {other:?}")),
                    };
                }
                "--header-width" => {
                    let v = iter
                        .next()
                        .ok_or_else(|| "--header-width requires a value".to_string())?;
                    cfg.header_width = match v.as_str() {
                        "10" => HeaderWidth::Ten,
                        "12" => HeaderWidth::Twelve,
                        other => return Err(format!("--header-width: unknown width {other:?}")),
                    };
                }
                "--serial" => {
                    let v = iter
                        .next()
                        .ok_or_else(|| "--serial requires a path".to_string())?;
                    cfg.transport = TransportSource::SerialPath(v);
                }
                "--file" => {
                    let v = iter
                        .next()
                        .ok_or_else(|| "--file requires a path".to_string())?;
                    cfg.transport = TransportSource::File(v);
                }
                "--stdin" => cfg.transport = TransportSource::Stdin,
                _ => {}
            }
        }

        Ok(cfg)
    }

    pub fn cycles_per_sample(&self) -> f64 {
        self.sid_clock_hz as f64 / self.sample_rate_hz as f64
    }
}

fn next_u32<I: Iterator<Item = String>>(iter: &mut I, flag: &str) -> Result<u32, String> {
    let v = iter
        .next()
        .ok_or_else(|| format!("{flag} requires a value"))?;
    v.parse().map_err(|_| format!("{flag}: invalid integer {v:?}"))
}
