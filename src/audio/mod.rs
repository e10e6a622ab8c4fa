//! C3 — the sample pump, and (§9b) the `cpal` output stream it feeds.
//!
//! Grounded on `sid_emulated.rs::spawn_audio_thread` / its shared
//! `Arc<Mutex<VecDeque<(i16, i16)>>>` ring: that code renders continuously
//! into one big ring and lets the `cpal` callback drain it. This module
//! generalizes that into the fixed-size buffer pool the ambient spec
//! describes — acquire a free buffer, fill it in one shot via the engine,
//! hand it to the realtime callback, return it to the free list once
//! drained — while keeping the teacher's "device's native rate, `cpal`
//! thread owns the stream" startup shape.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::sid_cell::SidCell;

struct StereoBuffer {
    frames: Vec<(i16, i16)>,
    sample_count: usize,
    cursor: usize,
}

impl StereoBuffer {
    fn new(max_sample_count: usize) -> Self {
        Self {
            frames: vec![(0, 0); max_sample_count],
            sample_count: 0,
            cursor: 0,
        }
    }
}

struct PumpShared {
    buffers: Vec<StereoBuffer>,
    free: VecDeque<usize>,
    ready: VecDeque<usize>,
}

/// Number of fixed buffers in the pool. Two is the spec's required
/// pre-fill; a couple of spares absorb scheduling jitter in the host loop
/// without unbounded growth.
const POOL_SIZE: usize = 4;

/// C3 contract: acquire a free buffer (non-blocking), fill it completely via
/// the engine, hand it to the realtime consumer. Shared with the `cpal`
/// callback through `Arc<Mutex<_>>`, matching the teacher's shared-ring
/// discipline.
#[derive(Clone)]
pub struct SamplePump {
    shared: Arc<Mutex<PumpShared>>,
    max_sample_count: usize,
}

impl SamplePump {
    pub fn new(max_sample_count: usize) -> Self {
        let buffers = (0..POOL_SIZE)
            .map(|_| StereoBuffer::new(max_sample_count))
            .collect();
        let free = (0..POOL_SIZE).collect();
        Self {
            shared: Arc::new(Mutex::new(PumpShared {
                buffers,
                free,
                ready: VecDeque::new(),
            })),
            max_sample_count,
        }
    }

    /// Fill and hand off one buffer. Returns `false` (a no-op) if the pool
    /// has no free buffer right now (§4.3 "acquire is non-blocking").
    pub fn pump<C: SidCell>(&self, engine: &mut crate::engine::Engine<C>) -> bool {
        let mut shared = self.shared.lock().unwrap();
        let Some(idx) = shared.free.pop_front() else {
            return false;
        };
        drop(shared);

        let mut frames = Vec::with_capacity(self.max_sample_count);
        for _ in 0..self.max_sample_count {
            frames.push(engine.render_sample());
        }

        let mut shared = self.shared.lock().unwrap();
        let buf = &mut shared.buffers[idx];
        buf.frames.copy_from_slice(&frames);
        buf.sample_count = self.max_sample_count;
        buf.cursor = 0;
        shared.ready.push_back(idx);
        true
    }

    /// Pre-fill two buffers on init to avoid an initial underrun (§4.3).
    pub fn prefill<C: SidCell>(&self, engine: &mut crate::engine::Engine<C>) {
        self.pump(engine);
        self.pump(engine);
    }
}

/// Open the default output device at its native rate and start streaming
/// from `pump`'s ready queue. Returns the stream (must be kept alive by the
/// caller) and the device's actual sample rate.
pub fn start_output_stream(pump: SamplePump) -> Result<(cpal::Stream, u32), String> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| "no audio output device found".to_string())?;

    let dev_name = device.name().unwrap_or_else(|_| "unknown".into());
    let default_config = device
        .default_output_config()
        .map_err(|e| format!("no default output config: {e}"))?;
    let actual_rate = default_config.sample_rate().0;

    eprintln!("[audio] output device: '{dev_name}', native rate: {actual_rate}Hz");

    let config = cpal::StreamConfig {
        channels: 2,
        sample_rate: cpal::SampleRate(actual_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let shared = pump.shared;
    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let mut shared = shared.lock().unwrap();
                let frames_needed = data.len() / 2;
                let mut written = 0;

                while written < frames_needed {
                    let Some(&idx) = shared.ready.front() else {
                        for frame in &mut data[written * 2..frames_needed * 2] {
                            *frame = 0.0;
                        }
                        break;
                    };

                    let buf = &mut shared.buffers[idx];
                    while buf.cursor < buf.sample_count && written < frames_needed {
                        let (l, r) = buf.frames[buf.cursor];
                        data[written * 2] = l as f32 / 32768.0;
                        data[written * 2 + 1] = r as f32 / 32768.0;
                        buf.cursor += 1;
                        written += 1;
                    }

                    if buf.cursor >= buf.sample_count {
                        shared.ready.pop_front();
                        buf.cursor = 0;
                        buf.sample_count = 0;
                        shared.free.push_back(idx);
                    }
                }
            },
            move |err| {
                eprintln!("[audio] stream error: {err}");
            },
            None,
        )
        .map_err(|e| format!("build_output_stream failed: {e}"))?;

    stream
        .play()
        .map_err(|e| format!("stream.play() failed: {e}"))?;

    Ok((stream, actual_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::sid_cell::mock::MockCell;
    use crate::sid_cell::ChipModel;

    fn engine() -> Engine<MockCell> {
        Engine::new(
            MockCell::default(),
            MockCell::default(),
            985_248,
            44_100,
            64,
            ChipModel::Mos6581,
            1.0,
        )
    }

    #[test]
    fn pump_fills_a_buffer_and_prefill_fills_two() {
        let pump = SamplePump::new(16);
        let mut e = engine();
        pump.prefill(&mut e);
        let shared = pump.shared.lock().unwrap();
        assert_eq!(shared.ready.len(), 2);
        assert_eq!(shared.free.len(), POOL_SIZE - 2);
    }

    #[test]
    fn pump_is_a_noop_when_pool_is_exhausted() {
        let pump = SamplePump::new(4);
        let mut e = engine();
        for _ in 0..POOL_SIZE {
            assert!(pump.pump(&mut e));
        }
        assert!(!pump.pump(&mut e));
    }
}
