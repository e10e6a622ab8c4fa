//! Reference binary (§9b): reads a framed FDIS byte stream from a
//! configurable source, drives the cycle-accurate dual-SID engine, and
//! plays the result through the default `cpal` output device.
//!
//! This replaces the teacher's `iced` desktop player: there is no playlist,
//! no GUI, and no `.sid` file loader here — only the device-side consumer
//! half of the pipeline the wider player ecosystem's USB bridge used to
//! talk to.

mod audio;
mod config;
mod engine;
mod error;
mod sid_cell;
mod status;
mod telemetry;
mod transport;

use std::io::{Read, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use config::EngineConfig;
use sid_cell::ResidCell;

fn main() {
    env_logger::init();

    let cfg = match EngineConfig::from_args(std::env::args().skip(1)) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("[main] {e}");
            std::process::exit(2);
        }
    };
    log::info!("[main] config: {cfg:?}");

    let mut source = match transport::open_source(&cfg.transport) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("[transport] {e}");
            std::process::exit(1);
        }
    };

    let mut engine = engine::Engine::new(
        ResidCell::new(cfg.initial_chip_model),
        ResidCell::new(cfg.initial_chip_model),
        cfg.sid_clock_hz,
        cfg.sample_rate_hz,
        cfg.event_queue_capacity,
        cfg.initial_chip_model,
        cfg.output_gain,
    );

    let pump = audio::SamplePump::new(cfg.audio_buffer_frames);
    pump.prefill(&mut engine);

    let (_stream, actual_rate) = match audio::start_output_stream(pump.clone()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("[audio] {e}");
            std::process::exit(1);
        }
    };
    if actual_rate != cfg.sample_rate_hz {
        log::warn!(
            "[audio] device native rate {actual_rate}Hz differs from configured {}Hz",
            cfg.sample_rate_hz
        );
    }

    let mut parser = transport::FrameParser::new(cfg.event_record_width, cfg.header_width);
    let mut telemetry = telemetry::Telemetry::new();
    let status_lines = Arc::new(status::StatusLines::new());

    let status_for_render = status_lines.clone();
    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(0);
    let render_handle = std::thread::Builder::new()
        .name("sidstream-status".into())
        .spawn(move || {
            let mut cache = status::StatusCache::new();
            loop {
                match shutdown_rx.recv_timeout(Duration::from_millis(200)) {
                    Ok(()) => break,
                    Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                        eprintln!("[status] {}", cache.refresh(&status_for_render));
                    }
                    Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
                }
            }
        })
        .expect("spawn status thread");

    print!("[DUMP] READY\r\n");
    std::io::stdout().flush().ok();

    let mut read_buf = [0u8; 4096];
    let mut last_dropped_count = 0u32;

    loop {
        if !engine.is_flow_paused() {
            match source.read(&mut read_buf) {
                Ok(0) => {
                    log::info!("[transport] end of stream");
                    break;
                }
                Ok(n) => {
                    let outcome = parser.feed(&read_buf[..n]);
                    telemetry.record_recent_bytes(parser.recent_bytes());
                    for err in outcome.errors {
                        telemetry.record_error(err);
                    }
                    for item in outcome.items {
                        handle_frame_item(
                            item,
                            &mut engine,
                            &mut telemetry,
                            &status_lines,
                            &mut last_dropped_count,
                        );
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    // Non-blocking serial source with nothing buffered yet.
                }
                Err(e) => {
                    eprintln!("[transport] read error: {e}");
                    break;
                }
            }
        }

        if !pump.pump(&mut engine) {
            telemetry.record_error(error::TelemetryError::AudioNoFreeBuffer);
        }
    }

    drop(shutdown_tx);
    let _ = render_handle.join();
    log::info!("[main] exiting");
}

fn handle_frame_item(
    item: transport::FrameEvent,
    engine: &mut engine::Engine<ResidCell>,
    telemetry: &mut telemetry::Telemetry,
    status_lines: &status::StatusLines,
    last_dropped_count: &mut u32,
) {
    match item {
        transport::FrameEvent::Event {
            chip_mask,
            addr,
            value,
            delta,
        } => {
            engine.queue_event(chip_mask, addr, value, delta);
        }
        transport::FrameEvent::Command {
            opcode,
            param0,
            param1,
            param2,
        } => {
            engine.handle_command(opcode, param0, param1, param2);
        }
        transport::FrameEvent::FrameComplete {
            events,
            bytes,
            frame_index,
        } => {
            telemetry.record_frame(
                telemetry::FrameStats {
                    events,
                    bytes,
                    duration_us: 0,
                    frame_index,
                },
                Instant::now(),
            );
            telemetry.record_queue_depth(engine.get_queue_depth());

            let dropped_count = engine.get_dropped_event_count();
            if dropped_count != *last_dropped_count {
                telemetry.record_error(error::TelemetryError::QueueOverflow);
                *last_dropped_count = dropped_count;
            }
            telemetry.record_dropped_count(dropped_count);

            status_lines.publish(telemetry.status_line());
        }
    }
}
