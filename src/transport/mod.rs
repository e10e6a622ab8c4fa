//! C5 — the framed transport: magic-synchronized parsing of the host-to-
//! device byte stream, and (§9b) the concrete byte sources the reference
//! binary reads it from.

pub mod frame;
pub mod source;

pub use frame::{FrameEvent, FrameParser, ParseOutcome};
pub use source::open_source;
