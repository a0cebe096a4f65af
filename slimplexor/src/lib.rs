//! # SlimPlexor
//!
//! Stream repacking and multiplexed-output engine.
//!
//! **Purpose:** Accept PCM frames from an upstream producer, re-encode every
//! frame as signed 32-bit little-endian with one extra control channel,
//! buffer one period of re-encoded frames and deliver it to the output
//! device mapped to the stream's sample rate. Each stream is bracketed by
//! a period of begin and end marker frames so a downstream consumer can
//! find stream boundaries.
//!
//! **Architecture:**
//!
//! ```text
//! host ──► PcmPlugin (StreamSession)
//!             │  resolve rate ──► RateDeviceDirectory
//!             │  repack frames ─► FrameRepacker ─► TransferBuffer
//!             ▼
//!          Destination ── flush / markers ──► PcmSink
//! ```

pub mod audio;
pub mod directory;
pub mod engine;
pub mod error;
pub mod host;
pub mod sink;

pub use audio::{SampleFormat, StreamMarker};
pub use directory::RateDeviceDirectory;
pub use engine::{EngineConfig, SessionState, StreamSession};
pub use error::{Error, Result};
pub use host::{HostConstraints, HwParams, PcmPlugin};
pub use sink::{PcmSink, SinkProvider, SwParams, WriteOutcome};
