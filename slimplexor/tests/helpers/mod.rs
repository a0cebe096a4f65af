//! Test helper modules for SlimPlexor integration tests
//!
//! - MockDevice / MockProvider: scripted sink recording every call
//! - PCM builders for source frames and stream parameters
//! - LogCapture: assert on emitted tracing events

#![allow(dead_code)]

pub mod log_capture;
pub mod mock_sink;
pub mod pcm;

pub use log_capture::LogCapture;
pub use mock_sink::{MockDevice, MockProvider, SinkCall, Step};
pub use pcm::{control_bytes, hw_params, patterned_frames, s16_frames};

use slimplexor::{EngineConfig, RateDeviceDirectory, StreamSession};
use slimplexor_common::RateDeviceEntry;
use std::sync::Arc;

/// Directory with 44100 → devA and 48000 → devB
pub fn two_device_directory() -> Arc<RateDeviceDirectory> {
    Arc::new(RateDeviceDirectory::new(vec![
        RateDeviceEntry::new(44100, "devA"),
        RateDeviceEntry::new(48000, "devB"),
    ]))
}

/// Session over a mock device with default settings
pub fn mock_session(device: &MockDevice) -> StreamSession {
    mock_session_with(device, EngineConfig::default())
}

pub fn mock_session_with(device: &MockDevice, config: EngineConfig) -> StreamSession {
    StreamSession::new(
        two_device_directory(),
        Box::new(MockProvider::new(device)),
        config,
    )
}
