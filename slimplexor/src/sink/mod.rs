//! Destination device abstraction
//!
//! A [`SinkProvider`] opens a [`PcmSink`] for a device identifier. The
//! engine only ever talks to these traits, so real devices, files and
//! test doubles are interchangeable.
//!
//! **Write contract:**
//! - `Ok(WriteOutcome::Written(n))`: the first `n` frames were accepted
//! - `Ok(WriteOutcome::WouldBlock)`: nothing was accepted, retry with the same data
//! - `Err(_)`: hard failure, the engine calls [`PcmSink::recover`]

pub mod file;

#[cfg(feature = "cpal")]
pub mod cpal_output;

pub use file::{FileSink, FileSinkProvider};

#[cfg(feature = "cpal")]
pub use cpal_output::{CpalSink, CpalSinkProvider};

use crate::audio::SampleFormat;
use thiserror::Error;

/// Errors reported by a sink
#[derive(Error, Debug)]
pub enum SinkError {
    /// Device-level failure
    #[error("Device error: {0}")]
    Device(String),

    /// Parameters rejected by the device
    #[error("Unsupported configuration: {0}")]
    Config(String),

    /// Operation called in the wrong sink state
    #[error("Sink is {0:?}")]
    BadState(SinkState),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of a single write attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Frames accepted by the device, from the start of the offered data
    Written(usize),
    /// Device cannot take data right now
    WouldBlock,
}

/// Lifecycle state of a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    /// Opened with hardware parameters, not yet prepared
    Setup,
    Prepared,
    Running,
    /// A write failed; needs recovery
    Failed,
}

impl SinkState {
    /// Prepared or already running
    pub fn is_prepared(&self) -> bool {
        matches!(self, SinkState::Prepared | SinkState::Running)
    }
}

/// Hardware parameters a sink is opened with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkParams {
    pub format: SampleFormat,
    pub channels: usize,
    pub rate: u32,
    pub period_frames: usize,
    pub periods: usize,
}

impl SinkParams {
    /// Bytes per frame (formats are stored at their physical width)
    pub fn frame_size(&self) -> usize {
        self.format.physical_width() * self.channels
    }

    /// Frames in the device ring
    pub fn buffer_frames(&self) -> usize {
        self.period_frames * self.periods
    }
}

/// Software (scheduling) parameters forwarded from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwParams {
    /// Frames that must be queued before playback starts
    pub start_threshold: usize,
    /// Minimum free frames before the device reports itself writable
    pub avail_min: usize,
}

/// An open destination device
pub trait PcmSink {
    fn params(&self) -> &SinkParams;

    fn state(&self) -> SinkState;

    /// Apply scheduling thresholds
    fn set_sw_params(&mut self, params: &SwParams) -> Result<(), SinkError>;

    /// Make the device ready to accept writes
    fn prepare(&mut self) -> Result<(), SinkError>;

    /// Offer `frames` frames held in `bytes`
    ///
    /// `bytes` holds at least `frames * params().frame_size()` bytes.
    fn write(&mut self, bytes: &[u8], frames: usize) -> Result<WriteOutcome, SinkError>;

    /// Bring the device back after a failed write
    fn recover(&mut self) -> Result<(), SinkError> {
        self.prepare()
    }

    /// Block until queued frames have been played
    fn drain(&mut self) -> Result<(), SinkError>;

    /// Release the device
    fn close(self: Box<Self>) -> Result<(), SinkError>;
}

/// Opens sinks by device identifier
pub trait SinkProvider {
    fn open(&self, device_id: &str, params: &SinkParams) -> Result<Box<dyn PcmSink>, SinkError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepared_states() {
        assert!(!SinkState::Setup.is_prepared());
        assert!(SinkState::Prepared.is_prepared());
        assert!(SinkState::Running.is_prepared());
        assert!(!SinkState::Failed.is_prepared());
    }

    #[test]
    fn test_params_geometry() {
        let params = SinkParams {
            format: SampleFormat::S32Le,
            channels: 3,
            rate: 44100,
            period_frames: 1024,
            periods: 8,
        };
        assert_eq!(params.frame_size(), 12);
        assert_eq!(params.buffer_frames(), 8192);
    }
}
