//! Host callback interface
//!
//! The host framework drives a stream through the [`PcmPlugin`] methods,
//! one call at a time. [`HostConstraints`] describes what the host is
//! allowed to negotiate.
//!
//! Hosts built on ALSA must disable their own thread-safety wrapper for
//! the process (`LIBASOUND_THREAD_SAFE=0`): destination devices are opened
//! from inside a host callback, and the host's dispatch lock would
//! otherwise deadlock against it.

use crate::audio::{FrameLayout, SampleFormat};
use crate::error::Result;
use crate::sink::SwParams;

/// Hardware parameters negotiated with the upstream producer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HwParams {
    pub format: SampleFormat,
    pub channels: usize,
    pub rate: u32,
    pub period_frames: usize,
    pub periods: usize,
}

impl HwParams {
    pub fn layout(&self) -> FrameLayout {
        FrameLayout::new(self.format, self.channels)
    }

    /// Frames in the upstream-visible ring buffer
    pub fn buffer_frames(&self) -> usize {
        self.period_frames * self.periods
    }
}

/// Callback surface the host invokes
///
/// Calls are serialised by the host; implementations need no locking.
pub trait PcmPlugin {
    /// Bind the stream format, resolve its device and open the sink
    fn configure_hardware(&mut self, params: &HwParams) -> Result<()>;

    /// Forward scheduling thresholds to the sink
    fn configure_software(&mut self, params: &SwParams) -> Result<()>;

    fn prepare(&mut self) -> Result<()>;

    fn start(&mut self) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    /// Consume up to `frames` frames from `source`
    ///
    /// Returns the number of frames consumed, which may be less than
    /// offered (including zero) when the transfer buffer is full.
    fn transfer(&mut self, source: &[u8], frames: usize) -> Result<usize>;

    /// Frames consumed so far, modulo the upstream buffer size
    fn pointer(&self) -> usize;

    /// Tear the stream down; never fails
    fn close(&mut self);
}

/// Parameter space offered to the host during negotiation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConstraints {
    pub formats: Vec<SampleFormat>,
    pub channels: Vec<usize>,
    pub rates: Vec<u32>,
    /// Bytes per period on the upstream side
    pub period_bytes: usize,
    pub periods: usize,
}

impl Default for HostConstraints {
    fn default() -> Self {
        Self {
            formats: SampleFormat::ALL.to_vec(),
            channels: vec![2],
            rates: vec![
                8000, 11025, 12000, 16000, 22500, 24000, 32000, 44100, 48000, 88200, 96000,
                176400, 192000,
            ],
            period_bytes: 16384,
            periods: 8,
        }
    }
}

impl HostConstraints {
    /// Frames per period for a given source format and channel count
    pub fn period_frames(&self, format: SampleFormat, channels: usize) -> usize {
        let frame_size = (format.physical_width() * channels).max(1);
        (self.period_bytes / frame_size).max(1)
    }

    /// Default hardware parameters for a stream
    pub fn hw_params(&self, format: SampleFormat, channels: usize, rate: u32) -> HwParams {
        HwParams {
            format,
            channels,
            rate,
            period_frames: self.period_frames(format, channels),
            periods: self.periods,
        }
    }

    /// Describe every way `params` falls outside the constraints
    pub fn check(&self, params: &HwParams) -> Vec<String> {
        let mut violations = Vec::new();

        if !self.formats.contains(&params.format) {
            violations.push(format!("format {} is not offered", params.format));
        }
        if !self.channels.contains(&params.channels) {
            violations.push(format!(
                "{} channels requested, offered {:?}",
                params.channels, self.channels
            ));
        }
        if !self.rates.contains(&params.rate) {
            violations.push(format!("rate {} Hz is not offered", params.rate));
        }
        if params.period_frames == 0 || params.periods == 0 {
            violations.push("period size and period count must be non-zero".to_string());
        }

        violations
    }
}
