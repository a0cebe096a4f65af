//! Core audio data types
//!
//! Defines the sample formats, stream markers and frame geometry shared by
//! the codec, the transfer buffer and the session controller.
//!
//! **Target frame layout:**
//! - Every sample slot is 4 bytes, signed 32-bit little-endian
//! - Target channels = source channels + 1 (the control channel)
//! - The last byte of the control slot carries a [`StreamMarker`]

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Width in bytes of one target sample slot
pub const TARGET_SAMPLE_WIDTH: usize = 4;

/// Source sample formats accepted by the engine
///
/// Anything outside this table is rejected when the stream is negotiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum SampleFormat {
    /// Signed 8-bit
    S8,
    /// Signed 16-bit little-endian
    S16Le,
    /// Signed 24-bit little-endian in a 4-byte container (low 3 bytes significant)
    S24Le,
    /// Signed 32-bit little-endian
    S32Le,
}

impl SampleFormat {
    /// Every supported source format
    pub const ALL: [SampleFormat; 4] = [
        SampleFormat::S8,
        SampleFormat::S16Le,
        SampleFormat::S24Le,
        SampleFormat::S32Le,
    ];

    /// Format written to destination devices
    pub const TARGET: SampleFormat = SampleFormat::S32Le;

    /// Bytes one sample occupies in the source stream
    pub fn physical_width(&self) -> usize {
        match self {
            SampleFormat::S8 => 1,
            SampleFormat::S16Le => 2,
            SampleFormat::S24Le | SampleFormat::S32Le => 4,
        }
    }

    /// Bytes of a sample that carry audio
    pub fn significant_bytes(&self) -> usize {
        match self {
            SampleFormat::S8 => 1,
            SampleFormat::S16Le => 2,
            SampleFormat::S24Le => 3,
            SampleFormat::S32Le => 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SampleFormat::S8 => "S8",
            SampleFormat::S16Le => "S16_LE",
            SampleFormat::S24Le => "S24_LE",
            SampleFormat::S32Le => "S32_LE",
        }
    }
}

impl FromStr for SampleFormat {
    type Err = Error;

    /// Accepts the ALSA names (`S16_LE`) as well as `s16le` and `s16`
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_')
            .map(|c| c.to_ascii_uppercase())
            .collect();

        match normalized.as_str() {
            "S8" => Ok(SampleFormat::S8),
            "S16" | "S16LE" => Ok(SampleFormat::S16Le),
            "S24" | "S24LE" => Ok(SampleFormat::S24Le),
            "S32" | "S32LE" => Ok(SampleFormat::S32Le),
            _ => Err(Error::UnsupportedFormat(s.to_string())),
        }
    }
}

impl TryFrom<String> for SampleFormat {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value carried in the control byte of each target frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StreamMarker {
    /// First period of a stream
    Begin = 1,
    /// Last period of a stream
    End = 2,
    /// Ordinary audio frame
    Data = 3,
}

impl StreamMarker {
    pub fn value(self) -> u8 {
        self as u8
    }
}

impl From<StreamMarker> for u8 {
    fn from(marker: StreamMarker) -> u8 {
        marker.value()
    }
}

/// Source and target frame geometry for one negotiated stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub source_format: SampleFormat,
    pub source_channels: usize,
}

impl FrameLayout {
    pub fn new(source_format: SampleFormat, source_channels: usize) -> Self {
        Self {
            source_format,
            source_channels,
        }
    }

    /// Bytes per source frame
    pub fn source_frame_size(&self) -> usize {
        self.source_format.physical_width() * self.source_channels
    }

    /// Source channels plus the control channel
    pub fn target_channels(&self) -> usize {
        self.source_channels + 1
    }

    /// Bytes per target frame
    pub fn target_frame_size(&self) -> usize {
        self.target_channels() * TARGET_SAMPLE_WIDTH
    }

    /// Offset of the marker byte within a target frame
    pub fn control_byte_offset(&self) -> usize {
        self.target_frame_size() - 1
    }
}
