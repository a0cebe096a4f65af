//! PCM and parameter builders

use slimplexor::audio::SampleFormat;
use slimplexor::HwParams;

/// `count` source frames where every byte encodes its frame and position
///
/// Byte `b` of frame `f` is `(f * 16 + b + 1) as u8`, so no frame is all
/// zeros and frames are easy to tell apart.
pub fn patterned_frames(format: SampleFormat, channels: usize, count: usize) -> Vec<u8> {
    let frame_size = format.physical_width() * channels;
    (0..count)
        .flat_map(|f| (0..frame_size).map(move |b| (f * 16 + b + 1) as u8))
        .collect()
}

/// Interleaved S16_LE frames from sample values
pub fn s16_frames(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

pub fn hw_params(format: SampleFormat, channels: usize, rate: u32, period_frames: usize) -> HwParams {
    HwParams {
        format,
        channels,
        rate,
        period_frames,
        periods: 2,
    }
}

/// Control byte of each target frame in `bytes`
pub fn control_bytes(bytes: &[u8], frame_size: usize) -> Vec<u8> {
    bytes
        .chunks_exact(frame_size)
        .map(|frame| frame[frame_size - 1])
        .collect()
}
