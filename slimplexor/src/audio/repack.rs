//! Frame repacker
//!
//! Re-encodes source frames into the transfer buffer: every channel goes
//! through the sample codec and a control slot carrying the data marker
//! is appended to each frame.

use super::buffer::TransferBuffer;
use super::codec::encode_into;
use super::types::{FrameLayout, StreamMarker, TARGET_SAMPLE_WIDTH};

/// Repacks source frames for one negotiated layout
#[derive(Debug, Clone, Copy)]
pub struct FrameRepacker {
    layout: FrameLayout,
}

impl FrameRepacker {
    pub fn new(layout: FrameLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    /// Append `count` frames from `source` to `buffer`
    ///
    /// The caller clamps `count` to the buffer's free space and to the
    /// frames present in `source`.
    ///
    /// # Panics
    /// Panics if `count` exceeds the free frames, if `source` is shorter
    /// than `count` frames, or if `buffer` was sized for another layout.
    pub fn repack(&self, buffer: &mut TransferBuffer, source: &[u8], count: usize) {
        let src_frame_size = self.layout.source_frame_size();
        let dst_frame_size = self.layout.target_frame_size();
        let width = self.layout.source_format.physical_width();

        assert_eq!(
            buffer.frame_size(),
            dst_frame_size,
            "transfer buffer frame size does not match layout"
        );
        assert!(
            source.len() >= count * src_frame_size,
            "source holds {} bytes, {} frames need {}",
            source.len(),
            count,
            count * src_frame_size
        );

        let region = buffer.spare_mut(count);
        region.fill(0);

        for frame in 0..count {
            let src = &source[frame * src_frame_size..(frame + 1) * src_frame_size];
            let dst = &mut region[frame * dst_frame_size..(frame + 1) * dst_frame_size];

            for channel in 0..self.layout.source_channels {
                let slot = channel * TARGET_SAMPLE_WIDTH;
                encode_into(
                    &src[channel * width..(channel + 1) * width],
                    self.layout.source_format,
                    &mut dst[slot..slot + TARGET_SAMPLE_WIDTH],
                );
            }
            dst[dst_frame_size - 1] = StreamMarker::Data.value();
        }

        buffer.commit(count);
    }
}
