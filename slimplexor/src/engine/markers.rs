//! Stream boundary markers
//!
//! Before the first audio period and after the last one, a full period of
//! marker-only frames is forced through the sink. Sample bytes are zero;
//! the control byte of every frame carries the marker.

use super::delivery::{Destination, HwPointer};
use crate::audio::StreamMarker;
use crate::error::Result;
use tracing::{debug, trace};

impl Destination {
    /// Flush until the buffer is empty
    ///
    /// Would-block and recovered attempts are retried until the sink takes
    /// data, yielding the thread in between. Only a write the sink cannot
    /// recover from ends the loop early.
    pub fn drain_pending(&mut self, pointer: &mut HwPointer) -> Result<()> {
        let mut idle_attempts = 0u64;

        while !self.buffer().is_empty() {
            if self.flush(pointer)?.made_progress() {
                if idle_attempts > 0 {
                    trace!(
                        "{}: sink accepted data after {} idle attempts",
                        self.device_id(),
                        idle_attempts
                    );
                }
                idle_attempts = 0;
                continue;
            }

            idle_attempts += 1;
            std::thread::yield_now();
        }

        Ok(())
    }

    /// Deliver pending frames, then one full period of `marker` frames
    ///
    /// Pending frames count against `pointer`; marker frames do not, since
    /// they never came from upstream. On error the pending frames are still
    /// buffered if the marker period was not reached.
    pub fn emit_boundary(&mut self, marker: impl Into<u8>, pointer: &mut HwPointer) -> Result<()> {
        let marker = marker.into();

        self.drain_pending(pointer)?;
        trace!("{}: pending frames delivered before marker {}", self.device_id(), marker);

        self.buffer_mut().fill_with_marker(marker);
        let mut marker_frames = HwPointer::default();
        self.drain_pending(&mut marker_frames)?;

        debug!(
            "{}: wrote {} frames of marker {}",
            self.device_id(),
            marker_frames.frames(),
            marker
        );
        Ok(())
    }

    pub fn emit_begin(&mut self, pointer: &mut HwPointer) -> Result<()> {
        self.emit_boundary(StreamMarker::Begin, pointer)
    }

    pub fn emit_end(&mut self, pointer: &mut HwPointer) -> Result<()> {
        self.emit_boundary(StreamMarker::End, pointer)
    }
}
