//! Delivery to the destination device
//!
//! A [`Destination`] owns the open sink and the transfer buffer feeding it.
//! [`Destination::flush`] makes one write attempt and classifies the result.
//!
//! **Outcomes:**
//! - Written: the accepted frames leave the buffer and advance the pointer
//! - Would-block: nothing changes, retry later with the same data
//! - Hard error: the sink is recovered and the buffer kept; if recovery
//!   fails too the error reaches the caller, still with the buffer kept
//!
//! Buffered frames only ever leave through a confirmed write.

use crate::audio::TransferBuffer;
use crate::error::{Error, Result};
use crate::sink::{PcmSink, SinkError, WriteOutcome};
use tracing::{debug, error, info, trace, warn};

/// Running count of frames taken from upstream
///
/// Monotonic. Exposed to the host modulo its ring size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HwPointer {
    frames: u64,
}

impl HwPointer {
    pub fn advance(&mut self, frames: usize) {
        self.frames += frames as u64;
    }

    pub fn reset(&mut self) {
        self.frames = 0;
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Position within a ring of `buffer_frames`; zero for an empty ring
    pub fn position(&self, buffer_frames: usize) -> usize {
        if buffer_frames == 0 {
            0
        } else {
            (self.frames % buffer_frames as u64) as usize
        }
    }
}

/// Result of one flush attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Buffer was empty, nothing attempted
    Idle,
    /// Frames accepted by the sink
    Written(usize),
    /// Sink could not take data right now
    WouldBlock,
    /// Write failed, sink recovered; data still buffered
    Recovered,
}

impl Delivery {
    pub fn frames(&self) -> usize {
        match self {
            Delivery::Written(n) => *n,
            _ => 0,
        }
    }

    pub fn made_progress(&self) -> bool {
        self.frames() > 0
    }
}

/// Open sink plus the buffer of frames waiting for it
pub struct Destination {
    device_id: String,
    sink: Box<dyn PcmSink>,
    buffer: TransferBuffer,
}

impl Destination {
    pub fn new(device_id: impl Into<String>, sink: Box<dyn PcmSink>, buffer: TransferBuffer) -> Self {
        Self {
            device_id: device_id.into(),
            sink,
            buffer,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn buffer(&self) -> &TransferBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut TransferBuffer {
        &mut self.buffer
    }

    pub fn sink(&self) -> &dyn PcmSink {
        self.sink.as_ref()
    }

    pub fn sink_mut(&mut self) -> &mut dyn PcmSink {
        self.sink.as_mut()
    }

    /// Try once to hand the buffered frames to the sink
    ///
    /// Confirmed frames are removed from the buffer and added to `pointer`.
    pub fn flush(&mut self, pointer: &mut HwPointer) -> Result<Delivery> {
        if self.buffer.is_empty() {
            return Ok(Delivery::Idle);
        }

        let pending = self.buffer.filled_frames();
        match self.sink.write(self.buffer.filled_bytes(), pending) {
            Ok(WriteOutcome::Written(0)) | Ok(WriteOutcome::WouldBlock) => {
                trace!("{} would block with {} frames pending", self.device_id, pending);
                Ok(Delivery::WouldBlock)
            }
            Ok(WriteOutcome::Written(written)) => {
                let written = if written > pending {
                    warn!(
                        "{} reported {} frames written, only {} offered",
                        self.device_id, written, pending
                    );
                    pending
                } else {
                    written
                };

                if written < pending {
                    debug!(
                        "Partial write to {}: {} of {} frames",
                        self.device_id, written, pending
                    );
                }

                self.buffer.consume(written);
                pointer.advance(written);
                Ok(Delivery::Written(written))
            }
            Err(write_error) => self.recover_after(write_error),
        }
    }

    fn recover_after(&mut self, write_error: SinkError) -> Result<Delivery> {
        warn!(
            "Error while writing to {}: {} - attempting recovery",
            self.device_id, write_error
        );

        match self.sink.recover() {
            Ok(()) => {
                info!("Destination device {} recovered", self.device_id);
                Ok(Delivery::Recovered)
            }
            Err(recover_error) => {
                error!(
                    "Could not recover destination device {}: {}",
                    self.device_id, recover_error
                );
                Err(Error::SinkWriteFailure {
                    device: self.device_id.clone(),
                    source: recover_error,
                })
            }
        }
    }

    /// Close the sink, dropping any frames still buffered
    pub fn release(self) -> std::result::Result<(), SinkError> {
        if !self.buffer.is_empty() {
            debug!(
                "Releasing {} with {} frames undelivered",
                self.device_id,
                self.buffer.filled_frames()
            );
        }
        self.sink.close()
    }
}
