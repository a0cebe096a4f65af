//! Session controller
//!
//! One [`StreamSession`] per opened stream. It owns the negotiated format,
//! the open destination and its transfer buffer, and the hardware pointer.
//!
//! **States:** `Closed → HwConfigured → Prepared → Streaming → Closed`
//!
//! - Hardware negotiation resolves the device, allocates the buffer and
//!   opens the sink. Negotiating again tears the current sink down first.
//! - The first transfer after prepare that carries audio writes the
//!   begin-marker period. It is attempted once; on failure the stream still
//!   counts as started.
//! - Close writes the end-marker period and drains, but only if streaming
//!   started. Resources are released whatever happens on the way.

use super::delivery::{Destination, HwPointer};
use super::dump::PcmDump;
use super::EngineConfig;
use crate::audio::{FrameRepacker, SampleFormat, TransferBuffer};
use crate::directory::RateDeviceDirectory;
use crate::error::{Error, Result};
use crate::host::{HwParams, PcmPlugin};
use crate::sink::{SinkError, SinkParams, SinkProvider, SwParams};
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    HwConfigured,
    Prepared,
    Streaming,
}

/// Everything bound by one hardware negotiation
struct Binding {
    params: HwParams,
    repacker: FrameRepacker,
    destination: Destination,
    dump: Option<PcmDump>,
}

pub struct StreamSession {
    directory: Arc<RateDeviceDirectory>,
    provider: Box<dyn SinkProvider>,
    config: EngineConfig,
    state: SessionState,
    binding: Option<Binding>,
    pointer: HwPointer,
    /// Delivery failure that happened after frames were already consumed
    deferred_error: Option<Error>,
}

impl StreamSession {
    pub fn new(
        directory: Arc<RateDeviceDirectory>,
        provider: Box<dyn SinkProvider>,
        config: EngineConfig,
    ) -> Self {
        Self {
            directory,
            provider,
            config,
            state: SessionState::Closed,
            binding: None,
            pointer: HwPointer::default(),
            deferred_error: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn params(&self) -> Option<&HwParams> {
        self.binding.as_ref().map(|b| &b.params)
    }

    pub fn device_id(&self) -> Option<&str> {
        self.binding.as_ref().map(|b| b.destination.device_id())
    }

    pub fn destination(&self) -> Option<&Destination> {
        self.binding.as_ref().map(|b| &b.destination)
    }

    /// Frames waiting in the transfer buffer
    pub fn fill_cursor(&self) -> usize {
        self.binding
            .as_ref()
            .map_or(0, |b| b.destination.buffer().filled_frames())
    }

    /// Frames delivered since the last prepare
    pub fn frames_delivered(&self) -> u64 {
        self.pointer.frames()
    }

    fn bind(&self, params: &HwParams) -> Result<Binding> {
        if params.period_frames == 0 || params.periods == 0 {
            return Err(Error::InvalidParameters(format!(
                "{} frames per period, {} periods",
                params.period_frames, params.periods
            )));
        }

        let device_id = self.directory.resolve(params.rate)?.to_string();
        let layout = params.layout();
        let buffer = TransferBuffer::allocate(params.period_frames, layout.target_frame_size())?;

        let sink_params = SinkParams {
            format: SampleFormat::TARGET,
            channels: layout.target_channels(),
            rate: params.rate,
            period_frames: params.period_frames,
            periods: params.periods,
        };

        let sink = self
            .provider
            .open(&device_id, &sink_params)
            .map_err(|source| match source {
                SinkError::Config(_) => Error::SinkConfigFailure {
                    device: device_id.clone(),
                    source,
                },
                source => Error::SinkOpenFailure {
                    device: device_id.clone(),
                    source,
                },
            })?;

        let dump = self
            .config
            .dump_file
            .as_deref()
            .and_then(|path| match PcmDump::open(path) {
                Ok(dump) => Some(dump),
                Err(e) => {
                    warn!("Could not open PCM dump {}: {}", path.display(), e);
                    None
                }
            });

        Ok(Binding {
            params: *params,
            repacker: FrameRepacker::new(layout),
            destination: Destination::new(device_id, sink, buffer),
            dump,
        })
    }

    /// Release the current destination, bracketing the stream if it started
    fn teardown(&mut self) {
        let streaming = self.state == SessionState::Streaming;
        self.state = SessionState::Closed;
        self.deferred_error = None;

        let Some(mut binding) = self.binding.take() else {
            return;
        };
        let device = binding.destination.device_id().to_string();

        if streaming {
            if let Err(e) = binding.destination.emit_end(&mut self.pointer) {
                warn!("Could not write end-of-stream marker to {}: {}", device, e);
            }
            if let Err(e) = binding.destination.sink_mut().drain() {
                warn!("Error while draining destination device {}: {}", device, e);
            }
        }

        if let Some(mut dump) = binding.dump.take() {
            dump.finish();
        }

        match binding.destination.release() {
            Ok(()) => info!("Destination device {} was closed", device),
            Err(e) => warn!("Error while closing destination device {}: {}", device, e),
        }
    }
}

fn bound<'a>(
    binding: &'a mut Option<Binding>,
    state: SessionState,
    operation: &str,
) -> Result<&'a mut Binding> {
    binding.as_mut().ok_or_else(|| {
        Error::InvalidState(format!(
            "{} requires hardware parameters (session is {:?})",
            operation, state
        ))
    })
}

impl PcmPlugin for StreamSession {
    fn configure_hardware(&mut self, params: &HwParams) -> Result<()> {
        if self.binding.is_some() {
            info!("Hardware parameters renegotiated, closing current destination device");
            self.teardown();
        }

        debug!(
            "Negotiated {} x{} @ {} Hz, {} frames x {} periods",
            params.format, params.channels, params.rate, params.period_frames, params.periods
        );

        let binding = self.bind(params).map_err(|e| {
            error!("Hardware configuration failed: {}", e);
            e
        })?;

        info!(
            "Destination device {} opened for {} Hz ({} channels of {})",
            binding.destination.device_id(),
            params.rate,
            params.channels + 1,
            SampleFormat::TARGET
        );

        self.binding = Some(binding);
        self.state = SessionState::HwConfigured;
        self.pointer.reset();
        Ok(())
    }

    fn configure_software(&mut self, params: &SwParams) -> Result<()> {
        let binding = bound(&mut self.binding, self.state, "software configuration")?;
        let destination = &mut binding.destination;

        debug!(
            "{}: start_threshold={} avail_min={}",
            destination.device_id(),
            params.start_threshold,
            params.avail_min
        );

        destination
            .sink_mut()
            .set_sw_params(params)
            .map_err(|source| Error::SinkConfigFailure {
                device: destination.device_id().to_string(),
                source,
            })
    }

    fn prepare(&mut self) -> Result<()> {
        let binding = bound(&mut self.binding, self.state, "prepare")?;
        let destination = &mut binding.destination;

        if destination.sink().state().is_prepared() {
            debug!("{} is already prepared", destination.device_id());
        } else {
            destination
                .sink_mut()
                .prepare()
                .map_err(|source| Error::SinkPrepareFailure {
                    device: destination.device_id().to_string(),
                    source,
                })?;
            debug!("{} prepared", destination.device_id());
        }

        self.pointer.reset();
        self.deferred_error = None;
        if self.state == SessionState::HwConfigured {
            self.state = SessionState::Prepared;
        }
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        debug!("Start requested ({:?})", self.state);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        debug!("Stop requested ({:?})", self.state);
        Ok(())
    }

    fn transfer(&mut self, source: &[u8], frames: usize) -> Result<usize> {
        if let Some(e) = self.deferred_error.take() {
            return Err(e);
        }

        if !matches!(self.state, SessionState::Prepared | SessionState::Streaming) {
            return Err(Error::InvalidState(format!(
                "transfer requires a prepared session (session is {:?})",
                self.state
            )));
        }

        let binding = bound(&mut self.binding, self.state, "transfer")?;

        let src_frame_size = binding.repacker.layout().source_frame_size();
        let available = match src_frame_size {
            0 => frames,
            size => frames.min(source.len() / size),
        };
        if available < frames {
            warn!(
                "Transfer announced {} frames but source holds {}",
                frames, available
            );
        }

        if self.state == SessionState::Prepared {
            if available == 0 {
                trace!("Empty transfer before stream start");
                return Ok(0);
            }

            // The begin marker is attempted once per stream
            self.state = SessionState::Streaming;
            let device = binding.destination.device_id().to_string();
            if let Err(e) = binding.destination.emit_begin(&mut self.pointer) {
                // Leftover marker frames must not reach the sink as audio
                binding.destination.buffer_mut().clear();
                error!("Could not write beginning-of-stream marker to {}: {}", device, e);
                return Err(e);
            }
            info!("Stream started on {}", device);
        }

        let count = available.min(binding.destination.buffer().free_frames());
        if count > 0 {
            let bytes = &source[..count * src_frame_size];
            if let Some(dump) = binding.dump.as_mut() {
                dump.write(bytes);
            }
            binding
                .repacker
                .repack(binding.destination.buffer_mut(), bytes, count);
        }

        match binding.destination.flush(&mut self.pointer) {
            Ok(delivery) => {
                trace!("Consumed {} of {} frames, delivery {:?}", count, frames, delivery);
                Ok(count)
            }
            Err(e) if count > 0 => {
                // The frames are buffered; report the failure on the next call
                self.deferred_error = Some(e);
                Ok(count)
            }
            Err(e) => Err(e),
        }
    }

    fn pointer(&self) -> usize {
        self.binding
            .as_ref()
            .map_or(0, |b| self.pointer.position(b.params.buffer_frames()))
    }

    fn close(&mut self) {
        if self.binding.is_none() {
            debug!("Close on a session without destination");
            self.state = SessionState::Closed;
            return;
        }
        self.teardown();
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        if self.binding.is_some() {
            self.teardown();
        }
    }
}
