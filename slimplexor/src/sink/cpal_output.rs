//! Audio device sink using cpal
//!
//! Frames written by the engine are pushed into a lock-free ring buffer
//! that the cpal output callback drains on the audio thread. A full ring
//! is reported as would-block; an error raised by the audio thread makes
//! the next write fail so the engine runs recovery, which rebuilds the
//! stream.
//!
//! Only devices offering signed 32-bit samples at the requested rate and
//! channel count are accepted.

use super::{PcmSink, SinkError, SinkParams, SinkProvider, SinkState, SwParams, WriteOutcome};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat as CpalFormat, Stream, StreamConfig};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapProd, HeapRb};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Opens cpal output devices by name
#[derive(Debug, Clone, Default)]
pub struct CpalSinkProvider;

impl CpalSinkProvider {
    pub fn new() -> Self {
        Self
    }

    /// Names of the available output devices
    pub fn list_devices() -> Result<Vec<String>, SinkError> {
        let host = cpal::default_host();
        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| SinkError::Device(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();

        debug!("Found {} output devices", devices.len());
        Ok(devices)
    }

    fn find_device(device_id: &str) -> Result<Device, SinkError> {
        let host = cpal::default_host();

        if device_id == "default" {
            return host
                .default_output_device()
                .ok_or_else(|| SinkError::Device("No default output device found".to_string()));
        }

        let mut devices = host
            .output_devices()
            .map_err(|e| SinkError::Device(format!("Failed to enumerate devices: {}", e)))?;

        devices
            .find(|d| d.name().ok().as_deref() == Some(device_id))
            .ok_or_else(|| SinkError::Device(format!("Output device '{}' not found", device_id)))
    }

    fn stream_config(device: &Device, params: &SinkParams) -> Result<StreamConfig, SinkError> {
        let supported = device
            .supported_output_configs()
            .map_err(|e| SinkError::Device(format!("Failed to get device configs: {}", e)))?
            .find(|config| {
                config.channels() as usize == params.channels
                    && config.sample_format() == CpalFormat::I32
                    && config.min_sample_rate().0 <= params.rate
                    && config.max_sample_rate().0 >= params.rate
            })
            .ok_or_else(|| {
                SinkError::Config(format!(
                    "device has no I32 output with {} channels at {} Hz",
                    params.channels, params.rate
                ))
            })?;

        let mut config = supported
            .with_sample_rate(cpal::SampleRate(params.rate))
            .config();
        config.buffer_size = cpal::BufferSize::Fixed(params.period_frames as u32);
        Ok(config)
    }
}

impl SinkProvider for CpalSinkProvider {
    fn open(&self, device_id: &str, params: &SinkParams) -> Result<Box<dyn PcmSink>, SinkError> {
        let device = Self::find_device(device_id)?;
        let config = Self::stream_config(&device, params)?;

        debug!(
            "Audio config: sample_rate={}, channels={}, buffer_size={:?}",
            config.sample_rate.0, config.channels, config.buffer_size
        );
        info!("Opened audio device {}", device_id);

        Ok(Box::new(CpalSink {
            device_id: device_id.to_string(),
            device,
            config,
            params: *params,
            stream: None,
            producer: None,
            scratch: Vec::new(),
            state: SinkState::Setup,
            error_flag: Arc::new(AtomicBool::new(false)),
            underruns: Arc::new(AtomicU64::new(0)),
        }))
    }
}

/// Output stream of one cpal device
pub struct CpalSink {
    device_id: String,
    device: Device,
    config: StreamConfig,
    params: SinkParams,
    stream: Option<Stream>,
    producer: Option<HeapProd<i32>>,
    scratch: Vec<i32>,
    state: SinkState,
    /// Set by the audio thread on stream error
    error_flag: Arc<AtomicBool>,
    /// Callbacks that found the ring short of samples
    underruns: Arc<AtomicU64>,
}

impl CpalSink {
    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }

    /// Build a fresh ring and output stream, replacing any previous one
    fn build_stream(&mut self) -> Result<(), SinkError> {
        self.stream = None;
        self.producer = None;

        let capacity = self.params.buffer_frames() * self.params.channels;
        let (producer, mut consumer) = HeapRb::<i32>::new(capacity.max(1)).split();

        let error_flag = Arc::clone(&self.error_flag);
        let underruns = Arc::clone(&self.underruns);

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [i32], _: &cpal::OutputCallbackInfo| {
                    let filled = consumer.pop_slice(data);
                    if filled < data.len() {
                        data[filled..].fill(0);
                        underruns.fetch_add(1, Ordering::Relaxed);
                    }
                },
                move |err| {
                    error!("Audio stream error: {} - marking for recovery", err);
                    error_flag.store(true, Ordering::SeqCst);
                },
                None,
            )
            .map_err(|e| SinkError::Device(format!("Failed to build stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| SinkError::Device(format!("Failed to start stream: {}", e)))?;

        self.stream = Some(stream);
        self.producer = Some(producer);
        Ok(())
    }

    fn period_duration(&self) -> Duration {
        Duration::from_secs_f64(self.params.period_frames as f64 / self.params.rate.max(1) as f64)
    }
}

impl PcmSink for CpalSink {
    fn params(&self) -> &SinkParams {
        &self.params
    }

    fn state(&self) -> SinkState {
        self.state
    }

    fn set_sw_params(&mut self, params: &SwParams) -> Result<(), SinkError> {
        // cpal starts the stream itself; thresholds are only recorded
        debug!(
            "{}: start_threshold={} avail_min={}",
            self.device_id, params.start_threshold, params.avail_min
        );
        Ok(())
    }

    fn prepare(&mut self) -> Result<(), SinkError> {
        self.error_flag.store(false, Ordering::SeqCst);
        self.build_stream()?;
        self.state = SinkState::Prepared;
        Ok(())
    }

    fn write(&mut self, bytes: &[u8], frames: usize) -> Result<WriteOutcome, SinkError> {
        if self.error_flag.load(Ordering::SeqCst) {
            self.state = SinkState::Failed;
            return Err(SinkError::Device(format!("{}: stream error", self.device_id)));
        }

        let channels = self.params.channels;
        let producer = self
            .producer
            .as_mut()
            .ok_or(SinkError::BadState(self.state))?;

        let frames = frames.min(producer.vacant_len() / channels);
        if frames == 0 {
            return Ok(WriteOutcome::WouldBlock);
        }

        self.scratch.clear();
        self.scratch.extend(
            bytes[..frames * channels * 4]
                .chunks_exact(4)
                .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]])),
        );
        let pushed = producer.push_slice(&self.scratch);
        debug_assert_eq!(pushed, self.scratch.len());

        self.state = SinkState::Running;
        Ok(WriteOutcome::Written(frames))
    }

    fn recover(&mut self) -> Result<(), SinkError> {
        warn!("Rebuilding output stream for {}", self.device_id);
        self.prepare()
    }

    fn drain(&mut self) -> Result<(), SinkError> {
        let Some(producer) = self.producer.as_ref() else {
            return Ok(());
        };

        let deadline = Instant::now() + self.period_duration() * (self.params.periods as u32 + 2);

        while !producer.is_empty() {
            if self.error_flag.load(Ordering::SeqCst) {
                return Err(SinkError::Device(format!("{}: stream error while draining", self.device_id)));
            }
            if Instant::now() > deadline {
                return Err(SinkError::Device(format!(
                    "{}: {} samples still queued after drain timeout",
                    self.device_id,
                    producer.occupied_len()
                )));
            }
            std::thread::sleep(self.period_duration() / 4);
        }

        self.state = SinkState::Setup;
        Ok(())
    }

    fn close(mut self: Box<Self>) -> Result<(), SinkError> {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                warn!("Failed to pause stream for {}: {}", self.device_id, e);
            }
        }
        info!("Closed audio device {}", self.device_id);
        Ok(())
    }
}
