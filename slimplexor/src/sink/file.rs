//! File-backed sink
//!
//! Writes the target stream of each device to `<output_dir>/<device>.raw`.
//! Useful for capturing what a device would have received, and as the
//! default sink of the command-line driver.

use super::{PcmSink, SinkError, SinkParams, SinkProvider, SinkState, SwParams, WriteOutcome};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Opens one [`FileSink`] per device identifier
#[derive(Debug, Clone)]
pub struct FileSinkProvider {
    output_dir: PathBuf,
    max_frames_per_write: Option<usize>,
}

impl FileSinkProvider {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            max_frames_per_write: None,
        }
    }

    /// Accept at most `frames` frames per write, producing partial writes
    ///
    /// Zero means unlimited.
    pub fn with_max_frames_per_write(mut self, frames: usize) -> Self {
        self.max_frames_per_write = (frames > 0).then_some(frames);
        self
    }

    /// Output path for a device identifier
    ///
    /// Characters other than ASCII alphanumerics, `-`, `_` and `.` become `_`.
    pub fn path_for(&self, device_id: &str) -> PathBuf {
        let name: String = device_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.output_dir.join(format!("{}.raw", name))
    }
}

impl SinkProvider for FileSinkProvider {
    fn open(&self, device_id: &str, params: &SinkParams) -> Result<Box<dyn PcmSink>, SinkError> {
        if params.channels == 0 || params.period_frames == 0 {
            return Err(SinkError::Config(format!(
                "{} channels, {} frames per period",
                params.channels, params.period_frames
            )));
        }

        fs::create_dir_all(&self.output_dir)?;
        let path = self.path_for(device_id);
        let file = File::create(&path)?;
        info!("Opened file sink {} for device {}", path.display(), device_id);

        Ok(Box::new(FileSink {
            path,
            params: *params,
            writer: BufWriter::new(file),
            state: SinkState::Setup,
            sw_params: None,
            max_frames_per_write: self.max_frames_per_write,
            frames_written: 0,
        }))
    }
}

/// Sink appending frames to a file
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    params: SinkParams,
    writer: BufWriter<File>,
    state: SinkState,
    sw_params: Option<SwParams>,
    max_frames_per_write: Option<usize>,
    frames_written: u64,
}

impl FileSink {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn sw_params(&self) -> Option<&SwParams> {
        self.sw_params.as_ref()
    }
}

impl PcmSink for FileSink {
    fn params(&self) -> &SinkParams {
        &self.params
    }

    fn state(&self) -> SinkState {
        self.state
    }

    fn set_sw_params(&mut self, params: &SwParams) -> Result<(), SinkError> {
        if params.avail_min == 0 {
            return Err(SinkError::Config("avail_min must be at least one frame".to_string()));
        }
        self.sw_params = Some(*params);
        Ok(())
    }

    fn prepare(&mut self) -> Result<(), SinkError> {
        self.state = SinkState::Prepared;
        Ok(())
    }

    fn write(&mut self, bytes: &[u8], frames: usize) -> Result<WriteOutcome, SinkError> {
        if !self.state.is_prepared() {
            return Err(SinkError::BadState(self.state));
        }

        let frames = match self.max_frames_per_write {
            Some(limit) => frames.min(limit),
            None => frames,
        };
        let len = frames * self.params.frame_size();

        if let Err(e) = self.writer.write_all(&bytes[..len]) {
            self.state = SinkState::Failed;
            return Err(e.into());
        }

        self.state = SinkState::Running;
        self.frames_written += frames as u64;
        Ok(WriteOutcome::Written(frames))
    }

    fn drain(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        self.state = SinkState::Setup;
        debug!("Drained {} ({} frames total)", self.path.display(), self.frames_written);
        Ok(())
    }

    fn close(mut self: Box<Self>) -> Result<(), SinkError> {
        self.writer.flush()?;
        debug!("Closed file sink {}", self.path.display());
        Ok(())
    }
}
