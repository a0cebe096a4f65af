//! Raw source PCM dump
//!
//! Debug aid: every source byte the engine consumes is appended to a file
//! before repacking. A failing dump never affects the stream; the first
//! write error is logged and the dump switches itself off.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub struct PcmDump {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    bytes_written: u64,
}

impl PcmDump {
    /// Open `path` for appending
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        debug!("Dumping source PCM to {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            writer: Some(BufWriter::new(file)),
            bytes_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_active(&self) -> bool {
        self.writer.is_some()
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn write(&mut self, bytes: &[u8]) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };

        match writer.write_all(bytes) {
            Ok(()) => self.bytes_written += bytes.len() as u64,
            Err(e) => {
                warn!("Disabling PCM dump {}: {}", self.path.display(), e);
                self.writer = None;
            }
        }
    }

    /// Flush and close the file
    pub fn finish(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.flush() {
                warn!("Failed to flush PCM dump {}: {}", self.path.display(), e);
            }
        }
    }
}

impl Drop for PcmDump {
    fn drop(&mut self) {
        self.finish();
    }
}
