//! Stream engine
//!
//! [`StreamSession`] sequences the directory, repacker, delivery and
//! marker components in response to host callbacks.

pub mod delivery;
pub mod dump;
pub mod markers;
pub mod session;

pub use delivery::{Delivery, Destination, HwPointer};
pub use dump::PcmDump;
pub use session::{SessionState, StreamSession};

use slimplexor_common::TomlConfig;
use std::path::PathBuf;

/// Per-session settings taken from the loaded configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Append consumed source PCM here
    pub dump_file: Option<PathBuf>,
}

impl EngineConfig {
    pub fn from_config(config: &TomlConfig) -> Self {
        Self {
            dump_file: config.dump_file.clone(),
        }
    }
}
