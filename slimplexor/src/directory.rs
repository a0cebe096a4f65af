//! Rate→device directory
//!
//! Read-only table mapping a sample rate to a destination device. Lookup
//! is a linear scan and the first matching entry wins, so duplicate rates
//! resolve to whichever is listed first.

use crate::error::{Error, Result};
use slimplexor_common::{RateDeviceEntry, TomlConfig};

#[derive(Debug, Clone)]
pub struct RateDeviceDirectory {
    entries: Vec<RateDeviceEntry>,
}

impl RateDeviceDirectory {
    pub fn new(entries: Vec<RateDeviceEntry>) -> Self {
        Self { entries }
    }

    pub fn from_config(config: &TomlConfig) -> Self {
        Self::new(config.rate_devices.clone())
    }

    /// Device identifier for `rate`
    pub fn resolve(&self, rate: u32) -> Result<&str> {
        self.entries
            .iter()
            .find(|entry| entry.rate == rate)
            .map(|entry| entry.device.as_str())
            .ok_or(Error::DeviceNotFound { rate })
    }

    pub fn entries(&self) -> &[RateDeviceEntry] {
        &self.entries
    }

    /// Distinct rates in table order
    pub fn rates(&self) -> Vec<u32> {
        let mut rates: Vec<u32> = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            if !rates.contains(&entry.rate) {
                rates.push(entry.rate);
            }
        }
        rates
    }
}
