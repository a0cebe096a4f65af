//! # SlimPlexor Common Library
//!
//! Shared code for the SlimPlexor engine and its front ends:
//! - Configuration file model, validation and resolution
//! - Logging initialisation
//! - Common error type

pub mod config;
pub mod error;
pub mod logging;

pub use config::{LogLevel, LoggingConfig, RateDeviceEntry, TomlConfig};
pub use error::{Error, Result};
