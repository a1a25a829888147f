//! Configuration for gaze-shim
//!
//! Every field has a default matching the fixed endpoint the eye tracker
//! feeder sends to, so the shim works without any configuration file. A TOML
//! file can override the defaults for development setups.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

/// UDP port the eye tracker feeder sends to
pub const DEFAULT_PORT: u16 = 9020;

/// OSC address carrying left/right pitch/yaw angles
pub const GAZE_ADDRESS: &str = "/tracking/eye/LeftRightPitchYaw";

/// Input path the host requires for the eye-tracking component
pub const EYE_TRACKING_COMPONENT_PATH: &str = "/eyetracking";

/// Top-level shim configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ShimConfig {
    pub listener: ListenerConfig,
    pub input: InputConfig,
    pub logging: LoggingConfig,
}

/// OSC listener configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// UDP bind address
    ///
    /// Examples:
    /// - `0.0.0.0:9020` - All interfaces (default)
    /// - `127.0.0.1:0` - Localhost, ephemeral port (tests)
    pub bind_address: String,

    /// OSC address pattern that carries gaze samples; all others are ignored
    pub gaze_address: String,

    /// Receive buffer size; larger datagrams are truncated and fail to decode
    pub max_datagram_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: format!("0.0.0.0:{}", DEFAULT_PORT),
            gaze_address: GAZE_ADDRESS.to_string(),
            max_datagram_size: 1536,
        }
    }
}

impl ListenerConfig {
    /// Parse `bind_address`
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_address.parse().map_err(|e| {
            Error::Config(format!("Invalid bind address '{}': {}", self.bind_address, e))
        })
    }
}

/// Host input registry configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct InputConfig {
    /// Path of the eye-tracking input component
    pub component_path: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            component_path: EYE_TRACKING_COMPONENT_PATH.to_string(),
        }
    }
}

/// Logging configuration (used by the binary)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ShimConfig {
    /// Load configuration from TOML file
    ///
    /// Missing sections and fields fall back to their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: ShimConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Check values that would otherwise only fail at activation
    pub fn validate(&self) -> Result<()> {
        self.listener.socket_addr()?;

        if !self.listener.gaze_address.starts_with('/') {
            return Err(Error::Config(format!(
                "OSC address must start with '/': {}",
                self.listener.gaze_address
            )));
        }
        if self.listener.max_datagram_size < 64 {
            return Err(Error::Config(format!(
                "max_datagram_size too small: {}",
                self.listener.max_datagram_size
            )));
        }
        if !self.input.component_path.starts_with('/') || self.input.component_path.len() < 2 {
            return Err(Error::Config(format!(
                "Invalid component path: '{}'",
                self.input.component_path
            )));
        }
        Ok(())
    }
}
