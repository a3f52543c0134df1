//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! All receiver parameters (channel count, channel map, demand scale,
//! failsafe timeout, transport selection) are supplied at construction
//! time and immutable afterwards. Validation failures are fatal at startup:
//! a bad channel map is a build/config defect, not a runtime condition.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{RcLinkError, Result};
use crate::mapper::ChannelMap;
use crate::protocol::validate_channel_count;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub receiver: ReceiverConfig,

    #[serde(default)]
    pub transport: TransportConfig,

    #[serde(default, rename = "loop")]
    pub control_loop: LoopConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            receiver: ReceiverConfig::default(),
            transport: TransportConfig::default(),
            control_loop: LoopConfig::default(),
        }
    }
}

/// Receiver construction parameters
#[derive(Debug, Deserialize, Clone)]
pub struct ReceiverConfig {
    /// Number of raw channels the transport delivers.
    #[serde(default = "default_channel_count")]
    pub channel_count: usize,

    /// Raw channel index per canonical axis (throttle, roll, pitch, yaw, aux...).
    #[serde(default = "default_channel_map")]
    pub channel_map: Vec<usize>,

    /// Scale factor applied uniformly to all mapped demands.
    #[serde(default = "default_demand_scale")]
    pub demand_scale: f32,

    /// Streaming-transport supervision window before `lost_signal` trips.
    #[serde(default = "default_failsafe_timeout_ms")]
    pub failsafe_timeout_ms: u64,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            channel_count: default_channel_count(),
            channel_map: default_channel_map(),
            demand_scale: default_demand_scale(),
            failsafe_timeout_ms: default_failsafe_timeout_ms(),
        }
    }
}

/// Which pilot-input transport the binary wires up.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Streaming binary frames over a serial port.
    Serial,
    /// Command messages over a TCP socket.
    Tcp,
}

/// Transport configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TransportConfig {
    #[serde(default = "default_transport_kind")]
    pub kind: TransportKind,

    /// Serial device path (streaming transport).
    #[serde(default = "default_serial_path")]
    pub serial_path: String,

    /// Serial baud rate (streaming transport).
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Listen address for the command socket (connection-oriented transport).
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: default_transport_kind(),
            serial_path: default_serial_path(),
            baud_rate: default_baud_rate(),
            bind_addr: default_bind_addr(),
        }
    }
}

/// Control loop settings for the demo binary
#[derive(Debug, Deserialize, Clone)]
pub struct LoopConfig {
    /// Poll rate of the control loop in Hz.
    #[serde(default = "default_poll_rate_hz")]
    pub poll_rate_hz: u32,

    /// Poll cycles between periodic status log lines.
    #[serde(default = "default_status_interval_cycles")]
    pub status_interval_cycles: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            poll_rate_hz: default_poll_rate_hz(),
            status_interval_cycles: default_status_interval_cycles(),
        }
    }
}

// Default value functions
fn default_channel_count() -> usize {
    6
}
fn default_channel_map() -> Vec<usize> {
    vec![0, 1, 2, 3, 4, 5]
}
fn default_demand_scale() -> f32 {
    1.0
}
fn default_failsafe_timeout_ms() -> u64 {
    1000
}

fn default_transport_kind() -> TransportKind {
    TransportKind::Tcp
}
fn default_serial_path() -> String {
    "/dev/ttyUSB0".to_string()
}
fn default_baud_rate() -> u32 {
    115_200
}
fn default_bind_addr() -> String {
    "0.0.0.0:4000".to_string()
}

fn default_poll_rate_hz() -> u32 {
    100
}
fn default_status_interval_cycles() -> u64 {
    500
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rc_link::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns [`RcLinkError::Config`] if any value cannot produce a working
    /// receiver: zero/out-of-range channel count, channel map referencing a
    /// nonexistent channel, non-finite or zero demand scale, zero timeout,
    /// or a zero poll rate.
    pub fn validate(&self) -> Result<()> {
        validate_channel_count(self.receiver.channel_count)?;

        // Construction is the validation; the map itself is rebuilt by the
        // receiver from these same values.
        ChannelMap::new(&self.receiver.channel_map, self.receiver.channel_count)?;

        if !self.receiver.demand_scale.is_finite() || self.receiver.demand_scale == 0.0 {
            return Err(RcLinkError::Config(format!(
                "Demand scale {} must be finite and non-zero",
                self.receiver.demand_scale
            )));
        }

        if self.receiver.failsafe_timeout_ms == 0 {
            return Err(RcLinkError::Config(
                "Failsafe timeout must be non-zero".to_string(),
            ));
        }

        if self.control_loop.poll_rate_hz == 0 || self.control_loop.poll_rate_hz > 1000 {
            return Err(RcLinkError::Config(format!(
                "Poll rate {}Hz outside supported range 1..=1000",
                self.control_loop.poll_rate_hz
            )));
        }

        Ok(())
    }

    /// Supervision window in microseconds.
    #[must_use]
    pub fn failsafe_timeout_micros(&self) -> u64 {
        self.receiver.failsafe_timeout_ms * 1_000
    }
}
