//! Configuration loaded from environment variables

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default number of RTL-SDR USB transfer buffers
pub const DEFAULT_RTL_BUFFER_COUNT: u32 = 64;

/// Default RTL-SDR transfer length in bytes (must be a multiple of 512)
pub const DEFAULT_RTL_BUFFER_LENGTH: u32 = 4 * 32 * 512;

/// Default cap on AirSpy serials returned by one enumeration
pub const DEFAULT_AIRSPY_MAX_DEVICES: usize = 32;

/// Library configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Register the RTL-SDR host (requires the `rtlsdr` feature)
    pub rtlsdr: bool,

    /// Register the AirSpy host (requires the `airspy` feature)
    pub airspy: bool,

    /// Register the AirSpy HF+ host (requires the `airspyhf` feature)
    pub airspyhf: bool,

    /// RTL-SDR asynchronous read buffer count
    pub rtl_buffer_count: u32,

    /// RTL-SDR asynchronous read buffer length in bytes
    pub rtl_buffer_length: u32,

    /// Maximum AirSpy devices listed per enumeration
    pub airspy_max_devices: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rtlsdr: true,
            airspy: true,
            airspyhf: true,
            rtl_buffer_count: DEFAULT_RTL_BUFFER_COUNT,
            rtl_buffer_length: DEFAULT_RTL_BUFFER_LENGTH,
            airspy_max_devices: DEFAULT_AIRSPY_MAX_DEVICES,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            rtlsdr: lookup("PORTSDR_RTLSDR")
                .map(|s| parse_flag(&s))
                .unwrap_or(defaults.rtlsdr),

            airspy: lookup("PORTSDR_AIRSPY")
                .map(|s| parse_flag(&s))
                .unwrap_or(defaults.airspy),

            airspyhf: lookup("PORTSDR_AIRSPYHF")
                .map(|s| parse_flag(&s))
                .unwrap_or(defaults.airspyhf),

            rtl_buffer_count: lookup("PORTSDR_RTL_BUFFERS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.rtl_buffer_count),

            rtl_buffer_length: lookup("PORTSDR_RTL_BUFFER_LENGTH")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.rtl_buffer_length),

            airspy_max_devices: lookup("PORTSDR_AIRSPY_MAX_DEVICES")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.airspy_max_devices),
        };

        config.validated()
    }

    /// Replace out-of-range values with their defaults
    pub fn validated(mut self) -> Self {
        if self.rtl_buffer_count == 0 {
            warn!(
                "RTL-SDR buffer count must be non-zero, using {}",
                DEFAULT_RTL_BUFFER_COUNT
            );
            self.rtl_buffer_count = DEFAULT_RTL_BUFFER_COUNT;
        }

        if self.rtl_buffer_length == 0 || self.rtl_buffer_length % 512 != 0 {
            warn!(
                "RTL-SDR buffer length {} is not a multiple of 512, using {}",
                self.rtl_buffer_length, DEFAULT_RTL_BUFFER_LENGTH
            );
            self.rtl_buffer_length = DEFAULT_RTL_BUFFER_LENGTH;
        }

        if self.airspy_max_devices == 0 {
            warn!(
                "AirSpy max devices must be non-zero, using {}",
                DEFAULT_AIRSPY_MAX_DEVICES
            );
            self.airspy_max_devices = DEFAULT_AIRSPY_MAX_DEVICES;
        }

        self
    }
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "off" | "no"
    )
}
