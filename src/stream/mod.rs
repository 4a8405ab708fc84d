//! Stream capability interface shared by every vendor
//!
//! A stream is one open, controllable receiver:
//!
//! ```text
//! Uninitialized -> Initialized -> Streaming -> Initialized (stopped) -> Closed
//! ```
//!
//! `start` spawns a single acquisition thread that blocks inside the
//! vendor's asynchronous read and invokes the registered callback for every
//! buffer; `stop` cancels the read and joins the thread. Dropping a stream
//! stops it and releases the native handle.

mod transfer;
mod worker;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::host::HostType;
use crate::range::Gain;

pub use transfer::{Samples, SdrCallback, SdrTransfer};
pub use worker::AcquisitionStats;
pub(crate) use worker::{Acquisition, Delivery};

/// I/Q sample encoding delivered to the callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SampleFormat {
    IqUint8 = 0,
    IqInt16 = 1,
    IqFloat32 = 2,
}

impl SampleFormat {
    pub(crate) fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(SampleFormat::IqUint8),
            1 => Some(SampleFormat::IqInt16),
            2 => Some(SampleFormat::IqFloat32),
            _ => None,
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SampleFormat::IqUint8 => "IQ_UINT8",
            SampleFormat::IqInt16 => "IQ_INT16",
            SampleFormat::IqFloat32 => "IQ_FLOAT32",
        };
        f.write_str(name)
    }
}

/// How the default gain control is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GainMode {
    /// AirSpy combined gain tuned for linearity
    Linearity,
    /// AirSpy combined gain tuned for sensitivity
    Sensitivity,
    /// No gain-mode concept: stages are set independently
    Free,
}

impl GainMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GainMode::Linearity => "LINEARITY",
            GainMode::Sensitivity => "SENSITIVITY",
            GainMode::Free => "FREE",
        }
    }
}

impl fmt::Display for GainMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GainMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "LINEARITY" => Ok(GainMode::Linearity),
            "SENSITIVITY" => Ok(GainMode::Sensitivity),
            "FREE" => Ok(GainMode::Free),
            _ => Err(Error::invalid_argument(format!("unknown gain mode '{}'", s))),
        }
    }
}

/// USB identity of an opened device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub name: String,
    pub serial: String,
}

/// One open receiver session, produced by a [`Host`](crate::Host).
///
/// Getters return the values cached by the last successful setter; nothing
/// is read back from hardware. Calling setters while streaming is
/// vendor-defined: not every driver guarantees it is race-free.
pub trait Stream: Send {
    fn host_type(&self) -> HostType;

    /// Open the vendor handle for `index` and apply vendor defaults.
    ///
    /// No-op when already initialized on the same key.
    fn initialize(&mut self, index: u64) -> Result<()>;

    fn is_initialized(&self) -> bool;

    fn usb_strings(&self) -> Result<DeviceInfo>;

    /// Spawn the acquisition thread. No-op when already streaming.
    fn start(&mut self) -> Result<()>;

    /// Cancel acquisition and join the thread. No-op when not streaming.
    ///
    /// No callback runs after this returns `Ok`.
    fn stop(&mut self) -> Result<()>;

    fn is_streaming(&self) -> bool;

    fn set_sample_rate(&mut self, sample_rate: u32) -> Result<()>;
    fn set_center_frequency(&mut self, freq: u32) -> Result<()>;
    fn set_sample_format(&mut self, format: SampleFormat) -> Result<()>;

    /// Set the default gain stage (see [`gain_stage`](Stream::gain_stage)), in dB
    fn set_gain(&mut self, gain: f64) -> Result<()>;

    /// Set a named gain stage, in dB
    fn set_stage_gain(&mut self, stage: &str, gain: f64) -> Result<()>;

    fn set_gain_mode(&mut self, mode: GainMode) -> Result<()>;

    fn sample_rates(&self) -> Vec<u32>;
    fn sample_formats(&self) -> Vec<SampleFormat>;
    fn gain_modes(&self) -> Vec<GainMode>;

    /// Stage driven by [`set_gain`](Stream::set_gain)
    fn gain_stage(&self) -> Gain;

    /// Every independently controllable stage
    fn gain_stages(&self) -> Vec<Gain>;

    fn center_frequency(&self) -> u32;
    fn sample_rate(&self) -> u32;
    fn sample_format(&self) -> SampleFormat;
    fn gain(&self) -> f64;

    /// Cached gain of a named stage, `None` for unknown stage names
    fn stage_gain(&self, stage: &str) -> Option<f64>;

    fn gain_mode(&self) -> GainMode;

    /// Register the sample callback. Must be set before `start` to observe
    /// samples; nothing is buffered for late registration.
    fn set_callback(&mut self, callback: SdrCallback);

    /// Counters for the current (or last) acquisition run
    fn stats(&self) -> AcquisitionStats;
}
