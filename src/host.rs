//! Vendor host abstraction: device discovery and stream factory

use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::device::Device;
use crate::error::{Error, Result};
use crate::stream::Stream;

/// Supported vendor families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HostType {
    RtlSdr,
    AirSpy,
    AirSpyHf,
}

impl HostType {
    pub const ALL: [HostType; 3] = [HostType::RtlSdr, HostType::AirSpy, HostType::AirSpyHf];

    /// Human-readable vendor name
    pub fn name(&self) -> &'static str {
        match self {
            HostType::RtlSdr => "RTL-SDR",
            HostType::AirSpy => "AirSpy",
            HostType::AirSpyHf => "AirSpy HF+",
        }
    }
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HostType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        HostType::ALL
            .into_iter()
            .find(|ty| ty.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::invalid_argument(format!("unknown host type '{}'", s)))
    }
}

/// Device discovery and stream creation for one vendor family.
///
/// Hosts are shared as `Arc<dyn Host>`; the devices they list hold only a
/// weak reference back to them.
pub trait Host: Send + Sync {
    fn host_type(&self) -> HostType;

    fn name(&self) -> &'static str {
        self.host_type().name()
    }

    /// Re-enumerate attached hardware, replacing the previous device list
    fn refresh_devices(&self);

    /// Snapshot of the device list from the last refresh
    fn devices(&self) -> Vec<Device>;

    /// New, uninitialized stream for this vendor
    fn create_stream(&self) -> Box<dyn Stream>;

    /// Create a stream and initialize it on `device`.
    ///
    /// The stream is only returned when initialization succeeded; on failure
    /// it is dropped (releasing anything it opened) and the error is
    /// returned untouched.
    fn create_and_initialize_stream(&self, device: &Device) -> Result<Box<dyn Stream>> {
        if device.host_type != self.host_type() {
            return Err(Error::invalid_argument(format!(
                "device '{}' belongs to {}, not {}",
                device.name,
                device.host_type,
                self.host_type()
            )));
        }

        let mut stream = self.create_stream();
        stream.initialize(device.index)?;
        Ok(stream)
    }
}

/// Device list shared between a host and its callers
#[derive(Default)]
pub(crate) struct DeviceList {
    devices: RwLock<Vec<Device>>,
}

impl DeviceList {
    /// Replace the whole list (no incremental diffing)
    pub fn replace(&self, devices: Vec<Device>) {
        let mut guard = self
            .devices
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = devices;
    }

    pub fn snapshot(&self) -> Vec<Device> {
        self.devices
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}
