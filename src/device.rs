//! Discovered radio units

use std::fmt;
use std::sync::{Arc, Weak};

use crate::error::{Error, Result};
use crate::host::{Host, HostType};
use crate::stream::Stream;

/// One discovered radio unit.
///
/// Created by a host during enumeration and replaced wholesale on the next
/// refresh. The back-reference to the host is weak: a device never keeps
/// its host alive.
#[derive(Clone)]
pub struct Device {
    /// Vendor serial; empty when the vendor could not report one
    pub serial: String,
    /// Human-readable label
    pub name: String,
    /// Vendor-native open key (RTL-SDR index, AirSpy serial number)
    pub index: u64,
    pub host_type: HostType,
    /// Listed but could not be opened during enumeration (e.g. in use)
    pub unavailable: bool,
    host: Weak<dyn Host>,
}

impl Device {
    pub fn new(host_type: HostType, index: u64, host: Weak<dyn Host>) -> Self {
        Self {
            serial: String::new(),
            name: String::new(),
            index,
            host_type,
            unavailable: false,
            host,
        }
    }

    /// The host that discovered this device, if it still exists
    pub fn host(&self) -> Option<Arc<dyn Host>> {
        self.host.upgrade()
    }

    /// Open a stream on this device through its host.
    ///
    /// Fails with [`Error::HostUnavailable`] once the host has been dropped.
    pub fn create_stream(&self) -> Result<Box<dyn Stream>> {
        let host = self.host().ok_or(Error::HostUnavailable)?;
        host.create_and_initialize_stream(self)
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("serial", &self.serial)
            .field("name", &self.name)
            .field("index", &self.index)
            .field("host_type", &self.host_type)
            .field("unavailable", &self.unavailable)
            .finish()
    }
}
