//! AirSpy device enumeration by serial

use std::sync::{Arc, Weak};

use tracing::{debug, warn};

use super::driver::{board_id_name, AirspyDriver};
use super::stream::AirspyStream;
use crate::config::Config;
use crate::device::Device;
use crate::host::{DeviceList, Host, HostType};
use crate::stream::Stream;
use crate::vendors::serial_words;

/// AirSpy host: enumerates boards by serial number
pub struct AirspyHost {
    driver: Arc<dyn AirspyDriver>,
    max_devices: usize,
    devices: DeviceList,
    me: Weak<AirspyHost>,
}

impl AirspyHost {
    /// Create the host over `driver` and run a first enumeration
    pub fn new(driver: Arc<dyn AirspyDriver>, config: &Config) -> Arc<Self> {
        let host = Arc::new_cyclic(|me| Self {
            driver,
            max_devices: config.airspy_max_devices,
            devices: DeviceList::default(),
            me: me.clone(),
        });
        host.refresh_devices();
        host
    }

    /// Host over the system libairspy
    #[cfg(feature = "airspy")]
    pub fn native(config: &Config) -> Arc<Self> {
        Self::new(Arc::new(super::ffi::NativeAirspy), config)
    }

    /// Read board metadata; boards that cannot be opened are skipped
    fn describe(&self, serial: u64) -> Option<Device> {
        let handle = match self.driver.open(serial) {
            Ok(handle) => handle,
            Err(code) => {
                warn!("AirSpy {:016X} could not be opened (code {})", serial, code);
                return None;
            }
        };

        let host: Weak<dyn Host> = self.me.clone();
        let mut device = Device::new(HostType::AirSpy, serial, host);

        device.name = match handle.board_id() {
            Ok(board_id) => board_id_name(board_id).to_string(),
            Err(_) => board_id_name(0).to_string(),
        };

        if let Ok(part) = handle.partid_serialno() {
            device.serial = serial_words(part.serial_no[2], part.serial_no[3]);
            device.name = format!("{} SN: {}", device.name, device.serial);
        }

        Some(device)
    }
}

impl Host for AirspyHost {
    fn host_type(&self) -> HostType {
        HostType::AirSpy
    }

    fn refresh_devices(&self) {
        let serials = match self.driver.list_devices(self.max_devices) {
            Ok(serials) => serials,
            Err(code) => {
                warn!("AirSpy enumeration failed (code {})", code);
                Vec::new()
            }
        };

        let devices: Vec<Device> = serials
            .into_iter()
            .filter_map(|serial| self.describe(serial))
            .collect();

        for device in &devices {
            debug!("Found AirSpy: {}", device.name);
        }
        self.devices.replace(devices);
    }

    fn devices(&self) -> Vec<Device> {
        self.devices.snapshot()
    }

    fn create_stream(&self) -> Box<dyn Stream> {
        Box::new(AirspyStream::new(self.driver.clone()))
    }
}
