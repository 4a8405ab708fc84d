//! AirSpy HF+ device enumeration

use std::sync::{Arc, Weak};

use tracing::{debug, warn};

use super::driver::AirspyHfDriver;
use super::stream::AirspyHfStream;
use super::BOARD_NAME;
use crate::device::Device;
use crate::host::{DeviceList, Host, HostType};
use crate::stream::Stream;
use crate::vendors::{serial_words, UNAVAILABLE_SUFFIX};

/// AirSpy HF+ host: enumerates receivers by serial number
pub struct AirspyHfHost {
    driver: Arc<dyn AirspyHfDriver>,
    devices: DeviceList,
    me: Weak<AirspyHfHost>,
}

impl AirspyHfHost {
    /// Create the host over `driver` and run a first enumeration
    pub fn new(driver: Arc<dyn AirspyHfDriver>) -> Arc<Self> {
        let host = Arc::new_cyclic(|me| Self {
            driver,
            devices: DeviceList::default(),
            me: me.clone(),
        });
        host.refresh_devices();
        host
    }

    /// Host over the system libairspyhf
    #[cfg(feature = "airspyhf")]
    pub fn native() -> Arc<Self> {
        Self::new(Arc::new(super::ffi::NativeAirspyHf))
    }

    fn describe(&self, serial: u64) -> Device {
        let host: Weak<dyn Host> = self.me.clone();
        let mut device = Device::new(HostType::AirSpyHf, serial, host);

        // Enumeration already knows the serial; the board read refines it
        device.serial = serial_words((serial >> 32) as u32, serial as u32);

        let handle = match self.driver.open(serial) {
            Ok(handle) => handle,
            Err(code) => {
                warn!("AirSpy HF+ {} could not be opened (code {})", device.serial, code);
                device.name = format!("{}{}", BOARD_NAME, UNAVAILABLE_SUFFIX);
                device.unavailable = true;
                return device;
            }
        };

        match handle.partid_serialno() {
            Ok(part) => {
                device.serial = serial_words(part.serial_no[0], part.serial_no[1]);
                device.name = format!("{} SN: {}", BOARD_NAME, device.serial);
            }
            Err(code) => {
                debug!("AirSpy HF+ {} part id read failed (code {})", device.serial, code);
                device.name = BOARD_NAME.to_string();
            }
        }

        device
    }
}

impl Host for AirspyHfHost {
    fn host_type(&self) -> HostType {
        HostType::AirSpyHf
    }

    fn refresh_devices(&self) {
        let serials = match self.driver.list_devices() {
            Ok(serials) => serials,
            Err(code) => {
                warn!("AirSpy HF+ enumeration failed (code {})", code);
                Vec::new()
            }
        };

        let devices: Vec<Device> = serials
            .into_iter()
            .map(|serial| self.describe(serial))
            .collect();

        for device in &devices {
            debug!("Found AirSpy HF+: {}", device.name);
        }
        self.devices.replace(devices);
    }

    fn devices(&self) -> Vec<Device> {
        self.devices.snapshot()
    }

    fn create_stream(&self) -> Box<dyn Stream> {
        Box::new(AirspyHfStream::new(self.driver.clone()))
    }
}
