//! RTL-SDR device enumeration

use std::sync::{Arc, Weak};

use tracing::{debug, warn};

use super::driver::RtlSdrDriver;
use super::stream::RtlSdrStream;
use crate::config::Config;
use crate::device::Device;
use crate::host::{DeviceList, Host, HostType};
use crate::stream::Stream;
use crate::vendors::{sanitize, UNAVAILABLE_SUFFIX};

/// RTL-SDR host: enumerates dongles by contiguous index
pub struct RtlSdrHost {
    driver: Arc<dyn RtlSdrDriver>,
    buffer_count: u32,
    buffer_length: u32,
    devices: DeviceList,
    me: Weak<RtlSdrHost>,
}

impl RtlSdrHost {
    /// Create the host over `driver` and run a first enumeration
    pub fn new(driver: Arc<dyn RtlSdrDriver>, config: &Config) -> Arc<Self> {
        let host = Arc::new_cyclic(|me| Self {
            driver,
            buffer_count: config.rtl_buffer_count,
            buffer_length: config.rtl_buffer_length,
            devices: DeviceList::default(),
            me: me.clone(),
        });
        host.refresh_devices();
        host
    }

    /// Host over the system librtlsdr
    #[cfg(feature = "rtlsdr")]
    pub fn native(config: &Config) -> Arc<Self> {
        Self::new(Arc::new(super::ffi::NativeRtlSdr), config)
    }

    fn describe(&self, index: u32) -> Device {
        let host: Weak<dyn Host> = self.me.clone();
        let mut device = Device::new(HostType::RtlSdr, u64::from(index), host);

        // Opening tells us whether another process holds the dongle
        let handle = match self.driver.open(index) {
            Ok(handle) => handle,
            Err(code) => {
                warn!("RTL-SDR #{} could not be opened (code {})", index, code);
                device.name = format!("{}{}", self.driver.device_name(index), UNAVAILABLE_SUFFIX);
                device.unavailable = true;
                return device;
            }
        };

        match self.driver.usb_strings(index) {
            Ok(strings) => {
                device.serial = sanitize(&strings.serial);
                device.name = format!(
                    "{} {} SN: {}",
                    sanitize(&strings.manufacturer),
                    sanitize(&strings.product),
                    device.serial
                );
            }
            Err(code) => {
                debug!("RTL-SDR #{} has no USB strings (code {})", index, code);
                device.name = self.driver.device_name(index);
            }
        }

        drop(handle);
        device
    }
}

impl Host for RtlSdrHost {
    fn host_type(&self) -> HostType {
        HostType::RtlSdr
    }

    fn refresh_devices(&self) {
        let count = self.driver.device_count();
        let devices: Vec<Device> = (0..count).map(|index| self.describe(index)).collect();

        for device in &devices {
            debug!("Found RTL-SDR #{}: {}", device.index, device.name);
        }
        self.devices.replace(devices);
    }

    fn devices(&self) -> Vec<Device> {
        self.devices.snapshot()
    }

    fn create_stream(&self) -> Box<dyn Stream> {
        Box::new(RtlSdrStream::new(
            self.driver.clone(),
            self.buffer_count,
            self.buffer_length,
        ))
    }
}
