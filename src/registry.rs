//! Host registry: the entry point for discovering radios across vendors

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::Config;
use crate::device::Device;
use crate::host::{Host, HostType};

/// Owns every registered vendor host.
///
/// Hosts are kept in registration order; device aggregation and the
/// first-available lookup follow that order. Dropping the registry drops
/// the hosts, after which devices they listed report
/// [`Error::HostUnavailable`](crate::Error::HostUnavailable).
pub struct PortSdr {
    hosts: Vec<Arc<dyn Host>>,
}

impl PortSdr {
    /// Registry over the native hosts enabled by [`Config::from_env`]
    pub fn new() -> Self {
        Self::with_config(&Config::from_env())
    }

    /// Registry over the native hosts compiled in and enabled by `config`.
    ///
    /// Without any of the `rtlsdr`, `airspy` or `airspyhf` features the
    /// registry is empty.
    #[cfg_attr(
        not(any(feature = "rtlsdr", feature = "airspy", feature = "airspyhf")),
        allow(unused_variables, unused_mut)
    )]
    pub fn with_config(config: &Config) -> Self {
        let mut hosts: Vec<Arc<dyn Host>> = Vec::new();

        #[cfg(feature = "rtlsdr")]
        if config.rtlsdr {
            hosts.push(crate::vendors::rtlsdr::RtlSdrHost::native(config));
        }

        #[cfg(feature = "airspy")]
        if config.airspy {
            hosts.push(crate::vendors::airspy::AirspyHost::native(config));
        }

        #[cfg(feature = "airspyhf")]
        if config.airspyhf {
            hosts.push(crate::vendors::airspyhf::AirspyHfHost::native());
        }

        Self::with_hosts(hosts)
    }

    /// Registry over caller-constructed hosts, in the given order
    pub fn with_hosts(hosts: Vec<Arc<dyn Host>>) -> Self {
        info!(
            "PortSDR {} with {} host(s): {}",
            Self::version(),
            hosts.len(),
            hosts
                .iter()
                .map(|h| h.name())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Self { hosts }
    }

    /// Library version
    pub fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    pub fn hosts(&self) -> &[Arc<dyn Host>] {
        &self.hosts
    }

    /// Devices of every host, concatenated in host order
    pub fn devices(&self) -> Vec<Device> {
        self.hosts.iter().flat_map(|host| host.devices()).collect()
    }

    pub fn find_host(&self, host_type: HostType) -> Option<Arc<dyn Host>> {
        self.hosts
            .iter()
            .find(|host| host.host_type() == host_type)
            .cloned()
    }

    /// Look a host up by its display name, ignoring case
    pub fn find_host_by_name(&self, name: &str) -> Option<Arc<dyn Host>> {
        self.hosts
            .iter()
            .find(|host| host.name().eq_ignore_ascii_case(name))
            .cloned()
    }

    /// First listed device with the given serial
    pub fn find_device(&self, serial: &str) -> Option<Device> {
        self.devices()
            .into_iter()
            .find(|device| !device.serial.is_empty() && device.serial == serial)
    }

    /// First device not marked unavailable, searching hosts in order
    pub fn first_available_device(&self) -> Option<Device> {
        self.hosts
            .iter()
            .find_map(|host| host.devices().into_iter().find(|d| !d.unavailable))
    }

    /// Re-enumerate every host
    pub fn refresh_devices(&self) {
        for host in &self.hosts {
            host.refresh_devices();
            debug!("{} lists {} device(s)", host.name(), host.devices().len());
        }
    }
}

impl Default for PortSdr {
    fn default() -> Self {
        Self::new()
    }
}
