//! PortSDR - one interface over RTL-SDR, AirSpy and AirSpy HF+ receivers
//!
//! Hosts enumerate a vendor's radios as [`Device`]s. A device opens a
//! [`Stream`], which is tuned through a uniform set of setters and delivers
//! I/Q buffers to a registered callback from its own acquisition thread.
//!
//! ```no_run
//! use portsdr::{PortSdr, SdrTransfer};
//!
//! let portsdr = PortSdr::new();
//! if let Some(device) = portsdr.first_available_device() {
//!     let mut stream = device.create_stream()?;
//!     stream.set_sample_rate(2_048_000)?;
//!     stream.set_center_frequency(100_000_000)?;
//!     stream.set_callback(Box::new(|transfer: &SdrTransfer<'_>| {
//!         println!("{} samples", transfer.frame_size);
//!     }));
//!     stream.start()?;
//!     stream.stop()?;
//! }
//! # Ok::<(), portsdr::Error>(())
//! ```
//!
//! Native drivers are linked in with the `rtlsdr`, `airspy` and `airspyhf`
//! cargo features. Hosts can also be built over any implementation of the
//! per-vendor driver traits in [`vendors`].

pub mod config;
pub mod convert;
pub mod device;
pub mod error;
pub mod host;
pub mod range;
pub mod registry;
pub mod stream;
pub mod vendors;

pub use config::Config;
pub use device::Device;
pub use error::{Error, ErrorKind, NativeResult, Result};
pub use host::{Host, HostType};
pub use range::{Gain, MetaRange, Range};
pub use registry::PortSdr;
pub use stream::{
    AcquisitionStats, DeviceInfo, GainMode, SampleFormat, Samples, SdrCallback, SdrTransfer,
    Stream,
};
