//! AirSpy (R2 / Mini) over libairspy

mod driver;
mod host;
mod stream;

#[cfg(feature = "airspy")]
mod ffi;

pub use driver::{board_id_name, AirspyDevice, AirspyDriver, PartIdSerial, SampleType};
pub use host::AirspyHost;
pub use stream::AirspyStream;

#[cfg(feature = "airspy")]
pub use ffi::NativeAirspy;
