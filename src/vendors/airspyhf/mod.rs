//! AirSpy HF+ over libairspyhf

mod driver;
mod host;
mod stream;

#[cfg(feature = "airspyhf")]
mod ffi;

pub use driver::{AirspyHfDevice, AirspyHfDriver, PartIdSerial};
pub use host::AirspyHfHost;
pub use stream::AirspyHfStream;

#[cfg(feature = "airspyhf")]
pub use ffi::NativeAirspyHf;

/// Label used for HF+ device names
pub(crate) const BOARD_NAME: &str = "AIRSPY HF+";
