//! RTL-SDR (RTL2832U dongles) over librtlsdr

mod driver;
mod host;
pub mod if_gain;
mod stream;

#[cfg(feature = "rtlsdr")]
mod ffi;

pub use driver::{RtlSdrDevice, RtlSdrDriver, TunerType, UsbStrings, OFFSET_TUNING_UNSUPPORTED};
pub use host::RtlSdrHost;
pub use stream::{RtlSdrStream, SAMPLE_RATES};

#[cfg(feature = "rtlsdr")]
pub use ffi::NativeRtlSdr;
