//! librtlsdr primitives consumed by the RTL-SDR host and stream

use crate::error::NativeResult;

/// `rtlsdr_set_offset_tuning` result when the tuner has no offset mode
pub const OFFSET_TUNING_UNSUPPORTED: i32 = -2;

/// Tuner chip behind the RTL2832U
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunerType {
    Unknown,
    E4000,
    Fc0012,
    Fc0013,
    Fc2580,
    R820T,
    R828D,
}

impl TunerType {
    /// Map the `rtlsdr_tuner` enum value
    pub fn from_raw(value: i32) -> Self {
        match value {
            1 => TunerType::E4000,
            2 => TunerType::Fc0012,
            3 => TunerType::Fc0013,
            4 => TunerType::Fc2580,
            5 => TunerType::R820T,
            6 => TunerType::R828D,
            _ => TunerType::Unknown,
        }
    }
}

/// Manufacturer, product and serial USB descriptor strings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsbStrings {
    pub manufacturer: String,
    pub product: String,
    pub serial: String,
}

/// Device-independent librtlsdr calls
pub trait RtlSdrDriver: Send + Sync {
    fn device_count(&self) -> u32;

    fn device_name(&self, index: u32) -> String;

    fn usb_strings(&self, index: u32) -> NativeResult<UsbStrings>;

    /// Open by index; the handle is closed when dropped
    fn open(&self, index: u32) -> NativeResult<Box<dyn RtlSdrDevice>>;
}

/// Calls on one open RTL-SDR handle.
///
/// `read_async` runs on the acquisition thread while the other methods run
/// on the controlling thread.
pub trait RtlSdrDevice: Send + Sync {
    fn set_offset_tuning(&self, enable: bool) -> NativeResult<()>;

    fn reset_buffer(&self) -> NativeResult<()>;

    fn set_center_freq(&self, freq: u32) -> NativeResult<()>;

    fn set_sample_rate(&self, rate: u32) -> NativeResult<()>;

    fn tuner_type(&self) -> TunerType;

    /// Supported tuner gains in tenths of dB
    fn tuner_gains(&self) -> Vec<i32>;

    fn set_tuner_gain_mode(&self, manual: bool) -> NativeResult<()>;

    /// Overall tuner gain in tenths of dB
    fn set_tuner_gain(&self, gain: i32) -> NativeResult<()>;

    /// One IF stage (1-based) in tenths of dB
    fn set_tuner_if_gain(&self, stage: i32, gain: i32) -> NativeResult<()>;

    /// Block delivering raw u8 I/Q buffers to `sink` until `cancel_async`.
    ///
    /// `armed` is called once the read is running and a cancel will be
    /// honoured; librtlsdr only reports that through the first buffer.
    fn read_async(
        &self,
        buffer_count: u32,
        buffer_length: u32,
        armed: &dyn Fn(),
        sink: &mut dyn FnMut(&[u8]),
    ) -> NativeResult<()>;

    /// Fails (librtlsdr: -2) when no read is running
    fn cancel_async(&self) -> NativeResult<()>;
}
