//! libairspy primitives consumed by the AirSpy host and stream

use crate::error::NativeResult;
use crate::stream::SdrTransfer;

/// Board part id and serial words, as read from the device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartIdSerial {
    pub part_id: [u32; 2],
    pub serial_no: [u32; 4],
}

/// `airspy_sample_type` values used by this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum SampleType {
    Float32Iq = 0,
    Int16Iq = 2,
}

/// Human-readable board name for an `airspy_board_id_read` value
pub fn board_id_name(board_id: u8) -> &'static str {
    match board_id {
        0 => "AIRSPY",
        0xFF => "Invalid Board ID",
        _ => "Unknown Board ID",
    }
}

/// Device-independent libairspy calls
pub trait AirspyDriver: Send + Sync {
    /// Serials of attached boards, at most `max`
    fn list_devices(&self, max: usize) -> NativeResult<Vec<u64>>;

    /// Open by serial; the handle is closed when dropped
    fn open(&self, serial: u64) -> NativeResult<Box<dyn AirspyDevice>>;
}

/// Calls on one open AirSpy handle
pub trait AirspyDevice: Send + Sync {
    fn board_id(&self) -> NativeResult<u8>;

    fn partid_serialno(&self) -> NativeResult<PartIdSerial>;

    fn sample_rates(&self) -> NativeResult<Vec<u32>>;

    fn set_sample_type(&self, sample_type: SampleType) -> NativeResult<()>;

    fn set_samplerate(&self, rate: u32) -> NativeResult<()>;

    fn set_freq(&self, freq: u32) -> NativeResult<()>;

    fn set_lna_gain(&self, value: u8) -> NativeResult<()>;

    fn set_mixer_gain(&self, value: u8) -> NativeResult<()>;

    fn set_vga_gain(&self, value: u8) -> NativeResult<()>;

    fn set_linearity_gain(&self, value: u8) -> NativeResult<()>;

    fn set_sensitivity_gain(&self, value: u8) -> NativeResult<()>;

    /// Start receiving and block until `cancel_async`, handing every
    /// transfer to `sink`. `armed` is called once `airspy_start_rx`
    /// succeeded. `sink` may be called from a libairspy thread.
    fn read_async(
        &self,
        armed: &dyn Fn(),
        sink: &mut dyn FnMut(&SdrTransfer<'_>),
    ) -> NativeResult<()>;

    /// Stop receiving and release a blocked `read_async`
    fn cancel_async(&self) -> NativeResult<()>;
}
