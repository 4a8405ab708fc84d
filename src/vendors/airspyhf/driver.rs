//! libairspyhf primitives consumed by the AirSpy HF+ host and stream

use crate::error::NativeResult;
use crate::stream::SdrTransfer;

/// `airspyhf_read_partid_serialno_t`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartIdSerial {
    pub part_id: u32,
    pub serial_no: [u32; 4],
}

/// Device-independent libairspyhf calls
pub trait AirspyHfDriver: Send + Sync {
    /// Serials of every attached HF+
    fn list_devices(&self) -> NativeResult<Vec<u64>>;

    /// Open by serial; the handle is closed when dropped
    fn open(&self, serial: u64) -> NativeResult<Box<dyn AirspyHfDevice>>;
}

/// Calls on one open HF+ handle
pub trait AirspyHfDevice: Send + Sync {
    fn partid_serialno(&self) -> NativeResult<PartIdSerial>;

    fn sample_rates(&self) -> NativeResult<Vec<u32>>;

    fn set_samplerate(&self, rate: u32) -> NativeResult<()>;

    fn set_freq(&self, freq: u32) -> NativeResult<()>;

    /// HF attenuator step, 0..=8 (6 dB each)
    fn set_hf_att(&self, value: u8) -> NativeResult<()>;

    /// Start receiving float32 I/Q and block until `cancel_async`.
    /// `armed` is called once `airspyhf_start` succeeded. `sink` may be
    /// called from a libairspyhf thread.
    fn read_async(
        &self,
        armed: &dyn Fn(),
        sink: &mut dyn FnMut(&SdrTransfer<'_>),
    ) -> NativeResult<()>;

    fn cancel_async(&self) -> NativeResult<()>;
}
