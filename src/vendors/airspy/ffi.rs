//! libairspy bindings

use std::os::raw::{c_int, c_void};
use std::ptr;
use std::slice;

use crossbeam_channel::{bounded, Receiver, Sender};

use super::driver::{AirspyDevice, AirspyDriver, PartIdSerial, SampleType};
use crate::error::NativeResult;
use crate::stream::{Samples, SdrTransfer};

const AIRSPY_SUCCESS: c_int = 0;

type AirspyDev = c_void;

#[repr(C)]
#[allow(dead_code)]
struct AirspyTransfer {
    device: *mut AirspyDev,
    ctx: *mut c_void,
    samples: *mut c_void,
    sample_count: c_int,
    dropped_samples: u64,
    sample_type: c_int,
}

#[repr(C)]
#[derive(Default)]
struct AirspyReadPartIdSerialNo {
    part_id: [u32; 2],
    serial_no: [u32; 4],
}

type SampleBlockCb = unsafe extern "C" fn(transfer: *mut AirspyTransfer) -> c_int;

extern "C" {
    fn airspy_list_devices(serials: *mut u64, count: c_int) -> c_int;
    fn airspy_open_sn(device: *mut *mut AirspyDev, serial_number: u64) -> c_int;
    fn airspy_close(device: *mut AirspyDev) -> c_int;
    fn airspy_board_id_read(device: *mut AirspyDev, value: *mut u8) -> c_int;
    fn airspy_board_partid_serialno_read(
        device: *mut AirspyDev,
        read_partid_serialno: *mut AirspyReadPartIdSerialNo,
    ) -> c_int;
    fn airspy_get_samplerates(device: *mut AirspyDev, buffer: *mut u32, len: u32) -> c_int;
    fn airspy_set_samplerate(device: *mut AirspyDev, samplerate: u32) -> c_int;
    fn airspy_set_sample_type(device: *mut AirspyDev, sample_type: c_int) -> c_int;
    fn airspy_set_freq(device: *mut AirspyDev, freq_hz: u32) -> c_int;
    fn airspy_set_lna_gain(device: *mut AirspyDev, value: u8) -> c_int;
    fn airspy_set_mixer_gain(device: *mut AirspyDev, value: u8) -> c_int;
    fn airspy_set_vga_gain(device: *mut AirspyDev, value: u8) -> c_int;
    fn airspy_set_linearity_gain(device: *mut AirspyDev, value: u8) -> c_int;
    fn airspy_set_sensitivity_gain(device: *mut AirspyDev, value: u8) -> c_int;
    fn airspy_start_rx(device: *mut AirspyDev, callback: SampleBlockCb, rx_ctx: *mut c_void)
        -> c_int;
    fn airspy_stop_rx(device: *mut AirspyDev) -> c_int;
}

fn status(ret: c_int) -> NativeResult<()> {
    if ret == AIRSPY_SUCCESS {
        Ok(())
    } else {
        Err(ret)
    }
}

/// The system libairspy
pub struct NativeAirspy;

impl AirspyDriver for NativeAirspy {
    fn list_devices(&self, max: usize) -> NativeResult<Vec<u64>> {
        let mut serials = vec![0u64; max];
        let count = unsafe { airspy_list_devices(serials.as_mut_ptr(), max as c_int) };
        if count < 0 {
            return Err(count);
        }
        serials.truncate(count as usize);
        Ok(serials)
    }

    fn open(&self, serial: u64) -> NativeResult<Box<dyn AirspyDevice>> {
        let mut dev: *mut AirspyDev = ptr::null_mut();
        status(unsafe { airspy_open_sn(&mut dev, serial) })?;

        let (cancel_tx, cancel_rx) = bounded(1);
        Ok(Box::new(NativeAirspyDevice {
            handle: dev,
            cancel_tx,
            cancel_rx,
        }))
    }
}

struct NativeAirspyDevice {
    handle: *mut AirspyDev,
    cancel_tx: Sender<()>,
    cancel_rx: Receiver<()>,
}

// libairspy serializes control transfers internally and runs its own
// receive threads
unsafe impl Send for NativeAirspyDevice {}
unsafe impl Sync for NativeAirspyDevice {}

type Sink<'a> = &'a mut dyn FnMut(&SdrTransfer<'_>);

unsafe extern "C" fn rx_callback(transfer: *mut AirspyTransfer) -> c_int {
    let transfer = &*transfer;
    let sink = &mut *(transfer.ctx as *mut Sink<'_>);
    let count = transfer.sample_count.max(0) as usize;

    let samples = if transfer.sample_type == SampleType::Int16Iq as c_int {
        Samples::I16(slice::from_raw_parts(transfer.samples as *const i16, count * 2))
    } else if transfer.sample_type == SampleType::Float32Iq as c_int {
        Samples::F32(slice::from_raw_parts(transfer.samples as *const f32, count * 2))
    } else {
        return 0;
    };

    sink(&SdrTransfer::new(samples, count, transfer.dropped_samples));
    0
}

impl AirspyDevice for NativeAirspyDevice {
    fn board_id(&self) -> NativeResult<u8> {
        let mut value = 0u8;
        status(unsafe { airspy_board_id_read(self.handle, &mut value) })?;
        Ok(value)
    }

    fn partid_serialno(&self) -> NativeResult<PartIdSerial> {
        let mut raw = AirspyReadPartIdSerialNo::default();
        status(unsafe { airspy_board_partid_serialno_read(self.handle, &mut raw) })?;
        Ok(PartIdSerial {
            part_id: raw.part_id,
            serial_no: raw.serial_no,
        })
    }

    fn sample_rates(&self) -> NativeResult<Vec<u32>> {
        let mut count = 0u32;
        status(unsafe { airspy_get_samplerates(self.handle, &mut count, 0) })?;

        let mut rates = vec![0u32; count as usize];
        if count > 0 {
            status(unsafe { airspy_get_samplerates(self.handle, rates.as_mut_ptr(), count) })?;
        }
        Ok(rates)
    }

    fn set_sample_type(&self, sample_type: SampleType) -> NativeResult<()> {
        status(unsafe { airspy_set_sample_type(self.handle, sample_type as c_int) })
    }

    fn set_samplerate(&self, rate: u32) -> NativeResult<()> {
        status(unsafe { airspy_set_samplerate(self.handle, rate) })
    }

    fn set_freq(&self, freq: u32) -> NativeResult<()> {
        status(unsafe { airspy_set_freq(self.handle, freq) })
    }

    fn set_lna_gain(&self, value: u8) -> NativeResult<()> {
        status(unsafe { airspy_set_lna_gain(self.handle, value) })
    }

    fn set_mixer_gain(&self, value: u8) -> NativeResult<()> {
        status(unsafe { airspy_set_mixer_gain(self.handle, value) })
    }

    fn set_vga_gain(&self, value: u8) -> NativeResult<()> {
        status(unsafe { airspy_set_vga_gain(self.handle, value) })
    }

    fn set_linearity_gain(&self, value: u8) -> NativeResult<()> {
        status(unsafe { airspy_set_linearity_gain(self.handle, value) })
    }

    fn set_sensitivity_gain(&self, value: u8) -> NativeResult<()> {
        status(unsafe { airspy_set_sensitivity_gain(self.handle, value) })
    }

    fn read_async(
        &self,
        armed: &dyn Fn(),
        sink: &mut dyn FnMut(&SdrTransfer<'_>),
    ) -> NativeResult<()> {
        let mut sink: Sink<'_> = sink;
        let ctx = &mut sink as *mut Sink<'_> as *mut c_void;

        // A wake-up left by a cancel that found rx stopped must not end this read
        while self.cancel_rx.try_recv().is_ok() {}

        status(unsafe { airspy_start_rx(self.handle, rx_callback, ctx) })?;
        armed();

        // `sink` must outlive the receive threads; airspy_stop_rx joins them
        // before cancel_async signals us
        let _ = self.cancel_rx.recv();
        Ok(())
    }

    fn cancel_async(&self) -> NativeResult<()> {
        status(unsafe { airspy_stop_rx(self.handle) })?;
        let _ = self.cancel_tx.try_send(());
        Ok(())
    }
}

impl Drop for NativeAirspyDevice {
    fn drop(&mut self) {
        unsafe {
            airspy_close(self.handle);
        }
    }
}
