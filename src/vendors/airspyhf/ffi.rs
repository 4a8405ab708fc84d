//! libairspyhf bindings

use std::os::raw::{c_int, c_void};
use std::ptr;
use std::slice;

use crossbeam_channel::{bounded, Receiver, Sender};

use super::driver::{AirspyHfDevice, AirspyHfDriver, PartIdSerial};
use crate::error::NativeResult;
use crate::stream::{Samples, SdrTransfer};

const AIRSPYHF_SUCCESS: c_int = 0;

type AirspyHfDev = c_void;

#[repr(C)]
#[allow(dead_code)]
struct AirspyHfComplexFloat {
    re: f32,
    im: f32,
}

#[repr(C)]
#[allow(dead_code)]
struct AirspyHfTransfer {
    device: *mut AirspyHfDev,
    ctx: *mut c_void,
    samples: *mut AirspyHfComplexFloat,
    sample_count: c_int,
    dropped_samples: u64,
}

#[repr(C)]
#[derive(Default)]
struct AirspyHfReadPartIdSerialNo {
    part_id: u32,
    serial_no: [u32; 4],
}

type SampleBlockCb = unsafe extern "C" fn(transfer: *mut AirspyHfTransfer) -> c_int;

extern "C" {
    fn airspyhf_list_devices(serials: *mut u64, count: c_int) -> c_int;
    fn airspyhf_open_sn(device: *mut *mut AirspyHfDev, serial_number: u64) -> c_int;
    fn airspyhf_close(device: *mut AirspyHfDev) -> c_int;
    fn airspyhf_board_partid_serialno_read(
        device: *mut AirspyHfDev,
        read_partid_serialno: *mut AirspyHfReadPartIdSerialNo,
    ) -> c_int;
    fn airspyhf_get_samplerates(device: *mut AirspyHfDev, buffer: *mut u32, len: u32) -> c_int;
    fn airspyhf_set_samplerate(device: *mut AirspyHfDev, samplerate: u32) -> c_int;
    fn airspyhf_set_freq(device: *mut AirspyHfDev, freq_hz: u32) -> c_int;
    fn airspyhf_set_hf_att(device: *mut AirspyHfDev, value: u8) -> c_int;
    fn airspyhf_start(device: *mut AirspyHfDev, callback: SampleBlockCb, ctx: *mut c_void)
        -> c_int;
    fn airspyhf_stop(device: *mut AirspyHfDev) -> c_int;
}

fn status(ret: c_int) -> NativeResult<()> {
    if ret == AIRSPYHF_SUCCESS {
        Ok(())
    } else {
        Err(ret)
    }
}

/// The system libairspyhf
pub struct NativeAirspyHf;

impl AirspyHfDriver for NativeAirspyHf {
    fn list_devices(&self) -> NativeResult<Vec<u64>> {
        let count = unsafe { airspyhf_list_devices(ptr::null_mut(), 0) };
        if count <= 0 {
            return if count < 0 { Err(count) } else { Ok(Vec::new()) };
        }

        let mut serials = vec![0u64; count as usize];
        let listed = unsafe { airspyhf_list_devices(serials.as_mut_ptr(), count) };
        if listed < 0 {
            return Err(listed);
        }
        serials.truncate(listed as usize);
        Ok(serials)
    }

    fn open(&self, serial: u64) -> NativeResult<Box<dyn AirspyHfDevice>> {
        let mut dev: *mut AirspyHfDev = ptr::null_mut();
        status(unsafe { airspyhf_open_sn(&mut dev, serial) })?;

        let (cancel_tx, cancel_rx) = bounded(1);
        Ok(Box::new(NativeAirspyHfDevice {
            handle: dev,
            cancel_tx,
            cancel_rx,
        }))
    }
}

struct NativeAirspyHfDevice {
    handle: *mut AirspyHfDev,
    cancel_tx: Sender<()>,
    cancel_rx: Receiver<()>,
}

// libairspyhf owns its receive thread and tolerates control calls from others
unsafe impl Send for NativeAirspyHfDevice {}
unsafe impl Sync for NativeAirspyHfDevice {}

type Sink<'a> = &'a mut dyn FnMut(&SdrTransfer<'_>);

unsafe extern "C" fn rx_callback(transfer: *mut AirspyHfTransfer) -> c_int {
    let transfer = &*transfer;
    let sink = &mut *(transfer.ctx as *mut Sink<'_>);
    let count = transfer.sample_count.max(0) as usize;

    // Complex floats are laid out as interleaved re/im pairs
    let samples = slice::from_raw_parts(transfer.samples as *const f32, count * 2);
    sink(&SdrTransfer::new(
        Samples::F32(samples),
        count,
        transfer.dropped_samples,
    ));
    0
}

impl AirspyHfDevice for NativeAirspyHfDevice {
    fn partid_serialno(&self) -> NativeResult<PartIdSerial> {
        let mut raw = AirspyHfReadPartIdSerialNo::default();
        status(unsafe { airspyhf_board_partid_serialno_read(self.handle, &mut raw) })?;
        Ok(PartIdSerial {
            part_id: raw.part_id,
            serial_no: raw.serial_no,
        })
    }

    fn sample_rates(&self) -> NativeResult<Vec<u32>> {
        let mut count = 0u32;
        status(unsafe { airspyhf_get_samplerates(self.handle, &mut count, 0) })?;

        let mut rates = vec![0u32; count as usize];
        if count > 0 {
            status(unsafe { airspyhf_get_samplerates(self.handle, rates.as_mut_ptr(), count) })?;
        }
        Ok(rates)
    }

    fn set_samplerate(&self, rate: u32) -> NativeResult<()> {
        status(unsafe { airspyhf_set_samplerate(self.handle, rate) })
    }

    fn set_freq(&self, freq: u32) -> NativeResult<()> {
        status(unsafe { airspyhf_set_freq(self.handle, freq) })
    }

    fn set_hf_att(&self, value: u8) -> NativeResult<()> {
        status(unsafe { airspyhf_set_hf_att(self.handle, value) })
    }

    fn read_async(
        &self,
        armed: &dyn Fn(),
        sink: &mut dyn FnMut(&SdrTransfer<'_>),
    ) -> NativeResult<()> {
        let mut sink: Sink<'_> = sink;
        let ctx = &mut sink as *mut Sink<'_> as *mut c_void;

        // Drop a wake-up left by a cancel issued while nothing was running
        while self.cancel_rx.try_recv().is_ok() {}

        status(unsafe { airspyhf_start(self.handle, rx_callback, ctx) })?;
        armed();

        // Held until airspyhf_stop has joined the receive thread
        let _ = self.cancel_rx.recv();
        Ok(())
    }

    fn cancel_async(&self) -> NativeResult<()> {
        status(unsafe { airspyhf_stop(self.handle) })?;
        let _ = self.cancel_tx.try_send(());
        Ok(())
    }
}

impl Drop for NativeAirspyHfDevice {
    fn drop(&mut self) {
        unsafe {
            airspyhf_close(self.handle);
        }
    }
}
