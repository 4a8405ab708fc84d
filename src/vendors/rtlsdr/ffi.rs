//! librtlsdr bindings

use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_uchar, c_void};
use std::ptr;

use super::driver::{RtlSdrDevice, RtlSdrDriver, TunerType, UsbStrings};
use crate::error::NativeResult;

type RtlSdrDev = c_void;

type ReadAsyncCb = unsafe extern "C" fn(buf: *mut c_uchar, len: u32, ctx: *mut c_void);

extern "C" {
    fn rtlsdr_get_device_count() -> u32;
    fn rtlsdr_get_device_name(index: u32) -> *const c_char;
    fn rtlsdr_get_device_usb_strings(
        index: u32,
        manufact: *mut c_char,
        product: *mut c_char,
        serial: *mut c_char,
    ) -> c_int;
    fn rtlsdr_open(dev: *mut *mut RtlSdrDev, index: u32) -> c_int;
    fn rtlsdr_close(dev: *mut RtlSdrDev) -> c_int;
    fn rtlsdr_set_offset_tuning(dev: *mut RtlSdrDev, on: c_int) -> c_int;
    fn rtlsdr_reset_buffer(dev: *mut RtlSdrDev) -> c_int;
    fn rtlsdr_set_center_freq(dev: *mut RtlSdrDev, freq: u32) -> c_int;
    fn rtlsdr_set_sample_rate(dev: *mut RtlSdrDev, rate: u32) -> c_int;
    fn rtlsdr_get_tuner_type(dev: *mut RtlSdrDev) -> c_int;
    fn rtlsdr_get_tuner_gains(dev: *mut RtlSdrDev, gains: *mut c_int) -> c_int;
    fn rtlsdr_set_tuner_gain_mode(dev: *mut RtlSdrDev, manual: c_int) -> c_int;
    fn rtlsdr_set_tuner_gain(dev: *mut RtlSdrDev, gain: c_int) -> c_int;
    fn rtlsdr_set_tuner_if_gain(dev: *mut RtlSdrDev, stage: c_int, gain: c_int) -> c_int;
    fn rtlsdr_read_async(
        dev: *mut RtlSdrDev,
        cb: ReadAsyncCb,
        ctx: *mut c_void,
        buf_num: u32,
        buf_len: u32,
    ) -> c_int;
    fn rtlsdr_cancel_async(dev: *mut RtlSdrDev) -> c_int;
}

fn status(ret: c_int) -> NativeResult<()> {
    if ret == 0 {
        Ok(())
    } else {
        Err(ret)
    }
}

fn c_buffer_to_string(buf: &[c_char]) -> String {
    // SAFETY: librtlsdr NUL-terminates every string it writes into a 256-byte buffer
    unsafe { CStr::from_ptr(buf.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}

/// The system librtlsdr
pub struct NativeRtlSdr;

impl RtlSdrDriver for NativeRtlSdr {
    fn device_count(&self) -> u32 {
        unsafe { rtlsdr_get_device_count() }
    }

    fn device_name(&self, index: u32) -> String {
        let name = unsafe { rtlsdr_get_device_name(index) };
        if name.is_null() {
            return String::new();
        }
        unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned()
    }

    fn usb_strings(&self, index: u32) -> NativeResult<UsbStrings> {
        let mut manufacturer = [0 as c_char; 256];
        let mut product = [0 as c_char; 256];
        let mut serial = [0 as c_char; 256];

        status(unsafe {
            rtlsdr_get_device_usb_strings(
                index,
                manufacturer.as_mut_ptr(),
                product.as_mut_ptr(),
                serial.as_mut_ptr(),
            )
        })?;

        Ok(UsbStrings {
            manufacturer: c_buffer_to_string(&manufacturer),
            product: c_buffer_to_string(&product),
            serial: c_buffer_to_string(&serial),
        })
    }

    fn open(&self, index: u32) -> NativeResult<Box<dyn RtlSdrDevice>> {
        let mut dev: *mut RtlSdrDev = ptr::null_mut();
        status(unsafe { rtlsdr_open(&mut dev, index) })?;
        Ok(Box::new(NativeRtlSdrDevice(dev)))
    }
}

struct NativeRtlSdrDevice(*mut RtlSdrDev);

// librtlsdr allows cancel_async and the setters from a thread other than
// the one blocked in read_async
unsafe impl Send for NativeRtlSdrDevice {}
unsafe impl Sync for NativeRtlSdrDevice {}

/// Passed through librtlsdr as the callback context
struct ReadContext<'a> {
    armed: Option<&'a dyn Fn()>,
    sink: &'a mut dyn FnMut(&[u8]),
}

unsafe extern "C" fn read_async_wrapper(buf: *mut c_uchar, len: u32, ctx: *mut c_void) {
    let ctx = &mut *(ctx as *mut ReadContext<'_>);
    // The async status is RUNNING by the time any buffer is delivered
    if let Some(armed) = ctx.armed.take() {
        armed();
    }
    (ctx.sink)(std::slice::from_raw_parts(buf, len as usize));
}

impl RtlSdrDevice for NativeRtlSdrDevice {
    fn set_offset_tuning(&self, enable: bool) -> NativeResult<()> {
        status(unsafe { rtlsdr_set_offset_tuning(self.0, c_int::from(enable)) })
    }

    fn reset_buffer(&self) -> NativeResult<()> {
        status(unsafe { rtlsdr_reset_buffer(self.0) })
    }

    fn set_center_freq(&self, freq: u32) -> NativeResult<()> {
        status(unsafe { rtlsdr_set_center_freq(self.0, freq) })
    }

    fn set_sample_rate(&self, rate: u32) -> NativeResult<()> {
        status(unsafe { rtlsdr_set_sample_rate(self.0, rate) })
    }

    fn tuner_type(&self) -> TunerType {
        TunerType::from_raw(unsafe { rtlsdr_get_tuner_type(self.0) })
    }

    fn tuner_gains(&self) -> Vec<i32> {
        let count = unsafe { rtlsdr_get_tuner_gains(self.0, ptr::null_mut()) };
        if count <= 0 {
            return Vec::new();
        }

        let mut gains = vec![0 as c_int; count as usize];
        let written = unsafe { rtlsdr_get_tuner_gains(self.0, gains.as_mut_ptr()) };
        gains.truncate(written.max(0) as usize);
        gains
    }

    fn set_tuner_gain_mode(&self, manual: bool) -> NativeResult<()> {
        status(unsafe { rtlsdr_set_tuner_gain_mode(self.0, c_int::from(manual)) })
    }

    fn set_tuner_gain(&self, gain: i32) -> NativeResult<()> {
        status(unsafe { rtlsdr_set_tuner_gain(self.0, gain) })
    }

    fn set_tuner_if_gain(&self, stage: i32, gain: i32) -> NativeResult<()> {
        status(unsafe { rtlsdr_set_tuner_if_gain(self.0, stage, gain) })
    }

    fn read_async(
        &self,
        buffer_count: u32,
        buffer_length: u32,
        armed: &dyn Fn(),
        sink: &mut dyn FnMut(&[u8]),
    ) -> NativeResult<()> {
        let mut ctx = ReadContext {
            armed: Some(armed),
            sink,
        };
        let ctx = &mut ctx as *mut ReadContext<'_> as *mut c_void;
        status(unsafe {
            rtlsdr_read_async(self.0, read_async_wrapper, ctx, buffer_count, buffer_length)
        })
    }

    fn cancel_async(&self) -> NativeResult<()> {
        status(unsafe { rtlsdr_cancel_async(self.0) })
    }
}

impl Drop for NativeRtlSdrDevice {
    fn drop(&mut self) {
        unsafe {
            rtlsdr_close(self.0);
        }
    }
}
