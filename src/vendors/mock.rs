//! Scripted in-memory vendor drivers for unit tests
//!
//! Every native call is recorded as `name(args)` in a shared [`Script`],
//! which can also be told to fail a call by name. Asynchronous reads hand
//! out the unit's canned buffers, then block until `cancel_async`. As with
//! the vendor libraries, a cancel only reaches a read that is running.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::airspy::{self, AirspyDevice, AirspyDriver, SampleType};
use super::airspyhf::{self, AirspyHfDevice, AirspyHfDriver};
use super::rtlsdr::{RtlSdrDevice, RtlSdrDriver, TunerType, UsbStrings};
use crate::error::NativeResult;
use crate::stream::{Samples, SdrTransfer};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Native call log plus failure injection
#[derive(Default)]
pub(crate) struct Script {
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<String, i32>>,
}

impl Script {
    /// Log `name(args)`, then fail with the injected code if any
    pub fn record(&self, name: &str, args: String) -> NativeResult<()> {
        lock(&self.calls).push(format!("{}({})", name, args));
        match lock(&self.failures).get(name) {
            Some(&code) => Err(code),
            None => Ok(()),
        }
    }

    pub fn fail(&self, name: &str, code: i32) {
        lock(&self.failures).insert(name.to_string(), code);
    }

    pub fn clear_failures(&self) {
        lock(&self.failures).clear();
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    pub fn count(&self, name: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| call.split('(').next() == Some(name))
            .count()
    }

    pub fn contains(&self, call: &str) -> bool {
        lock(&self.calls).iter().any(|c| c == call)
    }
}

/// Blocks a mock read until a cancel issued while it runs
struct ReadGate {
    running: AtomicBool,
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl ReadGate {
    fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            running: AtomicBool::new(false),
            tx,
            rx,
        }
    }

    /// Sleep `delay` (USB transfer setup), then accept cancels
    fn open(&self, delay: Duration) {
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        while self.rx.try_recv().is_ok() {}
        self.running.store(true, Ordering::SeqCst);
    }

    fn wait(&self) {
        let _ = self.rx.recv();
    }

    /// False when no read is running; the cancel is not remembered
    fn cancel(&self) -> bool {
        if self.running.swap(false, Ordering::SeqCst) {
            let _ = self.tx.send(());
            true
        } else {
            false
        }
    }
}

/// librtlsdr `rtlsdr_cancel_async` result without a running read
const RTLSDR_NOT_RUNNING: i32 = -2;

// ---------------------------------------------------------------------------
// RTL-SDR
// ---------------------------------------------------------------------------

const R820T_GAINS: [i32; 29] = [
    0, 9, 14, 27, 37, 77, 87, 125, 144, 157, 166, 197, 207, 229, 254, 280, 297, 328, 338, 364, 372,
    386, 402, 421, 434, 439, 445, 480, 496,
];

const E4000_GAINS: [i32; 14] = [-10, 15, 40, 65, 90, 115, 140, 165, 190, 215, 240, 290, 340, 420];

#[derive(Clone)]
pub(crate) struct MockRtlUnit {
    pub serial: String,
    pub tuner: TunerType,
    pub gains: Vec<i32>,
    pub busy: bool,
    pub buffers: Vec<Vec<u8>>,
    /// Time `read_async` takes before it can be cancelled
    pub read_delay: Duration,
}

impl MockRtlUnit {
    pub fn r820t(serial: &str) -> Self {
        Self {
            serial: serial.to_string(),
            tuner: TunerType::R820T,
            gains: R820T_GAINS.to_vec(),
            busy: false,
            buffers: Vec::new(),
            read_delay: Duration::ZERO,
        }
    }

    pub fn e4000(serial: &str) -> Self {
        Self {
            tuner: TunerType::E4000,
            gains: E4000_GAINS.to_vec(),
            ..Self::r820t(serial)
        }
    }
}

pub(crate) struct MockRtlSdr {
    pub script: Arc<Script>,
    units: Mutex<Vec<MockRtlUnit>>,
}

impl MockRtlSdr {
    pub fn new(units: Vec<MockRtlUnit>) -> Self {
        Self {
            script: Arc::new(Script::default()),
            units: Mutex::new(units),
        }
    }

    pub fn unplug_all(&self) {
        lock(&self.units).clear();
    }

    fn unit(&self, index: u32) -> Option<MockRtlUnit> {
        lock(&self.units).get(index as usize).cloned()
    }
}

impl RtlSdrDriver for MockRtlSdr {
    fn device_count(&self) -> u32 {
        lock(&self.units).len() as u32
    }

    fn device_name(&self, index: u32) -> String {
        match self.unit(index) {
            Some(_) => "Generic RTL2832U OEM".to_string(),
            None => String::new(),
        }
    }

    fn usb_strings(&self, index: u32) -> NativeResult<UsbStrings> {
        self.script
            .record("rtlsdr_get_device_usb_strings", index.to_string())?;
        let unit = self.unit(index).ok_or(-1)?;
        Ok(UsbStrings {
            manufacturer: "Realtek".to_string(),
            product: "RTL2838UHIDIR".to_string(),
            serial: unit.serial,
        })
    }

    fn open(&self, index: u32) -> NativeResult<Box<dyn RtlSdrDevice>> {
        self.script.record("rtlsdr_open", index.to_string())?;
        let unit = self.unit(index).ok_or(-1)?;
        if unit.busy {
            return Err(-6);
        }
        Ok(Box::new(MockRtlDevice {
            script: self.script.clone(),
            unit,
            gate: ReadGate::new(),
        }))
    }
}

struct MockRtlDevice {
    script: Arc<Script>,
    unit: MockRtlUnit,
    gate: ReadGate,
}

impl RtlSdrDevice for MockRtlDevice {
    fn set_offset_tuning(&self, enable: bool) -> NativeResult<()> {
        self.script
            .record("rtlsdr_set_offset_tuning", (enable as i32).to_string())
    }

    fn reset_buffer(&self) -> NativeResult<()> {
        self.script.record("rtlsdr_reset_buffer", String::new())
    }

    fn set_center_freq(&self, freq: u32) -> NativeResult<()> {
        self.script.record("rtlsdr_set_center_freq", freq.to_string())
    }

    fn set_sample_rate(&self, rate: u32) -> NativeResult<()> {
        self.script.record("rtlsdr_set_sample_rate", rate.to_string())
    }

    fn tuner_type(&self) -> TunerType {
        self.unit.tuner
    }

    fn tuner_gains(&self) -> Vec<i32> {
        self.unit.gains.clone()
    }

    fn set_tuner_gain_mode(&self, manual: bool) -> NativeResult<()> {
        self.script
            .record("rtlsdr_set_tuner_gain_mode", (manual as i32).to_string())
    }

    fn set_tuner_gain(&self, gain: i32) -> NativeResult<()> {
        self.script.record("rtlsdr_set_tuner_gain", gain.to_string())
    }

    fn set_tuner_if_gain(&self, stage: i32, gain: i32) -> NativeResult<()> {
        self.script
            .record("rtlsdr_set_tuner_if_gain", format!("{}, {}", stage, gain))
    }

    fn read_async(
        &self,
        buffer_count: u32,
        buffer_length: u32,
        armed: &dyn Fn(),
        sink: &mut dyn FnMut(&[u8]),
    ) -> NativeResult<()> {
        self.script.record(
            "rtlsdr_read_async",
            format!("{}, {}", buffer_count, buffer_length),
        )?;
        self.gate.open(self.unit.read_delay);
        armed();
        for buf in &self.unit.buffers {
            sink(buf);
        }
        self.gate.wait();
        Ok(())
    }

    fn cancel_async(&self) -> NativeResult<()> {
        self.script.record("rtlsdr_cancel_async", String::new())?;
        if self.gate.cancel() {
            Ok(())
        } else {
            Err(RTLSDR_NOT_RUNNING)
        }
    }
}

impl Drop for MockRtlDevice {
    fn drop(&mut self) {
        let _ = self.script.record("rtlsdr_close", String::new());
    }
}

// ---------------------------------------------------------------------------
// AirSpy
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub(crate) struct MockAirspyUnit {
    pub serial: u64,
    pub board_id: u8,
    pub part_serial: airspy::PartIdSerial,
    pub busy: bool,
    pub sample_rates: Vec<u32>,
    /// Interleaved int16 I/Q buffers handed out by `read_async`
    pub buffers: Vec<Vec<i16>>,
    pub read_delay: Duration,
}

impl MockAirspyUnit {
    pub fn new(serial: u64) -> Self {
        Self {
            serial,
            board_id: 0,
            part_serial: airspy::PartIdSerial {
                part_id: [0x6906_002B, 0x0000_0030],
                serial_no: [0, 0, (serial >> 32) as u32, serial as u32],
            },
            busy: false,
            sample_rates: vec![10_000_000, 2_500_000],
            buffers: Vec::new(),
            read_delay: Duration::ZERO,
        }
    }
}

pub(crate) struct MockAirspy {
    pub script: Arc<Script>,
    units: Mutex<Vec<MockAirspyUnit>>,
}

impl MockAirspy {
    pub fn new(units: Vec<MockAirspyUnit>) -> Self {
        Self {
            script: Arc::new(Script::default()),
            units: Mutex::new(units),
        }
    }
}

impl AirspyDriver for MockAirspy {
    fn list_devices(&self, max: usize) -> NativeResult<Vec<u64>> {
        self.script.record("airspy_list_devices", max.to_string())?;
        Ok(lock(&self.units).iter().take(max).map(|u| u.serial).collect())
    }

    fn open(&self, serial: u64) -> NativeResult<Box<dyn AirspyDevice>> {
        self.script
            .record("airspy_open_sn", format!("{:016X}", serial))?;
        let unit = lock(&self.units)
            .iter()
            .find(|u| u.serial == serial)
            .cloned()
            .ok_or(-5)?;
        if unit.busy {
            return Err(-1000);
        }
        Ok(Box::new(MockAirspyDevice {
            script: self.script.clone(),
            unit,
            gate: ReadGate::new(),
        }))
    }
}

struct MockAirspyDevice {
    script: Arc<Script>,
    unit: MockAirspyUnit,
    gate: ReadGate,
}

impl AirspyDevice for MockAirspyDevice {
    fn board_id(&self) -> NativeResult<u8> {
        self.script.record("airspy_board_id_read", String::new())?;
        Ok(self.unit.board_id)
    }

    fn partid_serialno(&self) -> NativeResult<airspy::PartIdSerial> {
        self.script
            .record("airspy_board_partid_serialno_read", String::new())?;
        Ok(self.unit.part_serial)
    }

    fn sample_rates(&self) -> NativeResult<Vec<u32>> {
        self.script.record("airspy_get_samplerates", String::new())?;
        Ok(self.unit.sample_rates.clone())
    }

    fn set_sample_type(&self, sample_type: SampleType) -> NativeResult<()> {
        self.script
            .record("airspy_set_sample_type", (sample_type as i32).to_string())
    }

    fn set_samplerate(&self, rate: u32) -> NativeResult<()> {
        self.script.record("airspy_set_samplerate", rate.to_string())
    }

    fn set_freq(&self, freq: u32) -> NativeResult<()> {
        self.script.record("airspy_set_freq", freq.to_string())
    }

    fn set_lna_gain(&self, value: u8) -> NativeResult<()> {
        self.script.record("airspy_set_lna_gain", value.to_string())
    }

    fn set_mixer_gain(&self, value: u8) -> NativeResult<()> {
        self.script.record("airspy_set_mixer_gain", value.to_string())
    }

    fn set_vga_gain(&self, value: u8) -> NativeResult<()> {
        self.script.record("airspy_set_vga_gain", value.to_string())
    }

    fn set_linearity_gain(&self, value: u8) -> NativeResult<()> {
        self.script
            .record("airspy_set_linearity_gain", value.to_string())
    }

    fn set_sensitivity_gain(&self, value: u8) -> NativeResult<()> {
        self.script
            .record("airspy_set_sensitivity_gain", value.to_string())
    }

    fn read_async(
        &self,
        armed: &dyn Fn(),
        sink: &mut dyn FnMut(&SdrTransfer<'_>),
    ) -> NativeResult<()> {
        self.script.record("airspy_start_rx", String::new())?;
        self.gate.open(self.unit.read_delay);
        armed();
        for buf in &self.unit.buffers {
            sink(&SdrTransfer::new(Samples::I16(buf), buf.len() / 2, 0));
        }
        self.gate.wait();
        Ok(())
    }

    // airspy_stop_rx succeeds on an idle board
    fn cancel_async(&self) -> NativeResult<()> {
        self.script.record("airspy_stop_rx", String::new())?;
        self.gate.cancel();
        Ok(())
    }
}

impl Drop for MockAirspyDevice {
    fn drop(&mut self) {
        let _ = self.script.record("airspy_close", String::new());
    }
}

// ---------------------------------------------------------------------------
// AirSpy HF+
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub(crate) struct MockAirspyHfUnit {
    pub serial: u64,
    pub part_serial: airspyhf::PartIdSerial,
    pub busy: bool,
    pub sample_rates: Vec<u32>,
    /// Interleaved float32 I/Q buffers handed out by `read_async`
    pub buffers: Vec<Vec<f32>>,
    /// Reported as dropped before each buffer
    pub dropped_samples: u64,
    pub read_delay: Duration,
}

impl MockAirspyHfUnit {
    pub fn new(serial: u64) -> Self {
        Self {
            serial,
            part_serial: airspyhf::PartIdSerial {
                part_id: 0x0000_0002,
                serial_no: [(serial >> 32) as u32, serial as u32, 0, 0],
            },
            busy: false,
            sample_rates: vec![912_000, 768_000, 456_000, 384_000, 192_000],
            buffers: Vec::new(),
            dropped_samples: 0,
            read_delay: Duration::ZERO,
        }
    }
}

pub(crate) struct MockAirspyHf {
    pub script: Arc<Script>,
    units: Mutex<Vec<MockAirspyHfUnit>>,
}

impl MockAirspyHf {
    pub fn new(units: Vec<MockAirspyHfUnit>) -> Self {
        Self {
            script: Arc::new(Script::default()),
            units: Mutex::new(units),
        }
    }
}

impl AirspyHfDriver for MockAirspyHf {
    fn list_devices(&self) -> NativeResult<Vec<u64>> {
        self.script.record("airspyhf_list_devices", String::new())?;
        Ok(lock(&self.units).iter().map(|u| u.serial).collect())
    }

    fn open(&self, serial: u64) -> NativeResult<Box<dyn AirspyHfDevice>> {
        self.script
            .record("airspyhf_open_sn", format!("{:016X}", serial))?;
        let unit = lock(&self.units)
            .iter()
            .find(|u| u.serial == serial)
            .cloned()
            .ok_or(-1)?;
        if unit.busy {
            return Err(-1);
        }
        Ok(Box::new(MockAirspyHfDevice {
            script: self.script.clone(),
            unit,
            gate: ReadGate::new(),
        }))
    }
}

struct MockAirspyHfDevice {
    script: Arc<Script>,
    unit: MockAirspyHfUnit,
    gate: ReadGate,
}

impl AirspyHfDevice for MockAirspyHfDevice {
    fn partid_serialno(&self) -> NativeResult<airspyhf::PartIdSerial> {
        self.script
            .record("airspyhf_board_partid_serialno_read", String::new())?;
        Ok(self.unit.part_serial)
    }

    fn sample_rates(&self) -> NativeResult<Vec<u32>> {
        self.script.record("airspyhf_get_samplerates", String::new())?;
        Ok(self.unit.sample_rates.clone())
    }

    fn set_samplerate(&self, rate: u32) -> NativeResult<()> {
        self.script.record("airspyhf_set_samplerate", rate.to_string())
    }

    fn set_freq(&self, freq: u32) -> NativeResult<()> {
        self.script.record("airspyhf_set_freq", freq.to_string())
    }

    fn set_hf_att(&self, value: u8) -> NativeResult<()> {
        self.script.record("airspyhf_set_hf_att", value.to_string())
    }

    fn read_async(
        &self,
        armed: &dyn Fn(),
        sink: &mut dyn FnMut(&SdrTransfer<'_>),
    ) -> NativeResult<()> {
        self.script.record("airspyhf_start", String::new())?;
        self.gate.open(self.unit.read_delay);
        armed();
        for buf in &self.unit.buffers {
            sink(&SdrTransfer::new(
                Samples::F32(buf),
                buf.len() / 2,
                self.unit.dropped_samples,
            ));
        }
        self.gate.wait();
        Ok(())
    }

    fn cancel_async(&self) -> NativeResult<()> {
        self.script.record("airspyhf_stop", String::new())?;
        self.gate.cancel();
        Ok(())
    }
}

impl Drop for MockAirspyHfDevice {
    fn drop(&mut self) {
        let _ = self.script.record("airspyhf_close", String::new());
    }
}
