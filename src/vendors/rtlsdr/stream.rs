//! RTL-SDR stream: tuning, gain stages and u8/i16 acquisition

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use super::driver::{RtlSdrDevice, RtlSdrDriver, TunerType, OFFSET_TUNING_UNSUPPORTED};
use super::if_gain::{self, E4000_IF_STAGES};
use crate::convert::Uint8ToInt16;
use crate::error::{Error, NativeResultExt, Result};
use crate::host::HostType;
use crate::range::{Gain, MetaRange, Range};
use crate::stream::{
    Acquisition, AcquisitionStats, DeviceInfo, GainMode, SampleFormat, Samples, SdrCallback,
    SdrTransfer, Stream,
};
use crate::vendors::sanitize;

const VENDOR: HostType = HostType::RtlSdr;

/// Sample rates known to work with the RTL2832U
pub const SAMPLE_RATES: [u32; 13] = [
    250_000, 1_000_000, 1_024_000, 1_800_000, 1_920_000, 2_000_000, 2_048_000, 2_400_000,
    2_560_000, 2_600_000, 2_800_000, 3_000_000, 3_200_000,
];

/// Composite IF gain exposed for the E4000, in dB
const IF_GAIN_RANGE: Range = Range {
    start: 3.0,
    stop: 56.0,
    step: 1.0,
};

fn tenths(db: f64) -> i32 {
    (db * 10.0).round() as i32
}

fn cancel(device: &Option<Arc<dyn RtlSdrDevice>>) -> Result<()> {
    match device {
        Some(device) => device
            .cancel_async()
            .native(VENDOR, "rtlsdr_cancel_async"),
        None => Ok(()),
    }
}

/// RTL-SDR stream over one dongle
pub struct RtlSdrStream {
    driver: Arc<dyn RtlSdrDriver>,
    buffer_count: u32,
    buffer_length: u32,
    device: Option<Arc<dyn RtlSdrDevice>>,
    index: Option<u32>,
    tuner: TunerType,
    /// Tuner gains in tenths of dB, read once at initialize
    tuner_gains: Vec<i32>,
    /// Read by the acquisition thread on every buffer
    format: Arc<AtomicU8>,
    sample_rate: u32,
    center_frequency: u32,
    gain: f64,
    if_gain: f64,
    acquisition: Acquisition,
}

impl RtlSdrStream {
    pub(crate) fn new(driver: Arc<dyn RtlSdrDriver>, buffer_count: u32, buffer_length: u32) -> Self {
        Self {
            driver,
            buffer_count,
            buffer_length,
            device: None,
            index: None,
            tuner: TunerType::Unknown,
            tuner_gains: Vec::new(),
            format: Arc::new(AtomicU8::new(SampleFormat::IqUint8 as u8)),
            sample_rate: 0,
            center_frequency: 0,
            gain: 0.0,
            if_gain: 0.0,
            acquisition: Acquisition::new(VENDOR),
        }
    }

    fn device(&self) -> Result<&Arc<dyn RtlSdrDevice>> {
        self.device.as_ref().ok_or(Error::Uninitialized)
    }

    /// Tuner chip of the open dongle (`Unknown` before initialize)
    pub fn tuner_type(&self) -> TunerType {
        self.tuner
    }

    /// Spread `gain` dB across the E4000 IF stages.
    ///
    /// Stages are written in order 1..=6 and the first failure aborts the
    /// rest, leaving earlier stages applied. Other tuners have no IF
    /// control: the call succeeds without touching the hardware.
    pub fn set_if_gain(&mut self, gain: f64) -> Result<()> {
        let device = self.device()?;
        if self.tuner != TunerType::E4000 {
            debug!("{:?} tuner has no IF gain stages, ignoring {} dB", self.tuner, gain);
            return Ok(());
        }

        let stages = if_gain::distribute(&E4000_IF_STAGES, gain);
        for (stage, value) in (1..).zip(stages.iter()) {
            device
                .set_tuner_if_gain(stage, tenths(*value))
                .native(VENDOR, "rtlsdr_set_tuner_if_gain")?;
        }

        debug!("IF gain {} dB applied as {:?}", gain, stages);
        self.if_gain = gain;
        Ok(())
    }
}

impl Stream for RtlSdrStream {
    fn host_type(&self) -> HostType {
        VENDOR
    }

    fn initialize(&mut self, index: u64) -> Result<()> {
        if let Some(current) = self.index {
            if u64::from(current) == index {
                return Ok(());
            }
            return Err(Error::invalid_argument(format!(
                "stream already bound to RTL-SDR #{}",
                current
            )));
        }

        let key = u32::try_from(index)
            .map_err(|_| Error::invalid_argument(format!("RTL-SDR index {} out of range", index)))?;
        if key >= self.driver.device_count() {
            return Err(Error::device_not_found(format!("no RTL-SDR at index {}", key)));
        }

        let device: Arc<dyn RtlSdrDevice> =
            Arc::from(self.driver.open(key).native(VENDOR, "rtlsdr_open")?);

        match device.set_offset_tuning(true) {
            Ok(()) => {}
            Err(OFFSET_TUNING_UNSUPPORTED) => {
                debug!("RTL-SDR #{} tuner does not support offset tuning", key)
            }
            Err(code) => return Err(Error::native(VENDOR, "rtlsdr_set_offset_tuning", code)),
        }
        device
            .reset_buffer()
            .native(VENDOR, "rtlsdr_reset_buffer")?;

        self.tuner = device.tuner_type();
        self.tuner_gains = device.tuner_gains();
        self.device = Some(device);
        self.index = Some(key);

        info!("RTL-SDR #{} initialized ({:?} tuner)", key, self.tuner);
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.device.is_some()
    }

    fn usb_strings(&self) -> Result<DeviceInfo> {
        let index = self.index.ok_or(Error::Uninitialized)?;
        let strings = self
            .driver
            .usb_strings(index)
            .native(VENDOR, "rtlsdr_get_device_usb_strings")?;

        let serial = sanitize(&strings.serial);
        Ok(DeviceInfo {
            name: format!(
                "{} {} SN: {}",
                sanitize(&strings.manufacturer),
                sanitize(&strings.product),
                serial
            ),
            serial,
        })
    }

    fn start(&mut self) -> Result<()> {
        let device = self.device()?.clone();
        let format = self.format.clone();
        let (buffer_count, buffer_length) = (self.buffer_count, self.buffer_length);

        self.acquisition.start(move |delivery| {
            let converter = Uint8ToInt16::new();
            let mut converted: Vec<i16> = Vec::new();

            let armed = || delivery.arm();
            device.read_async(buffer_count, buffer_length, &armed, &mut |buf: &[u8]| {
                match SampleFormat::from_u8(format.load(Ordering::Relaxed)) {
                    Some(SampleFormat::IqInt16) => {
                        converted.resize(buf.len(), 0);
                        let count = converter.process(buf, &mut converted);
                        let samples = Samples::I16(&converted[..count]);
                        delivery.deliver(&SdrTransfer::new(samples, count, 0));
                    }
                    _ => delivery.deliver(&SdrTransfer::new(Samples::U8(buf), buf.len(), 0)),
                }
            })
        })
    }

    fn stop(&mut self) -> Result<()> {
        let device = self.device.clone();
        self.acquisition.stop(|| cancel(&device))
    }

    fn is_streaming(&self) -> bool {
        self.acquisition.is_streaming()
    }

    fn set_sample_rate(&mut self, sample_rate: u32) -> Result<()> {
        self.device()?
            .set_sample_rate(sample_rate)
            .native(VENDOR, "rtlsdr_set_sample_rate")?;
        debug!("RTL-SDR sample rate set to {} Hz", sample_rate);
        self.sample_rate = sample_rate;
        Ok(())
    }

    fn set_center_frequency(&mut self, freq: u32) -> Result<()> {
        self.device()?
            .set_center_freq(freq)
            .native(VENDOR, "rtlsdr_set_center_freq")?;
        debug!("RTL-SDR center frequency set to {} Hz", freq);
        self.center_frequency = freq;
        Ok(())
    }

    fn set_sample_format(&mut self, format: SampleFormat) -> Result<()> {
        self.device()?;
        match format {
            SampleFormat::IqUint8 | SampleFormat::IqInt16 => {
                self.format.store(format as u8, Ordering::Relaxed);
                debug!("RTL-SDR sample format set to {}", format);
                Ok(())
            }
            SampleFormat::IqFloat32 => Err(Error::unsupported(format!(
                "RTL-SDR cannot deliver {}",
                format
            ))),
        }
    }

    fn set_gain(&mut self, gain: f64) -> Result<()> {
        let device = self.device()?;
        device
            .set_tuner_gain_mode(true)
            .native(VENDOR, "rtlsdr_set_tuner_gain_mode")?;
        device
            .set_tuner_gain(tenths(gain))
            .native(VENDOR, "rtlsdr_set_tuner_gain")?;
        debug!("RTL-SDR tuner gain set to {} dB", gain);
        self.gain = gain;
        Ok(())
    }

    fn set_stage_gain(&mut self, stage: &str, gain: f64) -> Result<()> {
        match stage {
            "LNA" => self.set_gain(gain),
            "IF" => self.set_if_gain(gain),
            _ => Err(Error::invalid_argument(format!(
                "RTL-SDR has no gain stage '{}'",
                stage
            ))),
        }
    }

    fn set_gain_mode(&mut self, mode: GainMode) -> Result<()> {
        match mode {
            GainMode::Free => Ok(()),
            _ => Err(Error::unsupported(format!("RTL-SDR has no {} gain mode", mode))),
        }
    }

    fn sample_rates(&self) -> Vec<u32> {
        SAMPLE_RATES.to_vec()
    }

    fn sample_formats(&self) -> Vec<SampleFormat> {
        vec![SampleFormat::IqUint8, SampleFormat::IqInt16]
    }

    fn gain_modes(&self) -> Vec<GainMode> {
        vec![GainMode::Free]
    }

    fn gain_stage(&self) -> Gain {
        let range = self
            .tuner_gains
            .iter()
            .map(|&g| Range::fixed(f64::from(g) / 10.0))
            .collect::<MetaRange>();
        Gain::new("LNA", range)
    }

    fn gain_stages(&self) -> Vec<Gain> {
        let mut stages = Vec::with_capacity(2);
        if self.tuner == TunerType::E4000 {
            stages.push(Gain::new("IF", IF_GAIN_RANGE.into()));
        }
        stages.push(self.gain_stage());
        stages
    }

    fn center_frequency(&self) -> u32 {
        self.center_frequency
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn sample_format(&self) -> SampleFormat {
        SampleFormat::from_u8(self.format.load(Ordering::Relaxed)).unwrap_or(SampleFormat::IqUint8)
    }

    fn gain(&self) -> f64 {
        self.gain
    }

    fn stage_gain(&self, stage: &str) -> Option<f64> {
        match stage {
            "LNA" => Some(self.gain),
            "IF" if self.tuner == TunerType::E4000 => Some(self.if_gain),
            _ => None,
        }
    }

    fn gain_mode(&self) -> GainMode {
        GainMode::Free
    }

    fn set_callback(&mut self, callback: SdrCallback) {
        self.acquisition.set_callback(callback);
    }

    fn stats(&self) -> AcquisitionStats {
        self.acquisition.stats()
    }
}

impl Drop for RtlSdrStream {
    fn drop(&mut self) {
        let device = self.device.clone();
        self.acquisition.shutdown(|| cancel(&device));
        if let Some(index) = self.index.take() {
            self.device = None;
            debug!("RTL-SDR #{} released", index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vendors::mock::{MockRtlSdr, MockRtlUnit, Script};
    use crossbeam_channel::unbounded;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;

    fn open(units: Vec<MockRtlUnit>) -> (RtlSdrStream, Arc<Script>) {
        let driver = MockRtlSdr::new(units);
        let script = driver.script.clone();
        let mut stream = RtlSdrStream::new(Arc::new(driver), 4, 512);
        stream.initialize(0).unwrap();
        (stream, script)
    }

    #[test]
    fn test_setters_require_initialize() {
        let driver = MockRtlSdr::new(vec![MockRtlUnit::r820t("00000001")]);
        let mut stream = RtlSdrStream::new(Arc::new(driver), 4, 512);

        assert!(matches!(stream.set_sample_rate(2_048_000), Err(Error::Uninitialized)));
        assert!(matches!(stream.set_center_frequency(100_000_000), Err(Error::Uninitialized)));
        assert!(matches!(stream.set_gain(20.0), Err(Error::Uninitialized)));
        assert!(matches!(stream.set_if_gain(20.0), Err(Error::Uninitialized)));
        assert!(matches!(stream.start(), Err(Error::Uninitialized)));
        assert!(stream.stop().is_ok());
    }

    #[test]
    fn test_initialize_is_idempotent_per_index() {
        let (mut stream, script) = open(vec![
            MockRtlUnit::r820t("00000001"),
            MockRtlUnit::r820t("00000002"),
        ]);

        assert!(stream.initialize(0).is_ok());
        assert_eq!(script.count("rtlsdr_open"), 1);
        assert!(matches!(stream.initialize(1), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_initialize_unknown_index() {
        let driver = MockRtlSdr::new(vec![MockRtlUnit::r820t("00000001")]);
        let mut stream = RtlSdrStream::new(Arc::new(driver), 4, 512);

        assert!(matches!(stream.initialize(3), Err(Error::DeviceNotFound(_))));
        assert!(matches!(
            stream.initialize(u64::MAX),
            Err(Error::InvalidArgument(_))
        ));
        assert!(!stream.is_initialized());
    }

    #[test]
    fn test_setters_cache_values() {
        let (mut stream, script) = open(vec![MockRtlUnit::r820t("00000001")]);

        stream.set_sample_rate(2_048_000).unwrap();
        stream.set_center_frequency(1_090_000_000).unwrap();
        stream.set_gain(49.6).unwrap();

        assert_eq!(stream.sample_rate(), 2_048_000);
        assert_eq!(stream.center_frequency(), 1_090_000_000);
        assert_eq!(stream.gain(), 49.6);
        assert_eq!(stream.stage_gain("LNA"), Some(49.6));
        assert!(script.contains("rtlsdr_set_tuner_gain_mode(1)"));
        assert!(script.contains("rtlsdr_set_tuner_gain(496)"));
    }

    #[test]
    fn test_failed_setter_keeps_cached_value() {
        let (mut stream, script) = open(vec![MockRtlUnit::r820t("00000001")]);
        stream.set_center_frequency(100_000_000).unwrap();

        script.fail("rtlsdr_set_center_freq", -1);
        let err = stream.set_center_frequency(200_000_000).unwrap_err();
        assert_eq!(err.native_code(), Some(-1));
        assert_eq!(stream.center_frequency(), 100_000_000);
    }

    #[test]
    fn test_if_gain_is_noop_without_e4000() {
        let (mut stream, script) = open(vec![MockRtlUnit::r820t("00000001")]);

        assert!(stream.set_if_gain(30.0).is_ok());
        assert_eq!(script.count("rtlsdr_set_tuner_if_gain"), 0);
        assert_eq!(stream.gain_stages().len(), 1);
        assert_eq!(stream.stage_gain("IF"), None);
    }

    #[test]
    fn test_if_gain_applies_stages_in_order() {
        let (mut stream, script) = open(vec![MockRtlUnit::e4000("00000001")]);

        stream.set_stage_gain("IF", 30.0).unwrap();

        let calls: Vec<String> = script
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("rtlsdr_set_tuner_if_gain"))
            .collect();
        assert_eq!(
            calls,
            vec![
                "rtlsdr_set_tuner_if_gain(1, -30)",
                "rtlsdr_set_tuner_if_gain(2, 0)",
                "rtlsdr_set_tuner_if_gain(3, 0)",
                "rtlsdr_set_tuner_if_gain(4, 20)",
                "rtlsdr_set_tuner_if_gain(5, 150)",
                "rtlsdr_set_tuner_if_gain(6, 150)",
            ]
        );
        assert_eq!(stream.stage_gain("IF"), Some(30.0));
    }

    #[test]
    fn test_if_gain_aborts_on_first_failure() {
        let (mut stream, script) = open(vec![MockRtlUnit::e4000("00000001")]);
        script.fail("rtlsdr_set_tuner_if_gain", -7);

        let err = stream.set_if_gain(30.0).unwrap_err();
        assert_eq!(err.native_code(), Some(-7));
        assert_eq!(script.count("rtlsdr_set_tuner_if_gain"), 1);
        assert_eq!(stream.stage_gain("IF"), Some(0.0));
    }

    #[test]
    fn test_gain_stages_e4000() {
        let (stream, _) = open(vec![MockRtlUnit::e4000("00000001")]);
        let stages = stream.gain_stages();

        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0].stage, "IF");
        assert_eq!(stages[0].range.min(), Some(3.0));
        assert_eq!(stages[0].range.max(), Some(56.0));
        assert_eq!(stages[1].stage, "LNA");
    }

    #[test]
    fn test_lna_stage_lists_tuner_gains_in_db() {
        let (stream, _) = open(vec![MockRtlUnit::r820t("00000001")]);
        let lna = stream.gain_stage();

        assert_eq!(lna.stage, "LNA");
        assert_eq!(lna.range.min(), Some(0.0));
        assert_eq!(lna.range.max(), Some(49.6));
        assert!(lna.range.values().contains(&0.9));
    }

    #[test]
    fn test_unknown_stage_is_rejected() {
        let (mut stream, _) = open(vec![MockRtlUnit::r820t("00000001")]);
        assert!(matches!(
            stream.set_stage_gain("MIX", 3.0),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(stream.stage_gain("MIX"), None);
    }

    #[test]
    fn test_formats_and_modes() {
        let (mut stream, _) = open(vec![MockRtlUnit::r820t("00000001")]);

        assert_eq!(stream.sample_format(), SampleFormat::IqUint8);
        stream.set_sample_format(SampleFormat::IqInt16).unwrap();
        assert_eq!(stream.sample_format(), SampleFormat::IqInt16);
        assert!(matches!(
            stream.set_sample_format(SampleFormat::IqFloat32),
            Err(Error::Unsupported(_))
        ));

        assert_eq!(stream.gain_modes(), vec![GainMode::Free]);
        assert!(stream.set_gain_mode(GainMode::Free).is_ok());
        assert!(stream.set_gain_mode(GainMode::Linearity).is_err());
        assert_eq!(stream.sample_rates().first(), Some(&250_000));
    }

    #[test]
    fn test_usb_strings() {
        let (stream, _) = open(vec![MockRtlUnit::r820t("00000042")]);
        let info = stream.usb_strings().unwrap();
        assert_eq!(info.serial, "00000042");
        assert_eq!(info.name, "Realtek RTL2838UHIDIR SN: 00000042");
    }

    #[test]
    fn test_streams_raw_bytes() {
        let mut unit = MockRtlUnit::r820t("00000001");
        unit.buffers = vec![vec![127, 128, 0, 255], vec![1, 2]];
        let (mut stream, _) = open(vec![unit]);

        let (tx, rx) = unbounded();
        stream.set_callback(Box::new(move |t: &SdrTransfer<'_>| {
            if let Samples::U8(bytes) = t.samples {
                tx.send((bytes.to_vec(), t.frame_size)).unwrap();
            }
        }));
        stream.start().unwrap();
        assert!(stream.is_streaming());

        let first = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let second = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(first, (vec![127, 128, 0, 255], 4));
        assert_eq!(second, (vec![1, 2], 2));

        stream.stop().unwrap();
        assert!(!stream.is_streaming());
        assert_eq!(stream.stats().buffers, 2);
        assert_eq!(stream.stats().samples, 6);
    }

    #[test]
    fn test_streams_converted_int16() {
        let mut unit = MockRtlUnit::r820t("00000001");
        unit.buffers = vec![vec![127, 128, 0, 255]];
        let (mut stream, _) = open(vec![unit]);
        stream.set_sample_format(SampleFormat::IqInt16).unwrap();

        let (tx, rx) = unbounded();
        stream.set_callback(Box::new(move |t: &SdrTransfer<'_>| {
            if let Samples::I16(values) = t.samples {
                tx.send((values.to_vec(), t.frame_size)).unwrap();
            }
        }));
        stream.start().unwrap();

        let (values, frame_size) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(values, vec![0, 64, -8128, 8192]);
        assert_eq!(frame_size, 4);
        stream.stop().unwrap();
    }

    #[test]
    fn test_start_twice_reads_once() {
        let (mut stream, script) = open(vec![MockRtlUnit::r820t("00000001")]);

        stream.start().unwrap();
        stream.start().unwrap();
        stream.stop().unwrap();
        stream.stop().unwrap();

        assert_eq!(script.count("rtlsdr_read_async"), 1);
        assert_eq!(script.count("rtlsdr_cancel_async"), 1);
    }

    #[test]
    fn test_failed_read_ends_streaming() {
        let (mut stream, script) = open(vec![MockRtlUnit::r820t("00000001")]);
        script.fail("rtlsdr_read_async", -1);

        stream.start().unwrap();
        for _ in 0..500 {
            if !stream.is_streaming() {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert!(!stream.is_streaming());

        script.clear_failures();
        stream.start().unwrap();
        assert!(stream.is_streaming());
        stream.stop().unwrap();
    }

    #[test]
    fn test_drop_stops_and_closes() {
        let (mut stream, script) = open(vec![MockRtlUnit::r820t("00000001")]);
        stream.start().unwrap();

        drop(stream);

        assert_eq!(script.count("rtlsdr_cancel_async"), 1);
        assert_eq!(script.count("rtlsdr_close"), 1);
    }

    fn counting_callback(stream: &mut dyn Stream) -> Arc<AtomicUsize> {
        let delivered = Arc::new(AtomicUsize::new(0));
        let counter = delivered.clone();
        stream.set_callback(Box::new(move |_: &SdrTransfer<'_>| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        delivered
    }

    #[test]
    fn test_stop_right_after_start() {
        let mut unit = MockRtlUnit::r820t("00000001");
        unit.buffers = vec![vec![127, 128, 0, 255]; 3];
        unit.read_delay = Duration::from_millis(50);
        let (mut stream, script) = open(vec![unit]);
        let delivered = counting_callback(&mut stream);

        stream.start().unwrap();
        stream.stop().unwrap();

        assert!(!stream.is_streaming());
        assert_eq!(script.count("rtlsdr_cancel_async"), 1);
        assert_eq!(delivered.load(Ordering::SeqCst), 3);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(delivered.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_drop_right_after_start() {
        let mut unit = MockRtlUnit::r820t("00000001");
        unit.buffers = vec![vec![127, 128, 0, 255]; 2];
        unit.read_delay = Duration::from_millis(50);
        let (mut stream, script) = open(vec![unit]);
        let delivered = counting_callback(&mut stream);

        stream.start().unwrap();
        drop(stream);

        assert_eq!(script.count("rtlsdr_cancel_async"), 1);
        assert_eq!(script.count("rtlsdr_close"), 1);
        assert_eq!(delivered.load(Ordering::SeqCst), 2);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(delivered.load(Ordering::SeqCst), 2);
    }
}
