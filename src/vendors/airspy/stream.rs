//! AirSpy stream with linearity/sensitivity and per-stage gains

use std::sync::Arc;

use tracing::{debug, info};

use super::driver::{board_id_name, AirspyDevice, AirspyDriver, SampleType};
use crate::error::{Error, NativeResultExt, Result};
use crate::host::HostType;
use crate::range::{Gain, MetaRange};
use crate::stream::{
    Acquisition, AcquisitionStats, DeviceInfo, GainMode, SampleFormat, SdrCallback,
    SdrTransfer, Stream,
};
use crate::vendors::serial_words;

const VENDOR: HostType = HostType::AirSpy;

/// Combined gain range used by both linearity and sensitivity modes
fn combined_gain_range() -> MetaRange {
    MetaRange::single(0.0, 21.0, 1.0)
}

/// LNA, MIX and IF (VGA) stages
fn stage_gain_range() -> MetaRange {
    MetaRange::single(0.0, 15.0, 1.0)
}

/// Validate `value` against `range` and convert to the register value
fn gain_register(stage: &str, range: &MetaRange, value: f64) -> Result<u8> {
    if !range.contains(value) {
        return Err(Error::invalid_argument(format!(
            "AirSpy {} gain {} outside {:?}..={:?}",
            stage,
            value,
            range.min(),
            range.max()
        )));
    }
    Ok(value as u8)
}

fn cancel(device: &Option<Arc<dyn AirspyDevice>>) -> Result<()> {
    match device {
        Some(device) => device.cancel_async().native(VENDOR, "airspy_stop_rx"),
        None => Ok(()),
    }
}

/// AirSpy stream over one board
pub struct AirspyStream {
    driver: Arc<dyn AirspyDriver>,
    device: Option<Arc<dyn AirspyDevice>>,
    serial: Option<u64>,
    format: SampleFormat,
    sample_rate: u32,
    center_frequency: u32,
    gain_mode: GainMode,
    gain: f64,
    lna_gain: f64,
    mix_gain: f64,
    if_gain: f64,
    acquisition: Acquisition,
}

impl AirspyStream {
    pub(crate) fn new(driver: Arc<dyn AirspyDriver>) -> Self {
        Self {
            driver,
            device: None,
            serial: None,
            format: SampleFormat::IqInt16,
            sample_rate: 0,
            center_frequency: 0,
            gain_mode: GainMode::Linearity,
            gain: 0.0,
            lna_gain: 0.0,
            mix_gain: 0.0,
            if_gain: 0.0,
            acquisition: Acquisition::new(VENDOR),
        }
    }

    fn device(&self) -> Result<&Arc<dyn AirspyDevice>> {
        self.device.as_ref().ok_or(Error::Uninitialized)
    }

    fn apply_sample_format(device: &dyn AirspyDevice, format: SampleFormat) -> Result<()> {
        let sample_type = match format {
            SampleFormat::IqInt16 => SampleType::Int16Iq,
            SampleFormat::IqFloat32 => SampleType::Float32Iq,
            SampleFormat::IqUint8 => {
                return Err(Error::invalid_argument(format!(
                    "AirSpy cannot deliver {}",
                    format
                )))
            }
        };
        device
            .set_sample_type(sample_type)
            .native(VENDOR, "airspy_set_sample_type")
    }

    pub fn set_lna_gain(&mut self, gain: f64) -> Result<()> {
        let value = gain_register("LNA", &stage_gain_range(), gain)?;
        self.device()?
            .set_lna_gain(value)
            .native(VENDOR, "airspy_set_lna_gain")?;
        self.lna_gain = f64::from(value);
        Ok(())
    }

    pub fn set_mix_gain(&mut self, gain: f64) -> Result<()> {
        let value = gain_register("MIX", &stage_gain_range(), gain)?;
        self.device()?
            .set_mixer_gain(value)
            .native(VENDOR, "airspy_set_mixer_gain")?;
        self.mix_gain = f64::from(value);
        Ok(())
    }

    pub fn set_if_gain(&mut self, gain: f64) -> Result<()> {
        let value = gain_register("IF", &stage_gain_range(), gain)?;
        self.device()?
            .set_vga_gain(value)
            .native(VENDOR, "airspy_set_vga_gain")?;
        self.if_gain = f64::from(value);
        Ok(())
    }
}

impl Stream for AirspyStream {
    fn host_type(&self) -> HostType {
        VENDOR
    }

    fn initialize(&mut self, index: u64) -> Result<()> {
        if let Some(current) = self.serial {
            if current == index {
                return Ok(());
            }
            return Err(Error::invalid_argument(format!(
                "stream already bound to AirSpy {:016X}",
                current
            )));
        }

        let device: Arc<dyn AirspyDevice> =
            Arc::from(self.driver.open(index).native(VENDOR, "airspy_open_sn")?);
        Self::apply_sample_format(device.as_ref(), SampleFormat::IqInt16)?;

        self.format = SampleFormat::IqInt16;
        self.device = Some(device);
        self.serial = Some(index);

        info!("AirSpy {:016X} initialized", index);
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.device.is_some()
    }

    fn usb_strings(&self) -> Result<DeviceInfo> {
        let device = self.device()?;
        let board = device
            .board_id()
            .native(VENDOR, "airspy_board_id_read")?;
        let part = device
            .partid_serialno()
            .native(VENDOR, "airspy_board_partid_serialno_read")?;

        let serial = serial_words(part.serial_no[2], part.serial_no[3]);
        Ok(DeviceInfo {
            name: format!("{} SN: {}", board_id_name(board), serial),
            serial,
        })
    }

    fn start(&mut self) -> Result<()> {
        let device = self.device()?.clone();
        self.acquisition.start(move |delivery| {
            device.read_async(&|| delivery.arm(), &mut |transfer: &SdrTransfer<'_>| {
                delivery.deliver(transfer)
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
            .set_samplerate(sample_rate)
            .native(VENDOR, "airspy_set_samplerate")?;
        debug!("AirSpy sample rate set to {} Hz", sample_rate);
        self.sample_rate = sample_rate;
        Ok(())
    }

    fn set_center_frequency(&mut self, freq: u32) -> Result<()> {
        self.device()?
            .set_freq(freq)
            .native(VENDOR, "airspy_set_freq")?;
        debug!("AirSpy center frequency set to {} Hz", freq);
        self.center_frequency = freq;
        Ok(())
    }

    fn set_sample_format(&mut self, format: SampleFormat) -> Result<()> {
        Self::apply_sample_format(self.device()?.as_ref(), format)?;
        debug!("AirSpy sample format set to {}", format);
        self.format = format;
        Ok(())
    }

    fn set_gain(&mut self, gain: f64) -> Result<()> {
        let value = gain_register("combined", &combined_gain_range(), gain)?;
        let device = self.device()?;
        match self.gain_mode {
            GainMode::Linearity => device
                .set_linearity_gain(value)
                .native(VENDOR, "airspy_set_linearity_gain")?,
            GainMode::Sensitivity => device
                .set_sensitivity_gain(value)
                .native(VENDOR, "airspy_set_sensitivity_gain")?,
            GainMode::Free => {
                return Err(Error::unsupported("AirSpy has no free gain mode"));
            }
        }
        debug!("AirSpy {} gain set to {}", self.gain_mode, value);
        self.gain = f64::from(value);
        Ok(())
    }

    fn set_stage_gain(&mut self, stage: &str, gain: f64) -> Result<()> {
        match stage {
            "LNA" => self.set_lna_gain(gain),
            "MIX" => self.set_mix_gain(gain),
            "IF" => self.set_if_gain(gain),
            "GAIN" => self.set_gain(gain),
            _ => Err(Error::invalid_argument(format!(
                "AirSpy has no gain stage '{}'",
                stage
            ))),
        }
    }

    fn set_gain_mode(&mut self, mode: GainMode) -> Result<()> {
        match mode {
            GainMode::Linearity | GainMode::Sensitivity => {
                self.gain_mode = mode;
                Ok(())
            }
            GainMode::Free => Err(Error::unsupported("AirSpy has no free gain mode")),
        }
    }

    fn sample_rates(&self) -> Vec<u32> {
        let Some(device) = self.device.as_ref() else {
            return Vec::new();
        };
        device.sample_rates().unwrap_or_else(|code| {
            debug!("airspy_get_samplerates failed with code {}", code);
            Vec::new()
        })
    }

    fn sample_formats(&self) -> Vec<SampleFormat> {
        vec![SampleFormat::IqInt16, SampleFormat::IqFloat32]
    }

    fn gain_modes(&self) -> Vec<GainMode> {
        vec![GainMode::Linearity, GainMode::Sensitivity]
    }

    fn gain_stage(&self) -> Gain {
        Gain::new("GAIN", combined_gain_range())
    }

    fn gain_stages(&self) -> Vec<Gain> {
        vec![
            Gain::new("LNA", stage_gain_range()),
            Gain::new("MIX", stage_gain_range()),
            Gain::new("IF", stage_gain_range()),
        ]
    }

    fn center_frequency(&self) -> u32 {
        self.center_frequency
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn sample_format(&self) -> SampleFormat {
        self.format
    }

    fn gain(&self) -> f64 {
        self.gain
    }

    fn stage_gain(&self, stage: &str) -> Option<f64> {
        match stage {
            "LNA" => Some(self.lna_gain),
            "MIX" => Some(self.mix_gain),
            "IF" => Some(self.if_gain),
            "GAIN" => Some(self.gain),
            _ => None,
        }
    }

    fn gain_mode(&self) -> GainMode {
        self.gain_mode
    }

    fn set_callback(&mut self, callback: SdrCallback) {
        self.acquisition.set_callback(callback);
    }

    fn stats(&self) -> AcquisitionStats {
        self.acquisition.stats()
    }
}

impl Drop for AirspyStream {
    fn drop(&mut self) {
        let device = self.device.clone();
        self.acquisition.shutdown(|| cancel(&device));
        if let Some(serial) = self.serial.take() {
            self.device = None;
            debug!("AirSpy {:016X} released", serial);
        }
    }
}
