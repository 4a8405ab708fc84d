//! AirSpy HF+ stream (float32 I/Q, HF attenuator)

use std::sync::Arc;

use tracing::{debug, info};

use super::driver::{AirspyHfDevice, AirspyHfDriver};
use super::BOARD_NAME;
use crate::error::{Error, NativeResultExt, Result};
use crate::host::HostType;
use crate::range::{Gain, MetaRange};
use crate::stream::{
    Acquisition, AcquisitionStats, DeviceInfo, GainMode, SampleFormat, SdrCallback,
    SdrTransfer, Stream,
};
use crate::vendors::serial_words;

const VENDOR: HostType = HostType::AirSpyHf;

/// The only format libairspyhf delivers
const NATIVE_FORMAT: SampleFormat = SampleFormat::IqFloat32;

fn attenuation_range() -> MetaRange {
    MetaRange::single(0.0, 8.0, 1.0)
}

fn cancel(device: &Option<Arc<dyn AirspyHfDevice>>) -> Result<()> {
    match device {
        Some(device) => device.cancel_async().native(VENDOR, "airspyhf_stop"),
        None => Ok(()),
    }
}

/// AirSpy HF+ stream over one receiver
pub struct AirspyHfStream {
    driver: Arc<dyn AirspyHfDriver>,
    device: Option<Arc<dyn AirspyHfDevice>>,
    serial: Option<u64>,
    sample_rate: u32,
    center_frequency: u32,
    attenuation: f64,
    acquisition: Acquisition,
}

impl AirspyHfStream {
    pub(crate) fn new(driver: Arc<dyn AirspyHfDriver>) -> Self {
        Self {
            driver,
            device: None,
            serial: None,
            sample_rate: 0,
            center_frequency: 0,
            attenuation: 0.0,
            acquisition: Acquisition::new(VENDOR),
        }
    }

    fn device(&self) -> Result<&Arc<dyn AirspyHfDevice>> {
        self.device.as_ref().ok_or(Error::Uninitialized)
    }

    /// Set the HF attenuator, in 6 dB steps from 0 to 8
    pub fn set_attenuation(&mut self, attenuation: f64) -> Result<()> {
        if !attenuation_range().contains(attenuation) {
            return Err(Error::invalid_argument(format!(
                "AirSpy HF+ attenuation {} outside 0..=8",
                attenuation
            )));
        }

        let value = attenuation as u8;
        self.device()?
            .set_hf_att(value)
            .native(VENDOR, "airspyhf_set_hf_att")?;
        debug!("AirSpy HF+ attenuation set to {}", value);
        self.attenuation = f64::from(value);
        Ok(())
    }
}

impl Stream for AirspyHfStream {
    fn host_type(&self) -> HostType {
        VENDOR
    }

    fn initialize(&mut self, index: u64) -> Result<()> {
        if let Some(current) = self.serial {
            if current == index {
                return Ok(());
            }
            return Err(Error::invalid_argument(format!(
                "stream already bound to AirSpy HF+ {:016X}",
                current
            )));
        }

        let device: Arc<dyn AirspyHfDevice> =
            Arc::from(self.driver.open(index).native(VENDOR, "airspyhf_open_sn")?);
        self.device = Some(device);
        self.serial = Some(index);

        info!("AirSpy HF+ {:016X} initialized", index);
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.device.is_some()
    }

    fn usb_strings(&self) -> Result<DeviceInfo> {
        let part = self
            .device()?
            .partid_serialno()
            .native(VENDOR, "airspyhf_board_partid_serialno_read")?;

        let serial = serial_words(part.serial_no[0], part.serial_no[1]);
        Ok(DeviceInfo {
            name: format!("{} SN: {}", BOARD_NAME, serial),
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
            .native(VENDOR, "airspyhf_set_samplerate")?;
        debug!("AirSpy HF+ sample rate set to {} Hz", sample_rate);
        self.sample_rate = sample_rate;
        Ok(())
    }

    fn set_center_frequency(&mut self, freq: u32) -> Result<()> {
        self.device()?
            .set_freq(freq)
            .native(VENDOR, "airspyhf_set_freq")?;
        debug!("AirSpy HF+ center frequency set to {} Hz", freq);
        self.center_frequency = freq;
        Ok(())
    }

    fn set_sample_format(&mut self, format: SampleFormat) -> Result<()> {
        self.device()?;
        if format != NATIVE_FORMAT {
            return Err(Error::unsupported(format!(
                "AirSpy HF+ only delivers {}",
                NATIVE_FORMAT
            )));
        }
        Ok(())
    }

    fn set_gain(&mut self, gain: f64) -> Result<()> {
        self.set_attenuation(gain)
    }

    fn set_stage_gain(&mut self, stage: &str, gain: f64) -> Result<()> {
        match stage {
            "ATT" => self.set_attenuation(gain),
            _ => Err(Error::invalid_argument(format!(
                "AirSpy HF+ has no gain stage '{}'",
                stage
            ))),
        }
    }

    fn set_gain_mode(&mut self, mode: GainMode) -> Result<()> {
        match mode {
            GainMode::Free => Ok(()),
            _ => Err(Error::unsupported(format!(
                "AirSpy HF+ has no {} gain mode",
                mode
            ))),
        }
    }

    fn sample_rates(&self) -> Vec<u32> {
        let Some(device) = self.device.as_ref() else {
            return Vec::new();
        };
        device.sample_rates().unwrap_or_else(|code| {
            debug!("airspyhf_get_samplerates failed with code {}", code);
            Vec::new()
        })
    }

    fn sample_formats(&self) -> Vec<SampleFormat> {
        vec![NATIVE_FORMAT]
    }

    fn gain_modes(&self) -> Vec<GainMode> {
        vec![GainMode::Free]
    }

    fn gain_stage(&self) -> Gain {
        Gain::new("ATT", attenuation_range())
    }

    fn gain_stages(&self) -> Vec<Gain> {
        vec![self.gain_stage()]
    }

    fn center_frequency(&self) -> u32 {
        self.center_frequency
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn sample_format(&self) -> SampleFormat {
        NATIVE_FORMAT
    }

    fn gain(&self) -> f64 {
        self.attenuation
    }

    fn stage_gain(&self, stage: &str) -> Option<f64> {
        match stage {
            "ATT" => Some(self.attenuation),
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

impl Drop for AirspyHfStream {
    fn drop(&mut self) {
        let device = self.device.clone();
        self.acquisition.shutdown(|| cancel(&device));
        if let Some(serial) = self.serial.take() {
            self.device = None;
            debug!("AirSpy HF+ {:016X} released", serial);
        }
    }
}
