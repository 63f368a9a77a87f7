use speech_capture_core::models::audio_models::AudioDevice;
use speech_capture_core::models::config::StreamConfig;
use speech_capture_core::models::error::CaptureError;
use speech_capture_core::traits::audio_backend::{AudioBackend, AudioStream, InputCallback, OutputCallback};

use crate::device_enumerator::{DeviceEnumerator, StreamPlan};
use crate::{cpal_input, cpal_output};

/// `AudioBackend` over a cpal host.
///
/// Holds only the host id; devices and streams are resolved per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpalBackend {
    enumerator: DeviceEnumerator,
}

impl CpalBackend {
    /// Backend for the platform's default host (WASAPI, CoreAudio, ALSA).
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend for a specific host, e.g. ASIO on Windows.
    pub fn with_host(host_id: cpal::HostId) -> Self {
        Self {
            enumerator: DeviceEnumerator::with_host(host_id),
        }
    }

    fn plan(&self, config: &StreamConfig) -> Result<StreamPlan, CaptureError> {
        self.enumerator.plan(config).ok_or_else(|| {
            CaptureError::UnsupportedFormat(format!(
                "'{}' cannot open {:?} at {} Hz with {} channel(s)",
                config.device.name, config.direction, config.sample_rate, config.channel_count
            ))
        })
    }
}

impl AudioBackend for CpalBackend {
    fn devices(&self) -> Result<Vec<AudioDevice>, CaptureError> {
        self.enumerator.list_devices()
    }

    fn default_output_device(&self) -> Result<AudioDevice, CaptureError> {
        self.enumerator.default_output()
    }

    fn is_format_supported(&self, config: &StreamConfig) -> bool {
        self.enumerator.plan(config).is_some()
    }

    fn open_input(
        &self,
        config: &StreamConfig,
        callback: InputCallback,
    ) -> Result<Box<dyn AudioStream>, CaptureError> {
        let plan = self.plan(config)?;
        log::debug!(
            "Opening cpal input on '{}' as {:?}, buffer {:?}",
            config.device.name,
            plan.format,
            plan.buffer_size
        );
        Ok(Box::new(cpal_input::open(self.enumerator, config, plan, callback)?))
    }

    fn open_output(
        &self,
        config: &StreamConfig,
        callback: OutputCallback,
    ) -> Result<Box<dyn AudioStream>, CaptureError> {
        let plan = self.plan(config)?;
        log::debug!(
            "Opening cpal output on '{}' as {:?}, buffer {:?}",
            config.device.name,
            plan.format,
            plan.buffer_size
        );
        Ok(Box::new(cpal_output::open(self.enumerator, config, plan, callback)?))
    }
}
