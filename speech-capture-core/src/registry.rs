//! Name-based device lookup on top of an `AudioBackend`.

use crate::models::audio_models::AudioDevice;
use crate::models::error::CaptureError;
use crate::traits::audio_backend::AudioBackend;

/// Resolves configured device names to enumerated devices.
pub struct DeviceRegistry<'a, B: AudioBackend + ?Sized> {
    backend: &'a B,
}

impl<'a, B: AudioBackend + ?Sized> DeviceRegistry<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// All devices, logged at debug level.
    pub fn list(&self) -> Result<Vec<AudioDevice>, CaptureError> {
        let devices = self.backend.devices()?;
        for device in &devices {
            log::debug!(
                "Device {}: '{}' in={} out={} rate={}",
                device.index,
                device.name,
                device.max_input_channels,
                device.max_output_channels,
                device.default_sample_rate
            );
        }
        Ok(devices)
    }

    /// First device whose name matches `name` exactly.
    pub fn resolve(&self, name: &str) -> Result<AudioDevice, CaptureError> {
        let device = self
            .list()?
            .into_iter()
            .find(|d| d.name == name)
            .ok_or_else(|| CaptureError::DeviceNotFound(name.to_string()))?;
        log::info!("Found device {}: '{}'", device.index, device.name);
        Ok(device)
    }

    /// Named playback device, or the host default when `name` is `None`.
    pub fn resolve_output(&self, name: Option<&str>) -> Result<AudioDevice, CaptureError> {
        match name {
            Some(name) => self.resolve(name),
            None => self.backend.default_output_device(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::fake::FakeBackend;

    #[test]
    fn resolves_exact_name() {
        let backend = FakeBackend::new();
        let device = DeviceRegistry::new(&backend).resolve("Fake Interface").unwrap();
        assert_eq!(device.index, 0);
        assert_eq!(device.max_input_channels, 4);
    }

    #[test]
    fn partial_name_is_not_a_match() {
        let backend = FakeBackend::new();
        let err = DeviceRegistry::new(&backend).resolve("Fake").unwrap_err();
        assert_eq!(err, CaptureError::DeviceNotFound("Fake".into()));
    }

    #[test]
    fn output_defaults_to_host_default() {
        let backend = FakeBackend::new();
        let registry = DeviceRegistry::new(&backend);
        assert_eq!(registry.resolve_output(None).unwrap().name, "Fake Speakers");
        assert_eq!(
            registry.resolve_output(Some("Fake Interface")).unwrap().name,
            "Fake Interface"
        );
    }
}
