//! Device enumeration through the cpal host.
//!
//! A device's index is its position in `Host::devices()`. Handles are looked
//! up again by index and name whenever a stream is built, since
//! `cpal::Device` is not guaranteed to be `Send` on every host.

use cpal::traits::{DeviceTrait, HostTrait};

use speech_capture_core::models::audio_models::{AudioDevice, StreamDirection};
use speech_capture_core::models::config::StreamConfig;
use speech_capture_core::models::error::CaptureError;

/// Enumerates devices of one cpal host.
#[derive(Debug, Clone, Copy)]
pub struct DeviceEnumerator {
    host_id: cpal::HostId,
}

impl DeviceEnumerator {
    /// Enumerator for the platform's default host.
    pub fn new() -> Self {
        Self {
            host_id: cpal::default_host().id(),
        }
    }

    pub fn with_host(host_id: cpal::HostId) -> Self {
        Self { host_id }
    }

    pub fn host_id(&self) -> cpal::HostId {
        self.host_id
    }

    pub fn host(&self) -> Result<cpal::Host, CaptureError> {
        cpal::host_from_id(self.host_id).map_err(|e| {
            CaptureError::ConfigurationFailed(format!("audio host unavailable: {}", e))
        })
    }

    /// All input and output devices, in host order.
    pub fn list_devices(&self) -> Result<Vec<AudioDevice>, CaptureError> {
        let host = self.host()?;
        let devices = host
            .devices()
            .map_err(|e| CaptureError::StreamError(format!("device enumeration failed: {}", e)))?;

        Ok(devices
            .enumerate()
            .map(|(index, device)| describe(index, &device))
            .collect())
    }

    /// The host's default output, matched back to its enumerated entry.
    pub fn default_output(&self) -> Result<AudioDevice, CaptureError> {
        let host = self.host()?;
        let default = host
            .default_output_device()
            .ok_or_else(|| CaptureError::DeviceNotFound("default output".into()))?;
        let name = default
            .name()
            .map_err(|e| CaptureError::StreamError(format!("device name unavailable: {}", e)))?;

        self.list_devices()?
            .into_iter()
            .find(|d| d.name == name && d.max_output_channels > 0)
            .ok_or(CaptureError::DeviceNotFound(name))
    }

    /// Find the cpal handle for a previously enumerated device.
    pub fn find(&self, device: &AudioDevice) -> Result<cpal::Device, CaptureError> {
        let host = self.host()?;
        let named: Vec<(usize, cpal::Device)> = host
            .devices()
            .map_err(|e| CaptureError::StreamError(format!("device enumeration failed: {}", e)))?
            .enumerate()
            .filter(|(_, d)| d.name().map(|n| n == device.name).unwrap_or(false))
            .collect();

        // Same-named endpoints exist on some hosts; the enumerated index wins.
        let position = named
            .iter()
            .position(|(index, _)| *index == device.index)
            .unwrap_or(0);
        named
            .into_iter()
            .nth(position)
            .map(|(_, d)| d)
            .ok_or_else(|| CaptureError::DeviceNotFound(device.name.clone()))
    }

    /// How cpal should open `config`, or `None` if the device cannot.
    pub fn plan(&self, config: &StreamConfig) -> Option<StreamPlan> {
        let device = self.find(&config.device).ok()?;
        let ranges: Vec<FormatRange> = match config.direction {
            StreamDirection::Input => device
                .supported_input_configs()
                .ok()?
                .map(|r| FormatRange::from(&r))
                .collect(),
            StreamDirection::Output => device
                .supported_output_configs()
                .ok()?
                .map(|r| FormatRange::from(&r))
                .collect(),
        };
        plan_stream(&ranges, config.channel_count, config.sample_rate, config.frames_per_chunk)
    }
}

impl Default for DeviceEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Sample type and buffer size for one stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamPlan {
    /// Device-side sample type; 16-bit is preferred, float is converted.
    pub format: cpal::SampleFormat,
    pub buffer_size: cpal::BufferSize,
}

/// One supported-config range, detached from cpal's handle types.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct FormatRange {
    pub channels: u16,
    pub min_rate: u32,
    pub max_rate: u32,
    pub format: cpal::SampleFormat,
    /// Buffer frame range, when the host reports one.
    pub buffer_frames: Option<(u32, u32)>,
}

impl From<&cpal::SupportedStreamConfigRange> for FormatRange {
    fn from(range: &cpal::SupportedStreamConfigRange) -> Self {
        Self {
            channels: range.channels(),
            min_rate: range.min_sample_rate().0,
            max_rate: range.max_sample_rate().0,
            format: range.sample_format(),
            buffer_frames: match range.buffer_size() {
                cpal::SupportedBufferSize::Range { min, max } => Some((*min, *max)),
                cpal::SupportedBufferSize::Unknown => None,
            },
        }
    }
}

/// I16 if any range offers it at exactly `channels` and `rate`, then F32.
///
/// The buffer is fixed at `frames` when the chosen range allows it; otherwise
/// the host picks.
pub(crate) fn plan_stream(ranges: &[FormatRange], channels: u16, rate: u32, frames: u32) -> Option<StreamPlan> {
    let range = [cpal::SampleFormat::I16, cpal::SampleFormat::F32]
        .into_iter()
        .find_map(|format| {
            ranges.iter().find(|r| {
                r.format == format && r.channels == channels && (r.min_rate..=r.max_rate).contains(&rate)
            })
        })?;

    let buffer_size = match range.buffer_frames {
        Some((min, max)) if (min..=max).contains(&frames) => cpal::BufferSize::Fixed(frames),
        _ => cpal::BufferSize::Default,
    };
    Some(StreamPlan {
        format: range.format,
        buffer_size,
    })
}

fn describe(index: usize, device: &cpal::Device) -> AudioDevice {
    let name = device.name().unwrap_or_else(|_| format!("Device {}", index));
    let max_input_channels = device
        .supported_input_configs()
        .map(|configs| configs.map(|c| c.channels()).max().unwrap_or(0))
        .unwrap_or(0);
    let max_output_channels = device
        .supported_output_configs()
        .map(|configs| configs.map(|c| c.channels()).max().unwrap_or(0))
        .unwrap_or(0);
    let default_sample_rate = device
        .default_input_config()
        .or_else(|_| device.default_output_config())
        .map(|c| c.sample_rate().0)
        .unwrap_or(0);

    AudioDevice {
        index,
        name,
        max_input_channels,
        max_output_channels,
        default_sample_rate,
    }
}
