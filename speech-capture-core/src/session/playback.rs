use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::models::audio_models::{AudioDevice, StreamDirection};
use crate::models::config::StreamConfig;
use crate::models::error::CaptureError;
use crate::processing::stimulus_source::StimulusSource;
use crate::traits::audio_backend::{AudioBackend, AudioStream};

/// Extra time allowed past a stimulus' own length before playback is
/// considered stuck.
const COMPLETION_GRACE: Duration = Duration::from_secs(5);

/// Plays one stimulus file through an output device.
///
/// The output stream is opened at the file's own rate and channel count;
/// the pull callback owns the `StimulusSource` and signals completion when
/// the file runs out.
pub struct PlaybackSession {
    stream: Box<dyn AudioStream>,
    duration_secs: f64,
    device_name: String,
}

impl PlaybackSession {
    pub fn open<B: AudioBackend + ?Sized>(
        backend: &Arc<B>,
        device: &AudioDevice,
        frames_per_chunk: u32,
        path: &Path,
    ) -> Result<Self, CaptureError> {
        let mut source = StimulusSource::open(path)?;
        let config = StreamConfig {
            sample_rate: source.sample_rate(),
            channel_count: source.channels(),
            bits_per_sample: 16,
            frames_per_chunk,
            device: device.clone(),
            direction: StreamDirection::Output,
        };
        config.validate()?;
        if !backend.is_format_supported(&config) {
            return Err(CaptureError::UnsupportedFormat(format!(
                "'{}' cannot play {}: {} Hz, {} channel(s)",
                device.name,
                path.display(),
                config.sample_rate,
                config.channel_count
            )));
        }

        let duration_secs = source.duration_secs();
        let stream = backend.open_output(&config, Box::new(move |out: &mut [u8]| source.fill(out)))?;
        log::debug!(
            "Playback opened on '{}': {} ({:.2}s)",
            device.name,
            path.display(),
            duration_secs
        );
        Ok(Self {
            stream,
            duration_secs,
            device_name: device.name.clone(),
        })
    }

    /// Stimulus length from its header.
    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    pub fn start(&mut self) -> Result<(), CaptureError> {
        self.stream.start()
    }

    pub fn is_active(&self) -> bool {
        self.stream.is_active()
    }

    /// Poll until the stream reports completion.
    ///
    /// Fails with `StreamError` if the stream is still active well past the
    /// stimulus length.
    pub fn wait_until_complete(&self, poll_interval: Duration) -> Result<(), CaptureError> {
        let deadline = Instant::now()
            + Duration::from_secs_f64(self.duration_secs * 2.0)
            + COMPLETION_GRACE;
        while self.stream.is_active() {
            if Instant::now() >= deadline {
                return Err(CaptureError::StreamError(format!(
                    "playback on '{}' did not complete",
                    self.device_name
                )));
            }
            thread::sleep(poll_interval);
        }
        Ok(())
    }

    /// Stop and release the output stream.
    pub fn close(mut self) -> Result<(), CaptureError> {
        self.stream.stop()
    }

    /// Start, wait for the end of the file, close. Returns the stimulus length.
    pub fn play_to_end(mut self, poll_interval: Duration) -> Result<f64, CaptureError> {
        let duration = self.duration_secs;
        self.start()?;
        let waited = self.wait_until_complete(poll_interval);
        let closed = self.close();
        waited?;
        closed?;
        Ok(duration)
    }
}
