use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::models::error::CaptureError;
use crate::traits::audio_backend::CallbackFlow;

/// A 16-bit WAV stimulus read frame by frame for playback.
///
/// Moved into the playback pull callback; `fill` is the only call made from
/// the audio thread.
pub struct StimulusSource {
    path: PathBuf,
    samples: hound::WavIntoSamples<BufReader<File>, i16>,
    channels: u16,
    sample_rate: u32,
    frame_count: u32,
    samples_read: u64,
    exhausted: bool,
}

impl StimulusSource {
    pub fn open(path: &Path) -> Result<Self, CaptureError> {
        let reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
            return Err(CaptureError::UnsupportedFormat(format!(
                "{}: stimulus must be 16-bit PCM, got {}-bit {:?}",
                path.display(),
                spec.bits_per_sample,
                spec.sample_format
            )));
        }
        let frame_count = reader.duration();
        Ok(Self {
            path: path.to_path_buf(),
            samples: reader.into_samples::<i16>(),
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            frame_count,
            samples_read: 0,
            exhausted: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Length of the stimulus from its header: frames / sample rate.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count as f64 / self.sample_rate as f64
    }

    /// Frames handed out so far.
    pub fn frames_read(&self) -> u64 {
        self.samples_read / self.channels.max(1) as u64
    }

    /// Fill `out` with the next samples, zero-padding past the end.
    ///
    /// Returns `Complete` once the file has no more samples.
    pub fn fill(&mut self, out: &mut [u8]) -> CallbackFlow {
        let mut written = 0;
        if !self.exhausted {
            for slot in out.chunks_exact_mut(2) {
                match self.samples.next() {
                    Some(Ok(sample)) => {
                        slot.copy_from_slice(&sample.to_le_bytes());
                        written += 2;
                    }
                    Some(Err(e)) => {
                        log::error!("Stimulus read failed for {}: {}", self.path.display(), e);
                        self.exhausted = true;
                        break;
                    }
                    None => {
                        self.exhausted = true;
                        break;
                    }
                }
            }
        }
        self.samples_read += written as u64 / 2;
        out[written..].fill(0);

        if self.exhausted {
            CallbackFlow::Complete
        } else {
            CallbackFlow::Continue
        }
    }
}
