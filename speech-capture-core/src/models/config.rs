use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::audio_models::{AudioDevice, ChannelRole, DatasetType, StreamDirection};
use super::error::CaptureError;

/// Copy of the played stimulus inside each take directory.
pub const ORIGINAL_FILE: &str = "original.wav";
/// Canonical multi-channel capture inside each take directory.
pub const ALL_CHANNELS_FILE: &str = "all_channels.wav";

/// Role names whose files would land on top of a take's own files.
const RESERVED_ROLE_NAMES: [&str; 3] = ["all_channels", "original", "all_channels.metadata"];

/// Parameters for opening one audio stream on a resolved device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Sample rate in Hz (44100 or 48000 in practice).
    pub sample_rate: u32,
    pub channel_count: u16,
    /// Only 16-bit PCM is produced and consumed.
    pub bits_per_sample: u16,
    /// Frames delivered per driver callback.
    pub frames_per_chunk: u32,
    pub device: AudioDevice,
    pub direction: StreamDirection,
}

impl StreamConfig {
    /// Bytes per sample.
    pub fn sample_width(&self) -> u16 {
        self.bits_per_sample / 8
    }

    /// Bytes per interleaved frame.
    pub fn block_align(&self) -> usize {
        self.channel_count as usize * self.sample_width() as usize
    }

    /// Bytes in one full chunk.
    pub fn chunk_bytes(&self) -> usize {
        self.frames_per_chunk as usize * self.block_align()
    }

    /// Checks the config on its own and against the device's advertised capabilities.
    ///
    /// The backend gets the final word through `AudioBackend::is_format_supported`.
    pub fn validate(&self) -> Result<(), CaptureError> {
        validate_format(
            self.sample_rate,
            self.bits_per_sample,
            self.channel_count,
            self.frames_per_chunk,
        )
        .map_err(CaptureError::UnsupportedFormat)?;
        let available = self.device.max_channels(self.direction);
        if self.channel_count > available {
            return Err(CaptureError::UnsupportedFormat(format!(
                "'{}' offers {} {:?} channel(s), {} requested",
                self.device.name, available, self.direction, self.channel_count
            )));
        }
        Ok(())
    }
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, CaptureError> {
    let json = fs::read_to_string(path).map_err(|e| {
        CaptureError::ConfigurationFailed(format!("failed to read {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&json).map_err(|e| {
        CaptureError::ConfigurationFailed(format!("failed to parse {}: {}", path.display(), e))
    })
}

fn validate_format(sample_rate: u32, bits_per_sample: u16, channels: u16, frames: u32) -> Result<(), String> {
    if sample_rate == 0 {
        return Err("sample rate must be positive".into());
    }
    if bits_per_sample != 16 {
        return Err(format!("unsupported bit depth: {}", bits_per_sample));
    }
    if channels == 0 {
        return Err("channel count must be positive".into());
    }
    if frames == 0 {
        return Err("frames per chunk must be positive".into());
    }
    Ok(())
}

/// Configuration for prompt-reading sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Exact name of the capture device.
    pub device_name: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub frames_per_chunk: u32,
    /// Takes per participant before the session is complete.
    pub max_takes: u32,
    /// Word budget for each prompt paragraph.
    pub max_words: usize,
    /// Holds `participants.csv` and one `participant_<id>` directory per session.
    pub output_root: PathBuf,
    /// Directory of `<language>.txt` sentence files.
    pub text_data_dir: PathBuf,
}

impl RecorderConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CaptureError> {
        let config: Self = load_json(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CaptureError> {
        validate_format(self.sample_rate, self.bits_per_sample, self.channels, self.frames_per_chunk)
            .map_err(CaptureError::ConfigurationFailed)?;
        if self.max_takes == 0 {
            return Err(CaptureError::ConfigurationFailed("max_takes must be positive".into()));
        }
        if self.max_words == 0 {
            return Err(CaptureError::ConfigurationFailed("max_words must be positive".into()));
        }
        Ok(())
    }

    /// Input stream parameters for `device`.
    pub fn stream_config(&self, device: &AudioDevice) -> StreamConfig {
        StreamConfig {
            sample_rate: self.sample_rate,
            channel_count: self.channels,
            bits_per_sample: self.bits_per_sample,
            frames_per_chunk: self.frames_per_chunk,
            device: device.clone(),
            direction: StreamDirection::Input,
        }
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            device_name: "Microphone Array (Realtek Audio".into(),
            sample_rate: 44100,
            channels: 2,
            bits_per_sample: 16,
            frames_per_chunk: 1024,
            max_takes: 3,
            max_words: 30,
            output_root: PathBuf::from("recordings"),
            text_data_dir: PathBuf::from("data"),
        }
    }
}

/// Where a stimulus corpus lives and how deep its WAV files sit below the root.
///
/// `depth` 1 means files directly inside `dir`; LibriSpeech needs 3
/// (speaker/chapter/utterance).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusSource {
    pub dir: PathBuf,
    pub depth: usize,
}

/// Configuration for the play-and-record loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayRecordConfig {
    /// Exact name of the multi-channel capture interface.
    pub device_name: String,
    /// Playback device; `None` plays through the host default output.
    pub output_device_name: Option<String>,
    pub sample_rate: u32,
    pub in_channels: u16,
    pub bits_per_sample: u16,
    pub frames_per_chunk: u32,
    /// Holds `participants.csv` and `<dataset_type>/<id>` session directories.
    pub output_root: PathBuf,
    pub speech_corpus: CorpusSource,
    pub noise_corpus: CorpusSource,
    /// Total stimulus time played before the loop stops itself. `None` runs
    /// until stopped or the corpus is exhausted.
    pub time_budget_secs: Option<f64>,
    /// Sleep between playback completion polls.
    pub poll_interval_ms: u64,
    /// Channel index to derived file mapping.
    pub channel_roles: Vec<ChannelRole>,
}

impl PlayRecordConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CaptureError> {
        let config: Self = load_json(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CaptureError> {
        validate_format(self.sample_rate, self.bits_per_sample, self.in_channels, self.frames_per_chunk)
            .map_err(CaptureError::ConfigurationFailed)?;
        if let Some(budget) = self.time_budget_secs {
            if budget.is_nan() || budget <= 0.0 {
                return Err(CaptureError::ConfigurationFailed(
                    "time budget must be positive".into(),
                ));
            }
        }
        for (i, role) in self.channel_roles.iter().enumerate() {
            validate_role_name(&role.name)?;
            if self.channel_roles[..i].iter().any(|r| r.name == role.name) {
                return Err(CaptureError::ConfigurationFailed(format!(
                    "role '{}' is configured twice",
                    role.name
                )));
            }
            if role.channel >= self.in_channels {
                return Err(CaptureError::ConfigurationFailed(format!(
                    "role '{}' uses channel {} but only {} are captured",
                    role.name, role.channel, self.in_channels
                )));
            }
        }
        Ok(())
    }

    pub fn corpus(&self, mode: DatasetType) -> &CorpusSource {
        match mode {
            DatasetType::Speech => &self.speech_corpus,
            DatasetType::Noise => &self.noise_corpus,
        }
    }

    /// Capture stream parameters for `device`.
    pub fn input_stream_config(&self, device: &AudioDevice) -> StreamConfig {
        StreamConfig {
            sample_rate: self.sample_rate,
            channel_count: self.in_channels,
            bits_per_sample: self.bits_per_sample,
            frames_per_chunk: self.frames_per_chunk,
            device: device.clone(),
            direction: StreamDirection::Input,
        }
    }
}

/// A role name becomes `<name>.wav` inside the take directory, so it must be
/// a single plain path component that cannot shadow the take's own files.
fn validate_role_name(name: &str) -> Result<(), CaptureError> {
    let mut components = Path::new(name).components();
    let single = matches!(
        (components.next(), components.next()),
        (Some(std::path::Component::Normal(c)), None) if c == name
    );
    if !single || name.contains(['/', '\\']) {
        return Err(CaptureError::ConfigurationFailed(format!(
            "role name '{}' is not a plain file name",
            name
        )));
    }
    if RESERVED_ROLE_NAMES.iter().any(|r| r.eq_ignore_ascii_case(name)) {
        return Err(CaptureError::ConfigurationFailed(format!(
            "role name '{}' collides with a take file",
            name
        )));
    }
    Ok(())
}

impl Default for PlayRecordConfig {
    fn default() -> Self {
        Self {
            device_name: "MOTU Audio ASIO".into(),
            output_device_name: None,
            sample_rate: 44100,
            in_channels: 4,
            bits_per_sample: 16,
            frames_per_chunk: 1024,
            output_root: PathBuf::from("external_recordings"),
            speech_corpus: CorpusSource {
                dir: PathBuf::from("audio_datasets/LibriSpeech-wav/train-clean-100"),
                depth: 3,
            },
            noise_corpus: CorpusSource {
                dir: PathBuf::from("audio_datasets/datasets_fullband/noise_fullband"),
                depth: 1,
            },
            time_budget_secs: Some(1800.0),
            poll_interval_ms: 50,
            channel_roles: vec![
                ChannelRole::new("air_demo", 0),
                ChannelRole::new("bone_demo", 1),
                ChannelRole::new("air_reference", 2),
            ],
        }
    }
}
