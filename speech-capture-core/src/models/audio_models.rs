use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::CaptureError;

/// Direction of an audio stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamDirection {
    Input,
    Output,
}

/// An audio device as reported by the backend's enumeration.
///
/// Resolved once when a controller is built and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    /// Position in the backend's enumeration order.
    pub index: usize,
    pub name: String,
    pub max_input_channels: u16,
    pub max_output_channels: u16,
    pub default_sample_rate: u32,
}

impl AudioDevice {
    /// Maximum channel count the device offers in `direction`.
    pub fn max_channels(&self, direction: StreamDirection) -> u16 {
        match direction {
            StreamDirection::Input => self.max_input_channels,
            StreamDirection::Output => self.max_output_channels,
        }
    }
}

/// Stimulus corpus used by the play-and-record loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetType {
    Speech,
    Noise,
}

impl DatasetType {
    /// Directory name under the play-and-record output root.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Speech => "speech",
            Self::Noise => "noise",
        }
    }
}

impl fmt::Display for DatasetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetType {
    type Err = CaptureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "speech" => Ok(Self::Speech),
            "noise" => Ok(Self::Noise),
            _ => Err(CaptureError::InvalidMode(s.to_string())),
        }
    }
}

/// Semantic label for one channel of a multi-channel capture.
///
/// `name` doubles as the stem of the derived single-channel file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRole {
    pub name: String,
    pub channel: u16,
}

impl ChannelRole {
    pub fn new(name: impl Into<String>, channel: u16) -> Self {
        Self {
            name: name.into(),
            channel,
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.wav", self.name)
    }
}

/// Counters collected by a stream session, useful when a take comes out short.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamDiagnostics {
    pub callback_count: u64,
    pub bytes_captured: u64,
    pub takes_completed: u32,
}
