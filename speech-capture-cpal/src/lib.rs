//! # speech-capture-cpal
//!
//! cpal backend for speech-capture.
//!
//! Provides:
//! - `CpalBackend`: `AudioBackend` implementation over a cpal host
//! - `DeviceEnumerator`: device listing and stream planning
//! - `ThreadStream`: a cpal stream owned by its own thread
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use speech_capture_core::{RecorderConfig, RecordingSessionController};
//! use speech_capture_cpal::CpalBackend;
//!
//! let backend = Arc::new(CpalBackend::new());
//! let mut controller = RecordingSessionController::new(RecorderConfig::default(), backend)?;
//! ```

pub mod backend;
pub mod cpal_input;
pub mod cpal_output;
pub mod device_enumerator;
pub mod stream_thread;

pub use backend::CpalBackend;
pub use device_enumerator::{DeviceEnumerator, StreamPlan};
pub use stream_thread::ThreadStream;

use speech_capture_core::models::config::StreamConfig;

/// cpal stream parameters for `config`.
pub(crate) fn stream_config(config: &StreamConfig, buffer_size: cpal::BufferSize) -> cpal::StreamConfig {
    cpal::StreamConfig {
        channels: config.channel_count,
        sample_rate: cpal::SampleRate(config.sample_rate),
        buffer_size,
    }
}
