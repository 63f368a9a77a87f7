use crate::models::audio_models::AudioDevice;
use crate::models::config::StreamConfig;
use crate::models::error::CaptureError;

/// What a stream callback tells the driver after handling a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackFlow {
    /// Keep delivering chunks.
    Continue,
    /// No more data; the stream becomes inactive.
    Complete,
}

/// Push callback for capture streams.
///
/// Receives one chunk of interleaved 16-bit little-endian PCM per call. Runs
/// on the driver's audio thread: append and return, nothing else.
pub type InputCallback = Box<dyn FnMut(&[u8]) -> CallbackFlow + Send + 'static>;

/// Pull callback for playback streams.
///
/// Fills the given buffer with interleaved 16-bit little-endian PCM. Bytes
/// the callback does not write must be left as silence (zero).
pub type OutputCallback = Box<dyn FnMut(&mut [u8]) -> CallbackFlow + Send + 'static>;

/// Interface for platform audio subsystems.
///
/// Implemented by:
/// - `CpalBackend` (speech-capture-cpal)
/// - the scripted fake used in this crate's tests
pub trait AudioBackend: Send + Sync {
    /// Enumerate all devices, input and output, in backend order.
    fn devices(&self) -> Result<Vec<AudioDevice>, CaptureError>;

    /// The host's default playback device.
    fn default_output_device(&self) -> Result<AudioDevice, CaptureError>;

    /// Whether the device accepts `config` exactly (rate, channels, 16-bit).
    fn is_format_supported(&self, config: &StreamConfig) -> bool;

    /// Open a capture stream. The stream does not deliver until `start()`.
    fn open_input(
        &self,
        config: &StreamConfig,
        callback: InputCallback,
    ) -> Result<Box<dyn AudioStream>, CaptureError>;

    /// Open a playback stream. The stream does not pull until `start()`.
    fn open_output(
        &self,
        config: &StreamConfig,
        callback: OutputCallback,
    ) -> Result<Box<dyn AudioStream>, CaptureError>;
}

/// An opened stream. Dropping it closes the stream.
pub trait AudioStream: Send {
    fn start(&mut self) -> Result<(), CaptureError>;

    /// Halt delivery. Once this returns the callback is no longer invoked.
    fn stop(&mut self) -> Result<(), CaptureError>;

    /// True between `start()` and either `stop()` or the callback returning
    /// `CallbackFlow::Complete`.
    fn is_active(&self) -> bool;
}
