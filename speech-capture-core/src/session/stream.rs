use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::audio_models::{StreamDiagnostics, StreamDirection};
use crate::models::config::StreamConfig;
use crate::models::error::CaptureError;
use crate::models::state::StreamState;
use crate::processing::capture_buffer::CaptureBuffer;
use crate::traits::audio_backend::{AudioBackend, AudioStream, CallbackFlow};
use crate::traits::session_delegate::SessionDelegate;

/// One capture stream's lifecycle: `Idle → Open → Active → Stopped → Idle`.
///
/// The driver callback only appends chunks to a shared `CaptureBuffer`.
/// `stop()` halts the stream first, so no chunk can land after the buffer is
/// taken, then hands back every byte in arrival order.
///
/// ```text
/// [driver thread] ─ callback ─→ [Arc<Mutex<CaptureBuffer>>] ─ stop() ─→ Vec<u8>
/// ```
pub struct StreamSession<B: AudioBackend> {
    backend: Arc<B>,
    state: StreamState,
    config: Option<StreamConfig>,
    stream: Option<Box<dyn AudioStream>>,
    buffer: Arc<Mutex<CaptureBuffer>>,
    diagnostics: StreamDiagnostics,
    delegate: Option<Arc<dyn SessionDelegate>>,
}

impl<B: AudioBackend> StreamSession<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            state: StreamState::Idle,
            config: None,
            stream: None,
            buffer: Arc::new(Mutex::new(CaptureBuffer::new())),
            diagnostics: StreamDiagnostics::default(),
            delegate: None,
        }
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn SessionDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn diagnostics(&self) -> StreamDiagnostics {
        self.diagnostics.clone()
    }

    /// The config of the currently open stream.
    pub fn config(&self) -> Option<&StreamConfig> {
        self.config.as_ref()
    }

    /// Bytes captured so far in the active take.
    pub fn captured_bytes(&self) -> usize {
        self.buffer.lock().byte_len()
    }

    /// Validate `config` against the device. Transitions: idle → open.
    pub fn open(&mut self, config: StreamConfig) -> Result<(), CaptureError> {
        if !self.state.can_open() {
            return Err(CaptureError::InvalidState(format!(
                "cannot open a stream while {:?}",
                self.state
            )));
        }
        if config.direction != StreamDirection::Input {
            return Err(CaptureError::ConfigurationFailed(
                "stream sessions capture input only".into(),
            ));
        }

        config.validate()?;
        if !self.backend.is_format_supported(&config) {
            return Err(CaptureError::UnsupportedFormat(format!(
                "'{}' rejected {} Hz, {} channel(s), {}-bit",
                config.device.name, config.sample_rate, config.channel_count, config.bits_per_sample
            )));
        }

        log::debug!(
            "Opened input on '{}': {} Hz, {} ch, {} frames/chunk",
            config.device.name,
            config.sample_rate,
            config.channel_count,
            config.frames_per_chunk
        );
        self.config = Some(config);
        self.set_state(StreamState::Open);
        Ok(())
    }

    /// Start delivering chunks into a fresh buffer. Transitions: open → active.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.state != StreamState::Open {
            return Err(CaptureError::InvalidState(format!(
                "cannot start a stream while {:?}",
                self.state
            )));
        }
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| CaptureError::InvalidState("stream is not configured".into()))?;

        self.buffer.lock().reset();
        let buffer = Arc::clone(&self.buffer);
        let callback = Box::new(move |chunk: &[u8]| {
            buffer.lock().push(chunk);
            CallbackFlow::Continue
        });

        let started = self
            .backend
            .open_input(config, callback)
            .and_then(|mut stream| stream.start().map(|_| stream));
        match started {
            Ok(stream) => {
                self.stream = Some(stream);
                self.set_state(StreamState::Active);
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to start input stream: {}", e);
                self.config = None;
                self.set_state(StreamState::Idle);
                Err(e)
            }
        }
    }

    /// Halt and close the stream, returning all captured bytes.
    ///
    /// Transitions: active → stopped → idle. A take with no chunks yields an
    /// empty vector.
    pub fn stop(&mut self) -> Result<Vec<u8>, CaptureError> {
        if self.state != StreamState::Active {
            return Err(CaptureError::InvalidState(format!(
                "cannot stop a stream while {:?}",
                self.state
            )));
        }

        let stopped = match self.stream.take() {
            Some(mut stream) => stream.stop(),
            None => Ok(()),
        };

        let (chunks, data) = {
            let mut buffer = self.buffer.lock();
            (buffer.chunk_count(), buffer.take_concatenated())
        };
        self.config = None;
        self.set_state(StreamState::Stopped);
        self.set_state(StreamState::Idle);

        stopped?;

        self.diagnostics.callback_count += chunks as u64;
        self.diagnostics.bytes_captured += data.len() as u64;
        self.diagnostics.takes_completed += 1;
        log::debug!("Stream stopped: {} chunk(s), {} byte(s)", chunks, data.len());
        Ok(data)
    }

    fn set_state(&mut self, state: StreamState) {
        log::debug!("Stream state: {:?} -> {:?}", self.state, state);
        self.state = state;
        if let Some(delegate) = &self.delegate {
            delegate.on_state_changed(state);
        }
    }
}

impl<B: AudioBackend> Drop for StreamSession<B> {
    fn drop(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.stop() {
                log::warn!("Failed to stop stream on drop: {}", e);
            }
        }
    }
}
