//! Scripted in-memory backend for tests.
//!
//! Input streams deliver queued chunks from their own thread, like a driver
//! callback thread would; output streams pull until the callback reports
//! completion and record every byte they were given.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::models::audio_models::AudioDevice;
use crate::models::config::StreamConfig;
use crate::models::error::CaptureError;
use crate::traits::audio_backend::{
    AudioBackend, AudioStream, CallbackFlow, InputCallback, OutputCallback,
};

type OutputHook = Box<dyn FnOnce() + Send>;

pub(crate) struct FakeBackend {
    devices: Vec<AudioDevice>,
    reject_formats: bool,
    input_scripts: Mutex<VecDeque<Vec<Vec<u8>>>>,
    default_chunks: Mutex<Vec<Vec<u8>>>,
    played: Mutex<Vec<Arc<Mutex<Vec<u8>>>>>,
    output_hook: Mutex<Option<(usize, OutputHook)>>,
}

impl FakeBackend {
    pub(crate) fn new() -> Self {
        Self {
            devices: vec![
                AudioDevice {
                    index: 0,
                    name: "Fake Interface".into(),
                    max_input_channels: 4,
                    max_output_channels: 2,
                    default_sample_rate: 44100,
                },
                AudioDevice {
                    index: 1,
                    name: "Fake Speakers".into(),
                    max_input_channels: 0,
                    max_output_channels: 2,
                    default_sample_rate: 48000,
                },
            ],
            reject_formats: false,
            input_scripts: Mutex::new(VecDeque::new()),
            default_chunks: Mutex::new(Vec::new()),
            played: Mutex::new(Vec::new()),
            output_hook: Mutex::new(None),
        }
    }

    /// Every `is_format_supported` call answers no.
    pub(crate) fn rejecting_formats() -> Self {
        Self {
            reject_formats: true,
            ..Self::new()
        }
    }

    pub(crate) fn interface(&self) -> AudioDevice {
        self.devices[0].clone()
    }

    /// Chunks for the next input stream opened. Consumed in FIFO order.
    pub(crate) fn queue_take(&self, chunks: Vec<Vec<u8>>) {
        self.input_scripts.lock().push_back(chunks);
    }

    /// Chunks for input streams opened when no script is queued.
    pub(crate) fn set_default_chunks(&self, chunks: Vec<Vec<u8>>) {
        *self.default_chunks.lock() = chunks;
    }

    /// Run `hook` on the playback thread once the next output stream opened
    /// has pulled `chunks` chunks.
    pub(crate) fn after_output_chunks(&self, chunks: usize, hook: impl FnOnce() + Send + 'static) {
        *self.output_hook.lock() = Some((chunks, Box::new(hook)));
    }

    /// Bytes pulled by each output stream, in open order.
    pub(crate) fn played_streams(&self) -> Vec<Vec<u8>> {
        self.played.lock().iter().map(|p| p.lock().clone()).collect()
    }
}

impl AudioBackend for FakeBackend {
    fn devices(&self) -> Result<Vec<AudioDevice>, CaptureError> {
        Ok(self.devices.clone())
    }

    fn default_output_device(&self) -> Result<AudioDevice, CaptureError> {
        Ok(self.devices[1].clone())
    }

    fn is_format_supported(&self, _config: &StreamConfig) -> bool {
        !self.reject_formats
    }

    fn open_input(
        &self,
        _config: &StreamConfig,
        callback: InputCallback,
    ) -> Result<Box<dyn AudioStream>, CaptureError> {
        let chunks = self
            .input_scripts
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.default_chunks.lock().clone());
        Ok(Box::new(FakeInputStream {
            pending: Some((chunks, callback)),
            worker: None,
            active: Arc::new(AtomicBool::new(false)),
        }))
    }

    fn open_output(
        &self,
        config: &StreamConfig,
        callback: OutputCallback,
    ) -> Result<Box<dyn AudioStream>, CaptureError> {
        let sink = Arc::new(Mutex::new(Vec::new()));
        self.played.lock().push(Arc::clone(&sink));
        Ok(Box::new(FakeOutputStream {
            pending: Some(callback),
            chunk_bytes: config.chunk_bytes(),
            hook: self.output_hook.lock().take(),
            sink,
            worker: None,
            active: Arc::new(AtomicBool::new(false)),
        }))
    }
}

struct FakeInputStream {
    pending: Option<(Vec<Vec<u8>>, InputCallback)>,
    worker: Option<thread::JoinHandle<()>>,
    active: Arc<AtomicBool>,
}

impl AudioStream for FakeInputStream {
    fn start(&mut self) -> Result<(), CaptureError> {
        let (chunks, mut callback) = self
            .pending
            .take()
            .ok_or_else(|| CaptureError::StreamError("already started".into()))?;
        self.active.store(true, Ordering::SeqCst);
        let active = Arc::clone(&self.active);
        self.worker = Some(thread::spawn(move || {
            for chunk in chunks {
                if callback(&chunk[..]) == CallbackFlow::Complete {
                    active.store(false, Ordering::SeqCst);
                    break;
                }
            }
        }));
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

struct FakeOutputStream {
    pending: Option<OutputCallback>,
    chunk_bytes: usize,
    hook: Option<(usize, OutputHook)>,
    sink: Arc<Mutex<Vec<u8>>>,
    worker: Option<thread::JoinHandle<()>>,
    active: Arc<AtomicBool>,
}

impl AudioStream for FakeOutputStream {
    fn start(&mut self) -> Result<(), CaptureError> {
        let mut callback = self
            .pending
            .take()
            .ok_or_else(|| CaptureError::StreamError("already started".into()))?;
        self.active.store(true, Ordering::SeqCst);
        let active = Arc::clone(&self.active);
        let sink = Arc::clone(&self.sink);
        let chunk_bytes = self.chunk_bytes;
        let mut hook = self.hook.take();
        self.worker = Some(thread::spawn(move || {
            let mut pulled = 0;
            loop {
                let mut buf = vec![0u8; chunk_bytes];
                let flow = callback(buf.as_mut_slice());
                sink.lock().extend_from_slice(&buf);
                pulled += 1;
                if hook.as_ref().map_or(false, |(after, _)| pulled >= *after) {
                    if let Some((_, run)) = hook.take() {
                        run();
                    }
                }
                if flow == CallbackFlow::Complete {
                    active.store(false, Ordering::SeqCst);
                    break;
                }
            }
        }));
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        self.active.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}
