//! `cpal::Stream` is not `Send`, so each stream is built, played and dropped
//! on its own thread and controlled over a command channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use cpal::traits::StreamTrait;

use speech_capture_core::models::error::CaptureError;
use speech_capture_core::traits::audio_backend::AudioStream;

enum StreamCommand {
    Play(mpsc::Sender<Result<(), CaptureError>>),
    Stop(mpsc::Sender<Result<(), CaptureError>>),
}

/// A cpal stream owned by a dedicated thread.
///
/// `active` is shared with the data callback, which clears it when the
/// core callback reports completion.
pub struct ThreadStream {
    name: String,
    commands: Option<mpsc::Sender<StreamCommand>>,
    worker: Option<thread::JoinHandle<()>>,
    active: Arc<AtomicBool>,
}

impl ThreadStream {
    /// Spawn the owner thread and build the stream on it.
    ///
    /// Returns once the stream is built, or with the build error.
    pub fn spawn<F>(name: &str, active: Arc<AtomicBool>, build: F) -> Result<Self, CaptureError>
    where
        F: FnOnce() -> Result<cpal::Stream, CaptureError> + Send + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel::<StreamCommand>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), CaptureError>>();

        let worker = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let stream = match build() {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                let mut stop_reply = None;
                while let Ok(command) = cmd_rx.recv() {
                    match command {
                        StreamCommand::Play(reply) => {
                            let result = stream
                                .play()
                                .map_err(|e| CaptureError::StreamError(format!("play failed: {}", e)));
                            let _ = reply.send(result);
                        }
                        StreamCommand::Stop(reply) => {
                            stop_reply = Some(reply);
                            break;
                        }
                    }
                }

                // Dropping the stream guarantees the data callback has returned
                // for the last time.
                drop(stream);
                if let Some(reply) = stop_reply {
                    let _ = reply.send(Ok(()));
                }
            })
            .map_err(|e| CaptureError::StreamError(format!("failed to spawn {}: {}", name, e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                name: name.to_string(),
                commands: Some(cmd_tx),
                worker: Some(worker),
                active,
            }),
            Ok(Err(e)) => {
                let _ = worker.join();
                Err(e)
            }
            Err(_) => {
                let _ = worker.join();
                Err(CaptureError::StreamError(format!("{} exited during setup", name)))
            }
        }
    }

    fn request(&self, make: fn(mpsc::Sender<Result<(), CaptureError>>) -> StreamCommand) -> Result<(), CaptureError> {
        let commands = self
            .commands
            .as_ref()
            .ok_or_else(|| CaptureError::InvalidState(format!("{} is closed", self.name)))?;
        let (reply_tx, reply_rx) = mpsc::channel();
        commands
            .send(make(reply_tx))
            .map_err(|_| CaptureError::StreamError(format!("{} is gone", self.name)))?;
        reply_rx
            .recv()
            .map_err(|_| CaptureError::StreamError(format!("{} did not reply", self.name)))?
    }

    fn shutdown(&mut self) {
        self.commands = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("{} panicked", self.name);
            }
        }
        self.active.store(false, Ordering::SeqCst);
    }
}

impl AudioStream for ThreadStream {
    fn start(&mut self) -> Result<(), CaptureError> {
        self.active.store(true, Ordering::SeqCst);
        if let Err(e) = self.request(StreamCommand::Play) {
            self.active.store(false, Ordering::SeqCst);
            return Err(e);
        }
        log::debug!("{} started", self.name);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        if self.commands.is_none() {
            return Ok(());
        }
        let result = self.request(StreamCommand::Stop);
        self.shutdown();
        log::debug!("{} stopped", self.name);
        result
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl Drop for ThreadStream {
    fn drop(&mut self) {
        self.shutdown();
    }
}
