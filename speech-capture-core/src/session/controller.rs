//! GUI-facing controllers.
//!
//! The GUI collects the intake form, then a language (prompt-reading) or a
//! dataset type (play-and-record), and calls the matching hooks here. Progress
//! flows back through `SessionDelegate`.

use std::sync::Arc;
use std::thread;

use crate::models::audio_models::{AudioDevice, DatasetType};
use crate::models::config::{PlayRecordConfig, RecorderConfig};
use crate::models::error::CaptureError;
use crate::models::participant::{ParticipantInfo, ParticipantRecord, RegisteredSession};
use crate::models::state::SessionPhase;
use crate::models::take::TakeResult;
use crate::registry::DeviceRegistry;
use crate::session::play_record::{LoopSummary, PlayRecordHandle, PlayRecordLoop};
use crate::session::recorder::MultiTakeRecorder;
use crate::storage::participant_store::{DirectoryLayout, ParticipantStore};
use crate::text::prompt_cursor::{self, PromptCursor};
use crate::traits::audio_backend::AudioBackend;
use crate::traits::session_delegate::SessionDelegate;

/// Prompt-reading mode: one participant reads `max_takes` paragraphs.
pub struct RecordingSessionController<B: AudioBackend> {
    config: RecorderConfig,
    backend: Arc<B>,
    device: AudioDevice,
    store: ParticipantStore,
    record: ParticipantRecord,
    phase: SessionPhase,
    recorder: Option<MultiTakeRecorder<B>>,
    cursor: Option<PromptCursor>,
    prompt: Option<String>,
    seed: Option<u64>,
    delegate: Option<Arc<dyn SessionDelegate>>,
}

impl<B: AudioBackend> RecordingSessionController<B> {
    /// Resolve the capture device and open the participant table.
    pub fn new(config: RecorderConfig, backend: Arc<B>) -> Result<Self, CaptureError> {
        config.validate()?;
        let device = DeviceRegistry::new(backend.as_ref()).resolve(&config.device_name)?;
        let store = ParticipantStore::open(&config.output_root, DirectoryLayout::Participant)?;
        Ok(Self {
            config,
            backend,
            device,
            store,
            record: ParticipantRecord::default(),
            phase: SessionPhase::AwaitingForm,
            recorder: None,
            cursor: None,
            prompt: None,
            seed: None,
            delegate: None,
        })
    }

    /// Seed prompt selection for every participant served from now on.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn SessionDelegate>) {
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.set_delegate(Arc::clone(&delegate));
        }
        self.delegate = Some(delegate);
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn device(&self) -> &AudioDevice {
        &self.device
    }

    /// Languages with a sentence file, for the selection screen.
    pub fn available_languages(&self) -> Result<Vec<String>, CaptureError> {
        prompt_cursor::available_languages(&self.config.text_data_dir)
    }

    /// Takes saved and takes allowed for the current participant.
    pub fn progress(&self) -> (u32, u32) {
        match &self.recorder {
            Some(recorder) => (recorder.take_count(), recorder.max_takes()),
            None => (0, self.config.max_takes),
        }
    }

    /// Prompt shown for the take in progress.
    pub fn current_prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    /// Store the intake form. May be called again to correct it before a
    /// language is chosen.
    pub fn on_form_complete(&mut self, info: ParticipantInfo) -> Result<(), CaptureError> {
        if !matches!(self.phase, SessionPhase::AwaitingForm | SessionPhase::AwaitingSelection) {
            return Err(CaptureError::InvalidState(format!(
                "form submitted while {:?}",
                self.phase
            )));
        }
        self.record.set_info(info);
        self.phase = SessionPhase::AwaitingSelection;
        Ok(())
    }

    /// Register the participant and get ready to record.
    ///
    /// The sentence file is loaded before anything is written, so an
    /// unknown language leaves no row and no directory behind.
    pub fn on_language_selected(&mut self, language: &str) -> Result<RegisteredSession, CaptureError> {
        if self.phase != SessionPhase::AwaitingSelection {
            return Err(CaptureError::InvalidState(format!(
                "language selected while {:?}",
                self.phase
            )));
        }

        let mut cursor = PromptCursor::load(&self.config.text_data_dir, language)?;
        if let Some(seed) = self.seed {
            cursor = cursor.with_seed(seed);
        }
        self.record.language = Some(language.to_string());
        let session = match self.store.register(&self.record) {
            Ok(session) => session,
            Err(e) => {
                if matches!(e, CaptureError::IncompleteRecord(_)) {
                    self.phase = SessionPhase::AwaitingForm;
                }
                return Err(e);
            }
        };

        let mut recorder = MultiTakeRecorder::new(
            Arc::clone(&self.backend),
            self.config.stream_config(&self.device),
            &session,
            self.config.max_takes,
        );
        if let Some(delegate) = &self.delegate {
            recorder.set_delegate(Arc::clone(delegate));
        }
        self.recorder = Some(recorder);
        self.cursor = Some(cursor);
        self.phase = SessionPhase::Recording;
        Ok(session)
    }

    /// Pick the next prompt and start capturing. Returns the prompt to display.
    pub fn start_take(&mut self) -> Result<String, CaptureError> {
        let (recorder, cursor) = match (self.recorder.as_mut(), self.cursor.as_mut()) {
            (Some(recorder), Some(cursor)) if self.phase == SessionPhase::Recording => {
                (recorder, cursor)
            }
            _ => {
                return Err(CaptureError::InvalidState(format!(
                    "cannot start a take while {:?}",
                    self.phase
                )))
            }
        };
        if recorder.is_complete() {
            return Err(CaptureError::InvalidState("all takes are recorded".into()));
        }

        recorder.start_recording()?;
        let prompt = cursor.next_paragraph(self.config.max_words);
        self.prompt = Some(prompt.clone());
        Ok(prompt)
    }

    /// Stop capturing and save the take. Finishes the session after the last take.
    pub fn stop_take(&mut self) -> Result<TakeResult, CaptureError> {
        let recorder = self
            .recorder
            .as_mut()
            .ok_or_else(|| CaptureError::InvalidState("no participant is recording".into()))?;
        let result = recorder.stop_recording(self.prompt.as_deref())?;
        self.prompt = None;

        if recorder.is_complete() {
            self.phase = SessionPhase::Finished;
            log::info!("Participant {} finished all takes", recorder.participant_id());
            if let Some(delegate) = &self.delegate {
                delegate.on_session_finished();
            }
        }
        Ok(result)
    }

    /// Close the current participant and return to the intake form.
    pub fn on_recording_finished(&mut self) -> Result<(), CaptureError> {
        if self.recorder.as_ref().map_or(false, |r| r.is_recording()) {
            return Err(CaptureError::InvalidState("stop the current take first".into()));
        }
        if let Some(recorder) = self.recorder.take() {
            log::info!(
                "Closing participant {} after {} take(s)",
                recorder.participant_id(),
                recorder.take_count()
            );
        }
        self.cursor = None;
        self.prompt = None;
        self.record = ParticipantRecord::default();
        self.phase = SessionPhase::AwaitingForm;
        Ok(())
    }
}

type LoopWorker = thread::JoinHandle<Result<LoopSummary, CaptureError>>;

/// A panicked loop thread surfaces as a stream error.
fn join_worker(worker: LoopWorker) -> Result<LoopSummary, CaptureError> {
    worker
        .join()
        .map_err(|_| CaptureError::StreamError("play-record thread panicked".into()))?
}

/// Play-and-record mode: stimuli from one corpus play while every input
/// channel is captured, until the time budget runs out.
pub struct PlayRecordController<B: AudioBackend + 'static> {
    config: PlayRecordConfig,
    backend: Arc<B>,
    input_device: AudioDevice,
    output_device: AudioDevice,
    store: ParticipantStore,
    record: ParticipantRecord,
    phase: SessionPhase,
    handle: Option<PlayRecordHandle>,
    worker: Option<LoopWorker>,
    seed: Option<u64>,
    delegate: Option<Arc<dyn SessionDelegate>>,
}

impl<B: AudioBackend + 'static> PlayRecordController<B> {
    /// Resolve the capture and playback devices and open the participant table.
    pub fn new(config: PlayRecordConfig, backend: Arc<B>) -> Result<Self, CaptureError> {
        config.validate()?;
        let registry = DeviceRegistry::new(backend.as_ref());
        let input_device = registry.resolve(&config.device_name)?;
        let output_device = registry.resolve_output(config.output_device_name.as_deref())?;
        let store = ParticipantStore::open(&config.output_root, DirectoryLayout::Dataset)?;
        Ok(Self {
            config,
            backend,
            input_device,
            output_device,
            store,
            record: ParticipantRecord::default(),
            phase: SessionPhase::AwaitingForm,
            handle: None,
            worker: None,
            seed: None,
            delegate: None,
        })
    }

    /// Seed the stimulus shuffle.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn SessionDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn on_form_complete(&mut self, info: ParticipantInfo) -> Result<(), CaptureError> {
        if !matches!(self.phase, SessionPhase::AwaitingForm | SessionPhase::AwaitingSelection) {
            return Err(CaptureError::InvalidState(format!(
                "form submitted while {:?}",
                self.phase
            )));
        }
        self.record.set_info(info);
        self.phase = SessionPhase::AwaitingSelection;
        Ok(())
    }

    /// Register the participant under the dataset type and start the loop
    /// on its worker thread.
    pub fn on_dataset_selected(&mut self, dataset: DatasetType) -> Result<RegisteredSession, CaptureError> {
        if self.phase != SessionPhase::AwaitingSelection {
            return Err(CaptureError::InvalidState(format!(
                "dataset selected while {:?}",
                self.phase
            )));
        }

        let mut play_loop = PlayRecordLoop::new(
            Arc::clone(&self.backend),
            self.config.clone(),
            &self.input_device,
            self.output_device.clone(),
        )?;
        if let Some(seed) = self.seed {
            play_loop = play_loop.with_seed(seed);
        }
        if let Some(delegate) = &self.delegate {
            play_loop.set_delegate(Arc::clone(delegate));
        }
        if play_loop.set_mode(dataset)? == 0 {
            return Err(CaptureError::ConfigurationFailed(format!(
                "no stimulus files found for {}",
                dataset
            )));
        }

        self.record.language = Some(dataset.as_str().to_string());
        let session = match self.store.register(&self.record) {
            Ok(session) => session,
            Err(e) => {
                if matches!(e, CaptureError::IncompleteRecord(_)) {
                    self.phase = SessionPhase::AwaitingForm;
                }
                return Err(e);
            }
        };
        play_loop.set_session(&session);

        let (handle, worker) = play_loop.spawn()?;
        self.handle = Some(handle);
        self.worker = Some(worker);
        self.phase = SessionPhase::Recording;
        Ok(session)
    }

    /// Like `on_dataset_selected`, from the GUI's dataset string.
    pub fn on_dataset_selected_str(&mut self, dataset: &str) -> Result<RegisteredSession, CaptureError> {
        self.on_dataset_selected(dataset.parse()?)
    }

    /// True while the loop thread has not returned.
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().map_or(false, |w| !w.is_finished())
    }

    /// Ask the loop to stop after the take in progress.
    pub fn stop(&self) {
        if let Some(handle) = &self.handle {
            handle.stop();
        }
    }

    /// Block until the loop thread returns.
    pub fn wait(&mut self) -> Result<LoopSummary, CaptureError> {
        let worker = self
            .worker
            .take()
            .ok_or_else(|| CaptureError::InvalidState("no loop is running".into()))?;
        let summary = join_worker(worker);
        self.handle = None;
        self.phase = SessionPhase::Finished;
        summary
    }

    /// Stop any running loop and return to the intake form.
    pub fn on_recording_finished(&mut self) -> Result<Option<LoopSummary>, CaptureError> {
        self.stop();
        let summary = if self.worker.is_some() {
            Some(self.wait()?)
        } else {
            None
        };
        self.record = ParticipantRecord::default();
        self.phase = SessionPhase::AwaitingForm;
        Ok(summary)
    }
}

impl<B: AudioBackend + 'static> Drop for PlayRecordController<B> {
    fn drop(&mut self) {
        self.stop();
        if let Some(worker) = self.worker.take() {
            if let Err(e) = join_worker(worker) {
                log::error!("Play-record loop ended with error: {}", e);
            }
        }
    }
}
