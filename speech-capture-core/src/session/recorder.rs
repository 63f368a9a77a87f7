use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::models::config::StreamConfig;
use crate::models::error::CaptureError;
use crate::models::participant::RegisteredSession;
use crate::models::take::{Take, TakeMetadata, TakeResult};
use crate::session::stream::StreamSession;
use crate::storage::{metadata, take_writer};
use crate::traits::audio_backend::AudioBackend;
use crate::traits::session_delegate::SessionDelegate;

/// Records up to `max_takes` numbered takes into one participant directory.
///
/// Each take is written as `<index>.wav` with a `<index>.metadata.json`
/// sidecar. Indices start at 1 and are only consumed by takes that actually
/// started.
pub struct MultiTakeRecorder<B: AudioBackend> {
    session: StreamSession<B>,
    stream_config: StreamConfig,
    session_dir: PathBuf,
    participant_id: u32,
    current_take: u32,
    max_takes: u32,
    delegate: Option<Arc<dyn SessionDelegate>>,
}

impl<B: AudioBackend> MultiTakeRecorder<B> {
    pub fn new(
        backend: Arc<B>,
        stream_config: StreamConfig,
        session: &RegisteredSession,
        max_takes: u32,
    ) -> Self {
        Self {
            session: StreamSession::new(backend),
            stream_config,
            session_dir: session.directory.clone(),
            participant_id: session.participant_id,
            current_take: 0,
            max_takes,
            delegate: None,
        }
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn SessionDelegate>) {
        self.session.set_delegate(Arc::clone(&delegate));
        self.delegate = Some(delegate);
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    pub fn participant_id(&self) -> u32 {
        self.participant_id
    }

    /// Takes saved so far.
    pub fn take_count(&self) -> u32 {
        self.current_take
    }

    pub fn max_takes(&self) -> u32 {
        self.max_takes
    }

    pub fn is_complete(&self) -> bool {
        self.current_take >= self.max_takes
    }

    pub fn is_recording(&self) -> bool {
        self.session.state().is_active()
    }

    /// Open and start capture for the next take. Returns its index.
    pub fn start_recording(&mut self) -> Result<u32, CaptureError> {
        if self.is_recording() {
            return Err(CaptureError::InvalidState("a take is already recording".into()));
        }
        if self.is_complete() {
            return Err(CaptureError::InvalidState(format!(
                "all {} takes are recorded",
                self.max_takes
            )));
        }

        self.session.open(self.stream_config.clone())?;
        self.session.start()?;
        let index = self.current_take + 1;
        log::info!("Participant {}: recording take {}", self.participant_id, index);
        Ok(index)
    }

    /// Stop capture and persist the take with `prompt` in its sidecar.
    pub fn stop_recording(&mut self, prompt: Option<&str>) -> Result<TakeResult, CaptureError> {
        let raw_bytes = self.session.stop()?;
        let index = self.current_take + 1;
        let take = make_take(index, &self.stream_config, raw_bytes);

        let path = self.session_dir.join(format!("{}.wav", index));
        let result = write_canonical(self.participant_id, &take, &path).and_then(|mut result| {
            result.metadata.prompt = prompt.map(str::to_string);
            metadata::write_metadata(&result.metadata, &path)?;
            Ok(result)
        });
        let result = match result {
            Ok(result) => result,
            Err(e) => {
                if let Some(delegate) = &self.delegate {
                    delegate.on_error(&e);
                }
                return Err(e);
            }
        };

        self.current_take = index;
        log::info!(
            "Participant {}: saved take {}/{} ({:.2}s) to {}",
            self.participant_id,
            index,
            self.max_takes,
            result.duration_secs,
            path.display()
        );
        if let Some(delegate) = &self.delegate {
            delegate.on_take_saved(&result);
        }
        Ok(result)
    }
}

/// Wrap raw capture bytes, dropping a trailing partial frame.
pub(crate) fn make_take(index: u32, config: &StreamConfig, mut raw_bytes: Vec<u8>) -> Take {
    let block_align = config.block_align();
    let excess = raw_bytes.len() % block_align.max(1);
    if excess != 0 {
        log::warn!("Take {}: dropping {} byte(s) of partial frame", index, excess);
        raw_bytes.truncate(raw_bytes.len() - excess);
    }
    Take {
        index,
        channel_count: config.channel_count,
        sample_rate: config.sample_rate,
        bits_per_sample: config.bits_per_sample,
        raw_bytes,
    }
}

/// Write the canonical file for `take`.
///
/// The returned metadata is not yet on disk; callers fill in their own
/// fields and write the sidecar.
pub(crate) fn write_canonical(
    participant_id: u32,
    take: &Take,
    path: &Path,
) -> Result<TakeResult, CaptureError> {
    let checksum = take_writer::write_take_file(
        path,
        take.channel_count,
        take.sample_rate,
        take.bits_per_sample,
        &take.raw_bytes,
    )?;

    let metadata = TakeMetadata::new(
        participant_id,
        take,
        &path.display().to_string(),
        &checksum,
    );

    Ok(TakeResult {
        index: take.index,
        file_path: path.to_path_buf(),
        channel_count: take.channel_count,
        sample_rate: take.sample_rate,
        frame_count: take.frame_count(),
        duration_secs: take.duration_secs(),
        checksum,
        metadata,
    })
}
