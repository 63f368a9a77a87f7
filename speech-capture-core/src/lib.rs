//! # speech-capture-core
//!
//! Platform-agnostic core of the speech recording tool.
//!
//! Drives prompt-reading and play-and-record sessions: device lookup, capture
//! and playback streams, take sequencing, participant bookkeeping and WAV
//! output. Platform backends (cpal) implement the `AudioBackend` trait and
//! plug into the generic sessions and controllers.
//!
//! ## Architecture
//!
//! ```text
//! speech-capture-core (this crate)
//! ├── traits/       ← AudioBackend, AudioStream, SessionDelegate
//! ├── models/       ← CaptureError, StreamState, configs, AudioDevice, Take, participants
//! ├── processing/   ← CaptureBuffer, channel split, stimulus reader, WAV header generation
//! ├── registry      ← DeviceRegistry (name → device)
//! ├── session/      ← StreamSession, PlaybackSession, MultiTakeRecorder, PlayRecordLoop, controllers
//! ├── storage/      ← take writer, role files, metadata sidecars, participant table
//! └── text/         ← PromptCursor
//! ```

pub mod models;
pub mod processing;
pub mod registry;
pub mod session;
pub mod storage;
pub mod text;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{AudioDevice, ChannelRole, DatasetType, StreamDiagnostics, StreamDirection};
pub use models::config::{CorpusSource, PlayRecordConfig, RecorderConfig, StreamConfig};
pub use models::error::CaptureError;
pub use models::participant::{ParticipantInfo, ParticipantRecord, RegisteredSession};
pub use models::state::{SessionPhase, StreamState};
pub use models::take::{Take, TakeMetadata, TakeResult};
pub use processing::capture_buffer::CaptureBuffer;
pub use registry::DeviceRegistry;
pub use session::controller::{PlayRecordController, RecordingSessionController};
pub use session::play_record::{LoopSummary, PlayRecordHandle, PlayRecordLoop, StopReason};
pub use session::playback::PlaybackSession;
pub use session::recorder::MultiTakeRecorder;
pub use session::stream::StreamSession;
pub use storage::participant_store::{DirectoryLayout, ParticipantStore};
pub use text::prompt_cursor::PromptCursor;
pub use traits::audio_backend::{AudioBackend, AudioStream, CallbackFlow, InputCallback, OutputCallback};
pub use traits::session_delegate::SessionDelegate;
