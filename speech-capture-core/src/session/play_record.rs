use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::models::audio_models::{AudioDevice, DatasetType};
use crate::models::config::{PlayRecordConfig, StreamConfig};
use crate::models::error::CaptureError;
use crate::models::participant::RegisteredSession;
use crate::models::take::TakeResult;
use crate::session::playback::PlaybackSession;
use crate::session::recorder::{make_take, write_canonical};
use crate::session::stream::StreamSession;
use crate::storage::{channel_files, metadata};
use crate::traits::audio_backend::AudioBackend;
use crate::traits::session_delegate::SessionDelegate;

pub use crate::models::config::{ALL_CHANNELS_FILE, ORIGINAL_FILE};

/// Why a loop run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `stop()` was requested.
    Stopped,
    /// Accumulated stimulus time exceeded the budget.
    BudgetReached,
    /// Every stimulus in the playlist was played once.
    CorpusExhausted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopSummary {
    pub takes: u32,
    pub elapsed_secs: f64,
    pub reason: StopReason,
}

/// Cloneable stop switch for a running loop.
#[derive(Debug, Clone)]
pub struct PlayRecordHandle {
    playing: Arc<AtomicBool>,
}

impl PlayRecordHandle {
    /// Request a stop. Takes effect after the take in progress is saved.
    pub fn stop(&self) {
        self.playing.store(false, Ordering::SeqCst);
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}

/// Plays shuffled stimuli one at a time while capturing every input channel.
///
/// Per take, under `<session_dir>/<index>/`:
/// ```text
/// original.wav        copy of the stimulus
/// all_channels.wav    canonical capture (+ all_channels.metadata.json)
/// <role>.wav          one mono file per configured channel role
/// ```
///
/// A loop serves one session: once stopped it does not restart.
pub struct PlayRecordLoop<B: AudioBackend> {
    backend: Arc<B>,
    config: PlayRecordConfig,
    output_device: AudioDevice,
    input_config: StreamConfig,
    session: StreamSession<B>,
    mode: Option<DatasetType>,
    playlist: Vec<PathBuf>,
    next_file: usize,
    target: Option<RegisteredSession>,
    current_take: u32,
    elapsed_secs: f64,
    playing: Arc<AtomicBool>,
    rng: StdRng,
    delegate: Option<Arc<dyn SessionDelegate>>,
}

impl<B: AudioBackend> PlayRecordLoop<B> {
    pub fn new(
        backend: Arc<B>,
        config: PlayRecordConfig,
        input_device: &AudioDevice,
        output_device: AudioDevice,
    ) -> Result<Self, CaptureError> {
        config.validate()?;
        let input_config = config.input_stream_config(input_device);
        Ok(Self {
            session: StreamSession::new(Arc::clone(&backend)),
            backend,
            config,
            output_device,
            input_config,
            mode: None,
            playlist: Vec::new(),
            next_file: 0,
            target: None,
            current_take: 0,
            elapsed_secs: 0.0,
            playing: Arc::new(AtomicBool::new(true)),
            rng: StdRng::from_entropy(),
            delegate: None,
        })
    }

    /// Fix the shuffle order, for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn SessionDelegate>) {
        self.session.set_delegate(Arc::clone(&delegate));
        self.delegate = Some(delegate);
    }

    /// Select the stimulus corpus and shuffle it once. Returns the file count.
    pub fn set_mode(&mut self, mode: DatasetType) -> Result<usize, CaptureError> {
        let corpus = self.config.corpus(mode);
        let mut files = collect_wav_files(&corpus.dir, corpus.depth)?;
        files.sort();
        files.shuffle(&mut self.rng);
        log::info!(
            "Mode {}: {} stimulus file(s) under {}",
            mode,
            files.len(),
            corpus.dir.display()
        );
        self.mode = Some(mode);
        self.playlist = files;
        self.next_file = 0;
        Ok(self.playlist.len())
    }

    /// Like `set_mode`, from the GUI's dataset string.
    pub fn set_mode_str(&mut self, mode: &str) -> Result<usize, CaptureError> {
        self.set_mode(mode.parse()?)
    }

    pub fn mode(&self) -> Option<DatasetType> {
        self.mode
    }

    /// Shuffled stimulus order.
    pub fn playlist(&self) -> &[PathBuf] {
        &self.playlist
    }

    pub fn set_session(&mut self, session: &RegisteredSession) {
        self.target = Some(session.clone());
    }

    pub fn handle(&self) -> PlayRecordHandle {
        PlayRecordHandle {
            playing: Arc::clone(&self.playing),
        }
    }

    pub fn stop(&self) {
        self.handle().stop();
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }

    pub fn take_count(&self) -> u32 {
        self.current_take
    }

    /// Run takes until stopped, over budget, or out of stimuli.
    ///
    /// The budget is checked after each take, so the last take always
    /// finishes and is saved.
    pub fn run(&mut self) -> Result<LoopSummary, CaptureError> {
        if self.mode.is_none() {
            return Err(CaptureError::InvalidState("no dataset type selected".into()));
        }
        if self.target.is_none() {
            return Err(CaptureError::InvalidState("no session directory set".into()));
        }

        let reason = loop {
            if !self.playing.load(Ordering::SeqCst) {
                break StopReason::Stopped;
            }
            if self.next_file >= self.playlist.len() {
                break StopReason::CorpusExhausted;
            }

            let duration = match self.run_take() {
                Ok(duration) => duration,
                Err(e) => {
                    log::error!("Take {} failed: {}", self.current_take + 1, e);
                    self.playing.store(false, Ordering::SeqCst);
                    if let Some(delegate) = &self.delegate {
                        delegate.on_error(&e);
                    }
                    return Err(e);
                }
            };

            self.elapsed_secs += duration;
            if let Some(budget) = self.config.time_budget_secs {
                if self.elapsed_secs > budget {
                    break StopReason::BudgetReached;
                }
            }
        };

        self.playing.store(false, Ordering::SeqCst);
        log::info!(
            "Play-record loop ended ({:?}): {} take(s), {:.1}s played",
            reason,
            self.current_take,
            self.elapsed_secs
        );
        if let Some(delegate) = &self.delegate {
            delegate.on_session_finished();
        }
        Ok(LoopSummary {
            takes: self.current_take,
            elapsed_secs: self.elapsed_secs,
            reason,
        })
    }

    /// Run the loop on a named worker thread.
    pub fn spawn(
        mut self,
    ) -> Result<(PlayRecordHandle, thread::JoinHandle<Result<LoopSummary, CaptureError>>), CaptureError>
    where
        B: 'static,
    {
        let handle = self.handle();
        let worker = thread::Builder::new()
            .name("play-record".into())
            .spawn(move || self.run())
            .map_err(|e| CaptureError::StreamError(format!("failed to spawn loop thread: {}", e)))?;
        Ok((handle, worker))
    }

    /// One take: capture on, play stimulus, capture off, persist.
    fn run_take(&mut self) -> Result<f64, CaptureError> {
        let index = self.current_take + 1;
        let stimulus = self.playlist[self.next_file].clone();
        self.next_file += 1;
        log::info!("Take {}: playing {}", index, stimulus.display());

        self.session.open(self.input_config.clone())?;
        self.session.start()?;
        let played = self.play(&stimulus);
        let captured = self.session.stop();
        let duration = played?;
        let raw_bytes = captured?;

        let result = self.persist(index, &stimulus, raw_bytes)?;
        self.current_take = index;
        if let Some(delegate) = &self.delegate {
            delegate.on_take_saved(&result);
        }
        Ok(duration)
    }

    fn play(&self, stimulus: &Path) -> Result<f64, CaptureError> {
        let playback = PlaybackSession::open(
            &self.backend,
            &self.output_device,
            self.config.frames_per_chunk,
            stimulus,
        )?;
        playback.play_to_end(Duration::from_millis(self.config.poll_interval_ms))
    }

    fn persist(&self, index: u32, stimulus: &Path, raw_bytes: Vec<u8>) -> Result<TakeResult, CaptureError> {
        let target = self
            .target
            .as_ref()
            .ok_or_else(|| CaptureError::InvalidState("no session directory set".into()))?;
        let take_dir = target.directory.join(index.to_string());
        fs::create_dir_all(&take_dir).map_err(|e| {
            CaptureError::StorageError(format!("failed to create {}: {}", take_dir.display(), e))
        })?;

        fs::copy(stimulus, take_dir.join(ORIGINAL_FILE)).map_err(|e| {
            CaptureError::StorageError(format!("failed to copy {}: {}", stimulus.display(), e))
        })?;

        let take = make_take(index, &self.input_config, raw_bytes);
        let canonical = take_dir.join(ALL_CHANNELS_FILE);
        let mut result = write_canonical(target.participant_id, &take, &canonical)?;
        let derived =
            channel_files::write_role_files(&canonical, &self.config.channel_roles, &take_dir)?;

        result.metadata.stimulus = Some(stimulus.display().to_string());
        result.metadata.derived_files = derived
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();
        metadata::write_metadata(&result.metadata, &canonical)?;
        Ok(result)
    }
}

/// WAV files exactly `depth` levels below `dir` (1 = directly inside).
pub fn collect_wav_files(dir: &Path, depth: usize) -> Result<Vec<PathBuf>, CaptureError> {
    let mut files = Vec::new();
    walk(dir, depth.max(1), &mut files)?;
    Ok(files)
}

fn walk(dir: &Path, depth: usize, out: &mut Vec<PathBuf>) -> Result<(), CaptureError> {
    let entries = fs::read_dir(dir).map_err(|e| {
        CaptureError::StorageError(format!("failed to list {}: {}", dir.display(), e))
    })?;
    for entry in entries {
        let path = entry?.path();
        if depth == 1 {
            let is_wav = path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("wav"))
                .unwrap_or(false);
            if is_wav && path.is_file() {
                out.push(path);
            }
        } else if path.is_dir() {
            walk(&path, depth - 1, out)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::audio_models::ChannelRole;
    use crate::models::config::CorpusSource;
    use crate::processing::channel_split;
    use crate::session::fake::FakeBackend;
    use crate::storage::metadata::read_metadata;

    const RATE: u32 = 8000;

    fn write_stimulus(path: &Path, value: i16, frames: usize) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..frames {
            writer.write_sample(value).unwrap();
        }
        writer.finalize().unwrap();
    }

    /// `count` one-second noise files directly under `<root>/noise`.
    fn noise_corpus(root: &Path, count: usize) -> CorpusSource {
        let dir = root.join("noise");
        for i in 0..count {
            write_stimulus(&dir.join(format!("n{:02}.wav", i)), i as i16 + 1, RATE as usize);
        }
        CorpusSource { dir, depth: 1 }
    }

    fn config(root: &Path, noise: CorpusSource, budget: Option<f64>) -> PlayRecordConfig {
        PlayRecordConfig {
            output_root: root.join("out"),
            speech_corpus: CorpusSource {
                dir: root.join("speech"),
                depth: 3,
            },
            noise_corpus: noise,
            time_budget_secs: budget,
            poll_interval_ms: 1,
            frames_per_chunk: 256,
            ..PlayRecordConfig::default()
        }
    }

    fn four_channel_capture(frames: usize) -> Vec<u8> {
        let frame = [0x1111i16, 0x2222, 0x3333, 0x4444];
        let samples: Vec<i16> = frame.iter().copied().cycle().take(frames * 4).collect();
        channel_split::samples_to_pcm(&samples)
    }

    fn make_loop(backend: &Arc<FakeBackend>, config: PlayRecordConfig) -> PlayRecordLoop<FakeBackend> {
        let input = backend.interface();
        let output = backend.default_output_device().unwrap();
        PlayRecordLoop::new(Arc::clone(backend), config, &input, output)
            .unwrap()
            .with_seed(42)
    }

    fn session_in(root: &Path) -> RegisteredSession {
        let directory = root.join("out").join("noise").join("0");
        fs::create_dir_all(&directory).unwrap();
        RegisteredSession {
            participant_id: 0,
            directory,
        }
    }

    #[test]
    fn budget_stops_after_the_take_that_crosses_it() {
        let dir = tempfile::tempdir().unwrap();
        let noise = noise_corpus(dir.path(), 5);
        let backend = Arc::new(FakeBackend::new());
        backend.set_default_chunks(vec![four_channel_capture(200)]);
        let session = session_in(dir.path());

        let mut lp = make_loop(&backend, config(dir.path(), noise, Some(2.5)));
        assert_eq!(lp.set_mode(DatasetType::Noise).unwrap(), 5);
        lp.set_session(&session);
        let summary = lp.run().unwrap();

        assert_eq!(summary.takes, 3);
        assert_eq!(summary.reason, StopReason::BudgetReached);
        approx::assert_relative_eq!(summary.elapsed_secs, 3.0);
        assert!(!lp.handle().is_playing());
        assert_eq!(backend.played_streams().len(), 3);
        for index in 1..=3 {
            assert!(session.directory.join(index.to_string()).is_dir());
        }
        assert!(!session.directory.join("4").exists());
    }

    #[test]
    fn take_directory_holds_stimulus_capture_and_roles() {
        let dir = tempfile::tempdir().unwrap();
        let noise = noise_corpus(dir.path(), 1);
        let backend = Arc::new(FakeBackend::new());
        backend.set_default_chunks(vec![four_channel_capture(300)]);
        let session = session_in(dir.path());

        let mut lp = make_loop(&backend, config(dir.path(), noise, None));
        lp.set_mode(DatasetType::Noise).unwrap();
        lp.set_session(&session);
        lp.run().unwrap();

        let take_dir = session.directory.join("1");
        let original = fs::read(take_dir.join(ORIGINAL_FILE)).unwrap();
        let source = fs::read(dir.path().join("noise").join("n00.wav")).unwrap();
        assert_eq!(original, source);

        let canonical = take_dir.join(ALL_CHANNELS_FILE);
        assert_eq!(hound::WavReader::open(&canonical).unwrap().spec().channels, 4);

        for (name, value) in [("air_demo", 0x1111i16), ("bone_demo", 0x2222), ("air_reference", 0x3333)] {
            let mut reader = hound::WavReader::open(take_dir.join(format!("{}.wav", name))).unwrap();
            assert_eq!(reader.spec().channels, 1);
            assert_eq!(reader.spec().sample_rate, 44100);
            let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
            assert_eq!(samples.len(), 300);
            assert!(samples.iter().all(|&s| s == value), "{}", name);
        }

        let metadata = read_metadata(&canonical).unwrap();
        assert_eq!(metadata.take_index, 1);
        assert_eq!(
            metadata.derived_files,
            vec!["air_demo.wav", "bone_demo.wav", "air_reference.wav"]
        );
        assert!(metadata.stimulus.unwrap().ends_with("n00.wav"));
    }

    #[test]
    fn exhausted_corpus_ends_loop_with_each_file_played_once() {
        let dir = tempfile::tempdir().unwrap();
        let noise = noise_corpus(dir.path(), 3);
        let backend = Arc::new(FakeBackend::new());
        let session = session_in(dir.path());

        let mut lp = make_loop(&backend, config(dir.path(), noise, None));
        lp.set_mode(DatasetType::Noise).unwrap();
        lp.set_session(&session);
        let summary = lp.run().unwrap();

        assert_eq!(summary.takes, 3);
        assert_eq!(summary.reason, StopReason::CorpusExhausted);
        let mut played: Vec<i16> = backend
            .played_streams()
            .iter()
            .map(|pcm| channel_split::pcm_to_samples(pcm)[0])
            .collect();
        played.sort();
        assert_eq!(played, vec![1, 2, 3]);
    }

    #[test]
    fn stop_before_run_records_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let noise = noise_corpus(dir.path(), 2);
        let backend = Arc::new(FakeBackend::new());
        let session = session_in(dir.path());

        let mut lp = make_loop(&backend, config(dir.path(), noise, None));
        lp.set_mode(DatasetType::Noise).unwrap();
        lp.set_session(&session);
        lp.stop();
        let summary = lp.run().unwrap();

        assert_eq!(summary.takes, 0);
        assert_eq!(summary.reason, StopReason::Stopped);
        assert!(backend.played_streams().is_empty());
    }

    #[test]
    fn spawned_loop_honours_handle_stop() {
        let dir = tempfile::tempdir().unwrap();
        let noise = noise_corpus(dir.path(), 20);
        let backend = Arc::new(FakeBackend::new());
        let session = session_in(dir.path());

        let mut lp = make_loop(&backend, config(dir.path(), noise, None));
        lp.set_mode(DatasetType::Noise).unwrap();
        lp.set_session(&session);
        let (handle, worker) = lp.spawn().unwrap();
        handle.stop();
        let summary = worker.join().unwrap().unwrap();

        assert_eq!(summary.reason, StopReason::Stopped);
        assert!(summary.takes < 20);
    }

    #[test]
    fn stop_during_playback_still_saves_that_take() {
        let dir = tempfile::tempdir().unwrap();
        let noise = noise_corpus(dir.path(), 5);
        let backend = Arc::new(FakeBackend::new());
        backend.set_default_chunks(vec![four_channel_capture(300)]);
        let session = session_in(dir.path());

        let mut lp = make_loop(&backend, config(dir.path(), noise, None));
        lp.set_mode(DatasetType::Noise).unwrap();
        lp.set_session(&session);
        let handle = lp.handle();
        backend.after_output_chunks(5, move || handle.stop());
        let summary = lp.run().unwrap();

        assert_eq!(summary.takes, 1);
        assert_eq!(summary.reason, StopReason::Stopped);
        approx::assert_relative_eq!(summary.elapsed_secs, 1.0);

        let played = backend.played_streams();
        assert_eq!(played.len(), 1);
        assert!(played[0].len() >= RATE as usize * 2);

        let take_dir = session.directory.join("1");
        let original = hound::WavReader::open(take_dir.join(ORIGINAL_FILE)).unwrap();
        assert_eq!(original.duration(), RATE);

        let canonical = hound::WavReader::open(take_dir.join(ALL_CHANNELS_FILE)).unwrap();
        assert_eq!(canonical.spec().channels, 4);
        assert_eq!(canonical.duration(), 300);

        for name in ["air_demo", "bone_demo", "air_reference"] {
            let reader = hound::WavReader::open(take_dir.join(format!("{}.wav", name))).unwrap();
            assert_eq!(reader.duration(), 300, "{}", name);
        }
        assert!(read_metadata(&take_dir.join(ALL_CHANNELS_FILE)).is_ok());
        assert!(!session.directory.join("2").exists());
    }

    #[test]
    fn role_named_after_canonical_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let noise = noise_corpus(dir.path(), 1);
        let backend = Arc::new(FakeBackend::new());
        let mut config = config(dir.path(), noise, None);
        config.channel_roles = vec![ChannelRole::new("all_channels", 1)];

        let input = backend.interface();
        let output = backend.default_output_device().unwrap();
        let result = PlayRecordLoop::new(Arc::clone(&backend), config, &input, output);
        assert!(matches!(result, Err(CaptureError::ConfigurationFailed(_))));
    }

    #[test]
    fn same_seed_gives_same_order() {
        let dir = tempfile::tempdir().unwrap();
        let noise = noise_corpus(dir.path(), 8);
        let backend = Arc::new(FakeBackend::new());

        let mut a = make_loop(&backend, config(dir.path(), noise.clone(), None));
        let mut b = make_loop(&backend, config(dir.path(), noise, None));
        a.set_mode(DatasetType::Noise).unwrap();
        b.set_mode(DatasetType::Noise).unwrap();
        assert_eq!(a.playlist(), b.playlist());
    }

    #[test]
    fn speech_corpus_is_collected_three_levels_deep() {
        let dir = tempfile::tempdir().unwrap();
        let speech = dir.path().join("speech");
        write_stimulus(&speech.join("19/198/19-198-0000.wav"), 1, 10);
        write_stimulus(&speech.join("19/198/19-198-0001.WAV"), 1, 10);
        write_stimulus(&speech.join("19/stray.wav"), 1, 10);
        write_stimulus(&speech.join("top.wav"), 1, 10);

        let mut files = collect_wav_files(&speech, 3).unwrap();
        files.sort();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.parent().unwrap().ends_with("19/198")));
    }

    #[test]
    fn unknown_mode_string_is_invalid_mode() {
        let dir = tempfile::tempdir().unwrap();
        let noise = noise_corpus(dir.path(), 1);
        let backend = Arc::new(FakeBackend::new());
        let mut lp = make_loop(&backend, config(dir.path(), noise, None));
        assert_eq!(
            lp.set_mode_str("music"),
            Err(CaptureError::InvalidMode("music".into()))
        );
        assert_eq!(lp.set_mode_str("Noise").unwrap(), 1);
    }

    #[test]
    fn run_needs_mode_and_session() {
        let dir = tempfile::tempdir().unwrap();
        let noise = noise_corpus(dir.path(), 1);
        let backend = Arc::new(FakeBackend::new());
        let mut lp = make_loop(&backend, config(dir.path(), noise, None));
        assert!(matches!(lp.run(), Err(CaptureError::InvalidState(_))));
        lp.set_mode(DatasetType::Noise).unwrap();
        assert!(matches!(lp.run(), Err(CaptureError::InvalidState(_))));
    }
}
