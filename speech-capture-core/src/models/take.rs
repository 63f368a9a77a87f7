use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One finished capture, as handed over by a stopped stream session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Take {
    /// 1-based, increasing per session.
    pub index: u32,
    pub channel_count: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    /// Interleaved little-endian PCM in arrival order.
    pub raw_bytes: Vec<u8>,
}

impl Take {
    pub fn sample_width(&self) -> u16 {
        self.bits_per_sample / 8
    }

    /// Whole frames contained in `raw_bytes`.
    pub fn frame_count(&self) -> u64 {
        let block_align = self.channel_count as u64 * self.sample_width() as u64;
        if block_align == 0 {
            return 0;
        }
        self.raw_bytes.len() as u64 / block_align
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f64 / self.sample_rate as f64
    }
}

/// Returned once a take has been written to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct TakeResult {
    pub index: u32,
    /// The canonical multi-channel file.
    pub file_path: PathBuf,
    pub channel_count: u16,
    pub sample_rate: u32,
    pub frame_count: u64,
    pub duration_secs: f64,
    /// SHA-256 of the canonical file.
    pub checksum: String,
    pub metadata: TakeMetadata,
}

/// JSON sidecar stored next to each canonical take file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TakeMetadata {
    pub id: String,
    pub participant_id: u32,
    pub take_index: u32,
    pub file_path: String,
    pub duration_secs: f64,
    pub checksum: String,
    pub created_at: String,
    pub channel_count: u16,
    pub sample_rate: u32,
    /// Text the participant was asked to read.
    pub prompt: Option<String>,
    /// Source file played during the take.
    pub stimulus: Option<String>,
    /// Single-channel files derived from the canonical file.
    pub derived_files: Vec<String>,
}

impl TakeMetadata {
    pub fn new(participant_id: u32, take: &Take, file_path: &str, checksum: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            participant_id,
            take_index: take.index,
            file_path: file_path.to_string(),
            duration_secs: take.duration_secs(),
            checksum: checksum.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            channel_count: take.channel_count,
            sample_rate: take.sample_rate,
            prompt: None,
            stimulus: None,
            derived_files: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn take(bytes: usize) -> Take {
        Take {
            index: 1,
            channel_count: 2,
            sample_rate: 44100,
            bits_per_sample: 16,
            raw_bytes: vec![0; bytes],
        }
    }

    #[test]
    fn frame_count_ignores_trailing_partial_frame() {
        assert_eq!(take(4 * 10 + 3).frame_count(), 10);
    }

    #[test]
    fn duration_of_one_second() {
        assert_relative_eq!(take(4 * 44100).duration_secs(), 1.0);
    }

    #[test]
    fn empty_take_has_zero_duration() {
        assert_eq!(take(0).frame_count(), 0);
        assert_eq!(take(0).duration_secs(), 0.0);
    }

    #[test]
    fn metadata_serializes_optional_fields() {
        let mut meta = TakeMetadata::new(7, &take(8), "recordings/participant_7/1.wav", "abc");
        meta.prompt = Some("Read this aloud.".into());
        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("\"participant_id\":7"));
        assert!(json.contains("\"prompt\":\"Read this aloud.\""));
        assert!(json.contains("\"stimulus\":null"));
    }
}
