use std::fs;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::error::CaptureError;

/// Sentences needed in the pool for a random start; the last
/// `LOOKAHEAD - 1` sentences are never picked as a start.
pub const LOOKAHEAD: usize = 4;

/// Character encoding of a sentence file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    /// ISO-8859-1.
    Latin1,
}

impl TextEncoding {
    pub fn for_language(language: &str) -> Self {
        match language {
            "dutch" => Self::Latin1,
            _ => Self::Utf8,
        }
    }

    fn decode(&self, bytes: Vec<u8>) -> Result<String, CaptureError> {
        match self {
            Self::Utf8 => String::from_utf8(bytes)
                .map_err(|e| CaptureError::StorageError(format!("invalid utf-8: {}", e))),
            Self::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
        }
    }
}

/// Languages with a `<language>.txt` sentence file in `data_dir`, sorted.
pub fn available_languages(data_dir: &Path) -> Result<Vec<String>, CaptureError> {
    let entries = fs::read_dir(data_dir).map_err(|e| {
        CaptureError::StorageError(format!("failed to list {}: {}", data_dir.display(), e))
    })?;

    let mut languages = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("txt") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            languages.push(stem.to_string());
        }
    }
    languages.sort();
    Ok(languages)
}

/// Destructive pool of prompt sentences for one language.
///
/// Every sentence handed out is removed from the pool, so nothing is read
/// twice in a session.
pub struct PromptCursor {
    language: String,
    sentences: Vec<String>,
    rng: StdRng,
}

impl PromptCursor {
    /// Load `<data_dir>/<language>.txt`, one sentence per line. Blank lines are skipped.
    pub fn load(data_dir: &Path, language: &str) -> Result<Self, CaptureError> {
        let path = data_dir.join(format!("{}.txt", language));
        let bytes = fs::read(&path).map_err(|e| {
            CaptureError::StorageError(format!("failed to read {}: {}", path.display(), e))
        })?;
        let text = TextEncoding::for_language(language).decode(bytes)?;
        let sentences = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>();

        log::info!("Loaded {} sentences for '{}'", sentences.len(), language);
        Ok(Self::from_sentences(language, sentences))
    }

    pub fn from_sentences(language: &str, sentences: Vec<String>) -> Self {
        Self {
            language: language.to_string(),
            sentences,
            rng: StdRng::from_entropy(),
        }
    }

    /// Make paragraph selection reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Sentences not yet handed out.
    pub fn remaining(&self) -> usize {
        self.sentences.len()
    }

    /// Build a paragraph of at most `max_words` words from consecutive sentences.
    ///
    /// Starts at a random sentence (never one of the last `LOOKAHEAD - 1`),
    /// takes whole sentences until the budget is reached and cuts the last one
    /// to the words that still fit. Consumed sentences, including a cut one,
    /// leave the pool. With fewer than `LOOKAHEAD` sentences left it starts at
    /// the first and returns whatever remains, possibly an empty string.
    pub fn next_paragraph(&mut self, max_words: usize) -> String {
        if self.sentences.is_empty() || max_words == 0 {
            return String::new();
        }

        let start = if self.sentences.len() >= LOOKAHEAD {
            self.rng.gen_range(0..=self.sentences.len() - LOOKAHEAD)
        } else {
            log::warn!(
                "Only {} sentence(s) left for '{}'",
                self.sentences.len(),
                self.language
            );
            0
        };

        let mut parts = Vec::new();
        let mut num_words = 0;
        while num_words < max_words && start < self.sentences.len() {
            let sentence = self.sentences.remove(start);
            let words: Vec<&str> = sentence.split_whitespace().collect();
            let take = words.len().min(max_words - num_words);
            parts.push(words[..take].join(" "));
            num_words += take;
        }
        parts.join(" ")
    }
}
