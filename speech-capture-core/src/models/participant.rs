use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Identity fields collected by the intake form.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
}

/// A participant being registered. Fields fill in as the GUI progresses.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParticipantRecord {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    /// Prompt language, or dataset type in play-and-record mode.
    pub language: Option<String>,
}

impl ParticipantRecord {
    pub fn set_info(&mut self, info: ParticipantInfo) {
        self.first_name = Some(info.first_name);
        self.last_name = Some(info.last_name);
        self.gender = Some(info.gender);
    }

    /// Names of required fields that are unset or blank, in column order.
    pub fn missing_fields(&self) -> Vec<String> {
        let fields = [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("gender", &self.gender),
            ("language", &self.language),
        ];
        fields
            .iter()
            .filter(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
            .map(|(name, _)| name.to_string())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

/// One row of `participants.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRow {
    pub participant_id: u32,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub language: String,
}

/// A participant that has a metadata row and a session directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredSession {
    pub participant_id: u32,
    pub directory: PathBuf,
}
