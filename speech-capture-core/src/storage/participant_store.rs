use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use crate::models::error::CaptureError;
use crate::models::participant::{ParticipantRecord, ParticipantRow, RegisteredSession};

/// File name of the participant table inside the output root.
pub const TABLE_NAME: &str = "participants.csv";

const HEADER: [&str; 5] = ["participant_id", "first_name", "last_name", "gender", "language"];

/// How session directories are named under the output root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryLayout {
    /// `participant_<id>` (prompt-reading mode).
    Participant,
    /// `<dataset_type>/<id>` (play-and-record mode).
    Dataset,
}

/// Append-only participant table plus one directory per registered session.
///
/// A session directory exists iff its row exists. Registration is done by a
/// single writer at most once per session, so no locking is involved.
pub struct ParticipantStore {
    root: PathBuf,
    table_path: PathBuf,
    layout: DirectoryLayout,
}

impl ParticipantStore {
    /// Open the store under `root`, creating the root and an empty table if needed.
    pub fn open(root: impl Into<PathBuf>, layout: DirectoryLayout) -> Result<Self, CaptureError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            CaptureError::StorageError(format!("failed to create {}: {}", root.display(), e))
        })?;

        let table_path = root.join(TABLE_NAME);
        if !table_path.exists() {
            let mut writer = csv::Writer::from_path(&table_path)?;
            writer.write_record(HEADER)?;
            writer.flush()?;
            log::info!("Created participant table at {}", table_path.display());
        }

        Ok(Self {
            root,
            table_path,
            layout,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn table_path(&self) -> &Path {
        &self.table_path
    }

    /// Rows currently in the table, header excluded.
    pub fn row_count(&self) -> Result<usize, CaptureError> {
        let mut reader = csv::Reader::from_path(&self.table_path)?;
        let mut count = 0;
        for record in reader.records() {
            record?;
            count += 1;
        }
        Ok(count)
    }

    /// Id the next registration will receive.
    pub fn next_participant_id(&self) -> Result<u32, CaptureError> {
        Ok(self.row_count()? as u32)
    }

    /// All rows, in table order.
    pub fn rows(&self) -> Result<Vec<ParticipantRow>, CaptureError> {
        let mut reader = csv::Reader::from_path(&self.table_path)?;
        let mut rows = Vec::new();
        for row in reader.deserialize() {
            rows.push(row?);
        }
        Ok(rows)
    }

    /// Directory for participant `id`; `language` is the dataset type in `Dataset` layout.
    pub fn session_dir(&self, id: u32, language: &str) -> PathBuf {
        match self.layout {
            DirectoryLayout::Participant => self.root.join(format!("participant_{}", id)),
            DirectoryLayout::Dataset => self.root.join(language).join(id.to_string()),
        }
    }

    /// Append a row for `record` and create its session directory.
    ///
    /// Fails with `IncompleteRecord` before touching the disk if a required
    /// field is missing. The directory is created first and removed again
    /// if the row cannot be appended.
    pub fn register(&self, record: &ParticipantRecord) -> Result<RegisteredSession, CaptureError> {
        let missing = record.missing_fields();
        if !missing.is_empty() {
            return Err(CaptureError::IncompleteRecord(missing));
        }

        let participant_id = self.next_participant_id()?;
        let row = ParticipantRow {
            participant_id,
            first_name: record.first_name.clone().unwrap_or_default(),
            last_name: record.last_name.clone().unwrap_or_default(),
            gender: record.gender.clone().unwrap_or_default(),
            language: record.language.clone().unwrap_or_default(),
        };

        let directory = self.session_dir(participant_id, &row.language);
        if directory.exists() {
            return Err(CaptureError::StorageError(format!(
                "session directory {} exists without a table row",
                directory.display()
            )));
        }
        if let Some(parent) = directory.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::create_dir(&directory).map_err(|e| {
            CaptureError::StorageError(format!("failed to create {}: {}", directory.display(), e))
        })?;

        if let Err(e) = self.append_row(&row) {
            if let Err(cleanup) = fs::remove_dir(&directory) {
                log::error!("Failed to remove {} after append error: {}", directory.display(), cleanup);
            }
            return Err(e);
        }

        log::info!(
            "Registered participant {} ({}) at {}",
            participant_id,
            row.language,
            directory.display()
        );
        Ok(RegisteredSession {
            participant_id,
            directory,
        })
    }

    fn append_row(&self, row: &ParticipantRow) -> Result<(), CaptureError> {
        let file = OpenOptions::new().append(true).open(&self.table_path)?;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        writer.serialize(row)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::participant::ParticipantInfo;

    fn complete_record(first: &str, language: &str) -> ParticipantRecord {
        let mut record = ParticipantRecord::default();
        record.set_info(ParticipantInfo {
            first_name: first.into(),
            last_name: "Lovelace".into(),
            gender: "Female".into(),
        });
        record.language = Some(language.into());
        record
    }

    fn session_dirs(root: &Path) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = fs::read_dir(root)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();
        dirs
    }

    #[test]
    fn sequential_registrations_get_ids_zero_and_one() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParticipantStore::open(dir.path(), DirectoryLayout::Participant).unwrap();

        let first = store.register(&complete_record("Ada", "english")).unwrap();
        let second = store.register(&complete_record("Grace", "german")).unwrap();

        assert_eq!(first.participant_id, 0);
        assert_eq!(second.participant_id, 1);
        assert_eq!(
            session_dirs(dir.path()),
            vec![dir.path().join("participant_0"), dir.path().join("participant_1")]
        );

        let rows = store.rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].first_name, "Grace");
        assert_eq!(rows[1].language, "german");
    }

    #[test]
    fn incomplete_record_leaves_table_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParticipantStore::open(dir.path(), DirectoryLayout::Participant).unwrap();
        store.register(&complete_record("Ada", "english")).unwrap();
        let before = fs::read(store.table_path()).unwrap();

        let mut record = complete_record("Grace", "english");
        record.gender = None;
        record.language = Some(String::new());

        let err = store.register(&record).unwrap_err();
        assert_eq!(
            err,
            CaptureError::IncompleteRecord(vec!["gender".into(), "language".into()])
        );
        assert_eq!(fs::read(store.table_path()).unwrap(), before);
        assert_eq!(store.row_count().unwrap(), 1);
        assert_eq!(session_dirs(dir.path()).len(), 1);
    }

    #[test]
    fn dataset_layout_nests_by_type() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParticipantStore::open(dir.path(), DirectoryLayout::Dataset).unwrap();

        let session = store.register(&complete_record("Ada", "noise")).unwrap();
        assert_eq!(session.directory, dir.path().join("noise").join("0"));
        assert!(session.directory.is_dir());
    }

    #[test]
    fn existing_table_continues_numbering() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(TABLE_NAME),
            "participant_id,first_name,last_name,gender,language\n\
             0,Ada,Lovelace,Female,english\n\
             1,Alan,Turing,Male,english\n",
        )
        .unwrap();

        let store = ParticipantStore::open(dir.path(), DirectoryLayout::Participant).unwrap();
        assert_eq!(store.next_participant_id().unwrap(), 2);
        let session = store.register(&complete_record("Grace", "dutch")).unwrap();
        assert_eq!(session.participant_id, 2);
    }

    #[test]
    fn stale_directory_is_not_reused() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParticipantStore::open(dir.path(), DirectoryLayout::Participant).unwrap();
        fs::create_dir(dir.path().join("participant_0")).unwrap();

        let err = store.register(&complete_record("Ada", "english")).unwrap_err();
        assert!(matches!(err, CaptureError::StorageError(_)));
        assert_eq!(store.row_count().unwrap(), 0);
    }
}
