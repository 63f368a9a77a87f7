use std::fs::{self, File};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::error::CaptureError;
use crate::processing::wav_format;

/// Streaming writer for canonical take files.
///
/// ## File Format
/// ```text
/// [44-byte WAV header]
/// [interleaved 16-bit little-endian PCM...]
/// ```
///
/// The header is written with a zero data size on `open` and patched on
/// `close`, so a take with no captured audio is still a valid file.
pub struct TakeFileWriter {
    file_path: PathBuf,
    file: Option<BufWriter<File>>,
    header: [u8; wav_format::WAV_HEADER_SIZE],
    total_bytes_written: u64,
}

impl TakeFileWriter {
    pub fn new(file_path: PathBuf) -> Self {
        Self {
            file_path,
            file: None,
            header: [0; wav_format::WAV_HEADER_SIZE],
            total_bytes_written: 0,
        }
    }

    /// Create the file and write the initial header.
    pub fn open(
        &mut self,
        channels: u16,
        sample_rate: u32,
        bits_per_sample: u16,
    ) -> Result<(), CaptureError> {
        if self.file.is_some() {
            return Ok(());
        }

        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CaptureError::StorageError(format!("failed to create directory: {}", e))
            })?;
        }

        let file = File::create(&self.file_path).map_err(|e| {
            CaptureError::StorageError(format!(
                "failed to create {}: {}",
                self.file_path.display(),
                e
            ))
        })?;
        self.file = Some(BufWriter::new(file));

        self.header = wav_format::generate_wav_header(channels, sample_rate, bits_per_sample, 0);
        let header = self.header;
        self.write_raw(&header)
    }

    /// Append PCM data.
    pub fn write(&mut self, data: &[u8]) -> Result<(), CaptureError> {
        if self.file.is_none() {
            return Err(CaptureError::StorageError("file is not open for writing".into()));
        }
        self.write_raw(data)
    }

    /// Patch the header sizes, flush, and return the SHA-256 of the file.
    ///
    /// Audio past the 4 GiB RIFF limit fails with `StorageError` and the
    /// header is left untouched.
    pub fn close(&mut self) -> Result<String, CaptureError> {
        let mut writer = self
            .file
            .take()
            .ok_or_else(|| CaptureError::StorageError("file is not open".into()))?;

        let data_size = self
            .total_bytes_written
            .saturating_sub(wav_format::WAV_HEADER_SIZE as u64);
        wav_format::patch_sizes(&mut self.header, data_size)?;

        writer.seek(SeekFrom::Start(0))?;
        writer.write_all(&self.header)?;
        writer.flush()?;
        drop(writer);

        sha256_file(&self.file_path)
    }

    /// Total bytes written so far (including the header).
    pub fn bytes_written(&self) -> u64 {
        self.total_bytes_written
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    fn write_raw(&mut self, data: &[u8]) -> Result<(), CaptureError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| CaptureError::StorageError("file is not open".into()))?;
        file.write_all(data)
            .map_err(|e| CaptureError::StorageError(format!("write failed: {}", e)))?;
        self.total_bytes_written += data.len() as u64;
        Ok(())
    }
}

/// Write a complete take file in one go. Returns its checksum.
pub fn write_take_file(
    path: &Path,
    channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
    pcm: &[u8],
) -> Result<String, CaptureError> {
    let mut writer = TakeFileWriter::new(path.to_path_buf());
    writer.open(channels, sample_rate, bits_per_sample)?;
    writer.write(pcm)?;
    writer.close()
}

/// Compute SHA-256 hex digest of a file.
pub fn sha256_file(path: &Path) -> Result<String, CaptureError> {
    let data = fs::read(path).map_err(|e| {
        CaptureError::StorageError(format!("failed to read file for checksum: {}", e))
    })?;
    let digest = Sha256::digest(&data);
    Ok(hex_encode(&digest))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
