//! Canonical take file header.
//!
//! Takes are uncompressed little-endian PCM behind a standard 44-byte RIFF
//! header. Analysis scripts read these files directly, so the layout below is
//! a fixed contract.

use crate::models::error::CaptureError;

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Generate a 44-byte WAV RIFF header.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    36 + data_size
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16 (PCM format chunk size)
/// [20-21]  1 (PCM format code)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * channels * bits_per_sample / 8
/// [32-33]  block_align = channels * bits_per_sample / 8
/// [34-35]  bits_per_sample
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
pub fn generate_wav_header(
    channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
    data_size: u32,
) -> [u8; WAV_HEADER_SIZE] {
    let byte_rate = sample_rate * channels as u32 * bits_per_sample as u32 / 8;
    let block_align = channels * bits_per_sample / 8;
    let chunk_size = 36 + data_size;

    let mut header = [0u8; WAV_HEADER_SIZE];

    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&bits_per_sample.to_le_bytes());

    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// Largest PCM payload whose RIFF chunk size (`36 + data_size`) fits in 32 bits.
pub const MAX_DATA_SIZE: u64 = u32::MAX as u64 - 36;

/// Patch the RIFF chunk size (offset 4) and data size (offset 40) for
/// `data_size` bytes of PCM.
pub fn patch_sizes(header: &mut [u8; WAV_HEADER_SIZE], data_size: u64) -> Result<(), CaptureError> {
    if data_size > MAX_DATA_SIZE {
        return Err(CaptureError::StorageError(format!(
            "{} bytes of audio do not fit a WAV header",
            data_size
        )));
    }
    let data_size = data_size as u32;
    header[4..8].copy_from_slice(&(36 + data_size).to_le_bytes());
    header[40..44].copy_from_slice(&data_size.to_le_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u16_at(h: &[u8], at: usize) -> u16 {
        u16::from_le_bytes([h[at], h[at + 1]])
    }

    fn u32_at(h: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([h[at], h[at + 1], h[at + 2], h[at + 3]])
    }

    #[test]
    fn header_riff_magic() {
        let header = generate_wav_header(2, 44100, 16, 0);
        assert_eq!(header.len(), 44);
        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(&header[8..12], b"WAVE");
        assert_eq!(&header[12..16], b"fmt ");
        assert_eq!(&header[36..40], b"data");
        assert_eq!(u16_at(&header, 20), 1);
        assert_eq!(u32_at(&header, 16), 16);
    }

    #[test]
    fn header_44khz_four_channel() {
        let header = generate_wav_header(4, 44100, 16, 8192);

        assert_eq!(u16_at(&header, 22), 4);
        assert_eq!(u32_at(&header, 24), 44100);
        assert_eq!(u32_at(&header, 28), 352800); // 44100 * 4 * 2
        assert_eq!(u16_at(&header, 32), 8);
        assert_eq!(u16_at(&header, 34), 16);
        assert_eq!(u32_at(&header, 40), 8192);
        assert_eq!(u32_at(&header, 4), 36 + 8192);
    }

    #[test]
    fn empty_data_header() {
        let header = generate_wav_header(2, 48000, 16, 0);
        assert_eq!(u32_at(&header, 40), 0);
        assert_eq!(u32_at(&header, 4), 36);
    }

    #[test]
    fn patched_sizes_match_payload() {
        let mut header = generate_wav_header(2, 44100, 16, 0);
        patch_sizes(&mut header, 19200).unwrap();
        assert_eq!(u32_at(&header, 40), 19200);
        assert_eq!(u32_at(&header, 4), 19200 + 36);
    }

    #[test]
    fn payload_beyond_riff_limit_is_rejected() {
        let mut header = generate_wav_header(4, 44100, 16, 0);
        patch_sizes(&mut header, MAX_DATA_SIZE).unwrap();
        assert_eq!(u32_at(&header, 4), u32::MAX);

        let before = header;
        let err = patch_sizes(&mut header, MAX_DATA_SIZE + 1).unwrap_err();
        assert!(matches!(err, CaptureError::StorageError(_)));
        assert_eq!(header, before);
        assert!(patch_sizes(&mut header, 5 * 1024 * 1024 * 1024).is_err());
    }
}
