//! Sample-level helpers for interleaved 16-bit PCM.
//!
//! Pure functions on byte and sample slices, no I/O. Per-channel files are
//! derived with these from the decoded canonical capture.

/// Decode little-endian 16-bit PCM. A trailing odd byte is ignored.
pub fn pcm_to_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Encode samples as little-endian 16-bit PCM.
pub fn samples_to_pcm(samples: &[i16]) -> Vec<u8> {
    let mut data = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        data.extend_from_slice(&sample.to_le_bytes());
    }
    data
}

/// Select one channel from interleaved samples `[c0, c1, .., c0, c1, ..]`.
///
/// Returns one sample per whole frame; a trailing partial frame is dropped.
/// An out-of-range `channel` yields an empty vector.
pub fn extract_channel(interleaved: &[i16], channels: usize, channel: usize) -> Vec<i16> {
    if channels == 0 || channel >= channels {
        return Vec::new();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame[channel])
        .collect()
}
