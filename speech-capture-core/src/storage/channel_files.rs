use std::path::{Path, PathBuf};

use crate::models::audio_models::ChannelRole;
use crate::models::error::CaptureError;
use crate::processing::channel_split;

/// Derive one mono file per role from a canonical multi-channel take.
///
/// The canonical file is decoded from disk, never re-recorded; each role
/// file holds exactly the samples of its channel at the original rate.
pub fn write_role_files(
    canonical: &Path,
    roles: &[ChannelRole],
    output_dir: &Path,
) -> Result<Vec<PathBuf>, CaptureError> {
    let mut reader = hound::WavReader::open(canonical)?;
    let spec = reader.spec();
    let channels = spec.channels as usize;
    let interleaved = reader.samples::<i16>().collect::<Result<Vec<i16>, _>>()?;

    let mono_spec = hound::WavSpec {
        channels: 1,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        sample_format: spec.sample_format,
    };

    let mut written = Vec::with_capacity(roles.len());
    for role in roles {
        if role.channel as usize >= channels {
            return Err(CaptureError::ConfigurationFailed(format!(
                "role '{}' uses channel {} but {} has {} channel(s)",
                role.name,
                role.channel,
                canonical.display(),
                channels
            )));
        }
        let samples = channel_split::extract_channel(&interleaved, channels, role.channel as usize);
        let path = output_dir.join(role.file_name());

        let mut writer = hound::WavWriter::create(&path, mono_spec)?;
        for sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;

        log::debug!("Wrote role '{}' (channel {}) to {}", role.name, role.channel, path.display());
        written.push(path);
    }
    Ok(written)
}
