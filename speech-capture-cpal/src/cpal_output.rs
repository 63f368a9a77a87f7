//! Playback streams.
//!
//! The core callback fills 16-bit little-endian PCM; it is converted to the
//! device's sample type here. After completion the device gets silence
//! until the stream is stopped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cpal::traits::DeviceTrait;

use speech_capture_core::models::config::StreamConfig;
use speech_capture_core::models::error::CaptureError;
use speech_capture_core::traits::audio_backend::{CallbackFlow, OutputCallback};

use crate::device_enumerator::{DeviceEnumerator, StreamPlan};
use crate::stream_thread::ThreadStream;

/// Build a playback stream for `config` on its own thread.
pub fn open(
    enumerator: DeviceEnumerator,
    config: &StreamConfig,
    plan: StreamPlan,
    callback: OutputCallback,
) -> Result<ThreadStream, CaptureError> {
    let active = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&active);
    let config = config.clone();

    ThreadStream::spawn("cpal-output", active, move || {
        let device = enumerator.find(&config.device)?;
        let stream_config = crate::stream_config(&config, plan.buffer_size);
        match plan.format {
            cpal::SampleFormat::I16 => build::<i16>(&device, stream_config, callback, flag),
            cpal::SampleFormat::F32 => build::<f32>(&device, stream_config, callback, flag),
            other => Err(CaptureError::UnsupportedFormat(format!(
                "device sample format {:?}",
                other
            ))),
        }
    })
}

fn build<T>(
    device: &cpal::Device,
    stream_config: cpal::StreamConfig,
    mut callback: OutputCallback,
    active: Arc<AtomicBool>,
) -> Result<cpal::Stream, CaptureError>
where
    T: cpal::Sample + cpal::SizedSample + cpal::FromSample<i16> + Send + 'static,
{
    let mut bytes: Vec<u8> = Vec::new();
    let mut done = false;
    device
        .build_output_stream(
            &stream_config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                bytes.clear();
                bytes.resize(data.len() * 2, 0);
                if !done && callback(bytes.as_mut_slice()) == CallbackFlow::Complete {
                    done = true;
                    active.store(false, Ordering::SeqCst);
                }
                decode_chunk(&bytes, data);
            },
            |err| log::error!("Output stream error: {}", err),
            None,
        )
        .map_err(|e| CaptureError::StreamError(format!("failed to build output stream: {}", e)))
}

/// Convert 16-bit little-endian bytes into the device's sample type.
pub(crate) fn decode_chunk<T>(bytes: &[u8], out: &mut [T])
where
    T: cpal::Sample + cpal::FromSample<i16>,
{
    for (slot, pair) in out.iter_mut().zip(bytes.chunks_exact(2)) {
        let value = i16::from_le_bytes([pair[0], pair[1]]);
        *slot = <T as cpal::FromSample<i16>>::from_sample_(value);
    }
}
