//! Capture streams.
//!
//! Converts whatever sample type the device delivers to interleaved 16-bit
//! little-endian PCM before handing each chunk to the core callback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cpal::traits::DeviceTrait;

use speech_capture_core::models::config::StreamConfig;
use speech_capture_core::models::error::CaptureError;
use speech_capture_core::traits::audio_backend::{CallbackFlow, InputCallback};

use crate::device_enumerator::{DeviceEnumerator, StreamPlan};
use crate::stream_thread::ThreadStream;

/// Build a capture stream for `config` on its own thread.
pub fn open(
    enumerator: DeviceEnumerator,
    config: &StreamConfig,
    plan: StreamPlan,
    callback: InputCallback,
) -> Result<ThreadStream, CaptureError> {
    let active = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&active);
    let config = config.clone();

    ThreadStream::spawn("cpal-input", active, move || {
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
    mut callback: InputCallback,
    active: Arc<AtomicBool>,
) -> Result<cpal::Stream, CaptureError>
where
    T: cpal::Sample + cpal::SizedSample + Send + 'static,
    i16: cpal::FromSample<T>,
{
    let mut bytes: Vec<u8> = Vec::new();
    let mut done = false;
    device
        .build_input_stream(
            &stream_config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                if done {
                    return;
                }
                encode_chunk(data, &mut bytes);
                if callback(&bytes[..]) == CallbackFlow::Complete {
                    done = true;
                    active.store(false, Ordering::SeqCst);
                }
            },
            |err| log::error!("Input stream error: {}", err),
            None,
        )
        .map_err(|e| CaptureError::StreamError(format!("failed to build input stream: {}", e)))
}

/// Convert one chunk to 16-bit little-endian bytes, reusing `out`.
pub(crate) fn encode_chunk<T>(data: &[T], out: &mut Vec<u8>)
where
    T: cpal::Sample,
    i16: cpal::FromSample<T>,
{
    out.clear();
    out.reserve(data.len() * 2);
    for &sample in data {
        let value = <i16 as cpal::FromSample<T>>::from_sample_(sample);
        out.extend_from_slice(&value.to_le_bytes());
    }
}
