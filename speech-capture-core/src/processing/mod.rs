pub mod capture_buffer;
pub mod channel_split;
pub mod stimulus_source;
pub mod wav_format;
