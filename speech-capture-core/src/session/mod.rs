pub mod controller;
pub mod play_record;
pub mod playback;
pub mod recorder;
pub mod stream;

#[cfg(test)]
pub(crate) mod fake;
