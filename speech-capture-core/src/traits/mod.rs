pub mod audio_backend;
pub mod session_delegate;
