pub mod audio_models;
pub mod config;
pub mod error;
pub mod participant;
pub mod state;
pub mod take;
