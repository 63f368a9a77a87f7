pub mod channel_files;
pub mod metadata;
pub mod participant_store;
pub mod take_writer;
