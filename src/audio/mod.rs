pub mod buffer;
pub mod chunk;
pub mod file;

pub use buffer::{audio_chunk_buffer, AudioChunkBuffer, AudioChunkReceiver, BufferedInput};
pub use chunk::AudioChunk;
pub use file::AudioClip;
