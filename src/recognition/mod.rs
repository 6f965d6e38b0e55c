//! Streaming speech recognition
//!
//! The recognizer itself is external. This module defines the seam to it:
//! - `Recognizer` / `AudioSink`: what a backend must provide
//! - `RecognitionChannel`: the adapter enforcing open/write/close rules
//! - `transcribe_clip`: one-shot transcription of an uploaded clip

mod channel;
mod clip;
mod error;
mod types;

pub use channel::{AudioSink, EventStream, OpenedStream, RecognitionChannel, Recognizer};
pub use clip::{transcribe_clip, ClipError, ClipOptions};
pub use error::RecognitionError;
pub use types::{AudioEncoding, RecognitionConfig, RecognitionEvent};
