/// Failures of a single recognition channel.
///
/// None of these outlive the session that owns the channel.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecognitionError {
    /// The recognizer could not be reached or rejected the configuration
    #[error("recognition service unavailable: {0}")]
    ChannelUnavailable(String),

    /// Audio was written after the channel was closed
    #[error("recognition channel is closed")]
    ChannelClosed,

    /// The recognizer ended the stream while it was still open
    #[error("recognition stream terminated unexpectedly: {0}")]
    UpstreamTerminated(String),

    /// Audio could not be delivered to the recognizer
    #[error("recognition transport error: {0}")]
    Transport(String),
}
