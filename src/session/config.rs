use std::time::Duration;

use crate::recognition::RecognitionConfig;

/// Configuration for a streaming session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Parameters passed to the recognizer when the channel opens
    pub recognition: RecognitionConfig,

    /// How long to wait for the recognizer to accept the stream
    pub open_timeout: Duration,

    /// How long `close()` may take before the channel is abandoned
    pub close_timeout: Duration,

    /// How long to keep relaying results after close
    pub drain_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            recognition: RecognitionConfig::default(),
            open_timeout: Duration::from_secs(5),
            close_timeout: Duration::from_secs(3),
            drain_timeout: Duration::from_secs(5),
        }
    }
}
