use serde::{Deserialize, Serialize};

use super::connection::SessionId;
use crate::recognition::AudioEncoding;

/// Event sent from the server to a client connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// A session was opened for this connection
    Started { session_id: SessionId },

    /// Relayed recognition result
    Transcript {
        transcript: String,
        #[serde(rename = "isFinal")]
        is_final: bool,
    },

    /// Human-readable failure. Terminal when it precedes `Closed`.
    Error { error: String },

    /// The session reached its final state
    Closed {
        session_id: SessionId,
        /// Final fragments joined with spaces
        transcript: String,
    },
}

impl ClientEvent {
    pub fn error(message: impl Into<String>) -> Self {
        ClientEvent::Error {
            error: message.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ClientEvent::Started { .. } => "started",
            ClientEvent::Transcript { .. } => "transcript",
            ClientEvent::Error { .. } => "error",
            ClientEvent::Closed { .. } => "closed",
        }
    }
}

/// Control message sent by the client as a text frame.
/// Audio travels separately as binary frames.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    Start(StartOptions),
    End,
}

/// Per-session overrides of the configured recognition parameters
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StartOptions {
    pub sample_rate: Option<u32>,
    pub language_code: Option<String>,
    pub encoding: Option<AudioEncoding>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_event_wire_format() {
        let event = ClientEvent::Transcript {
            transcript: "hello".to_string(),
            is_final: true,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "transcript");
        assert_eq!(json["transcript"], "hello");
        assert_eq!(json["isFinal"], true);
    }

    #[test]
    fn test_control_messages_parse() {
        let start: ControlMessage =
            serde_json::from_str(r#"{"type":"start","sample_rate":48000,"encoding":"WEBM_OPUS"}"#)
                .unwrap();
        assert_eq!(
            start,
            ControlMessage::Start(StartOptions {
                sample_rate: Some(48000),
                language_code: None,
                encoding: Some(AudioEncoding::WebmOpus),
            })
        );

        let bare: ControlMessage = serde_json::from_str(r#"{"type":"start"}"#).unwrap();
        assert_eq!(bare, ControlMessage::Start(StartOptions::default()));

        let end: ControlMessage = serde_json::from_str(r#"{"type":"end"}"#).unwrap();
        assert_eq!(end, ControlMessage::End);

        assert!(serde_json::from_str::<ControlMessage>(r#"{"type":"pause"}"#).is_err());
    }
}
