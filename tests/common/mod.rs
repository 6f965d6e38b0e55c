// Shared test doubles for integration tests
//
// `ScriptedRecognizer` stands in for the external speech service. It records
// every open, write and close it sees and answers with scripted events.

#![allow(dead_code)]

use futures::stream::StreamExt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use voice_journal::audio::AudioChunk;
use voice_journal::recognition::{
    AudioSink, EventStream, OpenedStream, RecognitionConfig, RecognitionError, RecognitionEvent,
    Recognizer,
};
use voice_journal::session::ClientEvent;

type EventSender = mpsc::UnboundedSender<Result<RecognitionEvent, RecognitionError>>;

/// What the fake recognizer does
#[derive(Debug, Clone, Default)]
pub struct Script {
    /// Reject every open with `ChannelUnavailable`
    pub fail_open: bool,
    /// Never complete an open
    pub hang_on_open: bool,
    /// End the stream with `UpstreamTerminated` after this many writes
    pub terminate_after_writes: Option<usize>,
    /// Writes beyond this many never complete
    pub stall_after_writes: Option<usize>,
    /// Keep the event stream open after close
    pub hold_stream_after_close: bool,
    /// Event emitted after the Nth write (index = write number)
    pub responses: Vec<Option<RecognitionEvent>>,
    /// Events emitted when the channel is closed
    pub on_close: Vec<RecognitionEvent>,
}

impl Script {
    pub fn responding(responses: Vec<RecognitionEvent>) -> Self {
        Self {
            responses: responses.into_iter().map(Some).collect(),
            ..Self::default()
        }
    }
}

/// Everything the recognizer observed
#[derive(Debug, Default)]
pub struct RecognizerLog {
    pub opens: usize,
    pub writes: Vec<AudioChunk>,
    pub closes: usize,
    pub configs: Vec<RecognitionConfig>,
    held: Vec<EventSender>,
}

#[derive(Clone)]
pub struct ScriptedRecognizer {
    script: Script,
    log: Arc<Mutex<RecognizerLog>>,
}

impl ScriptedRecognizer {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            log: Arc::new(Mutex::new(RecognizerLog::default())),
        }
    }

    pub fn opens(&self) -> usize {
        self.log.lock().unwrap().opens
    }

    pub fn closes(&self) -> usize {
        self.log.lock().unwrap().closes
    }

    pub fn write_count(&self) -> usize {
        self.log.lock().unwrap().writes.len()
    }

    /// Payloads in the order they were written
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.log
            .lock()
            .unwrap()
            .writes
            .iter()
            .map(|c| c.data().to_vec())
            .collect()
    }

    pub fn sequences(&self) -> Vec<u64> {
        self.log
            .lock()
            .unwrap()
            .writes
            .iter()
            .map(|c| c.sequence())
            .collect()
    }

    pub fn configs(&self) -> Vec<RecognitionConfig> {
        self.log.lock().unwrap().configs.clone()
    }
}

#[async_trait::async_trait]
impl Recognizer for ScriptedRecognizer {
    async fn open(&self, config: &RecognitionConfig) -> Result<OpenedStream, RecognitionError> {
        if self.script.hang_on_open {
            futures::future::pending::<()>().await;
        }
        if self.script.fail_open {
            return Err(RecognitionError::ChannelUnavailable(
                "scripted outage".to_string(),
            ));
        }

        {
            let mut log = self.log.lock().unwrap();
            log.opens += 1;
            log.configs.push(config.clone());
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let events: EventStream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
        .boxed();

        Ok(OpenedStream {
            sink: Box::new(ScriptedSink {
                script: self.script.clone(),
                log: Arc::clone(&self.log),
                events: Some(tx),
            }),
            events,
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

struct ScriptedSink {
    script: Script,
    log: Arc<Mutex<RecognizerLog>>,
    events: Option<EventSender>,
}

#[async_trait::async_trait]
impl AudioSink for ScriptedSink {
    async fn write(&mut self, chunk: &AudioChunk) -> Result<(), RecognitionError> {
        let written = {
            let mut log = self.log.lock().unwrap();
            log.writes.push(chunk.clone());
            log.writes.len()
        };

        if let (Some(tx), Some(Some(event))) =
            (&self.events, self.script.responses.get(written - 1))
        {
            let _ = tx.send(Ok(event.clone()));
        }

        if self.script.stall_after_writes.is_some_and(|n| written > n) {
            futures::future::pending::<()>().await;
        }

        if self.script.terminate_after_writes == Some(written) {
            if let Some(tx) = self.events.take() {
                let _ = tx.send(Err(RecognitionError::UpstreamTerminated(
                    "scripted hangup".to_string(),
                )));
            }
            return Ok(());
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), RecognitionError> {
        let mut log = self.log.lock().unwrap();
        log.closes += 1;

        if let Some(tx) = self.events.take() {
            for event in &self.script.on_close {
                let _ = tx.send(Ok(event.clone()));
            }
            if self.script.hold_stream_after_close {
                log.held.push(tx);
            }
        }
        Ok(())
    }
}

/// Poll `condition` until it holds, failing the test after one second
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let waited = tokio::time::timeout(Duration::from_secs(1), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "condition not reached within 1s");
}

/// Drain every event already delivered to a client
pub fn drain_events(rx: &mut mpsc::UnboundedReceiver<ClientEvent>) -> Vec<ClientEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// 16-bit mono WAV body of `seconds` of a quiet ramp
pub fn wav_bytes(sample_rate: u32, channels: u16, seconds: f64) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        let frames = (sample_rate as f64 * seconds) as usize;
        for i in 0..frames * channels as usize {
            writer.write_sample((i % 256) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}
