// Audio chunk buffer
//
// Sits between the transport and a session's recognition channel. Fragments
// are numbered and queued in the order the transport pushes them; the
// session drains the queue and forwards each chunk unmodified. The end-of-
// recording marker travels through the same queue so it can never overtake
// audio that was pushed before it.

use std::sync::Mutex;
use tokio::sync::mpsc;

use super::chunk::AudioChunk;
use crate::session::SessionError;

/// Item drained by the owning session, in push order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferedInput {
    Chunk(AudioChunk),
    End,
}

struct PushState {
    next_sequence: u64,
    ended: bool,
}

/// Producer half, held by whoever receives audio from the client
pub struct AudioChunkBuffer {
    tx: mpsc::UnboundedSender<BufferedInput>,
    state: Mutex<PushState>,
}

/// Consumer half, owned by the session coordinator
pub struct AudioChunkReceiver {
    rx: mpsc::UnboundedReceiver<BufferedInput>,
}

/// Create a connected buffer pair
pub fn audio_chunk_buffer() -> (AudioChunkBuffer, AudioChunkReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        AudioChunkBuffer {
            tx,
            state: Mutex::new(PushState {
                next_sequence: 0,
                ended: false,
            }),
        },
        AudioChunkReceiver { rx },
    )
}

impl AudioChunkBuffer {
    /// Queue one fragment, returning the sequence number it was assigned.
    ///
    /// Fails with `SessionClosed` once the end marker was pushed or the
    /// session stopped draining.
    pub fn push(&self, data: Vec<u8>) -> Result<u64, SessionError> {
        // Numbering and enqueueing happen under one lock so concurrent
        // producers cannot reorder sequence numbers.
        let mut state = self.state.lock().map_err(|_| SessionError::SessionClosed)?;
        if state.ended {
            return Err(SessionError::SessionClosed);
        }

        let sequence = state.next_sequence;
        self.tx
            .send(BufferedInput::Chunk(AudioChunk::new(sequence, data)))
            .map_err(|_| SessionError::SessionClosed)?;
        state.next_sequence += 1;

        Ok(sequence)
    }

    /// Queue the end-of-recording marker. Later pushes are rejected.
    pub fn end(&self) -> Result<(), SessionError> {
        let mut state = self.state.lock().map_err(|_| SessionError::SessionClosed)?;
        if state.ended {
            return Err(SessionError::SessionClosed);
        }
        state.ended = true;
        self.tx
            .send(BufferedInput::End)
            .map_err(|_| SessionError::SessionClosed)
    }

    /// Number of chunks accepted so far
    pub fn pushed(&self) -> u64 {
        self.state.lock().map(|s| s.next_sequence).unwrap_or(0)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed() || self.state.lock().map(|s| s.ended).unwrap_or(true)
    }
}

impl AudioChunkReceiver {
    pub async fn recv(&mut self) -> Option<BufferedInput> {
        self.rx.recv().await
    }

    /// Stop accepting input; pending pushes fail with `SessionClosed`
    pub fn close(&mut self) {
        self.rx.close();
    }
}
