/// One captured audio fragment, tagged with its arrival sequence number.
///
/// Chunks are immutable once created: the buffer hands them to the
/// recognition channel exactly as the transport delivered them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    sequence: u64,
    data: Vec<u8>,
}

impl AudioChunk {
    pub fn new(sequence: u64, data: Vec<u8>) -> Self {
        Self { sequence, data }
    }

    /// Position of this chunk in its session's arrival order (0-indexed)
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Raw bytes as received from the client
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
