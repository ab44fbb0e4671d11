//! The unit of work passed between stages.

/// A sequence-numbered chunk of data flowing through the pipeline.
///
/// The reader assigns `sequence` in strictly increasing order starting at 0.
/// Exactly one worker owns a block at a time and replaces `payload` with the
/// transformed bytes before handing it to the reorder buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub sequence: u64,
    pub payload: Vec<u8>,
    /// Number of source bytes this block was read from.
    pub input_len: u64,
}

impl Block {
    /// Wraps freshly read source bytes; `input_len` is taken from `payload`.
    pub fn new(sequence: u64, payload: Vec<u8>) -> Self {
        let input_len = payload.len() as u64;
        Self {
            sequence,
            payload,
            input_len,
        }
    }
}

/// Items that carry their position in the output stream.
pub trait Sequenced {
    fn sequence(&self) -> u64;
}

impl Sequenced for Block {
    fn sequence(&self) -> u64 {
        self.sequence
    }
}
