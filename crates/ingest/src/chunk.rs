use serde::{Deserialize, Serialize};

/// A run of whole words cut from a document, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
    pub word_offset: usize, // index of the first word in the source document
    pub word_count: usize,
}

impl Chunk {
    pub fn new(index: usize, text: String, word_offset: usize, word_count: usize) -> Self {
        Self {
            index,
            text,
            word_offset,
            word_count,
        }
    }

    /// Words of this chunk, split the same way the chunker split the source.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.text.split_whitespace()
    }

    pub fn is_empty(&self) -> bool {
        self.word_count == 0
    }
}
