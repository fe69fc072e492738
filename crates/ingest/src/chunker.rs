use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chunk::Chunk;

/// Word budget per chunk that keeps the summarizer and NER models under
/// their input limits.
pub const DEFAULT_MAX_WORDS: usize = 450;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChunkerConfig {
    pub max_words: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_words: DEFAULT_MAX_WORDS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(ChunkerConfig::default())
    }
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    /// Effective chunk size; a configured size of zero behaves as one.
    pub fn max_words(&self) -> usize {
        self.config.max_words.max(1)
    }

    /// Split `text` into consecutive chunks of at most `max_words` words.
    ///
    /// Words are whitespace-delimited and never split. Text without any
    /// words comes back as a single chunk holding the text unchanged, so
    /// callers always get at least one chunk.
    pub fn chunk_text(&self, text: &str) -> Vec<Chunk> {
        let max_words = self.max_words();
        let words: Vec<&str> = text.split_whitespace().collect();

        if words.is_empty() {
            return vec![Chunk::new(0, text.to_string(), 0, 0)];
        }

        let chunks: Vec<Chunk> = words
            .chunks(max_words)
            .enumerate()
            .map(|(index, window)| {
                Chunk::new(index, window.join(" "), index * max_words, window.len())
            })
            .collect();

        debug!(
            words = words.len(),
            chunks = chunks.len(),
            max_words,
            "Chunked document"
        );

        chunks
    }
}
