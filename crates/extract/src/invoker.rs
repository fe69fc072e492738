use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

use crate::schema::{Answer, EntityMention, Transcription};

#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// The model could not be reached or is temporarily overloaded.
    #[error("model unavailable: {0}")]
    Unavailable(String),

    /// The model answered, but the call failed or its output was malformed.
    #[error("inference failed: {0}")]
    Inference(String),
}

impl ModelError {
    /// Only availability failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelTask {
    Summarize,
    TagEntities,
    Transcribe,
    Answer,
}

impl ModelTask {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Summarize => "summarize",
            Self::TagEntities => "tag_entities",
            Self::Transcribe => "transcribe",
            Self::Answer => "answer",
        }
    }
}

impl fmt::Display for ModelTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pretrained model capabilities the analysis pipeline depends on.
///
/// Implementations are shared between concurrent analyses and must not
/// assume exclusive access. Batch methods return exactly one result per
/// input chunk, in input order.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    async fn summarize(&self, chunks: &[String]) -> Result<Vec<String>, ModelError>;

    async fn tag_entities(&self, chunks: &[String])
    -> Result<Vec<Vec<EntityMention>>, ModelError>;

    /// `samples` are mono PCM at `sample_rate`.
    async fn transcribe(&self, samples: &[f32], sample_rate: u32)
    -> Result<Transcription, ModelError>;

    async fn answer(&self, question: &str, context: &str) -> Result<Answer, ModelError>;
}
