use extract::ModelError;
use ingest::DecodeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The request did not carry exactly one of text or audio.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("inference failed: {0}")]
    Inference(String),
}

impl AnalysisError {
    /// Callers may retry with backoff only when a model was unreachable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ModelUnavailable(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::Decode(_) => "decode_error",
            Self::ModelUnavailable(_) => "model_unavailable",
            Self::Inference(_) => "inference_error",
        }
    }
}

impl From<ModelError> for AnalysisError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Unavailable(msg) => Self::ModelUnavailable(msg),
            ModelError::Inference(msg) => Self::Inference(msg),
        }
    }
}
