use crate::error::AnalysisError;

/// Encoded audio as uploaded (WAV, MP3, FLAC, ...).
#[derive(Debug, Clone)]
pub struct AudioInput {
    pub bytes: Vec<u8>,
    /// File extension, if known; speeds up format detection.
    pub format_hint: Option<String>,
}

impl AudioInput {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            format_hint: None,
        }
    }

    pub fn with_format_hint(mut self, hint: impl Into<String>) -> Self {
        self.format_hint = Some(hint.into());
        self
    }
}

/// A document to analyse. Exactly one of `text` or `audio` must be set.
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    pub text: Option<String>,
    pub audio: Option<AudioInput>,
}

/// A request that passed validation.
#[derive(Debug)]
pub(crate) enum Input {
    Text(String),
    Audio(AudioInput),
}

impl AnalysisRequest {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            audio: None,
        }
    }

    pub fn audio(audio: AudioInput) -> Self {
        Self {
            text: None,
            audio: Some(audio),
        }
    }

    pub(crate) fn into_input(self) -> Result<Input, AnalysisError> {
        match (self.text, self.audio) {
            (Some(text), None) => Ok(Input::Text(text)),
            (None, Some(audio)) => Ok(Input::Audio(audio)),
            (None, None) => Err(AnalysisError::InvalidInput(
                "request carries neither text nor audio".to_string(),
            )),
            (Some(_), Some(_)) => Err(AnalysisError::InvalidInput(
                "request carries both text and audio".to_string(),
            )),
        }
    }
}
