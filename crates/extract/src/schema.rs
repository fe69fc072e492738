use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::invoker::ModelError;

/// Semantic class assigned to an entity mention by the tagging model.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityCategory {
    Person,
    Organization,
    Location,
    Misc,
    Other(String),
}

impl EntityCategory {
    /// Parse a tagger label. IOB prefixes (`B-`, `I-`) are ignored.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        let bare = label
            .strip_prefix("B-")
            .or_else(|| label.strip_prefix("I-"))
            .unwrap_or(label);

        match bare.to_ascii_uppercase().as_str() {
            "PER" | "PERSON" => Self::Person,
            "ORG" | "ORGANIZATION" | "ORGANISATION" => Self::Organization,
            "LOC" | "LOCATION" => Self::Location,
            "MISC" | "MISCELLANEOUS" => Self::Misc,
            _ => Self::Other(bare.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Person => "PER",
            Self::Organization => "ORG",
            Self::Location => "LOC",
            Self::Misc => "MISC",
            Self::Other(label) => label,
        }
    }
}

impl fmt::Display for EntityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for EntityCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for EntityCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Self::from_label(&label))
    }
}

/// One tagged span. Field names on the wire follow the dashboard's format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMention {
    #[serde(rename = "entity_group")]
    pub category: EntityCategory,
    #[serde(rename = "score")]
    pub confidence: f32,
    #[serde(rename = "word")]
    pub surface_form: String,
}

impl EntityMention {
    pub fn new(surface_form: impl Into<String>, category: EntityCategory, confidence: f32) -> Self {
        Self {
            category,
            confidence,
            surface_form: surface_form.into(),
        }
    }

    /// Build a mention from model output, rejecting out-of-range scores.
    pub fn try_new(
        surface_form: impl Into<String>,
        category: EntityCategory,
        confidence: f32,
    ) -> Result<Self, ModelError> {
        check_confidence(confidence)?;
        Ok(Self::new(surface_form, category, confidence))
    }
}

/// A timed piece of a transcription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64, // seconds from the beginning of the audio
    pub text: String,
}

impl TranscriptSegment {
    pub fn new(start: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    pub text: String,
    pub segments: Vec<TranscriptSegment>,
}

impl Transcription {
    pub fn validate(&self) -> Result<(), ModelError> {
        match self
            .segments
            .iter()
            .find(|s| !s.start.is_finite() || s.start < 0.0)
        {
            Some(bad) => Err(ModelError::Inference(format!(
                "transcript segment has invalid start time {}",
                bad.start
            ))),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    #[serde(rename = "score")]
    pub confidence: f32,
}

impl Answer {
    pub fn try_new(answer: impl Into<String>, confidence: f32) -> Result<Self, ModelError> {
        check_confidence(confidence)?;
        Ok(Self {
            answer: answer.into(),
            confidence,
        })
    }
}

fn check_confidence(confidence: f32) -> Result<(), ModelError> {
    if confidence.is_finite() && (0.0..=1.0).contains(&confidence) {
        Ok(())
    } else {
        Err(ModelError::Inference(format!(
            "confidence {confidence} outside [0, 1]"
        )))
    }
}
