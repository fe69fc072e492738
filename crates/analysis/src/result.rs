use citations::Citation;
use extract::EntityMention;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fused report for one analysed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(rename = "analysis_id")]
    pub id: Uuid,
    pub summary: String,
    /// First-seen order, one entry per (surface form, category).
    pub entities: Vec<EntityMention>,
    /// Source order, repeats included.
    pub citations: Vec<Citation>,
    /// The analysed text; for audio, the timestamped transcription.
    pub original_text: String,
}
