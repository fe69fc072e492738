//! Document analysis pipeline: chunk a document, run the summarizer and
//! entity tagger over the chunks, fuse their outputs and attach resolved
//! legal citations.

pub mod error;
pub mod orchestrator;
pub mod request;
pub mod result;
pub mod transcript;

pub use error::AnalysisError;
pub use orchestrator::Analyzer;
pub use request::{AnalysisRequest, AudioInput};
pub use result::AnalysisResult;
pub use transcript::format_transcription;

pub use citations::Citation;
pub use extract::{Answer, EntityCategory, EntityMention};
