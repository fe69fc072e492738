pub mod fuse;
pub mod hf;
pub mod invoker;
pub mod schema;

pub use fuse::{fuse_entities, fuse_summaries};
pub use hf::{HfConfig, HfInferenceClient};
pub use invoker::{ModelError, ModelInvoker, ModelTask};
pub use schema::{Answer, EntityCategory, EntityMention, TranscriptSegment, Transcription};
