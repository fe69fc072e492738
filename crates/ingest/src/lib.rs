pub mod audio;
pub mod chunk;
pub mod chunker;
pub mod reader;

pub use audio::{AudioDecoder, DecodeError, SymphoniaDecoder, TARGET_SAMPLE_RATE};
pub use chunk::Chunk;
pub use chunker::{Chunker, ChunkerConfig, DEFAULT_MAX_WORDS};
pub use reader::decode_text;
