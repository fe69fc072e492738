use citations::CitationAnnotator;
use extract::{
    Answer, EntityMention, ModelError, ModelInvoker, ModelTask, fuse_entities, fuse_summaries,
};
use ingest::{AudioDecoder, Chunker, DecodeError, TARGET_SAMPLE_RATE};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::AnalysisError;
use crate::request::{AnalysisRequest, AudioInput, Input};
use crate::result::AnalysisResult;
use crate::transcript::format_transcription;

/// Runs documents through chunking, the model invoker, fusion and
/// citation lookup.
///
/// Holds no mutable state; one instance can serve any number of
/// concurrent analyses. Dropping a returned future abandons the analysis,
/// including any model call in flight.
#[derive(Clone)]
pub struct Analyzer {
    invoker: Arc<dyn ModelInvoker>,
    decoder: Arc<dyn AudioDecoder>,
    citations: CitationAnnotator,
    chunker: Chunker,
}

impl Analyzer {
    pub fn new(
        invoker: Arc<dyn ModelInvoker>,
        decoder: Arc<dyn AudioDecoder>,
        citations: CitationAnnotator,
    ) -> Self {
        Self {
            invoker,
            decoder,
            citations,
            chunker: Chunker::default(),
        }
    }

    pub fn with_chunker(mut self, chunker: Chunker) -> Self {
        self.chunker = chunker;
        self
    }

    pub async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        match request.into_input()? {
            Input::Text(text) => self.analyze_text(&text).await,
            Input::Audio(audio) => self.analyze_audio(audio).await,
        }
    }

    pub async fn analyze_text(&self, text: &str) -> Result<AnalysisResult, AnalysisError> {
        let started = Instant::now();

        let (summary, entities) = self.summarize_and_tag(text).await?;
        let citations = self.citations.annotate(text).await;

        let result = AnalysisResult {
            id: Uuid::new_v4(),
            summary,
            entities,
            citations,
            original_text: text.to_string(),
        };

        log_completed(&result, "text", started);
        Ok(result)
    }

    pub async fn analyze_audio(&self, audio: AudioInput) -> Result<AnalysisResult, AnalysisError> {
        let started = Instant::now();

        let samples = self.decode(audio).await?;
        debug!(samples = samples.len(), "Audio decoded, transcribing");

        let transcription = self
            .invoker
            .transcribe(&samples, TARGET_SAMPLE_RATE)
            .await?;
        transcription.validate()?;

        // Models and citations see the plain transcript; the caller gets
        // the timestamped rendering.
        let (summary, entities) = self.summarize_and_tag(&transcription.text).await?;
        let citations = self.citations.annotate(&transcription.text).await;

        let result = AnalysisResult {
            id: Uuid::new_v4(),
            summary,
            entities,
            citations,
            original_text: format_transcription(&transcription.segments),
        };

        log_completed(&result, "audio", started);
        Ok(result)
    }

    /// Extractive question answering over caller-supplied context.
    pub async fn answer_question(
        &self,
        question: &str,
        context: &str,
    ) -> Result<Answer, AnalysisError> {
        if question.trim().is_empty() {
            return Err(AnalysisError::InvalidInput("question is empty".to_string()));
        }
        if context.trim().is_empty() {
            return Err(AnalysisError::InvalidInput("context is empty".to_string()));
        }

        Ok(self.invoker.answer(question, context).await?)
    }

    async fn summarize_and_tag(
        &self,
        text: &str,
    ) -> Result<(String, Vec<EntityMention>), AnalysisError> {
        let chunks: Vec<String> = self
            .chunker
            .chunk_text(text)
            .into_iter()
            .map(|c| c.text)
            .collect();

        debug!(chunks = chunks.len(), "Running summarizer and entity tagger");

        let (summaries, entities) = tokio::try_join!(
            self.invoker.summarize(&chunks),
            self.invoker.tag_entities(&chunks)
        )?;

        check_batch(ModelTask::Summarize, summaries.len(), chunks.len())?;
        check_batch(ModelTask::TagEntities, entities.len(), chunks.len())?;

        Ok((fuse_summaries(&summaries), fuse_entities(entities)))
    }

    async fn decode(&self, audio: AudioInput) -> Result<Vec<f32>, AnalysisError> {
        let decoder = Arc::clone(&self.decoder);
        let AudioInput { bytes, format_hint } = audio;

        let decoded = tokio::task::spawn_blocking(move || {
            decoder.decode(&bytes, format_hint.as_deref(), TARGET_SAMPLE_RATE)
        })
        .await
        .map_err(|e| DecodeError::Codec(format!("decoder task failed: {e}")))?;

        Ok(decoded?)
    }
}

fn check_batch(task: ModelTask, got: usize, expected: usize) -> Result<(), ModelError> {
    if got == expected {
        Ok(())
    } else {
        Err(ModelError::Inference(format!(
            "{task} returned {got} results for {expected} chunks"
        )))
    }
}

fn log_completed(result: &AnalysisResult, source: &str, started: Instant) {
    info!(
        analysis_id = %result.id,
        source,
        entities = result.entities.len(),
        citations = result.citations.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Analysis completed"
    );
}
