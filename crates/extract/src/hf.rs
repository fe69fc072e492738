use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::Cursor;
use std::time::Duration;
use tracing::debug;

use crate::invoker::{ModelError, ModelInvoker, ModelTask};
use crate::schema::{Answer, EntityCategory, EntityMention, TranscriptSegment, Transcription};

/// Models and generation settings for the hosted inference API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HfConfig {
    pub base_url: String,
    pub api_token: Option<String>,
    pub summarizer_model: String,
    pub ner_model: String,
    pub asr_model: String,
    pub qa_model: String,
    pub summary_max_length: u32,
    pub summary_min_length: u32,
    pub timeout_secs: u64,
}

impl Default for HfConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api-inference.huggingface.co".to_string(),
            api_token: None,
            summarizer_model: "sshleifer/distilbart-cnn-6-6".to_string(),
            ner_model: "dslim/bert-base-NER".to_string(),
            asr_model: "openai/whisper-base.en".to_string(),
            qa_model: "distilbert-base-cased-distilled-squad".to_string(),
            summary_max_length: 100,
            summary_min_length: 20,
            timeout_secs: 120,
        }
    }
}

/// `ModelInvoker` backed by the Hugging Face Inference HTTP API.
#[derive(Clone)]
pub struct HfInferenceClient {
    config: HfConfig,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct RawSummary {
    summary_text: String,
}

#[derive(Deserialize)]
struct RawEntity {
    entity_group: Option<String>,
    entity: Option<String>,
    score: f32,
    word: String,
}

/// Token classification returns a flat list for a single input and a
/// list per input for batches.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntityBatch {
    Batched(Vec<Vec<RawEntity>>),
    Flat(Vec<RawEntity>),
}

#[derive(Deserialize)]
struct RawTranscription {
    text: String,
    chunks: Option<Vec<RawTranscriptChunk>>,
}

#[derive(Deserialize)]
struct RawTranscriptChunk {
    timestamp: Vec<Option<f64>>, // [start, end]; end may be null
    text: String,
}

#[derive(Deserialize)]
struct RawAnswer {
    answer: String,
    score: f32,
}

impl HfInferenceClient {
    pub fn new(config: HfConfig) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ModelError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    async fn post<B, R>(&self, task: ModelTask, model: &str, body: &B) -> Result<R, ModelError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!(
            "{}/models/{}",
            self.config.base_url.trim_end_matches('/'),
            model
        );

        let mut request = self.client.post(&url).json(body);
        if let Some(token) = &self.config.api_token {
            request = request.bearer_auth(token);
        }

        debug!(task = %task, model, "Sending inference request");

        let response = request
            .send()
            .await
            .map_err(|e| ModelError::Unavailable(format!("{task} request to {model} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(classify_status(task, model, status, &detail));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ModelError::Unavailable(format!("{task} response from {model} was cut off: {e}")))?;

        serde_json::from_slice(&bytes).map_err(|e| {
            ModelError::Inference(format!("unexpected {task} response from {model}: {e}"))
        })
    }
}

#[async_trait]
impl ModelInvoker for HfInferenceClient {
    async fn summarize(&self, chunks: &[String]) -> Result<Vec<String>, ModelError> {
        let body = json!({
            "inputs": chunks,
            "parameters": {
                "max_length": self.config.summary_max_length,
                "min_length": self.config.summary_min_length,
                "do_sample": false,
            },
        });

        let raw: Vec<RawSummary> = self
            .post(ModelTask::Summarize, &self.config.summarizer_model, &body)
            .await?;

        Ok(raw.into_iter().map(|s| s.summary_text).collect())
    }

    async fn tag_entities(
        &self,
        chunks: &[String],
    ) -> Result<Vec<Vec<EntityMention>>, ModelError> {
        let body = json!({
            "inputs": chunks,
            "parameters": { "aggregation_strategy": "simple" },
        });

        let raw: RawEntityBatch = self
            .post(ModelTask::TagEntities, &self.config.ner_model, &body)
            .await?;

        entities_from_response(raw, chunks.len())
    }

    async fn transcribe(
        &self,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<Transcription, ModelError> {
        let wav = encode_wav(samples, sample_rate)?;
        let body = json!({
            "inputs": BASE64.encode(wav),
            "parameters": { "return_timestamps": "word" },
        });

        let raw: RawTranscription = self
            .post(ModelTask::Transcribe, &self.config.asr_model, &body)
            .await?;

        transcription_from_response(raw)
    }

    async fn answer(&self, question: &str, context: &str) -> Result<Answer, ModelError> {
        let body = json!({
            "inputs": { "question": question, "context": context },
        });

        let raw: RawAnswer = self
            .post(ModelTask::Answer, &self.config.qa_model, &body)
            .await?;

        Answer::try_new(raw.answer, raw.score)
    }
}

/// Rate limiting, cold models (503) and server faults are availability
/// problems; anything else means the request itself was rejected.
fn classify_status(
    task: ModelTask,
    model: &str,
    status: reqwest::StatusCode,
    detail: &str,
) -> ModelError {
    let message = format!("{task} request to {model} returned {status}: {detail}");
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        ModelError::Unavailable(message)
    } else {
        ModelError::Inference(message)
    }
}

fn entities_from_response(
    raw: RawEntityBatch,
    expected: usize,
) -> Result<Vec<Vec<EntityMention>>, ModelError> {
    let batches = match raw {
        RawEntityBatch::Batched(batches) if batches.is_empty() && expected == 1 => vec![Vec::new()],
        RawEntityBatch::Batched(batches) => batches,
        RawEntityBatch::Flat(list) if expected == 1 => vec![list],
        RawEntityBatch::Flat(_) => {
            return Err(ModelError::Inference(format!(
                "entity tagger returned one flat list for {expected} inputs"
            )));
        }
    };

    batches
        .into_iter()
        .map(|batch| {
            batch
                .into_iter()
                .filter_map(|raw| mention_from_raw(raw).transpose())
                .collect::<Result<Vec<_>, _>>()
        })
        .collect()
}

/// Returns `Ok(None)` for spans that are empty once WordPiece markers are removed.
fn mention_from_raw(raw: RawEntity) -> Result<Option<EntityMention>, ModelError> {
    let label = raw
        .entity_group
        .or(raw.entity)
        .ok_or_else(|| ModelError::Inference("entity without a label".to_string()))?;

    let word = raw.word.trim().trim_start_matches("##").trim();
    if word.is_empty() {
        return Ok(None);
    }

    EntityMention::try_new(word, EntityCategory::from_label(&label), raw.score).map(Some)
}

fn transcription_from_response(raw: RawTranscription) -> Result<Transcription, ModelError> {
    let segments = match raw.chunks {
        Some(chunks) => chunks
            .into_iter()
            .map(|chunk| {
                let start = chunk.timestamp.first().copied().flatten().ok_or_else(|| {
                    ModelError::Inference("transcript chunk without a start time".to_string())
                })?;
                Ok(TranscriptSegment::new(start, chunk.text))
            })
            .collect::<Result<Vec<_>, ModelError>>()?,
        // No timestamps requested or returned: one segment from the start.
        None => vec![TranscriptSegment::new(0.0, raw.text.clone())],
    };

    let transcription = Transcription {
        text: raw.text,
        segments,
    };
    transcription.validate()?;
    Ok(transcription)
}

/// Encode mono samples as 16-bit PCM WAV.
fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, ModelError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let encode_err = |e: hound::Error| ModelError::Inference(format!("failed to encode audio: {e}"));

    let mut cursor = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec).map_err(encode_err)?;
    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        writer
            .write_sample((clamped * i16::MAX as f32) as i16)
            .map_err(encode_err)?;
    }
    writer.finalize().map_err(encode_err)?;

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_entities(json: &str, expected: usize) -> Result<Vec<Vec<EntityMention>>, ModelError> {
        let raw: RawEntityBatch = serde_json::from_str(json).unwrap();
        entities_from_response(raw, expected)
    }

    #[test]
    fn test_batched_entities() {
        let json = r#"[
            [{"entity_group": "PER", "score": 0.99, "word": "Alice", "start": 0, "end": 5}],
            [{"entity_group": "ORG", "score": 0.87, "word": "Acme", "start": 3, "end": 7},
             {"entity_group": "LOC", "score": 0.75, "word": "Paris", "start": 9, "end": 14}]
        ]"#;

        let batches = parse_entities(json, 2).unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0][0].surface_form, "Alice");
        assert_eq!(batches[0][0].category, EntityCategory::Person);
        assert_eq!(batches[1][1].category, EntityCategory::Location);
    }

    #[test]
    fn test_flat_entities_for_single_chunk() {
        let json = r#"[{"entity_group": "MISC", "score": 0.5, "word": "English"}]"#;
        let batches = parse_entities(json, 1).unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0][0].category, EntityCategory::Misc);
    }

    #[test]
    fn test_empty_response_for_single_chunk() {
        let batches = parse_entities("[]", 1).unwrap();
        assert_eq!(batches, vec![Vec::<EntityMention>::new()]);
    }

    #[test]
    fn test_flat_entities_for_many_chunks_rejected() {
        let json = r#"[{"entity_group": "PER", "score": 0.5, "word": "Bob"}]"#;
        assert!(matches!(parse_entities(json, 2), Err(ModelError::Inference(_))));
    }

    #[test]
    fn test_wordpiece_marker_and_ungrouped_label() {
        let json = r###"[{"entity": "B-ORG", "score": 0.9, "word": "##Corp"},
                       {"entity": "I-ORG", "score": 0.9, "word": "##"}]"###;
        let batches = parse_entities(json, 1).unwrap();
        assert_eq!(batches[0].len(), 1);
        assert_eq!(batches[0][0].surface_form, "Corp");
        assert_eq!(batches[0][0].category, EntityCategory::Organization);
    }

    #[test]
    fn test_out_of_range_score_rejected() {
        let json = r#"[{"entity_group": "PER", "score": 3.0, "word": "Bob"}]"#;
        assert!(parse_entities(json, 1).is_err());
    }

    #[test]
    fn test_transcription_with_timestamps() {
        let raw: RawTranscription = serde_json::from_str(
            r#"{"text": " hello world", "chunks": [
                {"timestamp": [0.0, 0.5], "text": " hello"},
                {"timestamp": [0.6, null], "text": " world"}
            ]}"#,
        )
        .unwrap();

        let transcription = transcription_from_response(raw).unwrap();
        assert_eq!(transcription.text, " hello world");
        assert_eq!(transcription.segments.len(), 2);
        assert_eq!(transcription.segments[1].start, 0.6);
    }

    #[test]
    fn test_transcription_without_chunks() {
        let raw: RawTranscription = serde_json::from_str(r#"{"text": "hi there"}"#).unwrap();
        let transcription = transcription_from_response(raw).unwrap();
        assert_eq!(
            transcription.segments,
            vec![TranscriptSegment::new(0.0, "hi there")]
        );
    }

    #[test]
    fn test_transcription_missing_start_rejected() {
        let raw: RawTranscription =
            serde_json::from_str(r#"{"text": "x", "chunks": [{"timestamp": [null, 1.0], "text": "x"}]}"#)
                .unwrap();
        assert!(transcription_from_response(raw).is_err());
    }

    #[test]
    fn test_status_classification() {
        let unavailable = classify_status(
            ModelTask::Summarize,
            "m",
            reqwest::StatusCode::SERVICE_UNAVAILABLE,
            "loading",
        );
        assert!(unavailable.is_retryable());

        let limited = classify_status(
            ModelTask::Summarize,
            "m",
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            "",
        );
        assert!(limited.is_retryable());

        let rejected = classify_status(
            ModelTask::Answer,
            "m",
            reqwest::StatusCode::BAD_REQUEST,
            "bad input",
        );
        assert!(matches!(rejected, ModelError::Inference(_)));
    }

    #[test]
    fn test_encode_wav_header() {
        let wav = encode_wav(&[0.0, 0.5, -0.5, 2.0], 16_000).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        // 44-byte header plus two bytes per sample
        assert_eq!(wav.len(), 44 + 4 * 2);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unavailable() {
        let client = HfInferenceClient::new(HfConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..HfConfig::default()
        })
        .unwrap();

        let err = client.answer("q", "c").await.unwrap_err();
        assert!(err.is_retryable());
    }
}
