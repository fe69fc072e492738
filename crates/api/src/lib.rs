//! HTTP surface for the Lexi-Synth analysis service.

pub mod cache;
pub mod config;
pub mod error;
pub mod invoker;
pub mod metrics;
pub mod retry;

use analysis::{AnalysisError, AnalysisRequest, AnalysisResult, Analyzer, Answer, AudioInput};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, rejection::JsonRejection},
    routing::{get, post},
};
use citations::{CitationAnnotator, StaticResolver};
use extract::HfInferenceClient;
use ingest::{Chunker, ChunkerConfig, SymphoniaDecoder};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::cache::Cache;
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::invoker::ServiceInvoker;
use crate::metrics::{Metrics, RequestKind, TimedOperation};
use crate::retry::RetryPolicy;

#[derive(Clone)]
pub struct AppState {
    analyzer: Arc<Analyzer>,
    metrics: Arc<Metrics>,
    cache: Option<Arc<Cache>>,
    limiter: Arc<Semaphore>,
    request_timeout: Duration,
    max_upload_bytes: usize,
    inference_url: String,
}

impl AppState {
    pub fn new(analyzer: Analyzer, config: &AppConfig) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
            metrics: Metrics::new(),
            cache: None,
            limiter: Arc::new(Semaphore::new(config.concurrency.max_concurrent_analyses.max(1))),
            request_timeout: Duration::from_secs(config.concurrency.request_timeout_secs),
            max_upload_bytes: config.server.max_upload_bytes,
            inference_url: config.models.base_url.clone(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Wires the hosted inference client, retry/cache layer, audio decoder
    /// and citation lookup into a ready-to-serve state.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        // Step 1: Model client, wrapped with retries and the chunk cache
        let client = HfInferenceClient::new(config.models.clone())?;
        let mut invoker =
            ServiceInvoker::new(Arc::new(client), RetryPolicy::from_config(&config.retry));
        let cache = config
            .cache
            .enabled
            .then(|| Arc::new(Cache::new(config.cache.max_entries)));
        if let Some(cache) = &cache {
            invoker = invoker.with_cache(Arc::clone(cache));
        }

        // Step 2: Citation lookup table
        let mut resolver = StaticResolver::with_defaults();
        for (key, text) in &config.citations.entries {
            resolver.insert(key.clone(), text.clone());
        }
        let citations = CitationAnnotator::legal(Arc::new(resolver))?;

        // Step 3: Orchestrator
        let analyzer = Analyzer::new(Arc::new(invoker), Arc::new(SymphoniaDecoder::new()), citations)
            .with_chunker(Chunker::new(ChunkerConfig {
                max_words: config.analysis.chunk_max_words,
            }));

        let state = Self::new(analyzer, config);
        Ok(match cache {
            Some(cache) => state.with_cache(cache),
            None => state,
        })
    }

    /// Runs one request under the concurrency limit and timeout, recording
    /// its outcome. Dropping the future on timeout abandons in-flight
    /// model calls.
    async fn run<T, F>(&self, kind: RequestKind, work: F) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, AnalysisError>>,
    {
        let timer = TimedOperation::start();

        // The timeout covers queueing for a permit as well as the work.
        let limited = async {
            let _permit = self.limiter.acquire().await.map_err(|_| {
                ApiError::Analysis(AnalysisError::ModelUnavailable(
                    "service is shutting down".to_string(),
                ))
            })?;
            work.await.map_err(ApiError::from)
        };

        let outcome = match tokio::time::timeout(self.request_timeout, limited).await {
            Ok(result) => result,
            Err(_) => {
                self.metrics.record_timeout();
                Err(ApiError::Timeout(self.request_timeout.as_secs()))
            }
        };

        self.metrics.record_request(outcome.is_ok());
        self.metrics.record_duration(kind, timer.elapsed());
        outcome
    }
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/metrics", get(get_metrics))
        .route("/analyze-text", post(analyze_text))
        .route("/analyze-text/", post(analyze_text))
        .route("/analyze-audio", post(analyze_audio))
        .route("/analyze-audio/", post(analyze_audio))
        .route("/answer-question", post(answer_question))
        .route("/answer-question/", post(answer_question))
        .layer(body_limit)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub filename: String,
    #[serde(flatten)]
    pub result: AnalysisResult,
}

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub question: String,
    pub context: String,
}

struct Upload {
    filename: String,
    bytes: Vec<u8>,
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to Lexi-Synth. The API is running." }))
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "status": "ok", "inference_url": state.inference_url }))
}

async fn get_metrics(State(state): State<AppState>) -> Json<metrics::MetricsSnapshot> {
    let cache = state.cache.as_ref().map(|c| c.stats());
    Json(state.metrics.snapshot(cache))
}

async fn analyze_text(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let upload = read_upload(&mut multipart).await?;
    let text = ingest::decode_text(&upload.bytes);
    debug!(filename = %upload.filename, chars = text.len(), "Text upload received");

    let result = state
        .run(
            RequestKind::Text,
            state.analyzer.analyze(AnalysisRequest::text(text)),
        )
        .await?;

    Ok(Json(respond(&state, upload.filename, result)))
}

async fn analyze_audio(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let upload = read_upload(&mut multipart).await?;
    debug!(filename = %upload.filename, bytes = upload.bytes.len(), "Audio upload received");

    let mut audio = AudioInput::new(upload.bytes);
    if let Some(ext) = Path::new(&upload.filename).extension().and_then(|e| e.to_str()) {
        audio = audio.with_format_hint(ext.to_ascii_lowercase());
    }

    let result = state
        .run(
            RequestKind::Audio,
            state.analyzer.analyze(AnalysisRequest::audio(audio)),
        )
        .await?;

    Ok(Json(respond(&state, upload.filename, result)))
}

async fn answer_question(
    State(state): State<AppState>,
    body: Result<Json<QuestionRequest>, JsonRejection>,
) -> Result<Json<Answer>, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let answer = state
        .run(
            RequestKind::Question,
            state.analyzer.answer_question(&req.question, &req.context),
        )
        .await?;

    Ok(Json(answer))
}

fn respond(state: &AppState, filename: String, result: AnalysisResult) -> AnalysisResponse {
    state
        .metrics
        .record_analysis(result.entities.len(), result.citations.len());
    info!(
        analysis_id = %result.id,
        filename = %filename,
        "Analysis returned"
    );
    AnalysisResponse { filename, result }
}

/// Pulls the `file` field out of a multipart body; other fields are ignored.
async fn read_upload(multipart: &mut Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let bytes = field.bytes().await?;
        return Ok(Upload {
            filename,
            bytes: bytes.to_vec(),
        });
    }
    Err(ApiError::BadRequest(
        "missing multipart field 'file'".to_string(),
    ))
}
