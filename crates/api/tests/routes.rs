use analysis::Analyzer;
use api::config::AppConfig;
use api::{AppState, build_router};
use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use citations::{CitationAnnotator, StaticResolver};
use extract::{
    Answer, EntityCategory, EntityMention, ModelError, ModelInvoker, TranscriptSegment,
    Transcription,
};
use http_body_util::BodyExt;
use ingest::{AudioDecoder, DecodeError};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

#[derive(Clone, Copy, PartialEq)]
enum Mode {
    Normal,
    Unavailable,
    Hang,
}

struct StubInvoker {
    mode: Mode,
}

impl StubInvoker {
    async fn gate(&self) -> Result<(), ModelError> {
        match self.mode {
            Mode::Normal => Ok(()),
            Mode::Unavailable => Err(ModelError::Unavailable("model is loading".to_string())),
            Mode::Hang => std::future::pending().await,
        }
    }
}

#[async_trait]
impl ModelInvoker for StubInvoker {
    async fn summarize(&self, chunks: &[String]) -> Result<Vec<String>, ModelError> {
        self.gate().await?;
        Ok(chunks.iter().map(|_| "A short summary.".to_string()).collect())
    }

    async fn tag_entities(
        &self,
        chunks: &[String],
    ) -> Result<Vec<Vec<EntityMention>>, ModelError> {
        self.gate().await?;
        Ok(chunks
            .iter()
            .map(|_| vec![EntityMention::new("Acme Corp", EntityCategory::Organization, 0.98)])
            .collect())
    }

    async fn transcribe(&self, _: &[f32], _: u32) -> Result<Transcription, ModelError> {
        self.gate().await?;
        Ok(Transcription {
            text: "hello world".to_string(),
            segments: vec![
                TranscriptSegment::new(0.0, "hello "),
                TranscriptSegment::new(0.6, "world"),
            ],
        })
    }

    async fn answer(&self, _: &str, _: &str) -> Result<Answer, ModelError> {
        self.gate().await?;
        Answer::try_new("Acme Corp", 0.87)
    }
}

/// Accepts anything starting with "RIFF"; everything else is undecodable.
struct StubDecoder;

impl AudioDecoder for StubDecoder {
    fn decode(&self, bytes: &[u8], _: Option<&str>, _: u32) -> Result<Vec<f32>, DecodeError> {
        if bytes.starts_with(b"RIFF") {
            Ok(vec![0.0; 1600])
        } else {
            Err(DecodeError::Probe("unknown container".to_string()))
        }
    }
}

fn app_with(mode: Mode, config: AppConfig) -> Router {
    let citations = CitationAnnotator::legal(Arc::new(StaticResolver::with_defaults())).unwrap();
    let analyzer = Analyzer::new(Arc::new(StubInvoker { mode }), Arc::new(StubDecoder), citations);
    build_router(AppState::new(analyzer, &config))
}

fn app(mode: Mode) -> Router {
    app_with(mode, AppConfig::default())
}

fn upload(uri: &str, field: &str, filename: &str, content: &[u8]) -> Request<Body> {
    let boundary = "lexisynth-test-boundary";
    let mut body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", format!("multipart/form-data; boundary={boundary}"))
        .body(Body::from(body))
        .unwrap()
}

fn question(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/answer-question/")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn root_reports_running() {
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let (status, body) = send(app(Mode::Normal), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Welcome to Lexi-Synth. The API is running.");
}

#[tokio::test]
async fn health_reports_inference_url() {
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(app(Mode::Normal), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["inference_url"], "https://api-inference.huggingface.co");
}

#[tokio::test]
async fn analyze_text_returns_fused_report() {
    let text = "Acme Corp relies on the Uniform Trade Secrets Act § 1(4).";
    let request = upload("/analyze-text/", "file", "contract.txt", text.as_bytes());
    let (status, body) = send(app(Mode::Normal), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["filename"], "contract.txt");
    assert_eq!(body["summary"], "A short summary.");
    assert_eq!(body["original_text"], text);
    assert_eq!(body["entities"][0]["word"], "Acme Corp");
    assert_eq!(body["entities"][0]["entity_group"], "ORG");
    assert_eq!(body["citations"][0]["citation"], "Uniform Trade Secrets Act § 1(4)");
    assert!(body["analysis_id"].as_str().is_some_and(|id| id.len() == 36));
}

#[tokio::test]
async fn routes_accept_missing_trailing_slash() {
    let request = upload("/analyze-text", "file", "a.txt", b"plain words");
    let (status, _) = send(app(Mode::Normal), request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn invalid_utf8_is_replaced_not_rejected() {
    let request = upload("/analyze-text/", "file", "latin1.txt", b"caf\xe9 menu");
    let (status, body) = send(app(Mode::Normal), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["original_text"], "caf\u{FFFD} menu");
}

#[tokio::test]
async fn upload_without_file_field_is_bad_request() {
    let request = upload("/analyze-text/", "document", "a.txt", b"text");
    let (status, body) = send(app(Mode::Normal), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("file"));
}

#[tokio::test]
async fn analyze_audio_returns_timestamped_transcript() {
    let request = upload("/analyze-audio/", "file", "memo.wav", b"RIFF....WAVE");
    let (status, body) = send(app(Mode::Normal), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["filename"], "memo.wav");
    assert_eq!(body["original_text"], "[0000.000] hello [0000.600] world");
}

#[tokio::test]
async fn undecodable_audio_is_unprocessable() {
    let request = upload("/analyze-audio/", "file", "notes.txt", b"not audio at all");
    let (status, body) = send(app(Mode::Normal), request).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn model_outage_is_service_unavailable() {
    let request = upload("/analyze-text/", "file", "a.txt", b"some text");
    let (status, body) = send(app(Mode::Unavailable), request).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["detail"].as_str().unwrap().contains("model is loading"));
}

#[tokio::test]
async fn slow_analysis_times_out() {
    let mut config = AppConfig::default();
    config.concurrency.request_timeout_secs = 0;

    let request = upload("/analyze-text/", "file", "a.txt", b"some text");
    let (status, _) = send(app_with(Mode::Hang, config), request).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn answer_question_returns_span_and_score() {
    let request = question(json!({
        "question": "Who relies on the act?",
        "context": "Acme Corp relies on the act."
    }));
    let (status, body) = send(app(Mode::Normal), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], "Acme Corp");
    assert!((body["score"].as_f64().unwrap() - 0.87).abs() < 1e-6);
}

#[tokio::test]
async fn blank_question_is_bad_request() {
    let request = question(json!({ "question": " ", "context": "text" }));
    let (status, body) = send(app(Mode::Normal), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn malformed_question_body_is_bad_request() {
    let request = question(json!({ "question": "missing context" }));
    let (status, body) = send(app(Mode::Normal), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn metrics_count_requests() {
    let app = app(Mode::Normal);

    let request = upload("/analyze-text/", "file", "a.txt", b"Acme Corp text");
    let (status, _) = send(app.clone(), request).await;
    assert_eq!(status, StatusCode::OK);

    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_requests"], 1);
    assert_eq!(body["successful_requests"], 1);
    assert_eq!(body["text_analyses"], 1);
    assert_eq!(body["total_entities_extracted"], 1);
}
