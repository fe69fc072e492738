use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::cache::CacheStats;

/// Which kind of request a timing belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Text,
    Audio,
    Question,
}

#[derive(Default)]
struct Timing {
    count: AtomicUsize,
    total_us: AtomicU64,
}

impl Timing {
    fn record(&self, duration: Duration) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    fn avg_ms(&self) -> f64 {
        let cnt = self.count.load(Ordering::Relaxed) as f64;
        if cnt > 0.0 {
            self.total_us.load(Ordering::Relaxed) as f64 / cnt / 1000.0
        } else {
            0.0
        }
    }
}

#[derive(Default)]
pub struct Metrics {
    // Counters
    total_requests: AtomicUsize,
    successful_requests: AtomicUsize,
    failed_requests: AtomicUsize,
    timed_out_requests: AtomicUsize,

    // Timing
    text: Timing,
    audio: Timing,
    question: Timing,

    // Counts
    total_entities_extracted: AtomicUsize,
    total_citations_found: AtomicUsize,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_request(&self, success: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_timeout(&self) {
        self.timed_out_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duration(&self, kind: RequestKind, duration: Duration) {
        match kind {
            RequestKind::Text => self.text.record(duration),
            RequestKind::Audio => self.audio.record(duration),
            RequestKind::Question => self.question.record(duration),
        }
    }

    pub fn record_analysis(&self, entities: usize, citations: usize) {
        self.total_entities_extracted
            .fetch_add(entities, Ordering::Relaxed);
        self.total_citations_found
            .fetch_add(citations, Ordering::Relaxed);
    }

    pub fn snapshot(&self, cache: Option<CacheStats>) -> MetricsSnapshot {
        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            timed_out_requests: self.timed_out_requests.load(Ordering::Relaxed),
            text_analyses: self.text.count.load(Ordering::Relaxed),
            audio_analyses: self.audio.count.load(Ordering::Relaxed),
            questions_answered: self.question.count.load(Ordering::Relaxed),
            avg_text_time_ms: self.text.avg_ms(),
            avg_audio_time_ms: self.audio.avg_ms(),
            avg_question_time_ms: self.question.avg_ms(),
            total_entities_extracted: self.total_entities_extracted.load(Ordering::Relaxed),
            total_citations_found: self.total_citations_found.load(Ordering::Relaxed),
            cache,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub timed_out_requests: usize,
    pub text_analyses: usize,
    pub audio_analyses: usize,
    pub questions_answered: usize,
    pub avg_text_time_ms: f64,
    pub avg_audio_time_ms: f64,
    pub avg_question_time_ms: f64,
    pub total_entities_extracted: usize,
    pub total_citations_found: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheStats>,
}

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
