use async_trait::async_trait;
use extract::{Answer, EntityMention, ModelError, ModelInvoker, ModelTask, Transcription};
use std::sync::Arc;
use tracing::debug;

use crate::cache::Cache;
use crate::retry::RetryPolicy;

/// Wraps a model invoker with per-chunk caching and retries on
/// `ModelError::Unavailable`.
pub struct ServiceInvoker {
    inner: Arc<dyn ModelInvoker>,
    retry: RetryPolicy,
    cache: Option<Arc<Cache>>,
}

impl ServiceInvoker {
    pub fn new(inner: Arc<dyn ModelInvoker>, retry: RetryPolicy) -> Self {
        Self {
            inner,
            retry,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<Cache>) -> Self {
        self.cache = Some(cache);
        self
    }
}

#[async_trait]
impl ModelInvoker for ServiceInvoker {
    async fn summarize(&self, chunks: &[String]) -> Result<Vec<String>, ModelError> {
        let cached: Vec<Option<String>> = match &self.cache {
            Some(cache) => chunks.iter().map(|c| cache.get_summary(c)).collect(),
            None => vec![None; chunks.len()],
        };
        let misses = missing(chunks, &cached);

        let fresh = if misses.is_empty() {
            Vec::new()
        } else {
            self.retry
                .retry_if(
                    ModelTask::Summarize.as_str(),
                    || self.inner.summarize(&misses),
                    ModelError::is_retryable,
                )
                .await?
        };

        let merged = merge(ModelTask::Summarize, cached, fresh.clone())?;
        if let Some(cache) = &self.cache {
            for (chunk, summary) in misses.iter().zip(fresh) {
                cache.set_summary(chunk, summary);
            }
        }
        Ok(merged)
    }

    async fn tag_entities(
        &self,
        chunks: &[String],
    ) -> Result<Vec<Vec<EntityMention>>, ModelError> {
        let cached: Vec<Option<Vec<EntityMention>>> = match &self.cache {
            Some(cache) => chunks.iter().map(|c| cache.get_entities(c)).collect(),
            None => vec![None; chunks.len()],
        };
        let misses = missing(chunks, &cached);

        let fresh = if misses.is_empty() {
            Vec::new()
        } else {
            self.retry
                .retry_if(
                    ModelTask::TagEntities.as_str(),
                    || self.inner.tag_entities(&misses),
                    ModelError::is_retryable,
                )
                .await?
        };

        let merged = merge(ModelTask::TagEntities, cached, fresh.clone())?;
        if let Some(cache) = &self.cache {
            for (chunk, entities) in misses.iter().zip(fresh) {
                cache.set_entities(chunk, entities);
            }
        }
        Ok(merged)
    }

    async fn transcribe(
        &self,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<Transcription, ModelError> {
        self.retry
            .retry_if(
                ModelTask::Transcribe.as_str(),
                || self.inner.transcribe(samples, sample_rate),
                ModelError::is_retryable,
            )
            .await
    }

    async fn answer(&self, question: &str, context: &str) -> Result<Answer, ModelError> {
        self.retry
            .retry_if(
                ModelTask::Answer.as_str(),
                || self.inner.answer(question, context),
                ModelError::is_retryable,
            )
            .await
    }
}

fn missing<T>(chunks: &[String], cached: &[Option<T>]) -> Vec<String> {
    chunks
        .iter()
        .zip(cached)
        .filter(|(_, hit)| hit.is_none())
        .map(|(chunk, _)| chunk.clone())
        .collect()
}

/// Fills the cache misses, in order, from the freshly computed batch.
fn merge<T>(task: ModelTask, cached: Vec<Option<T>>, fresh: Vec<T>) -> Result<Vec<T>, ModelError> {
    let expected = cached.iter().filter(|c| c.is_none()).count();
    if fresh.len() != expected {
        return Err(ModelError::Inference(format!(
            "{task} returned {} results for {expected} chunks",
            fresh.len()
        )));
    }

    debug!(
        task = task.as_str(),
        hits = cached.len() - expected,
        misses = expected,
        "Merged cached model outputs"
    );

    let mut fresh = fresh.into_iter();
    Ok(cached
        .into_iter()
        .filter_map(|hit| hit.or_else(|| fresh.next()))
        .collect())
}
