pub mod extractor;
pub mod resolver;

pub use extractor::{CitationExtractor, CitationMatch, CitationRule, RegexCitationExtractor};
pub use resolver::{CitationResolver, StaticResolver, unavailable_text};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// A citation found in a document together with its looked-up text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    #[serde(rename = "citation")]
    pub raw_match: String,
    #[serde(rename = "text")]
    pub resolved_text: String,
}

/// Finds citations in a document and resolves each one.
///
/// Resolution is best effort: a failed or empty lookup yields placeholder
/// text and never fails the call.
#[derive(Clone)]
pub struct CitationAnnotator {
    extractor: Arc<dyn CitationExtractor>,
    resolver: Arc<dyn CitationResolver>,
}

impl CitationAnnotator {
    pub fn new(extractor: Arc<dyn CitationExtractor>, resolver: Arc<dyn CitationResolver>) -> Self {
        Self {
            extractor,
            resolver,
        }
    }

    /// Built-in legal patterns with the given resolver.
    pub fn legal(resolver: Arc<dyn CitationResolver>) -> Result<Self, regex::Error> {
        Ok(Self::new(
            Arc::new(RegexCitationExtractor::legal()?),
            resolver,
        ))
    }

    /// Citations in source order. Repeated citations are kept and each
    /// occurrence is looked up.
    pub async fn annotate(&self, text: &str) -> Vec<Citation> {
        let matches = self.extractor.extract(text);
        if matches.is_empty() {
            return Vec::new();
        }

        debug!(count = matches.len(), "Resolving citations");

        let resolved = join_all(matches.iter().map(|m| self.resolve(&m.text))).await;

        matches
            .into_iter()
            .zip(resolved)
            .map(|(m, resolved_text)| Citation {
                raw_match: m.text,
                resolved_text,
            })
            .collect()
    }

    async fn resolve(&self, citation: &str) -> String {
        match self.resolver.lookup(citation).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                debug!(citation, "No text found for citation");
                unavailable_text(citation)
            }
            Err(e) => {
                warn!(citation, error = %e, "Citation lookup failed");
                unavailable_text(citation)
            }
        }
    }
}
