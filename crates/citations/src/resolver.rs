use anyhow::Result;
use async_trait::async_trait;

/// Looks up descriptive text for a citation.
///
/// `Ok(None)` means the citation is unknown. Errors are reported to the
/// caller, which degrades them to placeholder text.
#[async_trait]
pub trait CitationResolver: Send + Sync {
    async fn lookup(&self, citation: &str) -> Result<Option<String>>;
}

/// Text reported for a citation that could not be resolved.
pub fn unavailable_text(citation: &str) -> String {
    format!("Full text for '{citation}' could not be retrieved.")
}

/// In-memory lookup table keyed by substrings of the citation.
///
/// Keys are compared with whitespace removed, so `16 C.F.R. §444.1`
/// finds an entry stored as `16 C.F.R. § 444.1`. The first matching key
/// in insertion order wins.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    entries: Vec<(String, String)>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table seeded with the built-in reference entries.
    pub fn with_defaults() -> Self {
        Self::new()
            .with_entry(
                "16 C.F.R. § 444.1",
                "16 C.F.R. § 444.1 (Credit Practices Rule, definitions): defines the terms \
                 used in the Federal Trade Commission's rule on unfair consumer credit \
                 practices, including consumer, creditor, household goods and obligation.",
            )
            .with_entry(
                "Uniform Trade Secrets Act",
                "Uniform Trade Secrets Act: model statute defining trade secrets and their \
                 misappropriation, with injunctive relief and damages as remedies.",
            )
    }

    pub fn with_entry(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(key, text);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, text: impl Into<String>) {
        self.entries.push((key.into(), text.into()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn compact(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

#[async_trait]
impl CitationResolver for StaticResolver {
    async fn lookup(&self, citation: &str) -> Result<Option<String>> {
        let citation = compact(citation);
        Ok(self
            .entries
            .iter()
            .find(|(key, _)| citation.contains(&compact(key)))
            .map(|(_, text)| text.clone()))
    }
}
