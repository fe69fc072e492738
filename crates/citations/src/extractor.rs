use regex::Regex;
use std::cmp::Reverse;

/// Capitalised words (lowercase connectives allowed between them) ending
/// in "Act", a section mark and a locator such as `5`, `1(4)` or `12(b)(1), 13`.
/// "under" is not a connective: "Claims under the X Act" cites the X Act.
const ACT_PATTERN: &str = r"(?:[A-Z][A-Za-z'’\-–]*\s+(?:(?:of|and|the|for|on|to|in|with|by|from|upon|against|at|a|an)\s+)*)+Act\s*(?:§|ยง){1,2}\s*\d+[A-Za-z]?(?:\([0-9A-Za-z]+\))*(?:\s*[,–\-]\s*\d+[A-Za-z]?(?:\([0-9A-Za-z]+\))*)*";

/// `<title> C.F.R. § <part>.<section>`; a trailing full stop is not part of the locator.
/// `ยง` is the section mark as it reads after a UTF-8 to TIS-620 mix-up.
const CFR_PATTERN: &str =
    r"\b\d+\s*C\.\s*F\.\s*R\.\s*(?:§|ยง){1,2}\s*\d+(?:\.\d+)*(?:\([0-9A-Za-z]+\))*";

/// Sentence words that can precede an Act name without belonging to it.
const ACT_LEADING_WORDS: &[&str] = &[
    "The", "the", "A", "An", "This", "That", "These", "Those", "Under", "Pursuant", "to", "See",
    "In", "Per", "Section", "And", "Or", "Its", "Their", "Our", "Whereas", "Both", "of",
];

/// A citation-shaped span of the source text. Offsets are byte positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationMatch {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

pub trait CitationExtractor: Send + Sync {
    /// Every match in left-to-right order, repeats included.
    fn extract(&self, text: &str) -> Vec<CitationMatch>;
}

/// One citation shape.
pub struct CitationRule {
    name: String,
    pattern: Regex,
    anchored: Regex,
    leading_words: Vec<String>,
}

impl CitationRule {
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            pattern: Regex::new(pattern)?,
            anchored: Regex::new(&format!("^(?:{pattern})$"))?,
            leading_words: Vec::new(),
        })
    }

    /// Words to trim from the front of a match, as long as what remains
    /// still matches the rule on its own.
    pub fn with_leading_words(mut self, words: &[&str]) -> Self {
        self.leading_words = words.iter().map(|w| w.to_string()).collect();
        self
    }

    pub fn act() -> Result<Self, regex::Error> {
        Ok(Self::new("act", ACT_PATTERN)?.with_leading_words(ACT_LEADING_WORDS))
    }

    pub fn cfr() -> Result<Self, regex::Error> {
        Self::new("cfr", CFR_PATTERN)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn find(&self, text: &str) -> Vec<CitationMatch> {
        self.pattern
            .find_iter(text)
            .map(|m| {
                let start = self.trim_leading(text, m.start(), m.end());
                CitationMatch {
                    text: text[start..m.end()].to_string(),
                    start,
                    end: m.end(),
                }
            })
            .collect()
    }

    fn trim_leading(&self, text: &str, start: usize, end: usize) -> usize {
        let mut best = start;
        let mut cursor = start;

        loop {
            let span = &text[cursor..end];
            let Some(word_end) = span.find(char::is_whitespace) else {
                break;
            };
            if !self.leading_words.iter().any(|w| w == &span[..word_end]) {
                break;
            }

            let rest = &span[word_end..];
            cursor += word_end + (rest.len() - rest.trim_start().len());

            if self.anchored.is_match(&text[cursor..end]) {
                best = cursor;
            }
        }

        best
    }
}

/// Regex-driven extractor over an ordered set of rules.
pub struct RegexCitationExtractor {
    rules: Vec<CitationRule>,
}

impl RegexCitationExtractor {
    pub fn new(rules: Vec<CitationRule>) -> Self {
        Self { rules }
    }

    /// Statute ("... Act § n") and federal regulation ("n C.F.R. § n.n") citations.
    pub fn legal() -> Result<Self, regex::Error> {
        Ok(Self::new(vec![CitationRule::act()?, CitationRule::cfr()?]))
    }

    pub fn with_rule(mut self, rule: CitationRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(CitationRule::name).collect()
    }
}

impl CitationExtractor for RegexCitationExtractor {
    fn extract(&self, text: &str) -> Vec<CitationMatch> {
        let mut matches: Vec<CitationMatch> =
            self.rules.iter().flat_map(|rule| rule.find(text)).collect();

        // Earliest start first; on a tie the longer span wins.
        matches.sort_by_key(|m| (m.start, Reverse(m.end)));

        let mut accepted: Vec<CitationMatch> = Vec::with_capacity(matches.len());
        for candidate in matches {
            if accepted.last().is_some_and(|prev| candidate.start < prev.end) {
                continue;
            }
            accepted.push(candidate);
        }

        accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> Vec<String> {
        RegexCitationExtractor::legal()
            .unwrap()
            .extract(text)
            .into_iter()
            .map(|m| m.text)
            .collect()
    }

    #[test]
    fn test_act_citation_drops_sentence_article() {
        assert_eq!(
            extract("The Fair Credit Act § 123 applies."),
            vec!["Fair Credit Act § 123"]
        );
    }

    #[test]
    fn test_act_with_connectives_and_subsections() {
        assert_eq!(
            extract("Claims arise under the Freedom of Information Act § 552(b)(4), 552(c) here."),
            vec!["Freedom of Information Act § 552(b)(4), 552(c)"]
        );
    }

    #[test]
    fn test_leading_preposition_chain_trimmed() {
        assert_eq!(
            extract("Pursuant to the Uniform Trade Secrets Act § 1(4) the claim fails."),
            vec!["Uniform Trade Secrets Act § 1(4)"]
        );
    }

    #[test]
    fn test_act_with_lowercase_words_in_name() {
        assert_eq!(
            extract("The Americans with Disabilities Act § 12101 applies."),
            vec!["Americans with Disabilities Act § 12101"]
        );
        assert_eq!(
            extract("Relief was denied under the Violence against Women Act § 40002."),
            vec!["Violence against Women Act § 40002"]
        );
    }

    #[test]
    fn test_under_is_not_part_of_act_name() {
        assert_eq!(
            extract("Claims under the Fair Credit Act § 123 fail."),
            vec!["Fair Credit Act § 123"]
        );
    }

    #[test]
    fn test_act_with_en_dash_in_name() {
        assert_eq!(
            extract("The Dodd–Frank Wall Street Reform Act § 1 applies."),
            vec!["Dodd–Frank Wall Street Reform Act § 1"]
        );
    }

    #[test]
    fn test_misdecoded_section_mark() {
        assert_eq!(
            extract("The Fair Credit Act ยง 123 applies."),
            vec!["Fair Credit Act ยง 123"]
        );
        assert_eq!(extract("See 16 C.F.R. ยง 444.1."), vec!["16 C.F.R. ยง 444.1"]);
    }

    #[test]
    fn test_cfr_citation() {
        assert_eq!(
            extract("See 16 C.F.R. § 444.1. Nothing else."),
            vec!["16 C.F.R. § 444.1"]
        );
    }

    #[test]
    fn test_cfr_tolerates_spacing() {
        assert_eq!(extract("per 12 C. F. R. §§1026.18"), vec!["12 C. F. R. §§1026.18"]);
    }

    #[test]
    fn test_act_spans_line_break() {
        assert_eq!(
            extract("the Sherman\nAntitrust Act §\n1 applies"),
            vec!["Sherman\nAntitrust Act §\n1"]
        );
    }

    #[test]
    fn test_order_and_repeats_preserved() {
        let text = "16 C.F.R. § 444.1 and the Clean Air Act § 7401, then 16 C.F.R. § 444.1 again.";
        assert_eq!(
            extract(text),
            vec!["16 C.F.R. § 444.1", "Clean Air Act § 7401", "16 C.F.R. § 444.1"]
        );

        let matches = RegexCitationExtractor::legal().unwrap().extract(text);
        assert!(matches.windows(2).all(|w| w[0].start < w[1].start));
    }

    #[test]
    fn test_bare_act_is_not_a_citation() {
        assert!(extract("The Act § 5 is vague.").iter().all(|c| c != "Act § 5"));
        assert!(extract("Nothing to see here.").is_empty());
        assert!(extract("Fair Credit Act without a section mark").is_empty());
    }

    #[test]
    fn test_custom_rule_extends_extractor() {
        let extractor = RegexCitationExtractor::legal()
            .unwrap()
            .with_rule(CitationRule::new("usc", r"\b\d+\s+U\.S\.C\.\s*§\s*\d+").unwrap());

        let found: Vec<String> = extractor
            .extract("Under 15 U.S.C. § 1681 and 16 C.F.R. § 444.1")
            .into_iter()
            .map(|m| m.text)
            .collect();

        assert_eq!(found, vec!["15 U.S.C. § 1681", "16 C.F.R. § 444.1"]);
        assert_eq!(extractor.rule_names(), vec!["act", "cfr", "usc"]);
    }

    #[test]
    fn test_overlapping_rules_keep_earliest_longest() {
        let extractor = RegexCitationExtractor::new(vec![
            CitationRule::new("short", r"C\.F\.R\.").unwrap(),
            CitationRule::cfr().unwrap(),
        ]);

        let found = extractor.extract("16 C.F.R. § 444.1");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text, "16 C.F.R. § 444.1");
    }
}
