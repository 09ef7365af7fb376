//! Swappable lexical heuristics
//!
//! Every keyword-driven decision in the orchestrator goes through one of the
//! traits in this module, so a statistical or learned scorer can replace the
//! lexical tables without touching orchestration logic.

use crate::error::Result;
use crate::intelligence::conflict::ConflictSeverity;
use crate::methodology::Criterion;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// How a [`Lexicon`] term matches text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Plain case-insensitive substring
    Substring,
    /// Case-insensitive match anchored at a word start ("prioritize" does not match "deprioritize")
    WordStart,
}

/// A fixed vocabulary of lowercase terms
#[derive(Debug, Clone)]
pub struct Lexicon {
    terms: Vec<String>,
    patterns: Vec<Regex>,
    mode: MatchMode,
}

impl Lexicon {
    /// Substring lexicon
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            terms: terms.into_iter().map(|t| t.as_ref().to_lowercase()).collect(),
            patterns: Vec::new(),
            mode: MatchMode::Substring,
        }
    }

    /// Word-start lexicon
    pub fn word_start<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms: Vec<String> = terms.into_iter().map(|t| t.as_ref().to_lowercase()).collect();
        let patterns = terms
            .iter()
            .filter_map(|t| Regex::new(&format!(r"(?i)\b{}", regex::escape(t))).ok())
            .collect();
        Self {
            terms,
            patterns,
            mode: MatchMode::WordStart,
        }
    }

    /// Vocabulary terms
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Match mode
    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Number of distinct terms found in `text`
    pub fn hits(&self, text: &str) -> usize {
        match self.mode {
            MatchMode::Substring => {
                let lower = text.to_lowercase();
                self.terms.iter().filter(|t| lower.contains(t.as_str())).count()
            }
            MatchMode::WordStart => self.patterns.iter().filter(|p| p.is_match(text)).count(),
        }
    }

    /// Whether any term is found in `text`
    pub fn any(&self, text: &str) -> bool {
        match self.mode {
            MatchMode::Substring => {
                let lower = text.to_lowercase();
                self.terms.iter().any(|t| lower.contains(t.as_str()))
            }
            MatchMode::WordStart => self.patterns.iter().any(|p| p.is_match(text)),
        }
    }
}

/// Consultation domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    /// Business strategy, pricing and sales
    BusinessStrategySales,
    /// Design and visual identity
    DesignVisual,
    /// Technical architecture
    TechnicalArchitecture,
    /// Content and communication
    ContentCommunication,
    /// Analysis and operations
    AnalysisOperations,
}

impl Domain {
    /// All domains in detection order
    pub const ALL: [Domain; 5] = [
        Domain::BusinessStrategySales,
        Domain::DesignVisual,
        Domain::TechnicalArchitecture,
        Domain::ContentCommunication,
        Domain::AnalysisOperations,
    ];
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Domain::BusinessStrategySales => "business_strategy_sales",
            Domain::DesignVisual => "design_visual",
            Domain::TechnicalArchitecture => "technical_architecture",
            Domain::ContentCommunication => "content_communication",
            Domain::AnalysisOperations => "analysis_operations",
        };
        write!(f, "{}", name)
    }
}

/// Detects which domains a text touches
pub trait DomainDetector: Send + Sync {
    /// Domains present in `text`; may be empty
    fn detect(&self, text: &str) -> Vec<Domain>;

    /// Number of complexity keywords present in `text`
    fn keyword_hits(&self, text: &str) -> usize;
}

/// Keyword-table domain detector
#[derive(Debug, Clone)]
pub struct LexicalDomainDetector {
    domains: Vec<(Domain, Lexicon)>,
    complexity: Lexicon,
}

impl Default for LexicalDomainDetector {
    fn default() -> Self {
        Self {
            domains: vec![
                (
                    Domain::BusinessStrategySales,
                    Lexicon::new(["pricing", "sales", "proposal", "client", "business"]),
                ),
                (
                    Domain::DesignVisual,
                    Lexicon::new(["design", "visual", "brand", "logo", "website", "ui", "ux"]),
                ),
                (
                    Domain::TechnicalArchitecture,
                    Lexicon::new(["technical", "performance", "seo", "accessibility", "responsive"]),
                ),
                (
                    Domain::ContentCommunication,
                    Lexicon::new(["content", "copy", "marketing", "social", "email"]),
                ),
                (
                    Domain::AnalysisOperations,
                    Lexicon::new(["research", "analysis", "operations", "project", "conversion"]),
                ),
            ],
            complexity: Lexicon::new([
                "brand", "design", "marketing", "sales", "pricing", "strategy", "website",
                "technical", "user", "content", "social", "email",
            ]),
        }
    }
}

impl DomainDetector for LexicalDomainDetector {
    fn detect(&self, text: &str) -> Vec<Domain> {
        self.domains
            .iter()
            .filter(|(_, lexicon)| lexicon.any(text))
            .map(|(domain, _)| *domain)
            .collect()
    }

    fn keyword_hits(&self, text: &str) -> usize {
        self.complexity.hits(text)
    }
}

/// Decides whether two recommendations disagree, and how badly
pub trait DisagreementDetector: Send + Sync {
    /// Whether the two texts disagree
    fn disagree(&self, a: &str, b: &str) -> bool;

    /// Severity of a disagreement between the two texts
    fn severity(&self, a: &str, b: &str) -> ConflictSeverity;
}

/// Opposing-indicator-pair detector
#[derive(Debug, Clone)]
pub struct IndicatorPairDetector {
    pairs: Vec<(Lexicon, Lexicon)>,
    high_impact: Lexicon,
}

impl Default for IndicatorPairDetector {
    fn default() -> Self {
        let pairs = [
            ("increase", "decrease"),
            ("focus on", "avoid"),
            ("prioritize", "deprioritize"),
            ("aggressive", "conservative"),
            ("immediate", "gradual"),
        ]
        .into_iter()
        .map(|(a, b)| (Lexicon::word_start([a]), Lexicon::word_start([b])))
        .collect();

        Self {
            pairs,
            high_impact: Lexicon::new(["critical", "urgent", "essential", "must", "required"]),
        }
    }
}

impl DisagreementDetector for IndicatorPairDetector {
    fn disagree(&self, a: &str, b: &str) -> bool {
        self.pairs.iter().any(|(left, right)| {
            (left.any(a) && right.any(b)) || (right.any(a) && left.any(b))
        })
    }

    fn severity(&self, a: &str, b: &str) -> ConflictSeverity {
        if self.high_impact.any(a) || self.high_impact.any(b) {
            ConflictSeverity::High
        } else {
            ConflictSeverity::Moderate
        }
    }
}

/// Scores one rubric criterion against responder output
pub trait CriterionScorer: Send + Sync {
    /// Score in `[0, 1]`
    fn score(&self, criterion: &Criterion, text: &str) -> Result<f64>;
}

/// Indicator-count scorer: `min(hits / normalizer, 1.0)`
#[derive(Debug, Clone, Copy, Default)]
pub struct IndicatorCountScorer;

impl CriterionScorer for IndicatorCountScorer {
    fn score(&self, criterion: &Criterion, text: &str) -> Result<f64> {
        let hits = criterion.vocabulary.hits(text) as f64;
        let normalizer = criterion.normalizer.max(1.0);
        Ok((hits / normalizer).min(1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_start_ignores_embedded_terms() {
        let lexicon = Lexicon::word_start(["prioritize"]);
        assert!(lexicon.any("We should Prioritize enterprise"));
        assert!(!lexicon.any("deprioritize hourly work"));

        let aggressive = Lexicon::word_start(["aggressive"]);
        assert!(aggressive.any("aggressively increase pricing"));
    }

    #[test]
    fn test_substring_hits_count_distinct_terms() {
        let lexicon = Lexicon::new(["roi", "business results"]);
        assert_eq!(lexicon.hits("ROI and Business Results, more ROI"), 2);
        assert_eq!(lexicon.hits("nothing here"), 0);
    }

    #[test]
    fn test_domain_detection() {
        let detector = LexicalDomainDetector::default();
        let domains = detector.detect("redesign the website and email marketing");
        assert_eq!(
            domains,
            vec![Domain::DesignVisual, Domain::ContentCommunication]
        );
        assert!(detector.detect("hello").is_empty());
    }

    #[test]
    fn test_indicator_pairs_either_order() {
        let detector = IndicatorPairDetector::default();
        let rec1 = "We should aggressively increase pricing";
        let rec2 = "Recommend a conservative, gradual rollout";

        assert!(detector.disagree(rec1, rec2));
        assert!(detector.disagree(rec2, rec1));
        assert_eq!(detector.severity(rec1, rec2), ConflictSeverity::Moderate);
        assert_eq!(
            detector.severity("This is critical: increase pricing", rec2),
            ConflictSeverity::High
        );
    }

    #[test]
    fn test_no_disagreement_without_pair() {
        let detector = IndicatorPairDetector::default();
        assert!(!detector.disagree("Increase prices", "Increase the budget"));
        assert!(!detector.disagree("Prioritize enterprise", "Emphasize value framing"));
        assert!(!detector.disagree("deprioritize hourly billing", "deprioritize discounts"));
    }
}
