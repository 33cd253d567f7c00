//! Document Classification
//!
//! Decides whether an over-quota document looks like an academic paper, in
//! which case its key sections are worth extracting before falling back to
//! chunking.

use serde::{Deserialize, Serialize};

/// Minimum indicator score for a document to count as academic
pub const ACADEMIC_THRESHOLD: u8 = 3;

/// Pluggable scoring strategy consulted by the orchestrator
pub trait DocumentClassifier: Send + Sync {
    /// Heuristic score; higher means more paper-like
    fn score(&self, text: &str) -> u8;

    fn threshold(&self) -> u8 {
        ACADEMIC_THRESHOLD
    }

    fn is_academic(&self, text: &str) -> bool {
        self.score(text) >= self.threshold()
    }
}

/// Presence of the usual structural keywords of a research paper
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicIndicators {
    pub has_abstract: bool,
    pub has_introduction: bool,
    /// "references" or "bibliography"
    pub has_references: bool,
    pub has_conclusion: bool,
    /// "method" or "experiment"
    pub has_method: bool,
}

impl AcademicIndicators {
    /// Case-insensitive substring scan
    pub fn detect(text: &str) -> Self {
        let lower = text.to_lowercase();
        Self {
            has_abstract: lower.contains("abstract"),
            has_introduction: lower.contains("introduction"),
            has_references: lower.contains("references") || lower.contains("bibliography"),
            has_conclusion: lower.contains("conclusion"),
            has_method: lower.contains("method") || lower.contains("experiment"),
        }
    }

    pub fn score(&self) -> u8 {
        [
            self.has_abstract,
            self.has_introduction,
            self.has_references,
            self.has_conclusion,
            self.has_method,
        ]
        .iter()
        .filter(|present| **present)
        .count() as u8
    }
}

/// Default classifier: one point per indicator keyword group
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl DocumentClassifier for KeywordClassifier {
    fn score(&self, text: &str) -> u8 {
        AcademicIndicators::detect(text).score()
    }
}

/// Classification result for display
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationReport {
    pub indicators: AcademicIndicators,
    pub score: u8,
    pub threshold: u8,
    pub is_academic: bool,
}

impl ClassificationReport {
    pub fn new(text: &str) -> Self {
        let indicators = AcademicIndicators::detect(text);
        let score = indicators.score();
        Self {
            indicators,
            score,
            threshold: ACADEMIC_THRESHOLD,
            is_academic: score >= ACADEMIC_THRESHOLD,
        }
    }
}
