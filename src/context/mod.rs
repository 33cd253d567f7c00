//! Context Management Module
//!
//! Everything that decides how much of a summarizer's input window a text
//! costs and what kind of document it is.

pub mod classification;
pub mod quota;
pub mod tokens;

// Re-export public types for external use
pub use classification::{
    AcademicIndicators, ClassificationReport, DocumentClassifier, KeywordClassifier,
    ACADEMIC_THRESHOLD,
};
pub use quota::{estimate, QuotaCheck};
pub use tokens::{count_tokens, estimate_tokens_quick};
