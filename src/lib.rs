// Gist Library
// Exports core modules for use by the CLI binary and embedding applications

pub mod config;
pub mod context;
pub mod documents;
pub mod pipeline;
pub mod summarizer;

// Re-export commonly used types
pub use config::{config_path, AppConfig, SectionSettings, ConfigError};

pub use context::classification::{
    AcademicIndicators, ClassificationReport, DocumentClassifier, KeywordClassifier,
    ACADEMIC_THRESHOLD,
};
pub use context::quota::{estimate, QuotaCheck};
pub use context::tokens::{count_tokens, estimate_tokens_quick};

pub use documents::chunker::{chunk_at_boundaries, max_chars_for, Chunk, CHARS_PER_TOKEN};
pub use documents::sections::{
    extract_sections, Extraction, FallbackSplit, Section, SectionExtractor,
};

pub use pipeline::{
    JobState, MergeStrategy, MergedSummary, NoopProgress, Orchestrator, PartialSummary,
    ProgressSink, SummaryOutcome, Tier, TracingProgress,
};

pub use summarizer::{
    Availability, ErrorKind, OllamaCapability, OllamaSettings, StreamStage, SummarizeError,
    SummarizerCapability, SummarizerConfig, SummarizerSession, SummaryFormat, SummaryLength,
    SummaryStream, SummaryType,
};
