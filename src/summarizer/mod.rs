//! Summarization Capability
//!
//! The generative backend the pipeline drives. The core only consumes these
//! traits; `ollama` provides one concrete backend for the CLI.

pub mod error;
pub mod ollama;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

pub use error::{ErrorKind, StreamStage, SummarizeError};
pub use ollama::{OllamaCapability, OllamaSettings};

/// Incremental summary text. Finite, ordered and single-pass; dropping it
/// before it is exhausted abandons the generation.
pub type SummaryStream = BoxStream<'static, Result<String, SummarizeError>>;

/// Whether a backend can serve sessions right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Unavailable,
    /// Usable once the model finishes downloading
    Downloadable,
    Available,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SummaryType {
    Headline,
    Tldr,
    #[default]
    KeyPoints,
    Teaser,
}

impl SummaryType {
    pub fn instruction(&self) -> &'static str {
        match self {
            SummaryType::Headline => "Write a single headline that captures the main point",
            SummaryType::Tldr => "Write a short, direct overview (TL;DR)",
            SummaryType::KeyPoints => "List the most important points",
            SummaryType::Teaser => "Write an intriguing teaser that makes the reader want to read on",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SummaryLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl SummaryLength {
    pub fn instruction(&self) -> &'static str {
        match self {
            SummaryLength::Short => "Keep it brief: one sentence or at most three bullet points.",
            SummaryLength::Medium => "Use about one paragraph or five bullet points.",
            SummaryLength::Long => "Be thorough: several paragraphs or up to seven bullet points.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SummaryFormat {
    PlainText,
    #[default]
    Markdown,
}

/// Options handed to `SummarizerCapability::create` untouched by the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SummarizerConfig {
    pub shared_context: String,
    #[serde(rename = "type")]
    pub summary_type: SummaryType,
    pub length: SummaryLength,
    pub format: SummaryFormat,
    pub expected_input_languages: Vec<String>,
    pub output_language: String,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            shared_context: "A general summary to help a user decide if the text is worth reading"
                .to_string(),
            summary_type: SummaryType::default(),
            length: SummaryLength::default(),
            format: SummaryFormat::default(),
            expected_input_languages: vec!["en-US".to_string()],
            output_language: "en-US".to_string(),
        }
    }
}

/// Factory for summarizer sessions
#[async_trait]
pub trait SummarizerCapability: Send + Sync {
    async fn availability(&self) -> Availability;

    async fn create(
        &self,
        config: &SummarizerConfig,
    ) -> Result<Box<dyn SummarizerSession>, SummarizeError>;
}

/// One configured summarizer with a fixed input quota
#[async_trait]
pub trait SummarizerSession: Send + Sync {
    /// Input budget, fixed for the lifetime of the session
    fn quota(&self) -> u32;

    /// Cost of `text` against `quota()`
    async fn estimate_usage(&self, text: &str) -> Result<u32, SummarizeError>;

    async fn summarize_streaming(&self, text: &str) -> Result<SummaryStream, SummarizeError>;

    /// Release backend resources. Must be safe to call more than once.
    fn destroy(&mut self);
}
