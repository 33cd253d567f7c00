//! Job-level error taxonomy.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which streaming call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "stage", content = "chunk")]
pub enum StreamStage {
    /// Single call over the whole document or its extracted sections
    Direct,
    /// Per-chunk call, carrying the chunk index
    Chunk(u32),
    /// Final call over the labeled partial summaries
    Merge,
}

impl fmt::Display for StreamStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamStage::Direct => write!(f, "direct summary"),
            StreamStage::Chunk(index) => write!(f, "chunk {}", index + 1),
            StreamStage::Merge => write!(f, "merge"),
        }
    }
}

#[derive(Error, Debug)]
pub enum SummarizeError {
    #[error("Summarizer not available: {0}")]
    CapabilityUnavailable(String),
    #[error("Failed to create summarizer session: {0}")]
    SessionCreation(String),
    #[error("Failed to measure input usage: {0}")]
    UsageEstimation(String),
    #[error("Streaming failed during {stage}: {message}")]
    Streaming { stage: StreamStage, message: String },
    #[error("Nothing to summarize: document is empty")]
    EmptyDocument,
    #[error("HTTP error: {0}")]
    Http(String),
}

/// Coarse classification reported alongside a failed job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    CapabilityUnavailable,
    SessionCreationFailure,
    UsageEstimationFailure,
    StreamingFailure,
    EmptyDocument,
    Transport,
}

impl SummarizeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SummarizeError::CapabilityUnavailable(_) => ErrorKind::CapabilityUnavailable,
            SummarizeError::SessionCreation(_) => ErrorKind::SessionCreationFailure,
            SummarizeError::UsageEstimation(_) => ErrorKind::UsageEstimationFailure,
            SummarizeError::Streaming { .. } => ErrorKind::StreamingFailure,
            SummarizeError::EmptyDocument => ErrorKind::EmptyDocument,
            SummarizeError::Http(_) => ErrorKind::Transport,
        }
    }

    /// Re-tag any failure raised while draining a stream with its stage
    pub fn during(self, stage: StreamStage) -> Self {
        match self {
            SummarizeError::Streaming { message, .. } => SummarizeError::Streaming { stage, message },
            other => SummarizeError::Streaming {
                stage,
                message: other.to_string(),
            },
        }
    }
}

impl Serialize for SummarizeError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl From<reqwest::Error> for SummarizeError {
    fn from(e: reqwest::Error) -> Self {
        SummarizeError::Http(e.to_string())
    }
}
