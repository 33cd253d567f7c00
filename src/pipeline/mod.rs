//! Summarization Pipeline
//!
//! The tiered decision flow (direct, key sections, chunk-and-merge) built on
//! top of the summarizer traits.

pub mod merge;
pub mod orchestrator;
pub mod progress;

#[cfg(test)]
pub(crate) mod testing;

use futures::StreamExt;

use crate::summarizer::{StreamStage, SummarizeError, SummaryStream};

pub use merge::{concatenate_raw, label_partials, merge_summaries, MergeStrategy, MergedSummary, PartialSummary};
pub use orchestrator::{JobState, Orchestrator, SummaryOutcome, Tier};
pub use progress::{NoopProgress, ProgressSink, TracingProgress};

/// Drain `stream` to completion, concatenating increments in order.
///
/// When `progress` is given it sees the accumulated text after every
/// increment.
pub(crate) async fn drain(
    mut stream: SummaryStream,
    stage: StreamStage,
    progress: Option<&dyn ProgressSink>,
) -> Result<String, SummarizeError> {
    let mut output = String::new();
    while let Some(piece) = stream.next().await {
        let piece = piece.map_err(|e| e.during(stage))?;
        output.push_str(&piece);
        if let Some(sink) = progress {
            sink.partial(&output);
        }
    }
    Ok(output)
}
