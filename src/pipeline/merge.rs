//! Merging of per-chunk summaries
//!
//! One level only: if the labeled partials are themselves over quota they
//! are concatenated verbatim rather than summarized again.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{drain, ProgressSink};
use crate::context::quota::{self, QuotaCheck};
use crate::summarizer::{StreamStage, SummarizeError, SummarizerSession};

/// Separator between raw partials when they cannot be merged by the model
pub const RAW_SEPARATOR: &str = "\n\n---\n\n";

/// Separator between labeled partials sent to the merge call
const LABELED_SEPARATOR: &str = "\n\n";

/// Summary of one chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialSummary {
    pub chunk_index: u32,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Labeled partials summarized in one more streaming call
    Summarized,
    /// Raw partials joined with `RAW_SEPARATOR`
    Concatenated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedSummary {
    pub text: String,
    pub strategy: MergeStrategy,
    /// Usage of the labeled partials; absent when there was nothing to merge
    pub usage: Option<QuotaCheck>,
}

/// "Part 1: ...", "Part 2: ..." separated by blank lines
pub fn label_partials(partials: &[PartialSummary]) -> String {
    partials
        .iter()
        .enumerate()
        .map(|(i, p)| format!("Part {}: {}", i + 1, p.text))
        .collect::<Vec<_>>()
        .join(LABELED_SEPARATOR)
}

pub fn concatenate_raw(partials: &[PartialSummary]) -> String {
    partials
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join(RAW_SEPARATOR)
}

/// Combine chunk summaries into the final summary.
///
/// The labeled concatenation is measured against `session`; if it fits it
/// is summarized once more (streamed to `progress`), otherwise the raw
/// partials are returned joined by `RAW_SEPARATOR` without any further call.
pub async fn merge_summaries(
    session: &dyn SummarizerSession,
    partials: &[PartialSummary],
    progress: &dyn ProgressSink,
) -> Result<MergedSummary, SummarizeError> {
    if partials.is_empty() {
        warn!("No partial summaries to merge");
        return Ok(MergedSummary {
            text: String::new(),
            strategy: MergeStrategy::Concatenated,
            usage: None,
        });
    }

    let labeled = label_partials(partials);
    let check = quota::estimate(session, &labeled).await?;

    if !check.fits() {
        info!(
            partials = partials.len(),
            usage = check.usage,
            quota = check.quota,
            "Combined summaries exceed quota, concatenating"
        );
        return Ok(MergedSummary {
            text: concatenate_raw(partials),
            strategy: MergeStrategy::Concatenated,
            usage: Some(check),
        });
    }

    let stream = session
        .summarize_streaming(&labeled)
        .await
        .map_err(|e| e.during(StreamStage::Merge))?;
    let text = drain(stream, StreamStage::Merge, Some(progress)).await?;

    info!(
        partials = partials.len(),
        chars = text.len(),
        "Merged partial summaries"
    );

    Ok(MergedSummary {
        text,
        strategy: MergeStrategy::Summarized,
        usage: Some(check),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::ScriptedCapability;
    use crate::pipeline::NoopProgress;
    use crate::summarizer::{SummarizerCapability, SummarizerConfig};

    fn partials(texts: &[&str]) -> Vec<PartialSummary> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| PartialSummary {
                chunk_index: i as u32,
                text: t.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_label_format() {
        let labeled = label_partials(&partials(&["A", "B", "C"]));
        assert_eq!(labeled, "Part 1: A\n\nPart 2: B\n\nPart 3: C");
    }

    #[test]
    fn test_raw_format() {
        assert_eq!(concatenate_raw(&partials(&["A", "B"])), "A\n\n---\n\nB");
        assert_eq!(concatenate_raw(&partials(&["only"])), "only");
    }

    #[tokio::test]
    async fn test_fitting_partials_are_summarized() {
        let capability = ScriptedCapability::new(1000);
        let session = capability.create(&SummarizerConfig::default()).await.unwrap();

        let merged = merge_summaries(session.as_ref(), &partials(&["A", "B"]), &NoopProgress)
            .await
            .unwrap();

        assert_eq!(merged.strategy, MergeStrategy::Summarized);
        assert_eq!(merged.text, "summary 0");
        assert_eq!(capability.streamed(), vec!["Part 1: A\n\nPart 2: B".to_string()]);
        assert!(merged.usage.unwrap().fits());
    }

    #[tokio::test]
    async fn test_oversized_partials_are_concatenated_without_a_call() {
        let capability = ScriptedCapability::new(10);
        let session = capability.create(&SummarizerConfig::default()).await.unwrap();

        let merged = merge_summaries(
            session.as_ref(),
            &partials(&["first summary", "second summary"]),
            &NoopProgress,
        )
        .await
        .unwrap();

        assert_eq!(merged.strategy, MergeStrategy::Concatenated);
        assert_eq!(merged.text, "first summary\n\n---\n\nsecond summary");
        assert!(capability.streamed().is_empty());
    }

    #[tokio::test]
    async fn test_nothing_to_merge() {
        let capability = ScriptedCapability::new(10);
        let session = capability.create(&SummarizerConfig::default()).await.unwrap();

        let merged = merge_summaries(session.as_ref(), &[], &NoopProgress).await.unwrap();

        assert_eq!(merged.text, "");
        assert_eq!(merged.usage, None);
        assert!(capability.log.lock().estimated.is_empty());
        assert!(capability.streamed().is_empty());
    }

    #[tokio::test]
    async fn test_merge_stream_failure_is_tagged() {
        let mut capability = ScriptedCapability::new(1000);
        capability.fail_stream_call = Some(0);
        let session = capability.create(&SummarizerConfig::default()).await.unwrap();

        let err = merge_summaries(session.as_ref(), &partials(&["A", "B"]), &NoopProgress)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SummarizeError::Streaming {
                stage: StreamStage::Merge,
                ..
            }
        ));
    }
}
