//! Tiered summarization
//!
//! A job measures the document against the session quota and takes the
//! cheapest route that fits:
//!
//! 1. **Direct**: the whole document in one streaming call
//! 2. **Academic extraction**: key sections of a research paper, summarized
//!    directly when they fit and chunked otherwise
//! 3. **Chunked**: paragraph-boundary chunks summarized one after another,
//!    then merged
//!
//! Every job owns exactly one session, torn down when the job ends whether
//! it succeeded or not.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, error, info, warn};
use ulid::Ulid;

use super::merge::{merge_summaries, MergeStrategy, PartialSummary};
use super::progress::messages;
use super::{drain, ProgressSink};
use crate::context::classification::{DocumentClassifier, KeywordClassifier};
use crate::context::quota::{self, QuotaCheck};
use crate::documents::chunker::chunk_at_boundaries;
use crate::documents::sections::SectionExtractor;
use crate::summarizer::{
    Availability, StreamStage, SummarizeError, SummarizerCapability, SummarizerConfig,
    SummarizerSession,
};

/// Route a job took to its summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Unmodified document in a single call
    Direct,
    /// Extracted key sections in a single call
    AcademicExtraction,
    /// Chunk summaries merged (from the document or its extracted sections)
    Chunked,
}

/// Lifecycle of one job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Idle,
    Estimating,
    DirectSummarize,
    AcademicPath,
    Chunking,
    Merging,
    Done,
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Idle => "idle",
            JobState::Estimating => "estimating",
            JobState::DirectSummarize => "direct_summarize",
            JobState::AcademicPath => "academic_path",
            JobState::Chunking => "chunking",
            JobState::Merging => "merging",
            JobState::Done => "done",
            JobState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Result of a successful job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryOutcome {
    pub job_id: String,
    pub summary: String,
    pub tier: Tier,
    /// Zero unless the job went through chunking
    pub chunk_count: usize,
    pub merge: Option<MergeStrategy>,
    /// Usage of the text that decided the tier
    pub usage: QuotaCheck,
    pub completed_at: DateTime<Utc>,
}

/// Bookkeeping for the job in flight
struct Job {
    id: Ulid,
    state: JobState,
}

impl Job {
    fn new() -> Self {
        Self {
            id: Ulid::new(),
            state: JobState::Idle,
        }
    }

    fn transition(&mut self, next: JobState) {
        debug!(job_id = %self.id, from = %self.state, to = %next, "Job state change");
        self.state = next;
    }

    fn outcome(
        &self,
        summary: String,
        tier: Tier,
        chunk_count: usize,
        merge: Option<MergeStrategy>,
        usage: QuotaCheck,
    ) -> SummaryOutcome {
        SummaryOutcome {
            job_id: self.id.to_string(),
            summary,
            tier,
            chunk_count,
            merge,
            usage,
            completed_at: Utc::now(),
        }
    }
}

/// The job's session; destroyed when the guard goes out of scope
struct ActiveSession {
    inner: Box<dyn SummarizerSession>,
}

impl ActiveSession {
    async fn open(
        capability: &dyn SummarizerCapability,
        config: &SummarizerConfig,
    ) -> Result<Self, SummarizeError> {
        let inner = capability.create(config).await.map_err(|e| match e {
            SummarizeError::SessionCreation(_) => e,
            other => SummarizeError::SessionCreation(other.to_string()),
        })?;
        Ok(Self { inner })
    }

    fn get(&self) -> &dyn SummarizerSession {
        self.inner.as_ref()
    }
}

impl Drop for ActiveSession {
    fn drop(&mut self) {
        self.inner.destroy();
    }
}

/// Runs summarization jobs against one capability
pub struct Orchestrator {
    capability: Box<dyn SummarizerCapability>,
    config: SummarizerConfig,
    classifier: Box<dyn DocumentClassifier>,
    extractor: SectionExtractor,
}

impl Orchestrator {
    pub fn new(capability: Box<dyn SummarizerCapability>, config: SummarizerConfig) -> Self {
        Self {
            capability,
            config,
            classifier: Box::new(KeywordClassifier),
            extractor: SectionExtractor::default(),
        }
    }

    pub fn with_classifier(mut self, classifier: Box<dyn DocumentClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_extractor(mut self, extractor: SectionExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn config(&self) -> &SummarizerConfig {
        &self.config
    }

    /// Replace the summarizer configuration; the next job's session uses it
    pub fn configure(&mut self, config: SummarizerConfig) {
        self.config = config;
    }

    /// Summarize `text`, reporting progress to `progress`.
    ///
    /// Takes `&mut self` so that two jobs can never share an orchestrator
    /// at the same time.
    pub async fn run(
        &mut self,
        text: &str,
        progress: &dyn ProgressSink,
    ) -> Result<SummaryOutcome, SummarizeError> {
        let mut job = Job::new();
        info!(job_id = %job.id, chars = text.len(), "Starting summarization job");

        match self.execute(&mut job, text, progress).await {
            Ok(outcome) => {
                job.transition(JobState::Done);
                info!(
                    job_id = %job.id,
                    tier = ?outcome.tier,
                    chunks = outcome.chunk_count,
                    "Summarization job complete"
                );
                progress.status(messages::COMPLETE, false, false);
                Ok(outcome)
            }
            Err(e) => {
                job.transition(JobState::Failed);
                error!(job_id = %job.id, kind = ?e.kind(), error = %e, "Summarization job failed");
                progress.status(&format!("Error: {}", e), true, false);
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        job: &mut Job,
        text: &str,
        progress: &dyn ProgressSink,
    ) -> Result<SummaryOutcome, SummarizeError> {
        if text.trim().is_empty() {
            return Err(SummarizeError::EmptyDocument);
        }

        job.transition(JobState::Estimating);

        match self.capability.availability().await {
            Availability::Unavailable => {
                return Err(SummarizeError::CapabilityUnavailable(
                    "summarizer backend reported unavailable".to_string(),
                ));
            }
            Availability::Downloadable => {
                progress.status(messages::DOWNLOAD_REQUIRED, false, true);
            }
            Availability::Available => {}
        }

        progress.status(messages::CREATING_SESSION, false, true);
        let active = ActiveSession::open(self.capability.as_ref(), &self.config).await?;
        let session = active.get();

        let check = quota::estimate(session, text).await?;
        info!(
            job_id = %job.id,
            usage = check.usage,
            quota = check.quota,
            "Measured document"
        );

        if check.fits() {
            job.transition(JobState::DirectSummarize);
            progress.status(messages::SUMMARIZING, false, true);
            let summary = summarize_direct(session, text, progress).await?;
            return Ok(job.outcome(summary, Tier::Direct, 0, None, check));
        }

        if !self.classifier.is_academic(text) {
            progress.status(&messages::over_quota(check.percent_over()), false, true);
            return chunk_and_merge(job, session, text, check, progress).await;
        }

        job.transition(JobState::AcademicPath);
        progress.status(messages::ACADEMIC_DETECTED, false, true);

        let extraction = self.extractor.extract(text);
        if !extraction.is_usable() {
            warn!(job_id = %job.id, "Section extraction produced nothing usable");
            progress.status(messages::EXTRACTION_FAILED, false, true);
            return chunk_and_merge(job, session, text, check, progress).await;
        }

        let section_check = quota::estimate(session, &extraction.text).await?;
        info!(
            job_id = %job.id,
            sections = extraction.sections.len(),
            fallback = extraction.used_fallback,
            usage = section_check.usage,
            quota = section_check.quota,
            "Measured extracted sections"
        );

        if section_check.fits() {
            job.transition(JobState::DirectSummarize);
            progress.status(messages::SUMMARIZING_SECTIONS, false, true);
            let summary = summarize_direct(session, &extraction.text, progress).await?;
            return Ok(job.outcome(summary, Tier::AcademicExtraction, 0, None, section_check));
        }

        progress.status(messages::SECTIONS_OVER_QUOTA, false, true);
        chunk_and_merge(job, session, &extraction.text, section_check, progress).await
    }
}

/// One streaming call over `text`, rendered progressively
async fn summarize_direct(
    session: &dyn SummarizerSession,
    text: &str,
    progress: &dyn ProgressSink,
) -> Result<String, SummarizeError> {
    let stream = session
        .summarize_streaming(text)
        .await
        .map_err(|e| e.during(StreamStage::Direct))?;
    drain(stream, StreamStage::Direct, Some(progress)).await
}

/// Summarize `text` chunk by chunk in document order, then merge.
///
/// Any failure discards the partial summaries gathered so far.
async fn chunk_and_merge(
    job: &mut Job,
    session: &dyn SummarizerSession,
    text: &str,
    usage: QuotaCheck,
    progress: &dyn ProgressSink,
) -> Result<SummaryOutcome, SummarizeError> {
    job.transition(JobState::Chunking);

    let chunks = chunk_at_boundaries(text, session.quota());
    let total = chunks.len();
    info!(job_id = %job.id, chunks = total, "Processing in chunks");

    let mut partials = Vec::with_capacity(total);
    for chunk in &chunks {
        let stage = StreamStage::Chunk(chunk.index);
        progress.status(&messages::chunk(chunk.index as usize, total), false, true);

        let check = quota::estimate(session, &chunk.content).await?;
        if !check.fits() {
            warn!(
                job_id = %job.id,
                chunk = chunk.index,
                usage = check.usage,
                quota = check.quota,
                "Chunk still exceeds quota"
            );
        }

        let stream = session
            .summarize_streaming(&chunk.content)
            .await
            .map_err(|e| e.during(stage))?;
        let summary = drain(stream, stage, None).await?;
        debug!(job_id = %job.id, chunk = chunk.index, chars = summary.len(), "Chunk summarized");

        partials.push(PartialSummary {
            chunk_index: chunk.index,
            text: summary,
        });
    }

    job.transition(JobState::Merging);
    progress.status(messages::COMBINING, false, true);
    let merged = merge_summaries(session, &partials, progress).await?;

    Ok(job.outcome(merged.text, Tier::Chunked, total, Some(merged.strategy), usage))
}
