//! Progress reporting
//!
//! Status updates are advisory: nothing a sink does can change the outcome
//! of a job.

use tracing::{info, warn};

/// Observer for a running summarization job
pub trait ProgressSink: Send + Sync {
    fn status(&self, message: &str, is_error: bool, in_progress: bool);

    /// Accumulated output of the direct or merge stream so far
    fn partial(&self, _text: &str) {}
}

/// Ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn status(&self, _message: &str, _is_error: bool, _in_progress: bool) {}
}

/// Forwards status lines to the `tracing` subscriber
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn status(&self, message: &str, is_error: bool, in_progress: bool) {
        if is_error {
            warn!(in_progress = in_progress, "{}", message);
        } else {
            info!(in_progress = in_progress, "{}", message);
        }
    }
}

impl<F> ProgressSink for F
where
    F: Fn(&str, bool, bool) + Send + Sync,
{
    fn status(&self, message: &str, is_error: bool, in_progress: bool) {
        self(message, is_error, in_progress)
    }
}

/// Status messages shown while a job runs
pub(crate) mod messages {
    pub const DOWNLOAD_REQUIRED: &str = "Model download required. Please wait...";
    pub const CREATING_SESSION: &str = "Creating summarizer...";
    pub const ACADEMIC_DETECTED: &str = "Detected research paper. Extracting key sections...";
    pub const SUMMARIZING_SECTIONS: &str = "Generating summary from key sections...";
    pub const SECTIONS_OVER_QUOTA: &str = "Sections still exceed quota. Processing in chunks...";
    pub const EXTRACTION_FAILED: &str = "Section extraction failed. Processing in chunks...";
    pub const SUMMARIZING: &str = "Generating summary...";
    pub const COMBINING: &str = "Combining summaries...";
    pub const COMPLETE: &str = "Summary complete!";

    pub fn over_quota(percent: u32) -> String {
        format!("Document is {}% over quota. Processing in chunks...", percent)
    }

    pub fn chunk(index: usize, total: usize) -> String {
        format!("Processing chunk {}/{}...", index + 1, total)
    }
}
