//! Quota Estimation
//!
//! Measures candidate texts against the input budget of the live session.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::summarizer::{SummarizeError, SummarizerSession};

/// Usage of one candidate text against one session's quota
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaCheck {
    pub usage: u32,
    pub quota: u32,
}

impl QuotaCheck {
    pub fn fits(&self) -> bool {
        self.usage <= self.quota
    }

    /// How far over quota the text is, in whole percent (0 when it fits)
    pub fn percent_over(&self) -> u32 {
        if self.fits() {
            return 0;
        }
        if self.quota == 0 {
            return u32::MAX;
        }
        let over = (self.usage - self.quota) as f64;
        (over / self.quota as f64 * 100.0).round() as u32
    }
}

/// Measure `text` against `session`.
///
/// Always asks the session; a check taken for one text or one session says
/// nothing about another.
pub async fn estimate(
    session: &dyn SummarizerSession,
    text: &str,
) -> Result<QuotaCheck, SummarizeError> {
    let usage = session.estimate_usage(text).await.map_err(|e| match e {
        SummarizeError::UsageEstimation(_) => e,
        other => SummarizeError::UsageEstimation(other.to_string()),
    })?;
    let check = QuotaCheck {
        usage,
        quota: session.quota(),
    };
    debug!(
        usage = check.usage,
        quota = check.quota,
        chars = text.len(),
        "Estimated input usage"
    );
    Ok(check)
}
