//! In-memory summarizer used by the pipeline tests.

use async_trait::async_trait;
use futures::{stream, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;

use crate::summarizer::{
    Availability, StreamStage, SummarizeError, SummarizerCapability, SummarizerConfig,
    SummarizerSession, SummaryStream,
};

/// Everything the pipeline asked of the backend
#[derive(Debug, Default)]
pub(crate) struct CallLog {
    pub sessions_created: usize,
    pub sessions_destroyed: usize,
    pub estimated: Vec<String>,
    pub streamed: Vec<String>,
}

pub(crate) type UsageFn = Arc<dyn Fn(&str) -> u32 + Send + Sync>;

#[derive(Clone)]
pub(crate) struct ScriptedCapability {
    pub availability: Availability,
    pub quota: u32,
    /// One token per char unless overridden
    pub usage: UsageFn,
    pub fail_create: bool,
    pub fail_estimate: bool,
    /// Zero-based streaming call that fails after its first increment
    pub fail_stream_call: Option<usize>,
    pub log: Arc<Mutex<CallLog>>,
}

impl ScriptedCapability {
    pub fn new(quota: u32) -> Self {
        Self {
            availability: Availability::Available,
            quota,
            usage: Arc::new(|text: &str| text.chars().count() as u32),
            fail_create: false,
            fail_estimate: false,
            fail_stream_call: None,
            log: Arc::new(Mutex::new(CallLog::default())),
        }
    }

    pub fn with_usage(mut self, usage: impl Fn(&str) -> u32 + Send + Sync + 'static) -> Self {
        self.usage = Arc::new(usage);
        self
    }

    pub fn streamed(&self) -> Vec<String> {
        self.log.lock().streamed.clone()
    }
}

#[async_trait]
impl SummarizerCapability for ScriptedCapability {
    async fn availability(&self) -> Availability {
        self.availability
    }

    async fn create(
        &self,
        _config: &SummarizerConfig,
    ) -> Result<Box<dyn SummarizerSession>, SummarizeError> {
        if self.fail_create {
            return Err(SummarizeError::SessionCreation("scripted failure".to_string()));
        }
        self.log.lock().sessions_created += 1;
        Ok(Box::new(ScriptedSession {
            script: self.clone(),
            destroyed: false,
        }))
    }
}

pub(crate) struct ScriptedSession {
    script: ScriptedCapability,
    destroyed: bool,
}

#[async_trait]
impl SummarizerSession for ScriptedSession {
    fn quota(&self) -> u32 {
        self.script.quota
    }

    async fn estimate_usage(&self, text: &str) -> Result<u32, SummarizeError> {
        if self.script.fail_estimate {
            return Err(SummarizeError::UsageEstimation("scripted failure".to_string()));
        }
        self.script.log.lock().estimated.push(text.to_string());
        Ok((self.script.usage)(text))
    }

    async fn summarize_streaming(&self, text: &str) -> Result<SummaryStream, SummarizeError> {
        let call = {
            let mut log = self.script.log.lock();
            log.streamed.push(text.to_string());
            log.streamed.len() - 1
        };

        if self.script.fail_stream_call == Some(call) {
            let pieces = vec![
                Ok("partial ".to_string()),
                Err(SummarizeError::Streaming {
                    stage: StreamStage::Direct,
                    message: "backend dropped the stream".to_string(),
                }),
            ];
            return Ok(stream::iter(pieces).boxed());
        }

        let pieces = vec![Ok("summary ".to_string()), Ok(call.to_string())];
        Ok(stream::iter(pieces).boxed())
    }

    fn destroy(&mut self) {
        if !self.destroyed {
            self.script.log.lock().sessions_destroyed += 1;
        }
        self.destroyed = true;
    }
}
