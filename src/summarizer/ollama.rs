//! Ollama Summarizer Backend
//!
//! Drives a local Ollama server over its REST API. Generation is streamed as
//! NDJSON from `/api/generate` and surfaced as a `SummaryStream`.

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{
    Availability, SummarizeError, SummarizerCapability, SummarizerConfig, SummarizerSession,
    SummaryFormat, SummaryStream,
};
use crate::context::tokens::count_tokens;

/// Closes every prompt, after the document text
const PROMPT_TAIL: &str = "\n\nSUMMARY:";

/// Connection settings for the Ollama backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OllamaSettings {
    pub base_url: String,
    pub model: String,
    /// Context window requested through `num_ctx`
    pub context_window: u32,
    /// Tokens kept free for the generated summary
    pub output_reserve: u32,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            context_window: 8192,
            output_reserve: 1024,
        }
    }
}

impl OllamaSettings {
    /// Input budget left once the prompt scaffolding and output reserve are paid for
    pub fn input_quota(&self, config: &SummarizerConfig) -> u32 {
        let overhead = count_tokens(&prompt_template(config));
        self.context_window
            .saturating_sub(self.output_reserve)
            .saturating_sub(overhead)
    }
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagEntry {
    name: String,
}

/// One NDJSON record from `/api/generate`
#[derive(Debug, Deserialize)]
struct GenerateLine {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    error: Option<String>,
}

/// Summarizer capability backed by an Ollama server
#[derive(Clone)]
pub struct OllamaCapability {
    http: Client,
    settings: OllamaSettings,
}

impl OllamaCapability {
    pub fn new(settings: OllamaSettings) -> Result<Self, SummarizeError> {
        // No overall timeout: long documents stream for minutes
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| SummarizeError::CapabilityUnavailable(format!("HTTP client: {}", e)))?;
        Ok(Self {
            http,
            settings: OllamaSettings {
                base_url: settings.base_url.trim_end_matches('/').to_string(),
                ..settings
            },
        })
    }

    pub fn settings(&self) -> &OllamaSettings {
        &self.settings
    }

    async fn installed_models(&self) -> Result<Vec<String>, SummarizeError> {
        let resp = self
            .http
            .get(format!("{}/api/tags", self.settings.base_url))
            .timeout(Duration::from_secs(10))
            .send()
            .await?
            .error_for_status()?;
        let tags: TagsResponse = resp.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    async fn pull_model(&self) -> Result<(), SummarizeError> {
        info!(model = %self.settings.model, "Pulling model");
        self.http
            .post(format!("{}/api/pull", self.settings.base_url))
            .json(&json!({ "model": self.settings.model, "stream": false }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl SummarizerCapability for OllamaCapability {
    async fn availability(&self) -> Availability {
        match self.installed_models().await {
            Ok(models) if models.iter().any(|m| model_matches(m, &self.settings.model)) => {
                Availability::Available
            }
            Ok(_) => Availability::Downloadable,
            Err(e) => {
                warn!(base_url = %self.settings.base_url, error = %e, "Ollama not reachable");
                Availability::Unavailable
            }
        }
    }

    async fn create(
        &self,
        config: &SummarizerConfig,
    ) -> Result<Box<dyn SummarizerSession>, SummarizeError> {
        let models = self
            .installed_models()
            .await
            .map_err(|e| SummarizeError::SessionCreation(e.to_string()))?;
        if !models.iter().any(|m| model_matches(m, &self.settings.model)) {
            self.pull_model()
                .await
                .map_err(|e| SummarizeError::SessionCreation(e.to_string()))?;
        }

        let quota = self.settings.input_quota(config);
        if quota == 0 {
            return Err(SummarizeError::SessionCreation(format!(
                "context window {} leaves no room for input",
                self.settings.context_window
            )));
        }

        debug!(model = %self.settings.model, quota = quota, "Created Ollama session");
        Ok(Box::new(OllamaSession {
            http: self.http.clone(),
            settings: self.settings.clone(),
            config: config.clone(),
            quota,
            closed: false,
        }))
    }
}

/// A summarizer bound to one model and one `SummarizerConfig`
pub struct OllamaSession {
    http: Client,
    settings: OllamaSettings,
    config: SummarizerConfig,
    quota: u32,
    closed: bool,
}

impl OllamaSession {
    fn ensure_open(&self) -> Result<(), SummarizeError> {
        if self.closed {
            return Err(SummarizeError::Streaming {
                stage: super::StreamStage::Direct,
                message: "session already destroyed".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SummarizerSession for OllamaSession {
    fn quota(&self) -> u32 {
        self.quota
    }

    async fn estimate_usage(&self, text: &str) -> Result<u32, SummarizeError> {
        if self.closed {
            return Err(SummarizeError::UsageEstimation(
                "session already destroyed".to_string(),
            ));
        }
        Ok(count_tokens(text))
    }

    async fn summarize_streaming(&self, text: &str) -> Result<SummaryStream, SummarizeError> {
        self.ensure_open()?;

        let body = json!({
            "model": self.settings.model,
            "prompt": build_prompt(&self.config, text),
            "stream": true,
            "options": { "num_ctx": self.settings.context_window },
        });

        let resp = self
            .http
            .post(format!("{}/api/generate", self.settings.base_url))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(SummarizeError::Http(format!(
                "generate failed ({}): {}",
                status,
                text.trim()
            )));
        }

        let bytes = resp
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(SummarizeError::from))
            .boxed();
        Ok(ndjson_stream(bytes))
    }

    fn destroy(&mut self) {
        if !self.closed {
            debug!(model = %self.settings.model, "Destroyed Ollama session");
        }
        self.closed = true;
    }
}

struct NdjsonState<S> {
    body: S,
    buffer: Vec<u8>,
    finished: bool,
}

/// Turn a byte stream of NDJSON generate records into text increments.
/// Ends at the first `done` record, the end of the body, or the first error.
fn ndjson_stream<S>(body: S) -> SummaryStream
where
    S: Stream<Item = Result<Vec<u8>, SummarizeError>> + Send + Unpin + 'static,
{
    let state = NdjsonState {
        body,
        buffer: Vec::new(),
        finished: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if state.finished {
                return None;
            }

            if let Some(pos) = state.buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = state.buffer.drain(..=pos).collect();
                match parse_generate_line(&line) {
                    Ok(None) => continue,
                    Ok(Some((text, done))) => {
                        state.finished = done;
                        if text.is_empty() {
                            continue;
                        }
                        return Some((Ok(text), state));
                    }
                    Err(e) => {
                        state.finished = true;
                        return Some((Err(e), state));
                    }
                }
            }

            match state.body.next().await {
                Some(Ok(bytes)) => state.buffer.extend_from_slice(&bytes),
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(e), state));
                }
                None => {
                    if state.buffer.iter().all(u8::is_ascii_whitespace) {
                        return None;
                    }
                    // Final record without a trailing newline
                    state.buffer.push(b'\n');
                }
            }
        }
    })
    .boxed()
}

/// Parse one NDJSON line into `(text, done)`. Blank lines yield `None`.
fn parse_generate_line(line: &[u8]) -> Result<Option<(String, bool)>, SummarizeError> {
    let trimmed = String::from_utf8_lossy(line);
    let trimmed = trimmed.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let record: GenerateLine = serde_json::from_str(trimmed).map_err(|e| SummarizeError::Streaming {
        stage: super::StreamStage::Direct,
        message: format!("malformed generate record: {}", e),
    })?;

    if let Some(error) = record.error {
        return Err(SummarizeError::Streaming {
            stage: super::StreamStage::Direct,
            message: error,
        });
    }

    Ok(Some((record.response, record.done)))
}

/// Tags are reported as `name:tag`; a bare model name means `:latest`
fn model_matches(installed: &str, wanted: &str) -> bool {
    if installed == wanted {
        return true;
    }
    if wanted.contains(':') {
        return false;
    }
    installed == format!("{}:latest", wanted)
}

/// Instructions that precede the document text
fn prompt_head(config: &SummarizerConfig) -> String {
    let format = match config.format {
        SummaryFormat::Markdown => "Format the answer as Markdown.",
        SummaryFormat::PlainText => "Answer in plain text without any Markdown.",
    };

    format!(
        "Context: {}\n\n{}. {} {} Write the summary in {}.\n\nTEXT:\n",
        config.shared_context,
        config.summary_type.instruction(),
        config.length.instruction(),
        format,
        config.output_language,
    )
}

/// Prompt scaffolding without any document text, for measuring overhead
fn prompt_template(config: &SummarizerConfig) -> String {
    format!("{}{}", prompt_head(config), PROMPT_TAIL)
}

fn build_prompt(config: &SummarizerConfig, text: &str) -> String {
    format!("{}{}{}", prompt_head(config), text, PROMPT_TAIL)
}
