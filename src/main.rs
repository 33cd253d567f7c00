//! Gist CLI
//!
//! Command-line interface for quota-aware summarization and for inspecting
//! the individual steps (classification, section extraction, chunking,
//! token counting). Every command prints one JSON document on stdout; logs
//! go to stderr.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gist_lib::{
    // Config
    config_path, AppConfig,
    // Pipeline
    chunk_at_boundaries, max_chars_for, Chunk, ClassificationReport,
    OllamaCapability, Orchestrator, SectionExtractor, TracingProgress,
    // Summarizer options
    SummaryFormat, SummaryLength, SummaryType,
    // Tokens
    count_tokens,
};

#[derive(Parser)]
#[command(name = "gist")]
#[command(about = "Gist CLI - Summarize documents of any length", long_about = None)]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a document
    Summarize {
        /// File to summarize (or - to read from stdin)
        input: String,
        #[command(flatten)]
        overrides: SummarizeOverrides,
    },
    /// Score a document against the academic paper heuristics
    Classify {
        /// File to classify (or - to read from stdin)
        input: String,
    },
    /// Extract the key sections of a paper
    Sections {
        /// File to extract from (or - to read from stdin)
        input: String,
    },
    /// Split a document into quota-sized chunks
    Chunk {
        /// File to split (or - to read from stdin)
        input: String,
        /// Token quota per chunk (default: the configured model's input quota)
        #[arg(short, long)]
        max_tokens: Option<u32>,
    },
    /// Token counting commands
    Tokens {
        #[command(subcommand)]
        action: TokensAction,
    },
    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args)]
struct SummarizeOverrides {
    /// Kind of summary
    #[arg(long = "type", value_enum)]
    summary_type: Option<SummaryType>,
    #[arg(long, value_enum)]
    length: Option<SummaryLength>,
    #[arg(long, value_enum)]
    format: Option<SummaryFormat>,
    /// Context shared with the model about why the summary is wanted
    #[arg(long)]
    context: Option<String>,
    /// Output language (e.g. en-US)
    #[arg(long)]
    language: Option<String>,
    /// Ollama model name
    #[arg(long)]
    model: Option<String>,
    /// Ollama server URL
    #[arg(long)]
    base_url: Option<String>,
    /// Context window requested from the model
    #[arg(long)]
    context_window: Option<u32>,
}

impl SummarizeOverrides {
    fn apply(self, config: &mut AppConfig) {
        if let Some(summary_type) = self.summary_type {
            config.summarizer.summary_type = summary_type;
        }
        if let Some(length) = self.length {
            config.summarizer.length = length;
        }
        if let Some(format) = self.format {
            config.summarizer.format = format;
        }
        if let Some(context) = self.context {
            config.summarizer.shared_context = context;
        }
        if let Some(language) = self.language {
            config.summarizer.output_language = language;
        }
        if let Some(model) = self.model {
            config.ollama.model = model;
        }
        if let Some(base_url) = self.base_url {
            config.ollama.base_url = base_url;
        }
        if let Some(context_window) = self.context_window {
            config.ollama.context_window = context_window;
        }
    }
}

#[derive(Subcommand)]
enum TokensAction {
    /// Count tokens in text
    Count {
        /// Text to count (or - to read from stdin)
        text: String,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

// ============ Output Types ============

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SectionOutput {
    name: String,
    word_count: usize,
    priority: u8,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SectionsOutput {
    used_fallback: bool,
    sections: Vec<SectionOutput>,
    total_words: usize,
    tokens: u32,
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChunkOutput {
    max_tokens: u32,
    max_chars: usize,
    chunks: Vec<Chunk>,
}

#[derive(Serialize)]
struct TokenCountOutput {
    tokens: u32,
}

#[derive(Serialize)]
struct ConfigOutput {
    path: String,
    config: AppConfig,
}

#[derive(Serialize)]
struct ErrorOutput {
    error: String,
}

// ============ Main ============

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    let config_file = cli.config;

    let result = match cli.command {
        Commands::Summarize { input, overrides } => {
            handle_summarize(config_file, input, overrides).await
        }
        Commands::Classify { input } => handle_classify(input),
        Commands::Sections { input } => handle_sections(config_file, input),
        Commands::Chunk { input, max_tokens } => handle_chunk(config_file, input, max_tokens),
        Commands::Tokens { action } => handle_tokens(action),
        Commands::Config { action } => handle_config(config_file, action),
    };

    match result {
        Ok(json) => println!("{}", json),
        Err(e) => {
            let error = ErrorOutput {
                error: format!("{:#}", e),
            };
            match serde_json::to_string(&error) {
                Ok(json) => println!("{}", json),
                Err(_) => eprintln!("{:#}", e),
            }
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gist=info,gist_lib=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Read a file, or stdin when `input` is "-"
fn read_input(input: &str) -> anyhow::Result<String> {
    if input == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read stdin")?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("Failed to read {}", input))
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    Ok(config)
}

// ============ Handlers ============

async fn handle_summarize(
    config_file: Option<PathBuf>,
    input: String,
    overrides: SummarizeOverrides,
) -> anyhow::Result<String> {
    let mut config = load_config(config_file.as_ref())?;
    overrides.apply(&mut config);
    config.validate()?;

    let text = read_input(&input)?;
    let capability = OllamaCapability::new(config.ollama.clone())?;
    let mut orchestrator = Orchestrator::new(Box::new(capability), config.summarizer.clone())
        .with_extractor(SectionExtractor::new(config.sections.fallback));

    let outcome = orchestrator.run(&text, &TracingProgress).await?;
    Ok(serde_json::to_string(&outcome)?)
}

fn handle_classify(input: String) -> anyhow::Result<String> {
    let text = read_input(&input)?;
    let report = ClassificationReport::new(&text);
    Ok(serde_json::to_string(&report)?)
}

fn handle_sections(config_file: Option<PathBuf>, input: String) -> anyhow::Result<String> {
    let config = load_config(config_file.as_ref())?;
    let text = read_input(&input)?;

    let extraction = SectionExtractor::new(config.sections.fallback).extract(&text);

    let output = SectionsOutput {
        used_fallback: extraction.used_fallback,
        sections: extraction
            .sections
            .iter()
            .map(|s| SectionOutput {
                name: s.name.clone(),
                word_count: s.word_count,
                priority: s.priority,
            })
            .collect(),
        total_words: extraction.total_words(),
        tokens: count_tokens(&extraction.text),
        text: extraction.text,
    };
    Ok(serde_json::to_string(&output)?)
}

fn handle_chunk(
    config_file: Option<PathBuf>,
    input: String,
    max_tokens: Option<u32>,
) -> anyhow::Result<String> {
    let max_tokens = match max_tokens {
        Some(0) => bail!("--max-tokens must be greater than zero"),
        Some(n) => n,
        None => {
            let config = load_config(config_file.as_ref())?;
            config.ollama.input_quota(&config.summarizer)
        }
    };

    let text = read_input(&input)?;
    let output = ChunkOutput {
        max_tokens,
        max_chars: max_chars_for(max_tokens),
        chunks: chunk_at_boundaries(&text, max_tokens),
    };
    Ok(serde_json::to_string(&output)?)
}

fn handle_tokens(action: TokensAction) -> anyhow::Result<String> {
    match action {
        TokensAction::Count { text } => {
            let input = if text == "-" { read_input("-")? } else { text };
            let output = TokenCountOutput {
                tokens: count_tokens(&input),
            };
            Ok(serde_json::to_string(&output)?)
        }
    }
}

fn handle_config(config_file: Option<PathBuf>, action: ConfigAction) -> anyhow::Result<String> {
    let path = match config_file {
        Some(path) => path,
        None => config_path()?,
    };

    match action {
        ConfigAction::Show => {
            let config = AppConfig::load_from(&path)?;
            let output = ConfigOutput {
                path: path.display().to_string(),
                config,
            };
            Ok(serde_json::to_string_pretty(&output)?)
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            let config = AppConfig::default();
            config.save_to(&path)?;
            let output = ConfigOutput {
                path: path.display().to_string(),
                config,
            };
            Ok(serde_json::to_string_pretty(&output)?)
        }
    }
}
