//! Document Reduction Module
//!
//! Turns an oversized document into something a summarizer can take:
//! key-section extraction for papers, paragraph-boundary chunking otherwise.

pub mod chunker;
pub mod sections;

// Re-export key public types
pub use chunker::{chunk_at_boundaries, max_chars_for, Chunk, CHARS_PER_TOKEN};
pub use sections::{
    extract_sections, Extraction, FallbackSplit, Section, SectionExtractor,
    FALLBACK_HEAD_FRACTION, FALLBACK_TAIL_START_FRACTION,
};
