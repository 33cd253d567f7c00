//! Document Chunking
//!
//! Splits text into quota-sized pieces at paragraph boundaries so each piece
//! can be summarized on its own.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Characters per token used to turn a token quota into a length limit.
/// Measured empirically on encyclopedia prose (~21K chars ≈ 16K tokens).
pub const CHARS_PER_TOKEN: f64 = 1.3;

/// Separator re-inserted between paragraphs merged into one chunk
const PARAGRAPH_SEPARATOR: &str = "\n\n";

lazy_static! {
    /// A blank line, or several, between paragraphs
    static ref PARAGRAPH_BREAK: Regex = Regex::new(r"\n{2,}").expect("paragraph pattern is valid");
}

/// A chunk of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// Chunk index within document
    pub index: u32,
    /// Content of the chunk
    pub content: String,
    /// Length of `content` in chars
    pub char_count: usize,
    /// Slice of a single paragraph that was too long to fit on its own
    pub hard_split: bool,
}

/// Character budget for a chunk given a token quota (never below one char)
pub fn max_chars_for(max_tokens: u32) -> usize {
    ((max_tokens as f64 * CHARS_PER_TOKEN).floor() as usize).max(1)
}

/// Split `text` into chunks of at most `max_chars_for(max_tokens)` chars.
///
/// Paragraphs are packed greedily; a paragraph that alone exceeds the limit
/// is cut into fixed-size slices regardless of word boundaries.
pub fn chunk_at_boundaries(text: &str, max_tokens: u32) -> Vec<Chunk> {
    let max_chars = max_chars_for(max_tokens);
    let separator_len = PARAGRAPH_SEPARATOR.chars().count();

    let mut chunks: Vec<Chunk> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for paragraph in PARAGRAPH_BREAK.split(text) {
        let para_len = paragraph.chars().count();
        let added_len = if current.is_empty() { para_len } else { para_len + separator_len };

        if current_len + added_len <= max_chars {
            if !current.is_empty() {
                current.push_str(PARAGRAPH_SEPARATOR);
            }
            current.push_str(paragraph);
            current_len += added_len;
            continue;
        }

        flush(&mut chunks, &mut current);
        current_len = 0;

        if para_len > max_chars {
            for slice in split_chars(paragraph, max_chars) {
                if slice.trim().is_empty() {
                    continue;
                }
                push_chunk(&mut chunks, slice.to_string(), true);
            }
        } else {
            current.push_str(paragraph);
            current_len = para_len;
        }
    }

    flush(&mut chunks, &mut current);

    debug!(
        chunks = chunks.len(),
        max_chars = max_chars,
        sizes = ?chunks.iter().map(|c| c.char_count).collect::<Vec<_>>(),
        "Split text into chunks"
    );

    chunks
}

/// Emit the accumulated paragraphs (trimmed) if there is anything in them
fn flush(chunks: &mut Vec<Chunk>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        let content = trimmed.to_string();
        push_chunk(chunks, content, false);
    }
    current.clear();
}

fn push_chunk(chunks: &mut Vec<Chunk>, content: String, hard_split: bool) {
    chunks.push(Chunk {
        index: chunks.len() as u32,
        char_count: content.chars().count(),
        content,
        hard_split,
    });
}

/// Consecutive slices of at most `max_chars` chars, cut on char boundaries
fn split_chars(text: &str, max_chars: usize) -> Vec<&str> {
    let mut slices = Vec::new();
    let mut start = 0usize;
    let mut count = 0usize;

    for (pos, _) in text.char_indices() {
        if count == max_chars {
            slices.push(&text[start..pos]);
            start = pos;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        slices.push(&text[start..]);
    }

    slices
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip_whitespace(text: &str) -> String {
        text.chars().filter(|c| !c.is_whitespace()).collect()
    }

    fn reconstruct(chunks: &[Chunk]) -> String {
        chunks.iter().map(|c| c.content.as_str()).collect()
    }

    #[test]
    fn test_max_chars_for() {
        assert_eq!(max_chars_for(100), 130);
        assert_eq!(max_chars_for(16_000), 20_800);
        assert_eq!(max_chars_for(0), 1);
    }

    #[test]
    fn test_small_text_is_one_chunk() {
        let content = "First paragraph.\n\nSecond paragraph.\n\nThird paragraph.";
        let chunks = chunk_at_boundaries(content, 1000);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, content);
        assert_eq!(chunks[0].index, 0);
        assert!(!chunks[0].hard_split);
    }

    #[test]
    fn test_paragraphs_packed_within_limit() {
        // 10 chars each; limit 26 chars fits two paragraphs plus separator
        let content = "aaaaaaaaaa\n\nbbbbbbbbbb\n\ncccccccccc\n\ndddddddddd";
        let chunks = chunk_at_boundaries(content, 20);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "aaaaaaaaaa\n\nbbbbbbbbbb");
        assert_eq!(chunks[1].content, "cccccccccc\n\ndddddddddd");
        assert!(chunks.iter().all(|c| c.char_count <= 26));
    }

    #[test]
    fn test_separator_counts_against_limit() {
        // Two 10-char paragraphs need 22 chars together; limit is 20
        let chunks = chunk_at_boundaries("aaaaaaaaaa\n\nbbbbbbbbbb", 16);
        assert_eq!(max_chars_for(16), 20);
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn test_long_paragraph_is_hard_split() {
        let long = "x".repeat(300);
        let content = format!("intro\n\n{}\n\noutro", long);
        let chunks = chunk_at_boundaries(&content, 100); // 130 chars

        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents[0], "intro");
        assert_eq!(contents[1].len(), 130);
        assert_eq!(contents[2].len(), 130);
        assert_eq!(contents[3].len(), 40);
        assert_eq!(contents[4], "outro");
        assert!(chunks[1].hard_split && chunks[2].hard_split && chunks[3].hard_split);
        assert!(!chunks[4].hard_split);
    }

    #[test]
    fn test_hard_split_respects_char_boundaries() {
        let content = "é".repeat(50);
        let chunks = chunk_at_boundaries(&content, 10); // 13 chars
        assert!(chunks.iter().all(|c| c.char_count <= 13));
        assert_eq!(reconstruct(&chunks), content);
    }

    #[test]
    fn test_blank_oversize_paragraph_yields_no_chunks() {
        let content = format!("before\n\n{}\n\nafter", " ".repeat(100));
        let chunks = chunk_at_boundaries(&content, 10); // 13 chars

        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["before", "after"]);
        assert_eq!(chunks[1].index, 1);
    }

    #[test]
    fn test_indices_are_sequential() {
        let content = (0..40).map(|i| format!("Paragraph number {} with some words.", i)).collect::<Vec<_>>().join("\n\n");
        let chunks = chunk_at_boundaries(&content, 100);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index as usize, i);
        }
    }

    #[test]
    fn test_reconstructs_source_and_respects_limit() {
        let content = format!(
            "{}\n\n\n\n{}\n\n{}\n\n  {}",
            "Short opening paragraph.",
            "A much longer middle paragraph. ".repeat(30),
            "Another paragraph.",
            "z".repeat(500)
        );
        for quota in [5u32, 20, 64, 200, 5000] {
            let chunks = chunk_at_boundaries(&content, quota);
            let max_chars = max_chars_for(quota);
            assert!(chunks.iter().all(|c| c.char_count <= max_chars), "quota {}", quota);
            assert_eq!(strip_whitespace(&reconstruct(&chunks)), strip_whitespace(&content));
            let bound = (content.chars().count() + max_chars - 1) / max_chars;
            assert!(chunks.len() <= bound + 4, "quota {}: {} chunks", quota, chunks.len());
        }
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(chunk_at_boundaries("", 100).is_empty());
        assert!(chunk_at_boundaries("\n\n\n\n", 100).is_empty());
    }

    #[test]
    fn test_chunking_is_deterministic() {
        let content = "Alpha beta.\n\n".repeat(200);
        assert_eq!(chunk_at_boundaries(&content, 50), chunk_at_boundaries(&content, 50));
    }
}
