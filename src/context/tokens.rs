//! Token counting using tiktoken-rs.
//!
//! Uses the cl100k_base encoding as a model-agnostic approximation of how much
//! of a summarizer's input window a text will occupy.

use lazy_static::lazy_static;
use parking_lot::Mutex;
use tiktoken_rs::{cl100k_base, CoreBPE};
use tracing::warn;

lazy_static! {
    /// Encoder is built once; `None` when the vocabulary failed to load.
    static ref ENCODER: Mutex<Option<CoreBPE>> = Mutex::new(load_encoder());
}

fn load_encoder() -> Option<CoreBPE> {
    match cl100k_base() {
        Ok(bpe) => Some(bpe),
        Err(e) => {
            warn!(error = %e, "cl100k_base unavailable, falling back to length estimate");
            None
        }
    }
}

/// Count tokens in text using cl100k_base encoding.
///
/// Every call encodes the text again. Counts are never memoized because a
/// usage figure is only meaningful for the session it was measured against.
pub fn count_tokens(text: &str) -> u32 {
    if text.is_empty() {
        return 0;
    }

    let encoder = ENCODER.lock();
    match encoder.as_ref() {
        Some(bpe) => bpe.encode_with_special_tokens(text).len() as u32,
        None => estimate_tokens_quick(text),
    }
}

/// Estimate tokens without running the encoder
pub fn estimate_tokens_quick(text: &str) -> u32 {
    // ~4 bytes per token on average
    (text.len() as f64 / 4.0).ceil() as u32
}
