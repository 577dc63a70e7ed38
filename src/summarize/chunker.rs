//! Greedy sentence-packing chunker. Long transcripts are split on sentence
//! boundaries and packed into chunks that stay inside the model's input
//! budget, so each chunk can be summarized independently.

use crate::shared::utils::estimate_token_count;

/// Input budget per summarization call, in estimated tokens.
pub const TOKEN_BUDGET: usize = 1024;

pub fn chunk_transcript(text: &str, budget: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_tokens = 0usize;

    for sentence in text.split('.') {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }
        let sentence = format!("{sentence}.");
        let tokens = estimate_token_count(&sentence);

        if current_tokens + tokens > budget && !current.is_empty() {
            chunks.push(current.join(" "));
            current = vec![sentence];
            current_tokens = tokens;
        } else {
            current.push(sentence);
            current_tokens += tokens;
        }
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    chunks
}
