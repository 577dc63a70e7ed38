pub mod chunker;
pub mod extract;

use std::sync::Arc;

use tracing::warn;

use crate::llm::{LLMProvider, LlmError};
use crate::shared::utils::estimate_token_count;
use chunker::{chunk_transcript, TOKEN_BUDGET};
use extract::{ExtractedActionItem, ExtractedDecision};

/// Drives the generative model for summaries and structured extraction.
/// Summaries propagate model errors; extraction never does — a failed or
/// unparseable generation yields an empty list.
pub struct Summarizer {
    llm: Arc<dyn LLMProvider>,
}

impl Summarizer {
    pub fn new(llm: Arc<dyn LLMProvider>) -> Self {
        Self { llm }
    }

    /// Chunked map-reduce summary: each chunk is summarized independently,
    /// the pieces are joined, and a joined result still over budget is
    /// condensed one more time.
    pub async fn summarize(&self, transcript: &str) -> Result<String, LlmError> {
        let chunks = chunk_transcript(transcript, TOKEN_BUDGET);
        let mut summaries = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            summaries.push(self.llm.generate(&summary_prompt(chunk)).await?);
        }
        let combined = summaries.join(" ");

        if estimate_token_count(&combined) > TOKEN_BUDGET {
            return self.llm.generate(&summary_prompt(&combined)).await;
        }
        Ok(combined)
    }

    pub async fn extract_action_items(&self, transcript: &str) -> Vec<ExtractedActionItem> {
        match self.llm.generate(&action_item_prompt(transcript)).await {
            Ok(response) => extract::parse_action_items(&response),
            Err(err) => {
                warn!("action item extraction failed: {err}");
                Vec::new()
            }
        }
    }

    pub async fn extract_decisions(&self, transcript: &str) -> Vec<ExtractedDecision> {
        match self.llm.generate(&decision_prompt(transcript)).await {
            Ok(response) => extract::parse_decisions(&response),
            Err(err) => {
                warn!("decision extraction failed: {err}");
                Vec::new()
            }
        }
    }
}

fn summary_prompt(text: &str) -> String {
    format!(
        "Summarize the following meeting transcript segment concisely, \
         keeping the key points, owners and outcomes:\n\n{text}"
    )
}

fn action_item_prompt(transcript: &str) -> String {
    format!(
        "Extract action items from this meeting transcript. For each action item identify:\n\
         1. Task title (be specific)\n\
         2. Description (include context and requirements)\n\
         3. Assignee (who is responsible)\n\
         4. Due date (if mentioned)\n\n\
         Format the response as a JSON array of objects with the fields \
         \"title\", \"description\", \"assignee\" and \"due_date\". If there are no \
         explicit action items, look for implied tasks, next steps or follow-ups \
         participants should complete.\n\n\
         Example output:\n\
         [{{\"title\": \"Research potential solutions\", \"description\": \"Investigate available options\", \"assignee\": \"John\", \"due_date\": \"2024-06-01\"}}]\n\n\
         Meeting transcript:\n{transcript}\n\n\
         Return a valid JSON array. If there are absolutely no action items, return []."
    )
}

fn decision_prompt(transcript: &str) -> String {
    format!(
        "Extract decisions made during this meeting. For each decision identify:\n\
         1. Decision title (what was decided)\n\
         2. Description (context and details)\n\
         3. Decision maker (who made or approved it)\n\
         4. Rationale (why it was made)\n\n\
         Format the response as a JSON array of objects with the fields \
         \"title\", \"description\", \"decision_maker\" and \"rationale\". If there \
         are no explicit decisions, look for implied agreements or consensus \
         points reached by participants.\n\n\
         Example output:\n\
         [{{\"title\": \"Proceed with option A\", \"description\": \"The team agreed to implement option A\", \"decision_maker\": \"Team lead\", \"rationale\": \"Best balance of cost and features\"}}]\n\n\
         Meeting transcript:\n{transcript}\n\n\
         Return a valid JSON array. If there are absolutely no decisions, return []."
    )
}
