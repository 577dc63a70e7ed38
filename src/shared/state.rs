use std::sync::Arc;

use crate::action_items::ActionItemEngine;
use crate::calendar::CalendarClient;
use crate::config::AppConfig;
use crate::decisions::DecisionEngine;
use crate::llm::{LLMProvider, OpenAIClient};
use crate::meetings::MeetingEngine;
use crate::shared::utils::DbPool;
use crate::summarize::Summarizer;
use crate::transcription::{SpeechToText, WhisperClient};

pub struct AppState {
    pub config: AppConfig,
    pub conn: DbPool,
    pub meetings: MeetingEngine,
    pub action_items: ActionItemEngine,
    pub decisions: DecisionEngine,
    pub summarizer: Summarizer,
    pub transcriber: Arc<dyn SpeechToText>,
    pub calendar: Arc<CalendarClient>,
}

impl AppState {
    pub fn new(conn: DbPool, config: AppConfig) -> Self {
        let llm: Arc<dyn LLMProvider> = Arc::new(OpenAIClient::new(&config.llm));
        let transcriber: Arc<dyn SpeechToText> = Arc::new(WhisperClient::new(&config.whisper));
        Self::with_clients(conn, config, llm, transcriber)
    }

    /// Wiring seam: tests swap in canned model clients here.
    pub fn with_clients(
        conn: DbPool,
        config: AppConfig,
        llm: Arc<dyn LLMProvider>,
        transcriber: Arc<dyn SpeechToText>,
    ) -> Self {
        let calendar = Arc::new(CalendarClient::new(&config.calendar));
        Self {
            meetings: MeetingEngine::new(conn.clone()),
            action_items: ActionItemEngine::new(conn.clone()),
            decisions: DecisionEngine::new(conn.clone()),
            summarizer: Summarizer::new(llm),
            transcriber,
            calendar,
            conn,
            config,
        }
    }
}
