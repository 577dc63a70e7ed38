pub mod action_items;
pub mod api_router;
pub mod calendar;
pub mod config;
pub mod decisions;
pub mod llm;
pub mod meetings;
pub mod shared;
pub mod summarize;
pub mod transcription;
