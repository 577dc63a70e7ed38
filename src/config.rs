use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database_url: String,
    pub uploads_dir: PathBuf,
    pub whisper: WhisperConfig,
    pub llm: LlmConfig,
    pub calendar: CalendarConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct WhisperConfig {
    /// OpenAI-compatible speech-to-text endpoint base, e.g. a local
    /// whisper server exposing `/v1/audio/transcriptions`.
    pub api_url: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// OpenAI-compatible chat-completions endpoint base.
    pub api_url: String,
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct CalendarConfig {
    pub api_url: String,
    pub credentials_file: PathBuf,
    pub token_file: PathBuf,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                host: env_or("SERVER_HOST", "0.0.0.0"),
                port: env_or("SERVER_PORT", "8000").parse().unwrap_or(8000),
            },
            database_url: env_or("DATABASE_URL", "meetserver.db"),
            uploads_dir: PathBuf::from(env_or("UPLOADS_DIR", "uploads")),
            whisper: WhisperConfig {
                api_url: env_or("WHISPER_API_URL", "http://localhost:8080/v1"),
                model: env_or("WHISPER_MODEL", "whisper-1"),
            },
            llm: LlmConfig {
                api_url: env_or("LLM_API_URL", "http://localhost:11434/v1"),
                api_key: env_or("LLM_API_KEY", ""),
                model: env_or("LLM_MODEL", "gpt-3.5-turbo"),
            },
            calendar: CalendarConfig {
                api_url: env_or("CALENDAR_API_URL", "https://www.googleapis.com/calendar/v3"),
                credentials_file: PathBuf::from(env_or(
                    "CALENDAR_CREDENTIALS_FILE",
                    "credentials.json",
                )),
                token_file: PathBuf::from(env_or("CALENDAR_TOKEN_FILE", "token.json")),
            },
        }
    }
}
