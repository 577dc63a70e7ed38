//! External calendar synchronization.
//!
//! Talks to a Google-Calendar-v3-style REST API. Credentials come from a
//! desktop-app `credentials.json`; the access/refresh token pair is cached
//! in a JSON file next to it and refreshed with the refresh-token grant
//! when expired. The server never runs an interactive consent flow, so the
//! token file must be seeded by a pre-authorized client.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::CalendarConfig;

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("credential storage error: {0}")]
    Io(#[from] std::io::Error),
    #[error("calendar credentials not usable: {0}")]
    Auth(String),
    #[error("request to calendar API failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed calendar response: {0}")]
    Malformed(String),
}

#[derive(Debug, Deserialize)]
struct CredentialsFile {
    installed: InstalledCredentials,
}

#[derive(Debug, Clone, Deserialize)]
struct InstalledCredentials {
    client_id: String,
    client_secret: String,
    token_uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp after which `access_token` is stale.
    #[serde(default)]
    pub expires_at: i64,
}

impl StoredToken {
    /// A minute of slack so a token never expires mid-request.
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at <= now + 60
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attendee {
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedEvent {
    pub event_id: String,
    pub html_link: Option<String>,
    pub meet_link: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpcomingEvent {
    pub id: String,
    pub summary: String,
    pub description: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub html_link: Option<String>,
    pub meet_link: Option<String>,
    pub attendees: Vec<String>,
}

pub struct CalendarClient {
    client: reqwest::Client,
    base_url: String,
    credentials_file: PathBuf,
    token_file: PathBuf,
    token: Mutex<Option<StoredToken>>,
}

impl CalendarClient {
    pub fn new(config: &CalendarConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.api_url.trim_end_matches('/').to_string(),
            credentials_file: config.credentials_file.clone(),
            token_file: config.token_file.clone(),
            token: Mutex::new(None),
        }
    }

    fn load_credentials(&self) -> Result<InstalledCredentials, CalendarError> {
        let raw = std::fs::read_to_string(&self.credentials_file).map_err(|_| {
            CalendarError::Auth(format!(
                "credentials file {} not found; place your desktop app credentials there",
                self.credentials_file.display()
            ))
        })?;
        let parsed: CredentialsFile = serde_json::from_str(&raw)
            .map_err(|e| CalendarError::Auth(format!("invalid credentials file: {e}")))?;
        Ok(parsed.installed)
    }

    fn load_token_file(path: &Path) -> Result<StoredToken, CalendarError> {
        let raw = std::fs::read_to_string(path).map_err(|_| {
            CalendarError::Auth(format!(
                "token file {} not found; authorize the calendar once to seed it",
                path.display()
            ))
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| CalendarError::Auth(format!("invalid token file: {e}")))
    }

    async fn refresh_token(
        &self,
        credentials: &InstalledCredentials,
        token: &StoredToken,
    ) -> Result<StoredToken, CalendarError> {
        let response = self
            .client
            .post(&credentials.token_uri)
            .form(&[
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("refresh_token", token.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(CalendarError::Auth(format!(
                "token refresh rejected with {}",
                response.status()
            )));
        }
        let refreshed: TokenResponse = response
            .json()
            .await
            .map_err(|e| CalendarError::Malformed(e.to_string()))?;
        Ok(StoredToken {
            access_token: refreshed.access_token,
            refresh_token: token.refresh_token.clone(),
            expires_at: Utc::now().timestamp() + refreshed.expires_in,
        })
    }

    /// Returns a valid access token, refreshing and rewriting the cache
    /// file when the stored one has gone stale.
    async fn access_token(&self) -> Result<String, CalendarError> {
        let mut guard = self.token.lock().await;
        if guard.is_none() {
            *guard = Some(Self::load_token_file(&self.token_file)?);
        }
        let token = guard.as_ref().map(Clone::clone).ok_or_else(|| {
            CalendarError::Auth("calendar token unavailable".to_string())
        })?;

        if !token.is_expired(Utc::now().timestamp()) {
            return Ok(token.access_token);
        }

        let credentials = self.load_credentials()?;
        let refreshed = self.refresh_token(&credentials, &token).await?;
        std::fs::write(&self.token_file, serde_json::to_string_pretty(&refreshed).unwrap_or_default())?;
        let access = refreshed.access_token.clone();
        *guard = Some(refreshed);
        info!("refreshed calendar access token");
        Ok(access)
    }

    pub async fn create_event(
        &self,
        summary: &str,
        description: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        attendees: &[Attendee],
    ) -> Result<CreatedEvent, CalendarError> {
        let token = self.access_token().await?;
        let payload = event_payload(summary, description, start_time, end_time, attendees);

        let response = self
            .client
            .post(format!(
                "{}/calendars/primary/events?sendUpdates=all",
                self.base_url
            ))
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        let event: Value = response.json().await?;
        let event_id = event["id"]
            .as_str()
            .ok_or_else(|| CalendarError::Malformed("created event has no id".to_string()))?
            .to_string();

        Ok(CreatedEvent {
            event_id,
            html_link: event["htmlLink"].as_str().map(String::from),
            meet_link: event["hangoutLink"].as_str().map(String::from),
            start_time: event["start"]["dateTime"].as_str().map(String::from),
            end_time: event["end"]["dateTime"].as_str().map(String::from),
        })
    }

    pub async fn delete_event(&self, event_id: &str) -> Result<(), CalendarError> {
        let token = self.access_token().await?;
        let response = self
            .client
            .delete(format!(
                "{}/calendars/primary/events/{event_id}",
                self.base_url
            ))
            .bearer_auth(token)
            .send()
            .await?;

        // An already-removed event is not a failure.
        if response.status().is_success()
            || response.status() == reqwest::StatusCode::NOT_FOUND
            || response.status() == reqwest::StatusCode::GONE
        {
            Ok(())
        } else {
            Err(CalendarError::Malformed(format!(
                "delete rejected with {}",
                response.status()
            )))
        }
    }

    pub async fn list_upcoming(
        &self,
        max_results: u32,
    ) -> Result<Vec<UpcomingEvent>, CalendarError> {
        let token = self.access_token().await?;
        let now = Utc::now().to_rfc3339();

        let response = self
            .client
            .get(format!("{}/calendars/primary/events", self.base_url))
            .bearer_auth(token)
            .query(&[
                ("timeMin", now.as_str()),
                ("maxResults", &max_results.to_string()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: Value = response.json().await?;
        let items = body["items"].as_array().cloned().unwrap_or_default();

        Ok(items.iter().map(parse_upcoming_event).collect())
    }
}

fn event_payload(
    summary: &str,
    description: &str,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    attendees: &[Attendee],
) -> Value {
    let mut payload = serde_json::json!({
        "summary": summary,
        "description": description,
        "start": { "dateTime": start_time.to_rfc3339(), "timeZone": "UTC" },
        "end": { "dateTime": end_time.to_rfc3339(), "timeZone": "UTC" },
        "reminders": {
            "useDefault": false,
            "overrides": [
                { "method": "email", "minutes": 24 * 60 },
                { "method": "popup", "minutes": 30 },
            ],
        },
    });
    if !attendees.is_empty() {
        payload["attendees"] = attendees
            .iter()
            .map(|a| serde_json::json!({ "email": a.email }))
            .collect();
    }
    payload
}

fn parse_upcoming_event(event: &Value) -> UpcomingEvent {
    // All-day events carry `date` instead of `dateTime`.
    let start = event["start"]["dateTime"]
        .as_str()
        .or_else(|| event["start"]["date"].as_str())
        .map(String::from);
    let end = event["end"]["dateTime"]
        .as_str()
        .or_else(|| event["end"]["date"].as_str())
        .map(String::from);

    UpcomingEvent {
        id: event["id"].as_str().unwrap_or_default().to_string(),
        summary: event["summary"].as_str().unwrap_or_default().to_string(),
        description: event["description"].as_str().unwrap_or_default().to_string(),
        start_time: start,
        end_time: end,
        html_link: event["htmlLink"].as_str().map(String::from),
        meet_link: event["hangoutLink"].as_str().map(String::from),
        attendees: event["attendees"]
            .as_array()
            .map(|list| {
                list.iter()
                    .filter_map(|a| a["email"].as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default(),
    }
}
