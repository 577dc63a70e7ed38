//! Meeting records and the endpoints hanging off them: CRUD, audio upload,
//! transcription, summarization and calendar scheduling.

use std::path::Path as FsPath;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::calendar::Attendee;
use crate::shared::error::{ApiError, StoreError};
use crate::shared::state::AppState;
use crate::shared::utils::DbPool;
use crate::summarize::extract::parse_due_date;

// Database model - matches schema exactly
#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::shared::schema::meetings)]
pub struct Meeting {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub date: Option<NaiveDateTime>,
    pub duration: Option<i32>,
    pub participants: Option<String>,
    pub status: Option<String>,
    pub audio_file_path: Option<String>,
    pub transcript: Option<String>,
    pub summary: Option<String>,
    pub calendar_event_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::shared::schema::meetings)]
struct NewMeeting {
    title: String,
    description: Option<String>,
    date: Option<NaiveDateTime>,
    duration: Option<i32>,
    participants: Option<String>,
    status: Option<String>,
    created_at: NaiveDateTime,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = crate::shared::schema::meetings)]
struct MeetingChangeset {
    title: Option<String>,
    description: Option<String>,
    date: Option<NaiveDateTime>,
    duration: Option<i32>,
    participants: Option<String>,
    status: Option<String>,
    audio_file_path: Option<String>,
    transcript: Option<String>,
    summary: Option<String>,
    calendar_event_id: Option<String>,
    updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMeetingRequest {
    pub title: String,
    pub description: Option<String>,
    pub date: Option<NaiveDateTime>,
    pub duration: Option<i32>,
    pub participants: Option<Vec<String>>,
    pub status: Option<String>,
}

/// Partial update: absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeetingUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<NaiveDateTime>,
    pub duration: Option<i32>,
    pub participants: Option<Vec<String>>,
    pub status: Option<String>,
    pub audio_file_path: Option<String>,
    pub transcript: Option<String>,
    pub summary: Option<String>,
    pub calendar_event_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeetingFilters {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
    pub date_from: Option<NaiveDateTime>,
    pub date_to: Option<NaiveDateTime>,
}

// API response model - participants decoded from their stored JSON string
#[derive(Debug, Clone, Serialize)]
pub struct MeetingResponse {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub date: Option<NaiveDateTime>,
    pub duration: Option<i32>,
    pub participants: Vec<String>,
    pub status: Option<String>,
    pub audio_file_path: Option<String>,
    pub transcript: Option<String>,
    pub summary: Option<String>,
    pub calendar_event_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

impl From<Meeting> for MeetingResponse {
    fn from(meeting: Meeting) -> Self {
        let participants = meeting
            .participants
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default();
        MeetingResponse {
            id: meeting.id,
            title: meeting.title,
            description: meeting.description,
            date: meeting.date,
            duration: meeting.duration,
            participants,
            status: meeting.status,
            audio_file_path: meeting.audio_file_path,
            transcript: meeting.transcript,
            summary: meeting.summary,
            calendar_event_id: meeting.calendar_event_id,
            created_at: meeting.created_at,
            updated_at: meeting.updated_at,
        }
    }
}

fn encode_participants(participants: Option<&[String]>) -> Option<String> {
    participants.map(|list| serde_json::to_string(list).unwrap_or_else(|_| "[]".to_string()))
}

#[derive(Clone)]
pub struct MeetingEngine {
    db: DbPool,
}

impl MeetingEngine {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub async fn create(&self, req: CreateMeetingRequest) -> Result<Meeting, StoreError> {
        use crate::shared::schema::meetings;

        let new_meeting = NewMeeting {
            title: req.title,
            description: req.description,
            date: req.date,
            duration: req.duration,
            participants: encode_participants(req.participants.as_deref()),
            status: req.status,
            created_at: Utc::now().naive_utc(),
        };

        let pool = self.db.clone();
        tokio::task::spawn_blocking(move || -> Result<Meeting, StoreError> {
            let mut conn = pool.get()?;
            let meeting = diesel::insert_into(meetings::table)
                .values(&new_meeting)
                .get_result(&mut conn)?;
            Ok(meeting)
        })
        .await?
    }

    pub async fn get(&self, meeting_id: i32) -> Result<Meeting, StoreError> {
        use crate::shared::schema::meetings;

        let pool = self.db.clone();
        tokio::task::spawn_blocking(move || -> Result<Meeting, StoreError> {
            let mut conn = pool.get()?;
            meetings::table
                .find(meeting_id)
                .first(&mut conn)
                .optional()?
                .ok_or(StoreError::NotFound("meeting"))
        })
        .await?
    }

    pub async fn list(&self, filters: MeetingFilters) -> Result<Vec<Meeting>, StoreError> {
        use crate::shared::schema::meetings;

        let pool = self.db.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<Meeting>, StoreError> {
            let mut conn = pool.get()?;
            let mut query = meetings::table.into_boxed();
            if let Some(status) = filters.status {
                query = query.filter(meetings::status.eq(status));
            }
            if let Some(from) = filters.date_from {
                query = query.filter(meetings::date.ge(from));
            }
            if let Some(to) = filters.date_to {
                query = query.filter(meetings::date.le(to));
            }
            let rows = query
                .order(meetings::created_at.desc())
                .offset(filters.skip.unwrap_or(0))
                .limit(filters.limit.unwrap_or(100))
                .load(&mut conn)?;
            Ok(rows)
        })
        .await?
    }

    pub async fn update(
        &self,
        meeting_id: i32,
        updates: MeetingUpdate,
    ) -> Result<Meeting, StoreError> {
        use crate::shared::schema::meetings;

        let changeset = MeetingChangeset {
            title: updates.title,
            description: updates.description,
            date: updates.date,
            duration: updates.duration,
            participants: encode_participants(updates.participants.as_deref()),
            status: updates.status,
            audio_file_path: updates.audio_file_path,
            transcript: updates.transcript,
            summary: updates.summary,
            calendar_event_id: updates.calendar_event_id,
            updated_at: Utc::now().naive_utc(),
        };

        let pool = self.db.clone();
        tokio::task::spawn_blocking(move || -> Result<Meeting, StoreError> {
            let mut conn = pool.get()?;
            diesel::update(meetings::table.find(meeting_id))
                .set(&changeset)
                .get_result(&mut conn)
                .optional()?
                .ok_or(StoreError::NotFound("meeting"))
        })
        .await?
    }

    /// Cascade delete: a meeting takes its action items and decisions with
    /// it, inside one transaction.
    pub async fn delete(&self, meeting_id: i32) -> Result<(), StoreError> {
        use crate::shared::schema::{action_items, decisions, meetings};

        let pool = self.db.clone();
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let mut conn = pool.get()?;
            conn.transaction::<_, diesel::result::Error, _>(|conn| {
                diesel::delete(
                    action_items::table.filter(action_items::meeting_id.eq(meeting_id)),
                )
                .execute(conn)?;
                diesel::delete(decisions::table.filter(decisions::meeting_id.eq(meeting_id)))
                    .execute(conn)?;
                let deleted = diesel::delete(meetings::table.find(meeting_id)).execute(conn)?;
                if deleted == 0 {
                    return Err(diesel::result::Error::NotFound);
                }
                Ok(())
            })
            .map_err(|err| match err {
                diesel::result::Error::NotFound => StoreError::NotFound("meeting"),
                other => StoreError::Database(other),
            })
        })
        .await?
    }
}

// HTTP handlers

pub async fn create_meeting(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateMeetingRequest>,
) -> Result<Json<MeetingResponse>, ApiError> {
    info!("creating meeting: {}", req.title);
    let meeting = state.meetings.create(req).await?;
    Ok(Json(meeting.into()))
}

pub async fn list_meetings(
    State(state): State<Arc<AppState>>,
    Query(filters): Query<MeetingFilters>,
) -> Result<Json<Vec<MeetingResponse>>, ApiError> {
    let meetings = state.meetings.list(filters).await?;
    Ok(Json(meetings.into_iter().map(Into::into).collect()))
}

pub async fn get_meeting(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<MeetingResponse>, ApiError> {
    let meeting = state.meetings.get(id).await?;
    Ok(Json(meeting.into()))
}

pub async fn update_meeting(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(updates): Json<MeetingUpdate>,
) -> Result<Json<MeetingResponse>, ApiError> {
    let meeting = state.meetings.update(id, updates).await?;
    Ok(Json(meeting.into()))
}

#[derive(Debug, Serialize)]
pub struct DeleteMeetingResponse {
    pub message: String,
    pub meeting_id: i32,
    pub calendar_event_id: Option<String>,
}

pub async fn delete_meeting(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<DeleteMeetingResponse>, ApiError> {
    let meeting = state.meetings.get(id).await?;

    // Calendar cleanup is best effort; a dead calendar never blocks the
    // database delete.
    if let Some(event_id) = meeting.calendar_event_id.as_deref() {
        if let Err(err) = state.calendar.delete_event(event_id).await {
            warn!("failed to delete calendar event {event_id}: {err}");
        }
    }

    state.meetings.delete(id).await?;
    info!("deleted meeting {id}");

    Ok(Json(DeleteMeetingResponse {
        message: "meeting deleted".to_string(),
        meeting_id: id,
        calendar_event_id: meeting.calendar_event_id,
    }))
}

#[derive(Debug, Serialize)]
pub struct UploadAudioResponse {
    pub message: String,
    pub file_path: String,
}

pub async fn upload_audio(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    mut multipart: Multipart,
) -> Result<Json<UploadAudioResponse>, ApiError> {
    state.meetings.get(id).await?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(|name| name.to_string())
            .unwrap_or_else(|| "audio".to_string());
        // Keep only the final path component of whatever the client sent.
        let filename = FsPath::new(&filename)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("failed to read upload: {e}")))?;

        let meeting_dir = state.config.uploads_dir.join(format!("meeting_{id}"));
        tokio::fs::create_dir_all(&meeting_dir)
            .await
            .map_err(|e| ApiError::Upstream(format!("cannot create upload dir: {e}")))?;
        let file_path = meeting_dir.join(&filename);
        tokio::fs::write(&file_path, &bytes)
            .await
            .map_err(|e| ApiError::Upstream(format!("cannot store upload: {e}")))?;

        let stored = file_path.to_string_lossy().into_owned();
        state
            .meetings
            .update(
                id,
                MeetingUpdate {
                    audio_file_path: Some(stored.clone()),
                    ..Default::default()
                },
            )
            .await?;

        info!("stored audio {filename} for meeting {id}");
        return Ok(Json(UploadAudioResponse {
            message: format!("audio file {filename} uploaded for meeting {id}"),
            file_path: stored,
        }));
    }

    Err(ApiError::BadRequest(
        "multipart body carries no file field".to_string(),
    ))
}

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub transcript: String,
}

pub async fn get_transcript(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<TranscriptResponse>, ApiError> {
    let meeting = state.meetings.get(id).await?;
    let transcript = meeting.transcript.filter(|t| !t.is_empty()).ok_or_else(|| {
        ApiError::BadRequest("no transcript available for this meeting".to_string())
    })?;
    Ok(Json(TranscriptResponse { transcript }))
}

pub async fn meeting_action_items(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<crate::action_items::ActionItem>>, ApiError> {
    state.meetings.get(id).await?;
    let items = state.action_items.list_for_meeting(id).await?;
    Ok(Json(items))
}

pub async fn meeting_decisions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<crate::decisions::Decision>>, ApiError> {
    state.meetings.get(id).await?;
    let decisions = state.decisions.list_for_meeting(id).await?;
    Ok(Json(decisions))
}

#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub message: String,
    pub transcript: String,
}

pub async fn transcribe_meeting(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<TranscribeResponse>, ApiError> {
    let meeting = state.meetings.get(id).await?;
    let audio_path = meeting.audio_file_path.filter(|p| !p.is_empty()).ok_or_else(|| {
        ApiError::BadRequest("no audio file has been uploaded for this meeting".to_string())
    })?;

    let path = FsPath::new(&audio_path);
    if !path.exists() {
        return Err(ApiError::NotFound("audio file"));
    }

    let transcript = state
        .transcriber
        .transcribe(path)
        .await
        .map_err(|err| ApiError::Upstream(err.to_string()))?;

    state
        .meetings
        .update(
            id,
            MeetingUpdate {
                transcript: Some(transcript.clone()),
                ..Default::default()
            },
        )
        .await?;

    info!("transcription completed for meeting {id}");
    Ok(Json(TranscribeResponse {
        message: format!("transcription completed for meeting {id}"),
        transcript,
    }))
}

#[derive(Debug, Serialize)]
pub struct SummarizeResponse {
    pub message: String,
    pub summary: String,
    pub action_items: Vec<crate::action_items::ActionItem>,
    pub decisions: Vec<crate::decisions::Decision>,
}

/// Summarize a transcript and best-effort persist whatever structure the
/// model yields. Model failures degrade to an empty summary and empty
/// lists rather than an error response.
pub async fn summarize_meeting(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<SummarizeResponse>, ApiError> {
    let meeting = state.meetings.get(id).await?;
    let transcript = meeting.transcript.filter(|t| !t.is_empty()).ok_or_else(|| {
        ApiError::BadRequest(
            "no transcript available for this meeting; transcribe first".to_string(),
        )
    })?;

    let summary = match state.summarizer.summarize(&transcript).await {
        Ok(summary) => summary,
        Err(err) => {
            warn!("summarization failed for meeting {id}: {err}");
            String::new()
        }
    };
    if !summary.is_empty() {
        if let Err(err) = state
            .meetings
            .update(
                id,
                MeetingUpdate {
                    summary: Some(summary.clone()),
                    ..Default::default()
                },
            )
            .await
        {
            warn!("failed to persist summary for meeting {id}: {err}");
        }
    }

    let mut saved_items = Vec::new();
    for item in state.summarizer.extract_action_items(&transcript).await {
        let req = crate::action_items::CreateActionItemRequest {
            meeting_id: id,
            title: item.title,
            description: item.description,
            assignee: item.assignee,
            due_date: item.due_date.as_deref().and_then(parse_due_date),
        };
        match state.action_items.create(req).await {
            Ok(saved) => saved_items.push(saved),
            Err(err) => warn!("failed to persist extracted action item: {err}"),
        }
    }

    let mut saved_decisions = Vec::new();
    for decision in state.summarizer.extract_decisions(&transcript).await {
        let req = crate::decisions::CreateDecisionRequest {
            meeting_id: id,
            title: decision.title,
            description: decision.description,
            decision_maker: decision.decision_maker,
            rationale: decision.rationale,
        };
        match state.decisions.create(req).await {
            Ok(saved) => saved_decisions.push(saved),
            Err(err) => warn!("failed to persist extracted decision: {err}"),
        }
    }

    Ok(Json(SummarizeResponse {
        message: format!("summarization completed for meeting {id}"),
        summary,
        action_items: saved_items,
        decisions: saved_decisions,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub attendees: Vec<Attendee>,
}

#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    pub message: String,
    pub event_id: String,
    pub calendar_link: Option<String>,
    pub meet_link: Option<String>,
}

pub async fn schedule_meeting(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(req): Json<ScheduleRequest>,
) -> Result<Json<ScheduleResponse>, ApiError> {
    let meeting = state.meetings.get(id).await?;

    let mut description = format!("Meeting Title: {}\n\n", meeting.title);
    if let Some(text) = meeting.description.as_deref() {
        description.push_str(&format!("Description: {text}\n\n"));
    }
    if let Some(text) = meeting.summary.as_deref() {
        description.push_str(&format!("Summary: {text}\n\n"));
    }

    let event = state
        .calendar
        .create_event(
            &meeting.title,
            &description,
            req.start_time,
            req.end_time,
            &req.attendees,
        )
        .await
        .map_err(|err| ApiError::Upstream(err.to_string()))?;

    state
        .meetings
        .update(
            id,
            MeetingUpdate {
                calendar_event_id: Some(event.event_id.clone()),
                ..Default::default()
            },
        )
        .await?;

    info!("scheduled meeting {id} as calendar event {}", event.event_id);
    Ok(Json(ScheduleResponse {
        message: "meeting scheduled".to_string(),
        event_id: event.event_id,
        calendar_link: event.html_link,
        meet_link: event.meet_link,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpcomingQuery {
    pub max_results: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct UpcomingResponse {
    pub events: Vec<crate::calendar::UpcomingEvent>,
}

pub async fn upcoming_meetings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UpcomingQuery>,
) -> Result<Json<UpcomingResponse>, ApiError> {
    let events = state
        .calendar
        .list_upcoming(query.max_results.unwrap_or(10))
        .await
        .map_err(|err| ApiError::Upstream(err.to_string()))?;
    Ok(Json(UpcomingResponse { events }))
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/meetings", post(create_meeting).get(list_meetings))
        .route("/api/meetings/calendar/upcoming", get(upcoming_meetings))
        .route(
            "/api/meetings/:id",
            get(get_meeting)
                .put(update_meeting)
                .delete(delete_meeting),
        )
        .route("/api/meetings/:id/upload-audio", post(upload_audio))
        .route("/api/meetings/:id/transcript", get(get_transcript))
        .route("/api/meetings/:id/action-items", get(meeting_action_items))
        .route("/api/meetings/:id/decisions", get(meeting_decisions))
        .route("/api/meetings/:id/transcribe", post(transcribe_meeting))
        .route("/api/meetings/:id/summarize", post(summarize_meeting))
        .route("/api/meetings/:id/schedule", post(schedule_meeting))
}
