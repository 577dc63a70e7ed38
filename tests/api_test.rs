//! End-to-end exercises of the HTTP surface against an in-memory database,
//! with the model backends stubbed out.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::SqliteConnection;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use meetserver::api_router::configure_api_routes;
use meetserver::config::{AppConfig, CalendarConfig, LlmConfig, ServerConfig, WhisperConfig};
use meetserver::llm::{LLMProvider, LlmError};
use meetserver::shared::state::AppState;
use meetserver::shared::utils::run_migrations;
use meetserver::transcription::{SpeechToText, TranscriptionError};

struct ScriptedLlm;

#[async_trait]
impl LLMProvider for ScriptedLlm {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        if prompt.starts_with("Extract action items") {
            Ok(json!([{
                "title": "Ship the report",
                "description": "Finalize and send the quarterly report",
                "assignee": "Dana",
                "due_date": "2026-09-05"
            }])
            .to_string())
        } else if prompt.starts_with("Extract decisions") {
            Ok(json!([{
                "title": "Move standup to 9am",
                "description": "Earlier slot works for both timezones",
                "decision_maker": "Priya",
                "rationale": "Fewer conflicts"
            }])
            .to_string())
        } else {
            Ok("The team reviewed the quarter and assigned follow-ups.".to_string())
        }
    }
}

struct FixedTranscriber;

#[async_trait]
impl SpeechToText for FixedTranscriber {
    async fn transcribe(&self, _audio_path: &Path) -> Result<String, TranscriptionError> {
        Ok("We agreed to ship the report. Dana owns it.".to_string())
    }
}

fn test_config(uploads_dir: &Path) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database_url: ":memory:".to_string(),
        uploads_dir: uploads_dir.to_path_buf(),
        whisper: WhisperConfig {
            api_url: "http://localhost:9".to_string(),
            model: "whisper-1".to_string(),
        },
        llm: LlmConfig {
            api_url: "http://localhost:9".to_string(),
            api_key: String::new(),
            model: "test".to_string(),
        },
        calendar: CalendarConfig {
            api_url: "http://localhost:9".to_string(),
            credentials_file: uploads_dir.join("credentials.json"),
            token_file: uploads_dir.join("token.json"),
        },
    }
}

fn test_app(uploads_dir: &Path) -> Router {
    let manager = ConnectionManager::<SqliteConnection>::new(":memory:");
    let pool = Pool::builder().max_size(1).build(manager).unwrap();
    run_migrations(&pool).unwrap();

    let state = Arc::new(AppState::with_clients(
        pool,
        test_config(uploads_dir),
        Arc::new(ScriptedLlm),
        Arc::new(FixedTranscriber),
    ));
    configure_api_routes().with_state(state)
}

async fn send_json(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = match body {
        Some(body) => Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create_meeting(app: &Router, title: &str) -> i32 {
    let (status, body) = send_json(
        app,
        "POST",
        "/api/meetings",
        Some(json!({ "title": title, "participants": ["Dana", "Priya"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["id"].as_i64().unwrap() as i32
}

#[tokio::test]
async fn health_reports_ok() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    let (status, body) = send_json(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn meeting_crud_over_http() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    let id = create_meeting(&app, "Quarterly review").await;

    let (status, body) = send_json(&app, "GET", &format!("/api/meetings/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Quarterly review");
    assert_eq!(body["participants"], json!(["Dana", "Priya"]));

    let (status, body) = send_json(
        &app,
        "PUT",
        &format!("/api/meetings/{id}"),
        Some(json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["title"], "Quarterly review");

    let (status, _) = send_json(&app, "DELETE", &format!("/api/meetings/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send_json(&app, "GET", &format!("/api/meetings/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("meeting"));
}

#[tokio::test]
async fn missing_meeting_returns_404_payload() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    let (status, body) = send_json(&app, "GET", "/api/meetings/4242", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.get("error").is_some());
}

#[tokio::test]
async fn action_item_requires_existing_meeting() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/action-items",
        Some(json!({
            "meeting_id": 999,
            "title": "Orphan",
            "description": "no parent",
            "assignee": "Dana"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn action_item_crud_over_http() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());
    let meeting_id = create_meeting(&app, "Planning").await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/action-items",
        Some(json!({
            "meeting_id": meeting_id,
            "title": "Write the doc",
            "description": "Draft the design doc",
            "assignee": "Priya"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let item_id = body["id"].as_i64().unwrap();

    let (status, body) = send_json(
        &app,
        "GET",
        &format!("/api/meetings/{meeting_id}/action-items"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = send_json(
        &app,
        "PUT",
        &format!("/api/action-items/{item_id}"),
        Some(json!({ "assignee": "Dana" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["assignee"], "Dana");
    assert_eq!(body["title"], "Write the doc");
}

#[tokio::test]
async fn decision_crud_over_http() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());
    let meeting_id = create_meeting(&app, "Steering").await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/decisions",
        Some(json!({
            "meeting_id": meeting_id,
            "title": "Adopt the new pipeline",
            "description": "Replace the cron jobs",
            "decision_maker": "Priya",
            "rationale": "Less operational load"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let decision_id = body["id"].as_i64().unwrap();

    let (status, body) =
        send_json(&app, "GET", &format!("/api/decisions/{decision_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["decision_maker"], "Priya");

    let (status, _) =
        send_json(&app, "DELETE", &format!("/api/decisions/{decision_id}"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) =
        send_json(&app, "GET", &format!("/api/decisions/{decision_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn transcript_missing_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());
    let meeting_id = create_meeting(&app, "Silent meeting").await;

    let (status, _) = send_json(
        &app,
        "GET",
        &format!("/api/meetings/{meeting_id}/transcript"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/api/meetings/{meeting_id}/summarize"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

fn multipart_request(uri: &str, filename: &str, bytes: &[u8]) -> Request<Body> {
    let boundary = "meetserver-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: audio/wav\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn upload_transcribe_summarize_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());
    let meeting_id = create_meeting(&app, "Recorded sync").await;

    let request = multipart_request(
        &format!("/api/meetings/{meeting_id}/upload-audio"),
        "sync.wav",
        b"not really audio",
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, body) = send_json(
        &app,
        "POST",
        &format!("/api/meetings/{meeting_id}/transcribe"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["transcript"].as_str().unwrap().contains("Dana"));

    let (status, body) = send_json(
        &app,
        "POST",
        &format!("/api/meetings/{meeting_id}/summarize"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["summary"].as_str().unwrap().contains("quarter"));

    let (_, items) = send_json(
        &app,
        "GET",
        &format!("/api/meetings/{meeting_id}/action-items"),
        None,
    )
    .await;
    let items = items.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "Ship the report");
    assert_eq!(items[0]["assignee"], "Dana");

    let (_, decisions) = send_json(
        &app,
        "GET",
        &format!("/api/meetings/{meeting_id}/decisions"),
        None,
    )
    .await;
    let decisions = decisions.as_array().unwrap();
    assert_eq!(decisions.len(), 1);
    assert_eq!(decisions[0]["title"], "Move standup to 9am");
}
