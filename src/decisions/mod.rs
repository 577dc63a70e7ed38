//! Decisions recorded against a meeting: what was chosen, by whom and why.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::shared::error::{ApiError, StoreError};
use crate::shared::state::AppState;
use crate::shared::utils::DbPool;

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::shared::schema::decisions)]
pub struct Decision {
    pub id: i32,
    pub meeting_id: i32,
    pub title: String,
    pub description: String,
    pub decision_maker: String,
    pub rationale: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::shared::schema::decisions)]
struct NewDecision {
    meeting_id: i32,
    title: String,
    description: String,
    decision_maker: String,
    rationale: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDecisionRequest {
    pub meeting_id: i32,
    pub title: String,
    pub description: String,
    pub decision_maker: String,
    pub rationale: String,
}

#[derive(Debug, Clone, Default, Deserialize, AsChangeset)]
#[diesel(table_name = crate::shared::schema::decisions)]
pub struct DecisionUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub decision_maker: Option<String>,
    pub rationale: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DecisionFilters {
    pub meeting_id: Option<i32>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Clone)]
pub struct DecisionEngine {
    db: DbPool,
}

impl DecisionEngine {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub async fn create(&self, req: CreateDecisionRequest) -> Result<Decision, StoreError> {
        use crate::shared::schema::decisions;

        let now = Utc::now().naive_utc();
        let new_decision = NewDecision {
            meeting_id: req.meeting_id,
            title: req.title,
            description: req.description,
            decision_maker: req.decision_maker,
            rationale: req.rationale,
            created_at: now,
            updated_at: now,
        };

        let pool = self.db.clone();
        tokio::task::spawn_blocking(move || -> Result<Decision, StoreError> {
            let mut conn = pool.get()?;
            let decision = diesel::insert_into(decisions::table)
                .values(&new_decision)
                .get_result(&mut conn)?;
            Ok(decision)
        })
        .await?
    }

    pub async fn get(&self, decision_id: i32) -> Result<Decision, StoreError> {
        use crate::shared::schema::decisions;

        let pool = self.db.clone();
        tokio::task::spawn_blocking(move || -> Result<Decision, StoreError> {
            let mut conn = pool.get()?;
            decisions::table
                .find(decision_id)
                .first(&mut conn)
                .optional()?
                .ok_or(StoreError::NotFound("decision"))
        })
        .await?
    }

    pub async fn list(&self, filters: DecisionFilters) -> Result<Vec<Decision>, StoreError> {
        use crate::shared::schema::decisions;

        let pool = self.db.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<Decision>, StoreError> {
            let mut conn = pool.get()?;
            let mut query = decisions::table.into_boxed();
            if let Some(meeting_id) = filters.meeting_id {
                query = query.filter(decisions::meeting_id.eq(meeting_id));
            }
            let rows = query
                .order(decisions::created_at.desc())
                .offset(filters.skip.unwrap_or(0))
                .limit(filters.limit.unwrap_or(100))
                .load(&mut conn)?;
            Ok(rows)
        })
        .await?
    }

    pub async fn list_for_meeting(&self, meeting_id: i32) -> Result<Vec<Decision>, StoreError> {
        self.list(DecisionFilters {
            meeting_id: Some(meeting_id),
            skip: None,
            limit: None,
        })
        .await
    }

    pub async fn update(
        &self,
        decision_id: i32,
        updates: DecisionUpdate,
    ) -> Result<Decision, StoreError> {
        use crate::shared::schema::decisions;

        let pool = self.db.clone();
        tokio::task::spawn_blocking(move || -> Result<Decision, StoreError> {
            let mut conn = pool.get()?;
            diesel::update(decisions::table.find(decision_id))
                .set((&updates, decisions::updated_at.eq(Utc::now().naive_utc())))
                .get_result(&mut conn)
                .optional()?
                .ok_or(StoreError::NotFound("decision"))
        })
        .await?
    }

    pub async fn delete(&self, decision_id: i32) -> Result<(), StoreError> {
        use crate::shared::schema::decisions;

        let pool = self.db.clone();
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let mut conn = pool.get()?;
            let deleted = diesel::delete(decisions::table.find(decision_id)).execute(&mut conn)?;
            if deleted == 0 {
                return Err(StoreError::NotFound("decision"));
            }
            Ok(())
        })
        .await?
    }
}

// HTTP handlers

pub async fn create_decision(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateDecisionRequest>,
) -> Result<Json<Decision>, ApiError> {
    state.meetings.get(req.meeting_id).await?;
    let decision = state.decisions.create(req).await?;
    info!("created decision {} for meeting {}", decision.id, decision.meeting_id);
    Ok(Json(decision))
}

pub async fn list_decisions(
    State(state): State<Arc<AppState>>,
    Query(filters): Query<DecisionFilters>,
) -> Result<Json<Vec<Decision>>, ApiError> {
    let decisions = state.decisions.list(filters).await?;
    Ok(Json(decisions))
}

pub async fn get_decision(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<Decision>, ApiError> {
    let decision = state.decisions.get(id).await?;
    Ok(Json(decision))
}

pub async fn update_decision(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(updates): Json<DecisionUpdate>,
) -> Result<Json<Decision>, ApiError> {
    let decision = state.decisions.update(id, updates).await?;
    Ok(Json(decision))
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub message: String,
}

pub async fn delete_decision(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<DeletedResponse>, ApiError> {
    state.decisions.delete(id).await?;
    Ok(Json(DeletedResponse {
        message: "decision deleted".to_string(),
    }))
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/decisions", post(create_decision).get(list_decisions))
        .route(
            "/api/decisions/:id",
            get(get_decision).put(update_decision).delete(delete_decision),
        )
}
