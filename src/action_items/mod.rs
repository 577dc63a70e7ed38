//! Action items: tasks extracted from (or logged against) a meeting, with
//! an owner and optional due date.

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
#[diesel(table_name = crate::shared::schema::action_items)]
pub struct ActionItem {
    pub id: i32,
    pub meeting_id: i32,
    pub title: String,
    pub description: String,
    pub assignee: String,
    pub due_date: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::shared::schema::action_items)]
struct NewActionItem {
    meeting_id: i32,
    title: String,
    description: String,
    assignee: String,
    due_date: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateActionItemRequest {
    pub meeting_id: i32,
    pub title: String,
    pub description: String,
    pub assignee: String,
    pub due_date: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default, Deserialize, AsChangeset)]
#[diesel(table_name = crate::shared::schema::action_items)]
pub struct ActionItemUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub due_date: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionItemFilters {
    pub meeting_id: Option<i32>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Clone)]
pub struct ActionItemEngine {
    db: DbPool,
}

impl ActionItemEngine {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub async fn create(&self, req: CreateActionItemRequest) -> Result<ActionItem, StoreError> {
        use crate::shared::schema::action_items;

        let now = Utc::now().naive_utc();
        let new_item = NewActionItem {
            meeting_id: req.meeting_id,
            title: req.title,
            description: req.description,
            assignee: req.assignee,
            due_date: req.due_date,
            created_at: now,
            updated_at: now,
        };

        let pool = self.db.clone();
        tokio::task::spawn_blocking(move || -> Result<ActionItem, StoreError> {
            let mut conn = pool.get()?;
            let item = diesel::insert_into(action_items::table)
                .values(&new_item)
                .get_result(&mut conn)?;
            Ok(item)
        })
        .await?
    }

    pub async fn get(&self, item_id: i32) -> Result<ActionItem, StoreError> {
        use crate::shared::schema::action_items;

        let pool = self.db.clone();
        tokio::task::spawn_blocking(move || -> Result<ActionItem, StoreError> {
            let mut conn = pool.get()?;
            action_items::table
                .find(item_id)
                .first(&mut conn)
                .optional()?
                .ok_or(StoreError::NotFound("action item"))
        })
        .await?
    }

    pub async fn list(&self, filters: ActionItemFilters) -> Result<Vec<ActionItem>, StoreError> {
        use crate::shared::schema::action_items;

        let pool = self.db.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<ActionItem>, StoreError> {
            let mut conn = pool.get()?;
            let mut query = action_items::table.into_boxed();
            if let Some(meeting_id) = filters.meeting_id {
                query = query.filter(action_items::meeting_id.eq(meeting_id));
            }
            let rows = query
                .order(action_items::created_at.desc())
                .offset(filters.skip.unwrap_or(0))
                .limit(filters.limit.unwrap_or(100))
                .load(&mut conn)?;
            Ok(rows)
        })
        .await?
    }

    pub async fn list_for_meeting(&self, meeting_id: i32) -> Result<Vec<ActionItem>, StoreError> {
        self.list(ActionItemFilters {
            meeting_id: Some(meeting_id),
            skip: None,
            limit: None,
        })
        .await
    }

    pub async fn update(
        &self,
        item_id: i32,
        updates: ActionItemUpdate,
    ) -> Result<ActionItem, StoreError> {
        use crate::shared::schema::action_items;

        let pool = self.db.clone();
        tokio::task::spawn_blocking(move || -> Result<ActionItem, StoreError> {
            let mut conn = pool.get()?;
            diesel::update(action_items::table.find(item_id))
                .set((&updates, action_items::updated_at.eq(Utc::now().naive_utc())))
                .get_result(&mut conn)
                .optional()?
                .ok_or(StoreError::NotFound("action item"))
        })
        .await?
    }

    pub async fn delete(&self, item_id: i32) -> Result<(), StoreError> {
        use crate::shared::schema::action_items;

        let pool = self.db.clone();
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let mut conn = pool.get()?;
            let deleted =
                diesel::delete(action_items::table.find(item_id)).execute(&mut conn)?;
            if deleted == 0 {
                return Err(StoreError::NotFound("action item"));
            }
            Ok(())
        })
        .await?
    }
}

// HTTP handlers

pub async fn create_action_item(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateActionItemRequest>,
) -> Result<Json<ActionItem>, ApiError> {
    // Children must point at a real meeting.
    state.meetings.get(req.meeting_id).await?;
    let item = state.action_items.create(req).await?;
    info!("created action item {} for meeting {}", item.id, item.meeting_id);
    Ok(Json(item))
}

pub async fn list_action_items(
    State(state): State<Arc<AppState>>,
    Query(filters): Query<ActionItemFilters>,
) -> Result<Json<Vec<ActionItem>>, ApiError> {
    let items = state.action_items.list(filters).await?;
    Ok(Json(items))
}

pub async fn get_action_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ActionItem>, ApiError> {
    let item = state.action_items.get(id).await?;
    Ok(Json(item))
}

pub async fn update_action_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(updates): Json<ActionItemUpdate>,
) -> Result<Json<ActionItem>, ApiError> {
    let item = state.action_items.update(id, updates).await?;
    Ok(Json(item))
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub message: String,
}

pub async fn delete_action_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<DeletedResponse>, ApiError> {
    state.action_items.delete(id).await?;
    Ok(Json(DeletedResponse {
        message: "action item deleted".to_string(),
    }))
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/action-items",
            post(create_action_item).get(list_action_items),
        )
        .route(
            "/api/action-items/:id",
            get(get_action_item)
                .put(update_action_item)
                .delete(delete_action_item),
        )
}
