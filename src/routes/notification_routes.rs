// src/routes/notification_routes.rs

use axum::{
    extract::State,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{AppState, ROLE_ADMIN},
    notify::{DispatchReceipt, Segment},
};

pub fn router() -> Router<AppState> {
    Router::new().route("/notifications", post(send_notification).get(list_notifications))
}

fn ensure_admin(auth: &AuthContext) -> Result<(), ApiError> {
    if auth.role == ROLE_ADMIN {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "FORBIDDEN",
            "Only admin can send notifications".into(),
        ))
    }
}

#[derive(Debug, Deserialize)]
pub struct SendNotificationRequest {
    pub segment: Segment,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct SendNotificationResponse {
    pub data: DispatchReceipt,
}

pub async fn send_notification(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<SendNotificationRequest>,
) -> Result<Json<SendNotificationResponse>, ApiError> {
    ensure_admin(&auth)?;

    let title = req.title.trim();
    let body = req.body.trim();
    if title.is_empty() || body.is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "title and body are required".into(),
        ));
    }
    if title.len() > 120 {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "title is too long (max 120)".into(),
        ));
    }

    let receipt = state.dispatcher.notify(req.segment, title, body).await?;
    Ok(Json(SendNotificationResponse { data: receipt }))
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct NotificationLogRow {
    pub notification_id: Uuid,
    pub segment: String,
    pub title: String,
    pub body: String,
    pub recipient_count: i64,
    pub sent_at: chrono::DateTime<chrono::Utc>,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<NotificationLogRow>>, ApiError> {
    ensure_admin(&auth)?;

    let rows: Vec<NotificationLogRow> = sqlx::query_as::<_, NotificationLogRow>(
        r#"
        SELECT notification_id, segment, title, body, recipient_count, sent_at
        FROM notification_log
        ORDER BY sent_at DESC
        LIMIT 100
        "#,
    )
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::backend)?;

    Ok(Json(rows))
}
