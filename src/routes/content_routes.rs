// src/routes/content_routes.rs

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{AppState, OkData, OkResponse, ROLE_ADMIN},
};

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ContentRow {
    pub content_id: Uuid,
    pub title: String,
    pub body: String,
    pub category: String,
    pub is_published: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/content", get(list_content).post(create_content))
        .route(
            "/content/{content_id}",
            get(get_content).patch(update_content).delete(delete_content),
        )
        .route("/content/{content_id}/publish", post(publish_content))
        .route("/content/{content_id}/unpublish", post(unpublish_content))
}

fn is_admin(auth: &AuthContext) -> bool {
    auth.role == ROLE_ADMIN
}

fn ensure_admin(auth: &AuthContext) -> Result<(), ApiError> {
    if is_admin(auth) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "FORBIDDEN",
            "Only admin can manage content".into(),
        ))
    }
}

fn validate_title(title: &str) -> Result<&str, ApiError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "title is required".into(),
        ));
    }
    if title.len() > 160 {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "title is too long (max 160)".into(),
        ));
    }
    Ok(title)
}

/// Patients see published posts; admins see everything.
pub async fn list_content(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<ContentRow>>, ApiError> {
    let rows: Vec<ContentRow> = sqlx::query_as::<_, ContentRow>(
        r#"
        SELECT content_id, title, body, category, is_published, created_at, updated_at
        FROM clinic_content
        WHERE ($1 OR is_published = true)
        ORDER BY created_at DESC
        "#,
    )
    .bind(is_admin(&auth))
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::backend)?;

    Ok(Json(rows))
}

pub async fn get_content(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(content_id): Path<Uuid>,
) -> Result<Json<ContentRow>, ApiError> {
    let row: ContentRow = sqlx::query_as::<_, ContentRow>(
        r#"
        SELECT content_id, title, body, category, is_published, created_at, updated_at
        FROM clinic_content
        WHERE content_id = $1
          AND ($2 OR is_published = true)
        "#,
    )
    .bind(content_id)
    .bind(is_admin(&auth))
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::backend)?
    .ok_or_else(|| ApiError::NotFound("NOT_FOUND", "content not found".to_string()))?;

    Ok(Json(row))
}

#[derive(Debug, Deserialize)]
pub struct CreateContentRequest {
    pub title: String,
    pub body: String,
    pub category: Option<String>,
    pub is_published: Option<bool>,
}

pub async fn create_content(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateContentRequest>,
) -> Result<Json<ContentRow>, ApiError> {
    ensure_admin(&auth)?;

    let title = validate_title(&req.title)?;
    let body = req.body.trim();
    if body.is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "body is required".into(),
        ));
    }

    let row: ContentRow = sqlx::query_as::<_, ContentRow>(
        r#"
        INSERT INTO clinic_content (title, body, category, is_published)
        VALUES ($1, $2, $3, $4)
        RETURNING content_id, title, body, category, is_published, created_at, updated_at
        "#,
    )
    .bind(title)
    .bind(body)
    .bind(req.category.as_deref().map(str::trim).unwrap_or("geral"))
    .bind(req.is_published.unwrap_or(false))
    .fetch_one(&state.db)
    .await
    .map_err(ApiError::backend)?;

    Ok(Json(row))
}

#[derive(Debug, Deserialize)]
pub struct UpdateContentRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub category: Option<String>,
}

pub async fn update_content(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(content_id): Path<Uuid>,
    Json(req): Json<UpdateContentRequest>,
) -> Result<Json<ContentRow>, ApiError> {
    ensure_admin(&auth)?;

    if let Some(t) = req.title.as_deref() {
        validate_title(t)?;
    }

    let row: ContentRow = sqlx::query_as::<_, ContentRow>(
        r#"
        UPDATE clinic_content
        SET title = COALESCE($2, title),
            body = COALESCE($3, body),
            category = COALESCE($4, category),
            updated_at = now()
        WHERE content_id = $1
        RETURNING content_id, title, body, category, is_published, created_at, updated_at
        "#,
    )
    .bind(content_id)
    .bind(req.title.as_deref().map(str::trim))
    .bind(req.body.as_deref().map(str::trim))
    .bind(req.category.as_deref().map(str::trim))
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::backend)?
    .ok_or_else(|| ApiError::NotFound("NOT_FOUND", "content not found".to_string()))?;

    Ok(Json(row))
}

async fn set_published(
    state: &AppState,
    content_id: Uuid,
    published: bool,
) -> Result<ContentRow, ApiError> {
    sqlx::query_as::<_, ContentRow>(
        r#"
        UPDATE clinic_content
        SET is_published = $2, updated_at = now()
        WHERE content_id = $1
        RETURNING content_id, title, body, category, is_published, created_at, updated_at
        "#,
    )
    .bind(content_id)
    .bind(published)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::backend)?
    .ok_or_else(|| ApiError::NotFound("NOT_FOUND", "content not found".to_string()))
}

pub async fn publish_content(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(content_id): Path<Uuid>,
) -> Result<Json<ContentRow>, ApiError> {
    ensure_admin(&auth)?;
    let row = set_published(&state, content_id, true).await?;
    Ok(Json(row))
}

pub async fn unpublish_content(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(content_id): Path<Uuid>,
) -> Result<Json<ContentRow>, ApiError> {
    ensure_admin(&auth)?;
    let row = set_published(&state, content_id, false).await?;
    Ok(Json(row))
}

pub async fn delete_content(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(content_id): Path<Uuid>,
) -> Result<Json<OkResponse>, ApiError> {
    ensure_admin(&auth)?;

    let res = sqlx::query(r#"DELETE FROM clinic_content WHERE content_id = $1"#)
        .bind(content_id)
        .execute(&state.db)
        .await
        .map_err(ApiError::backend)?;

    if res.rows_affected() == 0 {
        return Err(ApiError::NotFound("NOT_FOUND", "content not found".to_string()));
    }

    Ok(Json(OkResponse {
        data: OkData { ok: true },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_title() {
        assert!(validate_title("Dicas de escovação").is_ok());
        assert_eq!(validate_title("  Dicas  ").unwrap(), "Dicas");
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"t".repeat(200)).is_err());
    }
}
