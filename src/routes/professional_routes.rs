// src/routes/professional_routes.rs

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{AppState, ROLE_ADMIN},
};

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ProfessionalRow {
    pub professional_id: Uuid,
    pub full_name: String,
    pub specialty: String,
    pub registry_code: Option<String>,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProfessionalRequest {
    pub full_name: String,
    pub specialty: String,
    pub registry_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfessionalRequest {
    pub full_name: Option<String>,
    pub specialty: Option<String>,
    pub registry_code: Option<String>,
    pub is_active: Option<bool>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/professionals", get(list_professionals).post(create_professional))
        .route("/professionals/{professional_id}", get(get_professional).patch(update_professional))
}

fn ensure_admin(auth: &AuthContext) -> Result<(), ApiError> {
    if auth.role == ROLE_ADMIN {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "FORBIDDEN",
            "Only admin can manage professionals".into(),
        ))
    }
}

/// Patients see this list when booking; only active professionals show.
pub async fn list_professionals(
    State(state): State<AppState>,
    _auth: AuthContext,
) -> Result<Json<Vec<ProfessionalRow>>, ApiError> {
    let rows: Vec<ProfessionalRow> = sqlx::query_as::<_, ProfessionalRow>(
        r#"
        SELECT professional_id, full_name, specialty, registry_code, is_active, created_at, updated_at
        FROM professional
        WHERE is_active = true
        ORDER BY full_name ASC
        "#,
    )
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::backend)?;

    Ok(Json(rows))
}

pub async fn get_professional(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(professional_id): Path<Uuid>,
) -> Result<Json<ProfessionalRow>, ApiError> {
    let row: ProfessionalRow = sqlx::query_as::<_, ProfessionalRow>(
        r#"
        SELECT professional_id, full_name, specialty, registry_code, is_active, created_at, updated_at
        FROM professional
        WHERE professional_id = $1
        "#,
    )
    .bind(professional_id)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::backend)?
    .ok_or_else(|| ApiError::NotFound("NOT_FOUND", "professional not found".to_string()))?;

    Ok(Json(row))
}

pub async fn create_professional(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateProfessionalRequest>,
) -> Result<Json<ProfessionalRow>, ApiError> {
    ensure_admin(&auth)?;

    let full_name = req.full_name.trim();
    let specialty = req.specialty.trim();
    if full_name.is_empty() || specialty.is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "full_name and specialty are required".to_string(),
        ));
    }

    let row: ProfessionalRow = sqlx::query_as::<_, ProfessionalRow>(
        r#"
        INSERT INTO professional (full_name, specialty, registry_code)
        VALUES ($1, $2, $3)
        RETURNING professional_id, full_name, specialty, registry_code, is_active, created_at, updated_at
        "#,
    )
    .bind(full_name)
    .bind(specialty)
    .bind(req.registry_code.as_deref().map(str::trim))
    .fetch_one(&state.db)
    .await
    .map_err(ApiError::backend)?;

    Ok(Json(row))
}

pub async fn update_professional(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(professional_id): Path<Uuid>,
    Json(req): Json<UpdateProfessionalRequest>,
) -> Result<Json<ProfessionalRow>, ApiError> {
    ensure_admin(&auth)?;

    if let Some(name) = req.full_name.as_deref() {
        if name.trim().is_empty() {
            return Err(ApiError::BadRequest(
                "VALIDATION_ERROR",
                "full_name cannot be blank".to_string(),
            ));
        }
    }

    let row: ProfessionalRow = sqlx::query_as::<_, ProfessionalRow>(
        r#"
        UPDATE professional
        SET full_name = COALESCE($2, full_name),
            specialty = COALESCE($3, specialty),
            registry_code = COALESCE($4, registry_code),
            is_active = COALESCE($5, is_active),
            updated_at = now()
        WHERE professional_id = $1
        RETURNING professional_id, full_name, specialty, registry_code, is_active, created_at, updated_at
        "#,
    )
    .bind(professional_id)
    .bind(req.full_name.as_deref().map(str::trim))
    .bind(req.specialty.as_deref().map(str::trim))
    .bind(req.registry_code.as_deref().map(str::trim))
    .bind(req.is_active)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::backend)?
    .ok_or_else(|| ApiError::NotFound("NOT_FOUND", "professional not found".to_string()))?;

    Ok(Json(row))
}
