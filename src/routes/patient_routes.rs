// src/routes/patient_routes.rs

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
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
pub struct PatientRow {
    pub patient_id: Uuid,
    pub account_id: Option<Uuid>,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub is_archived: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePatientRequest {
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePatientRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/patients", post(create_patient).get(search_patients))
        .route("/patients/{patient_id}", get(get_patient).patch(update_patient))
        .route("/patients/{patient_id}/archive", post(archive_patient))
        .route("/patients/{patient_id}/restore", post(restore_patient))
}

fn ensure_admin(auth: &AuthContext) -> Result<(), ApiError> {
    if auth.role == ROLE_ADMIN {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "FORBIDDEN",
            "Only admin can manage patients".into(),
        ))
    }
}

pub async fn create_patient(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreatePatientRequest>,
) -> Result<Json<PatientRow>, ApiError> {
    ensure_admin(&auth)?;

    let full_name = req.full_name.trim();
    if full_name.is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "full_name is required".to_string(),
        ));
    }

    let row: PatientRow = sqlx::query_as::<_, PatientRow>(
        r#"
        INSERT INTO patient (full_name, email, phone)
        VALUES ($1, $2, $3)
        RETURNING patient_id, account_id, full_name, email, phone, is_archived, created_at, updated_at
        "#,
    )
    .bind(full_name)
    .bind(req.email.as_deref().map(str::trim))
    .bind(req.phone.as_deref().map(str::trim))
    .fetch_one(&state.db)
    .await
    .map_err(ApiError::backend)?;

    Ok(Json(row))
}

pub async fn get_patient(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<PatientRow>, ApiError> {
    ensure_admin(&auth)?;

    let row: PatientRow = sqlx::query_as::<_, PatientRow>(
        r#"
        SELECT patient_id, account_id, full_name, email, phone, is_archived, created_at, updated_at
        FROM patient
        WHERE patient_id = $1
        "#,
    )
    .bind(patient_id)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::backend)?
    .ok_or_else(|| ApiError::NotFound("NOT_FOUND", "patient not found".to_string()))?;

    Ok(Json(row))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
    pub include_archived: Option<bool>,
}

pub async fn search_patients(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(q): Query<SearchQuery>,
) -> Result<Json<Vec<PatientRow>>, ApiError> {
    ensure_admin(&auth)?;

    let include_archived = q.include_archived.unwrap_or(false);
    let query = q.query.unwrap_or_default().trim().to_string();

    if query.is_empty() {
        // default: most recent
        let rows: Vec<PatientRow> = sqlx::query_as::<_, PatientRow>(
            r#"
            SELECT patient_id, account_id, full_name, email, phone, is_archived, created_at, updated_at
            FROM patient
            WHERE ($1 OR is_archived = false)
            ORDER BY created_at DESC
            LIMIT 50
            "#,
        )
        .bind(include_archived)
        .fetch_all(&state.db)
        .await
        .map_err(ApiError::backend)?;
        return Ok(Json(rows));
    }

    let like = format!("%{}%", query);
    let rows: Vec<PatientRow> = sqlx::query_as::<_, PatientRow>(
        r#"
        SELECT patient_id, account_id, full_name, email, phone, is_archived, created_at, updated_at
        FROM patient
        WHERE ($2 OR is_archived = false)
          AND (full_name ILIKE $1 OR email ILIKE $1 OR phone ILIKE $1)
        ORDER BY full_name ASC
        LIMIT 50
        "#,
    )
    .bind(&like)
    .bind(include_archived)
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::backend)?;

    Ok(Json(rows))
}

pub async fn update_patient(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(patient_id): Path<Uuid>,
    Json(req): Json<UpdatePatientRequest>,
) -> Result<Json<PatientRow>, ApiError> {
    ensure_admin(&auth)?;

    if let Some(name) = req.full_name.as_deref() {
        if name.trim().is_empty() {
            return Err(ApiError::BadRequest(
                "VALIDATION_ERROR",
                "full_name cannot be blank".to_string(),
            ));
        }
    }

    let row: PatientRow = sqlx::query_as::<_, PatientRow>(
        r#"
        UPDATE patient
        SET full_name = COALESCE($2, full_name),
            email = COALESCE($3, email),
            phone = COALESCE($4, phone),
            updated_at = now()
        WHERE patient_id = $1
        RETURNING patient_id, account_id, full_name, email, phone, is_archived, created_at, updated_at
        "#,
    )
    .bind(patient_id)
    .bind(req.full_name.as_deref().map(str::trim))
    .bind(req.email.as_deref().map(str::trim))
    .bind(req.phone.as_deref().map(str::trim))
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::backend)?
    .ok_or_else(|| ApiError::NotFound("NOT_FOUND", "patient not found".to_string()))?;

    Ok(Json(row))
}

async fn set_archived(
    state: &AppState,
    patient_id: Uuid,
    archived: bool,
) -> Result<PatientRow, ApiError> {
    sqlx::query_as::<_, PatientRow>(
        r#"
        UPDATE patient
        SET is_archived = $2, updated_at = now()
        WHERE patient_id = $1
        RETURNING patient_id, account_id, full_name, email, phone, is_archived, created_at, updated_at
        "#,
    )
    .bind(patient_id)
    .bind(archived)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::backend)?
    .ok_or_else(|| ApiError::NotFound("NOT_FOUND", "patient not found".to_string()))
}

pub async fn archive_patient(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<PatientRow>, ApiError> {
    ensure_admin(&auth)?;
    let row = set_archived(&state, patient_id, true).await?;
    Ok(Json(row))
}

pub async fn restore_patient(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<PatientRow>, ApiError> {
    ensure_admin(&auth)?;
    let row = set_archived(&state, patient_id, false).await?;
    Ok(Json(row))
}
