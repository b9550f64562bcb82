// src/routes/service_routes.rs

use axum::{
    extract::{Path, State},
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{AppState, ServiceCatalogRow, ROLE_ADMIN},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_services).post(create_service))
        .route("/{service_id}", patch(update_service))
}

fn ensure_admin(auth: &AuthContext) -> Result<(), ApiError> {
    if auth.role == ROLE_ADMIN {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "FORBIDDEN",
            "Only admin can manage services".into(),
        ))
    }
}

pub async fn list_services(
    State(state): State<AppState>,
    _auth: AuthContext,
) -> Result<Json<Vec<ServiceCatalogRow>>, ApiError> {
    let rows: Vec<ServiceCatalogRow> = sqlx::query_as::<_, ServiceCatalogRow>(
        r#"
        SELECT
          service_id,
          display_name,
          description,
          default_duration_min,
          price_cents,
          is_active,
          created_at,
          updated_at
        FROM service_catalog
        WHERE is_active = true
        ORDER BY display_name ASC
        "#,
    )
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::backend)?;

    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct CreateServiceRequest {
    pub display_name: String,
    pub description: Option<String>,
    pub default_duration_min: Option<i32>,
    pub price_cents: i32,
}

pub async fn create_service(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateServiceRequest>,
) -> Result<Json<ServiceCatalogRow>, ApiError> {
    ensure_admin(&auth)?;

    let display_name = req.display_name.trim();
    if display_name.is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "display_name is required".into(),
        ));
    }
    if req.price_cents < 0 {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "price_cents must be >= 0".into(),
        ));
    }

    let row: ServiceCatalogRow = sqlx::query_as::<_, ServiceCatalogRow>(
        r#"
        INSERT INTO service_catalog (display_name, description, default_duration_min, price_cents)
        VALUES ($1, $2, $3, $4)
        RETURNING service_id, display_name, description, default_duration_min,
                  price_cents, is_active, created_at, updated_at
        "#,
    )
    .bind(display_name)
    .bind(req.description.as_deref().map(str::trim))
    .bind(req.default_duration_min)
    .bind(req.price_cents)
    .fetch_one(&state.db)
    .await
    .map_err(ApiError::backend)?;

    Ok(Json(row))
}

#[derive(Debug, Deserialize)]
pub struct UpdateServiceRequest {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub default_duration_min: Option<i32>,
    pub price_cents: Option<i32>,
    pub is_active: Option<bool>,
}

pub async fn update_service(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(service_id): Path<Uuid>,
    Json(req): Json<UpdateServiceRequest>,
) -> Result<Json<ServiceCatalogRow>, ApiError> {
    ensure_admin(&auth)?;

    if let Some(p) = req.price_cents {
        if p < 0 {
            return Err(ApiError::BadRequest(
                "VALIDATION_ERROR",
                "price_cents must be >= 0".into(),
            ));
        }
    }

    let row: ServiceCatalogRow = sqlx::query_as::<_, ServiceCatalogRow>(
        r#"
        UPDATE service_catalog
        SET display_name = COALESCE($2, display_name),
            description = COALESCE($3, description),
            default_duration_min = COALESCE($4, default_duration_min),
            price_cents = COALESCE($5, price_cents),
            is_active = COALESCE($6, is_active),
            updated_at = now()
        WHERE service_id = $1
        RETURNING service_id, display_name, description, default_duration_min,
                  price_cents, is_active, created_at, updated_at
        "#,
    )
    .bind(service_id)
    .bind(req.display_name.as_deref().map(str::trim))
    .bind(req.description.as_deref().map(str::trim))
    .bind(req.default_duration_min)
    .bind(req.price_cents)
    .bind(req.is_active)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::backend)?
    .ok_or_else(|| ApiError::NotFound("NOT_FOUND", "service not found".to_string()))?;

    Ok(Json(row))
}
