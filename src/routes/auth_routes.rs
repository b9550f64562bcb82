use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    auth::{generate_access_token, hash_access_token, hash_password, verify_password},
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{role_to_string, *},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/logout", post(logout))
}

/* ============================================================
   Validation helpers
   ============================================================ */

fn validate_email(email: &str) -> Result<&str, ApiError> {
    let email = email.trim();
    if email.len() < 5 || !email.contains('@') || email.contains(' ') {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "a valid email is required".into(),
        ));
    }
    Ok(email)
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < 8 {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "password must be at least 8 characters".into(),
        ));
    }
    Ok(())
}

fn validate_full_name(full_name: &str) -> Result<&str, ApiError> {
    let name = full_name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "full_name is required".into(),
        ));
    }
    if name.len() > 128 {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "full_name is too long (max 128)".into(),
        ));
    }
    Ok(name)
}

/* ============================================================
   Session plumbing
   ============================================================ */

async fn open_session(
    state: &AppState,
    account: &AccountRow,
    device_name: Option<&str>,
) -> Result<LoginResponse, ApiError> {
    let access_token = generate_access_token();
    let token_hash = hash_access_token(&access_token);
    let expires_at = Utc::now() + Duration::hours(state.session_ttl_hours);

    let session: SessionTokenRow = sqlx::query_as::<_, SessionTokenRow>(
        r#"
        INSERT INTO session_token
            (account_id, session_token_hash, device_name, expires_at)
        VALUES
            ($1, $2, $3, $4)
        RETURNING session_token_id, expires_at
        "#,
    )
    .bind(account.account_id)
    .bind(&token_hash)
    .bind(device_name)
    .bind(expires_at)
    .fetch_one(&state.db)
    .await
    .map_err(ApiError::backend)?;

    Ok(LoginResponse {
        data: LoginResponseData {
            access_token,
            expires_at: session.expires_at,
            account: AccountProfile {
                account_id: account.account_id,
                email: account.email.clone(),
                display_name: account.display_name.clone(),
                role: role_to_string(account.role),
            },
        },
    })
}

/* ============================================================
   POST /auth/register  (patient self-service)
   ============================================================ */

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = validate_email(&req.email)?.to_lowercase();
    validate_password(&req.password)?;
    let full_name = validate_full_name(&req.full_name)?.to_string();

    let taken: Option<Uuid> = sqlx::query_scalar(
        r#"
        SELECT account_id
        FROM account
        WHERE email = $1
        "#,
    )
    .bind(&email)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::backend)?;

    if taken.is_some() {
        return Err(ApiError::Conflict(
            "EMAIL_TAKEN",
            "an account with this email already exists".into(),
        ));
    }

    let password_hash = hash_password(&req.password)
        .map_err(|e| ApiError::Internal(format!("argon2 hash error: {e}")))?;

    // Account + patient profile land together or not at all.
    let mut tx = state.db.begin().await.map_err(ApiError::backend)?;

    let account: AccountRow = sqlx::query_as::<_, AccountRow>(
        r#"
        INSERT INTO account (email, display_name, password_hash, role)
        VALUES ($1, $2, $3, $4)
        RETURNING account_id, email, display_name, password_hash, role, is_active
        "#,
    )
    .bind(&email)
    .bind(&full_name)
    .bind(&password_hash)
    .bind(ROLE_PATIENT)
    .fetch_one(&mut *tx)
    .await
    .map_err(ApiError::backend)?;

    sqlx::query(
        r#"
        INSERT INTO patient (account_id, full_name, email, phone)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(account.account_id)
    .bind(&full_name)
    .bind(&email)
    .bind(req.phone.as_deref())
    .execute(&mut *tx)
    .await
    .map_err(ApiError::backend)?;

    tx.commit().await.map_err(ApiError::backend)?;

    tracing::info!(account_id = %account.account_id, "patient registered");
    let resp = open_session(&state, &account, req.device_name.as_deref()).await?;
    Ok(Json(resp))
}

/* ============================================================
   POST /auth/login
   ============================================================ */

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "email and password are required".into(),
        ));
    }

    let account: AccountRow = sqlx::query_as::<_, AccountRow>(
        r#"
        SELECT account_id, email, display_name, password_hash, role, is_active
        FROM account
        WHERE email = $1
        "#,
    )
    .bind(&email)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::backend)?
    .ok_or_else(ApiError::invalid_credentials)?;

    if !account.is_active {
        return Err(ApiError::Forbidden("FORBIDDEN", "Account is disabled".into()));
    }

    if !verify_password(&req.password, &account.password_hash) {
        return Err(ApiError::invalid_credentials());
    }

    let resp = open_session(&state, &account, req.device_name.as_deref()).await?;
    Ok(Json(resp))
}

/* ============================================================
   GET /auth/me
   ============================================================ */

pub async fn me(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<MeResponse>, ApiError> {
    let account: AccountRow = sqlx::query_as::<_, AccountRow>(
        r#"
        SELECT account_id, email, display_name, password_hash, role, is_active
        FROM account
        WHERE account_id = $1
        "#,
    )
    .bind(auth.account_id)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::backend)?
    .ok_or_else(ApiError::session_expired)?;

    if !account.is_active {
        return Err(ApiError::session_expired());
    }

    let session: SessionTokenRow = sqlx::query_as::<_, SessionTokenRow>(
        r#"
        SELECT session_token_id, expires_at
        FROM session_token
        WHERE session_token_id = $1
          AND account_id = $2
          AND revoked_at IS NULL
          AND expires_at > now()
        "#,
    )
    .bind(auth.session_token_id)
    .bind(auth.account_id)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::backend)?
    .ok_or_else(ApiError::session_expired)?;

    Ok(Json(MeResponse {
        data: MeResponseData {
            account: AccountProfile {
                account_id: account.account_id,
                email: account.email,
                display_name: account.display_name,
                role: role_to_string(account.role),
            },
            session: SessionInfo {
                session_token_id: session.session_token_id,
                expires_at: session.expires_at,
            },
        },
    }))
}

/* ============================================================
   POST /auth/logout
   ============================================================ */

pub async fn logout(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<OkResponse>, ApiError> {
    let rows = sqlx::query(
        r#"
        UPDATE session_token
        SET revoked_at = now()
        WHERE session_token_id = $1
          AND account_id = $2
          AND revoked_at IS NULL
        "#,
    )
    .bind(auth.session_token_id)
    .bind(auth.account_id)
    .execute(&state.db)
    .await
    .map_err(ApiError::backend)?;

    if rows.rows_affected() == 0 {
        return Err(ApiError::session_expired());
    }

    Ok(Json(OkResponse {
        data: OkData { ok: true },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ana@example.com").is_ok());
        assert_eq!(validate_email("  ana@example.com ").unwrap(), "ana@example.com");
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("a@b").is_err()); // too short
        assert!(validate_email("has space@example.com").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("longenough1").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password("").is_err());
    }

    #[test]
    fn test_validate_full_name() {
        assert!(validate_full_name("Ana Souza").is_ok());
        assert!(validate_full_name("   ").is_err());
        assert!(validate_full_name(&"x".repeat(200)).is_err());
    }
}
