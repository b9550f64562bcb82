use axum::{Json, Router, extract::State, routing::get};

use crate::error::ApiError;
use crate::middleware::auth_context::AuthContext;
use crate::models::{role_to_string, AppState};

#[derive(serde::Serialize)]
pub struct HomeResponse {
    pub data: HomeData,
}

#[derive(serde::Serialize)]
pub struct HomeData {
    pub view: String,
    pub display_name: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/home", get(home))
}

/// Role-based home payload: the client picks the patient or admin shell from
/// `view`.
pub async fn home(
    State(_state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<HomeResponse>, ApiError> {
    Ok(Json(HomeResponse {
        data: HomeData {
            view: role_to_string(auth.role),
            display_name: auth.display_name,
        },
    }))
}
