use crate::models::AppState;
use axum::Router;

pub mod appointment_routes;
pub mod auth_routes;
pub mod content_routes;
pub mod home_routes;
pub mod notification_routes;
pub mod patient_routes;
pub mod professional_routes;
pub mod service_routes;

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1/auth", auth_routes::router())
        .nest("/api/v1/services", service_routes::router())
        .nest("/api/v1", appointment_routes::router())
        .nest("/api/v1", patient_routes::router())
        .nest("/api/v1", professional_routes::router())
        .nest("/api/v1", content_routes::router())
        .nest("/api/v1", notification_routes::router())
        .merge(home_routes::router())
        .with_state(state)
}
