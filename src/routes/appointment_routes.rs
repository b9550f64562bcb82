// src/routes/appointment_routes.rs

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{AppState, AppointmentRow, AppointmentStatus, RescheduleEntryRow, ROLE_ADMIN, ROLE_PATIENT},
    repo::NewAppointment,
    scheduling::{self, AgendaFilter},
};

/*
Roles (account.role):
0 patient
1 admin
*/

fn is_admin(auth: &AuthContext) -> bool {
    auth.role == ROLE_ADMIN
}
fn is_patient(auth: &AuthContext) -> bool {
    auth.role == ROLE_PATIENT
}

fn ensure_admin(auth: &AuthContext) -> Result<(), ApiError> {
    if is_admin(auth) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "FORBIDDEN",
            "Only admin can manage the agenda".into(),
        ))
    }
}

/// Patients may only act on appointments booked under their own name.
fn ensure_own_or_admin(auth: &AuthContext, row: &AppointmentRow) -> Result<(), ApiError> {
    if is_admin(auth) || row.patient_name == auth.display_name {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "FORBIDDEN",
            "You can only act on your own appointments".into(),
        ))
    }
}

fn now_local() -> chrono::NaiveDateTime {
    chrono::Local::now().naive_local()
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/appointments", post(create_appointment))
        .route("/appointments/upcoming", get(my_upcoming))
        .route("/appointments/past", get(my_past))
        .route("/appointments/agenda", get(admin_agenda))
        .route("/appointments/{appointment_id}", get(get_appointment))
        .route("/appointments/{appointment_id}/history", get(get_history))
        .route("/appointments/{appointment_id}/status", post(set_status))
        .route("/appointments/{appointment_id}/cancel", post(cancel_appointment))
        .route("/appointments/{appointment_id}/reschedule", post(reschedule_appointment))
}

/* ============================================================
   Response DTOs
   ============================================================ */

#[derive(Debug, Serialize)]
pub struct ApiOk<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct AppointmentDetail {
    #[serde(flatten)]
    pub appointment: AppointmentRow,
    pub reschedule_history: Vec<RescheduleEntryRow>,
}

/* ============================================================
   POST /appointments (book)
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct CreateAppointmentRequest {
    /// Required for admin bookings; ignored for patients, who always book
    /// under their own name.
    pub patient: Option<String>,
    pub service: String,
    pub professional: String,
    pub date: NaiveDate,
    pub time: String,
}

pub async fn create_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateAppointmentRequest>,
) -> Result<Json<ApiOk<AppointmentRow>>, ApiError> {
    let patient_name = if is_patient(&auth) {
        auth.display_name.clone()
    } else {
        match req.patient.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            Some(p) => p.to_string(),
            None => {
                return Err(ApiError::BadRequest(
                    "VALIDATION_ERROR",
                    "patient is required for admin bookings".into(),
                ));
            }
        }
    };

    let service = req.service.trim();
    let professional = req.professional.trim();
    if service.is_empty() || professional.is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "service and professional are required".into(),
        ));
    }

    let time_of_day = scheduling::parse_time_of_day(&req.time)?;

    let row = state
        .appointments
        .create(NewAppointment {
            patient_name,
            service_name: service.to_string(),
            professional_name: professional.to_string(),
            date: req.date,
            time_of_day,
        })
        .await?;

    tracing::info!(appointment_id = %row.appointment_id, "appointment booked");
    Ok(Json(ApiOk { data: row }))
}

/* ============================================================
   GET /appointments/upcoming | /appointments/past
   ============================================================ */

pub async fn my_upcoming(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ApiOk<Vec<AppointmentRow>>>, ApiError> {
    let rows = state.appointments.for_patient(&auth.display_name).await?;
    let (upcoming, _past) = scheduling::split_for_patient(rows, now_local());
    Ok(Json(ApiOk { data: upcoming }))
}

pub async fn my_past(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ApiOk<Vec<AppointmentRow>>>, ApiError> {
    let rows = state.appointments.for_patient(&auth.display_name).await?;
    let (_upcoming, past) = scheduling::split_for_patient(rows, now_local());
    Ok(Json(ApiOk { data: past }))
}

/* ============================================================
   GET /appointments/agenda (admin)
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct AgendaQuery {
    // YYYY-MM-DD, inclusive bounds
    pub from: Option<String>,
    pub to: Option<String>,
    pub patient: Option<String>,
    /// One of the five status labels, or "all" (default).
    pub status: Option<String>,
}

fn parse_agenda_date(raw: &str, field: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        ApiError::BadRequest("VALIDATION_ERROR", format!("{field} must be YYYY-MM-DD"))
    })
}

fn parse_status_filter(raw: Option<&str>) -> Result<Option<AppointmentStatus>, ApiError> {
    match raw.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(s) => AppointmentStatus::parse_label(s).map(Some).ok_or_else(|| {
            ApiError::BadRequest(
                "VALIDATION_ERROR",
                format!("status must be all or one of Pendente, Confirmado, Cancelado, Realizado, Remarcada; got {s:?}"),
            )
        }),
    }
}

pub async fn admin_agenda(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(q): Query<AgendaQuery>,
) -> Result<Json<ApiOk<Vec<AppointmentRow>>>, ApiError> {
    ensure_admin(&auth)?;

    let filter = AgendaFilter {
        from: q.from.as_deref().map(|d| parse_agenda_date(d, "from")).transpose()?,
        to: q.to.as_deref().map(|d| parse_agenda_date(d, "to")).transpose()?,
        patient: q.patient,
        status: parse_status_filter(q.status.as_deref())?,
    };

    let rows = state.appointments.all().await?;
    Ok(Json(ApiOk {
        data: scheduling::agenda_view(rows, &filter),
    }))
}

/* ============================================================
   GET /appointments/{id} (+ /history)
   ============================================================ */

pub async fn get_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<ApiOk<AppointmentDetail>>, ApiError> {
    let row = state.appointments.get(appointment_id).await?;
    ensure_own_or_admin(&auth, &row)?;

    let history = state.appointments.history(appointment_id).await?;
    Ok(Json(ApiOk {
        data: AppointmentDetail {
            appointment: row,
            reschedule_history: history,
        },
    }))
}

pub async fn get_history(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<ApiOk<Vec<RescheduleEntryRow>>>, ApiError> {
    let row = state.appointments.get(appointment_id).await?;
    ensure_own_or_admin(&auth, &row)?;

    let history = state.appointments.history(appointment_id).await?;
    Ok(Json(ApiOk { data: history }))
}

/* ============================================================
   Status transitions
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
}

pub async fn set_status(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(appointment_id): Path<Uuid>,
    Json(req): Json<SetStatusRequest>,
) -> Result<Json<ApiOk<AppointmentRow>>, ApiError> {
    ensure_admin(&auth)?;

    let new_status = AppointmentStatus::parse_label(&req.status).ok_or_else(|| {
        ApiError::BadRequest(
            "VALIDATION_ERROR",
            format!("status must be one of Pendente, Confirmado, Cancelado, Realizado, Remarcada; got {:?}", req.status),
        )
    })?;

    let row = state.appointments.set_status(appointment_id, new_status).await?;
    tracing::info!(appointment_id = %appointment_id, status = new_status.as_label(), "status changed");
    Ok(Json(ApiOk { data: row }))
}

/// Patient-facing cancellation; admins may cancel any appointment.
pub async fn cancel_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<ApiOk<AppointmentRow>>, ApiError> {
    let row = state.appointments.get(appointment_id).await?;
    ensure_own_or_admin(&auth, &row)?;

    let row = state
        .appointments
        .set_status(appointment_id, AppointmentStatus::Cancelado)
        .await?;
    tracing::info!(appointment_id = %appointment_id, "appointment cancelled");
    Ok(Json(ApiOk { data: row }))
}

/* ============================================================
   POST /appointments/{id}/reschedule
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct RescheduleRequest {
    pub date: NaiveDate,
    pub time: String,
}

pub async fn reschedule_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(appointment_id): Path<Uuid>,
    Json(req): Json<RescheduleRequest>,
) -> Result<Json<ApiOk<AppointmentRow>>, ApiError> {
    let row = state.appointments.get(appointment_id).await?;
    ensure_own_or_admin(&auth, &row)?;

    let time_of_day = scheduling::parse_time_of_day(&req.time)?;
    let row = state
        .appointments
        .reschedule(appointment_id, req.date, &time_of_day)
        .await?;

    tracing::info!(
        appointment_id = %appointment_id,
        date = %row.date,
        time = %row.time_of_day,
        "appointment rescheduled"
    );
    Ok(Json(ApiOk { data: row }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_filter_accepts_all_and_labels() {
        assert_eq!(parse_status_filter(None).unwrap(), None);
        assert_eq!(parse_status_filter(Some("all")).unwrap(), None);
        assert_eq!(parse_status_filter(Some("")).unwrap(), None);
        assert_eq!(
            parse_status_filter(Some("Confirmado")).unwrap(),
            Some(AppointmentStatus::Confirmado)
        );
        assert!(parse_status_filter(Some("Confirmed")).is_err());
    }

    #[test]
    fn agenda_date_parsing() {
        assert!(parse_agenda_date("2025-11-01", "from").is_ok());
        assert!(parse_agenda_date(" 2025-11-01 ", "from").is_ok());
        assert!(parse_agenda_date("01/11/2025", "from").is_err());
        assert!(parse_agenda_date("2025-13-01", "from").is_err());
    }
}
