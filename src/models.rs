use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::notify::NotificationDispatcher;
use crate::repo::AppointmentRepo;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub appointments: AppointmentRepo,
    pub dispatcher: Arc<dyn NotificationDispatcher>,
    pub session_ttl_hours: i64,
}

/// Role mapping (account.role):
/// 0 patient, 1 admin
pub const ROLE_PATIENT: i16 = 0;
pub const ROLE_ADMIN: i16 = 1;

pub fn role_to_string(role: i16) -> String {
    match role {
        0 => "patient",
        1 => "admin",
        _ => "unknown",
    }
    .to_string()
}

/* -------------------------
   Appointment ledger
--------------------------*/

/// Labels are the ones the mobile client displays and the notification side
/// queries by; the DB stores the smallint discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "smallint")]
#[repr(i16)]
pub enum AppointmentStatus {
    Pendente = 0,
    Confirmado = 1,
    Cancelado = 2,
    Realizado = 3,
    Remarcada = 4,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 5] = [
        AppointmentStatus::Pendente,
        AppointmentStatus::Confirmado,
        AppointmentStatus::Cancelado,
        AppointmentStatus::Realizado,
        AppointmentStatus::Remarcada,
    ];

    /// Terminal statuses drop the appointment out of every "upcoming" view.
    pub fn is_terminal(self) -> bool {
        matches!(self, AppointmentStatus::Cancelado | AppointmentStatus::Realizado)
    }

    pub fn as_label(self) -> &'static str {
        match self {
            AppointmentStatus::Pendente => "Pendente",
            AppointmentStatus::Confirmado => "Confirmado",
            AppointmentStatus::Cancelado => "Cancelado",
            AppointmentStatus::Realizado => "Realizado",
            AppointmentStatus::Remarcada => "Remarcada",
        }
    }

    pub fn parse_label(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|st| st.as_label() == s.trim())
    }
}

/// One booking. `patient`/`service`/`professional` are denormalized display
/// names, not foreign keys; the DB columns carry a `_name` suffix while the
/// API keeps the client's bare field names.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AppointmentRow {
    pub appointment_id: Uuid,
    #[serde(rename = "patient")]
    pub patient_name: String,
    #[serde(rename = "service")]
    pub service_name: String,
    #[serde(rename = "professional")]
    pub professional_name: String,
    pub date: chrono::NaiveDate,
    /// Zero-padded "HH:MM"; lexicographic order is chronological order.
    #[serde(rename = "time")]
    pub time_of_day: String,
    pub status: AppointmentStatus,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Audit-trail row. Append-only; rows are never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RescheduleEntryRow {
    pub entry_id: i64,
    pub appointment_id: Uuid,
    pub previous_date: chrono::NaiveDate,
    pub previous_time: String,
    pub new_date: chrono::NaiveDate,
    pub new_time: String,
    pub changed_at: DateTime<Utc>,
}

/* -------------------------
   API DTOs
--------------------------*/

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub device_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub device_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub data: LoginResponseData,
}

#[derive(Debug, Serialize)]
pub struct LoginResponseData {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub account: AccountProfile,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub data: MeResponseData,
}

#[derive(Debug, Serialize)]
pub struct MeResponseData {
    pub account: AccountProfile,
    pub session: SessionInfo,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub data: OkData,
}

#[derive(Debug, Serialize)]
pub struct OkData {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct AccountProfile {
    pub account_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub session_token_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/* -------------------------
   DB Row Models
--------------------------*/

#[derive(Debug, sqlx::FromRow)]
pub struct AccountRow {
    pub account_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub role: i16,
    pub is_active: bool,
}

#[derive(Debug, sqlx::FromRow)]
pub struct SessionTokenRow {
    pub session_token_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ServiceCatalogRow {
    pub service_id: Uuid,
    pub display_name: String,
    pub description: Option<String>,
    pub default_duration_min: Option<i32>,
    pub price_cents: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels_round_trip() {
        for st in AppointmentStatus::ALL {
            assert_eq!(AppointmentStatus::parse_label(st.as_label()), Some(st));
        }
        assert_eq!(AppointmentStatus::parse_label("  Pendente "), Some(AppointmentStatus::Pendente));
        assert_eq!(AppointmentStatus::parse_label("pendente"), None);
        assert_eq!(AppointmentStatus::parse_label("all"), None);
    }

    #[test]
    fn terminal_statuses() {
        assert!(AppointmentStatus::Cancelado.is_terminal());
        assert!(AppointmentStatus::Realizado.is_terminal());
        assert!(!AppointmentStatus::Pendente.is_terminal());
        assert!(!AppointmentStatus::Confirmado.is_terminal());
        assert!(!AppointmentStatus::Remarcada.is_terminal());
    }

    #[test]
    fn status_serializes_as_label() {
        let json = serde_json::to_string(&AppointmentStatus::Remarcada).unwrap();
        assert_eq!(json, "\"Remarcada\"");
    }
}
