//! Push-notification seam. Delivery belongs to the external messaging
//! gateway; this side resolves the recipient segment and records what was
//! handed off.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::AppointmentStatus;

/// Named predicate over patients selecting who receives a push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Segment {
    AllPatients,
    WithUpcomingAppointments,
    WithoutUpcomingAppointments,
}

impl Segment {
    pub fn as_label(self) -> &'static str {
        match self {
            Segment::AllPatients => "AllPatients",
            Segment::WithUpcomingAppointments => "WithUpcomingAppointments",
            Segment::WithoutUpcomingAppointments => "WithoutUpcomingAppointments",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DispatchReceipt {
    pub notification_id: Uuid,
    pub segment: Segment,
    pub recipient_count: i64,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("record store unavailable: {0}")]
    Backend(#[from] sqlx::Error),
}

impl From<DispatchError> for ApiError {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::Backend(err) => ApiError::backend(err),
        }
    }
}

/// Fire-and-forget: errors are reported to the caller, never retried.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn notify(
        &self,
        segment: Segment,
        title: &str,
        body: &str,
    ) -> Result<DispatchReceipt, DispatchError>;
}

/// DB-backed dispatcher. "With upcoming appointments" means having at least
/// one appointment whose status is Pendente, Confirmado or Remarcada — the
/// non-terminal statuses, same taxonomy the agenda uses.
pub struct PgSegmentDispatcher {
    pool: PgPool,
}

impl PgSegmentDispatcher {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn recipient_count(&self, segment: Segment) -> Result<i64, DispatchError> {
        let count: i64 = match segment {
            Segment::AllPatients => {
                sqlx::query_scalar(
                    r#"
                    SELECT count(*)
                    FROM patient
                    WHERE is_archived = false
                    "#,
                )
                .fetch_one(&self.pool)
                .await?
            }
            Segment::WithUpcomingAppointments => {
                sqlx::query_scalar(
                    r#"
                    SELECT count(*)
                    FROM patient p
                    WHERE p.is_archived = false
                      AND EXISTS (
                        SELECT 1 FROM appointment a
                        WHERE a.patient_name = p.full_name
                          AND a.status NOT IN ($1, $2)
                      )
                    "#,
                )
                .bind(AppointmentStatus::Cancelado)
                .bind(AppointmentStatus::Realizado)
                .fetch_one(&self.pool)
                .await?
            }
            Segment::WithoutUpcomingAppointments => {
                sqlx::query_scalar(
                    r#"
                    SELECT count(*)
                    FROM patient p
                    WHERE p.is_archived = false
                      AND NOT EXISTS (
                        SELECT 1 FROM appointment a
                        WHERE a.patient_name = p.full_name
                          AND a.status NOT IN ($1, $2)
                      )
                    "#,
                )
                .bind(AppointmentStatus::Cancelado)
                .bind(AppointmentStatus::Realizado)
                .fetch_one(&self.pool)
                .await?
            }
        };
        Ok(count)
    }
}

#[async_trait]
impl NotificationDispatcher for PgSegmentDispatcher {
    async fn notify(
        &self,
        segment: Segment,
        title: &str,
        body: &str,
    ) -> Result<DispatchReceipt, DispatchError> {
        let recipient_count = self.recipient_count(segment).await?;

        let (notification_id, sent_at): (Uuid, DateTime<Utc>) = sqlx::query_as(
            r#"
            INSERT INTO notification_log (segment, title, body, recipient_count)
            VALUES ($1, $2, $3, $4)
            RETURNING notification_id, sent_at
            "#,
        )
        .bind(segment.as_label())
        .bind(title)
        .bind(body)
        .bind(recipient_count)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(
            segment = segment.as_label(),
            recipient_count,
            %notification_id,
            "notification handed off to gateway"
        );

        Ok(DispatchReceipt {
            notification_id,
            segment,
            recipient_count,
            sent_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_serializes_as_label() {
        for seg in [
            Segment::AllPatients,
            Segment::WithUpcomingAppointments,
            Segment::WithoutUpcomingAppointments,
        ] {
            let json = serde_json::to_string(&seg).unwrap();
            assert_eq!(json, format!("\"{}\"", seg.as_label()));
            let back: Segment = serde_json::from_str(&json).unwrap();
            assert_eq!(back, seg);
        }
    }

    #[test]
    fn unknown_segment_rejected() {
        assert!(serde_json::from_str::<Segment>("\"Everyone\"").is_err());
    }

    #[test]
    fn upcoming_segment_statuses_match_non_terminal_set() {
        // The SQL above excludes exactly the terminal statuses, so the segment
        // is defined by Pendente | Confirmado | Remarcada.
        let engaged: Vec<_> = AppointmentStatus::ALL
            .into_iter()
            .filter(|s| !s.is_terminal())
            .collect();
        assert_eq!(
            engaged,
            vec![
                AppointmentStatus::Pendente,
                AppointmentStatus::Confirmado,
                AppointmentStatus::Remarcada,
            ]
        );
    }
}
