//! Appointment repository: the one owner of appointment reads and writes.
//! Handlers get it through `AppState` and never touch the appointment tables
//! directly.

use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::models::{AppointmentRow, AppointmentStatus, RescheduleEntryRow};
use crate::scheduling;

#[derive(Debug)]
pub struct NewAppointment {
    pub patient_name: String,
    pub service_name: String,
    pub professional_name: String,
    pub date: NaiveDate,
    /// Normalized "HH:MM" (see `scheduling::parse_time_of_day`).
    pub time_of_day: String,
}

#[derive(Clone)]
pub struct AppointmentRepo {
    pool: PgPool,
}

impl AppointmentRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// New booking: fresh id, status Pendente, empty history, version 1.
    /// No double-booking check; overlapping slots are left to admin review.
    pub async fn create(&self, new: NewAppointment) -> Result<AppointmentRow, LedgerError> {
        let row = sqlx::query_as::<_, AppointmentRow>(
            r#"
            INSERT INTO appointment
                (patient_name, service_name, professional_name, date, time_of_day, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING appointment_id, patient_name, service_name, professional_name,
                      date, time_of_day, status, version, created_at, updated_at
            "#,
        )
        .bind(&new.patient_name)
        .bind(&new.service_name)
        .bind(&new.professional_name)
        .bind(new.date)
        .bind(&new.time_of_day)
        .bind(AppointmentStatus::Pendente)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn get(&self, id: Uuid) -> Result<AppointmentRow, LedgerError> {
        sqlx::query_as::<_, AppointmentRow>(
            r#"
            SELECT appointment_id, patient_name, service_name, professional_name,
                   date, time_of_day, status, version, created_at, updated_at
            FROM appointment
            WHERE appointment_id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(LedgerError::NotFound)
    }

    /// Apply a status change. The transition rule lives in
    /// `scheduling::validate_transition`; the UPDATE is guarded by the version
    /// read here, so a concurrent writer turns into `Conflict`, not a silent
    /// overwrite.
    pub async fn set_status(
        &self,
        id: Uuid,
        new_status: AppointmentStatus,
    ) -> Result<AppointmentRow, LedgerError> {
        let current = self.get(id).await?;
        scheduling::validate_transition(current.status, new_status)?;

        let updated = sqlx::query_as::<_, AppointmentRow>(
            r#"
            UPDATE appointment
            SET status = $2,
                version = version + 1,
                updated_at = now()
            WHERE appointment_id = $1
              AND version = $3
            RETURNING appointment_id, patient_name, service_name, professional_name,
                      date, time_of_day, status, version, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(new_status)
        .bind(current.version)
        .fetch_optional(&self.pool)
        .await?;

        // The row existed a moment ago; a miss here means the guard failed.
        updated.ok_or(LedgerError::Conflict)
    }

    /// Reschedule: append one history entry computed from the pre-update
    /// date/time, move the appointment to the new slot and force Remarcada.
    /// One transaction; the version guard makes the loser of a concurrent
    /// pair fail with `Conflict` instead of clobbering the history.
    pub async fn reschedule(
        &self,
        id: Uuid,
        new_date: NaiveDate,
        new_time: &str,
    ) -> Result<AppointmentRow, LedgerError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, AppointmentRow>(
            r#"
            SELECT appointment_id, patient_name, service_name, professional_name,
                   date, time_of_day, status, version, created_at, updated_at
            FROM appointment
            WHERE appointment_id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(LedgerError::NotFound)?;

        sqlx::query(
            r#"
            INSERT INTO reschedule_entry
                (appointment_id, previous_date, previous_time, new_date, new_time)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(id)
        .bind(current.date)
        .bind(&current.time_of_day)
        .bind(new_date)
        .bind(new_time)
        .execute(&mut *tx)
        .await?;

        let updated = sqlx::query_as::<_, AppointmentRow>(
            r#"
            UPDATE appointment
            SET date = $2,
                time_of_day = $3,
                status = $4,
                version = version + 1,
                updated_at = now()
            WHERE appointment_id = $1
              AND version = $5
            RETURNING appointment_id, patient_name, service_name, professional_name,
                      date, time_of_day, status, version, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(new_date)
        .bind(new_time)
        .bind(AppointmentStatus::Remarcada)
        .bind(current.version)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(LedgerError::Conflict)?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Audit trail in insertion (chronological) order. A missing appointment
    /// is NotFound, not an empty list.
    pub async fn history(&self, id: Uuid) -> Result<Vec<RescheduleEntryRow>, LedgerError> {
        self.get(id).await?;

        let rows = sqlx::query_as::<_, RescheduleEntryRow>(
            r#"
            SELECT entry_id, appointment_id, previous_date, previous_time,
                   new_date, new_time, changed_at
            FROM reschedule_entry
            WHERE appointment_id = $1
            ORDER BY entry_id ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// All appointments booked under a patient display name, in insertion
    /// order. The pure layer's stable sorts rely on that order for ties.
    pub async fn for_patient(&self, patient_name: &str) -> Result<Vec<AppointmentRow>, LedgerError> {
        let rows = sqlx::query_as::<_, AppointmentRow>(
            r#"
            SELECT appointment_id, patient_name, service_name, professional_name,
                   date, time_of_day, status, version, created_at, updated_at
            FROM appointment
            WHERE patient_name = $1
            ORDER BY created_at ASC, appointment_id ASC
            "#,
        )
        .bind(patient_name)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// The whole ledger in insertion order, for the admin agenda.
    pub async fn all(&self) -> Result<Vec<AppointmentRow>, LedgerError> {
        let rows = sqlx::query_as::<_, AppointmentRow>(
            r#"
            SELECT appointment_id, patient_name, service_name, professional_name,
                   date, time_of_day, status, version, created_at, updated_at
            FROM appointment
            ORDER BY created_at ASC, appointment_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
