//! Pure appointment logic: the status transition rule, the upcoming/past
//! derivation and the admin agenda filter. Nothing here touches the database;
//! `now` is always a parameter.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::LedgerError;
use crate::models::{AppointmentRow, AppointmentStatus};

const TIME_FMT: &str = "%H:%M";

/// Validate and normalize a time-of-day string to zero-padded "HH:MM".
/// Zero-padding keeps lexicographic order identical to clock order, which the
/// agenda tie-break relies on.
pub fn parse_time_of_day(raw: &str) -> Result<String, LedgerError> {
    let t = NaiveTime::parse_from_str(raw.trim(), TIME_FMT)
        .map_err(|_| LedgerError::Validation(format!("time must be HH:MM, got {raw:?}")))?;
    Ok(t.format(TIME_FMT).to_string())
}

/// The scheduling instant of a `(date, time)` pair. Times are validated on
/// write; an unparseable stored value falls back to midnight rather than
/// poisoning every read.
pub fn instant_of(date: NaiveDate, time_of_day: &str) -> NaiveDateTime {
    let t = NaiveTime::parse_from_str(time_of_day, TIME_FMT).unwrap_or(NaiveTime::MIN);
    date.and_time(t)
}

/// An appointment is upcoming iff its status is non-terminal and its instant
/// has not passed. Everything else is past. Derived, never stored.
pub fn is_upcoming(row: &AppointmentRow, now: NaiveDateTime) -> bool {
    !row.status.is_terminal() && instant_of(row.date, &row.time_of_day) >= now
}

/// Partition a patient's appointments into (upcoming, past). Upcoming is
/// sorted ascending by (date, time), past descending; ties keep the incoming
/// (insertion) order because both sorts are stable.
pub fn split_for_patient(
    rows: Vec<AppointmentRow>,
    now: NaiveDateTime,
) -> (Vec<AppointmentRow>, Vec<AppointmentRow>) {
    let (mut upcoming, mut past): (Vec<_>, Vec<_>) =
        rows.into_iter().partition(|r| is_upcoming(r, now));
    upcoming.sort_by(|a, b| (a.date, a.time_of_day.as_str()).cmp(&(b.date, b.time_of_day.as_str())));
    past.sort_by(|a, b| (b.date, b.time_of_day.as_str()).cmp(&(a.date, a.time_of_day.as_str())));
    (upcoming, past)
}

/// Admin agenda filter. All dimensions optional; date bounds are inclusive at
/// day granularity, the patient match is a case-insensitive substring, and
/// `status: None` means "all".
#[derive(Debug, Default, Clone)]
pub struct AgendaFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub patient: Option<String>,
    pub status: Option<AppointmentStatus>,
}

pub fn agenda_view(rows: Vec<AppointmentRow>, filter: &AgendaFilter) -> Vec<AppointmentRow> {
    let needle = filter
        .patient
        .as_deref()
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty());

    let mut out: Vec<AppointmentRow> = rows
        .into_iter()
        .filter(|r| {
            if let Some(from) = filter.from {
                if r.date < from {
                    return false;
                }
            }
            if let Some(to) = filter.to {
                if r.date > to {
                    return false;
                }
            }
            if let Some(n) = &needle {
                if !r.patient_name.to_lowercase().contains(n.as_str()) {
                    return false;
                }
            }
            if let Some(s) = filter.status {
                if r.status != s {
                    return false;
                }
            }
            true
        })
        .collect();

    // Stable: rows arrive in insertion order and equal (date, time) keys stay
    // in that order.
    out.sort_by(|a, b| (a.date, a.time_of_day.as_str()).cmp(&(b.date, b.time_of_day.as_str())));
    out
}

/// Single choke point for status changes. Any status may be set from any
/// status, with one enforced rule: an appointment that is already Cancelado
/// or Realizado cannot be cancelled again. A stricter transition table, if it
/// ever lands, goes here and nowhere else.
pub fn validate_transition(
    current: AppointmentStatus,
    requested: AppointmentStatus,
) -> Result<(), LedgerError> {
    if requested == AppointmentStatus::Cancelado && current.is_terminal() {
        return Err(LedgerError::Validation(format!(
            "cannot cancel an appointment that is already {}",
            current.as_label()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    fn row(patient: &str, date: &str, time: &str, status: AppointmentStatus) -> AppointmentRow {
        let created: DateTime<Utc> = "2025-10-01T08:00:00Z".parse().unwrap();
        AppointmentRow {
            appointment_id: Uuid::new_v4(),
            patient_name: patient.to_string(),
            service_name: "Limpeza".to_string(),
            professional_name: "Dr. X".to_string(),
            date: date.parse().unwrap(),
            time_of_day: time.to_string(),
            status,
            version: 1,
            created_at: created,
            updated_at: created,
        }
    }

    fn at(s: &str) -> NaiveDateTime {
        s.parse().unwrap()
    }

    #[test]
    fn parse_time_normalizes_padding() {
        assert_eq!(parse_time_of_day("9:05").unwrap(), "09:05");
        assert_eq!(parse_time_of_day(" 10:00 ").unwrap(), "10:00");
        assert!(parse_time_of_day("25:00").is_err());
        assert!(parse_time_of_day("10h30").is_err());
        assert!(parse_time_of_day("").is_err());
    }

    #[test]
    fn upcoming_requires_future_instant_and_live_status() {
        let now = at("2025-11-02T09:00:00");
        // future instant, live status
        assert!(is_upcoming(&row("Ana", "2025-11-03", "10:00", AppointmentStatus::Pendente), now));
        // same-day later time counts
        assert!(is_upcoming(&row("Ana", "2025-11-02", "09:00", AppointmentStatus::Confirmado), now));
        // past instant
        assert!(!is_upcoming(&row("Ana", "2025-11-02", "08:59", AppointmentStatus::Pendente), now));
        // terminal status excludes even a future instant
        assert!(!is_upcoming(&row("Ana", "2025-11-03", "10:00", AppointmentStatus::Cancelado), now));
        assert!(!is_upcoming(&row("Ana", "2025-11-03", "10:00", AppointmentStatus::Realizado), now));
    }

    #[test]
    fn split_is_disjoint_and_exhaustive() {
        let now = at("2025-11-02T12:00:00");
        let rows = vec![
            row("Ana", "2025-11-01", "10:00", AppointmentStatus::Realizado),
            row("Ana", "2025-11-03", "09:00", AppointmentStatus::Pendente),
            row("Ana", "2025-11-02", "11:00", AppointmentStatus::Confirmado),
            row("Ana", "2025-11-05", "14:00", AppointmentStatus::Cancelado),
            row("Ana", "2025-11-02", "15:00", AppointmentStatus::Remarcada),
        ];
        let total = rows.len();
        let ids: std::collections::HashSet<_> = rows.iter().map(|r| r.appointment_id).collect();

        let (upcoming, past) = split_for_patient(rows, now);
        assert_eq!(upcoming.len() + past.len(), total);
        for u in &upcoming {
            assert!(!past.iter().any(|p| p.appointment_id == u.appointment_id));
        }
        let seen: std::collections::HashSet<_> = upcoming
            .iter()
            .chain(past.iter())
            .map(|r| r.appointment_id)
            .collect();
        assert_eq!(seen, ids);
    }

    #[test]
    fn split_orders_each_half() {
        let now = at("2025-11-02T12:00:00");
        let rows = vec![
            row("Ana", "2025-11-04", "09:00", AppointmentStatus::Pendente),
            row("Ana", "2025-11-03", "16:00", AppointmentStatus::Pendente),
            row("Ana", "2025-11-01", "10:00", AppointmentStatus::Realizado),
            row("Ana", "2025-11-02", "08:00", AppointmentStatus::Pendente),
        ];
        let (upcoming, past) = split_for_patient(rows, now);

        let up: Vec<_> = upcoming.iter().map(|r| (r.date.to_string(), r.time_of_day.clone())).collect();
        assert_eq!(
            up,
            vec![
                ("2025-11-03".to_string(), "16:00".to_string()),
                ("2025-11-04".to_string(), "09:00".to_string()),
            ]
        );

        // past is descending: the missed 08:00 slot from today sorts above the
        // completed one from yesterday
        let pa: Vec<_> = past.iter().map(|r| (r.date.to_string(), r.time_of_day.clone())).collect();
        assert_eq!(
            pa,
            vec![
                ("2025-11-02".to_string(), "08:00".to_string()),
                ("2025-11-01".to_string(), "10:00".to_string()),
            ]
        );
    }

    #[test]
    fn cancelled_future_appointment_is_not_upcoming() {
        // booked for the future, then cancelled: must not show as upcoming
        let now = at("2025-11-01T00:00:00");
        let rows = vec![row("Ana", "2025-11-03", "11:00", AppointmentStatus::Cancelado)];
        let (upcoming, past) = split_for_patient(rows, now);
        assert!(upcoming.is_empty());
        assert_eq!(past.len(), 1);
    }

    #[test]
    fn agenda_date_range_is_inclusive() {
        let rows = vec![
            row("Ana", "2025-11-01", "10:00", AppointmentStatus::Pendente),
            row("Bia", "2025-11-02", "10:00", AppointmentStatus::Pendente),
            row("Caio", "2025-11-03", "10:00", AppointmentStatus::Pendente),
        ];
        let filter = AgendaFilter {
            from: Some("2025-11-01".parse().unwrap()),
            to: Some("2025-11-02".parse().unwrap()),
            ..Default::default()
        };
        let out = agenda_view(rows, &filter);
        let names: Vec<_> = out.iter().map(|r| r.patient_name.as_str()).collect();
        assert_eq!(names, vec!["Ana", "Bia"]);
    }

    #[test]
    fn agenda_patient_match_is_case_insensitive_substring() {
        let rows = vec![
            row("Ana Souza", "2025-11-01", "10:00", AppointmentStatus::Pendente),
            row("Mariana Lima", "2025-11-01", "11:00", AppointmentStatus::Pendente),
            row("Bruno", "2025-11-01", "12:00", AppointmentStatus::Pendente),
        ];
        let filter = AgendaFilter {
            patient: Some("ANA".to_string()),
            ..Default::default()
        };
        let out = agenda_view(rows, &filter);
        let names: Vec<_> = out.iter().map(|r| r.patient_name.as_str()).collect();
        assert_eq!(names, vec!["Ana Souza", "Mariana Lima"]);
    }

    #[test]
    fn agenda_blank_patient_filter_matches_everything() {
        let rows = vec![row("Ana", "2025-11-01", "10:00", AppointmentStatus::Pendente)];
        let filter = AgendaFilter {
            patient: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(agenda_view(rows, &filter).len(), 1);
    }

    #[test]
    fn agenda_sorts_same_day_by_time() {
        let rows = vec![
            row("Ana", "2025-11-01", "14:00", AppointmentStatus::Pendente),
            row("Bia", "2025-11-01", "09:00", AppointmentStatus::Confirmado),
        ];
        let out = agenda_view(rows, &AgendaFilter::default());
        let times: Vec<_> = out.iter().map(|r| r.time_of_day.as_str()).collect();
        assert_eq!(times, vec!["09:00", "14:00"]);
    }

    #[test]
    fn agenda_ties_keep_insertion_order() {
        let first = row("Ana", "2025-11-01", "10:00", AppointmentStatus::Pendente);
        let second = row("Bia", "2025-11-01", "10:00", AppointmentStatus::Pendente);
        let (id_a, id_b) = (first.appointment_id, second.appointment_id);
        let out = agenda_view(vec![first, second], &AgendaFilter::default());
        assert_eq!(out[0].appointment_id, id_a);
        assert_eq!(out[1].appointment_id, id_b);
    }

    #[test]
    fn agenda_filters_commute() {
        let rows = vec![
            row("Ana", "2025-11-01", "10:00", AppointmentStatus::Pendente),
            row("Ana", "2025-11-02", "10:00", AppointmentStatus::Cancelado),
            row("Bia", "2025-11-02", "11:00", AppointmentStatus::Pendente),
            row("Ana", "2025-11-05", "09:00", AppointmentStatus::Pendente),
        ];
        let date_only = AgendaFilter {
            from: Some("2025-11-01".parse().unwrap()),
            to: Some("2025-11-03".parse().unwrap()),
            ..Default::default()
        };
        let name_only = AgendaFilter {
            patient: Some("ana".to_string()),
            ..Default::default()
        };
        let status_only = AgendaFilter {
            status: Some(AppointmentStatus::Pendente),
            ..Default::default()
        };
        let combined = AgendaFilter {
            from: date_only.from,
            to: date_only.to,
            patient: name_only.patient.clone(),
            status: status_only.status,
        };

        let one_pass = agenda_view(rows.clone(), &combined);
        let staged = agenda_view(
            agenda_view(agenda_view(rows.clone(), &status_only), &name_only),
            &date_only,
        );
        let ids = |v: &Vec<AppointmentRow>| v.iter().map(|r| r.appointment_id).collect::<Vec<_>>();
        assert_eq!(ids(&one_pass), ids(&staged));
        assert_eq!(one_pass.len(), 1);
        assert_eq!(one_pass[0].patient_name, "Ana");
    }

    #[test]
    fn transition_rule_blocks_only_re_cancellation() {
        use AppointmentStatus::*;
        assert!(validate_transition(Cancelado, Cancelado).is_err());
        assert!(validate_transition(Realizado, Cancelado).is_err());
        // everything else stays permissive
        for current in AppointmentStatus::ALL {
            for requested in AppointmentStatus::ALL {
                if requested == Cancelado && current.is_terminal() {
                    continue;
                }
                assert!(
                    validate_transition(current, requested).is_ok(),
                    "{current:?} -> {requested:?} should be allowed"
                );
            }
        }
    }
}
