use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row};

use super::search::SearchQuery;
use crate::error::ClinicError;
use crate::models::{Appointment, AppointmentFilter, NewAppointment, DEFAULT_APPOINTMENT_STATUS};

const DOCTOR_NAME: &str = "(d.first_name || ' ' || d.last_name)";
const CLIENT_NAME: &str = "(c.first_name || ' ' || c.last_name)";

const APPOINTMENT_SELECT: &str = "SELECT a.doctor_id, a.client_id,
            d.first_name || ' ' || d.last_name,
            c.first_name || ' ' || c.last_name,
            a.date, a.reason, a.status
     FROM appointments a
     JOIN doctors d ON a.doctor_id = d.doctor_id
     JOIN clients c ON a.client_id = c.client_id";

fn map_appointment(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        doctor_id: row.get(0)?,
        client_id: row.get(1)?,
        doctor: row.get(2)?,
        client: row.get(3)?,
        scheduled_for: row.get(4)?,
        reason: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        status: row.get(6)?,
    })
}

/// Every appointment with doctor and client names resolved, in date order.
pub fn fetch_appointments(conn: &Connection) -> Result<Vec<Appointment>> {
    let mut stmt = conn
        .prepare(&format!("{APPOINTMENT_SELECT} ORDER BY a.date"))
        .context("failed to prepare appointment query")?;

    let appointments = stmt
        .query_map([], map_appointment)
        .context("failed to load appointments")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect appointments")?;

    Ok(appointments)
}

/// Appointments matching every populated filter, latest first. The date filter
/// compares calendar days, ignoring the time of day.
pub fn search_appointments(
    conn: &Connection,
    filter: &AppointmentFilter,
) -> Result<Vec<Appointment>> {
    let mut query = SearchQuery::new(APPOINTMENT_SELECT);
    if let Some(doctor) = &filter.doctor {
        query.and_contains(DOCTOR_NAME, doctor);
    }
    if let Some(client) = &filter.client {
        query.and_contains(CLIENT_NAME, client);
    }
    if let Some(date) = filter.date {
        query.and("date(a.date) = ?", date);
    }
    query.order_by("a.date DESC");

    query
        .fetch(conn, map_appointment)
        .context("failed to search appointments")
}

/// Book an appointment. Doctor and client are referenced by id, so the foreign
/// keys reject unknown people.
pub fn create_appointment(conn: &Connection, appointment: &NewAppointment) -> Result<()> {
    conn.execute(
        "INSERT INTO appointments (doctor_id, client_id, date, reason, status)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            appointment.doctor_id,
            appointment.client_id,
            appointment.scheduled_for,
            appointment.reason,
            DEFAULT_APPOINTMENT_STATUS
        ],
    )
    .context("failed to insert appointment")?;

    tracing::info!(
        doctor_id = appointment.doctor_id,
        client_id = appointment.client_id,
        date = %appointment.scheduled_for,
        "added appointment"
    );
    Ok(())
}

/// Remove the appointment(s) identified by doctor, client, and timestamp.
/// Both timestamps go through `datetime()` so formatting differences in the
/// stored text do not stop a match.
pub fn delete_appointment(
    conn: &Connection,
    doctor_id: i64,
    client_id: i64,
    scheduled_for: NaiveDateTime,
) -> Result<usize> {
    let deleted = conn
        .execute(
            "DELETE FROM appointments
             WHERE doctor_id = ?1 AND client_id = ?2 AND datetime(date) = datetime(?3)",
            params![doctor_id, client_id, scheduled_for],
        )
        .context("failed to delete appointment")?;

    if deleted == 0 {
        Err(ClinicError::not_found(
            "Appointment",
            format!("doctor {doctor_id}, client {client_id} at {scheduled_for}"),
        )
        .into())
    } else {
        tracing::info!(doctor_id, client_id, date = %scheduled_for, "deleted appointment");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::db::{create_client, create_doctor, delete_clients_by_email, open_in_memory_database};
    use crate::models::{NewClient, NewDoctor};

    struct Fixture {
        conn: Connection,
        house: i64,
        grey: i64,
        ann: i64,
        bo: i64,
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn fixture() -> Fixture {
        let conn = open_in_memory_database().unwrap();
        let doctor = |first: &str, last: &str| NewDoctor {
            first_name: first.to_string(),
            last_name: last.to_string(),
            specialization: "General".to_string(),
            email: format!("{}@clinic.test", last.to_lowercase()),
            phone: String::new(),
            years_of_experience: 10,
            rating: None,
        };
        let client = |first: &str, last: &str| NewClient {
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: format!("{}@example.com", first.to_lowercase()),
            phone: String::new(),
            age: 30,
        };
        let house = create_doctor(&conn, &doctor("Gregory", "House")).unwrap().id;
        let grey = create_doctor(&conn, &doctor("Meredith", "Grey")).unwrap().id;
        let ann = create_client(&conn, &client("Ann", "Lee")).unwrap().id;
        let bo = create_client(&conn, &client("Bo", "Park")).unwrap().id;
        Fixture {
            conn,
            house,
            grey,
            ann,
            bo,
        }
    }

    fn book(f: &Fixture, doctor_id: i64, client_id: i64, when: NaiveDateTime, reason: &str) {
        create_appointment(
            &f.conn,
            &NewAppointment {
                doctor_id,
                client_id,
                scheduled_for: when,
                reason: reason.to_string(),
            },
        )
        .unwrap();
    }

    #[test]
    fn created_appointment_is_scheduled_with_names() {
        let f = fixture();
        book(&f, f.house, f.ann, at(2024, 5, 1, 9, 30), "Checkup");

        let appointments = fetch_appointments(&f.conn).unwrap();
        assert_eq!(appointments.len(), 1);
        let appt = &appointments[0];
        assert_eq!(appt.doctor, "Gregory House");
        assert_eq!(appt.client, "Ann Lee");
        assert_eq!(appt.scheduled_for, at(2024, 5, 1, 9, 30));
        assert_eq!(appt.reason, "Checkup");
        assert_eq!(appt.status, "scheduled");
    }

    #[test]
    fn unknown_doctor_is_rejected() {
        let f = fixture();
        let result = create_appointment(
            &f.conn,
            &NewAppointment {
                doctor_id: 999,
                client_id: f.ann,
                scheduled_for: at(2024, 5, 1, 9, 30),
                reason: String::new(),
            },
        );
        assert!(result.is_err());
        assert!(fetch_appointments(&f.conn).unwrap().is_empty());
    }

    #[test]
    fn search_by_exact_date_orders_latest_first() {
        let f = fixture();
        book(&f, f.house, f.ann, at(2024, 5, 1, 9, 30), "Morning");
        book(&f, f.grey, f.bo, at(2024, 5, 1, 16, 0), "Afternoon");
        book(&f, f.house, f.bo, at(2024, 5, 2, 8, 0), "Next day");
        book(&f, f.grey, f.ann, at(2024, 4, 30, 23, 59), "Day before");

        let filter = AppointmentFilter {
            date: NaiveDate::from_ymd_opt(2024, 5, 1),
            ..AppointmentFilter::default()
        };
        let results = search_appointments(&f.conn, &filter).unwrap();
        let reasons: Vec<&str> = results.iter().map(|a| a.reason.as_str()).collect();
        assert_eq!(reasons, vec!["Afternoon", "Morning"]);
        assert!(results
            .iter()
            .all(|a| a.scheduled_for.date() == NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()));
    }

    #[test]
    fn search_by_people_names() {
        let f = fixture();
        book(&f, f.house, f.ann, at(2024, 5, 1, 9, 30), "A");
        book(&f, f.grey, f.bo, at(2024, 5, 1, 16, 0), "B");
        book(&f, f.house, f.bo, at(2024, 5, 2, 8, 0), "C");

        let filter = AppointmentFilter {
            doctor: Some("house".to_string()),
            client: Some("park".to_string()),
            date: None,
        };
        let results = search_appointments(&f.conn, &filter).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].reason, "C");
    }

    #[test]
    fn delete_uses_the_exact_timestamp() {
        let f = fixture();
        book(&f, f.house, f.ann, at(2024, 5, 1, 9, 30), "First");
        book(&f, f.house, f.ann, at(2024, 5, 1, 14, 0), "Second");

        assert_eq!(
            delete_appointment(&f.conn, f.house, f.ann, at(2024, 5, 1, 14, 0)).unwrap(),
            1
        );
        let remaining = fetch_appointments(&f.conn).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].reason, "First");

        assert!(delete_appointment(&f.conn, f.house, f.ann, at(2024, 5, 1, 14, 0)).is_err());
    }

    #[test]
    fn deleting_a_client_cascades_to_appointments() {
        let f = fixture();
        book(&f, f.house, f.ann, at(2024, 5, 1, 9, 30), "A");
        book(&f, f.grey, f.bo, at(2024, 5, 1, 16, 0), "B");

        delete_clients_by_email(&f.conn, "ann@example.com").unwrap();
        let remaining = fetch_appointments(&f.conn).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].client, "Bo Park");
    }
}
