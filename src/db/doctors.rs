use anyhow::{Context, Result};
use rusqlite::{params, Connection, Row};

use super::search::SearchQuery;
use super::specializations::get_or_create_specialization;
use crate::error::ClinicError;
use crate::models::{Doctor, DoctorFilter, NewDoctor};

const DOCTOR_SELECT: &str = "SELECT d.doctor_id, d.first_name, d.last_name, d.specialization_id,
            s.name, d.email, d.phone, d.years_of_exp, d.rating
     FROM doctors d
     JOIN specializations s ON d.specialization_id = s.specialization_id";

fn map_doctor(row: &Row<'_>) -> rusqlite::Result<Doctor> {
    Ok(Doctor {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        specialization_id: row.get(3)?,
        specialization: row.get(4)?,
        email: row.get(5)?,
        phone: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        years_of_experience: row.get(7)?,
        rating: row.get(8)?,
    })
}

/// Every doctor joined with its specialization name.
pub fn fetch_doctors(conn: &Connection) -> Result<Vec<Doctor>> {
    let mut stmt = conn
        .prepare(&format!("{DOCTOR_SELECT} ORDER BY d.doctor_id"))
        .context("failed to prepare doctor query")?;

    let doctors = stmt
        .query_map([], map_doctor)
        .context("failed to load doctors")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect doctors")?;

    Ok(doctors)
}

/// Doctors matching every populated filter, most experienced first.
pub fn search_doctors(conn: &Connection, filter: &DoctorFilter) -> Result<Vec<Doctor>> {
    let mut query = SearchQuery::new(DOCTOR_SELECT);
    if let Some(specialization) = &filter.specialization {
        query.and_contains("s.name", specialization);
    }
    if let Some(min_experience) = filter.min_experience {
        query.and("d.years_of_exp >= ?", min_experience);
    }
    if let Some(min_rating) = filter.min_rating {
        query.and("d.rating >= ?", min_rating);
    }
    query.order_by("d.years_of_exp DESC, d.doctor_id");

    query
        .fetch(conn, map_doctor)
        .context("failed to search doctors")
}

/// Resolve the specialization (creating it when new), insert the doctor, and
/// hand back the hydrated row.
pub fn create_doctor(conn: &Connection, doctor: &NewDoctor) -> Result<Doctor> {
    let specialization = get_or_create_specialization(conn, &doctor.specialization)?;

    conn.execute(
        "INSERT INTO doctors
            (first_name, last_name, specialization_id, email, phone, years_of_exp, rating)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            doctor.first_name,
            doctor.last_name,
            specialization.id,
            doctor.email,
            doctor.phone,
            doctor.years_of_experience,
            doctor.rating
        ],
    )
    .context("failed to insert doctor")?;

    let id = conn.last_insert_rowid();
    tracing::info!(id, email = %doctor.email, specialization = %specialization, "added doctor");
    Ok(Doctor {
        id,
        first_name: doctor.first_name.clone(),
        last_name: doctor.last_name.clone(),
        specialization_id: specialization.id,
        specialization: specialization.name,
        email: doctor.email.clone(),
        phone: doctor.phone.clone(),
        years_of_experience: doctor.years_of_experience,
        rating: doctor.rating,
    })
}

/// Delete every doctor registered under `email`. Their appointments cascade.
pub fn delete_doctors_by_email(conn: &Connection, email: &str) -> Result<usize> {
    let deleted = conn
        .execute("DELETE FROM doctors WHERE email = ?1", params![email])
        .context("failed to delete doctor")?;

    if deleted == 0 {
        Err(ClinicError::not_found("Doctor", email).into())
    } else {
        tracing::info!(email, deleted, "deleted doctors");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{fetch_specializations, open_in_memory_database};

    fn new_doctor(last: &str, specialization: &str, years: i64, rating: Option<f64>) -> NewDoctor {
        NewDoctor {
            first_name: "Dr".to_string(),
            last_name: last.to_string(),
            specialization: specialization.to_string(),
            email: format!("{}@clinic.test", last.to_lowercase()),
            phone: "555-0199".to_string(),
            years_of_experience: years,
            rating,
        }
    }

    #[test]
    fn new_specialization_is_created_once_and_reused() {
        let conn = open_in_memory_database().unwrap();

        let first = create_doctor(&conn, &new_doctor("House", "Diagnostics", 20, None)).unwrap();
        assert_eq!(fetch_specializations(&conn).unwrap().len(), 1);

        let second = create_doctor(&conn, &new_doctor("Foreman", "Diagnostics", 8, None)).unwrap();
        assert_eq!(fetch_specializations(&conn).unwrap().len(), 1);
        assert_eq!(first.specialization_id, second.specialization_id);
    }

    #[test]
    fn created_doctor_matches_listing() {
        let conn = open_in_memory_database().unwrap();
        let created = create_doctor(&conn, &new_doctor("Grey", "Surgery", 6, Some(4.5))).unwrap();
        assert_eq!(fetch_doctors(&conn).unwrap(), vec![created]);
    }

    #[test]
    fn search_by_specialization_and_experience() {
        let conn = open_in_memory_database().unwrap();
        create_doctor(&conn, &new_doctor("Adams", "Cardiology", 4, Some(4.9))).unwrap();
        create_doctor(&conn, &new_doctor("Baker", "Cardiology", 12, Some(3.1))).unwrap();
        create_doctor(&conn, &new_doctor("Chen", "Pediatric cardiac care", 7, None)).unwrap();
        create_doctor(&conn, &new_doctor("Diaz", "Neurology", 30, Some(5.0))).unwrap();

        let filter = DoctorFilter {
            specialization: Some("Card".to_string()),
            min_experience: Some(5),
            min_rating: None,
        };
        let results = search_doctors(&conn, &filter).unwrap();

        let names: Vec<&str> = results.iter().map(|d| d.last_name.as_str()).collect();
        assert_eq!(names, vec!["Baker", "Chen"]);
        assert!(results
            .iter()
            .all(|d| d.specialization.to_lowercase().contains("card") && d.years_of_experience >= 5));
    }

    #[test]
    fn rating_filter_skips_unrated() {
        let conn = open_in_memory_database().unwrap();
        create_doctor(&conn, &new_doctor("Adams", "Cardiology", 4, Some(4.9))).unwrap();
        create_doctor(&conn, &new_doctor("Chen", "Cardiology", 7, None)).unwrap();
        create_doctor(&conn, &new_doctor("Diaz", "Neurology", 30, Some(3.0))).unwrap();

        let filter = DoctorFilter {
            min_rating: Some(4.0),
            ..DoctorFilter::default()
        };
        let results = search_doctors(&conn, &filter).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].last_name, "Adams");
    }

    #[test]
    fn delete_by_email() {
        let conn = open_in_memory_database().unwrap();
        create_doctor(&conn, &new_doctor("Adams", "Cardiology", 4, None)).unwrap();
        create_doctor(&conn, &new_doctor("Baker", "Cardiology", 12, None)).unwrap();

        assert_eq!(delete_doctors_by_email(&conn, "adams@clinic.test").unwrap(), 1);
        let remaining = fetch_doctors(&conn).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].last_name, "Baker");
        assert!(delete_doctors_by_email(&conn, "adams@clinic.test").is_err());
    }
}
