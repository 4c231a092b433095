//! Domain models that mirror the SQLite schema and get passed throughout the
//! TUI. Row types carry their database ids even when the grid does not show
//! them, because pick lists and delete keys bubble them back to the
//! persistence layer. The `New*` types are validated inputs and the `*Filter`
//! types are parsed filter bars.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

/// Status assigned to every appointment created through the app.
pub const DEFAULT_APPOINTMENT_STATUS: &str = "scheduled";

#[derive(Debug, Clone, PartialEq)]
pub struct Client {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    /// Used as the delete key, so every client sharing it goes together.
    pub email: String,
    pub phone: String,
    pub age: Option<i64>,
    pub registered_at: NaiveDateTime,
}

impl Client {
    pub fn full_name(&self) -> String {
        full_name(&self.first_name, &self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Doctor {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub specialization_id: i64,
    /// Name resolved through the join with `specializations`.
    pub specialization: String,
    pub email: String,
    pub phone: String,
    pub years_of_experience: i64,
    /// Unrated doctors are stored as NULL and never match a rating filter.
    pub rating: Option<f64>,
}

impl Doctor {
    pub fn full_name(&self) -> String {
        full_name(&self.first_name, &self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specialization {
    pub id: i64,
    pub name: String,
}

impl fmt::Display for Specialization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// One appointment as displayed in the grid. There is no appointment id in the
/// schema; `(doctor_id, client_id, scheduled_for)` is the identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Appointment {
    pub doctor_id: i64,
    pub client_id: i64,
    pub doctor: String,
    pub client: String,
    pub scheduled_for: NaiveDateTime,
    pub reason: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewClient {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub age: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewDoctor {
    pub first_name: String,
    pub last_name: String,
    pub specialization: String,
    pub email: String,
    pub phone: String,
    pub years_of_experience: i64,
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAppointment {
    pub doctor_id: i64,
    pub client_id: i64,
    pub scheduled_for: NaiveDateTime,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientFilter {
    pub name: Option<String>,
    pub email: Option<String>,
    pub registered_since: Option<NaiveDate>,
}

impl ClientFilter {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.registered_since.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DoctorFilter {
    pub specialization: Option<String>,
    pub min_experience: Option<i64>,
    pub min_rating: Option<f64>,
}

impl DoctorFilter {
    pub fn is_empty(&self) -> bool {
        self.specialization.is_none() && self.min_experience.is_none() && self.min_rating.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentFilter {
    pub doctor: Option<String>,
    pub client: Option<String>,
    pub date: Option<NaiveDate>,
}

impl AppointmentFilter {
    pub fn is_empty(&self) -> bool {
        self.doctor.is_none() && self.client.is_none() && self.date.is_none()
    }
}

/// `First Last`, tolerating a blank half.
pub fn full_name(first: &str, last: &str) -> String {
    match (first.trim(), last.trim()) {
        ("", last) => last.to_string(),
        (first, "") => first.to_string(),
        (first, last) => format!("{first} {last}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_skips_blank_parts() {
        assert_eq!(full_name("Ada", "Lovelace"), "Ada Lovelace");
        assert_eq!(full_name("  ", "Lovelace"), "Lovelace");
        assert_eq!(full_name("Ada", ""), "Ada");
    }

    #[test]
    fn default_filters_are_empty() {
        assert!(ClientFilter::default().is_empty());
        assert!(DoctorFilter::default().is_empty());
        assert!(AppointmentFilter::default().is_empty());
        let filter = DoctorFilter {
            min_experience: Some(5),
            ..DoctorFilter::default()
        };
        assert!(!filter.is_empty());
    }
}
