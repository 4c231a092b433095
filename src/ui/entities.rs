//! The three entity windows, expressed as [`EntityKind`] configurations.

use anyhow::Result;
use ratatui::layout::Constraint;
use rusqlite::Connection;

use super::forms::{Choice, Form, FormField};
use super::helpers::{format_optional, format_timestamp};
use super::screen::{Column, EntityKind};
use crate::db::{
    create_appointment, create_client, create_doctor, delete_appointment,
    delete_clients_by_email, delete_doctors_by_email, fetch_appointments, fetch_clients,
    fetch_doctors, fetch_specializations, search_appointments, search_clients, search_doctors,
};
use crate::error::ClinicError;
use crate::models::{
    Appointment, AppointmentFilter, Client, ClientFilter, Doctor, DoctorFilter, NewAppointment,
    NewClient, NewDoctor,
};

fn non_negative(label: &str, value: i64) -> Result<i64, ClinicError> {
    if value < 0 {
        Err(ClinicError::validation(format!("{label} cannot be negative.")))
    } else {
        Ok(value)
    }
}

/// Sorted, without repeats; two people may share a name.
fn distinct_names(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut names: Vec<String> = names.collect();
    names.sort_by_key(|name| name.to_lowercase());
    names.dedup();
    names
}

pub(crate) struct ClientKind;

mod client_fields {
    pub(super) const FIRST_NAME: usize = 0;
    pub(super) const LAST_NAME: usize = 1;
    pub(super) const EMAIL: usize = 2;
    pub(super) const PHONE: usize = 3;
    pub(super) const AGE: usize = 4;

    pub(super) const FILTER_NAME: usize = 0;
    pub(super) const FILTER_EMAIL: usize = 1;
    pub(super) const FILTER_REGISTERED: usize = 2;
}

impl EntityKind for ClientKind {
    type Row = Client;
    type Filter = ClientFilter;
    type New = NewClient;

    const TITLE: &'static str = "Clients";
    const NOUN: &'static str = "client";

    fn columns() -> Vec<Column> {
        vec![
            Column::new("First Name", Constraint::Fill(1)),
            Column::new("Last Name", Constraint::Fill(1)),
            Column::new("Email", Constraint::Fill(2)),
            Column::new("Phone", Constraint::Fill(1)),
            Column::new("Age", Constraint::Length(5)),
            Column::new("Registration Date", Constraint::Length(17)),
        ]
    }

    fn cells(row: &Client) -> Vec<String> {
        vec![
            row.first_name.clone(),
            row.last_name.clone(),
            row.email.clone(),
            row.phone.clone(),
            format_optional(row.age),
            format_timestamp(&row.registered_at),
        ]
    }

    fn describe(row: &Client) -> String {
        format!("{} <{}>", row.full_name(), row.email)
    }

    fn load(conn: &Connection) -> Result<Vec<Client>> {
        fetch_clients(conn)
    }

    fn filter_form() -> Form {
        Form::new(vec![
            FormField::text("Name"),
            FormField::text("Email"),
            FormField::date("Registered since"),
        ])
    }

    fn parse_filter(form: &Form) -> Result<Option<ClientFilter>, ClinicError> {
        use client_fields::*;
        let filter = ClientFilter {
            name: form.optional_text(FILTER_NAME)?,
            email: form.optional_text(FILTER_EMAIL)?,
            registered_since: form.date(FILTER_REGISTERED)?,
        };
        Ok((!filter.is_empty()).then_some(filter))
    }

    fn search(conn: &Connection, filter: &ClientFilter) -> Result<Vec<Client>> {
        search_clients(conn, filter)
    }

    fn add_form(_conn: &Connection) -> Result<Form> {
        Ok(Form::new(vec![
            FormField::text("First name").required(),
            FormField::text("Last name").required(),
            FormField::text("Email").required(),
            FormField::text("Phone"),
            FormField::integer("Age").required(),
        ]))
    }

    fn parse_new(form: &Form) -> Result<NewClient, ClinicError> {
        use client_fields::*;
        Ok(NewClient {
            first_name: form.text(FIRST_NAME)?,
            last_name: form.text(LAST_NAME)?,
            email: form.text(EMAIL)?,
            phone: form.text(PHONE)?,
            age: non_negative("Age", form.require(AGE, form.integer(AGE))?)?,
        })
    }

    fn insert(conn: &Connection, new: &NewClient) -> Result<()> {
        create_client(conn, new).map(|_| ())
    }

    fn delete(conn: &Connection, row: &Client) -> Result<()> {
        delete_clients_by_email(conn, &row.email).map(|_| ())
    }
}

pub(crate) struct DoctorKind;

mod doctor_fields {
    pub(super) const FIRST_NAME: usize = 0;
    pub(super) const LAST_NAME: usize = 1;
    pub(super) const EMAIL: usize = 2;
    pub(super) const PHONE: usize = 3;
    pub(super) const EXPERIENCE: usize = 4;
    pub(super) const SPECIALIZATION: usize = 5;
    pub(super) const RATING: usize = 6;

    pub(super) const FILTER_SPECIALIZATION: usize = 0;
    pub(super) const FILTER_MIN_EXPERIENCE: usize = 1;
    pub(super) const FILTER_MIN_RATING: usize = 2;
}

impl EntityKind for DoctorKind {
    type Row = Doctor;
    type Filter = DoctorFilter;
    type New = NewDoctor;

    const TITLE: &'static str = "Doctors";
    const NOUN: &'static str = "doctor";

    fn columns() -> Vec<Column> {
        vec![
            Column::new("First Name", Constraint::Fill(1)),
            Column::new("Last Name", Constraint::Fill(1)),
            Column::new("Specialization", Constraint::Fill(1)),
            Column::new("Email", Constraint::Fill(2)),
            Column::new("Phone", Constraint::Fill(1)),
            Column::new("Experience", Constraint::Length(10)),
            Column::new("Rating", Constraint::Length(6)),
        ]
    }

    fn cells(row: &Doctor) -> Vec<String> {
        vec![
            row.first_name.clone(),
            row.last_name.clone(),
            row.specialization.clone(),
            row.email.clone(),
            row.phone.clone(),
            row.years_of_experience.to_string(),
            format_optional(row.rating),
        ]
    }

    fn describe(row: &Doctor) -> String {
        format!("{} ({}) <{}>", row.full_name(), row.specialization, row.email)
    }

    fn load(conn: &Connection) -> Result<Vec<Doctor>> {
        fetch_doctors(conn)
    }

    fn filter_form() -> Form {
        Form::new(vec![
            FormField::text("Specialization"),
            FormField::integer("Min experience"),
            FormField::decimal("Min rating"),
        ])
    }

    fn filter_suggestions(conn: &Connection) -> Result<Vec<(usize, Vec<String>)>> {
        let known = fetch_specializations(conn)?
            .into_iter()
            .map(|specialization| specialization.name)
            .collect();
        Ok(vec![(doctor_fields::FILTER_SPECIALIZATION, known)])
    }

    fn parse_filter(form: &Form) -> Result<Option<DoctorFilter>, ClinicError> {
        use doctor_fields::*;
        let filter = DoctorFilter {
            specialization: form.optional_text(FILTER_SPECIALIZATION)?,
            min_experience: form.integer(FILTER_MIN_EXPERIENCE)?,
            min_rating: form.decimal(FILTER_MIN_RATING)?,
        };
        Ok((!filter.is_empty()).then_some(filter))
    }

    fn search(conn: &Connection, filter: &DoctorFilter) -> Result<Vec<Doctor>> {
        search_doctors(conn, filter)
    }

    fn add_form(conn: &Connection) -> Result<Form> {
        let known = fetch_specializations(conn)?
            .into_iter()
            .map(|specialization| specialization.name)
            .collect();
        Ok(Form::new(vec![
            FormField::text("First name").required(),
            FormField::text("Last name").required(),
            FormField::text("Email").required(),
            FormField::text("Phone"),
            FormField::integer("Years of experience").required(),
            FormField::text("Specialization")
                .required()
                .with_suggestions(known),
            FormField::decimal("Rating"),
        ]))
    }

    fn parse_new(form: &Form) -> Result<NewDoctor, ClinicError> {
        use doctor_fields::*;
        let years = form.require(EXPERIENCE, form.integer(EXPERIENCE))?;
        Ok(NewDoctor {
            first_name: form.text(FIRST_NAME)?,
            last_name: form.text(LAST_NAME)?,
            email: form.text(EMAIL)?,
            phone: form.text(PHONE)?,
            years_of_experience: non_negative("Years of experience", years)?,
            specialization: form.text(SPECIALIZATION)?,
            rating: form.decimal(RATING)?,
        })
    }

    fn insert(conn: &Connection, new: &NewDoctor) -> Result<()> {
        create_doctor(conn, new).map(|_| ())
    }

    fn delete(conn: &Connection, row: &Doctor) -> Result<()> {
        delete_doctors_by_email(conn, &row.email).map(|_| ())
    }
}

pub(crate) struct AppointmentKind;

mod appointment_fields {
    pub(super) const DOCTOR: usize = 0;
    pub(super) const CLIENT: usize = 1;
    pub(super) const DATE: usize = 2;
    pub(super) const REASON: usize = 3;

    pub(super) const FILTER_DOCTOR: usize = 0;
    pub(super) const FILTER_CLIENT: usize = 1;
    pub(super) const FILTER_DATE: usize = 2;
}

impl EntityKind for AppointmentKind {
    type Row = Appointment;
    type Filter = AppointmentFilter;
    type New = NewAppointment;

    const TITLE: &'static str = "Appointments";
    const NOUN: &'static str = "appointment";

    fn columns() -> Vec<Column> {
        vec![
            Column::new("Doctor", Constraint::Fill(2)),
            Column::new("Client", Constraint::Fill(2)),
            Column::new("Date", Constraint::Length(16)),
            Column::new("Reason", Constraint::Fill(3)),
            Column::new("Status", Constraint::Length(10)),
        ]
    }

    fn cells(row: &Appointment) -> Vec<String> {
        vec![
            row.doctor.clone(),
            row.client.clone(),
            format_timestamp(&row.scheduled_for),
            row.reason.clone(),
            row.status.clone(),
        ]
    }

    fn describe(row: &Appointment) -> String {
        format!(
            "of {} with {} on {}",
            row.client,
            row.doctor,
            format_timestamp(&row.scheduled_for)
        )
    }

    fn load(conn: &Connection) -> Result<Vec<Appointment>> {
        fetch_appointments(conn)
    }

    fn filter_form() -> Form {
        Form::new(vec![
            FormField::text("Doctor"),
            FormField::text("Client"),
            FormField::date("Date"),
        ])
    }

    fn filter_suggestions(conn: &Connection) -> Result<Vec<(usize, Vec<String>)>> {
        let doctors = distinct_names(fetch_doctors(conn)?.iter().map(Doctor::full_name));
        let clients = distinct_names(fetch_clients(conn)?.iter().map(Client::full_name));
        Ok(vec![
            (appointment_fields::FILTER_DOCTOR, doctors),
            (appointment_fields::FILTER_CLIENT, clients),
        ])
    }

    fn parse_filter(form: &Form) -> Result<Option<AppointmentFilter>, ClinicError> {
        use appointment_fields::*;
        let filter = AppointmentFilter {
            doctor: form.optional_text(FILTER_DOCTOR)?,
            client: form.optional_text(FILTER_CLIENT)?,
            date: form.date(FILTER_DATE)?,
        };
        Ok((!filter.is_empty()).then_some(filter))
    }

    fn search(conn: &Connection, filter: &AppointmentFilter) -> Result<Vec<Appointment>> {
        search_appointments(conn, filter)
    }

    fn add_form(conn: &Connection) -> Result<Form> {
        let doctors = fetch_doctors(conn)?
            .into_iter()
            .map(|doctor| Choice {
                id: doctor.id,
                label: format!("{} ({})", doctor.full_name(), doctor.specialization),
            })
            .collect();
        let clients = fetch_clients(conn)?
            .into_iter()
            .map(|client| Choice {
                id: client.id,
                label: format!("{} <{}>", client.full_name(), client.email),
            })
            .collect();
        Ok(Form::new(vec![
            FormField::choice("Doctor", doctors),
            FormField::choice("Client", clients),
            FormField::date_time("Date").required(),
            FormField::text("Reason"),
        ]))
    }

    fn parse_new(form: &Form) -> Result<NewAppointment, ClinicError> {
        use appointment_fields::*;
        Ok(NewAppointment {
            doctor_id: form.choice(DOCTOR)?,
            client_id: form.choice(CLIENT)?,
            scheduled_for: form.require(DATE, form.date_time(DATE))?,
            reason: form.text(REASON)?,
        })
    }

    fn insert(conn: &Connection, new: &NewAppointment) -> Result<()> {
        create_appointment(conn, new)
    }

    fn delete(conn: &Connection, row: &Appointment) -> Result<()> {
        delete_appointment(conn, row.doctor_id, row.client_id, row.scheduled_for).map(|_| ())
    }
}
