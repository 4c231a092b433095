//! Clinic administration over an embedded SQLite database: clients, doctors
//! with their specializations, and the appointments between them, managed from
//! a terminal UI.
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod ui;

/// Opens the database file and prepares its schema; `main.rs` starts here.
pub use db::open_database;

pub use config::Config;
pub use error::ClinicError;
pub use models::{Appointment, Client, Doctor, Specialization};

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
