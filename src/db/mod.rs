//! Persistence module split across logical submodules. Every function takes
//! the shared connection by reference; nothing here owns a handle.

mod appointments;
mod clients;
mod connection;
mod doctors;
mod search;
mod specializations;

pub use appointments::{
    create_appointment, delete_appointment, fetch_appointments, search_appointments,
};
pub use clients::{create_client, delete_clients_by_email, fetch_clients, search_clients};
pub use connection::{ensure_schema, open_database, open_in_memory_database};
pub use doctors::{create_doctor, delete_doctors_by_email, fetch_doctors, search_doctors};
pub use specializations::{
    fetch_specializations, find_specialization, get_or_create_specialization,
};
