use anyhow::{Context, Result};
use rusqlite::{params, Connection, Row};

use super::search::SearchQuery;
use crate::error::ClinicError;
use crate::models::{Client, ClientFilter, NewClient};

const CLIENT_SELECT: &str = "SELECT c.client_id, c.first_name, c.last_name, c.email, c.phone,
            c.age, c.registration_date
     FROM clients c";

fn map_client(row: &Row<'_>) -> rusqlite::Result<Client> {
    Ok(Client {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        age: row.get(5)?,
        registered_at: row.get(6)?,
    })
}

/// Every client in insertion order.
pub fn fetch_clients(conn: &Connection) -> Result<Vec<Client>> {
    let mut stmt = conn
        .prepare(&format!("{CLIENT_SELECT} ORDER BY c.client_id"))
        .context("failed to prepare client query")?;

    let clients = stmt
        .query_map([], map_client)
        .context("failed to load clients")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect clients")?;

    Ok(clients)
}

/// Clients matching every populated filter, newest registrations first.
pub fn search_clients(conn: &Connection, filter: &ClientFilter) -> Result<Vec<Client>> {
    let mut query = SearchQuery::new(CLIENT_SELECT);
    if let Some(name) = &filter.name {
        query.and_contains("(c.first_name || ' ' || c.last_name)", name);
    }
    if let Some(email) = &filter.email {
        query.and_contains("c.email", email);
    }
    if let Some(since) = filter.registered_since {
        query.and("date(c.registration_date) >= ?", since);
    }
    query.order_by("c.registration_date DESC, c.client_id DESC");

    query
        .fetch(conn, map_client)
        .context("failed to search clients")
}

/// Insert a client and return the stored row, including the registration
/// timestamp the database assigned.
pub fn create_client(conn: &Connection, client: &NewClient) -> Result<Client> {
    conn.execute(
        "INSERT INTO clients (first_name, last_name, email, phone, age)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            client.first_name,
            client.last_name,
            client.email,
            client.phone,
            client.age
        ],
    )
    .context("failed to insert client")?;

    let id = conn.last_insert_rowid();
    tracing::info!(id, email = %client.email, "added client");
    conn.query_row(
        &format!("{CLIENT_SELECT} WHERE c.client_id = ?1"),
        params![id],
        map_client,
    )
    .context("failed to read back client")
}

/// Delete every client registered under `email` and report how many rows went.
/// Email is not unique, so duplicates are removed together.
pub fn delete_clients_by_email(conn: &Connection, email: &str) -> Result<usize> {
    let deleted = conn
        .execute("DELETE FROM clients WHERE email = ?1", params![email])
        .context("failed to delete client")?;

    if deleted == 0 {
        Err(ClinicError::not_found("Client", email).into())
    } else {
        tracing::info!(email, deleted, "deleted clients");
        Ok(deleted)
    }
}
