use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::error::ClinicError;

/// Open (or create) the database file, run lazy migrations, and return the
/// single connection the whole app shares. Any failure here is fatal for the
/// caller.
pub fn open_database(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context("failed to create data directory")?;
    }

    let conn = Connection::open(path).map_err(|source| ClinicError::Connection {
        path: path.to_path_buf(),
        source,
    })?;
    ensure_schema(&conn)
        .with_context(|| format!("failed to prepare database at {}", path.display()))?;

    tracing::info!(path = %path.display(), "connected to database");
    Ok(conn)
}

/// In-memory database with the full schema, used by tests.
pub fn open_in_memory_database() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    ensure_schema(&conn)?;
    Ok(conn)
}

/// Create every table if missing. `PRAGMA foreign_keys = ON` is toggled here
/// so the referential checks behave the same in tests and production runs.
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("failed to enable foreign keys")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS clients (
            client_id INTEGER PRIMARY KEY AUTOINCREMENT,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT,
            age INTEGER,
            registration_date TEXT NOT NULL DEFAULT (datetime('now', 'localtime'))
        )",
        [],
    )
    .context("failed to create clients table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS specializations (
            specialization_id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )",
        [],
    )
    .context("failed to create specializations table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS doctors (
            doctor_id INTEGER PRIMARY KEY AUTOINCREMENT,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            specialization_id INTEGER NOT NULL,
            email TEXT NOT NULL,
            phone TEXT,
            years_of_exp INTEGER NOT NULL,
            rating REAL,
            FOREIGN KEY(specialization_id) REFERENCES specializations(specialization_id)
        )",
        [],
    )
    .context("failed to create doctors table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS appointments (
            doctor_id INTEGER NOT NULL,
            client_id INTEGER NOT NULL,
            date TEXT NOT NULL,
            reason TEXT,
            status TEXT NOT NULL DEFAULT 'scheduled',
            FOREIGN KEY(doctor_id) REFERENCES doctors(doctor_id) ON DELETE CASCADE,
            FOREIGN KEY(client_id) REFERENCES clients(client_id) ON DELETE CASCADE
        )",
        [],
    )
    .context("failed to create appointments table")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<String>, _>>()
            .unwrap()
    }

    #[test]
    fn schema_creates_all_tables() {
        let conn = open_in_memory_database().unwrap();
        assert_eq!(
            table_names(&conn),
            vec!["appointments", "clients", "doctors", "specializations"]
        );
    }

    #[test]
    fn schema_is_idempotent() {
        let conn = open_in_memory_database().unwrap();
        assert!(ensure_schema(&conn).is_ok());
    }

    #[test]
    fn foreign_keys_enabled() {
        let conn = open_in_memory_database().unwrap();
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn open_database_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("clinic.sqlite");
        let conn = open_database(&path).unwrap();
        drop(conn);
        assert!(path.exists());

        // Reopening an existing file keeps working.
        assert!(open_database(&path).is_ok());
    }

    #[test]
    fn open_database_rejects_a_non_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clinic.sqlite");
        fs::write(&path, "not a database ".repeat(512)).unwrap();
        let err = open_database(&path).unwrap_err();
        assert!(err.downcast_ref::<ClinicError>().is_none());
        assert!(err.to_string().contains("failed to prepare database"));
    }

    #[test]
    fn open_database_reports_unreachable_path() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened as a database file.
        let err = open_database(dir.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ClinicError>(),
            Some(ClinicError::Connection { .. })
        ) || err.to_string().contains("failed to prepare database"));
    }
}
