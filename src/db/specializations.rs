use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::Specialization;

/// Every specialization, ordered case-insensitively. Feeds the autocomplete in
/// the doctor form.
pub fn fetch_specializations(conn: &Connection) -> Result<Vec<Specialization>> {
    let mut stmt = conn
        .prepare(
            "SELECT specialization_id, name FROM specializations
             ORDER BY name COLLATE NOCASE",
        )
        .context("failed to prepare specialization query")?;

    let specializations = stmt
        .query_map([], |row| {
            Ok(Specialization {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })
        .context("failed to load specializations")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect specializations")?;

    Ok(specializations)
}

/// Exact, case-sensitive lookup by name.
pub fn find_specialization(conn: &Connection, name: &str) -> Result<Option<Specialization>> {
    conn.query_row(
        "SELECT specialization_id, name FROM specializations WHERE name = ?1",
        params![name],
        |row| {
            Ok(Specialization {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        },
    )
    .optional()
    .context("failed to look up specialization")
}

/// Return the specialization called `name`, inserting it first when missing.
///
/// The lookup and the insert are separate statements, not a transaction. Two
/// writers adding the same new name at once would race; the UNIQUE constraint
/// on `name` turns the loser into an error rather than a duplicate row.
pub fn get_or_create_specialization(conn: &Connection, name: &str) -> Result<Specialization> {
    if let Some(existing) = find_specialization(conn, name)? {
        return Ok(existing);
    }

    conn.execute(
        "INSERT INTO specializations (name) VALUES (?1)",
        params![name],
    )
    .context("failed to insert specialization")?;

    let id = conn.last_insert_rowid();
    tracing::info!(id, name, "created specialization");
    Ok(Specialization {
        id,
        name: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory_database;

    #[test]
    fn get_or_create_inserts_once() {
        let conn = open_in_memory_database().unwrap();

        let first = get_or_create_specialization(&conn, "Cardiology").unwrap();
        let second = get_or_create_specialization(&conn, "Cardiology").unwrap();

        assert_eq!(first, second);
        assert_eq!(fetch_specializations(&conn).unwrap().len(), 1);
    }

    #[test]
    fn lookup_is_exact() {
        let conn = open_in_memory_database().unwrap();
        get_or_create_specialization(&conn, "Cardiology").unwrap();

        assert!(find_specialization(&conn, "cardiology").unwrap().is_none());
        assert!(find_specialization(&conn, "Cardio").unwrap().is_none());
        assert!(find_specialization(&conn, "Cardiology").unwrap().is_some());
    }

    #[test]
    fn listing_ignores_case_when_sorting() {
        let conn = open_in_memory_database().unwrap();
        for name in ["neurology", "Cardiology", "Dermatology"] {
            get_or_create_specialization(&conn, name).unwrap();
        }
        let names: Vec<String> = fetch_specializations(&conn)
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Cardiology", "Dermatology", "neurology"]);
    }
}
