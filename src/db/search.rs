//! Filtered SELECT construction shared by every entity search. The base query
//! gets a `WHERE 1=1` tail so each populated filter can append
//! `AND <predicate>` without tracking whether it is the first one.

use rusqlite::types::ToSql;
use rusqlite::{params_from_iter, Connection, Row};

pub(crate) struct SearchQuery {
    sql: String,
    params: Vec<Box<dyn ToSql>>,
}

impl SearchQuery {
    pub(crate) fn new(select: &str) -> Self {
        Self {
            sql: format!("{select} WHERE 1=1"),
            params: Vec::new(),
        }
    }

    /// Append a predicate with exactly one `?` placeholder bound to `value`.
    pub(crate) fn and<T: ToSql + 'static>(&mut self, predicate: &str, value: T) -> &mut Self {
        self.sql.push_str(" AND ");
        self.sql.push_str(predicate);
        self.params.push(Box::new(value));
        self
    }

    /// Case-insensitive substring match. SQLite's `LIKE` already folds ASCII
    /// case; wildcards typed by the user are escaped so they match literally.
    pub(crate) fn and_contains(&mut self, expression: &str, needle: &str) -> &mut Self {
        self.and(
            &format!("{expression} LIKE ? ESCAPE '\\'"),
            contains_pattern(needle),
        )
    }

    pub(crate) fn order_by(&mut self, clause: &str) -> &mut Self {
        self.sql.push_str(" ORDER BY ");
        self.sql.push_str(clause);
        self
    }

    pub(crate) fn sql(&self) -> &str {
        &self.sql
    }

    pub(crate) fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Prepare, bind, and collect every row through `map`.
    pub(crate) fn fetch<T, F>(&self, conn: &Connection, map: F) -> rusqlite::Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        tracing::debug!(sql = %self.sql(), params = self.param_count(), "running search");
        let mut stmt = conn.prepare(self.sql())?;
        let rows = stmt.query_map(params_from_iter(self.params.iter()), map)?;
        rows.collect()
    }
}

fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicates_append_in_order() {
        let mut query = SearchQuery::new("SELECT name FROM t");
        query
            .and_contains("name", "card")
            .and("level >= ?", 5_i64)
            .order_by("level DESC");

        assert_eq!(
            query.sql(),
            "SELECT name FROM t WHERE 1=1 AND name LIKE ? ESCAPE '\\' AND level >= ? ORDER BY level DESC"
        );
        assert_eq!(query.param_count(), 2);
    }

    #[test]
    fn wildcards_are_escaped() {
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn fetch_binds_parameters() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (name TEXT, level INTEGER);
             INSERT INTO t VALUES ('Cardiology', 7), ('cardiac surgery', 3),
                                  ('Neurology', 9), ('100% card', 8);",
        )
        .unwrap();

        let mut query = SearchQuery::new("SELECT name FROM t");
        query
            .and_contains("name", "CARD")
            .and("level >= ?", 5_i64)
            .order_by("level DESC");
        let names: Vec<String> = query.fetch(&conn, |row| row.get(0)).unwrap();
        assert_eq!(names, vec!["100% card", "Cardiology"]);

        let mut literal = SearchQuery::new("SELECT name FROM t");
        literal.and_contains("name", "0%");
        let names: Vec<String> = literal.fetch(&conn, |row| row.get(0)).unwrap();
        assert_eq!(names, vec!["100% card"]);
    }
}
