use anyhow::Error;
use chrono::NaiveDateTime;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

/// Holds the footer message text plus its severity.
pub(crate) struct StatusMessage {
    pub(crate) text: String,
    pub(crate) kind: StatusKind,
}

/// Severity levels shown in the footer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    pub(crate) fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

impl StatusMessage {
    pub(crate) fn info<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            kind: StatusKind::Info,
        }
    }

    pub(crate) fn error<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            kind: StatusKind::Error,
        }
    }
}

/// Produce a rectangle centered within `area` that spans the requested percent
/// of the width and height. Used for modal dialogs.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(area);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(horizontal[1]);

    vertical[1]
}

/// Footer instruction line: each `(key, action)` pair renders as a highlighted
/// `[key]` followed by its action.
pub(crate) fn key_hints(hints: &[(&'static str, &'static str)]) -> Line<'static> {
    let key_style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let mut spans = Vec::with_capacity(hints.len() * 2);
    for (index, (key, action)) in hints.iter().enumerate() {
        spans.push(Span::styled(format!("[{key}]"), key_style));
        if index + 1 == hints.len() {
            spans.push(Span::raw(format!(" {action}")));
        } else {
            spans.push(Span::raw(format!(" {action}   ")));
        }
    }
    Line::from(spans)
}

/// Extract the most relevant error message from a chained error. A SQLite
/// failure keeps its own message; its source is only the bare result code.
pub(crate) fn surface_error(err: &Error) -> String {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<rusqlite::Error>())
        .map(ToString::to_string)
        .or_else(|| err.chain().last().map(|cause| cause.to_string()))
        .unwrap_or_else(|| err.to_string())
}

/// Grid rendering of a stored timestamp; seconds are dropped.
pub(crate) fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format("%Y-%m-%d %H:%M").to_string()
}

pub(crate) fn format_optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Context};
    use chrono::NaiveDate;

    #[test]
    fn surface_error_keeps_the_sqlite_message() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE specializations (name TEXT NOT NULL UNIQUE);")
            .unwrap();
        conn.execute("INSERT INTO specializations (name) VALUES ('Cardiology')", [])
            .unwrap();
        let err = conn
            .execute("INSERT INTO specializations (name) VALUES ('Cardiology')", [])
            .context("failed to insert specialization")
            .unwrap_err();
        assert_eq!(
            surface_error(&err),
            "UNIQUE constraint failed: specializations.name"
        );

        let err = conn
            .prepare("SELECT * FROM appointments")
            .context("failed to prepare appointment query")
            .unwrap_err();
        assert_eq!(surface_error(&err), "no such table: appointments");
    }

    #[test]
    fn surface_error_falls_back_to_root_cause() {
        let err = Err::<(), _>(anyhow!("Client not found: ghost@example.com"))
            .context("failed to delete client")
            .unwrap_err();
        assert_eq!(surface_error(&err), "Client not found: ghost@example.com");
    }

    #[test]
    fn centered_rect_stays_inside() {
        let area = Rect::new(0, 0, 100, 40);
        let popup = centered_rect(60, 50, area);
        assert_eq!(popup.width, 60);
        assert_eq!(popup.height, 20);
        assert_eq!(popup.x, 20);
        assert_eq!(popup.y, 10);
    }

    #[test]
    fn key_hints_pair_keys_with_actions() {
        let line = key_hints(&[("a", "Add"), ("q", "Close")]);
        let text: String = line.spans.iter().map(|span| span.content.to_string()).collect();
        assert_eq!(text, "[a] Add   [q] Close");
    }

    #[test]
    fn timestamps_render_to_the_minute() {
        let value = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(9, 30, 45)
            .unwrap();
        assert_eq!(format_timestamp(&value), "2024-05-01 09:30");
        assert_eq!(format_optional(Some(4.5)), "4.5");
        assert_eq!(format_optional::<i64>(None), "");
    }
}
