//! One generic entity window. Each entity plugs its columns, queries, filter
//! bar, add form, and delete key in through [`EntityKind`]; the screen owns the
//! displayed rows, the selection, and whichever modal is open.

use std::marker::PhantomData;
use std::mem;

use anyhow::{Error, Result};
use crossterm::event::KeyCode;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};
use ratatui::Frame;
use rusqlite::Connection;

use super::forms::Form;
use super::helpers::{centered_rect, key_hints, surface_error, StatusMessage};
use crate::error::ClinicError;

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;

/// One grid column: header text and its width rule.
pub(crate) struct Column {
    pub(crate) header: &'static str,
    pub(crate) width: Constraint,
}

impl Column {
    pub(crate) const fn new(header: &'static str, width: Constraint) -> Self {
        Self { header, width }
    }
}

/// Everything that differs between the Clients, Doctors, and Appointments
/// windows.
pub(crate) trait EntityKind {
    type Row: Clone;
    type Filter;
    type New;

    /// Window title, plural.
    const TITLE: &'static str;
    /// Singular noun used in messages.
    const NOUN: &'static str;

    fn columns() -> Vec<Column>;
    fn cells(row: &Self::Row) -> Vec<String>;
    /// Short description for the delete confirmation.
    fn describe(row: &Self::Row) -> String;

    fn load(conn: &Connection) -> Result<Vec<Self::Row>>;

    fn filter_form() -> Form;
    /// Completion candidates for filter fields, as `(field index, values)`.
    fn filter_suggestions(_conn: &Connection) -> Result<Vec<(usize, Vec<String>)>> {
        Ok(Vec::new())
    }
    /// `Ok(None)` when every filter is empty.
    fn parse_filter(form: &Form) -> Result<Option<Self::Filter>, ClinicError>;
    fn search(conn: &Connection, filter: &Self::Filter) -> Result<Vec<Self::Row>>;

    fn add_form(conn: &Connection) -> Result<Form>;
    fn parse_new(form: &Form) -> Result<Self::New, ClinicError>;
    fn insert(conn: &Connection, new: &Self::New) -> Result<()>;

    fn delete(conn: &Connection, row: &Self::Row) -> Result<()>;
}

/// What the window asks of the application after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScreenAction {
    Stay,
    Close,
    ShowLauncher,
    NextWindow,
}

/// Object-safe face of an entity window so the launcher can hold a mix.
pub(crate) trait Screen {
    fn title(&self) -> &'static str;
    fn draw(&self, frame: &mut Frame, area: Rect);
    fn handle_key(&mut self, conn: &Connection, code: KeyCode) -> ScreenAction;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NoticeLevel {
    Warning,
    InvalidInput,
    DatabaseError,
}

impl NoticeLevel {
    fn title(&self) -> &'static str {
        match self {
            NoticeLevel::Warning => "Warning",
            NoticeLevel::InvalidInput => "Invalid Input",
            NoticeLevel::DatabaseError => "Database Error",
        }
    }

    fn color(&self) -> Color {
        match self {
            NoticeLevel::Warning => Color::Yellow,
            NoticeLevel::InvalidInput | NoticeLevel::DatabaseError => Color::Red,
        }
    }
}

/// Blocking dialog. `resume` restores an add form after the user dismisses a
/// validation problem so nothing typed is lost.
pub(crate) struct Notice {
    pub(crate) level: NoticeLevel,
    pub(crate) message: String,
    resume: Option<Form>,
}

pub(crate) enum Modal<R> {
    None,
    Filtering,
    Adding(Form),
    ConfirmDelete(R),
    Notice(Notice),
}

pub(crate) struct EntityScreen<K: EntityKind> {
    pub(crate) rows: Vec<K::Row>,
    pub(crate) selected: usize,
    pub(crate) filters: Form,
    pub(crate) filtered: bool,
    pub(crate) modal: Modal<K::Row>,
    pub(crate) status: Option<StatusMessage>,
    kind: PhantomData<K>,
}

impl<K: EntityKind> EntityScreen<K> {
    /// Build the window and run the initial load.
    pub(crate) fn open(conn: &Connection) -> Self {
        let mut screen = Self {
            rows: Vec::new(),
            selected: 0,
            filters: K::filter_form(),
            filtered: false,
            modal: Modal::None,
            status: None,
            kind: PhantomData,
        };
        screen.reload(conn);
        screen
    }

    /// Replace the rows with the unfiltered listing.
    pub(crate) fn reload(&mut self, conn: &Connection) {
        match K::load(conn) {
            Ok(rows) => {
                self.set_rows(rows);
                self.filtered = false;
            }
            Err(err) => self.fail(format!("Failed to load {}.", K::TITLE.to_lowercase()), err),
        }
    }

    pub(crate) fn current_row(&self) -> Option<&K::Row> {
        self.rows.get(self.selected)
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        if self.rows.is_empty() {
            return;
        }
        let len = self.rows.len() as isize;
        let new = (self.selected as isize + offset).clamp(0, len - 1);
        self.selected = new as usize;
    }

    pub(crate) fn select_first(&mut self) {
        self.selected = 0;
    }

    pub(crate) fn select_last(&mut self) {
        self.selected = self.rows.len().saturating_sub(1);
    }

    fn set_rows(&mut self, rows: Vec<K::Row>) {
        self.rows = rows;
        self.ensure_in_bounds();
    }

    fn ensure_in_bounds(&mut self) {
        if self.rows.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.rows.len() {
            self.selected = self.rows.len() - 1;
        }
    }

    /// Open the add dialog, or warn when a pick list has nothing to offer.
    pub(crate) fn begin_add(&mut self, conn: &Connection) {
        match K::add_form(conn) {
            Ok(form) => match form.empty_choice() {
                Some(label) => self.warn(format!(
                    "There is no {} to choose from yet. Add one first.",
                    label.to_lowercase()
                )),
                None => self.modal = Modal::Adding(form),
            },
            Err(err) => self.fail(format!("Failed to prepare the {} form.", K::NOUN), err),
        }
    }

    /// Validate and insert. Returns true when the row was stored.
    pub(crate) fn submit_add(&mut self, conn: &Connection, form: Form) -> bool {
        let new = match K::parse_new(&form) {
            Ok(new) => new,
            Err(err) => {
                tracing::warn!(error = %err, entity = K::NOUN, "rejected add");
                self.modal = Modal::Notice(Notice {
                    level: NoticeLevel::InvalidInput,
                    message: err.to_string(),
                    resume: Some(form),
                });
                return false;
            }
        };

        match K::insert(conn, &new) {
            Ok(()) => {
                self.status = Some(StatusMessage::info(format!("Added {}.", K::NOUN)));
                self.reload(conn);
                true
            }
            Err(err) => {
                self.fail(format!("Failed to add {}.", K::NOUN), err);
                false
            }
        }
    }

    /// Ask for confirmation, or warn when nothing is selected.
    pub(crate) fn request_delete(&mut self) {
        match self.current_row().cloned() {
            Some(row) => self.modal = Modal::ConfirmDelete(row),
            None => self.warn(format!("Select a {} to delete.", K::NOUN)),
        }
    }

    pub(crate) fn confirm_delete(&mut self, conn: &Connection, row: &K::Row) {
        match K::delete(conn, row) {
            Ok(()) => {
                self.status = Some(StatusMessage::info(format!("Deleted {}.", K::NOUN)));
                self.reload(conn);
            }
            Err(err) => self.fail(format!("Failed to delete {}.", K::NOUN), err),
        }
    }

    /// Focus the filter bar with completions drawn from the current data.
    pub(crate) fn begin_filter(&mut self, conn: &Connection) {
        match K::filter_suggestions(conn) {
            Ok(suggestions) => {
                for (index, values) in suggestions {
                    self.filters.set_suggestions(index, values);
                }
                self.modal = Modal::Filtering;
            }
            Err(err) => self.fail(format!("Failed to prepare the {} search.", K::NOUN), err),
        }
    }

    /// Run the filter bar as a query. All-empty filters only warn.
    pub(crate) fn run_search(&mut self, conn: &Connection) {
        let filter = match K::parse_filter(&self.filters) {
            Ok(Some(filter)) => filter,
            Ok(None) => {
                self.warn("Enter at least one search criteria!");
                return;
            }
            Err(err) => {
                self.modal = Modal::Notice(Notice {
                    level: NoticeLevel::InvalidInput,
                    message: err.to_string(),
                    resume: None,
                });
                return;
            }
        };

        match K::search(conn, &filter) {
            Ok(rows) => {
                let count = rows.len();
                self.set_rows(rows);
                self.select_first();
                self.filtered = true;
                self.status = Some(StatusMessage::info(format!(
                    "{count} matching {}.",
                    if count == 1 { K::NOUN.to_string() } else { K::TITLE.to_lowercase() }
                )));
            }
            Err(err) => self.fail(format!("Failed to search {}.", K::TITLE.to_lowercase()), err),
        }
    }

    /// Reset re-runs the plain load; typed filters stay for the next search.
    pub(crate) fn reset(&mut self, conn: &Connection) {
        self.reload(conn);
        if matches!(self.modal, Modal::None) {
            self.status = Some(StatusMessage::info(format!(
                "Showing all {}.",
                K::TITLE.to_lowercase()
            )));
        }
    }

    fn warn<S: Into<String>>(&mut self, message: S) {
        self.modal = Modal::Notice(Notice {
            level: NoticeLevel::Warning,
            message: message.into(),
            resume: None,
        });
    }

    /// Surface a failed statement as a blocking dialog and trace it. Input
    /// problems never get here; they are caught while parsing the form.
    fn fail(&mut self, action: String, err: Error) {
        tracing::error!(error = ?err, "{action}");
        self.status = Some(StatusMessage::error(action.clone()));
        self.modal = Modal::Notice(Notice {
            level: NoticeLevel::DatabaseError,
            message: format!("{action}\nError: {}", surface_error(&err)),
            resume: None,
        });
    }

    fn handle_normal_key(&mut self, conn: &Connection, code: KeyCode) -> ScreenAction {
        match code {
            KeyCode::Char('q') => return ScreenAction::Close,
            KeyCode::Esc => return ScreenAction::ShowLauncher,
            KeyCode::Tab => return ScreenAction::NextWindow,
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::PageUp => self.move_selection(-10),
            KeyCode::PageDown => self.move_selection(10),
            KeyCode::Home => self.select_first(),
            KeyCode::End => self.select_last(),
            KeyCode::Char('a') | KeyCode::Char('A') => self.begin_add(conn),
            KeyCode::Char('d') | KeyCode::Char('D') | KeyCode::Delete => self.request_delete(),
            KeyCode::Char('/') | KeyCode::Char('s') | KeyCode::Char('S') => {
                self.begin_filter(conn);
            }
            KeyCode::Char('r') | KeyCode::Char('R') => self.reset(conn),
            _ => {}
        }
        ScreenAction::Stay
    }

    fn handle_filter_key(&mut self, conn: &Connection, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                if !self.filters.cancel_autocomplete() {
                    self.modal = Modal::None;
                }
            }
            KeyCode::Tab => {
                if !self.filters.accept_suggestion() {
                    self.filters.next_field();
                }
            }
            KeyCode::Down => self.filters.next_field(),
            KeyCode::BackTab | KeyCode::Up => self.filters.previous_field(),
            KeyCode::Backspace => self.filters.backspace(),
            KeyCode::Enter => {
                self.modal = Modal::None;
                self.run_search(conn);
            }
            KeyCode::Char(ch) => {
                self.filters.push_char(ch);
            }
            _ => {}
        }
    }

    fn handle_add_key(&mut self, conn: &Connection, code: KeyCode, mut form: Form) {
        match code {
            KeyCode::Esc => {
                if form.cancel_autocomplete() {
                    self.modal = Modal::Adding(form);
                } else {
                    self.status = Some(StatusMessage::info("Add cancelled."));
                }
                return;
            }
            KeyCode::Tab => {
                if !form.accept_suggestion() {
                    form.next_field();
                }
            }
            KeyCode::BackTab => form.previous_field(),
            KeyCode::Down => form.next_field(),
            KeyCode::Up => form.previous_field(),
            KeyCode::Left if form.active_is_choice() => form.cycle_choice(-1),
            KeyCode::Right if form.active_is_choice() => form.cycle_choice(1),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => {
                self.submit_add(conn, form);
                return;
            }
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }
        self.modal = Modal::Adding(form);
    }

    fn handle_confirm_key(&mut self, conn: &Connection, code: KeyCode, row: K::Row) {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.status = Some(StatusMessage::info("Deletion cancelled."));
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                self.confirm_delete(conn, &row);
            }
            _ => self.modal = Modal::ConfirmDelete(row),
        }
    }

    fn handle_notice_key(&mut self, code: KeyCode, notice: Notice) {
        match code {
            KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ') => {
                if let Some(mut form) = notice.resume {
                    form.error = Some(notice.message);
                    self.modal = Modal::Adding(form);
                }
            }
            _ => self.modal = Modal::Notice(notice),
        }
    }

    fn draw_filter_bar(&self, frame: &mut Frame, area: Rect) {
        let focused = matches!(self.modal, Modal::Filtering);
        let title = if focused {
            "Search (Enter to run • Tab to accept/switch • Esc to leave)"
        } else {
            "Search (/ to edit)"
        };
        let border_style = if focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(border_style);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let lines: Vec<Line> = (0..self.filters.fields.len())
            .map(|index| self.filters.build_line(index, focused))
            .collect();
        frame.render_widget(Paragraph::new(lines), inner);

        if focused {
            if let Some(offset) = self.filters.cursor_offset() {
                frame.set_cursor_position((inner.x + offset, inner.y + self.filters.active as u16));
            }
        }
    }

    fn draw_table(&self, frame: &mut Frame, area: Rect) {
        let columns = K::columns();
        let header = Row::new(
            columns
                .iter()
                .map(|column| Cell::from(column.header))
                .collect::<Vec<_>>(),
        )
        .style(Style::default().add_modifier(Modifier::BOLD));

        let rows: Vec<Row> = self
            .rows
            .iter()
            .map(|row| Row::new(K::cells(row).into_iter().map(Cell::from).collect::<Vec<_>>()))
            .collect();

        let title = if self.filtered {
            format!("{} (filtered: {} rows)", K::TITLE, self.rows.len())
        } else {
            format!("{} ({} rows)", K::TITLE, self.rows.len())
        };

        let table = Table::new(rows, columns.iter().map(|column| column.width))
            .header(header)
            .block(Block::default().title(title).borders(Borders::ALL))
            .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("▶ ");

        let mut state = TableState::default();
        if !self.rows.is_empty() {
            state.select(Some(self.selected));
        }
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let status_line = match &self.status {
            Some(status) => Line::from(Span::styled(status.text.clone(), status.kind.style())),
            None => Line::from(""),
        };
        let instructions = key_hints(&[
            ("a", "Add"),
            ("d", "Delete"),
            ("/", "Search"),
            ("r", "Reset"),
            ("↑↓", "Select"),
            ("Tab", "Next window"),
            ("Esc", "Launcher"),
            ("q", "Close"),
        ]);

        let paragraph = Paragraph::new(vec![status_line, instructions]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn draw_add_form(&self, frame: &mut Frame, area: Rect, form: &Form) {
        let popup_area = centered_rect(70, 60, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title(format!("Add {}", capitalize(K::NOUN)))
            .borders(Borders::ALL);
        let inner = block.inner(popup_area);
        frame.render_widget(block, popup_area);

        let mut lines: Vec<Line> = (0..form.fields.len())
            .map(|index| form.build_line(index, true))
            .collect();
        lines.push(Line::from(""));
        match &form.error {
            Some(error) => lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            ))),
            None => lines.push(Line::from(Span::styled(
                "Enter to save • Tab to accept/switch • ←→ to pick • Esc to cancel",
                Style::default().fg(Color::Gray),
            ))),
        }

        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);

        if let Some(offset) = form.cursor_offset() {
            frame.set_cursor_position((inner.x + offset, inner.y + form.active as u16));
        }
    }

    fn draw_confirm(&self, frame: &mut Frame, area: Rect, row: &K::Row) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Confirm Removal")
            .borders(Borders::ALL);
        let inner = block.inner(popup_area);
        frame.render_widget(block, popup_area);

        let lines = vec![
            Line::from(format!("Delete {} {}?", K::NOUN, K::describe(row))),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel.",
                Style::default().fg(Color::Gray),
            )),
        ];
        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn draw_notice(&self, frame: &mut Frame, area: Rect, notice: &Notice) {
        let popup_area = centered_rect(60, 35, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title(notice.level.title())
            .borders(Borders::ALL)
            .border_style(Style::default().fg(notice.level.color()));
        let inner = block.inner(popup_area);
        frame.render_widget(block, popup_area);

        let mut lines: Vec<Line> = notice.message.lines().map(|line| Line::from(line.to_string())).collect();
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Press Enter to continue.",
            Style::default().fg(Color::Gray),
        )));
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
    }
}

impl<K: EntityKind> Screen for EntityScreen<K> {
    fn title(&self) -> &'static str {
        K::TITLE
    }

    fn draw(&self, frame: &mut Frame, area: Rect) {
        let filter_height = self.filters.fields.len() as u16 + 2;
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(filter_height),
                Constraint::Min(3),
                Constraint::Length(FOOTER_HEIGHT),
            ])
            .split(area);

        self.draw_filter_bar(frame, chunks[0]);
        self.draw_table(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);

        match &self.modal {
            Modal::Adding(form) => self.draw_add_form(frame, area, form),
            Modal::ConfirmDelete(row) => self.draw_confirm(frame, area, row),
            Modal::Notice(notice) => self.draw_notice(frame, area, notice),
            Modal::Filtering | Modal::None => {}
        }
    }

    fn handle_key(&mut self, conn: &Connection, code: KeyCode) -> ScreenAction {
        match mem::replace(&mut self.modal, Modal::None) {
            Modal::None => return self.handle_normal_key(conn, code),
            Modal::Filtering => {
                self.modal = Modal::Filtering;
                self.handle_filter_key(conn, code);
            }
            Modal::Adding(form) => self.handle_add_key(conn, code, form),
            Modal::ConfirmDelete(row) => self.handle_confirm_key(conn, code, row),
            Modal::Notice(notice) => self.handle_notice_key(code, notice),
        }
        ScreenAction::Stay
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
