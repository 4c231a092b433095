use anyhow::Result;
use crossterm::event::KeyCode;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Tabs, Wrap};
use ratatui::Frame;
use rusqlite::Connection;

use super::entities::{AppointmentKind, ClientKind, DoctorKind};
use super::helpers::{key_hints, StatusMessage};
use super::screen::{EntityScreen, Screen, ScreenAction};

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Height of the window bar across the top.
const TABS_HEIGHT: u16 = 3;

/// Menu entries in the order they are listed.
const LAUNCHER_ENTRIES: [Launch; 3] = [Launch::Clients, Launch::Doctors, Launch::Appointments];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Launch {
    Clients,
    Doctors,
    Appointments,
}

impl Launch {
    fn label(&self) -> &'static str {
        match self {
            Launch::Clients => "Clients",
            Launch::Doctors => "Doctors",
            Launch::Appointments => "Appointments",
        }
    }

    fn open(&self, conn: &Connection) -> Box<dyn Screen> {
        match self {
            Launch::Clients => Box::new(EntityScreen::<ClientKind>::open(conn)),
            Launch::Doctors => Box::new(EntityScreen::<DoctorKind>::open(conn)),
            Launch::Appointments => Box::new(EntityScreen::<AppointmentKind>::open(conn)),
        }
    }
}

/// Which part of the application receives keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Launcher,
    Window(usize),
}

/// Central application state: the one database connection, the launcher menu,
/// and every window opened from it.
pub struct App {
    conn: Connection,
    windows: Vec<Box<dyn Screen>>,
    focus: Focus,
    launcher_selected: usize,
    status: Option<StatusMessage>,
}

impl App {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            windows: Vec::new(),
            focus: Focus::Launcher,
            launcher_selected: 0,
            status: Some(StatusMessage::info("Choose a window to open.")),
        }
    }

    /// Route a key press. Returns `true` once the user asked to quit.
    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        match self.focus {
            Focus::Launcher => Ok(self.handle_launcher_key(code)),
            Focus::Window(index) => {
                self.handle_window_key(index, code);
                Ok(false)
            }
        }
    }

    fn handle_launcher_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Char('Q') => return true,
            KeyCode::Up | KeyCode::Char('k') => {
                self.launcher_selected = self.launcher_selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.launcher_selected = (self.launcher_selected + 1).min(LAUNCHER_ENTRIES.len() - 1);
            }
            KeyCode::Enter => self.open_window(LAUNCHER_ENTRIES[self.launcher_selected]),
            KeyCode::Char(ch @ '1'..='3') => {
                let index = ch as usize - '1' as usize;
                self.launcher_selected = index;
                self.open_window(LAUNCHER_ENTRIES[index]);
            }
            KeyCode::Tab => self.next_window(),
            KeyCode::BackTab => self.previous_window(),
            _ => {}
        }
        false
    }

    fn handle_window_key(&mut self, index: usize, code: KeyCode) {
        let Some(window) = self.windows.get_mut(index) else {
            self.focus = Focus::Launcher;
            return;
        };

        match window.handle_key(&self.conn, code) {
            ScreenAction::Stay => {}
            ScreenAction::Close => self.close_window(index),
            ScreenAction::ShowLauncher => self.focus = Focus::Launcher,
            ScreenAction::NextWindow => self.next_window(),
        }
    }

    /// Every entry opens a fresh window, even when one of the same kind is
    /// already open.
    fn open_window(&mut self, entry: Launch) {
        let window = entry.open(&self.conn);
        tracing::info!(window = entry.label(), open = self.windows.len() + 1, "opened window");
        self.windows.push(window);
        self.focus = Focus::Window(self.windows.len() - 1);
        self.status = Some(StatusMessage::info(format!("Opened {}.", entry.label())));
    }

    fn close_window(&mut self, index: usize) {
        if index >= self.windows.len() {
            return;
        }
        let window = self.windows.remove(index);
        tracing::info!(window = window.title(), "closed window");
        self.status = Some(StatusMessage::info(format!("Closed {}.", window.title())));
        self.focus = if self.windows.is_empty() {
            Focus::Launcher
        } else {
            Focus::Window(index.min(self.windows.len() - 1))
        };
    }

    /// Cycle launcher → first window → … → last window → launcher.
    fn next_window(&mut self) {
        self.focus = match self.focus {
            Focus::Launcher if self.windows.is_empty() => Focus::Launcher,
            Focus::Launcher => Focus::Window(0),
            Focus::Window(index) if index + 1 < self.windows.len() => Focus::Window(index + 1),
            Focus::Window(_) => Focus::Launcher,
        };
    }

    fn previous_window(&mut self) {
        self.focus = match self.focus {
            Focus::Launcher if self.windows.is_empty() => Focus::Launcher,
            Focus::Launcher => Focus::Window(self.windows.len() - 1),
            Focus::Window(0) => Focus::Launcher,
            Focus::Window(index) => Focus::Window(index - 1),
        };
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(TABS_HEIGHT), Constraint::Min(0)])
            .split(area);

        self.draw_tabs(frame, chunks[0]);

        match self.focus {
            Focus::Window(index) => {
                if let Some(window) = self.windows.get(index) {
                    window.draw(frame, chunks[1]);
                }
            }
            Focus::Launcher => self.draw_launcher(frame, chunks[1]),
        }
    }

    fn draw_tabs(&self, frame: &mut Frame, area: Rect) {
        let mut titles = vec![Line::from("Launcher")];
        titles.extend(
            self.windows
                .iter()
                .enumerate()
                .map(|(index, window)| Line::from(format!("{} {}", index + 1, window.title()))),
        );
        let selected = match self.focus {
            Focus::Launcher => 0,
            Focus::Window(index) => index + 1,
        };

        let tabs = Tabs::new(titles)
            .select(selected)
            .block(Block::default().title("Clinic Admin").borders(Borders::ALL))
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            );
        frame.render_widget(tabs, area);
    }

    fn draw_launcher(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(FOOTER_HEIGHT)])
            .split(area);

        let items: Vec<ListItem> = LAUNCHER_ENTRIES
            .iter()
            .enumerate()
            .map(|(index, entry)| ListItem::new(format!("{}  {}", index + 1, entry.label())))
            .collect();
        let list = List::new(items)
            .block(Block::default().title("Open a window").borders(Borders::ALL))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("▶ ");
        let mut state = ListState::default();
        state.select(Some(self.launcher_selected));
        frame.render_stateful_widget(list, chunks[0], &mut state);

        let block = Block::default().borders(Borders::TOP);
        let inner = block.inner(chunks[1]);
        frame.render_widget(block, chunks[1]);

        let status_line = match &self.status {
            Some(status) => Line::from(Span::styled(status.text.clone(), status.kind.style())),
            None => Line::from(""),
        };
        let instructions = key_hints(&[
            ("↑↓", "Select"),
            ("Enter", "Open"),
            ("1-3", "Open directly"),
            ("Tab", "Next window"),
            ("q", "Quit"),
        ]);
        let paragraph = Paragraph::new(vec![status_line, instructions]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }
}
