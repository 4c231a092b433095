//! Ratatui front-end: a launcher menu that opens independent entity windows.

mod app;
mod entities;
mod forms;
mod helpers;
mod screen;
mod terminal;

pub use app::App;
pub use terminal::run_app;
