//! Binary entry point: resolve where the data lives, start logging, open the
//! database, and drive the terminal UI until the user exits.
use std::process;

use clinic_admin::{logging, open_database, run_app, App, Config};

fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    logging::init(&config.log_path)?;
    tracing::info!(db = %config.db_path.display(), "starting clinic-admin");

    let conn = open_database(&config.db_path).unwrap_or_else(|err| {
        tracing::error!(error = ?err, "database connection failed");
        eprintln!("Failed to open database: {err:#}");
        process::exit(1);
    });

    let mut app = App::new(conn);
    let result = run_app(&mut app);
    tracing::info!("clinic-admin exiting");
    result
}
