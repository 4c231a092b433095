//! Typed failures that the UI needs to tell apart. Plain statement failures
//! travel as `anyhow::Error` with context; the variants below are the cases
//! that change how the problem is presented (fatal exit, "Invalid Input"
//! dialog, or a delete that hit nothing).

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClinicError {
    /// The database could not be opened. Fatal at startup.
    #[error("could not open database at {}: {source}", path.display())]
    Connection {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// User input rejected before any statement ran.
    #[error("{0}")]
    Validation(String),

    /// A keyed delete matched zero rows.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },
}

impl ClinicError {
    pub fn validation<S: Into<String>>(message: S) -> Self {
        ClinicError::Validation(message.into())
    }

    pub fn not_found<S: Into<String>>(entity: &'static str, key: S) -> Self {
        ClinicError::NotFound {
            entity,
            key: key.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn validation_message_is_shown_verbatim() {
        let err: anyhow::Result<()> = Err(ClinicError::validation("Age must be a whole number."))
            .context("failed to add client");
        let err = err.unwrap_err();
        assert_eq!(err.root_cause().to_string(), "Age must be a whole number.");
    }

    #[test]
    fn not_found_names_the_key() {
        let err = ClinicError::not_found("Client", "ann@example.com");
        assert_eq!(err.to_string(), "Client not found: ann@example.com");
    }
}
