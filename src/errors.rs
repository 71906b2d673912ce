//! Unified error type for the vaccination service.
//!
//! Core operations fail with one of the named conditions below; the HTTP layer
//! maps them onto status codes in [`crate::api::error`].

use thiserror::Error;

/// Errors produced by configuration, storage and the business rules.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Underlying `SeaORM` / `SQLite` failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Seed or config file had invalid TOML
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Record does not exist, or is not owned by the requester
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of record (`"dose"`, `"appointment"`, ...)
        entity: &'static str,
        /// Requested identifier
        id: i64,
    },

    /// The appointment is already referenced by another dose
    #[error("Appointment {appointment_id} is already linked to a dose")]
    AppointmentAlreadyLinked {
        /// Appointment that is taken
        appointment_id: i64,
    },

    /// A vaccine with this name already exists
    #[error("Vaccine '{name}' already exists")]
    DuplicateVaccine {
        /// Conflicting name
        name: String,
    },

    /// The (vaccine, user, dose number) triple is already recorded
    #[error("Dose {dose_number} of vaccine {vaccine_id} is already recorded for this user")]
    DuplicateDose {
        /// Vaccine of the dose
        vaccine_id: i64,
        /// Conflicting number
        dose_number: i32,
    },

    /// Username or email is already registered
    #[error("{field} '{value}' is already in use")]
    DuplicateUser {
        /// `"username"` or `"email"`
        field: &'static str,
        /// Conflicting value
        value: String,
    },

    /// Concurrent dose creation kept colliding on the same dose number
    #[error("Could not allocate a dose number after {attempts} attempts, please retry")]
    DoseNumberContention {
        /// How many inserts were tried
        attempts: u32,
    },

    /// Reference data cannot be deleted while other records point at it
    #[error("{entity} {id} is still referenced by {count} record(s)")]
    ReferenceInUse {
        /// Kind of record being deleted
        entity: &'static str,
        /// Its identifier
        id: i64,
        /// Number of dependent rows
        count: u64,
    },

    /// Malformed input for a single field
    #[error("Invalid {field}: {message}")]
    Validation {
        /// Offending field
        field: &'static str,
        /// Human-readable reason
        message: String,
    },

    /// Opening-hours data that does not follow the schedule block format
    #[error("Invalid opening hours: {message}")]
    InvalidSchedule {
        /// Human-readable reason
        message: String,
    },

    /// No requesting user could be identified
    #[error("Authentication required")]
    Unauthenticated,
}

impl Error {
    /// Shorthand for [`Error::NotFound`].
    #[must_use]
    pub const fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    /// Shorthand for [`Error::Validation`].
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
