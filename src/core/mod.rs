//! Core business logic, independent of the HTTP layer.
//!
//! Every operation takes its database connection as an argument and, where the
//! result depends on the wall clock, the current time as well.

/// Appointment booking and the upcoming/past split
pub mod appointment;
/// Branch reference data and branch listing
pub mod branch;
/// Dose recording and per-vaccine dose numbering
pub mod dose;
/// Linking administered doses to past appointments
pub mod linker;
/// Opening-hours evaluation
pub mod schedule;
/// Upserting vaccines and branches from seed data
pub mod seed;
/// Sortable list columns and toggle links
pub mod sorting;
/// Minimal user records
pub mod user;
/// Vaccine reference data
pub mod vaccine;

use sea_orm::{DbErr, SqlErr};

/// Whether a database error is a violated `UNIQUE` constraint.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Message of a violated `UNIQUE` constraint, e.g. `UNIQUE constraint failed: doses.appointment_id`.
pub(crate) fn unique_violation_message(err: &DbErr) -> Option<String> {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(message)) => Some(message),
        _ => None,
    }
}
