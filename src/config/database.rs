//! Database configuration module.
//!
//! This module handles the `SQLite` connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so foreign keys and their `ON DELETE` behaviour follow the entity relations. The two
//! uniqueness rules on doses that the entities cannot express are added as explicit indexes.

use crate::entities::{Appointment, Branch, Dose, User, Vaccine, dose};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use std::path::Path;
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/vaccine_buddy.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the `SQLite` database using the `DATABASE_URL` environment variable.
///
/// Falls back to a default local `SQLite` file if no environment variable is set. For file
/// databases the parent directory is created first.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    ensure_parent_dir(&database_url)?;
    debug!("Connecting to {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

/// Creates the directory a file-backed `sqlite://` URL points into.
fn ensure_parent_dir(database_url: &str) -> Result<()> {
    let Some(rest) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = rest.split('?').next().unwrap_or_default();
    match Path::new(path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)?,
        _ => {}
    }
    Ok(())
}

/// Creates all tables and indexes if they do not exist yet.
///
/// Parents are created before children so the foreign keys resolve:
/// users, vaccines, branches, appointments, doses.
pub async fn create_tables<C>(db: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut tables = [
        schema.create_table_from_entity(User),
        schema.create_table_from_entity(Vaccine),
        schema.create_table_from_entity(Branch),
        schema.create_table_from_entity(Appointment),
        schema.create_table_from_entity(Dose),
    ];
    for table in &mut tables {
        table.if_not_exists();
        db.execute(builder.build(&*table)).await?;
    }

    let dose_number_index = Index::create()
        .name("idx_doses_vaccine_user_number")
        .table(Dose)
        .col(dose::Column::VaccineId)
        .col(dose::Column::UserId)
        .col(dose::Column::DoseNumber)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&dose_number_index)).await?;

    // NULLs are distinct in SQLite unique indexes, so unlinked doses are unaffected.
    let appointment_index = Index::create()
        .name("idx_doses_appointment")
        .table(Dose)
        .col(dose::Column::AppointmentId)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&appointment_index)).await?;

    info!("Database tables ensured");
    Ok(())
}
