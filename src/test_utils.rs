//! Shared test utilities for `VaccineBuddy`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    api::identity::USER_ID_HEADER,
    core::{
        appointment::{self, NewAppointment},
        branch::{self, NewBranch},
        dose::{self, NewDose},
        user::{self, NewUser},
        vaccine::{self, NewVaccine},
    },
    entities::{self, ScheduleBlock},
    errors::Result,
};
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header::CONTENT_TYPE},
};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use sea_orm::DatabaseConnection;
use serde_json::Value;
use tower::ServiceExt;
use tracing_subscriber::EnvFilter;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Local wall-clock time `days` days from now (negative for the past).
#[must_use]
pub fn days_from_now(days: i64) -> NaiveDateTime {
    chrono::Local::now().naive_local() + Duration::days(days)
}

/// Creates a test user.
///
/// # Defaults
/// * `first_name`: `"Test"`
/// * `last_name`: the username
/// * `email`: `"<username>@example.org"`
pub async fn create_test_user(db: &DatabaseConnection, username: &str) -> Result<entities::user::Model> {
    user::create_user(
        db,
        NewUser {
            username: username.to_string(),
            first_name: "Test".to_string(),
            last_name: username.to_string(),
            email: format!("{username}@example.org"),
        },
    )
    .await
}

/// Creates a test vaccine priced at 20.0 with every optional field empty.
pub async fn create_test_vaccine(db: &DatabaseConnection, name: &str) -> Result<entities::vaccine::Model> {
    vaccine::create_vaccine(db, NewVaccine::named(name, 20.0)).await
}

/// Creates a test branch open Monday to Friday, 09:00 to 17:00.
pub async fn create_test_branch(db: &DatabaseConnection, name: &str) -> Result<entities::branch::Model> {
    branch::create_branch(
        db,
        NewBranch {
            name: name.to_string(),
            address: "1 High Street, Testville".to_string(),
            postcode: "TE1 1ST".to_string(),
            phone: "01234 000000".to_string(),
            email: "branch@example.org".to_string(),
            opening_hours: vec![ScheduleBlock::new("Mon-Fri", "09:00", "17:00")],
            image_url: None,
        },
    )
    .await
}

/// Books a test appointment at `datetime` with no notes.
pub async fn create_test_appointment(
    db: &DatabaseConnection,
    user_id: i64,
    vaccine_id: i64,
    branch_id: i64,
    datetime: NaiveDateTime,
) -> Result<entities::appointment::Model> {
    appointment::create_appointment(
        db,
        user_id,
        NewAppointment {
            vaccine_id,
            branch_id,
            datetime,
            notes: String::new(),
        },
    )
    .await
}

/// Records an unlinked, auto-numbered dose administered on 2024-01-10.
pub async fn create_test_dose(
    db: &DatabaseConnection,
    user_id: i64,
    vaccine_id: i64,
) -> Result<entities::dose::Model> {
    let date_administered = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap_or_default();
    dose::create_dose(
        db,
        user_id,
        NewDose {
            vaccine_id,
            date_administered,
            appointment_id: None,
            dose_number: None,
        },
    )
    .await
}

/// A user with one past appointment, plus the vaccine and branch it is for.
pub struct AppointmentFixture {
    /// In-memory database
    pub db: DatabaseConnection,
    /// `"patient"`
    pub user: entities::user::Model,
    /// `"Influenza"`
    pub vaccine: entities::vaccine::Model,
    /// `"Central"`
    pub branch: entities::branch::Model,
    /// Booked for 2020-01-15 10:00
    pub appointment: entities::appointment::Model,
}

/// Sets up a complete test environment with one past appointment.
pub async fn setup_with_appointment() -> Result<AppointmentFixture> {
    let db = setup_test_db().await?;
    let user = create_test_user(&db, "patient").await?;
    let vaccine = create_test_vaccine(&db, "Influenza").await?;
    let branch = create_test_branch(&db, "Central").await?;
    let datetime = NaiveDate::from_ymd_opt(2020, 1, 15)
        .and_then(|date| date.and_hms_opt(10, 0, 0))
        .unwrap_or_default();
    let appointment = create_test_appointment(&db, user.id, vaccine.id, branch.id, datetime).await?;
    Ok(AppointmentFixture {
        db,
        user,
        vaccine,
        branch,
        appointment,
    })
}

/// Builds a `GET` request, optionally as the given user.
pub fn get_request(uri: &str, user_id: Option<i64>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(id) = user_id {
        builder = builder.header(USER_ID_HEADER, id.to_string());
    }
    builder.body(Body::empty()).unwrap_or_default()
}

/// Builds a request with a JSON body, optionally as the given user.
pub fn json_request(method: Method, uri: &str, user_id: Option<i64>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");
    if let Some(id) = user_id {
        builder = builder.header(USER_ID_HEADER, id.to_string());
    }
    builder
        .body(Body::from(body.to_string()))
        .unwrap_or_default()
}

/// Runs one request through the router; an empty or non-JSON body reads as `null`.
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = match app.oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap_or_default();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

/// Routes `tracing` output through the test harness; honours `RUST_LOG`.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with_test_writer()
        .try_init();
}
