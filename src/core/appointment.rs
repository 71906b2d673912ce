//! Appointment business logic - booking, editing and the upcoming/past split.
//!
//! An appointment is "upcoming" when its datetime is at or after the caller's
//! `now`, otherwise "past". Nothing about that is stored.

use crate::{
    core::{branch, user, vaccine},
    entities::{
        Appointment, Branch, Dose, Vaccine, appointment, branch as branch_entity, dose,
        vaccine as vaccine_entity,
    },
    errors::{Error, Result},
};
use chrono::NaiveDateTime;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, instrument};

/// Input for [`create_appointment`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewAppointment {
    /// Vaccine to book
    pub vaccine_id: i64,
    /// Branch to book at
    pub branch_id: i64,
    /// Local date and time of the appointment
    pub datetime: NaiveDateTime,
    /// Free-text notes
    #[serde(default)]
    pub notes: String,
}

/// Partial update for [`update_appointment`]; absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentUpdate {
    /// New vaccine
    pub vaccine_id: Option<i64>,
    /// New branch
    pub branch_id: Option<i64>,
    /// New local date and time
    pub datetime: Option<NaiveDateTime>,
    /// Replacement notes
    pub notes: Option<String>,
}

/// Anything placed at a point in time.
pub trait Scheduled {
    /// When it happens.
    fn scheduled_at(&self) -> NaiveDateTime;
}

impl Scheduled for appointment::Model {
    fn scheduled_at(&self) -> NaiveDateTime {
        self.datetime
    }
}

impl Scheduled for AppointmentDetails {
    fn scheduled_at(&self) -> NaiveDateTime {
        self.appointment.datetime
    }
}

/// Appointments split around a reference instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppointmentPartition<T> {
    /// At or after `now`, soonest first
    pub upcoming: Vec<T>,
    /// Before `now`, most recent first
    pub past: Vec<T>,
}

/// Splits `items` into upcoming and past relative to `now`.
///
/// Both halves keep the input order among equal datetimes.
pub fn partition<T: Scheduled>(items: Vec<T>, now: NaiveDateTime) -> AppointmentPartition<T> {
    let (mut upcoming, mut past): (Vec<T>, Vec<T>) =
        items.into_iter().partition(|item| item.scheduled_at() >= now);
    upcoming.sort_by_key(Scheduled::scheduled_at);
    past.sort_by(|a, b| b.scheduled_at().cmp(&a.scheduled_at()));
    AppointmentPartition { upcoming, past }
}

/// An appointment with the names needed to display it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppointmentDetails {
    /// The stored appointment
    #[serde(flatten)]
    pub appointment: appointment::Model,
    /// Name of the booked vaccine
    pub vaccine_name: String,
    /// Name of the branch
    pub branch_name: String,
}

/// Attaches vaccine and branch names to each appointment.
pub async fn with_details<C>(
    db: &C,
    appointments: Vec<appointment::Model>,
) -> Result<Vec<AppointmentDetails>>
where
    C: ConnectionTrait,
{
    if appointments.is_empty() {
        return Ok(Vec::new());
    }

    let vaccine_ids: Vec<i64> = appointments.iter().map(|a| a.vaccine_id).collect();
    let branch_ids: Vec<i64> = appointments.iter().map(|a| a.branch_id).collect();

    let vaccine_names: HashMap<i64, String> = Vaccine::find()
        .filter(vaccine_entity::Column::Id.is_in(vaccine_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|v| (v.id, v.name))
        .collect();
    let branch_names: HashMap<i64, String> = Branch::find()
        .filter(branch_entity::Column::Id.is_in(branch_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|b| (b.id, b.name))
        .collect();

    Ok(appointments
        .into_iter()
        .map(|appointment| AppointmentDetails {
            vaccine_name: vaccine_names
                .get(&appointment.vaccine_id)
                .cloned()
                .unwrap_or_default(),
            branch_name: branch_names
                .get(&appointment.branch_id)
                .cloned()
                .unwrap_or_default(),
            appointment,
        })
        .collect())
}

/// All of a user's appointments, split around `now`.
#[instrument(skip(db))]
pub async fn appointments_for_user(
    db: &DatabaseConnection,
    user_id: i64,
    now: NaiveDateTime,
) -> Result<AppointmentPartition<AppointmentDetails>> {
    let appointments = Appointment::find()
        .filter(appointment::Column::UserId.eq(user_id))
        .order_by_asc(appointment::Column::Datetime)
        .order_by_asc(appointment::Column::Id)
        .all(db)
        .await?;
    let detailed = with_details(db, appointments).await?;
    Ok(partition(detailed, now))
}

async fn require_booking_targets<C>(db: &C, vaccine_id: i64, branch_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    vaccine::get_vaccine(db, vaccine_id)
        .await?
        .ok_or_else(|| Error::not_found("vaccine", vaccine_id))?;
    branch::get_branch(db, branch_id)
        .await?
        .ok_or_else(|| Error::not_found("branch", branch_id))?;
    Ok(())
}

/// Books an appointment for `user_id`. Past datetimes are allowed.
#[instrument(skip(db, new))]
pub async fn create_appointment(
    db: &DatabaseConnection,
    user_id: i64,
    new: NewAppointment,
) -> Result<appointment::Model> {
    let txn = db.begin().await?;
    user::require_user(&txn, user_id).await?;
    require_booking_targets(&txn, new.vaccine_id, new.branch_id).await?;

    let created = appointment::ActiveModel {
        user_id: Set(user_id),
        vaccine_id: Set(new.vaccine_id),
        branch_id: Set(new.branch_id),
        datetime: Set(new.datetime),
        notes: Set(new.notes.trim().to_string()),
        created_at: Set(chrono::Local::now().naive_local()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    info!(appointment_id = created.id, "Appointment booked");
    Ok(created)
}

/// Fetches an appointment only if `user_id` owns it.
pub async fn get_appointment_for_user<C>(
    db: &C,
    user_id: i64,
    appointment_id: i64,
) -> Result<Option<appointment::Model>>
where
    C: ConnectionTrait,
{
    Appointment::find_by_id(appointment_id)
        .filter(appointment::Column::UserId.eq(user_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Edits one of the user's appointments. `created_at` is never touched.
#[instrument(skip(db, update))]
pub async fn update_appointment(
    db: &DatabaseConnection,
    user_id: i64,
    appointment_id: i64,
    update: AppointmentUpdate,
) -> Result<appointment::Model> {
    let txn = db.begin().await?;
    let existing = get_appointment_for_user(&txn, user_id, appointment_id)
        .await?
        .ok_or_else(|| Error::not_found("appointment", appointment_id))?;

    let vaccine_id = update.vaccine_id.unwrap_or(existing.vaccine_id);
    let branch_id = update.branch_id.unwrap_or(existing.branch_id);
    require_booking_targets(&txn, vaccine_id, branch_id).await?;

    let mut model: appointment::ActiveModel = existing.into();
    model.vaccine_id = Set(vaccine_id);
    model.branch_id = Set(branch_id);
    if let Some(datetime) = update.datetime {
        model.datetime = Set(datetime);
    }
    if let Some(notes) = update.notes {
        model.notes = Set(notes.trim().to_string());
    }
    let updated = model.update(&txn).await?;
    txn.commit().await?;

    info!("Appointment updated");
    Ok(updated)
}

/// Cancels one of the user's appointments; doses linked to it become unlinked.
#[instrument(skip(db))]
pub async fn delete_appointment(
    db: &DatabaseConnection,
    user_id: i64,
    appointment_id: i64,
) -> Result<()> {
    let txn = db.begin().await?;
    let existing = get_appointment_for_user(&txn, user_id, appointment_id)
        .await?
        .ok_or_else(|| Error::not_found("appointment", appointment_id))?;

    let unlinked = Dose::update_many()
        .col_expr(dose::Column::AppointmentId, Expr::value(Option::<i64>::None))
        .filter(dose::Column::AppointmentId.eq(appointment_id))
        .exec(&txn)
        .await?;
    existing.delete(&txn).await?;
    txn.commit().await?;

    info!(unlinked_doses = unlinked.rows_affected, "Appointment deleted");
    Ok(())
}
