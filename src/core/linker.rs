//! Linking administered doses to the appointments they were given at.
//!
//! An appointment backs at most one dose. Both the candidate query and the link
//! itself only ever see the requesting user's records; anything else reads as
//! not found.

use crate::{
    core::{appointment::with_details, dose::get_dose_for_user, is_unique_violation, unique_violation_message},
    entities::{Appointment, Dose, appointment, dose},
    errors::{Error, Result},
};
use chrono::NaiveDateTime;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{info, instrument};

/// How candidate datetimes are rendered, e.g. `05 Mar 2024, 14:30`.
pub const DATETIME_DISPLAY_FORMAT: &str = "%d %b %Y, %H:%M";

/// A past appointment a dose could be linked to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkCandidate {
    /// Appointment id
    pub id: i64,
    /// Vaccine booked
    pub vaccine_id: i64,
    /// Its name
    pub vaccine_name: String,
    /// Branch name
    pub branch_name: String,
    /// Appointment datetime
    pub datetime: NaiveDateTime,
    /// Datetime formatted with [`DATETIME_DISPLAY_FORMAT`]
    pub datetime_display: String,
}

/// Whether `err` is the unique index on `doses.appointment_id` rejecting a second
/// dose for the same appointment.
pub(crate) fn is_appointment_clash(err: &DbErr) -> bool {
    is_unique_violation(err)
        && unique_violation_message(err).is_some_and(|message| message.contains("appointment_id"))
}

/// Checks that `appointment_id` belongs to `user_id` and is not referenced by any
/// dose other than `dose_id`.
pub(crate) async fn ensure_linkable<C>(
    db: &C,
    user_id: i64,
    appointment_id: i64,
    dose_id: Option<i64>,
) -> Result<appointment::Model>
where
    C: ConnectionTrait,
{
    let appointment = Appointment::find_by_id(appointment_id)
        .filter(appointment::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("appointment", appointment_id))?;

    let holder = Dose::find()
        .filter(dose::Column::AppointmentId.eq(appointment_id))
        .one(db)
        .await?;
    match holder {
        Some(existing) if Some(existing.id) != dose_id => {
            Err(Error::AppointmentAlreadyLinked { appointment_id })
        }
        _ => Ok(appointment),
    }
}

/// Links one of the user's doses to one of their appointments.
///
/// Re-linking the same pair succeeds without a write. An appointment already held
/// by another dose is [`Error::AppointmentAlreadyLinked`], including when a
/// concurrent link wins the race.
#[instrument(skip(db))]
pub async fn link(
    db: &DatabaseConnection,
    dose_id: i64,
    appointment_id: i64,
    user_id: i64,
) -> Result<dose::Model> {
    let txn = db.begin().await?;
    let dose = get_dose_for_user(&txn, user_id, dose_id)
        .await?
        .ok_or_else(|| Error::not_found("dose", dose_id))?;
    ensure_linkable(&txn, user_id, appointment_id, Some(dose_id)).await?;

    if dose.appointment_id == Some(appointment_id) {
        return Ok(dose);
    }

    let mut model: dose::ActiveModel = dose.into();
    model.appointment_id = Set(Some(appointment_id));
    let linked = model.update(&txn).await.map_err(|err| {
        if is_appointment_clash(&err) {
            Error::AppointmentAlreadyLinked { appointment_id }
        } else {
            err.into()
        }
    })?;
    txn.commit().await?;

    info!("Dose linked to appointment");
    Ok(linked)
}

/// The user's appointments before `before` that a dose could be linked to,
/// newest first.
///
/// Appointments held by a dose other than `dose_id` are left out. With
/// `vaccine_id` only appointments for that vaccine are listed.
#[instrument(skip(db))]
pub async fn candidates(
    db: &DatabaseConnection,
    user_id: i64,
    dose_id: Option<i64>,
    vaccine_id: Option<i64>,
    before: NaiveDateTime,
) -> Result<Vec<LinkCandidate>> {
    let mut query = Appointment::find()
        .filter(appointment::Column::UserId.eq(user_id))
        .filter(appointment::Column::Datetime.lt(before));
    if let Some(vaccine_id) = vaccine_id {
        query = query.filter(appointment::Column::VaccineId.eq(vaccine_id));
    }
    let appointments = query
        .order_by_desc(appointment::Column::Datetime)
        .order_by_desc(appointment::Column::Id)
        .all(db)
        .await?;

    let taken: Vec<i64> = Dose::find()
        .filter(dose::Column::UserId.eq(user_id))
        .filter(dose::Column::AppointmentId.is_not_null())
        .all(db)
        .await?
        .into_iter()
        .filter(|held| Some(held.id) != dose_id)
        .filter_map(|held| held.appointment_id)
        .collect();

    let free = appointments
        .into_iter()
        .filter(|appointment| !taken.contains(&appointment.id))
        .collect();

    Ok(with_details(db, free)
        .await?
        .into_iter()
        .map(|details| LinkCandidate {
            id: details.appointment.id,
            vaccine_id: details.appointment.vaccine_id,
            vaccine_name: details.vaccine_name,
            branch_name: details.branch_name,
            datetime: details.appointment.datetime,
            datetime_display: details
                .appointment
                .datetime
                .format(DATETIME_DISPLAY_FORMAT)
                .to_string(),
        })
        .collect())
}
