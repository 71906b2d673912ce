//! Dose business logic - recording doses and numbering them per vaccine.
//!
//! Dose numbers count up from 1 for each (user, vaccine) pair. When the caller
//! leaves the number out it is taken as the current maximum plus one, inside the
//! same transaction as the insert. Two concurrent writers can still pick the same
//! number; the unique index rejects the loser and the whole attempt is retried.

use crate::{
    core::{
        is_unique_violation, linker,
        sorting::{SortColumn, SortDirection, SortSpec, SortState},
        user, vaccine,
    },
    entities::{Dose, Vaccine, dose, vaccine as vaccine_entity},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// How many times an auto-numbered insert is tried before giving up.
pub const DOSE_NUMBER_ATTEMPTS: u32 = 3;

/// Input for [`create_dose`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewDose {
    /// Vaccine that was given
    pub vaccine_id: i64,
    /// Date it was given
    pub date_administered: NaiveDate,
    /// Appointment to link the dose to
    #[serde(default)]
    pub appointment_id: Option<i64>,
    /// Explicit sequence number; computed when absent
    #[serde(default)]
    pub dose_number: Option<i32>,
}

/// Fields the dose history can be ordered by.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DoseSortField {
    /// Date administered
    Date,
    /// Vaccine name
    Vaccine,
    /// Dose number
    DoseNumber,
}

const BY_DATE: SortColumn<DoseSortField> = SortColumn {
    key: "date",
    field: DoseSortField::Date,
    default_direction: SortDirection::Asc,
};

/// Sortable columns of the dose history; newest first by default.
pub const DOSE_SORT: SortSpec<DoseSortField> = SortSpec {
    columns: &[
        BY_DATE,
        SortColumn {
            key: "vaccine",
            field: DoseSortField::Vaccine,
            default_direction: SortDirection::Asc,
        },
        SortColumn {
            key: "dose",
            field: DoseSortField::DoseNumber,
            default_direction: SortDirection::Asc,
        },
    ],
    default_column: BY_DATE,
    default_direction: SortDirection::Desc,
};

/// A dose with the vaccine name for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoseDetails {
    /// The stored dose
    #[serde(flatten)]
    pub dose: dose::Model,
    /// Name of the vaccine
    pub vaccine_name: String,
}

/// The number the next dose of `vaccine_id` for `user_id` would get.
pub async fn next_dose_number<C>(db: &C, user_id: i64, vaccine_id: i64) -> Result<i32>
where
    C: ConnectionTrait,
{
    let current: Option<Option<i32>> = Dose::find()
        .select_only()
        .column_as(dose::Column::DoseNumber.max(), "max_dose")
        .filter(dose::Column::UserId.eq(user_id))
        .filter(dose::Column::VaccineId.eq(vaccine_id))
        .into_tuple()
        .one(db)
        .await?;
    Ok(current.flatten().unwrap_or(0) + 1)
}

/// Records a dose for `user_id`.
///
/// An explicit `dose_number` that is already taken is [`Error::DuplicateDose`].
/// A computed number that loses a race is retried up to [`DOSE_NUMBER_ATTEMPTS`]
/// times before [`Error::DoseNumberContention`].
#[instrument(skip(db, new), fields(vaccine_id = new.vaccine_id))]
pub async fn create_dose(db: &DatabaseConnection, user_id: i64, new: NewDose) -> Result<dose::Model> {
    if new.dose_number.is_some_and(|number| number < 1) {
        return Err(Error::validation("dose_number", "must be at least 1"));
    }

    let pending = &new;
    let created = retry_number_clash(pending, move || try_create_dose(db, user_id, pending)).await?;
    info!(dose_id = created.id, dose_number = created.dose_number, "Dose recorded");
    Ok(created)
}

/// Runs `attempt` again while it loses the race for a computed dose number, at most
/// [`DOSE_NUMBER_ATTEMPTS`] times in total.
///
/// A clash on the appointment or on an explicit number is final.
async fn retry_number_clash<F, Fut>(new: &NewDose, mut attempt: F) -> Result<dose::Model>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<dose::Model>>,
{
    let mut tries = 0;
    loop {
        tries += 1;
        match attempt().await {
            Err(Error::Database(err)) if is_unique_violation(&err) => {
                if linker::is_appointment_clash(&err) {
                    return Err(Error::AppointmentAlreadyLinked {
                        appointment_id: new.appointment_id.unwrap_or_default(),
                    });
                }
                if let Some(dose_number) = new.dose_number {
                    return Err(Error::DuplicateDose {
                        vaccine_id: new.vaccine_id,
                        dose_number,
                    });
                }
                if tries >= DOSE_NUMBER_ATTEMPTS {
                    warn!(attempts = tries, "Giving up on dose number allocation");
                    return Err(Error::DoseNumberContention { attempts: tries });
                }
                debug!(attempt = tries, "Dose number taken concurrently, retrying");
            }
            other => return other,
        }
    }
}

async fn try_create_dose(db: &DatabaseConnection, user_id: i64, new: &NewDose) -> Result<dose::Model> {
    let txn = db.begin().await?;
    user::require_user(&txn, user_id).await?;
    vaccine::get_vaccine(&txn, new.vaccine_id)
        .await?
        .ok_or_else(|| Error::not_found("vaccine", new.vaccine_id))?;

    if let Some(appointment_id) = new.appointment_id {
        linker::ensure_linkable(&txn, user_id, appointment_id, None).await?;
    }

    let dose_number = match new.dose_number {
        Some(number) => {
            let taken = Dose::find()
                .filter(dose::Column::UserId.eq(user_id))
                .filter(dose::Column::VaccineId.eq(new.vaccine_id))
                .filter(dose::Column::DoseNumber.eq(number))
                .one(&txn)
                .await?;
            if taken.is_some() {
                return Err(Error::DuplicateDose {
                    vaccine_id: new.vaccine_id,
                    dose_number: number,
                });
            }
            number
        }
        None => next_dose_number(&txn, user_id, new.vaccine_id).await?,
    };

    let created = dose::ActiveModel {
        vaccine_id: Set(new.vaccine_id),
        user_id: Set(user_id),
        appointment_id: Set(new.appointment_id),
        date_administered: Set(new.date_administered),
        dose_number: Set(dose_number),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;
    Ok(created)
}

/// Fetches a dose only if `user_id` owns it.
pub async fn get_dose_for_user<C>(db: &C, user_id: i64, dose_id: i64) -> Result<Option<dose::Model>>
where
    C: ConnectionTrait,
{
    Dose::find_by_id(dose_id)
        .filter(dose::Column::UserId.eq(user_id))
        .one(db)
        .await
        .map_err(Into::into)
}

fn into_details(rows: Vec<(dose::Model, Option<vaccine_entity::Model>)>) -> Vec<DoseDetails> {
    rows.into_iter()
        .map(|(dose, vaccine)| DoseDetails {
            dose,
            vaccine_name: vaccine.map(|v| v.name).unwrap_or_default(),
        })
        .collect()
}

/// The user's dose history in the requested order.
#[instrument(skip(db, sort), fields(sort = sort.sort))]
pub async fn list_doses(
    db: &DatabaseConnection,
    user_id: i64,
    sort: &SortState<DoseSortField>,
) -> Result<Vec<DoseDetails>> {
    let order = sort.direction.order();
    let query = Dose::find()
        .find_also_related(Vaccine)
        .filter(dose::Column::UserId.eq(user_id));
    let query = match sort.field {
        DoseSortField::Date => query.order_by(dose::Column::DateAdministered, order),
        DoseSortField::Vaccine => query
            .order_by(vaccine_entity::Column::Name, order.clone())
            .order_by(dose::Column::DoseNumber, order),
        DoseSortField::DoseNumber => query.order_by(dose::Column::DoseNumber, order),
    };
    let rows = query.order_by_asc(dose::Column::Id).all(db).await?;
    Ok(into_details(rows))
}

/// The user's most recently administered doses.
pub async fn recent_doses(
    db: &DatabaseConnection,
    user_id: i64,
    limit: u64,
) -> Result<Vec<DoseDetails>> {
    let rows = Dose::find()
        .find_also_related(Vaccine)
        .filter(dose::Column::UserId.eq(user_id))
        .order_by_desc(dose::Column::DateAdministered)
        .order_by_desc(dose::Column::Id)
        .limit(limit)
        .all(db)
        .await?;
    Ok(into_details(rows))
}

/// Deletes one of the user's doses.
#[instrument(skip(db))]
pub async fn delete_dose(db: &DatabaseConnection, user_id: i64, dose_id: i64) -> Result<()> {
    let existing = get_dose_for_user(db, user_id, dose_id)
        .await?
        .ok_or_else(|| Error::not_found("dose", dose_id))?;
    existing.delete(db).await?;
    info!("Dose deleted");
    Ok(())
}
