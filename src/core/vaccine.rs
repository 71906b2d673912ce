//! Vaccine business logic - creating, listing and deleting vaccines.
//!
//! Vaccines are reference data: mostly seeded, occasionally added by an
//! administrator. Names are unique and every numeric field is range checked
//! before anything reaches the database.

use crate::{
    core::is_unique_violation,
    entities::{Appointment, Dose, Vaccine, appointment, dose, vaccine},
    errors::{Error, Result},
};
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Deserialize;
use tracing::{info, instrument};

/// Route used when none is given: intramuscular.
pub const DEFAULT_ADMINISTRATION_ROUTE: &str = "IM";

/// Input for [`create_vaccine`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewVaccine {
    /// Unique name
    pub name: String,
    /// Doses in the primary series
    #[serde(default)]
    pub primary_series_doses: Option<i32>,
    /// Years between routine repeats
    #[serde(default)]
    pub recurrence_interval_years: Option<f64>,
    /// Years between boosters
    #[serde(default)]
    pub booster_interval_years: Option<f64>,
    /// Price per dose
    pub price_per_dose: f64,
    /// Side effects
    #[serde(default)]
    pub side_effects: Vec<String>,
    /// Route code; `IM` when absent
    #[serde(default)]
    pub administration_route: Option<String>,
    /// Manufacturer
    #[serde(default)]
    pub manufacturer: String,
    /// Minimum age in years
    #[serde(default)]
    pub age_min: Option<f64>,
    /// Maximum age in years
    #[serde(default)]
    pub age_max: Option<f64>,
    /// Contraindications
    #[serde(default)]
    pub contraindications: Vec<String>,
    /// Notes
    #[serde(default)]
    pub notes: String,
}

impl NewVaccine {
    /// A vaccine with only a name and a price.
    #[must_use]
    pub fn named(name: &str, price_per_dose: f64) -> Self {
        Self {
            name: name.to_string(),
            price_per_dose,
            ..Self::default()
        }
    }
}

fn positive_interval(field: &'static str, value: Option<f64>) -> Result<()> {
    match value {
        Some(years) if !(years.is_finite() && years > 0.0) => {
            Err(Error::validation(field, "must be a positive number of years"))
        }
        _ => Ok(()),
    }
}

fn non_negative_age(field: &'static str, value: Option<f64>) -> Result<()> {
    match value {
        Some(age) if !(age.is_finite() && age >= 0.0) => {
            Err(Error::validation(field, "must be zero or more years"))
        }
        _ => Ok(()),
    }
}

/// Checks every field of a vaccine before it is written.
pub fn validate_vaccine(new: &NewVaccine) -> Result<()> {
    if new.name.trim().is_empty() {
        return Err(Error::validation("name", "cannot be empty"));
    }
    if !new.price_per_dose.is_finite() || new.price_per_dose < 0.0 {
        return Err(Error::validation("price_per_dose", "must be zero or more"));
    }
    if matches!(new.primary_series_doses, Some(doses) if doses <= 0) {
        return Err(Error::validation("primary_series_doses", "must be positive"));
    }
    positive_interval("recurrence_interval_years", new.recurrence_interval_years)?;
    positive_interval("booster_interval_years", new.booster_interval_years)?;
    non_negative_age("age_min", new.age_min)?;
    non_negative_age("age_max", new.age_max)?;
    if matches!((new.age_min, new.age_max), (Some(min), Some(max)) if min > max) {
        return Err(Error::validation("age_max", "must not be below age_min"));
    }
    if new
        .administration_route
        .as_deref()
        .is_some_and(|route| route.trim().is_empty() || route.trim().len() > 10)
    {
        return Err(Error::validation(
            "administration_route",
            "must be a short route code",
        ));
    }
    Ok(())
}

/// Copies the validated fields of `new` onto an active model.
pub(crate) fn apply_fields(model: &mut vaccine::ActiveModel, new: &NewVaccine) {
    model.name = Set(new.name.trim().to_string());
    model.primary_series_doses = Set(new.primary_series_doses);
    model.recurrence_interval_years = Set(new.recurrence_interval_years);
    model.booster_interval_years = Set(new.booster_interval_years);
    model.price_per_dose = Set(new.price_per_dose);
    model.side_effects = Set(new.side_effects.clone().into());
    model.administration_route = Set(new
        .administration_route
        .as_deref()
        .map_or(DEFAULT_ADMINISTRATION_ROUTE, str::trim)
        .to_string());
    model.manufacturer = Set(new.manufacturer.clone());
    model.age_min = Set(new.age_min);
    model.age_max = Set(new.age_max);
    model.contraindications = Set(new.contraindications.clone().into());
    model.notes = Set(new.notes.clone());
}

/// Finds a vaccine by its exact (trimmed) name.
pub async fn get_vaccine_by_name<C>(db: &C, name: &str) -> Result<Option<vaccine::Model>>
where
    C: ConnectionTrait,
{
    Vaccine::find()
        .filter(vaccine::Column::Name.eq(name.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a vaccine after validation; names must be unique.
#[instrument(skip(db, new), fields(name = %new.name))]
pub async fn create_vaccine(db: &DatabaseConnection, new: NewVaccine) -> Result<vaccine::Model> {
    validate_vaccine(&new)?;

    let name = new.name.trim().to_string();
    if get_vaccine_by_name(db, &name).await?.is_some() {
        return Err(Error::DuplicateVaccine { name });
    }

    let mut model = vaccine::ActiveModel {
        ..Default::default()
    };
    apply_fields(&mut model, &new);
    let created = model.insert(db).await.map_err(|e| {
        if is_unique_violation(&e) {
            Error::DuplicateVaccine { name: name.clone() }
        } else {
            e.into()
        }
    })?;
    info!(vaccine_id = created.id, "Vaccine created");
    Ok(created)
}

/// Finds a vaccine by id.
pub async fn get_vaccine<C>(db: &C, vaccine_id: i64) -> Result<Option<vaccine::Model>>
where
    C: ConnectionTrait,
{
    Vaccine::find_by_id(vaccine_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// All vaccines, alphabetically.
pub async fn list_vaccines(db: &DatabaseConnection) -> Result<Vec<vaccine::Model>> {
    Vaccine::find()
        .order_by_asc(vaccine::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes a vaccine nobody has booked or received.
///
/// Vaccines with appointments or doses are kept so that medical history stays
/// intact; the call fails with [`Error::ReferenceInUse`].
#[instrument(skip(db))]
pub async fn delete_vaccine(db: &DatabaseConnection, vaccine_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let vaccine = Vaccine::find_by_id(vaccine_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("vaccine", vaccine_id))?;

    let appointments = Appointment::find()
        .filter(appointment::Column::VaccineId.eq(vaccine_id))
        .count(&txn)
        .await?;
    let doses = Dose::find()
        .filter(dose::Column::VaccineId.eq(vaccine_id))
        .count(&txn)
        .await?;
    if appointments + doses > 0 {
        return Err(Error::ReferenceInUse {
            entity: "vaccine",
            id: vaccine_id,
            count: appointments + doses,
        });
    }

    vaccine.delete(&txn).await?;
    txn.commit().await?;
    info!("Vaccine deleted");
    Ok(())
}
