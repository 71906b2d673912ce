//! Upserting reference data (vaccines and branches) from a [`SeedConfig`].
//!
//! Records are matched by name. Existing rows are overwritten with the seed's
//! values, new names are inserted, and nothing is ever deleted.

use crate::{
    config::seed::{BranchSeed, SeedConfig, VaccineSeed},
    core::{
        branch::{self, NewBranch},
        vaccine::{self, NewVaccine},
    },
    entities::{Branch, Vaccine, branch as branch_entity, vaccine as vaccine_entity},
    errors::Result,
};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, TransactionTrait};
use serde::Serialize;
use tracing::{info, instrument};

/// What a seeding run changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    /// Vaccines inserted
    pub vaccines_created: usize,
    /// Vaccines overwritten
    pub vaccines_updated: usize,
    /// Branches inserted
    pub branches_created: usize,
    /// Branches overwritten
    pub branches_updated: usize,
}

impl From<&VaccineSeed> for NewVaccine {
    fn from(seed: &VaccineSeed) -> Self {
        Self {
            name: seed.name.clone(),
            primary_series_doses: seed.primary_series_doses,
            recurrence_interval_years: seed.recurrence_interval_years,
            booster_interval_years: seed.booster_interval_years,
            price_per_dose: seed.price_per_dose,
            side_effects: seed.side_effects.clone(),
            administration_route: seed.administration_route.clone(),
            manufacturer: seed.manufacturer.clone(),
            age_min: seed.age_min,
            age_max: seed.age_max,
            contraindications: seed.contraindications.clone(),
            notes: seed.notes.clone(),
        }
    }
}

impl From<&BranchSeed> for NewBranch {
    fn from(seed: &BranchSeed) -> Self {
        Self {
            name: seed.name.clone(),
            address: seed.address.clone(),
            postcode: seed.postcode.clone(),
            phone: seed.phone.clone(),
            email: seed.email.clone(),
            opening_hours: seed.opening_hours.clone(),
            image_url: seed.image_url.clone(),
        }
    }
}

/// Upserts every vaccine and branch in `config` in a single transaction.
///
/// The whole file is validated first, so a bad entry leaves the database untouched.
#[instrument(skip_all)]
pub async fn seed_reference_data(db: &DatabaseConnection, config: &SeedConfig) -> Result<SeedSummary> {
    let vaccines: Vec<NewVaccine> = config.vaccines.iter().map(NewVaccine::from).collect();
    let branches: Vec<NewBranch> = config.branches.iter().map(NewBranch::from).collect();
    for new in &vaccines {
        vaccine::validate_vaccine(new)?;
    }
    for new in &branches {
        branch::validate_branch(new)?;
    }

    let mut summary = SeedSummary::default();
    let txn = db.begin().await?;

    for new in &vaccines {
        match vaccine::get_vaccine_by_name(&txn, new.name.trim()).await? {
            Some(existing) => {
                let mut model: vaccine_entity::ActiveModel = existing.into();
                vaccine::apply_fields(&mut model, new);
                model.update(&txn).await?;
                summary.vaccines_updated += 1;
            }
            None => {
                let mut model = vaccine_entity::ActiveModel {
                    ..Default::default()
                };
                vaccine::apply_fields(&mut model, new);
                model.insert(&txn).await?;
                summary.vaccines_created += 1;
            }
        }
    }

    for new in &branches {
        match branch::get_branch_by_name(&txn, new.name.trim()).await? {
            Some(existing) => {
                let mut model: branch_entity::ActiveModel = existing.into();
                branch::apply_fields(&mut model, new);
                model.update(&txn).await?;
                summary.branches_updated += 1;
            }
            None => {
                let mut model = branch_entity::ActiveModel {
                    ..Default::default()
                };
                branch::apply_fields(&mut model, new);
                model.insert(&txn).await?;
                summary.branches_created += 1;
            }
        }
    }

    txn.commit().await?;
    info!(
        vaccines_created = summary.vaccines_created,
        vaccines_updated = summary.vaccines_updated,
        branches_created = summary.branches_created,
        branches_updated = summary.branches_updated,
        "Reference data seeded"
    );
    Ok(summary)
}

/// Seeds only when the vaccine or the branch table is still empty.
///
/// Returns `None` when both already hold data.
pub async fn seed_if_empty(db: &DatabaseConnection, config: &SeedConfig) -> Result<Option<SeedSummary>> {
    let vaccines = Vaccine::find().count(db).await?;
    let branches = Branch::find().count(db).await?;
    if vaccines > 0 && branches > 0 {
        info!(vaccines, branches, "Reference data present, skipping seed");
        return Ok(None);
    }
    seed_reference_data(db, config).await.map(Some)
}
