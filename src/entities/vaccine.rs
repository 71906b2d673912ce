//! Vaccine entity - Reference data describing each vaccine offered.
//!
//! Vaccines are seeded from `seed.toml` and rarely change afterwards.
//! List-valued fields are stored as JSON arrays of strings.

use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Ordered list of short strings kept in a JSON column.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct StringList(pub Vec<String>);

impl From<Vec<String>> for StringList {
    fn from(items: Vec<String>) -> Self {
        Self(items)
    }
}

impl std::ops::Deref for StringList {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Vaccine database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vaccines")]
pub struct Model {
    /// Unique identifier for the vaccine
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name, unique across vaccines
    #[sea_orm(unique)]
    pub name: String,
    /// Doses in the initial series (e.g. 3 for Hepatitis B), None if single-dose or purely recurring
    pub primary_series_doses: Option<i32>,
    /// Years between routine repeats (e.g. 1.0 for influenza)
    pub recurrence_interval_years: Option<f64>,
    /// Years between boosters after the primary series
    pub booster_interval_years: Option<f64>,
    /// Price per dose in the local currency
    pub price_per_dose: f64,
    /// Common side effects
    #[sea_orm(column_type = "Json")]
    pub side_effects: StringList,
    /// Short route code: `IM`, `SC`, `Oral`, `IN`, ...
    pub administration_route: String,
    /// Manufacturer, empty when unknown
    pub manufacturer: String,
    /// Minimum age in years
    pub age_min: Option<f64>,
    /// Maximum age in years
    pub age_max: Option<f64>,
    /// Conditions under which the vaccine must not be given
    #[sea_orm(column_type = "Json")]
    pub contraindications: StringList,
    /// Free-text notes
    pub notes: String,
}

/// Defines relationships between Vaccine and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One vaccine has many appointments
    #[sea_orm(has_many = "super::appointment::Entity")]
    Appointments,
    /// One vaccine has many recorded doses
    #[sea_orm(has_many = "super::dose::Entity")]
    Doses,
}

impl Related<super::appointment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Appointments.def()
    }
}

impl Related<super::dose::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Doses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
