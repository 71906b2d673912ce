//! Branch entity - Clinic locations and their weekly opening hours.
//!
//! Opening hours are an ordered list of schedule blocks such as
//! `{"days": "Mon-Fri", "open": "09:00", "close": "17:00"}`. The evaluation rules
//! live in [`crate::core::schedule`].

use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One `{days, open, close}` entry of a branch's weekly hours.
///
/// Missing keys deserialize as empty strings so that rows written before
/// validation existed still load; the evaluator treats such blocks as non-matching.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleBlock {
    /// Day spec: `Mon`, `Mon-Fri`, `Fri-Mon`, `Mon,Wed,Fri`, ...
    #[serde(default)]
    pub days: String,
    /// Opening time, `HH:MM`
    #[serde(default)]
    pub open: String,
    /// Closing time, `HH:MM`; at or before `open` means the next day
    #[serde(default)]
    pub close: String,
}

impl ScheduleBlock {
    /// Builds a block from borrowed parts.
    #[must_use]
    pub fn new(days: &str, open: &str, close: &str) -> Self {
        Self {
            days: days.to_string(),
            open: open.to_string(),
            close: close.to_string(),
        }
    }
}

/// The full weekly schedule, stored as a JSON array.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct OpeningHours(pub Vec<ScheduleBlock>);

impl From<Vec<ScheduleBlock>> for OpeningHours {
    fn from(blocks: Vec<ScheduleBlock>) -> Self {
        Self(blocks)
    }
}

impl std::ops::Deref for OpeningHours {
    type Target = [ScheduleBlock];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Branch database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "branches")]
pub struct Model {
    /// Unique identifier for the branch
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// Street address, comma separated
    pub address: String,
    /// Postal code
    pub postcode: String,
    /// Contact phone number
    pub phone: String,
    /// Contact email
    pub email: String,
    /// Weekly schedule blocks
    #[sea_orm(column_type = "Json")]
    pub opening_hours: OpeningHours,
    /// Optional picture of the branch
    pub image_url: Option<String>,
}

/// Defines relationships between Branch and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One branch hosts many appointments
    #[sea_orm(has_many = "super::appointment::Entity")]
    Appointments,
}

impl Related<super::appointment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Appointments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
