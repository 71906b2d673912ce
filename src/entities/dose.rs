//! Dose entity - An administered dose of a vaccine.
//!
//! `(vaccine_id, user_id, dose_number)` is unique, and so is `appointment_id`
//! when set; both indexes are created in [`crate::config::database::create_tables`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Dose database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "doses")]
pub struct Model {
    /// Unique identifier for the dose
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Vaccine that was administered
    pub vaccine_id: i64,
    /// Person who received it
    pub user_id: i64,
    /// Appointment this dose was given at, if linked
    pub appointment_id: Option<i64>,
    /// Date the dose was given
    pub date_administered: Date,
    /// Sequence number within the (user, vaccine) pair, starting at 1
    pub dose_number: i32,
}

/// Defines relationships between Dose and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each dose belongs to one user; removed with the user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    /// Each dose is of one vaccine
    #[sea_orm(
        belongs_to = "super::vaccine::Entity",
        from = "Column::VaccineId",
        to = "super::vaccine::Column::Id",
        on_delete = "Restrict"
    )]
    Vaccine,
    /// Optional link to the appointment; cleared when the appointment goes away
    #[sea_orm(
        belongs_to = "super::appointment::Entity",
        from = "Column::AppointmentId",
        to = "super::appointment::Column::Id",
        on_delete = "SetNull"
    )]
    Appointment,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::vaccine::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vaccine.def()
    }
}

impl Related<super::appointment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Appointment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
