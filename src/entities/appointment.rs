//! Appointment entity - A booking for one vaccine at one branch.
//!
//! Appointments may lie in the past; those are what doses get linked to.
//! There is no stored status: upcoming/past is derived per request.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Appointment database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "appointments")]
pub struct Model {
    /// Unique identifier for the appointment
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner of the appointment
    pub user_id: i64,
    /// Vaccine to be administered
    pub vaccine_id: i64,
    /// Branch where it takes place
    pub branch_id: i64,
    /// Scheduled local date and time
    pub datetime: DateTime,
    /// Free-text notes
    pub notes: String,
    /// When the booking was made; never updated
    pub created_at: DateTime,
}

/// Defines relationships between Appointment and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each appointment belongs to one user; removed with the user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    /// Each appointment is for one vaccine; the vaccine cannot be deleted while booked
    #[sea_orm(
        belongs_to = "super::vaccine::Entity",
        from = "Column::VaccineId",
        to = "super::vaccine::Column::Id",
        on_delete = "Restrict"
    )]
    Vaccine,
    /// Each appointment is at one branch; the branch cannot be deleted while booked
    #[sea_orm(
        belongs_to = "super::branch::Entity",
        from = "Column::BranchId",
        to = "super::branch::Column::Id",
        on_delete = "Restrict"
    )]
    Branch,
    /// At most one dose references an appointment
    #[sea_orm(has_many = "super::dose::Entity")]
    Doses,
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

impl Related<super::branch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Branch.def()
    }
}

impl Related<super::dose::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Doses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
