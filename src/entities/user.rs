//! User entity - People who book appointments and record doses.
//!
//! Only the profile fields the service needs are stored; credentials and
//! sessions belong to whatever authenticates requests in front of the API.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Login name, unique across users
    #[sea_orm(unique)]
    pub username: String,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Contact email, stored lower-cased and unique
    #[sea_orm(unique)]
    pub email: String,
    /// When the account was created
    pub date_joined: DateTime,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user has many appointments
    #[sea_orm(has_many = "super::appointment::Entity")]
    Appointments,
    /// One user has many recorded doses
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
