//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod appointment;
pub mod branch;
pub mod dose;
pub mod user;
pub mod vaccine;

// Re-export specific types to avoid conflicts
pub use appointment::{
    Column as AppointmentColumn, Entity as Appointment, Model as AppointmentModel,
};
pub use branch::{
    Column as BranchColumn, Entity as Branch, Model as BranchModel, OpeningHours, ScheduleBlock,
};
pub use dose::{Column as DoseColumn, Entity as Dose, Model as DoseModel};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
pub use vaccine::{Column as VaccineColumn, Entity as Vaccine, Model as VaccineModel, StringList};
