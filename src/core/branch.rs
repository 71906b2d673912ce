//! Branch business logic - clinic locations, their listing and live status.
//!
//! Opening hours are validated here on the way in; evaluating them is left to
//! [`crate::core::schedule`], which never fails on stored data.

use crate::{
    core::{
        schedule::{self, BranchStatus, HoursLine},
        sorting::{SortColumn, SortDirection, SortSpec, SortState},
    },
    entities::{Appointment, Branch, ScheduleBlock, appointment, branch},
    errors::{Error, Result},
};
use chrono::NaiveDateTime;
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Fields a branch list can be ordered by.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BranchSortField {
    /// Branch name
    Name,
    /// Postal code
    Postcode,
    /// Contact email
    Email,
    /// Creation order
    Created,
}

const BY_NAME: SortColumn<BranchSortField> = SortColumn {
    key: "name",
    field: BranchSortField::Name,
    default_direction: SortDirection::Asc,
};

/// Sortable columns of the branch list; name ascending by default.
pub const BRANCH_SORT: SortSpec<BranchSortField> = SortSpec {
    columns: &[
        BY_NAME,
        SortColumn {
            key: "postcode",
            field: BranchSortField::Postcode,
            default_direction: SortDirection::Asc,
        },
        SortColumn {
            key: "email",
            field: BranchSortField::Email,
            default_direction: SortDirection::Asc,
        },
        SortColumn {
            key: "created",
            field: BranchSortField::Created,
            default_direction: SortDirection::Asc,
        },
    ],
    default_column: BY_NAME,
    default_direction: SortDirection::Asc,
};

impl BranchSortField {
    const fn column(self) -> branch::Column {
        match self {
            Self::Name => branch::Column::Name,
            Self::Postcode => branch::Column::Postcode,
            Self::Email => branch::Column::Email,
            Self::Created => branch::Column::Id,
        }
    }
}

/// Input for [`create_branch`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewBranch {
    /// Display name
    pub name: String,
    /// Street address
    pub address: String,
    /// Postal code
    pub postcode: String,
    /// Phone number
    pub phone: String,
    /// Contact email
    pub email: String,
    /// Weekly schedule
    #[serde(default)]
    pub opening_hours: Vec<ScheduleBlock>,
    /// Picture path or URL
    #[serde(default)]
    pub image_url: Option<String>,
}

/// A branch together with its status at request time.
#[derive(Clone, Debug, Serialize)]
pub struct BranchWithStatus {
    /// The branch row
    #[serde(flatten)]
    pub branch: branch::Model,
    /// Live status badge
    pub status: BranchStatus,
}

/// Branch detail view: status, the hours table and the address split into lines.
#[derive(Clone, Debug, Serialize)]
pub struct BranchDetail {
    /// The branch row
    #[serde(flatten)]
    pub branch: branch::Model,
    /// Live status badge
    pub status: BranchStatus,
    /// `"Open until HH:MM"` for today, if open today at all
    pub open_until: Option<String>,
    /// Rows of the opening-hours table
    pub hours: Vec<HoursLine>,
    /// Address split on `", "`
    pub address_lines: Vec<String>,
}

/// Checks a branch before it is written.
pub fn validate_branch(new: &NewBranch) -> Result<()> {
    if new.name.trim().is_empty() {
        return Err(Error::validation("name", "cannot be empty"));
    }
    let email = new.email.trim();
    if !email.is_empty() && !email.contains('@') {
        return Err(Error::validation("email", "is not an email address"));
    }
    schedule::validate_opening_hours(&new.opening_hours)
}

/// Copies the validated fields of `new` onto an active model.
pub(crate) fn apply_fields(model: &mut branch::ActiveModel, new: &NewBranch) {
    model.name = Set(new.name.trim().to_string());
    model.address = Set(new.address.trim().to_string());
    model.postcode = Set(new.postcode.trim().to_string());
    model.phone = Set(new.phone.trim().to_string());
    model.email = Set(new.email.trim().to_string());
    model.opening_hours = Set(new.opening_hours.clone().into());
    model.image_url = Set(new.image_url.clone());
}

/// Creates a branch; malformed opening hours are rejected with [`Error::InvalidSchedule`].
#[instrument(skip(db, new), fields(name = %new.name))]
pub async fn create_branch(db: &DatabaseConnection, new: NewBranch) -> Result<branch::Model> {
    validate_branch(&new)?;
    let mut model = branch::ActiveModel {
        ..Default::default()
    };
    apply_fields(&mut model, &new);
    let created = model.insert(db).await?;
    info!(branch_id = created.id, "Branch created");
    Ok(created)
}

/// Finds a branch by id.
pub async fn get_branch<C>(db: &C, branch_id: i64) -> Result<Option<branch::Model>>
where
    C: ConnectionTrait,
{
    Branch::find_by_id(branch_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a branch by its exact (trimmed) name.
pub async fn get_branch_by_name<C>(db: &C, name: &str) -> Result<Option<branch::Model>>
where
    C: ConnectionTrait,
{
    Branch::find()
        .filter(branch::Column::Name.eq(name.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// All branches in the requested order.
pub async fn list_branches(
    db: &DatabaseConnection,
    sort: &SortState<BranchSortField>,
) -> Result<Vec<branch::Model>> {
    Branch::find()
        .order_by(sort.field.column(), sort.direction.order())
        .order_by_asc(branch::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Pairs each branch with its status at `now`.
#[must_use]
pub fn with_status(branches: Vec<branch::Model>, now: NaiveDateTime) -> Vec<BranchWithStatus> {
    branches
        .into_iter()
        .map(|branch| {
            let status = schedule::branch_status(&branch.opening_hours, now);
            BranchWithStatus { branch, status }
        })
        .collect()
}

/// Builds the detail view of a branch at `now`.
#[must_use]
pub fn detail(branch: branch::Model, now: NaiveDateTime) -> BranchDetail {
    let blocks = &branch.opening_hours;
    BranchDetail {
        status: schedule::branch_status(blocks, now),
        open_until: schedule::open_until_display(blocks, now),
        hours: schedule::hours_display(blocks, now),
        address_lines: address_lines(&branch.address),
        branch,
    }
}

/// Splits a comma separated address into display lines.
#[must_use]
pub fn address_lines(address: &str) -> Vec<String> {
    address
        .split(", ")
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Deletes a branch that has no appointments.
#[instrument(skip(db))]
pub async fn delete_branch(db: &DatabaseConnection, branch_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let branch = Branch::find_by_id(branch_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("branch", branch_id))?;

    let appointments = Appointment::find()
        .filter(appointment::Column::BranchId.eq(branch_id))
        .count(&txn)
        .await?;
    if appointments > 0 {
        return Err(Error::ReferenceInUse {
            entity: "branch",
            id: branch_id,
            count: appointments,
        });
    }

    branch.delete(&txn).await?;
    txn.commit().await?;
    info!("Branch deleted");
    Ok(())
}
