//! Public reference data: vaccines, branches and their live schedule.

use super::{AppState, now};
use crate::{
    core::{
        branch::{self as branches, BRANCH_SORT, BranchDetail, NewBranch},
        schedule::{self, BranchStatus, DEFAULT_SLOT_INTERVAL_MINUTES},
        sorting::SortState,
        vaccine::{self as vaccines, NewVaccine},
    },
    entities::{BranchModel, ScheduleBlock, VaccineModel},
    errors::{Error, Result},
};
use axum::{
    Json,
    extract::{Path, Query, State, rejection::{JsonRejection, QueryRejection}},
    http::StatusCode,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// `?sort=&dir=` parameters of sortable lists.
#[derive(Debug, Default, Deserialize)]
pub struct SortQuery {
    /// Column key
    pub sort: Option<String>,
    /// `asc` or `desc`
    pub dir: Option<String>,
}

pub(crate) fn sort_query(query: std::result::Result<Query<SortQuery>, QueryRejection>) -> SortQuery {
    // Garbage in the sort parameters falls back to the defaults instead of failing.
    query.map(|Query(q)| q).unwrap_or_default()
}

async fn require_branch(state: &AppState, id: i64) -> Result<BranchModel> {
    branches::get_branch(&state.db, id)
        .await?
        .ok_or_else(|| Error::not_found("branch", id))
}

/// All vaccines by name.
pub async fn list_vaccines(State(state): State<AppState>) -> Result<Json<Vec<VaccineModel>>> {
    Ok(Json(vaccines::list_vaccines(&state.db).await?))
}

/// One vaccine.
pub async fn get_vaccine(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<VaccineModel>> {
    vaccines::get_vaccine(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found("vaccine", id))
}

/// Adds a vaccine.
pub async fn create_vaccine(
    State(state): State<AppState>,
    payload: std::result::Result<Json<NewVaccine>, JsonRejection>,
) -> Result<(StatusCode, Json<VaccineModel>)> {
    let Json(new) = payload?;
    let created = vaccines::create_vaccine(&state.db, new).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Removes a vaccine nobody has booked or received.
pub async fn delete_vaccine(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode> {
    vaccines::delete_vaccine(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Branch list with live status and the column toggle links.
#[derive(Debug, Serialize)]
pub struct BranchList {
    /// Branches in the requested order
    pub branches: Vec<branches::BranchWithStatus>,
    /// Resolved ordering
    pub sort: SortState<branches::BranchSortField>,
}

/// Branches with their live status.
pub async fn list_branches(
    State(state): State<AppState>,
    query: std::result::Result<Query<SortQuery>, QueryRejection>,
) -> Result<Json<BranchList>> {
    let query = sort_query(query);
    let sort = BRANCH_SORT.resolve(query.sort.as_deref(), query.dir.as_deref());
    let rows = branches::list_branches(&state.db, &sort).await?;
    Ok(Json(BranchList {
        branches: branches::with_status(rows, now()),
        sort,
    }))
}

/// Adds a branch.
pub async fn create_branch(
    State(state): State<AppState>,
    payload: std::result::Result<Json<NewBranch>, JsonRejection>,
) -> Result<(StatusCode, Json<BranchModel>)> {
    let Json(new) = payload?;
    let created = branches::create_branch(&state.db, new).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Branch detail view.
pub async fn get_branch(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<BranchDetail>> {
    let branch = require_branch(&state, id).await?;
    Ok(Json(branches::detail(branch, now())))
}

/// Removes a branch with no appointments.
pub async fn delete_branch(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode> {
    branches::delete_branch(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Live status badge of one branch.
pub async fn branch_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<BranchStatus>> {
    let branch = require_branch(&state, id).await?;
    Ok(Json(schedule::branch_status(&branch.opening_hours, now())))
}

/// Raw weekly schedule of a branch.
#[derive(Debug, Serialize)]
pub struct BranchHours {
    /// Blocks as stored
    pub opening_hours: Vec<ScheduleBlock>,
}

/// Stored opening hours of one branch.
pub async fn branch_hours(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<BranchHours>> {
    let branch = require_branch(&state, id).await?;
    Ok(Json(BranchHours {
        opening_hours: branch.opening_hours.0,
    }))
}

/// `?date=YYYY-MM-DD`; today when absent.
#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    /// Day to list slots for
    pub date: Option<NaiveDate>,
}

/// Bookable times of one branch on one day.
#[derive(Debug, Serialize)]
pub struct BranchSlots {
    /// The day
    pub date: NaiveDate,
    /// `HH:MM` times, ascending
    pub slots: Vec<String>,
}

/// Bookable times on `?date`.
pub async fn branch_slots(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    query: std::result::Result<Query<SlotsQuery>, QueryRejection>,
) -> Result<Json<BranchSlots>> {
    let Query(query) = query?;
    let branch = require_branch(&state, id).await?;
    let now = now();
    let date = query.date.unwrap_or_else(|| now.date());
    let slots = schedule::booking_slots(
        &branch.opening_hours,
        date,
        DEFAULT_SLOT_INTERVAL_MINUTES,
        now,
    )
    .into_iter()
    .map(|slot| slot.format("%H:%M").to_string())
    .collect();
    Ok(Json(BranchSlots { date, slots }))
}
