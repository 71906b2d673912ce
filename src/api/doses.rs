//! Dose history, recording, and linking doses to past appointments.

use super::{AppState, identity::CurrentUser, now, reference::{SortQuery, sort_query}};
use crate::{
    core::{
        dose::{self as doses, DOSE_SORT, DoseDetails, DoseSortField, NewDose},
        linker::{self, LinkCandidate},
        sorting::SortState,
    },
    entities::DoseModel,
    errors::{Error, Result},
};
use axum::{
    Json,
    extract::{Path, Query, State, rejection::{JsonRejection, QueryRejection}},
    http::StatusCode,
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

const RECENT_DOSES_LIMIT: u64 = 5;

/// Dose history with the column toggle links.
#[derive(Debug, Serialize)]
pub struct DoseList {
    /// Doses in the requested order
    pub doses: Vec<DoseDetails>,
    /// Resolved ordering
    pub sort: SortState<DoseSortField>,
}

/// The requester's dose history.
pub async fn list_doses(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    query: std::result::Result<Query<SortQuery>, QueryRejection>,
) -> Result<Json<DoseList>> {
    let query = sort_query(query);
    let sort = DOSE_SORT.resolve(query.sort.as_deref(), query.dir.as_deref());
    let doses = doses::list_doses(&state.db, user_id, &sort).await?;
    Ok(Json(DoseList { doses, sort }))
}

/// The requester's latest doses, for dashboard summaries.
pub async fn recent_doses(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Vec<DoseDetails>>> {
    Ok(Json(
        doses::recent_doses(&state.db, user_id, RECENT_DOSES_LIMIT).await?,
    ))
}

/// Records a dose for the requester.
pub async fn create_dose(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    payload: std::result::Result<Json<NewDose>, JsonRejection>,
) -> Result<(StatusCode, Json<DoseModel>)> {
    let Json(new) = payload?;
    let created = doses::create_dose(&state.db, user_id, new).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Deletes one of the requester's doses.
pub async fn delete_dose(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    doses::delete_dose(&state.db, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Body of `POST /doses/link`.
#[derive(Debug, Default, Deserialize)]
pub struct LinkRequest {
    /// Dose to link
    pub dose_id: Option<i64>,
    /// Appointment it was given at
    pub appointment_id: Option<i64>,
}

/// Links a dose to an appointment; responds `{"success": true}`.
pub async fn link_dose(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    payload: std::result::Result<Json<LinkRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(request) = payload?;
    let dose_id = request
        .dose_id
        .ok_or_else(|| Error::validation("dose_id", "is required"))?;
    let appointment_id = request
        .appointment_id
        .ok_or_else(|| Error::validation("appointment_id", "is required"))?;
    linker::link(&state.db, dose_id, appointment_id, user_id).await?;
    Ok(Json(json!({ "success": true })))
}

/// `?dose_id=&vaccine_id=&dose_date=`, all optional.
#[derive(Debug, Default, Deserialize)]
pub struct CandidateQuery {
    /// Dose being linked; its own appointment stays listed
    pub dose_id: Option<i64>,
    /// Only appointments for this vaccine
    pub vaccine_id: Option<i64>,
    /// Only appointments on or before this day; now when absent
    pub dose_date: Option<NaiveDate>,
}

/// Candidate list wrapper.
#[derive(Debug, Serialize)]
pub struct CandidateList {
    /// Appointments the dose could be linked to, newest first
    pub appointments: Vec<LinkCandidate>,
}

/// Midnight at the end of `date`, so appointments later that same day still count.
fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.succ_opt()
        .map_or(NaiveDateTime::MAX, |next| next.and_time(NaiveTime::MIN))
}

/// Past appointments a dose could be linked to.
pub async fn link_candidates(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    query: std::result::Result<Query<CandidateQuery>, QueryRejection>,
) -> Result<Json<CandidateList>> {
    let Query(query) = query?;
    let before = query.dose_date.map_or_else(now, end_of_day);
    let appointments =
        linker::candidates(&state.db, user_id, query.dose_id, query.vaccine_id, before).await?;
    Ok(Json(CandidateList { appointments }))
}
