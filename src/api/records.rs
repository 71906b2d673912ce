//! Per-user records: accounts and appointments.

use super::{AppState, identity::CurrentUser, now};
use crate::{
    core::{
        appointment::{self as appointments, AppointmentDetails, AppointmentPartition, AppointmentUpdate, NewAppointment},
        user::{self as users, NewUser},
    },
    entities::{AppointmentModel, UserModel},
    errors::{Error, Result},
};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};

/// Registers a user.
pub async fn create_user(
    State(state): State<AppState>,
    payload: std::result::Result<Json<NewUser>, JsonRejection>,
) -> Result<(StatusCode, Json<UserModel>)> {
    let Json(new) = payload?;
    let created = users::create_user(&state.db, new).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// A user can only read their own account.
pub async fn get_user(
    State(state): State<AppState>,
    CurrentUser(requester): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<UserModel>> {
    if requester != id {
        return Err(Error::not_found("user", id));
    }
    users::get_user(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found("user", id))
}

/// Deletes the requester's own account along with all their records.
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(requester): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    if requester != id {
        return Err(Error::not_found("user", id));
    }
    users::delete_user(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The requester's appointments, upcoming and past.
pub async fn list_appointments(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<AppointmentPartition<AppointmentDetails>>> {
    Ok(Json(
        appointments::appointments_for_user(&state.db, user_id, now()).await?,
    ))
}

/// Books an appointment for the requester.
pub async fn create_appointment(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    payload: std::result::Result<Json<NewAppointment>, JsonRejection>,
) -> Result<(StatusCode, Json<AppointmentModel>)> {
    let Json(new) = payload?;
    let created = appointments::create_appointment(&state.db, user_id, new).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Edits one of the requester's appointments.
pub async fn update_appointment(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
    payload: std::result::Result<Json<AppointmentUpdate>, JsonRejection>,
) -> Result<Json<AppointmentModel>> {
    let Json(update) = payload?;
    Ok(Json(
        appointments::update_appointment(&state.db, user_id, id, update).await?,
    ))
}

/// Cancels one of the requester's appointments.
pub async fn delete_appointment(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    appointments::delete_appointment(&state.db, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
