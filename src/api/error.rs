//! HTTP rendering of [`Error`]: a status code plus `{"error": "<message>"}`.

use crate::errors::Error;
use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

const RETRY_MESSAGE: &str = "Something went wrong on our side, please try again";

impl Error {
    /// Status code the error is reported with.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. }
            | Self::InvalidSchedule { .. }
            | Self::AppointmentAlreadyLinked { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::DuplicateVaccine { .. }
            | Self::DuplicateDose { .. }
            | Self::DuplicateUser { .. }
            | Self::ReferenceInUse { .. }
            | Self::DoseNumberContention { .. } => StatusCode::CONFLICT,
            Self::Config { .. } | Self::Database(_) | Self::Io(_) | Self::Toml(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = %self, "Request failed");
            RETRY_MESSAGE.to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation("body", rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation("query", rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::DbErr;

    #[test]
    fn test_status_mapping() {
        assert_eq!(Error::not_found("dose", 1).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            Error::AppointmentAlreadyLinked { appointment_id: 1 }.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::DuplicateDose { vaccine_id: 1, dose_number: 2 }.status(),
            StatusCode::CONFLICT
        );
        assert_eq!(Error::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            Error::Database(DbErr::Custom("boom".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_server_errors_hide_details() {
        let response = Error::Database(DbErr::Custom("disk on fire".to_string())).into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap_or_default();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains(RETRY_MESSAGE));
        assert!(!text.contains("disk on fire"));
    }
}
