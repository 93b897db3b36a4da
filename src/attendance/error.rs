use crate::model::attendance::FormattedRecord;
use crate::store::StoreError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AttendanceError {
    /// Rejected before the store is touched.
    #[error("{0}")]
    Validation(String),

    #[error("You have already checked in today.")]
    DuplicateCheckIn(Box<FormattedRecord>),

    #[error("No check-in record found for today. Please check-in first.")]
    NotCheckedIn,

    #[error("You have already checked out today.")]
    AlreadyCheckedOut(Box<FormattedRecord>),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl AttendanceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// The record the caller collided with, if any.
    pub fn existing(&self) -> Option<&FormattedRecord> {
        match self {
            AttendanceError::DuplicateCheckIn(record)
            | AttendanceError::AlreadyCheckedOut(record) => Some(record),
            _ => None,
        }
    }
}

impl ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            AttendanceError::Validation(_) => StatusCode::BAD_REQUEST,
            AttendanceError::DuplicateCheckIn(_)
            | AttendanceError::NotCheckedIn
            | AttendanceError::AlreadyCheckedOut(_) => StatusCode::CONFLICT,
            AttendanceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AttendanceError::Storage(e) => {
                tracing::error!(error = %e, "Attendance store failure");
                json!({
                    "success": false,
                    "message": "Internal Server Error"
                })
            }
            other => match other.existing() {
                Some(record) => json!({
                    "success": false,
                    "message": other.to_string(),
                    "data": { "attendance": record }
                }),
                None => json!({
                    "success": false,
                    "message": other.to_string()
                }),
            },
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_taxonomy_to_status_codes() {
        assert_eq!(
            AttendanceError::validation("bad").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AttendanceError::NotCheckedIn.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AttendanceError::from(StoreError::Unavailable("down".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
