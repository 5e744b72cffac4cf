use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

/// Failures raised by a persistence backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A uniqueness constraint other than the attendance key was violated
    /// (for example a duplicate course code).
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// MySQL reports integrity violations with SQLSTATE 23000.
    pub fn from_insert(e: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.code().as_deref() == Some("23000") {
                return StoreError::Conflict(format!("{what} already exists"));
            }
        }
        StoreError::Database(e)
    }
}

#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Storage(StoreError),

    /// Failure outside the store, such as password hashing.
    #[error("{0}")]
    Internal(String),

    /// A bulk mark stopped part way. Resubmitting the same batch is safe.
    #[error("attendance batch interrupted after {applied} of {attempted} records: {source}")]
    BatchInterrupted {
        attempted: usize,
        applied: usize,
        #[source]
        source: StoreError,
    },
}

impl From<StoreError> for AttendanceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(msg) => AttendanceError::Conflict(msg),
            other => AttendanceError::Storage(other),
        }
    }
}

impl ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            AttendanceError::NotFound(_) => StatusCode::NOT_FOUND,
            AttendanceError::Validation(_) => StatusCode::BAD_REQUEST,
            AttendanceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AttendanceError::Forbidden(_) => StatusCode::FORBIDDEN,
            AttendanceError::Conflict(_) => StatusCode::CONFLICT,
            AttendanceError::Storage(_)
            | AttendanceError::Internal(_)
            | AttendanceError::BatchInterrupted { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AttendanceError::Storage(e) => {
                tracing::error!(error = %e, "Storage failure");
                json!({ "message": "Internal Server Error" })
            }
            AttendanceError::Internal(e) => {
                tracing::error!(error = %e, "Internal failure");
                json!({ "message": "Internal Server Error" })
            }
            AttendanceError::BatchInterrupted {
                attempted,
                applied,
                source,
            } => {
                tracing::error!(error = %source, attempted, applied, "Attendance batch interrupted");
                json!({
                    "message": "Attendance batch interrupted, resubmit to complete",
                    "attempted": attempted,
                    "applied": applied
                })
            }
            other => json!({ "message": other.to_string() }),
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(
            AttendanceError::NotFound("Course not found".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AttendanceError::Validation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AttendanceError::Forbidden("no".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AttendanceError::BatchInterrupted {
                attempted: 3,
                applied: 1,
                source: StoreError::Unavailable("down".into()),
            }
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_failures_hide_details() {
        let err = AttendanceError::Internal("password hashing failed".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn store_conflict_maps_to_conflict() {
        let err: AttendanceError = StoreError::Conflict("Course code already exists".into()).into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "Course code already exists");
    }
}
