use crate::models::HabitId;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

/// Input rejected before any mutation is attempted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("habit name must not be empty")]
    EmptyName,
    #[error("cannot complete a habit on a future date ({0})")]
    FutureDate(chrono::NaiveDate),
    #[error("{date} is before the last completion ({last_completed})")]
    BeforeLastCompletion {
        date: chrono::NaiveDate,
        last_completed: chrono::NaiveDate,
    },
}

/// Failure reported by the auth or persistence collaborator.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("storage io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("record {0} does not exist")]
    MissingRecord(HabitId),
    #[error("sign-in failed: {0}")]
    Auth(String),
}

#[derive(Debug, thiserror::Error)]
pub enum HabitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("free tier allows at most {limit} habits")]
    LimitReached { limit: usize },
    #[error("habit {0} not found")]
    NotFound(HabitId),
    #[error(transparent)]
    BackendUnavailable(#[from] BackendError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    upgrade: bool,
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "invalid_request",
            message: message.into(),
        }
    }
}

impl From<HabitError> for AppError {
    fn from(err: HabitError) -> Self {
        let (status, code) = match &err {
            HabitError::Validation(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            HabitError::LimitReached { .. } => (StatusCode::PAYMENT_REQUIRED, "limit_reached"),
            HabitError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            HabitError::BackendUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "backend_unavailable")
            }
        };
        Self {
            status,
            code,
            message: err.to_string(),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = ErrorBody {
            error: self.code,
            upgrade: self.code == "limit_reached",
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_reached_maps_to_upgrade_prompt() {
        let err = AppError::from(HabitError::LimitReached { limit: 3 });
        assert_eq!(err.status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(err.code, "limit_reached");
    }

    #[test]
    fn backend_failure_is_recoverable_service_error() {
        let err = AppError::from(HabitError::from(BackendError::Io(std::io::Error::new(
            std::io::ErrorKind::NotConnected,
            "offline",
        ))));
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(err.message.contains("offline"));
    }
}
