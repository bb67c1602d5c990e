use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

/// Domain-specific error types for the dashboard service.
/// Computation errors propagate to the HTTP boundary; they are never
/// replaced with a default value.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("no data available: {0}")]
    EmptyDataset(String),

    #[error("division by zero: {0}")]
    DivisionByZero(String),

    #[error("customer growth verification failed: {issues} issues found")]
    RegenerationIntegrity { issues: usize },

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(String),
}

impl DashboardError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::EmptyDataset(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::DivisionByZero(_)
            | Self::RegenerationIntegrity { .. }
            | Self::Database(_)
            | Self::Config(_)
            | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<rusqlite::Error> for DashboardError {
    fn from(e: rusqlite::Error) -> Self {
        DashboardError::Database(e.to_string())
    }
}

impl From<std::io::Error> for DashboardError {
    fn from(e: std::io::Error) -> Self {
        DashboardError::Io(e.to_string())
    }
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            // Storage internals stay in the logs
            Self::Database(_) | Self::Io(_) | Self::Config(_) => "internal server error".to_string(),
            other => other.to_string(),
        };
        if status.is_server_error() {
            tracing::error!("request failed: {self}");
        }
        (status, Json(serde_json::json!({ "message": message }))).into_response()
    }
}

pub type DashboardResult<T> = Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(DashboardError::EmptyDataset("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(DashboardError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            DashboardError::DivisionByZero("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            DashboardError::RegenerationIntegrity { issues: 2 }.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_database_details_hidden() {
        let resp = DashboardError::Database("no such table: secrets".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
