use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;

/// Errors raised while talking to the performance service or driving the session.
#[derive(Debug, thiserror::Error)]
pub enum InsightsError {
    #[error("Student not found: {0}")]
    NotFound(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Service returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Invalid service URL: {0}")]
    InvalidUrl(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dashboard session is no longer running")]
    SessionClosed,

    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),
}

pub type Result<T> = std::result::Result<T, InsightsError>;

impl InsightsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, InsightsError::NotFound(_))
    }
}

impl ResponseError for InsightsError {
    fn status_code(&self) -> StatusCode {
        match self {
            InsightsError::NotFound(_) => StatusCode::NOT_FOUND,
            InsightsError::Http(_) | InsightsError::Server { .. } => StatusCode::BAD_GATEWAY,
            InsightsError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
