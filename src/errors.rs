use axum::{http::StatusCode, response::IntoResponse, Json};

use crate::JsonResponse;

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("invalid reference: {0}")]
    InvalidReference(&'static str),
    #[error("conflict: {0}")]
    Conflict(&'static str),
    #[error("not found: {0}")]
    NotFound(&'static str),
    #[error("database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct RequestErrorJsonWrapper {
    pub errors: RequestErrorJson,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct RequestErrorJson {
    pub body: Vec<String>,
}

impl RequestErrorJsonWrapper {
    pub fn new(error: &str) -> RequestErrorJsonWrapper {
        RequestErrorJsonWrapper {
            errors: RequestErrorJson {
                body: vec![error.to_string()],
            },
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> axum::response::Response {
        self.to_json_response().into_response()
    }
}

impl RequestError {
    /// Maps a UNIQUE constraint failure raised by SQLite to `Conflict`, leaving
    /// every other error untouched.
    pub fn on_unique_violation(self, message: &'static str) -> Self {
        if let RequestError::DatabaseError(sqlx::Error::Database(e)) = &self {
            if e.message().contains("UNIQUE constraint failed") {
                return RequestError::Conflict(message);
            }
        }
        self
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            RequestError::Validation(_) | RequestError::InvalidReference(_) => {
                StatusCode::BAD_REQUEST
            }
            RequestError::Conflict(_) => StatusCode::CONFLICT,
            RequestError::NotFound(_) => StatusCode::NOT_FOUND,
            RequestError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_json_response(&self) -> JsonResponse<RequestErrorJsonWrapper> {
        let json = match self {
            RequestError::Validation(message) => RequestErrorJsonWrapper::new(message),
            RequestError::InvalidReference(message)
            | RequestError::Conflict(message)
            | RequestError::NotFound(message) => RequestErrorJsonWrapper::new(message),
            RequestError::DatabaseError(e) => {
                tracing::error!("Database error: {}", e);
                RequestErrorJsonWrapper::new("Internal Server Error")
            }
        };
        (self.status_code(), Json(json))
    }
}
