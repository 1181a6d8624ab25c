// Copyright 2023 Remi Bernotavicius

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use derive_more::Display;
use serde::Serialize;

/// How a business-rule violation should be reported to the caller.
#[derive(Debug, Display, Copy, Clone, PartialEq, Eq)]
pub enum Status {
    #[display("404 Not Found")]
    NotFound,
    #[display("409 Conflict")]
    Conflict,
    #[display("400 Bad Request")]
    BadRequest,
}

impl Status {
    pub fn status_code(self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::BadRequest => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{message}")]
    Business { status: Status, message: String },
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("failed to open database: {0}")]
    Connection(#[from] diesel::ConnectionError),
    #[error("failed to run migrations: {0}")]
    Migration(Box<dyn std::error::Error + Send + Sync + 'static>),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Logger(#[from] log::SetLoggerError),
    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("database connection lock poisoned")]
    Poisoned,
}

impl Error {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::Business {
            status: Status::NotFound,
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Business {
            status: Status::Conflict,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::Business {
            status: Status::BadRequest,
            message: message.into(),
        }
    }

    /// `None` for anything that is not a business-rule violation.
    pub fn status(&self) -> Option<Status> {
        match self {
            Self::Business { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

#[derive(Debug, Serialize)]
pub struct Problem {
    pub code: String,
    pub message: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status_code, problem) = match self.status() {
            Some(status) => (
                status.status_code(),
                Problem {
                    code: status.to_string(),
                    message: self.to_string(),
                },
            ),
            None => {
                log::error!("request failed: {self}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Problem {
                        code: StatusCode::INTERNAL_SERVER_ERROR.to_string(),
                        message: "internal server error".into(),
                    },
                )
            }
        };
        (status_code, Json(problem)).into_response()
    }
}

#[cfg(test)]
async fn problem_of(error: Error) -> (StatusCode, serde_json::Value) {
    let response = error.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn business_errors_keep_their_message() {
    let (status, body) = problem_of(Error::conflict("Recipe with id: 3 already exists")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "409 Conflict");
    assert_eq!(body["message"], "Recipe with id: 3 already exists");
}

#[tokio::test]
async fn internal_errors_hide_their_detail() {
    let (status, body) = problem_of(Error::Poisoned).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "500 Internal Server Error");
    assert_eq!(body["message"], "internal server error");

    let (_, body) = problem_of(Error::Database(diesel::result::Error::NotFound)).await;
    assert_eq!(body["message"], "internal server error");
}
