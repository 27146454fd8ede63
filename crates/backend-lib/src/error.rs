// crates/backend-lib/src/error.rs

//! Central error type + Axum integration.
use crate::room::RoomError;
use crate::validation::ValidationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use codecollab_common::ServerToClient;
use thiserror::Error;

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Room not found: {0}")]
    RoomNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Room(#[from] RoomError),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::RoomNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Room(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Config(_) | AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::RoomNotFound(_) => "ROOM_001",
            AppError::Config(_) => "CFG_001",
            AppError::Io(_) => "IO_001",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Room(err) => err.error_code(),
        }
    }

    /// Get a sanitized message suitable for production use
    pub fn sanitized_message(&self) -> String {
        match self {
            AppError::Io(_) | AppError::Config(_) => {
                "An internal server error occurred".to_string()
            },
            AppError::RoomNotFound(_) => "Resource not found".to_string(),
            // Input problems are the caller's own; echo them back
            AppError::Validation(_) | AppError::Room(_) => self.to_string(),
        }
    }

    /// The `error` event sent back to the connection whose intent failed
    pub fn to_event(&self) -> ServerToClient {
        ServerToClient::Error {
            code: self.error_code().to_string(),
            message: self.sanitized_message(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        // Use detailed messages in development, sanitized in production
        let message = if cfg!(debug_assertions) {
            self.to_string()
        } else {
            self.sanitized_message()
        };

        let body = serde_json::json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::TreeError;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_app_error_display() {
        let err = AppError::RoomNotFound("r1".to_string());
        assert_eq!(err.to_string(), "Room not found: r1");

        let io_error = AppError::Io(IoError::new(ErrorKind::NotFound, "File not found"));
        assert!(io_error.to_string().contains("IO error"));

        let room_error = AppError::Room(RoomError::InvalidOperation("no file at 'x'".to_string()));
        assert_eq!(room_error.to_string(), "Invalid operation: no file at 'x'");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            AppError::RoomNotFound("r".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Config("bad".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Validation(ValidationError::InvalidRoomId("empty".to_string()))
                .status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_app_error_error_codes() {
        assert_eq!(
            AppError::Validation(ValidationError::InvalidLanguage("x y".to_string())).error_code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(
            AppError::Room(RoomError::Tree(TreeError::EmptyPath)).error_code(),
            "EMPTY_PATH"
        );
        assert_eq!(
            AppError::Room(RoomError::Tree(TreeError::NotAFolder("a".to_string()))).error_code(),
            "INVALID_OPERATION"
        );
    }

    #[test]
    fn test_to_event_hides_internal_detail() {
        let event = AppError::Config("secret path /etc".to_string()).to_event();
        assert_eq!(
            event,
            ServerToClient::Error {
                code: "CFG_001".to_string(),
                message: "An internal server error occurred".to_string(),
            }
        );

        let event = AppError::Validation(ValidationError::InvalidPath("too long".to_string()))
            .to_event();
        match event {
            ServerToClient::Error { code, message } => {
                assert_eq!(code, "VALIDATION_ERROR");
                assert!(message.contains("too long"));
            },
            other => panic!("Expected Error, got {other:?}"),
        }
    }

    #[test]
    fn test_app_error_into_response() {
        let response = AppError::RoomNotFound("r1".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .contains("application/json"));
    }

    #[test]
    fn test_error_from_impls() {
        let io_err = IoError::new(ErrorKind::PermissionDenied, "Permission denied");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::Io(_)));

        let app_err: AppError = RoomError::Tree(TreeError::EmptyPath).into();
        assert!(matches!(app_err, AppError::Room(_)));

        let app_err: AppError = ValidationError::InvalidPath("p".to_string()).into();
        assert!(matches!(app_err, AppError::Validation(_)));
    }
}
