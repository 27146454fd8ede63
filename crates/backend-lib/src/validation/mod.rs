// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Message validation module.
//!
//! Shape checks run before an intent reaches a room. Anything that depends
//! on room state (does the file exist, is that a folder) is the room's call.

use crate::config::Limits;
use crate::tree;
use codecollab_common::ClientToServer;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

const MAX_LANGUAGE_LENGTH: usize = 32;

// Regex patterns for validation
static LANGUAGE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9+#._-]+$").unwrap());

/// Possible validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid room ID: {0}")]
    InvalidRoomId(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Content too large: {len} bytes exceeds the {max} byte limit")]
    ContentTooLarge { len: usize, max: usize },

    #[error("Invalid language: {0}")]
    InvalidLanguage(String),
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate a room ID
pub fn validate_room_id<'a>(room_id: &'a str, limits: &Limits) -> ValidationResult<&'a str> {
    if room_id.is_empty() {
        return Err(ValidationError::InvalidRoomId(
            "Room ID must not be empty".to_string(),
        ));
    }

    if room_id.len() > limits.max_room_id_len {
        return Err(ValidationError::InvalidRoomId(format!(
            "Room ID cannot exceed {} bytes",
            limits.max_room_id_len
        )));
    }

    if room_id.chars().any(char::is_control) {
        return Err(ValidationError::InvalidRoomId(
            "Room ID must not contain control characters".to_string(),
        ));
    }

    Ok(room_id)
}

/// Validate a file or folder path
pub fn validate_path<'a>(path: &'a str, limits: &Limits) -> ValidationResult<&'a str> {
    if path.len() > limits.max_path_len {
        return Err(ValidationError::InvalidPath(format!(
            "Path cannot exceed {} bytes",
            limits.max_path_len
        )));
    }

    if tree::segments(path).next().is_none() {
        return Err(ValidationError::InvalidPath(
            "Path must name at least one segment".to_string(),
        ));
    }

    if path.chars().any(char::is_control) {
        return Err(ValidationError::InvalidPath(
            "Path must not contain control characters".to_string(),
        ));
    }

    Ok(path)
}

/// Validate file content size
pub fn validate_content<'a>(content: &'a str, limits: &Limits) -> ValidationResult<&'a str> {
    if content.len() > limits.max_content_bytes {
        return Err(ValidationError::ContentTooLarge {
            len: content.len(),
            max: limits.max_content_bytes,
        });
    }
    Ok(content)
}

/// Validate a language tag
pub fn validate_language(language: &str) -> ValidationResult<&str> {
    if language.len() > MAX_LANGUAGE_LENGTH || !LANGUAGE_REGEX.is_match(language) {
        return Err(ValidationError::InvalidLanguage(format!(
            "'{language}' is not a language tag"
        )));
    }
    Ok(language)
}

/// Validate a client message
pub fn validate_client_message(
    message: &ClientToServer,
    limits: &Limits,
) -> ValidationResult<()> {
    validate_room_id(message.room_id(), limits)?;

    match message {
        ClientToServer::JoinRoom { .. } | ClientToServer::CursorPosition { .. } => {},
        ClientToServer::CodeChange {
            code,
            language_id,
            file_path,
            ..
        } => {
            validate_content(code, limits)?;
            if let Some(language) = language_id {
                validate_language(language)?;
            }
            // A path naming no segment addresses the legacy buffer
            if let Some(path) = file_path {
                if tree::segments(path).next().is_some() {
                    validate_path(path, limits)?;
                }
            }
        },
        ClientToServer::LanguageChange { language_id, .. } => {
            validate_language(language_id)?;
        },
        ClientToServer::CreateFile {
            file_path, content, ..
        } => {
            validate_path(file_path, limits)?;
            if let Some(content) = content {
                validate_content(content, limits)?;
            }
        },
        ClientToServer::CreateFolder { folder_path, .. }
        | ClientToServer::DeleteFolder { folder_path, .. } => {
            validate_path(folder_path, limits)?;
        },
        ClientToServer::DeleteFile { file_path, .. }
        | ClientToServer::SelectFile { file_path, .. } => {
            validate_path(file_path, limits)?;
        },
    }

    Ok(())
}
