//! Error types for the churn API.
//!
//! [`ModelError`] covers everything that can go wrong while loading or
//! scoring the model artifact. [`ApiError`] is what handlers return; it maps
//! onto HTTP status codes through actix's [`ResponseError`].

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use std::io;
use thiserror::Error;

/// Errors raised while loading or running the model artifact.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid artifact: {0}")]
    InvalidArtifact(String),

    #[error("Found unknown category {value:?} in column {column}")]
    UnknownCategory { column: String, value: String },

    #[error("Column {column} expected a {expected} value")]
    ColumnType {
        column: String,
        expected: &'static str,
    },

    #[error("ONNX runtime error: {0}")]
    Onnx(String),
}

/// Invalid environment configuration.
#[derive(Error, Debug)]
#[error("Invalid value {value:?} for {key}: {reason}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

/// One segment of an issue location: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LocPart {
    Key(String),
    Index(usize),
}

impl From<&str> for LocPart {
    fn from(key: &str) -> Self {
        LocPart::Key(key.to_string())
    }
}

impl From<usize> for LocPart {
    fn from(index: usize) -> Self {
        LocPart::Index(index)
    }
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub loc: Vec<LocPart>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl ValidationIssue {
    pub fn new(loc: Vec<LocPart>, kind: &'static str, msg: impl Into<String>) -> Self {
        Self {
            loc,
            msg: msg.into(),
            kind,
        }
    }
}

/// Errors returned by request handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request validation failed ({} issue(s))", .0.len())]
    Validation(Vec<ValidationIssue>),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn invalid(issue: ValidationIssue) -> Self {
        ApiError::Validation(vec![issue])
    }
}

impl From<ModelError> for ApiError {
    fn from(e: ModelError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody<'a, T: Serialize> {
    detail: &'a T,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::Validation(issues) => {
                HttpResponse::build(self.status_code()).json(ErrorBody { detail: issues })
            }
            ApiError::Internal(message) => {
                log::error!("Request failed: {}", message);
                HttpResponse::build(self.status_code()).json(ErrorBody {
                    detail: &"Internal Server Error",
                })
            }
        }
    }
}
