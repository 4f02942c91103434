//! HTTP response envelope
//!
//! Every body is `{"status": "success" | "error", ...}` with `data` on success
//! and `message` on failure.

use actix_web::{HttpResponse, HttpResponseBuilder, http::StatusCode};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Generic result wrapper for API responses
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Result<T> {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
}

impl<T: Serialize> Result<T> {
    pub fn success(data: T) -> Self {
        Result::<T> {
            status: Status::Success,
            data: Some(data),
            message: None,
            code: None,
        }
    }

    pub fn http_success(data: T) -> HttpResponse {
        HttpResponse::Ok().json(Result::success(data))
    }

    pub fn http_created(data: T) -> HttpResponse {
        HttpResponse::Created().json(Result::success(data))
    }
}

impl Result<()> {
    /// Success without a payload, only a human-readable note
    pub fn done(message: impl Into<String>) -> Self {
        Result::<()> {
            status: Status::Success,
            data: None,
            message: Some(message.into()),
            code: None,
        }
    }

    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Result::<()> {
            status: Status::Error,
            data: None,
            message: Some(message.into()),
            code: Some(code),
        }
    }

    pub fn http_done(message: impl Into<String>) -> HttpResponse {
        HttpResponse::Ok().json(Result::done(message))
    }

    pub fn http_error(status: u16, code: i32, message: impl Into<String>) -> HttpResponse {
        HttpResponseBuilder::new(
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        )
        .json(Result::error(code, message))
    }
}
