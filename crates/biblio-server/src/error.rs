//! Error handling for HTTP handlers
//!
//! `BiblioError` lives in `biblio-common`, so the actix `ResponseError` impl
//! goes on this local wrapper.

use actix_web::{HttpResponse, http::StatusCode};
use biblio_common::BiblioError;
use tracing::error;

use crate::model::response;

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct AppError(#[from] BiblioError);

impl actix_web::error::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        if let BiblioError::InternalFailure(detail) = &self.0 {
            error!(detail = %detail, "Request failed with an internal error");
        }

        response::Result::http_error(
            self.0.http_status(),
            self.0.error_code().code,
            self.0.public_message(),
        )
    }
}
