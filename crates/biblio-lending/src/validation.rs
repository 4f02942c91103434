//! Input validation for lending requests
//!
//! Request bodies derive `validator::Validate`; [`check`] turns the collected
//! failures into a single `ValidationFailed` error.

use std::borrow::Cow;

use biblio_common::{BiblioError, MAX_RATING, MIN_RATING};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use biblio_persistence::{NewBook, NewUser};

/// Reject strings that are empty once surrounding whitespace is removed
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

pub const RATING_RANGE_MESSAGE: &str = "Rating must be between 1 and 5";

/// Rating given on return, if any, must lie in `MIN_RATING..=MAX_RATING`
pub fn validate_rating(rating: Option<f64>) -> biblio_common::Result<()> {
    match rating {
        Some(r) if !(MIN_RATING..=MAX_RATING).contains(&r) => {
            Err(BiblioError::validation(RATING_RANGE_MESSAGE))
        }
        _ => Ok(()),
    }
}

/// Validate `value`, reporting every failed field as one message
pub fn check<T: Validate>(value: &T) -> biblio_common::Result<()> {
    value
        .validate()
        .map_err(|errors| BiblioError::validation(describe(&errors)))
}

fn describe(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .clone()
                    .unwrap_or_else(|| Cow::Owned(format!("{} is invalid", field)))
                    .into_owned()
            })
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookRequest {
    #[validate(custom(function = "not_blank", message = "Title is required"))]
    pub title: String,
    #[validate(custom(function = "not_blank", message = "Author is required"))]
    pub author: String,
    pub description: Option<String>,
}

impl From<CreateBookRequest> for NewBook {
    fn from(req: CreateBookRequest) -> Self {
        Self {
            title: req.title.trim().to_string(),
            author: req.author.trim().to_string(),
            description: req.description,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(custom(function = "not_blank", message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Valid email is required"))]
    pub email: String,
}

impl From<CreateUserRequest> for NewUser {
    fn from(req: CreateUserRequest) -> Self {
        Self {
            name: req.name.trim().to_string(),
            email: req.email,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRequest {
    #[validate(range(min = 1, message = "Valid user ID is required"))]
    pub user_id: i64,
    #[validate(range(min = 1, message = "Valid book ID is required"))]
    pub book_id: i64,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRequest {
    #[validate(range(min = 1.0, max = 5.0, message = "Rating must be between 1 and 5"))]
    pub rating: Option<f64>,
}
