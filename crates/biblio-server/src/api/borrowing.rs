//! Borrow and return endpoints

use actix_web::{HttpResponse, Scope, post, web};
use biblio_common::BiblioError;
use biblio_lending::validation::check;
use biblio_lending::{BorrowRequest, ReturnRequest};
use biblio_persistence::{BookInfo, BorrowingInfo};
use serde::Serialize;

use crate::error::AppError;
use crate::model::{AppState, response::Result};

#[derive(Serialize)]
struct BorrowBody {
    borrowing: BorrowingInfo,
}

#[derive(Serialize)]
struct ReturnBody {
    borrowing: BorrowingInfo,
    book: BookInfo,
}

/// An empty body means an unrated return
fn parse_return_body(body: &[u8]) -> std::result::Result<ReturnRequest, BiblioError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ReturnRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| BiblioError::validation(format!("Invalid request body: {}", e)))
}

#[post("/borrow")]
async fn borrow(
    data: web::Data<AppState>,
    body: web::Json<BorrowRequest>,
) -> std::result::Result<HttpResponse, AppError> {
    let request = body.into_inner();
    check(&request)?;

    let borrowing = data.lending.borrow(request.user_id, request.book_id).await?;

    Ok(Result::http_created(BorrowBody { borrowing }))
}

#[post("/return/{borrowing_id}")]
async fn return_book(
    data: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Bytes,
) -> std::result::Result<HttpResponse, AppError> {
    let borrowing_id = path.into_inner();
    let request = parse_return_body(&body)?;
    check(&request)?;

    let record = data.lending.return_book(borrowing_id, request.rating).await?;

    Ok(Result::http_success(ReturnBody {
        borrowing: record.borrowing,
        book: record.book,
    }))
}

pub fn routes() -> Scope {
    web::scope("/api/borrowings")
        .service(borrow)
        .service(return_book)
}
