//! Book catalog endpoints

use actix_web::{HttpResponse, Scope, get, post, web};
use biblio_lending::{CreateBookRequest, ReadSource};
use biblio_persistence::BookInfo;
use serde::Serialize;

use crate::error::AppError;
use crate::model::{AppState, response::Result};

#[derive(Serialize)]
struct BookListBody<'a> {
    books: &'a [BookInfo],
    source: ReadSource,
}

#[derive(Serialize)]
struct BookBody {
    book: BookInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<ReadSource>,
}

#[get("")]
async fn list_books(data: web::Data<AppState>) -> std::result::Result<HttpResponse, AppError> {
    let cached = data.catalog.list_books().await?;

    Ok(Result::http_success(BookListBody {
        books: &cached.value,
        source: cached.source,
    }))
}

#[get("/{id}")]
async fn get_book(
    data: web::Data<AppState>,
    path: web::Path<i64>,
) -> std::result::Result<HttpResponse, AppError> {
    let cached = data.catalog.get_book(path.into_inner()).await?;

    Ok(Result::http_success(BookBody {
        book: cached.value,
        source: Some(cached.source),
    }))
}

#[post("")]
async fn create_book(
    data: web::Data<AppState>,
    body: web::Json<CreateBookRequest>,
) -> std::result::Result<HttpResponse, AppError> {
    let book = data.catalog.create_book(body.into_inner()).await?;

    Ok(Result::http_created(BookBody { book, source: None }))
}

pub fn routes() -> Scope {
    web::scope("/api/books")
        .service(list_books)
        .service(create_book)
        .service(get_book)
}
