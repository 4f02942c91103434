//! Cache administration endpoints

use actix_web::{HttpResponse, Scope, post, web};

use crate::model::{AppState, response::Result};

#[post("/clear-all")]
async fn clear_all(data: web::Data<AppState>) -> HttpResponse {
    data.cache.clear_all();
    Result::http_done("All caches cleared")
}

#[post("/clear-books")]
async fn clear_books(data: web::Data<AppState>) -> HttpResponse {
    data.cache.clear_books();
    Result::http_done("Book caches cleared")
}

#[post("/clear-users")]
async fn clear_users(data: web::Data<AppState>) -> HttpResponse {
    data.cache.clear_users();
    Result::http_done("User caches cleared")
}

pub fn routes() -> Scope {
    web::scope("/api/admin/cache")
        .service(clear_all)
        .service(clear_books)
        .service(clear_users)
}
