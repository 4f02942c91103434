//! HTTP API handlers

pub mod admin;
pub mod book;
pub mod borrowing;
pub mod health;
pub mod user;

use actix_web::web;

use crate::metrics::serve_metrics;

/// Register every route on an app
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health::health)
        .service(serve_metrics)
        .service(borrowing::routes())
        .service(book::routes())
        .service(user::routes())
        .service(admin::routes());
}
