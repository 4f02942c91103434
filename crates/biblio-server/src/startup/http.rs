//! HTTP server setup

use actix_web::{
    App, HttpRequest, HttpResponse, HttpServer, dev::Server, error, middleware::Logger, web,
};
use biblio_common::BiblioError;

use crate::error::AppError;
use crate::model::{AppState, response::Result};
use crate::{api, model::Configuration};

pub const INVALID_ID_MESSAGE: &str = "Valid ID is required";

/// Malformed JSON bodies are reported in the same envelope as domain validation
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req: &HttpRequest| {
        let message = match &err {
            error::JsonPayloadError::ContentType => "Content type must be application/json".to_string(),
            other => format!("Invalid request body: {}", other),
        };
        AppError::from(BiblioError::validation(message)).into()
    })
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|_err, _req: &HttpRequest| {
        AppError::from(BiblioError::validation(INVALID_ID_MESSAGE)).into()
    })
}

pub async fn not_found() -> HttpResponse {
    Result::http_error(404, biblio_common::error::RESOURCE_NOT_FOUND.code, "Route not found")
}

/// Apply the extractor configs and routes shared by the server and the tests
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(path_config())
        .configure(api::routes)
        .default_service(web::route().to(not_found));
}

/// Creates and binds the main HTTP server.
pub fn main_server(app_state: AppState, configuration: &Configuration) -> std::io::Result<Server> {
    let app_state = web::Data::new(app_state);

    let mut server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(app_state.clone())
            .configure(configure)
    })
    .shutdown_timeout(configuration.shutdown_timeout().as_secs());

    if let Some(workers) = configuration.server_workers() {
        server = server.workers(workers);
    }

    Ok(server
        .bind((configuration.server_address(), configuration.server_port()))?
        .run())
}
