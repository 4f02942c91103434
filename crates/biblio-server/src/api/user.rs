//! User endpoints

use actix_web::{HttpResponse, Scope, get, post, web};
use biblio_lending::{CreateUserRequest, ReadSource, UserDetail};
use biblio_persistence::UserInfo;
use serde::Serialize;

use crate::error::AppError;
use crate::model::{AppState, response::Result};

#[derive(Serialize)]
struct UserListBody<'a> {
    users: &'a [UserInfo],
    source: ReadSource,
}

#[derive(Serialize)]
struct UserDetailBody {
    #[serde(flatten)]
    detail: UserDetail,
    source: ReadSource,
}

#[derive(Serialize)]
struct UserBody {
    user: UserInfo,
}

#[get("")]
async fn list_users(data: web::Data<AppState>) -> std::result::Result<HttpResponse, AppError> {
    let cached = data.catalog.list_users().await?;

    Ok(Result::http_success(UserListBody {
        users: &cached.value,
        source: cached.source,
    }))
}

/// The user with current and past borrowings
#[get("/{id}")]
async fn get_user(
    data: web::Data<AppState>,
    path: web::Path<i64>,
) -> std::result::Result<HttpResponse, AppError> {
    let cached = data.catalog.get_user(path.into_inner()).await?;

    Ok(Result::http_success(UserDetailBody {
        detail: cached.value,
        source: cached.source,
    }))
}

#[post("")]
async fn create_user(
    data: web::Data<AppState>,
    body: web::Json<CreateUserRequest>,
) -> std::result::Result<HttpResponse, AppError> {
    let user = data.catalog.create_user(body.into_inner()).await?;

    Ok(Result::http_created(UserBody { user }))
}

pub fn routes() -> Scope {
    web::scope("/api/users")
        .service(list_users)
        .service(create_user)
        .service(get_user)
}
