use std::sync::Arc;

use crate::{error::ApiResult, main_lib::AppState};
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use curator_core::users::{CuratorView, User};
use tracing::debug;

#[utoipa::path(get, path = "/api/v1/users", responses((status = 200, description = "All users")))]
pub async fn get_all_users(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<User>>> {
    debug!("Fetching all users...");
    Ok(Json(state.user_service.get_all_users()?))
}

#[utoipa::path(get, path = "/api/v1/users/admins", responses((status = 200, description = "Admin users")))]
pub async fn get_admin_users(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<User>>> {
    debug!("Fetching admin users...");
    Ok(Json(state.user_service.get_admin_users()?))
}

#[utoipa::path(get, path = "/api/v1/users/curators", responses((status = 200, description = "Curators with their score")))]
pub async fn get_curators(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<CuratorView>>> {
    debug!("Fetching curators...");
    Ok(Json(state.user_service.get_curators()?))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = String, Path, description = "User id")),
    responses((status = 200, description = "The user"), (status = 404, description = "No such user"))
)]
pub async fn get_user(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<User>> {
    debug!("Fetching user {}...", id);
    Ok(Json(state.user_service.get_user(&id)?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(get_all_users))
        .route("/users/admins", get(get_admin_users))
        .route("/users/curators", get(get_curators))
        .route("/users/{id}", get(get_user))
}
