use std::sync::Arc;

use anyhow::Context;
use axum::{
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;

use crate::{
    auth::{auth_status, login, require_admin},
    config::Config,
    error::ApiResult,
    main_lib::AppState,
};

pub mod users;
pub mod variables;

#[utoipa::path(get, path = "/api/v1/healthz", responses((status = 200, description = "Alive")))]
pub async fn healthz() -> &'static str {
    "ok"
}

#[utoipa::path(
    get,
    path = "/api/v1/readyz",
    responses(
        (status = 200, description = "Ready"),
        (status = 500, description = "Store unavailable")
    )
)]
pub async fn readyz(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
) -> ApiResult<&'static str> {
    state.variable_store.revision()?;
    Ok("ok")
}

#[derive(OpenApi)]
#[openapi(
    paths(
        healthz,
        readyz,
        variables::get_category_set,
        variables::export_document,
        variables::import_document,
        variables::list_options,
        variables::create_option,
        variables::get_option,
        variables::update_option,
        variables::delete_option,
        users::get_all_users,
        users::get_admin_users,
        users::get_curators,
        users::get_user,
    ),
    tags((name = "curator"))
)]
pub struct ApiDoc;

pub fn app_router(state: Arc<AppState>, config: &Config) -> anyhow::Result<Router> {
    let cors = if config.cors_allow.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins = config
            .cors_allow
            .iter()
            .map(|o| {
                o.parse::<HeaderValue>()
                    .with_context(|| format!("Invalid CORS origin '{o}'"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        CorsLayer::new().allow_origin(origins)
    };

    let openapi = ApiDoc::openapi();

    let admin = Router::new()
        .merge(variables::router())
        .merge(users::router())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    let api = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/auth/login", post(login))
        .route("/auth/status", get(auth_status))
        .merge(admin);

    Ok(Router::new()
        .nest("/api/v1", api)
        .route("/openapi.json", get(|| async { Json(openapi) }))
        .with_state(state)
        .layer(cors)
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http()))
}
