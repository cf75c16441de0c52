use std::sync::Arc;

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use curator_core::variables::{
    Category, CategoryListing, CategorySetSnapshot, DeleteOptions, DeleteOutcome,
    ExternalReference, ImportOptions, ImportOutcome, NewVariableOption, OptionPatch,
    VariableOption,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Request body for the import endpoint. `document` is either the exported
/// JSON text or the same document inlined as an object.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub document: Value,
    #[serde(default)]
    pub expected_revision: Option<u64>,
    #[serde(default)]
    pub references: Vec<ExternalReference>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteParams {
    #[serde(default)]
    pub cascade: Option<bool>,
    #[serde(default)]
    pub expected_revision: Option<u64>,
}

fn parse_category(raw: &str) -> ApiResult<Category> {
    Ok(raw.parse::<Category>()?)
}

#[utoipa::path(get, path = "/api/v1/variables", responses((status = 200, description = "Every category with its options")))]
pub async fn get_category_set(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<CategorySetSnapshot>> {
    debug!("Fetching all variables...");
    Ok(Json(state.variables_service.get_category_set()?))
}

#[utoipa::path(get, path = "/api/v1/variables/export", responses((status = 200, description = "Versioned variables document")))]
pub async fn export_document(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    debug!("Exporting variables...");
    let document = state.variables_service.export_document()?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/json"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"variables.json\"",
            ),
        ],
        document,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/variables/import",
    responses(
        (status = 200, description = "Import committed"),
        (status = 400, description = "Malformed document"),
        (status = 409, description = "Stale expectedRevision"),
        (status = 422, description = "Document breaks taxonomy rules; nothing was changed")
    )
)]
pub async fn import_document(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ImportRequest>,
) -> ApiResult<Json<ImportOutcome>> {
    let document = match body.document {
        Value::String(text) => text,
        value @ Value::Object(_) => value.to_string(),
        _ => {
            return Err(ApiError::BadRequest(
                "document must be a JSON string or object".to_string(),
            ))
        }
    };
    let options = ImportOptions {
        expected_revision: body.expected_revision,
        references: body.references,
    };
    debug!("Importing variables document ({} bytes)...", document.len());
    Ok(Json(
        state
            .variables_service
            .import_document(&document, options)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/variables/{category}",
    params(("category" = String, Path, description = "genres, subgenres, moods or eras")),
    responses((status = 200, description = "Options of one category"), (status = 404, description = "Unknown category"))
)]
pub async fn list_options(
    Path(category): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<CategoryListing>> {
    let category = parse_category(&category)?;
    debug!("Listing {}...", category);
    Ok(Json(state.variables_service.list_options(category)?))
}

#[utoipa::path(
    post,
    path = "/api/v1/variables/{category}",
    params(("category" = String, Path, description = "genres, subgenres, moods or eras")),
    responses(
        (status = 201, description = "Option created"),
        (status = 409, description = "Stale expectedRevision"),
        (status = 422, description = "Option breaks taxonomy rules")
    )
)]
pub async fn create_option(
    Path(category): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(option): Json<NewVariableOption>,
) -> ApiResult<(StatusCode, Json<VariableOption>)> {
    let category = parse_category(&category)?;
    debug!("Creating {} option {}...", category, option.label);
    let created = state
        .variables_service
        .create_option(category, option)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/v1/variables/{category}/{id}",
    params(
        ("category" = String, Path, description = "genres, subgenres, moods or eras"),
        ("id" = String, Path, description = "Option id")
    ),
    responses((status = 200, description = "The option"), (status = 404, description = "No such option"))
)]
pub async fn get_option(
    Path((category, id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<VariableOption>> {
    let category = parse_category(&category)?;
    debug!("Fetching {} option {}...", category, id);
    Ok(Json(state.variables_service.get_option(category, &id)?))
}

#[utoipa::path(
    put,
    path = "/api/v1/variables/{category}/{id}",
    params(
        ("category" = String, Path, description = "genres, subgenres, moods or eras"),
        ("id" = String, Path, description = "Option id")
    ),
    responses(
        (status = 200, description = "Option updated"),
        (status = 404, description = "No such option"),
        (status = 409, description = "Stale expectedRevision"),
        (status = 422, description = "Change breaks taxonomy rules")
    )
)]
pub async fn update_option(
    Path((category, id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
    Json(patch): Json<OptionPatch>,
) -> ApiResult<Json<VariableOption>> {
    let category = parse_category(&category)?;
    debug!("Updating {} option {}...", category, id);
    Ok(Json(
        state
            .variables_service
            .update_option(category, &id, patch)
            .await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/variables/{category}/{id}",
    params(
        ("category" = String, Path, description = "genres, subgenres, moods or eras"),
        ("id" = String, Path, description = "Option id"),
        ("cascade" = Option<bool>, Query, description = "Also delete dependent subgenres"),
        ("expectedRevision" = Option<u64>, Query, description = "Revision the caller last read")
    ),
    responses(
        (status = 200, description = "Deleted ids and the new revision"),
        (status = 404, description = "No such option"),
        (status = 409, description = "Genre has subgenres, or stale expectedRevision")
    )
)]
pub async fn delete_option(
    Path((category, id)): Path<(String, String)>,
    Query(params): Query<DeleteParams>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<DeleteOutcome>> {
    let category = parse_category(&category)?;
    let options = DeleteOptions {
        cascade: params.cascade.unwrap_or(false),
        expected_revision: params.expected_revision,
    };
    debug!(
        "Deleting {} option {} (cascade: {})...",
        category, id, options.cascade
    );
    Ok(Json(
        state
            .variables_service
            .delete_option(category, &id, options)
            .await?,
    ))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/variables", get(get_category_set))
        // Static segments win over `{category}` in the matcher.
        .route("/variables/export", get(export_document))
        .route("/variables/import", post(import_document))
        .route(
            "/variables/{category}",
            get(list_options).post(create_option),
        )
        .route(
            "/variables/{category}/{id}",
            get(get_option).put(update_option).delete(delete_option),
        )
}
