use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use curator_core::errors::{DatabaseError, Error as CoreError};
use curator_core::variables::{VariablesError, Violation};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Core(#[from] CoreError),
    #[error("{0}")]
    BadRequest(String),
}

impl From<VariablesError> for ApiError {
    fn from(err: VariablesError) -> Self {
        ApiError::Core(err.into())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    code: u16,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    violations: Option<Vec<Violation>>,
}

fn variables_status(err: &VariablesError) -> StatusCode {
    match err {
        VariablesError::NotFound { .. } | VariablesError::UnknownCategory(_) => {
            StatusCode::NOT_FOUND
        }
        VariablesError::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
        VariablesError::HasDependents { .. } | VariablesError::Conflict { .. } => {
            StatusCode::CONFLICT
        }
        VariablesError::MalformedDocument(_) => StatusCode::BAD_REQUEST,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut hint = None;
        let mut violations = None;
        let status = match &self {
            ApiError::Core(CoreError::Variables(e)) => {
                hint = e.remedy();
                if let VariablesError::ValidationFailed(list) = e {
                    violations = Some(list.clone());
                }
                variables_status(e)
            }
            ApiError::Core(CoreError::Database(DatabaseError::NotFound(_))) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Core(CoreError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let body = Json(ErrorBody {
            code: status.as_u16(),
            message: self.to_string(),
            hint,
            violations,
        });
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
