use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::{
    DbErr,
    models::{task::TaskError, user::UserError},
};
use services::services::{access::AccessError, auth::AuthError};
use thiserror::Error;
use utils::response::ApiResponse;
use validator::ValidationErrors;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        // Surface the first violated field's message.
        let message = errors
            .field_errors()
            .iter()
            .flat_map(|(field, violations)| {
                violations.iter().map(move |violation| {
                    violation
                        .message
                        .as_ref()
                        .map(|msg| msg.to_string())
                        .unwrap_or_else(|| format!("{field} is invalid"))
                })
            })
            .next()
            .unwrap_or_else(|| "Invalid input".to_string());
        ApiError::Validation(message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_type) = match &self {
            ApiError::Access(err) => match err {
                AccessError::NotFound(_) => (StatusCode::NOT_FOUND, "AccessError"),
                AccessError::Denied => (StatusCode::FORBIDDEN, "AccessError"),
                AccessError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "AccessError"),
            },
            ApiError::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::InvalidToken => {
                    (StatusCode::UNAUTHORIZED, "AuthError")
                }
                AuthError::Hash => (StatusCode::INTERNAL_SERVER_ERROR, "AuthError"),
            },
            ApiError::User(err) => match err {
                UserError::EmailTaken | UserError::NameTaken => {
                    (StatusCode::CONFLICT, "UserError")
                }
                UserError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "UserError"),
            },
            ApiError::Task(err) => match err {
                TaskError::ColumnNotFound | TaskError::LabelNotFound => {
                    (StatusCode::NOT_FOUND, "TaskError")
                }
                TaskError::LabelWorkspaceMismatch => (StatusCode::BAD_REQUEST, "TaskError"),
                TaskError::Database(db_err) => match db_err {
                    DbErr::RecordNotFound(_) => (StatusCode::NOT_FOUND, "TaskError"),
                    _ => (StatusCode::INTERNAL_SERVER_ERROR, "TaskError"),
                },
            },
            ApiError::Database(db_err) => match db_err {
                DbErr::RecordNotFound(_) => (StatusCode::NOT_FOUND, "DatabaseError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError"),
            },
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "ValidationError"),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "ConflictError"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "ForbiddenError"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
        };

        let error_message = match &self {
            ApiError::Access(err) => err.to_string(),
            ApiError::Auth(err) => err.to_string(),
            ApiError::User(err) => err.to_string(),
            ApiError::Task(err) => err.to_string(),
            ApiError::Database(db_err) => match db_err {
                DbErr::RecordNotFound(msg) => msg.clone(),
                _ => format!("{}: {}", error_type, self),
            },
            ApiError::Validation(msg) => msg.clone(),
            ApiError::Unauthorized => "Unauthorized. Please sign in again.".to_string(),
            ApiError::NotFound(msg) => msg.clone(),
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Conflict(msg) => msg.clone(),
            ApiError::Forbidden(msg) => msg.clone(),
            ApiError::Internal(msg) => msg.clone(),
        };

        if status_code.is_server_error() {
            tracing::error!(
                status = %status_code,
                error_type,
                error = %self,
                "API request failed"
            );
        }
        let response = ApiResponse::<()>::error(&error_message);
        (status_code, Json(response)).into_response()
    }
}
