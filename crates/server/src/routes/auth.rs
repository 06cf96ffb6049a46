use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::user::{CreateUser, User};
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use services::services::auth::{self, AuthError};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;
use validator::Validate;

use crate::{DeploymentImpl, error::ApiError, middleware::auth::AuthUser};

#[derive(Debug, Deserialize, Validate, TS)]
pub struct RegisterRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be 2-100 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, max = 100, message = "Password must be 6-100 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, TS)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, TS)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

pub async fn register(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<AuthResponse>>), ApiError> {
    payload.validate()?;

    let password_hash = auth::hash_password(&payload.password)?;
    let user = User::create(
        &deployment.db().pool,
        &CreateUser {
            name: payload.name,
            email: payload.email,
            password_hash,
        },
        Uuid::new_v4(),
    )
    .await?;

    let config = deployment.config();
    let token = auth::generate_token(
        user.id,
        &user.email,
        &config.jwt_secret,
        config.token_expiry_hours,
    )?;

    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success(AuthResponse { user, token })),
    ))
}

pub async fn login(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<LoginRequest>,
) -> Result<ResponseJson<ApiResponse<AuthResponse>>, ApiError> {
    payload.validate()?;

    // One failure path for unknown identifier and wrong password, so the
    // response does not reveal which one it was.
    let credentials = User::find_credentials_by_identifier(&deployment.db().pool, &payload.email)
        .await
        .map_err(ApiError::Database)?
        .ok_or(AuthError::InvalidCredentials)?;

    if !auth::verify_password(&payload.password, &credentials.password_hash)? {
        return Err(AuthError::InvalidCredentials.into());
    }

    let config = deployment.config();
    let token = auth::generate_token(
        credentials.user.id,
        &credentials.user.email,
        &config.jwt_secret,
        config.token_expiry_hours,
    )?;

    Ok(ResponseJson(ApiResponse::success(AuthResponse {
        user: credentials.user,
        token,
    })))
}

pub async fn me(
    Extension(user): Extension<AuthUser>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    let user = User::find_by_id(&deployment.db().pool, user.id)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    Ok(ResponseJson(ApiResponse::success(user)))
}

/// Routes reachable without a token.
pub fn public_router() -> Router<DeploymentImpl> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

/// Routes behind the auth middleware.
pub fn router() -> Router<DeploymentImpl> {
    Router::new().route("/auth/me", get(me))
}
