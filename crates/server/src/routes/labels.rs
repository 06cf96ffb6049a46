use axum::{
    Extension, Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::put,
};
use db::models::label::{Label, UpdateLabel};
use deployment::Deployment;
use serde::Deserialize;
use services::services::access;
use ts_rs::TS;
use utils::response::ApiResponse;
use validator::Validate;

use crate::{
    DeploymentImpl, error::ApiError, middleware::auth::AuthUser,
    middleware::model_loaders::load_label_middleware,
    routes::workspaces::validate_hex_color,
};

#[derive(Debug, Deserialize, Validate, TS)]
pub struct UpdateLabelRequest {
    #[validate(length(min = 1, max = 50, message = "Label name must be 1-50 characters"))]
    pub name: Option<String>,
    #[validate(custom(function = validate_hex_color))]
    pub color: Option<String>,
}

pub async fn update_label(
    Extension(label): Extension<Label>,
    Extension(user): Extension<AuthUser>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<UpdateLabelRequest>,
) -> Result<ResponseJson<ApiResponse<Label>>, ApiError> {
    payload.validate()?;
    access::ensure_label_access(&deployment.db().pool, label.id, user.id).await?;

    let updated = Label::update(
        &deployment.db().pool,
        label.id,
        &UpdateLabel {
            name: payload.name,
            color: payload.color,
        },
    )
    .await?;

    Ok(ResponseJson(ApiResponse::success(updated)))
}

pub async fn delete_label(
    Extension(label): Extension<Label>,
    Extension(user): Extension<AuthUser>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    access::ensure_label_access(&deployment.db().pool, label.id, user.id).await?;
    Label::delete(&deployment.db().pool, label.id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let label_id_router = Router::new()
        .route("/", put(update_label).delete(delete_label))
        .layer(from_fn_with_state(deployment.clone(), load_label_middleware::<DeploymentImpl>));

    Router::new().nest("/labels/{label_id}", label_id_router)
}
