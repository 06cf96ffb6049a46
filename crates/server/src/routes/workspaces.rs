use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{
    activity::{ActivityWithActor, CreateActivity},
    board::{Board, BoardWithColumnCount, CreateBoard},
    label::{CreateLabel, Label},
    workspace::{
        CreateWorkspace, UpdateWorkspace, Workspace, WorkspaceAnalytics, WorkspaceWithBoardCount,
    },
};
use db::types::{ActivityAction, ActivityEntityType};
use deployment::Deployment;
use serde::Deserialize;
use services::services::access;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    DeploymentImpl, error::ApiError, middleware::auth::AuthUser,
    middleware::model_loaders::load_workspace_middleware,
};

#[derive(Debug, Deserialize, Validate, TS)]
pub struct CreateWorkspaceRequest {
    #[validate(length(min = 1, max = 100, message = "Workspace name must be 1-100 characters"))]
    pub name: String,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, TS)]
pub struct UpdateWorkspaceRequest {
    #[validate(length(min = 1, max = 100, message = "Workspace name must be 1-100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, TS)]
pub struct CreateBoardRequest {
    #[validate(length(min = 1, max = 100, message = "Board name must be 1-100 characters"))]
    pub name: String,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, TS)]
pub struct CreateLabelRequest {
    #[validate(length(min = 1, max = 50, message = "Label name must be 1-50 characters"))]
    pub name: String,
    #[validate(custom(function = validate_hex_color))]
    pub color: String,
}

pub(crate) fn validate_hex_color(color: &str) -> Result<(), ValidationError> {
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(())
    } else {
        let mut error = ValidationError::new("hex_color");
        error.message = Some("Color must be a #rrggbb hex string".into());
        Err(error)
    }
}

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<u64>,
}

pub async fn get_workspaces(
    Extension(user): Extension<AuthUser>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<WorkspaceWithBoardCount>>>, ApiError> {
    let workspaces = Workspace::find_by_owner(&deployment.db().pool, user.id).await?;
    Ok(ResponseJson(ApiResponse::success(workspaces)))
}

pub async fn create_workspace(
    Extension(user): Extension<AuthUser>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateWorkspaceRequest>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Workspace>>), ApiError> {
    payload.validate()?;

    let workspace = Workspace::create(
        &deployment.db().pool,
        &CreateWorkspace {
            name: payload.name,
            description: payload.description,
        },
        Uuid::new_v4(),
        user.id,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success(workspace)),
    ))
}

pub async fn get_workspace(
    Extension(workspace): Extension<Workspace>,
    Extension(user): Extension<AuthUser>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Workspace>>, ApiError> {
    access::ensure_workspace_owner(&deployment.db().pool, workspace.id, user.id).await?;
    Ok(ResponseJson(ApiResponse::success(workspace)))
}

pub async fn update_workspace(
    Extension(workspace): Extension<Workspace>,
    Extension(user): Extension<AuthUser>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<UpdateWorkspaceRequest>,
) -> Result<ResponseJson<ApiResponse<Workspace>>, ApiError> {
    payload.validate()?;
    access::ensure_workspace_owner(&deployment.db().pool, workspace.id, user.id).await?;

    let updated = Workspace::update(
        &deployment.db().pool,
        workspace.id,
        &UpdateWorkspace {
            name: payload.name,
            description: payload.description,
        },
    )
    .await?;

    Ok(ResponseJson(ApiResponse::success(updated)))
}

pub async fn delete_workspace(
    Extension(workspace): Extension<Workspace>,
    Extension(user): Extension<AuthUser>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    access::ensure_workspace_owner(&deployment.db().pool, workspace.id, user.id).await?;
    Workspace::delete(&deployment.db().pool, workspace.id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn get_activities(
    Extension(workspace): Extension<Workspace>,
    Extension(user): Extension<AuthUser>,
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<ActivityQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<ActivityWithActor>>>, ApiError> {
    access::ensure_workspace_owner(&deployment.db().pool, workspace.id, user.id).await?;
    let activities = deployment.activity().list(workspace.id, query.limit).await?;
    Ok(ResponseJson(ApiResponse::success(activities)))
}

pub async fn get_analytics(
    Extension(workspace): Extension<Workspace>,
    Extension(user): Extension<AuthUser>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<WorkspaceAnalytics>>, ApiError> {
    access::ensure_workspace_owner(&deployment.db().pool, workspace.id, user.id).await?;
    let analytics = Workspace::analytics(&deployment.db().pool, workspace.id).await?;
    Ok(ResponseJson(ApiResponse::success(analytics)))
}

pub async fn get_boards(
    Extension(workspace): Extension<Workspace>,
    Extension(user): Extension<AuthUser>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<BoardWithColumnCount>>>, ApiError> {
    access::ensure_workspace_owner(&deployment.db().pool, workspace.id, user.id).await?;
    let boards = Board::find_by_workspace_id(&deployment.db().pool, workspace.id).await?;
    Ok(ResponseJson(ApiResponse::success(boards)))
}

pub async fn create_board(
    Extension(workspace): Extension<Workspace>,
    Extension(user): Extension<AuthUser>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateBoardRequest>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Board>>), ApiError> {
    payload.validate()?;
    access::ensure_workspace_owner(&deployment.db().pool, workspace.id, user.id).await?;

    let board = Board::create(
        &deployment.db().pool,
        workspace.id,
        &CreateBoard {
            name: payload.name,
            description: payload.description,
        },
        Uuid::new_v4(),
    )
    .await?;

    deployment
        .activity()
        .record(CreateActivity {
            workspace_id: workspace.id,
            user_id: user.id,
            action: ActivityAction::CreateBoard,
            entity_type: ActivityEntityType::Board,
            entity_id: board.id,
            entity_title: board.name.clone(),
            detail: None,
        })
        .await;

    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(board))))
}

pub async fn get_labels(
    Extension(workspace): Extension<Workspace>,
    Extension(user): Extension<AuthUser>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<Label>>>, ApiError> {
    access::ensure_workspace_owner(&deployment.db().pool, workspace.id, user.id).await?;
    let labels = Label::find_by_workspace_id(&deployment.db().pool, workspace.id).await?;
    Ok(ResponseJson(ApiResponse::success(labels)))
}

pub async fn create_label(
    Extension(workspace): Extension<Workspace>,
    Extension(user): Extension<AuthUser>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateLabelRequest>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Label>>), ApiError> {
    payload.validate()?;
    access::ensure_workspace_owner(&deployment.db().pool, workspace.id, user.id).await?;

    let label = Label::create(
        &deployment.db().pool,
        workspace.id,
        &CreateLabel {
            name: payload.name,
            color: payload.color,
        },
        Uuid::new_v4(),
    )
    .await?;

    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(label))))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let workspace_id_router = Router::new()
        .route(
            "/",
            get(get_workspace)
                .put(update_workspace)
                .delete(delete_workspace),
        )
        .route("/activities", get(get_activities))
        .route("/analytics", get(get_analytics))
        .route("/boards", get(get_boards).post(create_board))
        .route("/labels", get(get_labels).post(create_label))
        .layer(from_fn_with_state(
            deployment.clone(),
            load_workspace_middleware::<DeploymentImpl>,
        ));

    Router::new()
        .route("/workspaces", get(get_workspaces).post(create_workspace))
        .nest("/workspaces/{workspace_id}", workspace_id_router)
}
