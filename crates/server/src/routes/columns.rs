use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{delete, patch, post, put},
};
use chrono::{DateTime, Utc};
use db::TransactionTrait;
use db::models::{
    activity::CreateActivity,
    board::Board,
    column::{Column, UpdateColumn},
    task::{CreateTask, Task, TaskWithLabels},
};
use db::types::{ActivityAction, ActivityEntityType, Priority};
use deployment::Deployment;
use serde::Deserialize;
use services::services::access::{self, AccessError};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;
use validator::Validate;

use crate::{
    DeploymentImpl, error::ApiError, middleware::auth::AuthUser,
    middleware::model_loaders::load_column_middleware,
};

#[derive(Debug, Deserialize, Validate, TS)]
pub struct UpdateColumnRequest {
    #[validate(length(min = 1, max = 100, message = "Column title must be 1-100 characters"))]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize, TS)]
pub struct ReorderRequest {
    pub ordered_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Validate, TS)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "Task title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub due_date: Option<DateTime<Utc>>,
    pub label_ids: Option<Vec<Uuid>>,
}

/// Bulk reorder of a board's columns. The desired ordering is the caller's
/// full list of sibling ids; the scope is resolved from the first id.
pub async fn reorder_columns(
    Extension(user): Extension<AuthUser>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<ReorderRequest>,
) -> Result<ResponseJson<ApiResponse<Vec<Column>>>, ApiError> {
    let first = payload
        .ordered_ids
        .first()
        .copied()
        .ok_or(AccessError::NotFound("Column"))?;
    let workspace_id =
        access::ensure_column_access(&deployment.db().pool, first, user.id).await?;

    let tx = deployment.db().pool.begin().await?;
    let columns = Column::reorder(&tx, &payload.ordered_ids).await?;
    tx.commit().await?;

    if let Some(board_id) = columns.first().map(|column| column.board_id)
        && let Some(board) = Board::find_by_id(&deployment.db().pool, board_id).await?
    {
        deployment
            .activity()
            .record(CreateActivity {
                workspace_id,
                user_id: user.id,
                action: ActivityAction::ReorderColumns,
                entity_type: ActivityEntityType::Board,
                entity_id: board.id,
                entity_title: board.name,
                detail: None,
            })
            .await;
    }

    Ok(ResponseJson(ApiResponse::success(columns)))
}

pub async fn update_column(
    Extension(column): Extension<Column>,
    Extension(user): Extension<AuthUser>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<UpdateColumnRequest>,
) -> Result<ResponseJson<ApiResponse<Column>>, ApiError> {
    payload.validate()?;
    let workspace_id =
        access::ensure_column_access(&deployment.db().pool, column.id, user.id).await?;

    let updated = Column::update(
        &deployment.db().pool,
        column.id,
        &UpdateColumn {
            title: payload.title,
        },
    )
    .await?;

    deployment
        .activity()
        .record(CreateActivity {
            workspace_id,
            user_id: user.id,
            action: ActivityAction::UpdateColumn,
            entity_type: ActivityEntityType::Column,
            entity_id: updated.id,
            entity_title: updated.title.clone(),
            detail: None,
        })
        .await;

    Ok(ResponseJson(ApiResponse::success(updated)))
}

pub async fn delete_column(
    Extension(column): Extension<Column>,
    Extension(user): Extension<AuthUser>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let workspace_id =
        access::ensure_column_access(&deployment.db().pool, column.id, user.id).await?;

    let tx = deployment.db().pool.begin().await?;
    Column::delete(&tx, column.id).await?;
    tx.commit().await?;

    deployment
        .activity()
        .record(CreateActivity {
            workspace_id,
            user_id: user.id,
            action: ActivityAction::DeleteColumn,
            entity_type: ActivityEntityType::Column,
            entity_id: column.id,
            entity_title: column.title.clone(),
            detail: None,
        })
        .await;

    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn create_task(
    Extension(column): Extension<Column>,
    Extension(user): Extension<AuthUser>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<TaskWithLabels>>), ApiError> {
    payload.validate()?;
    let workspace_id =
        access::ensure_column_access(&deployment.db().pool, column.id, user.id).await?;

    let tx = deployment.db().pool.begin().await?;
    let task = Task::create(
        &tx,
        column.id,
        &CreateTask {
            title: payload.title,
            description: payload.description,
            priority: payload.priority,
            due_date: payload.due_date,
            label_ids: payload.label_ids,
        },
        user.id,
        Uuid::new_v4(),
    )
    .await?;
    tx.commit().await?;

    deployment
        .activity()
        .record(CreateActivity {
            workspace_id,
            user_id: user.id,
            action: ActivityAction::CreateTask,
            entity_type: ActivityEntityType::Task,
            entity_id: task.id,
            entity_title: task.title.clone(),
            detail: None,
        })
        .await;

    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(task))))
}

/// Full reorder of one column's tasks; the correction mechanism for any
/// position drift accumulated by moves.
pub async fn reorder_tasks(
    Extension(column): Extension<Column>,
    Extension(user): Extension<AuthUser>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<ReorderRequest>,
) -> Result<ResponseJson<ApiResponse<Vec<TaskWithLabels>>>, ApiError> {
    let workspace_id =
        access::ensure_column_access(&deployment.db().pool, column.id, user.id).await?;

    let tx = deployment.db().pool.begin().await?;
    let tasks = Task::reorder(&tx, &payload.ordered_ids).await?;
    tx.commit().await?;

    deployment
        .activity()
        .record(CreateActivity {
            workspace_id,
            user_id: user.id,
            action: ActivityAction::ReorderTasks,
            entity_type: ActivityEntityType::Column,
            entity_id: column.id,
            entity_title: column.title.clone(),
            detail: None,
        })
        .await;

    Ok(ResponseJson(ApiResponse::success(tasks)))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let column_id_router = Router::new()
        .route("/", put(update_column))
        .route("/", delete(delete_column))
        .route("/tasks", post(create_task))
        .route("/tasks/reorder", patch(reorder_tasks))
        .layer(from_fn_with_state(
            deployment.clone(),
            load_column_middleware::<DeploymentImpl>,
        ));

    Router::new()
        .route("/columns/reorder", patch(reorder_columns))
        .nest("/columns/{column_id}", column_id_router)
}
