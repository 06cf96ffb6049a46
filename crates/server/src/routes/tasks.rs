use axum::{
    Extension, Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, patch},
};
use chrono::{DateTime, Utc};
use db::TransactionTrait;
use db::models::{
    activity::CreateActivity,
    column::Column,
    task::{Task, TaskWithLabels, UpdateTask},
};
use db::types::{ActivityAction, ActivityEntityType, Priority};
use deployment::Deployment;
use serde::Deserialize;
use services::services::access;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;
use validator::Validate;

use crate::{
    DeploymentImpl, error::ApiError, middleware::auth::AuthUser,
    middleware::model_loaders::load_task_middleware,
};

#[derive(Debug, Deserialize, Validate, TS)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "Task title must be 1-200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,
    pub priority: Option<Priority>,
    /// Missing field keeps the current due date, explicit `null` clears it.
    #[serde(default, deserialize_with = "db::models::task::double_option")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub label_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize, Validate, TS)]
pub struct MoveTaskRequest {
    pub column_id: Uuid,
    #[validate(range(min = 0, message = "Order must be a non-negative integer"))]
    pub order: i32,
}

pub async fn get_task(
    Extension(task): Extension<TaskWithLabels>,
    Extension(user): Extension<AuthUser>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<TaskWithLabels>>, ApiError> {
    access::ensure_task_access(&deployment.db().pool, task.id, user.id).await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn update_task(
    Extension(task): Extension<TaskWithLabels>,
    Extension(user): Extension<AuthUser>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<UpdateTaskRequest>,
) -> Result<ResponseJson<ApiResponse<TaskWithLabels>>, ApiError> {
    payload.validate()?;
    let workspace_id =
        access::ensure_task_access(&deployment.db().pool, task.id, user.id).await?;

    let tx = deployment.db().pool.begin().await?;
    let updated = Task::update(
        &tx,
        task.id,
        &UpdateTask {
            title: payload.title,
            description: payload.description,
            priority: payload.priority,
            due_date: payload.due_date,
            label_ids: payload.label_ids,
        },
    )
    .await?;
    tx.commit().await?;

    deployment
        .activity()
        .record(CreateActivity {
            workspace_id,
            user_id: user.id,
            action: ActivityAction::UpdateTask,
            entity_type: ActivityEntityType::Task,
            entity_id: updated.id,
            entity_title: updated.title.clone(),
            detail: None,
        })
        .await;

    Ok(ResponseJson(ApiResponse::success(updated)))
}

pub async fn delete_task(
    Extension(task): Extension<TaskWithLabels>,
    Extension(user): Extension<AuthUser>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let workspace_id =
        access::ensure_task_access(&deployment.db().pool, task.id, user.id).await?;

    let tx = deployment.db().pool.begin().await?;
    Task::delete(&tx, task.id).await?;
    tx.commit().await?;

    deployment
        .activity()
        .record(CreateActivity {
            workspace_id,
            user_id: user.id,
            action: ActivityAction::DeleteTask,
            entity_type: ActivityEntityType::Task,
            entity_id: task.id,
            entity_title: task.title.clone(),
            detail: None,
        })
        .await;

    Ok(ResponseJson(ApiResponse::success(())))
}

/// Relocate a task to a destination column at a caller-supplied index. The
/// index is the client's reconciled position; siblings are not renumbered.
pub async fn move_task(
    Extension(task): Extension<TaskWithLabels>,
    Extension(user): Extension<AuthUser>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<MoveTaskRequest>,
) -> Result<ResponseJson<ApiResponse<TaskWithLabels>>, ApiError> {
    payload.validate()?;
    access::ensure_task_access(&deployment.db().pool, task.id, user.id).await?;
    // The destination column has its own ownership chain.
    let workspace_id =
        access::ensure_column_access(&deployment.db().pool, payload.column_id, user.id).await?;

    let dest_column = Column::find_by_id(&deployment.db().pool, payload.column_id)
        .await?
        .ok_or(ApiError::NotFound("Column not found".to_string()))?;

    let tx = deployment.db().pool.begin().await?;
    let moved = Task::move_to(&tx, task.id, payload.column_id, payload.order).await?;
    tx.commit().await?;

    deployment
        .activity()
        .record(CreateActivity {
            workspace_id,
            user_id: user.id,
            action: ActivityAction::MoveTask,
            entity_type: ActivityEntityType::Task,
            entity_id: moved.id,
            entity_title: moved.title.clone(),
            detail: Some(format!(
                "to \"{}\" at position {}",
                dest_column.title, payload.order
            )),
        })
        .await;

    Ok(ResponseJson(ApiResponse::success(moved)))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let task_id_router = Router::new()
        .route("/", get(get_task).put(update_task).delete(delete_task))
        .route("/move", patch(move_task))
        .layer(from_fn_with_state(deployment.clone(), load_task_middleware::<DeploymentImpl>));

    Router::new().nest("/tasks/{task_id}", task_id_router)
}
