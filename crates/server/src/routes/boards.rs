use axum::{
    Extension, Json, Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Json as ResponseJson},
    routing::{get, post},
};
use db::TransactionTrait;
use db::models::{
    activity::CreateActivity,
    board::{Board, BoardWithColumns, UpdateBoard},
    column::{Column, CreateColumn},
};
use db::types::{ActivityAction, ActivityEntityType};
use deployment::Deployment;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use services::services::access;
use tokio::sync::broadcast;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;
use validator::Validate;

use crate::{
    DeploymentImpl, error::ApiError, middleware::auth::AuthUser,
    middleware::model_loaders::load_board_middleware,
};

#[derive(Debug, Deserialize, Validate, TS)]
pub struct UpdateBoardRequest {
    #[validate(length(min = 1, max = 100, message = "Board name must be 1-100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, TS)]
pub struct CreateColumnRequest {
    #[validate(length(min = 1, max = 100, message = "Column title must be 1-100 characters"))]
    pub title: String,
}

pub async fn get_board(
    Extension(board): Extension<Board>,
    Extension(user): Extension<AuthUser>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<BoardWithColumns>>, ApiError> {
    access::ensure_board_access(&deployment.db().pool, board.id, user.id).await?;

    let board = Board::find_with_columns(&deployment.db().pool, board.id)
        .await?
        .ok_or(ApiError::NotFound("Board not found".to_string()))?;
    Ok(ResponseJson(ApiResponse::success(board)))
}

pub async fn update_board(
    Extension(board): Extension<Board>,
    Extension(user): Extension<AuthUser>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<UpdateBoardRequest>,
) -> Result<ResponseJson<ApiResponse<Board>>, ApiError> {
    payload.validate()?;
    let workspace_id =
        access::ensure_board_access(&deployment.db().pool, board.id, user.id).await?;

    let updated = Board::update(
        &deployment.db().pool,
        board.id,
        &UpdateBoard {
            name: payload.name,
            description: payload.description,
        },
    )
    .await?;

    deployment
        .activity()
        .record(CreateActivity {
            workspace_id,
            user_id: user.id,
            action: ActivityAction::UpdateBoard,
            entity_type: ActivityEntityType::Board,
            entity_id: updated.id,
            entity_title: updated.name.clone(),
            detail: None,
        })
        .await;

    Ok(ResponseJson(ApiResponse::success(updated)))
}

pub async fn delete_board(
    Extension(board): Extension<Board>,
    Extension(user): Extension<AuthUser>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let workspace_id =
        access::ensure_board_access(&deployment.db().pool, board.id, user.id).await?;

    Board::delete(&deployment.db().pool, board.id).await?;

    deployment
        .activity()
        .record(CreateActivity {
            workspace_id,
            user_id: user.id,
            action: ActivityAction::DeleteBoard,
            entity_type: ActivityEntityType::Board,
            entity_id: board.id,
            entity_title: board.name.clone(),
            detail: None,
        })
        .await;

    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn create_column(
    Extension(board): Extension<Board>,
    Extension(user): Extension<AuthUser>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateColumnRequest>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Column>>), ApiError> {
    payload.validate()?;
    let workspace_id =
        access::ensure_board_access(&deployment.db().pool, board.id, user.id).await?;

    let tx = deployment.db().pool.begin().await?;
    let column = Column::create(
        &tx,
        board.id,
        &CreateColumn {
            title: payload.title,
        },
        Uuid::new_v4(),
    )
    .await?;
    tx.commit().await?;

    deployment
        .activity()
        .record(CreateActivity {
            workspace_id,
            user_id: user.id,
            action: ActivityAction::CreateColumn,
            entity_type: ActivityEntityType::Column,
            entity_id: column.id,
            entity_title: column.title.clone(),
            detail: None,
        })
        .await;

    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success(column)),
    ))
}

pub async fn stream_board_ws(
    ws: WebSocketUpgrade,
    Extension(board): Extension<Board>,
    Extension(user): Extension<AuthUser>,
    State(deployment): State<DeploymentImpl>,
) -> Result<impl IntoResponse, ApiError> {
    access::ensure_board_access(&deployment.db().pool, board.id, user.id).await?;

    Ok(ws.on_upgrade(move |socket| async move {
        if let Err(e) = handle_board_ws(socket, deployment, board.id).await {
            tracing::warn!("board WS closed: {}", e);
        }
    }))
}

async fn handle_board_ws(
    socket: WebSocket,
    deployment: DeploymentImpl,
    board_id: Uuid,
) -> anyhow::Result<()> {
    let mut events = deployment.hub().subscribe(board_id).await;

    let (mut sender, mut receiver) = socket.split();

    // Drain (and ignore) any client->server messages so pings/pongs work.
    tokio::spawn(async move { while let Some(Ok(_)) = receiver.next().await {} });

    loop {
        match events.recv().await {
            Ok(event) => {
                let text = serde_json::to_string(&event)?;
                if sender.send(Message::Text(text.into())).await.is_err() {
                    break; // client disconnected
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "board event stream lagged");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    let _ = sender.close().await;
    Ok(())
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let board_id_router = Router::new()
        .route("/", get(get_board).put(update_board).delete(delete_board))
        .route("/columns", post(create_column))
        .route("/stream/ws", get(stream_board_ws))
        .layer(from_fn_with_state(deployment.clone(), load_board_middleware::<DeploymentImpl>));

    Router::new().nest("/boards/{board_id}", board_id_router)
}
