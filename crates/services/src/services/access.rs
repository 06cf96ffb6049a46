use db::{
    DbErr, DbPool,
    models::{board::Board, column::Column, label::Label, task::Task, workspace::Workspace},
};
use thiserror::Error;
use uuid::Uuid;

/// Single choke point answering "may this user operate on this entity?".
///
/// Nested entities are resolved upward one hop at a time
/// (task -> column -> board -> workspace) before the owner check. A missing
/// link anywhere in the chain is a not-found; an existing workspace owned by
/// someone else is a denial with a message that does not confirm what exists.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Workspace not found or access denied")]
    Denied,
}

pub async fn ensure_workspace_owner(
    db: &DbPool,
    workspace_id: Uuid,
    user_id: Uuid,
) -> Result<(), AccessError> {
    match Workspace::owner_uuid(db, workspace_id).await? {
        None => Err(AccessError::NotFound("Workspace")),
        Some(owner) if owner != user_id => Err(AccessError::Denied),
        Some(_) => Ok(()),
    }
}

/// Checks board access and returns the enclosing workspace id.
pub async fn ensure_board_access(
    db: &DbPool,
    board_id: Uuid,
    user_id: Uuid,
) -> Result<Uuid, AccessError> {
    let workspace_id = Board::workspace_uuid_of(db, board_id)
        .await?
        .ok_or(AccessError::NotFound("Board"))?;
    ensure_workspace_owner(db, workspace_id, user_id).await?;
    Ok(workspace_id)
}

/// Checks column access and returns the enclosing workspace id.
pub async fn ensure_column_access(
    db: &DbPool,
    column_id: Uuid,
    user_id: Uuid,
) -> Result<Uuid, AccessError> {
    let board_id = Column::board_uuid_of(db, column_id)
        .await?
        .ok_or(AccessError::NotFound("Column"))?;
    ensure_board_access(db, board_id, user_id).await
}

/// Checks task access and returns the enclosing workspace id.
pub async fn ensure_task_access(
    db: &DbPool,
    task_id: Uuid,
    user_id: Uuid,
) -> Result<Uuid, AccessError> {
    let column_id = Task::column_uuid_of(db, task_id)
        .await?
        .ok_or(AccessError::NotFound("Task"))?;
    ensure_column_access(db, column_id, user_id).await
}

/// Checks label access and returns the enclosing workspace id.
pub async fn ensure_label_access(
    db: &DbPool,
    label_id: Uuid,
    user_id: Uuid,
) -> Result<Uuid, AccessError> {
    let workspace_id = Label::workspace_uuid_of(db, label_id)
        .await?
        .ok_or(AccessError::NotFound("Label"))?;
    ensure_workspace_owner(db, workspace_id, user_id).await?;
    Ok(workspace_id)
}

#[cfg(test)]
mod tests {
    use db::{
        DBService,
        models::{
            board::{Board, CreateBoard},
            column::{Column, CreateColumn},
            task::{CreateTask, Task},
            user::{CreateUser, User},
            workspace::{CreateWorkspace, Workspace},
        },
    };

    use super::*;

    async fn make_user(db: &DBService, name: &str) -> User {
        User::create(
            &db.pool,
            &CreateUser {
                name: name.to_string(),
                email: format!("{name}@example.com"),
                password_hash: "hash".to_string(),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn ownership_chain_resolves_from_task_to_workspace() {
        let db = DBService::new_in_memory().await.unwrap();
        let owner = make_user(&db, "owner").await;
        let intruder = make_user(&db, "intruder").await;

        let workspace = Workspace::create(
            &db.pool,
            &CreateWorkspace {
                name: "Workspace".to_string(),
                description: None,
            },
            Uuid::new_v4(),
            owner.id,
        )
        .await
        .unwrap();
        let board = Board::create(
            &db.pool,
            workspace.id,
            &CreateBoard {
                name: "Board".to_string(),
                description: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let column = Column::create(
            &db.pool,
            board.id,
            &CreateColumn {
                title: "Todo".to_string(),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let task = Task::create(
            &db.pool,
            column.id,
            &CreateTask::from_title("Task".to_string()),
            owner.id,
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let resolved = ensure_task_access(&db.pool, task.id, owner.id).await.unwrap();
        assert_eq!(resolved, workspace.id);

        assert!(matches!(
            ensure_task_access(&db.pool, task.id, intruder.id).await,
            Err(AccessError::Denied)
        ));
    }

    #[tokio::test]
    async fn missing_links_report_not_found() {
        let db = DBService::new_in_memory().await.unwrap();
        let user = make_user(&db, "user").await;

        assert!(matches!(
            ensure_workspace_owner(&db.pool, Uuid::new_v4(), user.id).await,
            Err(AccessError::NotFound("Workspace"))
        ));
        assert!(matches!(
            ensure_board_access(&db.pool, Uuid::new_v4(), user.id).await,
            Err(AccessError::NotFound("Board"))
        ));
        assert!(matches!(
            ensure_column_access(&db.pool, Uuid::new_v4(), user.id).await,
            Err(AccessError::NotFound("Column"))
        ));
        assert!(matches!(
            ensure_task_access(&db.pool, Uuid::new_v4(), user.id).await,
            Err(AccessError::NotFound("Task"))
        ));
    }
}
