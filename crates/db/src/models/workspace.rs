use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Alias, Expr, ExprTrait, JoinType, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, Iterable, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::{board, column, task, workspace},
    models::ids,
    types::Priority,
};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Workspace {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct WorkspaceWithBoardCount {
    #[serde(flatten)]
    #[ts(flatten)]
    pub workspace: Workspace,
    pub board_count: u64,
}

impl std::ops::Deref for WorkspaceWithBoardCount {
    type Target = Workspace;
    fn deref(&self) -> &Self::Target {
        &self.workspace
    }
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateWorkspace {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, TS)]
pub struct UpdateWorkspace {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct PriorityCount {
    pub priority: Priority,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ColumnCount {
    pub column_title: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct WorkspaceAnalytics {
    pub tasks_by_priority: Vec<PriorityCount>,
    pub tasks_by_column: Vec<ColumnCount>,
}

impl Workspace {
    async fn from_model<C: ConnectionTrait>(db: &C, model: workspace::Model) -> Result<Self, DbErr> {
        let owner_id = ids::user_uuid_by_id(db, model.user_id)
            .await?
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;

        Ok(Self {
            id: model.uuid,
            owner_id,
            name: model.name,
            description: model.description,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = workspace::Entity::find()
            .filter(workspace::Column::Uuid.eq(id))
            .one(db)
            .await?;

        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    /// Newest-first listing of the workspaces owned by one user, with board
    /// counts for the dashboard.
    pub async fn find_by_owner<C: ConnectionTrait>(
        db: &C,
        owner_id: Uuid,
    ) -> Result<Vec<WorkspaceWithBoardCount>, DbErr> {
        let user_row_id = match ids::user_id_by_uuid(db, owner_id).await? {
            Some(id) => id,
            None => return Ok(Vec::new()),
        };

        let models = workspace::Entity::find()
            .filter(workspace::Column::UserId.eq(user_row_id))
            .order_by_desc(workspace::Column::CreatedAt)
            .all(db)
            .await?;

        let mut workspaces = Vec::with_capacity(models.len());
        for model in models {
            let board_count = board::Entity::find()
                .filter(board::Column::WorkspaceId.eq(model.id))
                .count(db)
                .await?;
            workspaces.push(WorkspaceWithBoardCount {
                workspace: Self::from_model(db, model).await?,
                board_count,
            });
        }
        Ok(workspaces)
    }

    /// Owner of the workspace, or `None` when the workspace does not exist.
    pub async fn owner_uuid<C: ConnectionTrait>(
        db: &C,
        workspace_id: Uuid,
    ) -> Result<Option<Uuid>, DbErr> {
        let user_row_id: Option<i64> = workspace::Entity::find()
            .select_only()
            .column(workspace::Column::UserId)
            .filter(workspace::Column::Uuid.eq(workspace_id))
            .into_tuple()
            .one(db)
            .await?;

        match user_row_id {
            Some(id) => ids::user_uuid_by_id(db, id).await,
            None => Ok(None),
        }
    }

    /// Single choke point for the ownership check. Missing workspaces report
    /// `false` rather than an error so callers present one uniform
    /// "not found or no access" answer.
    pub async fn is_owner<C: ConnectionTrait>(
        db: &C,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, DbErr> {
        Ok(Self::owner_uuid(db, workspace_id).await? == Some(user_id))
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateWorkspace,
        workspace_id: Uuid,
        owner_id: Uuid,
    ) -> Result<Self, DbErr> {
        let user_row_id = ids::user_id_by_uuid(db, owner_id)
            .await?
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;

        let now = Utc::now();
        let active = workspace::ActiveModel {
            uuid: Set(workspace_id),
            user_id: Set(user_row_id),
            name: Set(data.name.clone()),
            description: Set(data.description.clone()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        Self::from_model(db, model).await
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        data: &UpdateWorkspace,
    ) -> Result<Self, DbErr> {
        let record = workspace::Entity::find()
            .filter(workspace::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Workspace not found".to_string()))?;

        let mut active: workspace::ActiveModel = record.into();
        if let Some(name) = data.name.clone() {
            active.name = Set(name);
        }
        if let Some(description) = data.description.clone() {
            active.description = Set(Some(description));
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(db).await?;
        Self::from_model(db, updated).await
    }

    /// Cascades to boards, columns, tasks, labels, and activities through the
    /// schema's foreign keys.
    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let result = workspace::Entity::delete_many()
            .filter(workspace::Column::Uuid.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Task counts grouped by priority and by column title, aggregated across
    /// every board in the workspace.
    pub async fn analytics<C: ConnectionTrait>(
        db: &C,
        workspace_id: Uuid,
    ) -> Result<WorkspaceAnalytics, DbErr> {
        let workspace_row_id = ids::workspace_id_by_uuid(db, workspace_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Workspace not found".to_string()))?;

        let priority_stmt = Query::select()
            .column((task::Entity, task::Column::Priority))
            .expr_as(
                Expr::col((task::Entity, task::Column::Id)).count(),
                Alias::new("task_count"),
            )
            .from(task::Entity)
            .join(
                JoinType::InnerJoin,
                column::Entity,
                Expr::col((column::Entity, column::Column::Id))
                    .equals((task::Entity, task::Column::ColumnId)),
            )
            .join(
                JoinType::InnerJoin,
                board::Entity,
                Expr::col((board::Entity, board::Column::Id))
                    .equals((column::Entity, column::Column::BoardId)),
            )
            .and_where(Expr::col((board::Entity, board::Column::WorkspaceId)).eq(workspace_row_id))
            .group_by_col((task::Entity, task::Column::Priority))
            .to_owned();

        let mut counts_by_priority: HashMap<String, u64> = HashMap::new();
        for row in db.query_all(&priority_stmt).await? {
            let priority: String = row.try_get("", "priority")?;
            let count: i64 = row.try_get("", "task_count")?;
            counts_by_priority.insert(priority, count as u64);
        }

        // Every priority appears in the result, zero-filled, in enum order.
        let tasks_by_priority = Priority::iter()
            .map(|priority| {
                let count = counts_by_priority
                    .get(&priority.to_string())
                    .copied()
                    .unwrap_or(0);
                PriorityCount { priority, count }
            })
            .collect();

        let column_stmt = Query::select()
            .expr_as(
                Expr::col((column::Entity, column::Column::Title)),
                Alias::new("column_title"),
            )
            .expr_as(
                Expr::col((task::Entity, task::Column::Id)).count(),
                Alias::new("task_count"),
            )
            .from(task::Entity)
            .join(
                JoinType::InnerJoin,
                column::Entity,
                Expr::col((column::Entity, column::Column::Id))
                    .equals((task::Entity, task::Column::ColumnId)),
            )
            .join(
                JoinType::InnerJoin,
                board::Entity,
                Expr::col((board::Entity, board::Column::Id))
                    .equals((column::Entity, column::Column::BoardId)),
            )
            .and_where(Expr::col((board::Entity, board::Column::WorkspaceId)).eq(workspace_row_id))
            .group_by_col((column::Entity, column::Column::Title))
            .to_owned();

        let mut tasks_by_column = Vec::new();
        for row in db.query_all(&column_stmt).await? {
            let column_title: String = row.try_get("", "column_title")?;
            let count: i64 = row.try_get("", "task_count")?;
            tasks_by_column.push(ColumnCount {
                column_title,
                count: count as u64,
            });
        }
        tasks_by_column.sort_by(|a, b| a.column_title.cmp(&b.column_title));

        Ok(WorkspaceAnalytics {
            tasks_by_priority,
            tasks_by_column,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        DBService,
        models::{
            board::{Board, CreateBoard},
            column::{Column, CreateColumn},
            task::{CreateTask, Task},
            user::{CreateUser, User},
        },
    };

    async fn make_user(db: &DBService, name: &str) -> crate::models::user::User {
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
    async fn is_owner_is_false_for_missing_workspace_and_other_users() {
        let db = DBService::new_in_memory().await.unwrap();
        let alice = make_user(&db, "alice").await;
        let mallory = make_user(&db, "mallory").await;

        let workspace = Workspace::create(
            &db.pool,
            &CreateWorkspace {
                name: "Alice's".to_string(),
                description: None,
            },
            Uuid::new_v4(),
            alice.id,
        )
        .await
        .unwrap();

        assert!(Workspace::is_owner(&db.pool, workspace.id, alice.id)
            .await
            .unwrap());
        assert!(!Workspace::is_owner(&db.pool, workspace.id, mallory.id)
            .await
            .unwrap());
        // Nonexistent workspace answers false rather than erroring.
        assert!(!Workspace::is_owner(&db.pool, Uuid::new_v4(), alice.id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn listing_is_scoped_to_the_owner() {
        let db = DBService::new_in_memory().await.unwrap();
        let alice = make_user(&db, "alice").await;
        let bob = make_user(&db, "bob").await;

        Workspace::create(
            &db.pool,
            &CreateWorkspace {
                name: "Alice's".to_string(),
                description: None,
            },
            Uuid::new_v4(),
            alice.id,
        )
        .await
        .unwrap();

        let mine = Workspace::find_by_owner(&db.pool, alice.id).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].board_count, 0);

        assert!(Workspace::find_by_owner(&db.pool, bob.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn analytics_counts_by_priority_and_column_title() {
        let db = DBService::new_in_memory().await.unwrap();
        let user = make_user(&db, "owner").await;

        let workspace = Workspace::create(
            &db.pool,
            &CreateWorkspace {
                name: "Workspace".to_string(),
                description: None,
            },
            Uuid::new_v4(),
            user.id,
        )
        .await
        .unwrap();
        let board = Board::create(
            &db.pool,
            workspace.id,
            &CreateBoard {
                name: "Sprint1".to_string(),
                description: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let todo = Column::create(
            &db.pool,
            board.id,
            &CreateColumn {
                title: "Todo".to_string(),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let done = Column::create(
            &db.pool,
            board.id,
            &CreateColumn {
                title: "Done".to_string(),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        for (column, priority) in [
            (&todo, Priority::Low),
            (&todo, Priority::Urgent),
            (&done, Priority::Urgent),
        ] {
            Task::create(
                &db.pool,
                column.id,
                &CreateTask {
                    title: "Task".to_string(),
                    description: None,
                    priority: Some(priority),
                    due_date: None,
                    label_ids: None,
                },
                user.id,
                Uuid::new_v4(),
            )
            .await
            .unwrap();
        }

        let analytics = Workspace::analytics(&db.pool, workspace.id).await.unwrap();

        let by_priority: HashMap<Priority, u64> = analytics
            .tasks_by_priority
            .iter()
            .map(|entry| (entry.priority.clone(), entry.count))
            .collect();
        assert_eq!(by_priority.get(&Priority::Low), Some(&1));
        assert_eq!(by_priority.get(&Priority::Medium), Some(&0));
        assert_eq!(by_priority.get(&Priority::High), Some(&0));
        assert_eq!(by_priority.get(&Priority::Urgent), Some(&2));

        let by_column: HashMap<String, u64> = analytics
            .tasks_by_column
            .iter()
            .map(|entry| (entry.column_title.clone(), entry.count))
            .collect();
        assert_eq!(by_column.get("Todo"), Some(&2));
        assert_eq!(by_column.get("Done"), Some(&1));
    }
}
