use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, ExprTrait};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::{column, label, task, task_label},
    events::{
        EVENT_TASK_CREATED, EVENT_TASK_DELETED, EVENT_TASK_MOVED, EVENT_TASK_UPDATED,
        TaskEventPayload, TaskMovedPayload,
    },
    models::{event_outbox::EventOutbox, ids, label::Label},
    types::Priority,
};

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Column not found")]
    ColumnNotFound,
    #[error("Label not found")]
    LabelNotFound,
    #[error("Label belongs to a different workspace")]
    LabelWorkspaceMismatch,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Task {
    pub id: Uuid,
    pub column_id: Uuid,
    pub creator_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct TaskWithLabels {
    #[serde(flatten)]
    #[ts(flatten)]
    pub task: Task,
    pub labels: Vec<Label>,
}

impl std::ops::Deref for TaskWithLabels {
    type Target = Task;
    fn deref(&self) -> &Self::Target {
        &self.task
    }
}

impl std::ops::DerefMut for TaskWithLabels {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.task
    }
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub due_date: Option<DateTime<Utc>>,
    pub label_ids: Option<Vec<Uuid>>,
}

impl CreateTask {
    pub fn from_title(title: String) -> Self {
        Self {
            title,
            description: None,
            priority: None,
            due_date: None,
            label_ids: None,
        }
    }
}

#[derive(Debug, Deserialize, TS)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    /// Missing field keeps the current value, explicit `null` clears it.
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub label_ids: Option<Vec<Uuid>>,
}

/// Deserializer that keeps the absent-vs-null distinction: an absent field
/// stays `None` (via `serde(default)`), an explicit `null` becomes
/// `Some(None)`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}

impl Task {
    async fn from_model<C: ConnectionTrait>(db: &C, model: task::Model) -> Result<Self, DbErr> {
        let column_id = ids::column_uuid_by_id(db, model.column_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Column not found".to_string()))?;
        let creator_id = ids::user_uuid_by_id(db, model.creator_id)
            .await?
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;

        Ok(Self {
            id: model.uuid,
            column_id,
            creator_id,
            title: model.title,
            description: model.description,
            priority: model.priority,
            due_date: model.due_date,
            order: model.order,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }

    async fn with_labels<C: ConnectionTrait>(
        db: &C,
        model: task::Model,
    ) -> Result<TaskWithLabels, DbErr> {
        let labels = Self::labels_for_row(db, model.id).await?;
        Ok(TaskWithLabels {
            task: Self::from_model(db, model).await?,
            labels,
        })
    }

    async fn labels_for_row<C: ConnectionTrait>(
        db: &C,
        task_row_id: i64,
    ) -> Result<Vec<Label>, DbErr> {
        let label_row_ids: Vec<i64> = task_label::Entity::find()
            .select_only()
            .column(task_label::Column::LabelId)
            .filter(task_label::Column::TaskId.eq(task_row_id))
            .into_tuple()
            .all(db)
            .await?;

        if label_row_ids.is_empty() {
            return Ok(Vec::new());
        }

        let models = label::Entity::find()
            .filter(label::Column::Id.is_in(label_row_ids))
            .order_by_asc(label::Column::CreatedAt)
            .all(db)
            .await?;

        let mut labels = Vec::with_capacity(models.len());
        for model in models {
            labels.push(Label::from_model(db, model).await?);
        }
        Ok(labels)
    }

    pub async fn find_by_id<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<Option<TaskWithLabels>, DbErr> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?;

        match record {
            Some(model) => Ok(Some(Self::with_labels(db, model).await?)),
            None => Ok(None),
        }
    }

    pub(crate) async fn find_by_column_row_id<C: ConnectionTrait>(
        db: &C,
        column_row_id: i64,
    ) -> Result<Vec<TaskWithLabels>, DbErr> {
        let models = task::Entity::find()
            .filter(task::Column::ColumnId.eq(column_row_id))
            .order_by_asc(task::Column::Order)
            .all(db)
            .await?;

        let mut tasks = Vec::with_capacity(models.len());
        for model in models {
            tasks.push(Self::with_labels(db, model).await?);
        }
        Ok(tasks)
    }

    pub async fn find_by_column_id<C: ConnectionTrait>(
        db: &C,
        column_id: Uuid,
    ) -> Result<Vec<TaskWithLabels>, DbErr> {
        let column_row_id = ids::column_id_by_uuid(db, column_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Column not found".to_string()))?;
        Self::find_by_column_row_id(db, column_row_id).await
    }

    /// Resolves the owning column without loading the full row.
    pub async fn column_uuid_of<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
    ) -> Result<Option<Uuid>, DbErr> {
        let column_row_id: Option<i64> = task::Entity::find()
            .select_only()
            .column(task::Column::ColumnId)
            .filter(task::Column::Uuid.eq(task_id))
            .into_tuple()
            .one(db)
            .await?;

        match column_row_id {
            Some(id) => ids::column_uuid_by_id(db, id).await,
            None => Ok(None),
        }
    }

    /// Next free position at the end of the column's task sequence.
    pub(crate) async fn next_order<C: ConnectionTrait>(
        db: &C,
        column_row_id: i64,
    ) -> Result<i32, DbErr> {
        let last = task::Entity::find()
            .filter(task::Column::ColumnId.eq(column_row_id))
            .order_by_desc(task::Column::Order)
            .one(db)
            .await?;
        Ok(last.map(|model| model.order + 1).unwrap_or(0))
    }

    /// New tasks are always appended at the end of their column.
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        column_id: Uuid,
        data: &CreateTask,
        creator_id: Uuid,
        task_id: Uuid,
    ) -> Result<TaskWithLabels, TaskError> {
        let column_record = column::Entity::find()
            .filter(column::Column::Uuid.eq(column_id))
            .one(db)
            .await?
            .ok_or(TaskError::ColumnNotFound)?;
        let creator_row_id = ids::user_id_by_uuid(db, creator_id)
            .await?
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;
        let board_id = ids::board_uuid_by_id(db, column_record.board_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Board not found".to_string()))?;
        let order = Self::next_order(db, column_record.id).await?;

        let now = Utc::now();
        let active = task::ActiveModel {
            uuid: Set(task_id),
            column_id: Set(column_record.id),
            creator_id: Set(creator_row_id),
            title: Set(data.title.clone()),
            description: Set(data.description.clone()),
            priority: Set(data.priority.clone().unwrap_or_default()),
            due_date: Set(data.due_date),
            order: Set(order),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        if let Some(label_ids) = &data.label_ids {
            Self::replace_labels(db, model.id, column_record.board_id, label_ids).await?;
        }

        let payload = serde_json::to_value(TaskEventPayload {
            task_id,
            column_id,
            board_id,
        })
        .map_err(|err| DbErr::Custom(err.to_string()))?;
        EventOutbox::enqueue(db, EVENT_TASK_CREATED, "task", task_id, payload).await?;
        Ok(Self::with_labels(db, model).await?)
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        data: &UpdateTask,
    ) -> Result<TaskWithLabels, TaskError> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;

        let column_record = column::Entity::find_by_id(record.column_id)
            .one(db)
            .await?
            .ok_or(TaskError::ColumnNotFound)?;
        let column_id = column_record.uuid;
        let board_id = ids::board_uuid_by_id(db, column_record.board_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Board not found".to_string()))?;

        let task_row_id = record.id;
        let mut active: task::ActiveModel = record.into();
        if let Some(title) = data.title.clone() {
            active.title = Set(title);
        }
        if let Some(description) = data.description.clone() {
            // Empty string clears the description.
            let trimmed_is_empty = description.trim().is_empty();
            active.description = Set(if trimmed_is_empty {
                None
            } else {
                Some(description)
            });
        }
        if let Some(priority) = data.priority.clone() {
            active.priority = Set(priority);
        }
        if let Some(due_date) = data.due_date {
            active.due_date = Set(due_date);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(db).await?;
        if let Some(label_ids) = &data.label_ids {
            Self::replace_labels(db, task_row_id, column_record.board_id, label_ids).await?;
        }

        let payload = serde_json::to_value(TaskEventPayload {
            task_id: id,
            column_id,
            board_id,
        })
        .map_err(|err| DbErr::Custom(err.to_string()))?;
        EventOutbox::enqueue(db, EVENT_TASK_UPDATED, "task", id, payload).await?;
        Ok(Self::with_labels(db, updated).await?)
    }

    /// Deletes the task and closes the position gap in its column.
    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?;

        let Some(record) = record else {
            return Ok(0);
        };

        let column_record = column::Entity::find_by_id(record.column_id)
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Column not found".to_string()))?;
        let board_id = ids::board_uuid_by_id(db, column_record.board_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Board not found".to_string()))?;
        let removed_order = record.order;

        let result = task::Entity::delete_many()
            .filter(task::Column::Uuid.eq(id))
            .exec(db)
            .await?;

        task::Entity::update_many()
            .col_expr(task::Column::Order, Expr::col(task::Column::Order).sub(1))
            .filter(task::Column::ColumnId.eq(column_record.id))
            .filter(task::Column::Order.gt(removed_order))
            .exec(db)
            .await?;

        if result.rows_affected > 0 {
            let payload = serde_json::to_value(TaskEventPayload {
                task_id: id,
                column_id: column_record.uuid,
                board_id,
            })
            .map_err(|err| DbErr::Custom(err.to_string()))?;
            EventOutbox::enqueue(db, EVENT_TASK_DELETED, "task", id, payload).await?;
        }

        Ok(result.rows_affected)
    }

    /// Relocates the task to the destination column at the caller-supplied
    /// index. Siblings are not renumbered here; the index is trusted as the
    /// client's reconciled position and a full reorder is the correction
    /// mechanism for any drift.
    pub async fn move_to<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        dest_column_id: Uuid,
        dest_index: i32,
    ) -> Result<TaskWithLabels, DbErr> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;

        let from_column_id = ids::column_uuid_by_id(db, record.column_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Column not found".to_string()))?;

        let dest_column = column::Entity::find()
            .filter(column::Column::Uuid.eq(dest_column_id))
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Column not found".to_string()))?;
        let board_id = ids::board_uuid_by_id(db, dest_column.board_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Board not found".to_string()))?;

        let mut active: task::ActiveModel = record.into();
        active.column_id = Set(dest_column.id);
        active.order = Set(dest_index);
        active.updated_at = Set(Utc::now());
        let updated = active.update(db).await?;

        let payload = serde_json::to_value(TaskMovedPayload {
            task_id: id,
            from_column_id,
            to_column_id: dest_column_id,
            board_id,
        })
        .map_err(|err| DbErr::Custom(err.to_string()))?;
        EventOutbox::enqueue(db, EVENT_TASK_MOVED, "task", id, payload).await?;

        Self::with_labels(db, updated).await
    }

    /// Assigns `order = index` for every id in the caller's desired ordering.
    /// The column scope is resolved from the first id; callers are
    /// responsible for ensuring all ids belong to that column.
    pub async fn reorder<C: ConnectionTrait>(
        db: &C,
        ordered_ids: &[Uuid],
    ) -> Result<Vec<TaskWithLabels>, DbErr> {
        let first = ordered_ids
            .first()
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;
        let column_row_id: i64 = task::Entity::find()
            .select_only()
            .column(task::Column::ColumnId)
            .filter(task::Column::Uuid.eq(*first))
            .into_tuple()
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;

        let now = Utc::now();
        for (index, id) in ordered_ids.iter().enumerate() {
            task::Entity::update_many()
                .col_expr(task::Column::Order, Expr::value(index as i32))
                .col_expr(task::Column::UpdatedAt, Expr::value(now))
                .filter(task::Column::Uuid.eq(*id))
                .exec(db)
                .await?;
        }

        Self::find_by_column_row_id(db, column_row_id).await
    }

    /// Replaces the task's label set. Every label must belong to the same
    /// workspace as the task's board.
    async fn replace_labels<C: ConnectionTrait>(
        db: &C,
        task_row_id: i64,
        board_row_id: i64,
        label_ids: &[Uuid],
    ) -> Result<(), TaskError> {
        let workspace_row_id: i64 = crate::entities::board::Entity::find_by_id(board_row_id)
            .one(db)
            .await?
            .map(|board| board.workspace_id)
            .ok_or(DbErr::RecordNotFound("Board not found".to_string()))?;

        let mut label_row_ids = Vec::with_capacity(label_ids.len());
        for label_id in label_ids {
            let record = label::Entity::find()
                .filter(label::Column::Uuid.eq(*label_id))
                .one(db)
                .await?
                .ok_or(TaskError::LabelNotFound)?;
            if record.workspace_id != workspace_row_id {
                return Err(TaskError::LabelWorkspaceMismatch);
            }
            label_row_ids.push(record.id);
        }

        task_label::Entity::delete_many()
            .filter(task_label::Column::TaskId.eq(task_row_id))
            .exec(db)
            .await?;

        let now = Utc::now();
        for label_row_id in label_row_ids {
            let active = task_label::ActiveModel {
                uuid: Set(Uuid::new_v4()),
                task_id: Set(task_row_id),
                label_id: Set(label_row_id),
                created_at: Set(now),
                ..Default::default()
            };
            active.insert(db).await?;
        }

        Ok(())
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
            label::{CreateLabel, Label},
            user::{CreateUser, User},
            workspace::{CreateWorkspace, Workspace},
        },
    };

    struct Fixture {
        user: User,
        workspace: Workspace,
        board: Board,
        todo: Column,
        done: Column,
    }

    async fn setup(db: &DBService) -> Fixture {
        let user = User::create(
            &db.pool,
            &CreateUser {
                name: "owner".to_string(),
                email: "owner@example.com".to_string(),
                password_hash: "hash".to_string(),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

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

        Fixture {
            user,
            workspace,
            board,
            todo,
            done,
        }
    }

    async fn add_task(db: &DBService, fixture: &Fixture, column: &Column, title: &str) -> TaskWithLabels {
        Task::create(
            &db.pool,
            column.id,
            &CreateTask::from_title(title.to_string()),
            fixture.user.id,
            Uuid::new_v4(),
        )
        .await
        .unwrap()
    }

    async fn orders(db: &DBService, column: &Column) -> Vec<(String, i32)> {
        Task::find_by_column_id(&db.pool, column.id)
            .await
            .unwrap()
            .into_iter()
            .map(|t| (t.title.clone(), t.order))
            .collect()
    }

    #[tokio::test]
    async fn create_appends_at_end_of_column() {
        let db = DBService::new_in_memory().await.unwrap();
        let fixture = setup(&db).await;

        let a = add_task(&db, &fixture, &fixture.todo, "A").await;
        assert_eq!(a.order, 0);
        let b = add_task(&db, &fixture, &fixture.todo, "B").await;
        assert_eq!(b.order, 1);

        // The other column has its own scope.
        let c = add_task(&db, &fixture, &fixture.done, "C").await;
        assert_eq!(c.order, 0);
    }

    #[tokio::test]
    async fn create_applies_priority_default() {
        let db = DBService::new_in_memory().await.unwrap();
        let fixture = setup(&db).await;

        let task = add_task(&db, &fixture, &fixture.todo, "A").await;
        assert_eq!(task.priority, Priority::Low);
    }

    #[tokio::test]
    async fn move_within_column_uses_supplied_index_without_renumbering() {
        let db = DBService::new_in_memory().await.unwrap();
        let fixture = setup(&db).await;

        let a = add_task(&db, &fixture, &fixture.todo, "A").await;
        let b = add_task(&db, &fixture, &fixture.todo, "B").await;
        let c = add_task(&db, &fixture, &fixture.todo, "C").await;

        let moved = Task::move_to(&db.pool, b.id, fixture.todo.id, 0).await.unwrap();
        assert_eq!(moved.order, 0);
        assert_eq!(moved.title, "B");

        // Siblings keep their previous order values; the caller-supplied
        // index is taken as given.
        let a_after = Task::find_by_id(&db.pool, a.id).await.unwrap().unwrap();
        let c_after = Task::find_by_id(&db.pool, c.id).await.unwrap().unwrap();
        assert_eq!(a_after.order, 0);
        assert_eq!(c_after.order, 2);
    }

    #[tokio::test]
    async fn move_across_columns_preserves_task_identity() {
        let db = DBService::new_in_memory().await.unwrap();
        let fixture = setup(&db).await;

        let task = Task::create(
            &db.pool,
            fixture.todo.id,
            &CreateTask {
                title: "Ship it".to_string(),
                description: Some("details".to_string()),
                priority: Some(Priority::High),
                due_date: None,
                label_ids: None,
            },
            fixture.user.id,
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let moved = Task::move_to(&db.pool, task.id, fixture.done.id, 0).await.unwrap();
        assert_eq!(moved.id, task.id);
        assert_eq!(moved.title, "Ship it");
        assert_eq!(moved.description.as_deref(), Some("details"));
        assert_eq!(moved.priority, Priority::High);
        assert_eq!(moved.column_id, fixture.done.id);
        assert_eq!(moved.order, 0);

        assert!(orders(&db, &fixture.todo).await.is_empty());
        assert_eq!(orders(&db, &fixture.done).await, vec![("Ship it".to_string(), 0)]);
    }

    #[tokio::test]
    async fn move_to_missing_column_is_not_found() {
        let db = DBService::new_in_memory().await.unwrap();
        let fixture = setup(&db).await;
        let task = add_task(&db, &fixture, &fixture.todo, "A").await;

        assert!(matches!(
            Task::move_to(&db.pool, task.id, Uuid::new_v4(), 0).await,
            Err(DbErr::RecordNotFound(_))
        ));
        assert!(matches!(
            Task::move_to(&db.pool, Uuid::new_v4(), fixture.todo.id, 0).await,
            Err(DbErr::RecordNotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_closes_the_position_gap() {
        let db = DBService::new_in_memory().await.unwrap();
        let fixture = setup(&db).await;

        let _a = add_task(&db, &fixture, &fixture.todo, "A").await;
        let b = add_task(&db, &fixture, &fixture.todo, "B").await;
        let _c = add_task(&db, &fixture, &fixture.todo, "C").await;

        assert_eq!(Task::delete(&db.pool, b.id).await.unwrap(), 1);
        assert_eq!(
            orders(&db, &fixture.todo).await,
            vec![("A".to_string(), 0), ("C".to_string(), 1)]
        );
    }

    #[tokio::test]
    async fn reorder_is_idempotent_and_contiguous() {
        let db = DBService::new_in_memory().await.unwrap();
        let fixture = setup(&db).await;

        let a = add_task(&db, &fixture, &fixture.todo, "A").await;
        let b = add_task(&db, &fixture, &fixture.todo, "B").await;
        let c = add_task(&db, &fixture, &fixture.todo, "C").await;

        let desired = vec![c.id, a.id, b.id];
        Task::reorder(&db.pool, &desired).await.unwrap();
        let first_pass = orders(&db, &fixture.todo).await;
        assert_eq!(
            first_pass,
            vec![
                ("C".to_string(), 0),
                ("A".to_string(), 1),
                ("B".to_string(), 2)
            ]
        );

        Task::reorder(&db.pool, &desired).await.unwrap();
        assert_eq!(orders(&db, &fixture.todo).await, first_pass);
    }

    #[tokio::test]
    async fn labels_are_scoped_to_the_workspace() {
        let db = DBService::new_in_memory().await.unwrap();
        let fixture = setup(&db).await;

        let bug = Label::create(
            &db.pool,
            fixture.workspace.id,
            &CreateLabel {
                name: "bug".to_string(),
                color: "#ff0000".to_string(),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let task = Task::create(
            &db.pool,
            fixture.todo.id,
            &CreateTask {
                title: "Fix crash".to_string(),
                description: None,
                priority: None,
                due_date: None,
                label_ids: Some(vec![bug.id]),
            },
            fixture.user.id,
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        assert_eq!(task.labels.len(), 1);
        assert_eq!(task.labels[0].name, "bug");

        // A label from another workspace is rejected.
        let other_owner = User::create(
            &db.pool,
            &CreateUser {
                name: "other".to_string(),
                email: "other@example.com".to_string(),
                password_hash: "hash".to_string(),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let other_workspace = Workspace::create(
            &db.pool,
            &CreateWorkspace {
                name: "Other".to_string(),
                description: None,
            },
            Uuid::new_v4(),
            other_owner.id,
        )
        .await
        .unwrap();
        let foreign = Label::create(
            &db.pool,
            other_workspace.id,
            &CreateLabel {
                name: "foreign".to_string(),
                color: "#00ff00".to_string(),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let result = Task::create(
            &db.pool,
            fixture.todo.id,
            &CreateTask {
                title: "Bad labels".to_string(),
                description: None,
                priority: None,
                due_date: None,
                label_ids: Some(vec![foreign.id]),
            },
            fixture.user.id,
            Uuid::new_v4(),
        )
        .await;
        assert!(matches!(result, Err(TaskError::LabelWorkspaceMismatch)));
    }

    #[tokio::test]
    async fn update_clears_due_date_on_explicit_null() {
        let db = DBService::new_in_memory().await.unwrap();
        let fixture = setup(&db).await;

        let due = Utc::now();
        let task = Task::create(
            &db.pool,
            fixture.todo.id,
            &CreateTask {
                title: "Deadline".to_string(),
                description: None,
                priority: None,
                due_date: Some(due),
                label_ids: None,
            },
            fixture.user.id,
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        assert!(task.due_date.is_some());

        // Field omitted: due date is kept.
        let update: UpdateTask = serde_json::from_str(r#"{"title": "Renamed"}"#).unwrap();
        let updated = Task::update(&db.pool, task.id, &update).await.unwrap();
        assert_eq!(updated.title, "Renamed");
        assert!(updated.due_date.is_some());

        // Explicit null: due date is cleared.
        let update: UpdateTask = serde_json::from_str(r#"{"due_date": null}"#).unwrap();
        let updated = Task::update(&db.pool, task.id, &update).await.unwrap();
        assert!(updated.due_date.is_none());
    }

    #[tokio::test]
    async fn workspace_delete_cascades_to_nested_entities() {
        let db = DBService::new_in_memory().await.unwrap();
        let fixture = setup(&db).await;

        let label = Label::create(
            &db.pool,
            fixture.workspace.id,
            &CreateLabel {
                name: "bug".to_string(),
                color: "#ff0000".to_string(),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let task = Task::create(
            &db.pool,
            fixture.todo.id,
            &CreateTask {
                title: "Doomed".to_string(),
                description: None,
                priority: None,
                due_date: None,
                label_ids: Some(vec![label.id]),
            },
            fixture.user.id,
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        assert_eq!(
            Workspace::delete(&db.pool, fixture.workspace.id).await.unwrap(),
            1
        );

        assert!(Workspace::find_by_id(&db.pool, fixture.workspace.id)
            .await
            .unwrap()
            .is_none());
        assert!(Board::find_by_id(&db.pool, fixture.board.id)
            .await
            .unwrap()
            .is_none());
        assert!(Column::find_by_id(&db.pool, fixture.todo.id)
            .await
            .unwrap()
            .is_none());
        assert!(Task::find_by_id(&db.pool, task.id).await.unwrap().is_none());
        assert!(Label::find_by_id(&db.pool, label.id).await.unwrap().is_none());
    }
}
