use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, ExprTrait};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::column,
    events::{ColumnEventPayload, EVENT_COLUMN_CREATED, EVENT_COLUMN_DELETED},
    models::{
        event_outbox::EventOutbox,
        ids,
        task::{Task, TaskWithLabels},
    },
};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Column {
    pub id: Uuid,
    pub board_id: Uuid,
    pub title: String,
    pub order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ColumnWithTasks {
    #[serde(flatten)]
    #[ts(flatten)]
    pub column: Column,
    pub tasks: Vec<TaskWithLabels>,
}

impl std::ops::Deref for ColumnWithTasks {
    type Target = Column;
    fn deref(&self) -> &Self::Target {
        &self.column
    }
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateColumn {
    pub title: String,
}

#[derive(Debug, Deserialize, TS)]
pub struct UpdateColumn {
    pub title: Option<String>,
}

impl Column {
    async fn from_model<C: ConnectionTrait>(db: &C, model: column::Model) -> Result<Self, DbErr> {
        let board_id = ids::board_uuid_by_id(db, model.board_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Board not found".to_string()))?;

        Ok(Self {
            id: model.uuid,
            board_id,
            title: model.title,
            order: model.order,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = column::Entity::find()
            .filter(column::Column::Uuid.eq(id))
            .one(db)
            .await?;

        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_by_board_id<C: ConnectionTrait>(
        db: &C,
        board_id: Uuid,
    ) -> Result<Vec<ColumnWithTasks>, DbErr> {
        let board_row_id = ids::board_id_by_uuid(db, board_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Board not found".to_string()))?;

        let models = column::Entity::find()
            .filter(column::Column::BoardId.eq(board_row_id))
            .order_by_asc(column::Column::Order)
            .all(db)
            .await?;

        let mut columns = Vec::with_capacity(models.len());
        for model in models {
            let tasks = Task::find_by_column_row_id(db, model.id).await?;
            columns.push(ColumnWithTasks {
                column: Self::from_model(db, model).await?,
                tasks,
            });
        }
        Ok(columns)
    }

    /// Resolves the owning board without loading the full row.
    pub async fn board_uuid_of<C: ConnectionTrait>(
        db: &C,
        column_id: Uuid,
    ) -> Result<Option<Uuid>, DbErr> {
        let board_row_id: Option<i64> = column::Entity::find()
            .select_only()
            .column(column::Column::BoardId)
            .filter(column::Column::Uuid.eq(column_id))
            .into_tuple()
            .one(db)
            .await?;

        match board_row_id {
            Some(id) => ids::board_uuid_by_id(db, id).await,
            None => Ok(None),
        }
    }

    /// Next free position at the end of the board's column sequence.
    pub(crate) async fn next_order<C: ConnectionTrait>(
        db: &C,
        board_row_id: i64,
    ) -> Result<i32, DbErr> {
        let last = column::Entity::find()
            .filter(column::Column::BoardId.eq(board_row_id))
            .order_by_desc(column::Column::Order)
            .one(db)
            .await?;
        Ok(last.map(|model| model.order + 1).unwrap_or(0))
    }

    /// New columns are always appended at the end of their board.
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        board_id: Uuid,
        data: &CreateColumn,
        column_id: Uuid,
    ) -> Result<Self, DbErr> {
        let board_row_id = ids::board_id_by_uuid(db, board_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Board not found".to_string()))?;
        let order = Self::next_order(db, board_row_id).await?;

        let now = Utc::now();
        let active = column::ActiveModel {
            uuid: Set(column_id),
            board_id: Set(board_row_id),
            title: Set(data.title.clone()),
            order: Set(order),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        let payload = serde_json::to_value(ColumnEventPayload {
            column_id,
            board_id,
        })
        .map_err(|err| DbErr::Custom(err.to_string()))?;
        EventOutbox::enqueue(db, EVENT_COLUMN_CREATED, "column", column_id, payload).await?;
        Self::from_model(db, model).await
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        data: &UpdateColumn,
    ) -> Result<Self, DbErr> {
        let record = column::Entity::find()
            .filter(column::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Column not found".to_string()))?;

        let mut active: column::ActiveModel = record.into();
        if let Some(title) = data.title.clone() {
            active.title = Set(title);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(db).await?;
        Self::from_model(db, updated).await
    }

    /// Deletes the column (tasks cascade) and closes the position gap so the
    /// remaining columns stay a contiguous 0..n-1 sequence.
    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let record = column::Entity::find()
            .filter(column::Column::Uuid.eq(id))
            .one(db)
            .await?;

        let Some(record) = record else {
            return Ok(0);
        };

        let board_row_id = record.board_id;
        let removed_order = record.order;
        let board_id = ids::board_uuid_by_id(db, board_row_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Board not found".to_string()))?;

        let result = column::Entity::delete_many()
            .filter(column::Column::Uuid.eq(id))
            .exec(db)
            .await?;

        column::Entity::update_many()
            .col_expr(
                column::Column::Order,
                Expr::col(column::Column::Order).sub(1),
            )
            .filter(column::Column::BoardId.eq(board_row_id))
            .filter(column::Column::Order.gt(removed_order))
            .exec(db)
            .await?;

        if result.rows_affected > 0 {
            let payload = serde_json::to_value(ColumnEventPayload {
                column_id: id,
                board_id,
            })
            .map_err(|err| DbErr::Custom(err.to_string()))?;
            EventOutbox::enqueue(db, EVENT_COLUMN_DELETED, "column", id, payload).await?;
        }

        Ok(result.rows_affected)
    }

    /// Assigns `order = index` for every id in the caller's desired ordering.
    /// The board scope is resolved from the first id; callers are responsible
    /// for ensuring all ids belong to that board.
    pub async fn reorder<C: ConnectionTrait>(
        db: &C,
        ordered_ids: &[Uuid],
    ) -> Result<Vec<Self>, DbErr> {
        let first = ordered_ids
            .first()
            .ok_or(DbErr::RecordNotFound("Column not found".to_string()))?;
        let board_row_id: i64 = column::Entity::find()
            .select_only()
            .column(column::Column::BoardId)
            .filter(column::Column::Uuid.eq(*first))
            .into_tuple()
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Column not found".to_string()))?;

        let now = Utc::now();
        for (index, id) in ordered_ids.iter().enumerate() {
            column::Entity::update_many()
                .col_expr(column::Column::Order, Expr::value(index as i32))
                .col_expr(column::Column::UpdatedAt, Expr::value(now))
                .filter(column::Column::Uuid.eq(*id))
                .exec(db)
                .await?;
        }

        let models = column::Entity::find()
            .filter(column::Column::BoardId.eq(board_row_id))
            .order_by_asc(column::Column::Order)
            .all(db)
            .await?;

        let mut columns = Vec::with_capacity(models.len());
        for model in models {
            columns.push(Self::from_model(db, model).await?);
        }
        Ok(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        DBService,
        models::{
            board::{Board, CreateBoard},
            user::{CreateUser, User},
            workspace::{CreateWorkspace, Workspace},
        },
    };

    async fn setup_board(db: &DBService) -> Board {
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

        Board::create(
            &db.pool,
            workspace.id,
            &CreateBoard {
                name: "Sprint1".to_string(),
                description: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap()
    }

    async fn column_orders(db: &DBService, board_id: Uuid) -> Vec<(String, i32)> {
        Column::find_by_board_id(&db.pool, board_id)
            .await
            .unwrap()
            .into_iter()
            .map(|col| (col.title.clone(), col.order))
            .collect()
    }

    #[tokio::test]
    async fn create_appends_at_end_of_board() {
        let db = DBService::new_in_memory().await.unwrap();
        let board = setup_board(&db).await;

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
        assert_eq!(todo.order, 0);

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
        assert_eq!(done.order, 1);
    }

    #[tokio::test]
    async fn reorder_assigns_positions_by_index() {
        let db = DBService::new_in_memory().await.unwrap();
        let board = setup_board(&db).await;

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

        let reordered = Column::reorder(&db.pool, &[done.id, todo.id]).await.unwrap();
        assert_eq!(reordered.len(), 2);
        assert_eq!(
            column_orders(&db, board.id).await,
            vec![("Done".to_string(), 0), ("Todo".to_string(), 1)]
        );
    }

    #[tokio::test]
    async fn reorder_is_idempotent() {
        let db = DBService::new_in_memory().await.unwrap();
        let board = setup_board(&db).await;

        let mut ids = Vec::new();
        for title in ["A", "B", "C"] {
            let col = Column::create(
                &db.pool,
                board.id,
                &CreateColumn {
                    title: title.to_string(),
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap();
            ids.push(col.id);
        }

        let desired = vec![ids[2], ids[0], ids[1]];
        Column::reorder(&db.pool, &desired).await.unwrap();
        let first_pass = column_orders(&db, board.id).await;

        Column::reorder(&db.pool, &desired).await.unwrap();
        assert_eq!(column_orders(&db, board.id).await, first_pass);
        assert_eq!(
            first_pass,
            vec![
                ("C".to_string(), 0),
                ("A".to_string(), 1),
                ("B".to_string(), 2)
            ]
        );
    }

    #[tokio::test]
    async fn reorder_rejects_empty_and_unknown_input() {
        let db = DBService::new_in_memory().await.unwrap();

        assert!(matches!(
            Column::reorder(&db.pool, &[]).await,
            Err(DbErr::RecordNotFound(_))
        ));
        assert!(matches!(
            Column::reorder(&db.pool, &[Uuid::new_v4()]).await,
            Err(DbErr::RecordNotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_closes_the_position_gap() {
        let db = DBService::new_in_memory().await.unwrap();
        let board = setup_board(&db).await;

        let mut ids = Vec::new();
        for title in ["A", "B", "C", "D"] {
            let col = Column::create(
                &db.pool,
                board.id,
                &CreateColumn {
                    title: title.to_string(),
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap();
            ids.push(col.id);
        }

        let removed = Column::delete(&db.pool, ids[1]).await.unwrap();
        assert_eq!(removed, 1);

        assert_eq!(
            column_orders(&db, board.id).await,
            vec![
                ("A".to_string(), 0),
                ("C".to_string(), 1),
                ("D".to_string(), 2)
            ]
        );
    }
}
