use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::{board, column},
    models::{
        column::{Column, ColumnWithTasks},
        ids,
    },
};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Board {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct BoardWithColumnCount {
    #[serde(flatten)]
    #[ts(flatten)]
    pub board: Board,
    pub column_count: u64,
}

impl std::ops::Deref for BoardWithColumnCount {
    type Target = Board;
    fn deref(&self) -> &Self::Target {
        &self.board
    }
}

/// Full board tree: columns in position order, each with its tasks in
/// position order, each with its labels.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct BoardWithColumns {
    #[serde(flatten)]
    #[ts(flatten)]
    pub board: Board,
    pub columns: Vec<ColumnWithTasks>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateBoard {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, TS)]
pub struct UpdateBoard {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl Board {
    async fn from_model<C: ConnectionTrait>(db: &C, model: board::Model) -> Result<Self, DbErr> {
        let workspace_id = ids::workspace_uuid_by_id(db, model.workspace_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Workspace not found".to_string()))?;

        Ok(Self {
            id: model.uuid,
            workspace_id,
            name: model.name,
            description: model.description,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = board::Entity::find()
            .filter(board::Column::Uuid.eq(id))
            .one(db)
            .await?;

        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_by_workspace_id<C: ConnectionTrait>(
        db: &C,
        workspace_id: Uuid,
    ) -> Result<Vec<BoardWithColumnCount>, DbErr> {
        let workspace_row_id = ids::workspace_id_by_uuid(db, workspace_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Workspace not found".to_string()))?;

        let models = board::Entity::find()
            .filter(board::Column::WorkspaceId.eq(workspace_row_id))
            .order_by_desc(board::Column::CreatedAt)
            .all(db)
            .await?;

        let mut boards = Vec::with_capacity(models.len());
        for model in models {
            let column_count = column::Entity::find()
                .filter(column::Column::BoardId.eq(model.id))
                .count(db)
                .await?;
            boards.push(BoardWithColumnCount {
                board: Self::from_model(db, model).await?,
                column_count,
            });
        }
        Ok(boards)
    }

    pub async fn find_with_columns<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<Option<BoardWithColumns>, DbErr> {
        let Some(board) = Self::find_by_id(db, id).await? else {
            return Ok(None);
        };

        let columns = Column::find_by_board_id(db, id).await?;
        Ok(Some(BoardWithColumns { board, columns }))
    }

    /// Resolves the owning workspace without loading the full row.
    pub async fn workspace_uuid_of<C: ConnectionTrait>(
        db: &C,
        board_id: Uuid,
    ) -> Result<Option<Uuid>, DbErr> {
        let workspace_row_id: Option<i64> = board::Entity::find()
            .select_only()
            .column(board::Column::WorkspaceId)
            .filter(board::Column::Uuid.eq(board_id))
            .into_tuple()
            .one(db)
            .await?;

        match workspace_row_id {
            Some(id) => ids::workspace_uuid_by_id(db, id).await,
            None => Ok(None),
        }
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        workspace_id: Uuid,
        data: &CreateBoard,
        board_id: Uuid,
    ) -> Result<Self, DbErr> {
        let workspace_row_id = ids::workspace_id_by_uuid(db, workspace_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Workspace not found".to_string()))?;

        let now = Utc::now();
        let active = board::ActiveModel {
            uuid: Set(board_id),
            workspace_id: Set(workspace_row_id),
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
        data: &UpdateBoard,
    ) -> Result<Self, DbErr> {
        let record = board::Entity::find()
            .filter(board::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Board not found".to_string()))?;

        let mut active: board::ActiveModel = record.into();
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

    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let result = board::Entity::delete_many()
            .filter(board::Column::Uuid.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}
