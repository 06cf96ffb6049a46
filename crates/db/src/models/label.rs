use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::label,
    models::ids,
};

/// Workspace-scoped colored tag.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Label {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateLabel {
    pub name: String,
    pub color: String,
}

#[derive(Debug, Deserialize, TS)]
pub struct UpdateLabel {
    pub name: Option<String>,
    pub color: Option<String>,
}

impl Label {
    pub(crate) async fn from_model<C: ConnectionTrait>(
        db: &C,
        model: label::Model,
    ) -> Result<Self, DbErr> {
        let workspace_id = ids::workspace_uuid_by_id(db, model.workspace_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Workspace not found".to_string()))?;

        Ok(Self {
            id: model.uuid,
            workspace_id,
            name: model.name,
            color: model.color,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = label::Entity::find()
            .filter(label::Column::Uuid.eq(id))
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
    ) -> Result<Vec<Self>, DbErr> {
        let workspace_row_id = ids::workspace_id_by_uuid(db, workspace_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Workspace not found".to_string()))?;

        let models = label::Entity::find()
            .filter(label::Column::WorkspaceId.eq(workspace_row_id))
            .order_by_asc(label::Column::CreatedAt)
            .all(db)
            .await?;

        let mut labels = Vec::with_capacity(models.len());
        for model in models {
            labels.push(Self::from_model(db, model).await?);
        }
        Ok(labels)
    }

    /// Resolves the owning workspace without loading the full row.
    pub async fn workspace_uuid_of<C: ConnectionTrait>(
        db: &C,
        label_id: Uuid,
    ) -> Result<Option<Uuid>, DbErr> {
        let workspace_row_id: Option<i64> = label::Entity::find()
            .select_only()
            .column(label::Column::WorkspaceId)
            .filter(label::Column::Uuid.eq(label_id))
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
        data: &CreateLabel,
        label_id: Uuid,
    ) -> Result<Self, DbErr> {
        let workspace_row_id = ids::workspace_id_by_uuid(db, workspace_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Workspace not found".to_string()))?;

        let now = Utc::now();
        let active = label::ActiveModel {
            uuid: Set(label_id),
            workspace_id: Set(workspace_row_id),
            name: Set(data.name.clone()),
            color: Set(data.color.clone()),
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
        data: &UpdateLabel,
    ) -> Result<Self, DbErr> {
        let record = label::Entity::find()
            .filter(label::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Label not found".to_string()))?;

        let mut active: label::ActiveModel = record.into();
        if let Some(name) = data.name.clone() {
            active.name = Set(name);
        }
        if let Some(color) = data.color.clone() {
            active.color = Set(color);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(db).await?;
        Self::from_model(db, updated).await
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let result = label::Entity::delete_many()
            .filter(label::Column::Uuid.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}
