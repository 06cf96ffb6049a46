use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::{activity, user},
    models::ids,
    types::{ActivityAction, ActivityEntityType},
};

/// Append-only audit record. Rows are never updated or deleted outside of
/// workspace cascade deletion.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Activity {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub action: ActivityAction,
    pub entity_type: ActivityEntityType,
    pub entity_id: Uuid,
    pub entity_title: String,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ActivityWithActor {
    #[serde(flatten)]
    #[ts(flatten)]
    pub activity: Activity,
    pub actor_name: String,
    pub actor_image: Option<String>,
}

impl std::ops::Deref for ActivityWithActor {
    type Target = Activity;
    fn deref(&self) -> &Self::Target {
        &self.activity
    }
}

#[derive(Debug, Clone)]
pub struct CreateActivity {
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub action: ActivityAction,
    pub entity_type: ActivityEntityType,
    pub entity_id: Uuid,
    pub entity_title: String,
    pub detail: Option<String>,
}

impl Activity {
    async fn from_model<C: ConnectionTrait>(db: &C, model: activity::Model) -> Result<Self, DbErr> {
        let workspace_id = ids::workspace_uuid_by_id(db, model.workspace_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Workspace not found".to_string()))?;
        let user_id = ids::user_uuid_by_id(db, model.user_id)
            .await?
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;

        Ok(Self {
            id: model.uuid,
            workspace_id,
            user_id,
            action: model.action,
            entity_type: model.entity_type,
            entity_id: model.entity_uuid,
            entity_title: model.entity_title,
            detail: model.detail,
            created_at: model.created_at,
        })
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateActivity,
    ) -> Result<Self, DbErr> {
        let workspace_row_id = ids::workspace_id_by_uuid(db, data.workspace_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Workspace not found".to_string()))?;
        let user_row_id = ids::user_id_by_uuid(db, data.user_id)
            .await?
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;

        let active = activity::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            workspace_id: Set(workspace_row_id),
            user_id: Set(user_row_id),
            action: Set(data.action.clone()),
            entity_type: Set(data.entity_type.clone()),
            entity_uuid: Set(data.entity_id),
            entity_title: Set(data.entity_title.clone()),
            detail: Set(data.detail.clone()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        Self::from_model(db, model).await
    }

    /// Most-recent-first feed with actor display name and avatar.
    pub async fn list_for_workspace<C: ConnectionTrait>(
        db: &C,
        workspace_id: Uuid,
        limit: u64,
    ) -> Result<Vec<ActivityWithActor>, DbErr> {
        let workspace_row_id = ids::workspace_id_by_uuid(db, workspace_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Workspace not found".to_string()))?;

        let models = activity::Entity::find()
            .filter(activity::Column::WorkspaceId.eq(workspace_row_id))
            .order_by_desc(activity::Column::CreatedAt)
            .order_by_desc(activity::Column::Id)
            .limit(limit)
            .all(db)
            .await?;

        let mut actor_cache: HashMap<i64, (String, Option<String>)> = HashMap::new();
        let mut entries = Vec::with_capacity(models.len());
        for model in models {
            let actor = if let Some(actor) = actor_cache.get(&model.user_id) {
                actor.clone()
            } else {
                let record = user::Entity::find_by_id(model.user_id)
                    .one(db)
                    .await?
                    .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;
                let actor = (record.name, record.image);
                actor_cache.insert(model.user_id, actor.clone());
                actor
            };

            entries.push(ActivityWithActor {
                activity: Self::from_model(db, model).await?,
                actor_name: actor.0,
                actor_image: actor.1,
            });
        }

        Ok(entries)
    }
}
