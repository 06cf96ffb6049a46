use sea_orm::entity::prelude::*;

use crate::types::{ActivityAction, ActivityEntityType};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "activities")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub uuid: Uuid,
    pub workspace_id: i64,
    pub user_id: i64,
    pub action: ActivityAction,
    pub entity_type: ActivityEntityType,
    pub entity_uuid: Uuid,
    pub entity_title: String,
    pub detail: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
