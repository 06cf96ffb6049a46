use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    TS,
    EnumString,
    Display,
    Default,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
    #[default]
    #[sea_orm(string_value = "low")]
    Low,
    #[sea_orm(string_value = "medium")]
    Medium,
    #[sea_orm(string_value = "high")]
    High,
    #[sea_orm(string_value = "urgent")]
    Urgent,
}

#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    TS,
    EnumString,
    Display,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActivityAction {
    #[sea_orm(string_value = "create_task")]
    CreateTask,
    #[sea_orm(string_value = "update_task")]
    UpdateTask,
    #[sea_orm(string_value = "delete_task")]
    DeleteTask,
    #[sea_orm(string_value = "move_task")]
    MoveTask,
    #[sea_orm(string_value = "create_board")]
    CreateBoard,
    #[sea_orm(string_value = "update_board")]
    UpdateBoard,
    #[sea_orm(string_value = "delete_board")]
    DeleteBoard,
    #[sea_orm(string_value = "create_column")]
    CreateColumn,
    #[sea_orm(string_value = "update_column")]
    UpdateColumn,
    #[sea_orm(string_value = "delete_column")]
    DeleteColumn,
    #[sea_orm(string_value = "reorder_columns")]
    ReorderColumns,
    #[sea_orm(string_value = "reorder_tasks")]
    ReorderTasks,
}

#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    TS,
    EnumString,
    Display,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ActivityEntityType {
    #[sea_orm(string_value = "task")]
    Task,
    #[sea_orm(string_value = "board")]
    Board,
    #[sea_orm(string_value = "column")]
    Column,
}
