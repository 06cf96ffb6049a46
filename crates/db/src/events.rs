use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const EVENT_TASK_CREATED: &str = "task:created";
pub const EVENT_TASK_UPDATED: &str = "task:updated";
pub const EVENT_TASK_DELETED: &str = "task:deleted";
pub const EVENT_TASK_MOVED: &str = "task:moved";

pub const EVENT_COLUMN_CREATED: &str = "column:created";
pub const EVENT_COLUMN_DELETED: &str = "column:deleted";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEventPayload {
    pub task_id: Uuid,
    pub column_id: Uuid,
    pub board_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskMovedPayload {
    pub task_id: Uuid,
    pub from_column_id: Uuid,
    pub to_column_id: Uuid,
    pub board_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnEventPayload {
    pub column_id: Uuid,
    pub board_id: Uuid,
}
