use std::time::Duration;

use db::{
    DBService, DbErr,
    events::{
        ColumnEventPayload, EVENT_COLUMN_CREATED, EVENT_COLUMN_DELETED, EVENT_TASK_CREATED,
        EVENT_TASK_DELETED, EVENT_TASK_MOVED, EVENT_TASK_UPDATED, TaskEventPayload,
        TaskMovedPayload,
    },
    models::event_outbox::EventOutbox,
};
use thiserror::Error;
use uuid::Uuid;

use crate::services::board_hub::{BoardEvent, BoardHub};

const OUTBOX_POLL_INTERVAL: Duration = Duration::from_millis(250);
const OUTBOX_BATCH_LIMIT: u64 = 100;

#[derive(Debug, Error)]
pub enum EventError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Parse(#[from] serde_json::Error),
}

/// Publishes committed outbox entries to the board hub. Entries are written
/// in the same transaction as the mutation they describe; this worker runs
/// after commit, records failures on the entry, and retries on the next pass.
#[derive(Clone)]
pub struct EventService {
    db: DBService,
    hub: BoardHub,
}

impl EventService {
    pub fn new(db: DBService, hub: BoardHub) -> Self {
        let service = Self { db, hub };
        service.spawn_outbox_worker();
        service
    }

    pub fn hub(&self) -> &BoardHub {
        &self.hub
    }

    fn spawn_outbox_worker(&self) {
        let service = self.clone();
        tokio::spawn(async move {
            service.run_outbox_loop().await;
        });
    }

    async fn run_outbox_loop(&self) {
        loop {
            if let Err(err) = self.flush_pending().await {
                tracing::error!(error = %err, "event outbox flush failed");
            }
            tokio::time::sleep(OUTBOX_POLL_INTERVAL).await;
        }
    }

    async fn flush_pending(&self) -> Result<(), EventError> {
        let entries = EventOutbox::fetch_unpublished(&self.db.pool, OUTBOX_BATCH_LIMIT).await?;
        if entries.is_empty() {
            return Ok(());
        }

        for entry in entries {
            match self.dispatch_entry(&entry).await {
                Ok(()) => {
                    EventOutbox::mark_published(&self.db.pool, entry.id).await?;
                }
                Err(err) => {
                    let err_msg = err.to_string();
                    tracing::warn!(
                        event_id = entry.uuid.to_string(),
                        error = %err_msg,
                        "event dispatch failed"
                    );
                    EventOutbox::mark_failed(&self.db.pool, entry.id, &err_msg).await?;
                }
            }
        }

        Ok(())
    }

    async fn dispatch_entry(
        &self,
        entry: &db::entities::event_outbox::Model,
    ) -> Result<(), EventError> {
        let board_id = board_id_of(entry)?;
        let Some(board_id) = board_id else {
            tracing::debug!(event_type = entry.event_type.as_str(), "unknown event type");
            return Ok(());
        };

        self.hub
            .broadcast(
                board_id,
                BoardEvent {
                    event: entry.event_type.clone(),
                    board_id,
                    payload: entry.payload.clone(),
                },
            )
            .await;
        Ok(())
    }
}

/// Every known event payload carries the enclosing board id, which scopes
/// delivery to clients subscribed to that board.
fn board_id_of(entry: &db::entities::event_outbox::Model) -> Result<Option<Uuid>, EventError> {
    let board_id = match entry.event_type.as_str() {
        EVENT_TASK_CREATED | EVENT_TASK_UPDATED | EVENT_TASK_DELETED => {
            let payload: TaskEventPayload = serde_json::from_value(entry.payload.clone())?;
            Some(payload.board_id)
        }
        EVENT_TASK_MOVED => {
            let payload: TaskMovedPayload = serde_json::from_value(entry.payload.clone())?;
            Some(payload.board_id)
        }
        EVENT_COLUMN_CREATED | EVENT_COLUMN_DELETED => {
            let payload: ColumnEventPayload = serde_json::from_value(entry.payload.clone())?;
            Some(payload.board_id)
        }
        _ => None,
    };
    Ok(board_id)
}

#[cfg(test)]
mod tests {
    use db::models::{
        board::{Board, CreateBoard},
        column::{Column, CreateColumn},
        user::{CreateUser, User},
        workspace::{CreateWorkspace, Workspace},
    };

    use super::*;

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

    #[tokio::test]
    async fn flush_publishes_outbox_entries_to_the_board_channel() {
        let db = DBService::new_in_memory().await.unwrap();
        let board = setup_board(&db).await;

        let hub = BoardHub::new();
        let mut rx = hub.subscribe(board.id).await;
        let service = EventService {
            db: db.clone(),
            hub,
        };

        // Column::create enqueued a column:created entry.
        Column::create(
            &db.pool,
            board.id,
            &CreateColumn {
                title: "Todo".to_string(),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        service.flush_pending().await.unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event, EVENT_COLUMN_CREATED);
        assert_eq!(event.board_id, board.id);

        assert!(
            EventOutbox::fetch_unpublished(&db.pool, 10)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn malformed_payloads_are_recorded_and_retried() {
        let db = DBService::new_in_memory().await.unwrap();

        EventOutbox::enqueue(
            &db.pool,
            EVENT_TASK_CREATED,
            "task",
            Uuid::new_v4(),
            serde_json::Value::Null,
        )
        .await
        .unwrap();

        let service = EventService {
            db: db.clone(),
            hub: BoardHub::new(),
        };
        service.flush_pending().await.unwrap();

        let pending = EventOutbox::fetch_unpublished(&db.pool, 10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].attempts, 1);
        assert!(pending[0].last_error.is_some());
    }

    #[tokio::test]
    async fn unknown_event_types_are_drained() {
        let db = DBService::new_in_memory().await.unwrap();

        EventOutbox::enqueue(
            &db.pool,
            "workspace:renamed",
            "workspace",
            Uuid::new_v4(),
            serde_json::Value::Null,
        )
        .await
        .unwrap();

        let service = EventService {
            db: db.clone(),
            hub: BoardHub::new(),
        };
        service.flush_pending().await.unwrap();

        assert!(
            EventOutbox::fetch_unpublished(&db.pool, 10)
                .await
                .unwrap()
                .is_empty()
        );
    }
}
