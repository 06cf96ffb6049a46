use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde_json::Value;
use uuid::Uuid;

use crate::entities::event_outbox;

/// Transactional event outbox. Rows are written in the same transaction as
/// the mutation that caused them and published by the event dispatch worker.
pub struct EventOutbox;

impl EventOutbox {
    pub async fn enqueue<C: ConnectionTrait>(
        db: &C,
        event_type: &str,
        entity_type: &str,
        entity_uuid: Uuid,
        payload: Value,
    ) -> Result<(), DbErr> {
        let active = event_outbox::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            event_type: Set(event_type.to_string()),
            entity_type: Set(entity_type.to_string()),
            entity_uuid: Set(entity_uuid),
            payload: Set(payload),
            created_at: Set(Utc::now()),
            published_at: Set(None),
            attempts: Set(0),
            last_error: Set(None),
            ..Default::default()
        };

        active.insert(db).await?;
        Ok(())
    }

    pub async fn fetch_unpublished<C: ConnectionTrait>(
        db: &C,
        limit: u64,
    ) -> Result<Vec<event_outbox::Model>, DbErr> {
        event_outbox::Entity::find()
            .filter(event_outbox::Column::PublishedAt.is_null())
            .order_by_asc(event_outbox::Column::CreatedAt)
            .limit(limit)
            .all(db)
            .await
    }

    pub async fn mark_published<C: ConnectionTrait>(db: &C, id: i64) -> Result<(), DbErr> {
        let record = event_outbox::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound(
                "Event outbox record not found".to_string(),
            ))?;

        let mut active: event_outbox::ActiveModel = record.into();
        active.published_at = Set(Some(Utc::now()));
        active.update(db).await?;
        Ok(())
    }

    pub async fn mark_failed<C: ConnectionTrait>(db: &C, id: i64, error: &str) -> Result<(), DbErr> {
        let record = event_outbox::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound(
                "Event outbox record not found".to_string(),
            ))?;

        let attempts = record.attempts + 1;
        let mut active: event_outbox::ActiveModel = record.into();
        active.attempts = Set(attempts);
        active.last_error = Set(Some(error.to_string()));
        active.update(db).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DBService;

    #[tokio::test]
    async fn outbox_enqueue_fetch_and_marking() {
        let db = DBService::new_in_memory().await.unwrap();

        let first = Uuid::new_v4();
        EventOutbox::enqueue(
            &db.pool,
            "test:first",
            "test",
            first,
            serde_json::json!({ "value": 1 }),
        )
        .await
        .unwrap();

        let second = Uuid::new_v4();
        EventOutbox::enqueue(
            &db.pool,
            "test:second",
            "test",
            second,
            serde_json::json!({ "value": 2 }),
        )
        .await
        .unwrap();

        let entries = EventOutbox::fetch_unpublished(&db.pool, 10).await.unwrap();
        assert_eq!(entries.len(), 2);

        let first_id = entries
            .iter()
            .find(|entry| entry.entity_uuid == first)
            .map(|entry| entry.id)
            .expect("first entry");
        let second_id = entries
            .iter()
            .find(|entry| entry.entity_uuid == second)
            .map(|entry| entry.id)
            .expect("second entry");

        EventOutbox::mark_published(&db.pool, first_id).await.unwrap();
        let entries = EventOutbox::fetch_unpublished(&db.pool, 10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entity_uuid, second);

        EventOutbox::mark_failed(&db.pool, second_id, "hub unavailable")
            .await
            .unwrap();
        let failed = EventOutbox::fetch_unpublished(&db.pool, 10)
            .await
            .unwrap()
            .into_iter()
            .find(|entry| entry.id == second_id)
            .expect("failed entry still unpublished");
        assert_eq!(failed.attempts, 1);
        assert_eq!(failed.last_error.as_deref(), Some("hub unavailable"));

        EventOutbox::mark_published(&db.pool, second_id).await.unwrap();
        assert!(
            EventOutbox::fetch_unpublished(&db.pool, 10)
                .await
                .unwrap()
                .is_empty()
        );
    }
}
