use db::{
    DBService, DbErr,
    models::activity::{Activity, ActivityWithActor, CreateActivity},
};
use uuid::Uuid;

pub const DEFAULT_ACTIVITY_LIMIT: u64 = 20;

#[derive(Clone)]
pub struct ActivityService {
    db: DBService,
}

impl ActivityService {
    pub fn new(db: DBService) -> Self {
        Self { db }
    }

    /// Post-commit side effect. A failed write must never fail the operation
    /// that caused it, so errors are logged and discarded here.
    pub async fn record(&self, data: CreateActivity) {
        if let Err(err) = Activity::create(&self.db.pool, &data).await {
            tracing::warn!(
                action = %data.action,
                entity_id = %data.entity_id,
                error = %err,
                "Failed to record activity"
            );
        }
    }

    pub async fn list(
        &self,
        workspace_id: Uuid,
        limit: Option<u64>,
    ) -> Result<Vec<ActivityWithActor>, DbErr> {
        Activity::list_for_workspace(
            &self.db.pool,
            workspace_id,
            limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use db::{
        models::{
            user::{CreateUser, User},
            workspace::{CreateWorkspace, Workspace},
        },
        types::{ActivityAction, ActivityEntityType},
    };

    use super::*;

    #[tokio::test]
    async fn record_swallows_failures() {
        let db = DBService::new_in_memory().await.unwrap();
        let service = ActivityService::new(db);

        // Nonexistent workspace: the write fails internally but the side
        // effect must not propagate an error.
        service
            .record(CreateActivity {
                workspace_id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                action: ActivityAction::CreateTask,
                entity_type: ActivityEntityType::Task,
                entity_id: Uuid::new_v4(),
                entity_title: "ghost".to_string(),
                detail: None,
            })
            .await;
    }

    #[tokio::test]
    async fn list_uses_default_limit() {
        let db = DBService::new_in_memory().await.unwrap();

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

        let service = ActivityService::new(db);
        for index in 0..(DEFAULT_ACTIVITY_LIMIT + 5) {
            service
                .record(CreateActivity {
                    workspace_id: workspace.id,
                    user_id: user.id,
                    action: ActivityAction::CreateTask,
                    entity_type: ActivityEntityType::Task,
                    entity_id: Uuid::new_v4(),
                    entity_title: format!("Task {index}"),
                    detail: None,
                })
                .await;
        }

        let entries = service.list(workspace.id, None).await.unwrap();
        assert_eq!(entries.len(), DEFAULT_ACTIVITY_LIMIT as usize);
    }
}
