use async_trait::async_trait;
use db::DBService;
use deployment::{Deployment, DeploymentError};
use services::services::{
    activity::ActivityService, board_hub::BoardHub, config::Config, events::EventService,
};

/// Single-process deployment: one database pool, one in-process board hub.
#[derive(Clone)]
pub struct LocalDeployment {
    config: Config,
    db: DBService,
    events: EventService,
    activity: ActivityService,
    hub: BoardHub,
}

#[async_trait]
impl Deployment for LocalDeployment {
    async fn new() -> Result<Self, DeploymentError> {
        let config = Config::from_env();
        let db = DBService::new(&config.database_url).await?;
        let hub = BoardHub::new();
        let events = EventService::new(db.clone(), hub.clone());
        let activity = ActivityService::new(db.clone());

        Ok(Self {
            config,
            db,
            events,
            activity,
            hub,
        })
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn db(&self) -> &DBService {
        &self.db
    }

    fn events(&self) -> &EventService {
        &self.events
    }

    fn activity(&self) -> &ActivityService {
        &self.activity
    }

    fn hub(&self) -> &BoardHub {
        &self.hub
    }
}
