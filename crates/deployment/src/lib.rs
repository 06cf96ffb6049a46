use async_trait::async_trait;
use db::{DBService, DbErr};
use services::services::{
    activity::ActivityService, board_hub::BoardHub, config::Config, events::EventService,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Dependency seam for everything the request handlers need. Constructed
/// once at startup and cloned into the router state; there is no
/// module-level mutable state anywhere behind it.
#[async_trait]
pub trait Deployment: Clone + Send + Sync + 'static {
    async fn new() -> Result<Self, DeploymentError>;

    fn config(&self) -> &Config;

    fn db(&self) -> &DBService;

    fn events(&self) -> &EventService;

    fn activity(&self) -> &ActivityService;

    fn hub(&self) -> &BoardHub;
}
