use axum::{Router, middleware::from_fn_with_state, routing::get};

use crate::{DeploymentImpl, middleware::auth::require_auth, routes};

pub fn router(deployment: DeploymentImpl) -> Router {
    let protected_routes = Router::new()
        .merge(routes::auth::router())
        .merge(routes::workspaces::router(&deployment))
        .merge(routes::boards::router(&deployment))
        .merge(routes::columns::router(&deployment))
        .merge(routes::tasks::router(&deployment))
        .merge(routes::labels::router(&deployment))
        .layer(from_fn_with_state(deployment.clone(), require_auth));

    let api_routes = Router::new()
        .merge(routes::auth::public_router())
        .merge(protected_routes);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api_routes)
        .with_state(deployment)
}
