use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post, put},
    Router,
};

pub mod auth;
pub mod clock;
pub mod config;
pub mod domain;
pub mod errors;
pub mod http;
pub mod logging;
pub mod session;

use clock::Clock;
use domain::registry::MonitorStore;
use session::SessionAuthority;

#[derive(Clone)]
pub struct AppState {
    pub instance_name: Arc<str>,
    pub clock: Arc<dyn Clock>,
    pub sessions: Arc<SessionAuthority>,
    pub monitors: Arc<dyn MonitorStore>,
}

impl AppState {
    pub fn new(
        instance_name: String,
        admin_secret: String,
        clock: Arc<dyn Clock>,
        monitors: Arc<dyn MonitorStore>,
    ) -> Self {
        Self {
            instance_name: Arc::<str>::from(instance_name),
            sessions: Arc::new(SessionAuthority::new(admin_secret, clock.clone())),
            clock,
            monitors,
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/monitors",
            put(http::handlers::create_monitor).get(http::handlers::list_monitors),
        )
        .route(
            "/monitors/{id}",
            get(http::handlers::get_monitor).delete(http::handlers::delete_monitor),
        )
        .route("/monitors/{id}/toggle", patch(http::handlers::toggle_monitor))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ));

    Router::new()
        .route("/health", get(http::handlers::health))
        .route("/create-session", post(http::handlers::create_session))
        .merge(protected)
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}
