use std::sync::Arc;

use tracing::info;
use uptime_admin::{
    build_app,
    clock::{Clock, SystemClock},
    config::Config,
    domain::registry::InMemoryMonitorRegistry,
    logging, AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = Config::from_env()?;
    let bind_socket = config.bind_socket()?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let monitors = Arc::new(InMemoryMonitorRegistry::new(clock.clone()));
    let state = AppState::new(
        config.instance_name.clone(),
        config.admin_secret.clone(),
        clock,
        monitors,
    );
    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(bind_socket).await?;

    info!(
        bind_addr = %config.bind_addr,
        bind_port = config.bind_port,
        instance = %config.instance_name,
        "server starting"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
