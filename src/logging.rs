use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

const MONITOR_ROUTE_PREFIX: &str = "/monitors/{id}";

pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

/// Logs one summary line per admin request, tagged with the matched route and, for
/// per-monitor routes, the monitor id as given in the path.
pub async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string());
    let started_at = Instant::now();

    let response = next.run(request).await;
    let status = response.status();
    let monitor_id = route
        .as_deref()
        .and_then(|route| monitor_id_segment(route, &path));

    info!(
        method = %method,
        route = route.as_deref().unwrap_or("unmatched"),
        monitor_id,
        status = status.as_u16(),
        duration_ms = started_at.elapsed().as_millis(),
        "request summary"
    );

    match status.as_u16() {
        401 => warn!(method = %method, path = %path, "authentication failure"),
        404 if monitor_id.is_some() => {
            debug!(method = %method, monitor_id, "monitor not found")
        }
        400..=499 => debug!(method = %method, path = %path, "request rejected"),
        _ => {}
    }

    response
}

fn monitor_id_segment<'a>(route: &str, path: &'a str) -> Option<&'a str> {
    if !route.starts_with(MONITOR_ROUTE_PREFIX) {
        return None;
    }
    path.split('/').nth(2).filter(|segment| !segment.is_empty())
}
