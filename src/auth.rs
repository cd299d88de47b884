use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    extract::CookieJar,
    headers::{authorization::Bearer, Authorization},
    typed_header::TypedHeaderRejection,
    TypedHeader,
};

use crate::{errors::AppError, AppState};

pub const SESSION_COOKIE: &str = "token";

/// Accepts the session token from `Authorization: Bearer` or the `token` cookie, header first.
///
/// An `Authorization` header with another scheme (e.g. `Basic`) is ignored and the cookie
/// is used instead.
pub async fn require_session(
    State(state): State<AppState>,
    auth_header: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    cookies: CookieJar,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = match auth_header {
        Ok(TypedHeader(auth)) => Some(auth.token().to_string()),
        Err(rejection) if rejection.is_missing() || !has_bearer_scheme(request.headers()) => {
            cookies
                .get(SESSION_COOKIE)
                .map(|cookie| cookie.value().to_string())
        }
        Err(_) => {
            return Err(AppError::unauthorized(
                "invalid_token",
                "malformed bearer token",
            ));
        }
    };

    let Some(token) = token.filter(|token| !token.is_empty()) else {
        return Err(AppError::unauthorized(
            "missing_token",
            "missing session token (log in via /create-session)",
        ));
    };

    let Some(session) = state.sessions.lookup(&token).await else {
        return Err(AppError::unauthorized(
            "invalid_token",
            "invalid session token",
        ));
    };

    if !session.is_valid_at(state.clock.now()) {
        return Err(AppError::unauthorized(
            "expired_token",
            "session token has expired",
        ));
    }

    Ok(next.run(request).await)
}

fn has_bearer_scheme(headers: &HeaderMap) -> bool {
    headers
        .get(AUTHORIZATION)
        .map(|value| value.as_bytes())
        .and_then(|value| value.get(..6))
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case(b"bearer"))
}
