//! Shared-secret login and bearer session issuance
//!
//! The authority only answers "is this the secret?" and "which session does this token
//! belong to?". Expiry is checked by the caller against its own clock on every request.

use std::{collections::HashMap, hint::black_box, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use rand::{distr::Alphanumeric, Rng};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

use crate::clock::Clock;

pub const SESSION_TTL_DAYS: i64 = 7;
const TOKEN_LENGTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("unauthorized")]
    Unauthorized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Valid up to and including `expires_at`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now <= self.expires_at
    }
}

pub struct SessionAuthority {
    secret: Arc<str>,
    clock: Arc<dyn Clock>,
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionAuthority {
    pub fn new(secret: impl Into<Arc<str>>, clock: Arc<dyn Clock>) -> Self {
        Self {
            secret: secret.into(),
            clock,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn authenticate(&self, presented: &str) -> Result<Session, SessionError> {
        if !constant_time_eq(presented.as_bytes(), self.secret.as_bytes()) {
            return Err(SessionError::Unauthorized);
        }

        let issued_at = self.clock.now();
        let session = Session {
            token: generate_token(),
            issued_at,
            expires_at: issued_at + Duration::days(SESSION_TTL_DAYS),
        };

        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, existing| existing.is_valid_at(issued_at));
        sessions.insert(session.token.clone(), session.clone());

        info!(expires_at = %session.expires_at, active_sessions = sessions.len(), "session issued");
        Ok(session)
    }

    pub async fn lookup(&self, token: &str) -> Option<Session> {
        self.sessions.read().await.get(token).cloned()
    }
}

fn generate_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Compares without short-circuiting on the first differing byte.
fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    let mut diff = left.len() ^ right.len();
    for index in 0..left.len().max(right.len()) {
        let a = left.get(index).copied().unwrap_or(0);
        let b = right.get(index).copied().unwrap_or(0);
        diff |= usize::from(black_box(a ^ b));
    }
    diff == 0
}
