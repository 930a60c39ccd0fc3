//! Bearer-token sessions.
//!
//! Tokens are random UUIDs held in memory with an expiry. They are issued on
//! sign-up and sign-in and checked by [`require_auth`] on protected routes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use chrono::{DateTime, Utc};
use common::UserId;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy)]
struct Session {
    user_id: UserId,
    expires_at: DateTime<Utc>,
}

/// In-process token registry shared by all handlers.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
    ttl: chrono::Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36_500)),
        }
    }

    /// Issues a new token for `user_id`.
    pub async fn issue(&self, user_id: UserId) -> String {
        let token = Uuid::new_v4();
        let expires_at = Utc::now()
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, session| session.expires_at > Utc::now());
        sessions.insert(
            token,
            Session {
                user_id,
                expires_at,
            },
        );
        token.to_string()
    }

    /// Returns the user a live token belongs to.
    pub async fn resolve(&self, token: &str) -> Option<UserId> {
        let token = Uuid::parse_str(token).ok()?;
        let sessions = self.sessions.read().await;
        sessions
            .get(&token)
            .filter(|session| session.expires_at > Utc::now())
            .map(|session| session.user_id)
    }

    /// Drops every token of a user.
    pub async fn revoke_user(&self, user_id: UserId) {
        self.sessions
            .write()
            .await
            .retain(|_, session| session.user_id != user_id);
    }
}

/// The authenticated caller, inserted into request extensions by [`require_auth`].
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub UserId);

fn bearer_token(request: &Request) -> Option<&str> {
    let value = request.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
        .filter(|token| !token.is_empty())
}

/// Rejects requests without a live bearer token.
pub async fn require_auth(
    State(sessions): State<SessionStore>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = bearer_token(&request) else {
        return Err(ApiError::Unauthorized(
            "Access denied, missing token. Please sign in".to_string(),
        ));
    };

    let Some(user_id) = sessions.resolve(token).await else {
        tracing::debug!("rejected unknown or expired token");
        return Err(ApiError::Unauthorized(
            "Access denied, invalid token. Please sign in".to_string(),
        ));
    };

    request.extensions_mut().insert(AuthUser(user_id));
    Ok(next.run(request).await)
}
