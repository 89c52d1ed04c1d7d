//! Server-side session tracking for logged-in users
//!
//! This module manages the authenticated sessions behind the HTTP API:
//! - Session creation on login and destruction on logout
//! - Token lookup for request authentication
//! - Fixed time-to-live enforcement and periodic expiry sweeps
//!
//! Sessions are bearer tokens: the server hands out an opaque token on login
//! and everything else about the session stays on this side.

use log::info;
use shared::SESSION_TTL_SECS;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// An authenticated session
///
/// Carries the identity established at login. The lifetime is fixed from
/// creation; activity does not extend it.
#[derive(Debug, Clone)]
pub struct Session {
    /// Opaque bearer token identifying this session
    pub token: String,
    /// Authenticated user id
    pub user_id: i64,
    /// Authenticated username
    pub username: String,
    /// When the session was opened
    created: Instant,
}

impl Session {
    fn new(user_id: i64, username: &str) -> Self {
        Self {
            token: Uuid::new_v4().to_string(),
            user_id,
            username: username.to_string(),
            created: Instant::now(),
        }
    }

    /// Returns true once the fixed lifetime has elapsed.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.created.elapsed() > ttl
    }
}

/// Manages all live sessions and their expiry
///
/// Lookups never return expired sessions, but expired entries linger in the
/// map until the next sweep; `purge_expired` is run periodically from a
/// background task so the map does not grow with abandoned logins.
pub struct SessionManager {
    sessions: HashMap<String, Session>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(SESSION_TTL_SECS))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            ttl,
        }
    }

    /// Opens a session for an authenticated user and returns its token.
    pub fn open(&mut self, user_id: i64, username: &str) -> String {
        let session = Session::new(user_id, username);
        let token = session.token.clone();
        info!("session opened for {} (user {})", username, user_id);
        self.sessions.insert(token.clone(), session);
        token
    }

    /// Looks up a live session by token. Expired sessions are invisible.
    pub fn get(&self, token: &str) -> Option<&Session> {
        self.sessions
            .get(token)
            .filter(|session| !session.is_expired(self.ttl))
    }

    /// Destroys a session. Returns true if the token was known.
    pub fn close(&mut self, token: &str) -> bool {
        if let Some(session) = self.sessions.remove(token) {
            info!("session closed for {}", session.username);
            true
        } else {
            false
        }
    }

    /// Drops every expired session and returns how many were removed.
    pub fn purge_expired(&mut self) -> usize {
        let before = self.sessions.len();
        let ttl = self.ttl;
        self.sessions.retain(|_, session| !session.is_expired(ttl));
        before - self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
