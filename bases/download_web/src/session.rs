// bases/download_web/src/session.rs
//! Per-browser session state
//!
//! A session only remembers whether the access code was entered. It starts
//! locked, is unlocked once by a matching code and never expires while the
//! process runs.

use axum::http::{header, HeaderMap, HeaderValue};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "jy2mate_session";

/// Opaque session identifier carried in a cookie
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Find our cookie in the request headers
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE)
            .and_then(|(_, value)| Uuid::parse_str(value).ok())
            .map(Self)
    }

    pub fn set_cookie(&self) -> HeaderValue {
        // Uuid text is always a valid header value
        HeaderValue::from_str(&format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            SESSION_COOKIE, self.0
        ))
        .unwrap_or_else(|_| HeaderValue::from_static(""))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Session {
    pub authenticated: bool,
}

/// All live sessions, shared across handlers
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the caller's session without storing anything
    ///
    /// Only unlocked sessions are kept in the store. A caller without our
    /// cookie gets a fresh id, and the returned flag says the cookie must be
    /// set. An id the store does not know is simply a locked session.
    pub async fn resolve(&self, headers: &HeaderMap) -> (SessionId, Session, bool) {
        match SessionId::from_headers(headers) {
            Some(id) => (id, self.get(&id).await, false),
            None => (SessionId::new(), Session::default(), true),
        }
    }

    pub async fn get(&self, id: &SessionId) -> Session {
        self.sessions.read().await.get(id).copied().unwrap_or_default()
    }

    /// Unlock the session if `given` matches the configured code
    pub async fn authenticate(&self, id: SessionId, expected: Option<&str>, given: &str) -> bool {
        let Some(expected) = expected else {
            return false;
        };
        if !codes_match(expected, given.trim()) {
            return false;
        }
        self.sessions
            .write()
            .await
            .insert(id, Session { authenticated: true });
        true
    }

    pub async fn logout(&self, id: &SessionId) {
        self.sessions.write().await.remove(id);
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Compare without stopping at the first differing byte
fn codes_match(expected: &str, given: &str) -> bool {
    let (a, b) = (expected.as_bytes(), given.as_bytes());
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
