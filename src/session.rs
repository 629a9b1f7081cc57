use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use ulid::Ulid;

use crate::limits::MAX_SESSIONS;

/// The identity the engine trusts: who is calling and whether they hold the
/// admin role. Where it comes from (password login, SSO) is the transport
/// layer's business.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub login: String,
    pub is_admin: bool,
}

/// How the service facade resolves a bearer token into a caller.
#[async_trait]
pub trait Identity: Send + Sync {
    async fn authenticate(&self, token: &str) -> Option<Caller>;
}

#[derive(Debug, Clone)]
struct Session {
    login: String,
    is_admin: bool,
    expires_at: DateTime<Utc>,
}

/// Token store with an explicit lifecycle: issue, validate, invalidate.
///
/// Sessions expire after `ttl`. Expired entries are dropped lazily on
/// validation and swept periodically by `maintenance::run_sweeper`.
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    /// Mint a token for an already-authenticated login. `None` when the
    /// store is full.
    pub fn issue(&self, login: &str, is_admin: bool) -> Option<String> {
        if self.sessions.len() >= MAX_SESSIONS {
            return None;
        }
        let token = Ulid::new().to_string();
        self.sessions.insert(
            token.clone(),
            Session {
                login: login.to_string(),
                is_admin,
                expires_at: Utc::now() + self.ttl,
            },
        );
        metrics::gauge!(crate::observability::SESSIONS_ACTIVE).set(self.sessions.len() as f64);
        Some(token)
    }

    pub fn validate(&self, token: &str) -> Option<Caller> {
        let session = self.sessions.get(token)?;
        if session.expires_at <= Utc::now() {
            drop(session);
            self.invalidate(token);
            return None;
        }
        Some(Caller {
            login: session.login.clone(),
            is_admin: session.is_admin,
        })
    }

    pub fn invalidate(&self, token: &str) -> bool {
        let removed = self.sessions.remove(token).is_some();
        metrics::gauge!(crate::observability::SESSIONS_ACTIVE).set(self.sessions.len() as f64);
        removed
    }

    /// Tokens whose sessions have expired as of `now`; used by the sweeper.
    pub fn collect_expired(&self, now: DateTime<Utc>) -> Vec<String> {
        self.sessions
            .iter()
            .filter(|e| e.value().expires_at <= now)
            .map(|e| e.key().clone())
            .collect()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[async_trait]
impl Identity for SessionStore {
    async fn authenticate(&self, token: &str) -> Option<Caller> {
        let caller = self.validate(token);
        if caller.is_none() {
            metrics::counter!(crate::observability::AUTH_FAILURES_TOTAL).increment(1);
        }
        caller
    }
}
