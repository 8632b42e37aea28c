//! Anonymous session tracking.
//!
//! Sessions exist only so a browser can see its own analysis history.
//! There are no accounts or credentials, and the identifier is opaque to
//! everything downstream of the session layer.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Idle sessions expire after this long.
pub const SESSION_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 30);

/// Cookie carrying the session id.
pub const SESSION_COOKIE: &str = "bias_session";

#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

/// In-memory session table.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_ttl(SESSION_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Resolve a presented session id to a live session, refreshing its
    /// idle clock, or mint a new one. Returns the session and whether it
    /// was newly created.
    pub async fn ensure(&self, presented: Option<&str>) -> (Session, bool) {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;

        if let Some(id) = presented {
            if let Some(session) = sessions.get_mut(id) {
                if self.is_fresh(session, now) {
                    session.last_seen_at = now;
                    return (session.clone(), false);
                }
            }
            sessions.remove(id);
        }

        let session = Session {
            session_id: Uuid::new_v4().to_string(),
            created_at: now,
            last_seen_at: now,
        };
        sessions.insert(session.session_id.clone(), session.clone());
        debug!(session_id = %session.session_id, "minted new session");
        (session, true)
    }

    /// Drop sessions idle past the TTL. Returns how many were removed.
    pub async fn prune_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| self.is_fresh(session, now));
        before - sessions.len()
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    fn is_fresh(&self, session: &Session, now: DateTime<Utc>) -> bool {
        match now.signed_duration_since(session.last_seen_at).to_std() {
            Ok(age) => age < self.ttl,
            // last_seen in the future only happens under clock adjustment
            Err(_) => true,
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
