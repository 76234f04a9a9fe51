//! Per-user sessions and their in-memory conversation logs.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// One question and the answer shown for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exchange {
    /// Question as submitted.
    pub query: String,
    /// Answer text as displayed.
    pub answer: String,
}

/// Append-only record of a session's exchanges. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConversationLog {
    exchanges: Vec<Exchange>,
}

impl ConversationLog {
    /// Record a completed exchange.
    pub fn append(&mut self, query: impl Into<String>, answer: impl Into<String>) {
        self.exchanges.push(Exchange {
            query: query.into(),
            answer: answer.into(),
        });
    }

    /// Exchanges in the order they happened.
    pub fn exchanges(&self) -> &[Exchange] {
        &self.exchanges
    }

    /// Number of recorded exchanges.
    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }
}

/// A signed-in user's state.
#[derive(Debug)]
pub struct Session {
    /// Username returned by the authentication service.
    pub username: String,
    /// Exchanges made during this session.
    pub log: ConversationLog,
}

/// Shared handle to a session. Holding the lock serializes that session's requests.
pub type SessionHandle = Arc<Mutex<Session>>;

/// Default idle period after which a session ends.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

struct Entry {
    handle: SessionHandle,
    last_seen: Instant,
}

/// Registry of live sessions keyed by an opaque identifier.
///
/// A session ends on logout or once it has gone unused for the idle timeout; either way its
/// conversation log is dropped. Expired entries are purged lazily on `create` and `get`.
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Entry>>,
    idle_timeout: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_TIMEOUT)
    }
}

impl SessionStore {
    /// Create an empty store whose sessions end after `idle_timeout` without use.
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
        }
    }

    /// Start a session for `username` and return its identifier.
    pub async fn create(&self, username: impl Into<String>) -> Uuid {
        let id = Uuid::new_v4();
        let session = Session {
            username: username.into(),
            log: ConversationLog::default(),
        };

        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_seen) < self.idle_timeout);
        let expired = before - sessions.len();
        if expired > 0 {
            tracing::debug!(expired, "Expired idle sessions");
        }
        sessions.insert(
            id,
            Entry {
                handle: Arc::new(Mutex::new(session)),
                last_seen: now,
            },
        );
        tracing::debug!(session = %id, live = sessions.len(), "Session created");
        id
    }

    /// Look up a live session and mark it as used. An idle session is ended instead.
    pub async fn get(&self, id: &Uuid) -> Option<SessionHandle> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(id)?;
        if now.duration_since(entry.last_seen) >= self.idle_timeout {
            sessions.remove(id);
            tracing::debug!(session = %id, "Session expired");
            return None;
        }
        entry.last_seen = now;
        Some(Arc::clone(&entry.handle))
    }

    /// End a session, discarding its conversation log. Returns whether it existed.
    pub async fn remove(&self, id: &Uuid) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            tracing::debug!(session = %id, "Session ended");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_preserves_order() {
        let mut log = ConversationLog::default();
        log.append("first?", "Answer: one");
        log.append("second?", "Answer: two");

        let queries: Vec<&str> = log.exchanges().iter().map(|e| e.query.as_str()).collect();
        assert_eq!(queries, vec!["first?", "second?"]);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn log_serializes_as_list() {
        let mut log = ConversationLog::default();
        log.append("q", "a");
        assert_eq!(
            serde_json::to_value(&log).expect("json"),
            serde_json::json!([{ "query": "q", "answer": "a" }])
        );
    }

    #[tokio::test]
    async fn sessions_are_isolated_and_removable() {
        let store = SessionStore::default();
        let alice = store.create("alice").await;
        let bob = store.create("bob").await;

        store
            .get(&alice)
            .await
            .expect("alice")
            .lock()
            .await
            .log
            .append("q", "a");
        assert!(store.get(&bob).await.expect("bob").lock().await.log.is_empty());

        assert!(store.remove(&alice).await);
        assert!(store.get(&alice).await.is_none());
        assert!(!store.remove(&alice).await);
        assert!(store.get(&bob).await.is_some());
    }

    #[tokio::test]
    async fn idle_sessions_expire() {
        let store = SessionStore::new(Duration::from_millis(200));
        let idle = store.create("alice").await;
        let active = store.create("bob").await;

        for _ in 0..6 {
            tokio::time::sleep(Duration::from_millis(50)).await;
            assert!(store.get(&active).await.is_some());
        }
        assert!(store.get(&idle).await.is_none());
        assert!(!store.remove(&idle).await);
    }

    #[tokio::test]
    async fn creating_a_session_purges_expired_ones() {
        let store = SessionStore::new(Duration::from_millis(20));
        let stale = store.create("alice").await;
        tokio::time::sleep(Duration::from_millis(40)).await;

        store.create("bob").await;
        assert!(!store.sessions.read().await.contains_key(&stale));
    }
}
