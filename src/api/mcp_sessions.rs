//! `Mcp-Session-Id` bookkeeping for the HTTP MCP endpoint.
//!
//! A session id is issued on `initialize` and must accompany every later
//! request. Sessions idle for longer than the TTL are dropped.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;
use uuid::Uuid;

pub const MCP_SESSION_HEADER: &str = "mcp-session-id";

/// Idle sessions expire after ten minutes.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug)]
pub struct McpSessions {
    ttl: Duration,
    last_activity: Mutex<HashMap<String, Instant>>,
}

impl Default for McpSessions {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL)
    }
}

impl McpSessions {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            last_activity: Mutex::new(HashMap::new()),
        }
    }

    fn sessions(&self) -> std::sync::MutexGuard<'_, HashMap<String, Instant>> {
        self.last_activity.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Issue a fresh session id.
    pub fn issue(&self) -> String {
        self.issue_at(Instant::now())
    }

    pub fn issue_at(&self, now: Instant) -> String {
        let id = Uuid::new_v4().to_string();
        let mut sessions = self.sessions();
        Self::purge(&mut sessions, self.ttl, now);
        sessions.insert(id.clone(), now);
        debug!(session = %id, "MCP session issued");
        id
    }

    /// Mark `id` active; `false` if unknown or expired.
    pub fn touch(&self, id: &str) -> bool {
        self.touch_at(id, Instant::now())
    }

    pub fn touch_at(&self, id: &str, now: Instant) -> bool {
        let mut sessions = self.sessions();
        Self::purge(&mut sessions, self.ttl, now);
        match sessions.get_mut(id) {
            Some(last) => {
                *last = now;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn purge(sessions: &mut HashMap<String, Instant>, ttl: Duration, now: Instant) {
        sessions.retain(|id, last| {
            let alive = now.saturating_duration_since(*last) <= ttl;
            if !alive {
                debug!(session = %id, "MCP session expired");
            }
            alive
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_touch() {
        let sessions = McpSessions::default();
        let id = sessions.issue();
        assert!(sessions.touch(&id));
        assert!(!sessions.touch("missing"));
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn test_idle_session_expires() {
        let sessions = McpSessions::new(Duration::from_secs(60));
        let start = Instant::now();
        let id = sessions.issue_at(start);
        assert!(sessions.touch_at(&id, start + Duration::from_secs(30)));
        // activity resets the idle clock
        assert!(sessions.touch_at(&id, start + Duration::from_secs(80)));
        assert!(!sessions.touch_at(&id, start + Duration::from_secs(200)));
        assert!(sessions.is_empty());
    }
}
