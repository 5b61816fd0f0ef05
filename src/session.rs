//! In-memory record of model executions, grouped into sessions.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

/// One model run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    pub model_name: String,
    pub success: bool,
    /// Milliseconds.
    pub execution_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    pub executions: Vec<Execution>,
}

impl SessionData {
    fn new() -> Self {
        Self {
            session_id: generate_session_id(),
            start_time: Utc::now(),
            executions: Vec::new(),
        }
    }
}

/// `session_<YYYY-MM-DD_HH-mm-ss>_<9 chars>`
pub fn generate_session_id() -> String {
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(9).collect();
    format!(
        "session_{}_{}",
        Local::now().format("%Y-%m-%d_%H-%M-%S"),
        suffix
    )
}

#[derive(Debug)]
struct TrackerState {
    sessions: Vec<SessionData>,
    current: usize,
}

/// Session store shared by every front-end of one engine.
#[derive(Debug)]
pub struct SessionTracker {
    state: Mutex<TrackerState>,
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionTracker {
    pub fn new() -> Self {
        let session = SessionData::new();
        info!("New session initialized: {}", session.session_id);
        Self {
            state: Mutex::new(TrackerState {
                sessions: vec![session],
                current: 0,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn log_execution(
        &self,
        model_name: &str,
        success: bool,
        execution_time: f64,
        error: Option<String>,
    ) {
        let mut state = self.state();
        let current = state.current;
        debug!(
            "Model execution logged: {} ({}) - {:.3}ms",
            model_name,
            if success { "SUCCESS" } else { "FAILED" },
            execution_time
        );
        state.sessions[current].executions.push(Execution {
            model_name: model_name.to_string(),
            success,
            execution_time,
            error,
            timestamp: Utc::now(),
        });
    }

    pub fn current_session(&self) -> SessionData {
        let state = self.state();
        state.sessions[state.current].clone()
    }

    pub fn current_session_id(&self) -> String {
        let state = self.state();
        state.sessions[state.current].session_id.clone()
    }

    pub fn all_sessions(&self) -> Vec<SessionData> {
        self.state().sessions.clone()
    }

    /// Start a fresh session and return its id; earlier sessions are kept.
    pub fn start_new_session(&self) -> String {
        let session = SessionData::new();
        let id = session.session_id.clone();
        let mut state = self.state();
        state.sessions.push(session);
        state.current = state.sessions.len() - 1;
        info!("New session initialized: {}", id);
        id
    }

    /// Sessions whose start falls on `date` (local time).
    pub fn sessions_by_date(&self, date: NaiveDate) -> Vec<SessionData> {
        self.state()
            .sessions
            .iter()
            .filter(|s| s.start_time.with_timezone(&Local).date_naive() == date)
            .cloned()
            .collect()
    }
}
