use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::quote::QuoteId;
use crate::quote::{ActivityKind, ActivitySink};

pub const MAX_ACTIVITIES_PER_SESSION: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub agent: String,
    pub activity: String,
    pub kind: ActivityKind,
    pub progress: u8,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub status: SessionStatus,
    pub progress: u8,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub quote_id: Option<QuoteId>,
    pub error: Option<String>,
    pub activities: Vec<ActivityRecord>,
}

#[derive(Debug)]
struct Session {
    status: SessionStatus,
    progress: u8,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    quote_id: Option<QuoteId>,
    error: Option<String>,
    activities: VecDeque<ActivityRecord>,
}

/// Live progress of quote generation sessions, polled by the sessions endpoint.
#[derive(Debug, Default)]
pub struct ActivityMonitor {
    sessions: Mutex<HashMap<String, Session>>,
}

impl ActivityMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn start_session(&self, session_id: &str) {
        self.start_session_at(session_id, Utc::now());
    }

    pub fn start_session_at(&self, session_id: &str, now: DateTime<Utc>) {
        let mut sessions = self.lock();
        let cutoff = now - Duration::hours(1);
        let before = sessions.len();
        sessions.retain(|_, session| session.started_at >= cutoff);
        let pruned = before - sessions.len();
        if pruned > 0 {
            debug!(event_name = "monitor.sessions.pruned", pruned, "pruned stale sessions");
        }

        sessions.insert(
            session_id.to_string(),
            Session {
                status: SessionStatus::Active,
                progress: 0,
                started_at: now,
                finished_at: None,
                quote_id: None,
                error: None,
                activities: VecDeque::new(),
            },
        );
    }

    /// Appends to a known session; progress outside 0..=100 is clamped.
    pub fn log_activity(
        &self,
        session_id: &str,
        agent: &str,
        activity: &str,
        kind: ActivityKind,
        progress: i32,
    ) {
        let progress = progress.clamp(0, 100) as u8;
        let mut sessions = self.lock();
        let Some(session) = sessions.get_mut(session_id) else {
            debug!(session_id, "activity for unknown session dropped");
            return;
        };

        if session.activities.len() == MAX_ACTIVITIES_PER_SESSION {
            session.activities.pop_front();
        }
        session.activities.push_back(ActivityRecord {
            agent: agent.to_string(),
            activity: activity.to_string(),
            kind,
            progress,
            timestamp: Utc::now(),
        });
        session.progress = progress;
    }

    pub fn complete_session(&self, session_id: &str, quote_id: QuoteId) {
        if let Some(session) = self.lock().get_mut(session_id) {
            session.status = SessionStatus::Completed;
            session.progress = 100;
            session.quote_id = Some(quote_id);
            session.finished_at = Some(Utc::now());
        }
    }

    pub fn fail_session(&self, session_id: &str, error: &str) {
        if let Some(session) = self.lock().get_mut(session_id) {
            session.status = SessionStatus::Failed;
            session.error = Some(error.to_string());
            session.finished_at = Some(Utc::now());
        }
    }

    pub fn session(&self, session_id: &str) -> Option<SessionSnapshot> {
        self.lock().get(session_id).map(|session| SessionSnapshot {
            session_id: session_id.to_string(),
            status: session.status,
            progress: session.progress,
            started_at: session.started_at,
            finished_at: session.finished_at,
            quote_id: session.quote_id,
            error: session.error.clone(),
            activities: session.activities.iter().cloned().collect(),
        })
    }

    pub fn active_sessions(&self) -> usize {
        self.lock().values().filter(|session| session.status == SessionStatus::Active).count()
    }
}

impl ActivitySink for ActivityMonitor {
    fn log_activity(
        &self,
        session_id: &str,
        agent: &str,
        activity: &str,
        kind: ActivityKind,
        progress: u8,
    ) {
        ActivityMonitor::log_activity(self, session_id, agent, activity, kind, i32::from(progress));
    }
}
