/// Per-sender wizard sessions with idle expiry

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use taskbot_shared::models::task::TaskPriority;

/// Step of the create-task wizard waiting for input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    Title,
    Description,
    Priority,
    DueDate,
    Assignee,
}

impl WizardStep {
    /// 1-based position, for "Step n/5" prompts
    pub fn number(&self) -> usize {
        match self {
            WizardStep::Title => 1,
            WizardStep::Description => 2,
            WizardStep::Priority => 3,
            WizardStep::DueDate => 4,
            WizardStep::Assignee => 5,
        }
    }
}

pub const WIZARD_STEPS: usize = 5;

/// Values collected so far
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
}

/// Wizard state for one sender
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub step: WizardStep,
    pub draft: TaskDraft,
    last_seen: Instant,
}

impl Session {
    pub fn new(now: Instant) -> Self {
        Self {
            step: WizardStep::Title,
            draft: TaskDraft::default(),
            last_seen: now,
        }
    }

    fn expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.last_seen) >= ttl
    }
}

/// Sessions keyed by sender external ID
///
/// The lock is held only for map operations, never across an `.await`.
#[derive(Debug)]
pub struct SessionStore {
    ttl: Duration,
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Starts a fresh session, replacing any existing one
    pub fn start(&self, key: &str, now: Instant) -> Session {
        let session = Session::new(now);
        self.lock().insert(key.to_string(), session.clone());
        session
    }

    /// Removes and returns the live session for `key`
    ///
    /// An expired session is discarded and None returned.
    pub fn take(&self, key: &str, now: Instant) -> Option<Session> {
        let mut sessions = self.lock();
        let session = sessions.remove(key)?;
        if session.expired(now, self.ttl) {
            tracing::debug!(sender = %key, "Wizard session expired");
            return None;
        }
        Some(session)
    }

    /// Stores a session after a step, refreshing its expiry
    pub fn put(&self, key: &str, mut session: Session, now: Instant) {
        session.last_seen = now;
        self.lock().insert(key.to_string(), session);
    }

    /// Drops the session for `key`; true if a live one existed
    pub fn cancel(&self, key: &str, now: Instant) -> bool {
        self.take(key, now).is_some()
    }

    /// Drops every expired session
    pub fn purge_expired(&self, now: Instant) -> usize {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, session| !session.expired(now, self.ttl));
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
